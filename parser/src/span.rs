use std::fmt::Debug;

#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash, Default)]
pub struct Span {
  pub start: usize,
  pub end: usize,
  pub line: usize,
  pub column: usize,
}

impl Span {
  pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
    Span { start, end, line, column }
  }

  pub fn wrap<T>(self, value: T) -> Positioned<T> {
    Positioned { value, span: self }
  }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Positioned<T> {
  pub value: T,
  pub span: Span,
}

impl<T> Positioned<T> {
  pub fn new(value: T, span: Span) -> Positioned<T> {
    Positioned { value, span }
  }
}

impl<T: Debug> Debug for Positioned<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{:?}@{}:{}", self.value, self.span.line + 1, self.span.column + 1)
  }
}
