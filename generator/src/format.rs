//! Canonical formatting of generated source.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, trace};

use crate::error::GenerateError;

#[derive(Debug, Error)]
pub enum FormatError {
  /// The source is not syntactically valid.
  #[error("{0}")]
  Invalid(String),

  #[error("failed to run '{program}': {source}")]
  Unavailable {
    program: String,
    #[source]
    source: io::Error,
  },
}

impl FormatError {
  pub fn into_generate_error(self, package: &str) -> GenerateError {
    match self {
      FormatError::Invalid(message) => GenerateError::Format {
        package: package.to_owned(),
        message,
      },
      FormatError::Unavailable { program, source } => GenerateError::FormatterUnavailable { program, source },
    }
  }
}

pub trait Formatter {
  fn format(&self, source: &str) -> Result<String, FormatError>;
}

/// Leaves the layout untouched and only checks that every delimiter outside
/// literals and comments is balanced.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtin;

impl Formatter for Builtin {
  fn format(&self, source: &str) -> Result<String, FormatError> {
    check_delimiters(source)?;
    Ok(source.to_owned())
  }
}

/// Pipes the source through an external `gofmt`.
#[derive(Debug, Clone)]
pub struct Gofmt {
  pub program: String,
}

impl Formatter for Gofmt {
  fn format(&self, source: &str) -> Result<String, FormatError> {
    let unavailable = |source: io::Error| FormatError::Unavailable {
      program: self.program.clone(),
      source,
    };

    debug!("running {}", self.program);
    let mut child = Command::new(&self.program)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(unavailable)?;

    // gofmt reads all of stdin before writing, so the pipe cannot deadlock.
    // A formatter exiting early closes the pipe; its exit status reports why.
    if let Some(mut stdin) = child.stdin.take() {
      match stdin.write_all(source.as_bytes()) {
        Err(error) if error.kind() != io::ErrorKind::BrokenPipe => return Err(unavailable(error)),
        _ => {}
      }
    }
    let output = child.wait_with_output().map_err(unavailable)?;

    if !output.status.success() {
      let message = String::from_utf8_lossy(&output.stderr).trim().replace("<standard input>:", "line ");
      return Err(FormatError::Invalid(message));
    }
    String::from_utf8(output.stdout).map_err(|error| FormatError::Invalid(error.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Literal {
  Interpreted,
  Raw,
  Rune,
  LineComment,
}

pub fn check_delimiters(source: &str) -> Result<(), FormatError> {
  let mut stack: Vec<(char, usize)> = Vec::new();
  let mut literal: Option<Literal> = None;
  let mut line = 1;
  let mut chars = source.chars().peekable();

  while let Some(ch) = chars.next() {
    if ch == '\n' {
      line += 1;
    }

    match literal {
      Some(Literal::LineComment) => {
        if ch == '\n' {
          literal = None;
        }
        continue;
      }
      Some(Literal::Raw) => {
        if ch == '`' {
          literal = None;
        }
        continue;
      }
      Some(kind @ (Literal::Interpreted | Literal::Rune)) => {
        let close = if kind == Literal::Interpreted { '"' } else { '\'' };
        match ch {
          '\\' => {
            chars.next();
          }
          '\n' => return Err(FormatError::Invalid(format!("line {}: newline in string", line - 1))),
          ch if ch == close => literal = None,
          _ => {}
        }
        continue;
      }
      None => {}
    }

    match ch {
      '/' if chars.peek() == Some(&'/') => literal = Some(Literal::LineComment),
      '"' => literal = Some(Literal::Interpreted),
      '`' => literal = Some(Literal::Raw),
      '\'' => literal = Some(Literal::Rune),
      '(' | '[' | '{' => stack.push((ch, line)),
      ')' | ']' | '}' => {
        let open = match ch {
          ')' => '(',
          ']' => '[',
          _ => '{',
        };
        match stack.pop() {
          Some((top, _)) if top == open => {}
          Some((top, opened)) => {
            return Err(FormatError::Invalid(format!("line {}: unexpected '{}', '{}' opened on line {} is still open", line, ch, top, opened)));
          }
          None => return Err(FormatError::Invalid(format!("line {}: unexpected '{}'", line, ch))),
        }
      }
      _ => {}
    }
  }

  if let Some(kind) = literal.filter(|kind| *kind != Literal::LineComment) {
    return Err(FormatError::Invalid(format!("unterminated {:?} literal", kind)));
  }
  if let Some((open, opened)) = stack.pop() {
    return Err(FormatError::Invalid(format!("line {}: '{}' is never closed", opened, open)));
  }

  trace!("checked {} lines", line);
  Ok(())
}

#[cfg(test)]
mod tests {
  use test_log::test;

  use super::*;

  #[test]
  fn accepts_balanced_source() {
    let source = "package a\n\n// comment with ( and {\nfunc X() string {\n\treturn `raw ) }` + \"str ]\\\"\" + string('}')\n}\n";
    assert_eq!(Builtin.format(source).unwrap(), source);
  }

  #[test]
  fn rejects_unbalanced_source() {
    let error = Builtin.format("package a\nfunc X() {\n\tif true {\n}\n").unwrap_err();
    assert!(error.to_string().contains("'{' is never closed"), "{}", error);

    let error = Builtin.format("package a\nfunc X() {\n\treturn (1]\n}\n").unwrap_err();
    assert!(error.to_string().starts_with("line 3: unexpected ']'"), "{}", error);
  }

  #[test]
  fn rejects_unterminated_literals() {
    assert!(Builtin.format("var a = `abc\n").is_err());
    assert!(Builtin.format("var a = \"abc\nb\"\n").is_err());
  }

  #[test]
  fn reports_missing_formatter() {
    let gofmt = Gofmt {
      program: "varlinkgen-no-such-formatter".to_owned(),
    };
    match gofmt.format("package a\n") {
      Err(FormatError::Unavailable { program, .. }) => assert_eq!(program, "varlinkgen-no-such-formatter"),
      other => panic!("unexpected result {:?}", other),
    }
  }

  #[cfg(unix)]
  #[test]
  fn returns_formatter_output() {
    let formatter = Gofmt {
      program: "cat".to_owned(),
    };
    let source = "package a\n\nfunc X() {}\n";
    assert_eq!(formatter.format(source).unwrap(), source);
  }

  #[cfg(unix)]
  #[test]
  fn failing_formatter_rejects_source() {
    let formatter = Gofmt {
      program: "false".to_owned(),
    };
    match formatter.format("package a\n") {
      Err(FormatError::Invalid(message)) => assert!(message.is_empty(), "{}", message),
      other => panic!("unexpected result {:?}", other),
    }
  }
}
