//! Resolved interface model handed to code generators.
//!
//! Everything here is plain owned data without source positions. Generators
//! only ever read it.

#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
  /// Dotted interface name, e.g. `org.example.ping`. Used verbatim as the
  /// prefix of every qualified method and error name on the wire.
  pub name: String,
  /// The complete interface description text, trailing newlines trimmed.
  pub description: String,
  pub aliases: Vec<Alias>,
  pub methods: Vec<Method>,
  pub errors: Vec<ErrorType>,
}

impl Interface {
  /// Whether any declaration references the untyped `object` kind.
  pub fn uses_object(&self) -> bool {
    self.aliases.iter().any(|alias| alias.kind.contains_object())
      || self.methods.iter().any(|method| method.input.contains_object() || method.output.contains_object())
      || self.errors.iter().any(|error| error.kind.contains_object())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
  pub name: String,
  pub kind: Type,
  pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
  pub name: String,
  pub input: Struct,
  pub output: Struct,
  pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorType {
  pub name: String,
  pub kind: Struct,
  pub comments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Struct {
  pub fields: Vec<Field>,
}

impl Struct {
  pub fn new(fields: Vec<Field>) -> Self {
    Struct { fields }
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  pub fn contains_object(&self) -> bool {
    self.fields.iter().any(|field| field.kind.contains_object())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  pub name: String,
  pub kind: Type,
}

impl Field {
  pub fn new(name: impl Into<String>, kind: Type) -> Self {
    Field { name: name.into(), kind }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
  Bool,
  Int,
  Float,
  String,
  /// Enum variants in declaration order.
  Enum(Vec<String>),
  Object,
  Array(Box<Type>),
  /// String-keyed map.
  Map(Box<Type>),
  Maybe(Box<Type>),
  Alias(String),
  Struct(Struct),
}

impl Type {
  pub fn contains_object(&self) -> bool {
    match self {
      Type::Object => true,
      Type::Array(inner) | Type::Map(inner) | Type::Maybe(inner) => inner.contains_object(),
      Type::Struct(inner) => inner.contains_object(),
      Type::Bool | Type::Int | Type::Float | Type::String | Type::Enum(_) | Type::Alias(_) => false,
    }
  }
}
