use std::collections::HashSet;

use once_cell::sync::Lazy;
use varlinkgen_parser::hl::{Field, Struct, Type};

/// Identifiers a field name must not shadow inside generated functions: the
/// Go keywords, the predeclared names and packages the generated bodies
/// refer to, and the generator's own locals and receivers.
static RESERVED_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
  HashSet::from([
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for", "func", "go",
    "goto", "if", "import", "interface", "map", "package", "range", "return", "select", "struct", "switch", "type",
    "var",
    "bool", "int64", "float64", "string", "nil", "false",
    "json", "varlink",
    "c", "s", "in", "out", "err",
  ])
});

/// Local identifier for a field; the wire tag keeps the original name.
pub fn sanitize_name(name: &str) -> String {
  if RESERVED_NAMES.contains(name) {
    format!("{}_", name)
  } else {
    name.to_owned()
  }
}

/// Exported Go member name for a field.
pub fn member_name(name: &str) -> String {
  let mut chars = name.chars();
  match chars.next() {
    None => String::new(),
    Some(first) => first.to_uppercase().chain(chars).collect(),
  }
}

/// Whether assigning between the wire and plain form of `kind` needs an
/// explicit Go conversion, i.e. whether the type spells out a struct literal
/// type somewhere inside it.
pub fn needs_conversion(kind: &Type) -> bool {
  match kind {
    Type::Struct(_) | Type::Array(_) | Type::Map(_) => true,
    Type::Maybe(inner) => needs_conversion(inner),
    _ => false,
  }
}

fn push_indent(builder: &mut String, indent: usize) {
  for _ in 0..indent {
    builder.push('\t');
  }
}

pub fn write_type(builder: &mut String, kind: &Type, wire: bool, indent: usize) {
  match kind {
    Type::Bool => builder.push_str("bool"),
    Type::Int => builder.push_str("int64"),
    Type::Float => builder.push_str("float64"),
    Type::String | Type::Enum(_) => builder.push_str("string"),
    Type::Object => builder.push_str("json.RawMessage"),
    Type::Array(inner) => {
      builder.push_str("[]");
      write_type(builder, inner, wire, indent);
    }
    Type::Map(inner) => {
      builder.push_str("map[string]");
      write_type(builder, inner, wire, indent);
    }
    Type::Maybe(inner) => {
      builder.push('*');
      write_type(builder, inner, wire, indent);
    }
    Type::Alias(name) => builder.push_str(name),
    Type::Struct(inner) => write_struct(builder, inner, wire, indent),
  }
}

pub fn write_struct(builder: &mut String, kind: &Struct, wire: bool, indent: usize) {
  if kind.is_empty() {
    builder.push_str("struct{}");
    return;
  }

  builder.push_str("struct {\n");
  for field in &kind.fields {
    push_indent(builder, indent + 1);
    builder.push_str(&member_name(&field.name));
    builder.push(' ');
    write_type(builder, &field.kind, wire, indent + 1);
    if wire {
      write_tag(builder, field);
    }
    builder.push('\n');
  }
  push_indent(builder, indent);
  builder.push('}');
}

fn write_tag(builder: &mut String, field: &Field) {
  let omit = if matches!(field.kind, Type::Maybe(_)) { ",omitempty" } else { "" };
  builder.push_str(&format!(" `json:\"{}{}\"`", field.name, omit));
}

pub fn render_type(kind: &Type, wire: bool, indent: usize) -> String {
  let mut builder = String::new();
  write_type(&mut builder, kind, wire, indent);
  builder
}

pub fn render_struct(kind: &Struct, wire: bool, indent: usize) -> String {
  let mut builder = String::new();
  write_struct(&mut builder, kind, wire, indent);
  builder
}

/// Expression converting `value` to the rendered form of `kind`. Pointer
/// types are parenthesized so the conversion is not parsed as a dereference.
pub fn convert(kind: &Type, wire: bool, indent: usize, value: &str) -> String {
  if !needs_conversion(kind) {
    return value.to_owned();
  }

  let target = render_type(kind, wire, indent);
  if matches!(kind, Type::Maybe(_)) {
    format!("({})({})", target, value)
  } else {
    format!("{}({})", target, value)
  }
}

/// `name type` pairs for a parameter list, plain form.
pub fn params(kind: &Struct, indent: usize) -> Vec<String> {
  kind.fields.iter().map(|field| {
    format!("{} {}", sanitize_name(&field.name), render_type(&field.kind, false, indent))
  }).collect()
}
