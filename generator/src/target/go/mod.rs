//! Go bindings for the `github.com/varlink/go/varlink` runtime.
//!
//! One interface produces one Go package: client call/receive helpers, the
//! service interface, reply helpers, default stubs, the method dispatcher and
//! the interface identity accessors, emitted in that order.

pub mod client;
pub mod server;
pub mod types;

use tracing::debug;
use varlinkgen_parser::hl::{Interface, Struct};

use crate::error::GenerateError;
use crate::format::Formatter;
use self::types::{convert, member_name, render_type, sanitize_name};

pub const RUNTIME_PACKAGE: &str = "github.com/varlink/go/varlink";

/// A generated Go compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GoUnit {
  pub package: String,
  pub source: String,
}

impl GoUnit {
  pub fn file_name(&self) -> String {
    format!("{}.go", self.package)
  }
}

/// Go package name for an interface: the interface name without separators.
pub fn package_name(interface_name: &str) -> String {
  interface_name.chars().filter(|ch| *ch != '.' && *ch != '-').collect()
}

pub fn qualified_name(interface: &Interface, member: &str) -> String {
  format!("{}.{}", interface.name, member)
}

/// Name of the generated service interface type.
pub fn interface_type_name(interface: &Interface) -> String {
  format!("{}Interface", package_name(&interface.name))
}

/// Go raw string literal. Backquotes cannot appear inside one, so they are
/// spliced in as interpreted literals.
pub fn raw_string_literal(text: &str) -> String {
  format!("`{}`", text.replace('`', "` + \"`\" + `"))
}

/// Doc comment lines. A blank line separates them from a section header
/// directly above so the header does not join the item's doc.
pub(crate) fn write_comments(builder: &mut String, comments: &[String], indent: usize) {
  if !comments.is_empty() && !builder.is_empty() && !builder.ends_with("\n\n") {
    builder.push('\n');
  }
  for comment in comments {
    builder.push_str(&"\t".repeat(indent));
    if comment.is_empty() {
      builder.push_str("//\n");
    } else {
      builder.push_str(&format!("// {}\n", comment));
    }
  }
}

/// `target.Member = value` for every field, converting plain parameters to
/// the wire form.
pub(crate) fn write_wire_assignments(builder: &mut String, target: &str, kind: &Struct, indent: usize) {
  for field in &kind.fields {
    let value = convert(&field.kind, true, indent, &sanitize_name(&field.name));
    builder.push_str(&"\t".repeat(indent));
    builder.push_str(&format!("{}.{} = {}\n", target, member_name(&field.name), value));
  }
}

fn write_header(builder: &mut String, interface: &Interface, package: &str) {
  builder.push_str("// Code generated by varlinkgen. DO NOT EDIT.\n\n");
  builder.push_str(&format!("package {}\n\n", package));

  if interface.uses_object() {
    builder.push_str("import (\n");
    builder.push_str("\t\"encoding/json\"\n\n");
    builder.push_str(&format!("\t\"{}\"\n", RUNTIME_PACKAGE));
    builder.push_str(")\n\n");
  } else {
    builder.push_str(&format!("import \"{}\"\n\n", RUNTIME_PACKAGE));
  }
}

fn write_aliases(builder: &mut String, interface: &Interface) {
  builder.push_str("// Type declarations\n");
  for alias in &interface.aliases {
    debug!("alias {}", alias.name);
    write_comments(builder, &alias.comments, 0);
    builder.push_str(&format!("type {} {}\n\n", alias.name, render_type(&alias.kind, true, 0)));
  }
}

fn write_identity(builder: &mut String, interface: &Interface) {
  let interface_type = interface_type_name(interface);

  builder.push_str("// Varlink interface name\n");
  builder.push_str("func (s *VarlinkInterface) VarlinkGetName() string {\n");
  builder.push_str(&format!("\treturn {}\n", raw_string_literal(&interface.name)));
  builder.push_str("}\n\n");

  builder.push_str("// Varlink interface description\n");
  builder.push_str("func (s *VarlinkInterface) VarlinkGetDescription() string {\n");
  builder.push_str(&format!("\treturn {}\n", raw_string_literal(&format!("{}\n", interface.description))));
  builder.push_str("}\n\n");

  builder.push_str("// Service interface\n");
  builder.push_str("type VarlinkInterface struct {\n");
  builder.push_str(&format!("\t{}\n", interface_type));
  builder.push_str("}\n\n");

  builder.push_str(&format!("func VarlinkNew(m {}) *VarlinkInterface {{\n", interface_type));
  builder.push_str("\treturn &VarlinkInterface{m}\n");
  builder.push_str("}\n");
}

/// Emits the unformatted Go source for `interface`, returning the package
/// name alongside it.
pub fn generate_template(interface: &Interface) -> (String, String) {
  let package = package_name(&interface.name);
  let mut builder = String::new();

  write_header(&mut builder, interface, &package);
  write_aliases(&mut builder, interface);

  debug!("client calls for {} methods", interface.methods.len());
  client::write_client_calls(&mut builder, interface);

  server::write_service_interface(&mut builder, interface);
  server::write_call_wrapper(&mut builder);

  debug!("reply methods for {} errors", interface.errors.len());
  server::write_error_replies(&mut builder, interface);
  server::write_method_replies(&mut builder, interface);
  server::write_stubs(&mut builder, interface);
  server::write_dispatcher(&mut builder, interface);

  write_identity(&mut builder, interface);

  (package, builder)
}

/// Generates the Go unit for `interface` and runs it through `formatter`.
pub fn generate(interface: &Interface, formatter: &dyn Formatter) -> Result<GoUnit, GenerateError> {
  let (package, source) = generate_template(interface);
  debug!("generated {} bytes for package {}", source.len(), package);

  let source = formatter.format(&source).map_err(|error| error.into_generate_error(&package))?;

  Ok(GoUnit {
    package,
    source,
  })
}

#[cfg(test)]
mod tests {
  use test_log::test;
  use varlinkgen_parser::parse_interface;

  use super::*;
  use crate::format::Builtin;

  const PING: &str = "interface org.example.ping\n\nmethod Ping(ping: string) -> (pong: string)\n";

  const FULL: &str = r#"
interface org.example-more.things

# A thing
type Thing (
  name: string,
  tags: []string,
  extra: ?object
)

type Color (red, green)

method List(filter: ?string, limit: int) -> (things: [](name: string, size: int), more: bool)
method Reset() -> ()
method Set(type: string, map: [string]Thing, c: Color) -> (in: bool)

error NotFound (name: string)
error Busy ()
"#;

  const FULL_DOCUMENTED: &str = "interface org.example.docs\n\n# A thing\ntype Thing (name: string)\n\n# List things\nmethod List() -> (things: []Thing)\n\n# Missing\nerror NotFound (name: string)\n# Busy\nerror Busy ()\n";

  fn full() -> Interface {
    parse_interface(FULL).unwrap()
  }

  #[test]
  fn derives_package_name() {
    assert_eq!(package_name("org.example.ping"), "orgexampleping");
    assert_eq!(package_name("org.example-more.things"), "orgexamplemorethings");
  }

  #[test]
  fn escapes_backquotes_in_raw_strings() {
    assert_eq!(raw_string_literal("plain"), "`plain`");
    assert_eq!(raw_string_literal("a`b"), "`a` + \"`\" + `b`");
  }

  #[test]
  fn generates_ping_unit() {
    let interface = parse_interface(PING).unwrap();
    let unit = generate(&interface, &Builtin).unwrap();
    let source = &unit.source;

    assert_eq!(unit.package, "orgexampleping");
    assert_eq!(unit.file_name(), "orgexampleping.go");
    assert!(source.contains("package orgexampleping\n"));
    assert!(source.contains("import \"github.com/varlink/go/varlink\"\n"));
    assert!(!source.contains("encoding/json"));

    assert!(source.contains("// Type declarations\n// Client method calls and reply readers\n"));
    assert!(source.contains("func Ping(conn_ *varlink.Connection, more_ bool, oneway_ bool, ping string) error {\n"));
    assert!(source.contains("\treturn conn_.Send(\"org.example.ping.Ping\", in, more_, oneway_)\n"));
    assert!(source.contains("func ReadPing_(c *varlink.Connection, pong *string) (bool, error) {\n"));
    assert!(source.contains("\tif pong != nil {\n\t\t*pong = out.Pong\n\t}\n"));

    assert!(source.contains("type orgexamplepingInterface interface {\n\tPing(c VarlinkCall, ping string) error\n}\n"));
    assert!(source.contains("func (s *VarlinkInterface) Ping(c VarlinkCall, ping string) error {\n\treturn c.ReplyMethodNotImplemented(\"Ping\")\n}\n"));

    assert_eq!(source.matches("\tcase \"").count(), 1);
    assert!(source.contains("\tcase \"Ping\":\n"));
    assert_eq!(source.matches("\tdefault:\n").count(), 1);
    assert!(source.contains("\tdefault:\n\t\treturn call.ReplyMethodNotFound(methodname)\n"));

    assert!(source.contains("\treturn `org.example.ping`\n"));
    assert!(source.contains("func VarlinkNew(m orgexamplepingInterface) *VarlinkInterface {\n"));
  }

  #[test]
  fn generation_is_deterministic() {
    let interface = full();
    let first = generate_template(&interface);
    let second = generate_template(&interface);
    assert_eq!(first, second);
  }

  #[test]
  fn imports_json_only_for_objects() {
    let (_, source) = generate_template(&full());
    assert!(source.contains("import (\n\t\"encoding/json\"\n\n\t\"github.com/varlink/go/varlink\"\n)\n"));
    assert!(source.contains("Extra *json.RawMessage `json:\"extra,omitempty\"`"));
  }

  #[test]
  fn emits_aliases_with_comments() {
    let (_, source) = generate_template(&full());
    assert!(source.contains("// A thing\ntype Thing struct {\n\tName string `json:\"name\"`\n\tTags []string `json:\"tags\"`\n"));
    assert!(source.contains("type Color string\n\n"));
  }

  #[test]
  fn sections_follow_declaration_order() {
    let (_, source) = generate_template(&full());
    let sections = [
      "// Type declarations",
      "// Client method calls and reply readers",
      "// Service interface with all methods",
      "// Service object with all methods",
      "// Reply methods for all varlink errors",
      "// Reply methods for all varlink methods",
      "// Dummy methods for all varlink methods",
      "// Method call dispatcher",
      "// Varlink interface name",
      "// Varlink interface description",
      "// Service interface\n",
    ];
    let positions = sections.iter().map(|section| source.find(section).unwrap()).collect::<Vec<_>>();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", positions);

    let cases = ["case \"List\":", "case \"Reset\":", "case \"Set\":"].iter().map(|case| source.find(case).unwrap()).collect::<Vec<_>>();
    assert!(cases.windows(2).all(|pair| pair[0] < pair[1]), "{:?}", cases);
  }

  #[test]
  fn description_is_returned_verbatim() {
    let interface = parse_interface("# uses `code`\ninterface a.b\nmethod X() -> ()\n\n").unwrap();
    let (_, source) = generate_template(&interface);
    assert!(source.contains("\treturn `# uses ` + \"`\" + `code` + \"`\" + `\ninterface a.b\nmethod X() -> ()\n`\n"));
  }

  #[test]
  fn rejects_malformed_output() {
    struct Failing;

    impl Formatter for Failing {
      fn format(&self, _source: &str) -> Result<String, crate::format::FormatError> {
        Err(crate::format::FormatError::Invalid("expected declaration".to_owned()))
      }
    }

    let interface = parse_interface(PING).unwrap();
    match generate(&interface, &Failing) {
      Err(GenerateError::Format { package, message }) => {
        assert_eq!(package, "orgexampleping");
        assert_eq!(message, "expected declaration");
      }
      other => panic!("unexpected result {:?}", other),
    }
  }

  #[cfg(unix)]
  #[test]
  fn failing_formatter_is_a_format_error() {
    let formatter = crate::format::Gofmt {
      program: "false".to_owned(),
    };

    let interface = parse_interface(PING).unwrap();
    match generate(&interface, &formatter) {
      Err(GenerateError::Format { package, .. }) => assert_eq!(package, "orgexampleping"),
      other => panic!("unexpected result {:?}", other),
    }
  }

  #[test]
  fn section_headers_stay_apart_from_doc_comments() {
    let (_, source) = generate_template(&parse_interface(FULL_DOCUMENTED).unwrap());
    assert!(source.contains("// Type declarations\n\n// A thing\ntype Thing"));
    assert!(source.contains("// Client method calls and reply readers\n\n// List things\nfunc List("));
    assert!(source.contains("// Reply methods for all varlink errors\n\n// Missing\nfunc (c *VarlinkCall) ReplyNotFound("));
    assert!(source.contains("}\n\n// Busy\nfunc (c *VarlinkCall) ReplyBusy("));
  }
}
