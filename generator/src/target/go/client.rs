use itertools::Itertools;
use tracing::debug;
use varlinkgen_parser::hl::{Interface, Method};

use super::types::{convert, member_name, params, render_struct, render_type, sanitize_name};
use super::{qualified_name, write_comments, write_wire_assignments};

pub fn write_client_calls(builder: &mut String, interface: &Interface) {
  builder.push_str("// Client method calls and reply readers\n");
  for method in &interface.methods {
    debug!("client call {}", method.name);
    write_call(builder, interface, method);
    write_receive(builder, method);
  }
}

/*
func Ping(conn_ *varlink.Connection, more_ bool, oneway_ bool, ping string) error {
	var in struct {
		Ping string `json:"ping"`
	}
	in.Ping = ping
	return conn_.Send("org.example.ping.Ping", in, more_, oneway_)
}
*/
fn write_call(builder: &mut String, interface: &Interface, method: &Method) {
  let mut signature = vec![
    "conn_ *varlink.Connection".to_owned(),
    "more_ bool".to_owned(),
    "oneway_ bool".to_owned(),
  ];
  signature.extend(params(&method.input, 1));

  write_comments(builder, &method.comments, 0);
  builder.push_str(&format!("func {}({}) error {{\n", method.name, signature.join(", ")));

  let qualified = qualified_name(interface, &method.name);
  if method.input.is_empty() {
    builder.push_str(&format!("\treturn conn_.Send(\"{}\", nil, more_, oneway_)\n", qualified));
  } else {
    builder.push_str(&format!("\tvar in {}\n", render_struct(&method.input, true, 1)));
    write_wire_assignments(builder, "in", &method.input, 1);
    builder.push_str(&format!("\treturn conn_.Send(\"{}\", in, more_, oneway_)\n", qualified));
  }
  builder.push_str("}\n\n");
}

/*
func ReadPing_(c *varlink.Connection, pong *string) (bool, error) {
	var out struct {
		Pong string `json:"pong"`
	}
	continues_, err := c.Receive(&out)
	if err != nil {
		return false, err
	}
	if pong != nil {
		*pong = out.Pong
	}
	return continues_, nil
}
*/
fn write_receive(builder: &mut String, method: &Method) {
  let outputs = method.output.fields.iter()
    .map(|field| format!(", {} *{}", sanitize_name(&field.name), render_type(&field.kind, false, 1)))
    .join("");
  builder.push_str(&format!("func Read{}_(c *varlink.Connection{}) (bool, error) {{\n", method.name, outputs));

  if method.output.is_empty() {
    builder.push_str("\tcontinues_, err := c.Receive(nil)\n");
  } else {
    builder.push_str(&format!("\tvar out {}\n", render_struct(&method.output, true, 1)));
    builder.push_str("\tcontinues_, err := c.Receive(&out)\n");
  }
  builder.push_str("\tif err != nil {\n");
  builder.push_str("\t\treturn false, err\n");
  builder.push_str("\t}\n");

  for field in &method.output.fields {
    let name = sanitize_name(&field.name);
    let value = convert(&field.kind, false, 2, &format!("out.{}", member_name(&field.name)));
    builder.push_str(&format!("\tif {} != nil {{\n", name));
    builder.push_str(&format!("\t\t*{} = {}\n", name, value));
    builder.push_str("\t}\n");
  }

  builder.push_str("\treturn continues_, nil\n");
  builder.push_str("}\n\n");
}
