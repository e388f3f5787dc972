use tracing::debug;
use varlinkgen_parser::hl::{Interface, Struct};

use super::types::{convert, member_name, params, render_struct};
use super::{interface_type_name, qualified_name, write_comments, write_wire_assignments};

/// Parameter list shared by the service interface and the stubs.
fn service_signature(name: &str, input: &Struct) -> String {
  let mut signature = vec!["c VarlinkCall".to_owned()];
  signature.extend(params(input, 1));
  format!("{}({}) error", name, signature.join(", "))
}

pub fn write_service_interface(builder: &mut String, interface: &Interface) {
  builder.push_str("// Service interface with all methods\n");
  builder.push_str(&format!("type {} interface {{\n", interface_type_name(interface)));
  for method in &interface.methods {
    builder.push_str(&format!("\t{}\n", service_signature(&method.name, &method.input)));
  }
  builder.push_str("}\n\n");
}

pub fn write_call_wrapper(builder: &mut String) {
  builder.push_str("// Service object with all methods\n");
  builder.push_str("type VarlinkCall struct{ varlink.Call }\n\n");
}

/// Reply method on the call wrapper. `payload` names the runtime call made
/// with the wire struct, e.g. `Reply(` or `ReplyError("a.b.NotFound", `.
fn write_reply(builder: &mut String, name: &str, fields: &Struct, payload: &str) {
  builder.push_str(&format!("func (c *VarlinkCall) Reply{}({}) error {{\n", name, params(fields, 1).join(", ")));
  if fields.is_empty() {
    builder.push_str(&format!("\treturn c.{}nil)\n", payload));
  } else {
    builder.push_str(&format!("\tvar out {}\n", render_struct(fields, true, 1)));
    write_wire_assignments(builder, "out", fields, 1);
    builder.push_str(&format!("\treturn c.{}&out)\n", payload));
  }
  builder.push_str("}\n\n");
}

pub fn write_error_replies(builder: &mut String, interface: &Interface) {
  builder.push_str("// Reply methods for all varlink errors\n");
  for error in &interface.errors {
    debug!("error reply {}", error.name);
    write_comments(builder, &error.comments, 0);
    let payload = format!("ReplyError(\"{}\", ", qualified_name(interface, &error.name));
    write_reply(builder, &error.name, &error.kind, &payload);
  }
}

pub fn write_method_replies(builder: &mut String, interface: &Interface) {
  builder.push_str("// Reply methods for all varlink methods\n");
  for method in &interface.methods {
    write_reply(builder, &method.name, &method.output, "Reply(");
  }
}

pub fn write_stubs(builder: &mut String, interface: &Interface) {
  builder.push_str("// Dummy methods for all varlink methods\n");
  for method in &interface.methods {
    builder.push_str(&format!("func (s *VarlinkInterface) {} {{\n", service_signature(&method.name, &method.input)));
    builder.push_str(&format!("\treturn c.ReplyMethodNotImplemented(\"{}\")\n", method.name));
    builder.push_str("}\n\n");
  }
}

/*
func (s *VarlinkInterface) VarlinkDispatch(call varlink.Call, methodname string) error {
	switch methodname {
	case "Ping":
		var in struct {
			Ping string `json:"ping"`
		}
		err := call.GetParameters(&in)
		if err != nil {
			return call.ReplyInvalidParameter("parameters")
		}
		return s.orgexamplepingInterface.Ping(VarlinkCall{call}, in.Ping)

	default:
		return call.ReplyMethodNotFound(methodname)
	}
}
*/
pub fn write_dispatcher(builder: &mut String, interface: &Interface) {
  let interface_type = interface_type_name(interface);

  builder.push_str("// Method call dispatcher\n");
  builder.push_str("func (s *VarlinkInterface) VarlinkDispatch(call varlink.Call, methodname string) error {\n");
  builder.push_str("\tswitch methodname {\n");
  for method in &interface.methods {
    debug!("dispatch case {}", method.name);
    builder.push_str(&format!("\tcase \"{}\":\n", method.name));

    let mut args = vec!["VarlinkCall{call}".to_owned()];
    if !method.input.is_empty() {
      builder.push_str(&format!("\t\tvar in {}\n", render_struct(&method.input, true, 2)));
      builder.push_str("\t\terr := call.GetParameters(&in)\n");
      builder.push_str("\t\tif err != nil {\n");
      builder.push_str("\t\t\treturn call.ReplyInvalidParameter(\"parameters\")\n");
      builder.push_str("\t\t}\n");

      args.extend(method.input.fields.iter().map(|field| {
        convert(&field.kind, false, 2, &format!("in.{}", member_name(&field.name)))
      }));
    }
    builder.push_str(&format!("\t\treturn s.{}.{}({})\n\n", interface_type, method.name, args.join(", ")));
  }
  builder.push_str("\tdefault:\n");
  builder.push_str("\t\treturn call.ReplyMethodNotFound(methodname)\n");
  builder.push_str("\t}\n");
  builder.push_str("}\n\n");
}
