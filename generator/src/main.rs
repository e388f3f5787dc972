use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use varlinkgen::{collect_inputs, generate_file, generate_from_file, Builtin, Formatter, GenerateError, Gofmt};

#[derive(Parser, Debug)]
#[command(version, about = "Generate Go bindings from varlink interface descriptions")]
struct Args {
  /// Interface file, or a directory searched for `*.varlink` files
  input: PathBuf,

  #[arg(long, value_enum, default_value_t = FormatterKind::Gofmt)]
  formatter: FormatterKind,

  /// Program used by the gofmt formatter
  #[arg(long, default_value = "gofmt")]
  gofmt: String,

  /// Print generated code instead of writing `<package>.go` files
  #[arg(long)]
  stdout: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum FormatterKind {
  /// Canonical layout through an external gofmt
  Gofmt,
  /// Emitted layout, delimiter check only
  Builtin,
}

fn run(args: &Args, formatter: &dyn Formatter) -> Result<(), (PathBuf, GenerateError)> {
  let inputs = collect_inputs(&args.input).map_err(|error| (args.input.clone(), error))?;
  if inputs.is_empty() {
    debug!("no interface files under {:?}", args.input);
  }

  for input in &inputs {
    process(input, args.stdout, formatter).map_err(|error| (input.clone(), error))?;
  }
  Ok(())
}

fn process(input: &Path, stdout: bool, formatter: &dyn Formatter) -> Result<(), GenerateError> {
  if !stdout {
    generate_file(input, formatter)?;
    return Ok(());
  }

  let unit = generate_from_file(input, formatter)?;
  io::stdout().write_all(unit.source.as_bytes()).map_err(|source| GenerateError::Write {
    path: PathBuf::from("<stdout>"),
    source,
  })
}

fn main() -> ExitCode {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();
  debug!("{:?}", args);

  let formatter: Box<dyn Formatter> = match args.formatter {
    FormatterKind::Gofmt => Box::new(Gofmt {
      program: args.gofmt.clone(),
    }),
    FormatterKind::Builtin => Box::new(Builtin),
  };

  match run(&args, formatter.as_ref()) {
    Ok(()) => ExitCode::SUCCESS,
    Err((path, error)) => {
      error!(path = ?path, "generation failed");
      eprintln!("Error processing '{}': {}", path.display(), error);
      ExitCode::FAILURE
    }
  }
}
