pub mod error;
pub mod format;
pub mod target;

use std::ffi::OsStr;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use varlinkgen_parser::parse_interface;
use walkdir::WalkDir;

pub use crate::error::GenerateError;
pub use crate::format::{Builtin, Formatter, Gofmt};
pub use crate::target::go::{generate, GoUnit};

pub const INTERFACE_EXTENSION: &str = "varlink";

/// Parses an interface description and generates its Go unit.
pub fn generate_source(description: &str, formatter: &dyn Formatter) -> Result<GoUnit, GenerateError> {
  let interface = parse_interface(description)?;
  debug!("parsed interface {} ({} methods, {} errors)", interface.name, interface.methods.len(), interface.errors.len());

  generate(&interface, formatter)
}

pub fn generate_from_file(path: &Path, formatter: &dyn Formatter) -> Result<GoUnit, GenerateError> {
  let description = fs::read_to_string(path).map_err(|source| GenerateError::Read {
    path: path.to_path_buf(),
    source,
  })?;

  generate_source(&description, formatter)
}

/// Generates the Go unit for the interface file at `path` and writes it next
/// to the input as `<package>.go`. Nothing is written if any step fails.
pub fn generate_file(path: &Path, formatter: &dyn Formatter) -> Result<PathBuf, GenerateError> {
  let unit = generate_from_file(path, formatter)?;

  let output = path.parent().unwrap_or_else(|| Path::new("")).join(unit.file_name());
  write_output(&output, &unit.source).map_err(|source| GenerateError::Write {
    path: output.clone(),
    source,
  })?;
  info!("generated {:?} from {:?}", output, path);

  Ok(output)
}

/// Generated files are created readable and writable by owner and group only.
fn write_output(path: &Path, source: &str) -> io::Result<()> {
  let mut options = OpenOptions::new();
  options.write(true).create(true).truncate(true);
  #[cfg(unix)]
  {
    use std::os::unix::fs::OpenOptionsExt;
    options.mode(0o660);
  }

  let mut file = options.open(path)?;
  file.write_all(source.as_bytes())
}

/// Interface files under `root`, or `root` itself if it is a file. Hidden
/// directories and files are skipped.
pub fn collect_inputs(root: &Path) -> Result<Vec<PathBuf>, GenerateError> {
  if !root.is_dir() {
    return Ok(vec![root.to_path_buf()]);
  }

  let mut inputs = Vec::new();
  for entry in WalkDir::new(root).sort_by_file_name() {
    let entry = entry.map_err(|error| GenerateError::Read {
      path: error.path().unwrap_or(root).to_path_buf(),
      source: io::Error::from(error),
    })?;
    let path = entry.path();
    let relative_path = path.strip_prefix(root).unwrap_or(path);
    if is_path_hidden(relative_path) {
      continue;
    }

    if !entry.file_type().is_file() {
      continue;
    }

    if path.extension() != Some(OsStr::new(INTERFACE_EXTENSION)) {
      continue;
    }

    inputs.push(path.to_path_buf());
  }

  debug!("found {} interface files under {:?}", inputs.len(), root);
  Ok(inputs)
}

fn is_path_hidden<P: AsRef<Path>>(path: P) -> bool {
  path.as_ref().components().any(|component| {
    if let Some(name) = component.as_os_str().to_str() {
      name.starts_with('.')
    } else {
      false
    }
  })
}

#[cfg(test)]
mod tests {
  use test_log::test;

  use super::*;

  const PING: &str = "interface org.example.ping\n\nmethod Ping(ping: string) -> (pong: string)\n";

  #[test]
  fn writes_unit_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("org.example.ping.varlink");
    fs::write(&input, PING).unwrap();

    let output = generate_file(&input, &Builtin).unwrap();
    assert_eq!(output, dir.path().join("orgexampleping.go"));

    let source = fs::read_to_string(&output).unwrap();
    assert!(source.contains("package orgexampleping\n"));
  }

  #[cfg(unix)]
  #[test]
  fn output_is_not_world_accessible() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("org.example.ping.varlink");
    fs::write(&input, PING).unwrap();

    let output = generate_file(&input, &Builtin).unwrap();
    let mode = fs::metadata(&output).unwrap().permissions().mode();
    assert_eq!(mode & 0o007, 0, "{:o}", mode);
    assert_eq!(mode & 0o600, 0o600, "{:o}", mode);
  }

  #[test]
  fn writes_nothing_on_parse_failure() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.varlink");
    fs::write(&input, "interface org.example.broken\nmethod Ping(ping: string) ->\n").unwrap();

    let error = generate_file(&input, &Builtin).unwrap_err();
    assert!(matches!(error, GenerateError::Parse(_)), "{:?}", error);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
  }

  #[test]
  fn reports_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let error = generate_file(&dir.path().join("missing.varlink"), &Builtin).unwrap_err();
    assert!(matches!(error, GenerateError::Read { .. }), "{:?}", error);
  }

  #[test]
  fn collects_interface_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::create_dir_all(dir.path().join(".hidden")).unwrap();
    fs::write(dir.path().join("b.varlink"), PING).unwrap();
    fs::write(dir.path().join("nested/a.varlink"), PING).unwrap();
    fs::write(dir.path().join(".hidden/c.varlink"), PING).unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();

    let inputs = collect_inputs(dir.path()).unwrap();
    assert_eq!(inputs, vec![dir.path().join("b.varlink"), dir.path().join("nested/a.varlink")]);

    let single = dir.path().join("b.varlink");
    assert_eq!(collect_inputs(&single).unwrap(), vec![single.clone()]);
  }
}
