use std::io;
use std::path::PathBuf;

use thiserror::Error;
use varlinkgen_parser::SyntaxError;

#[derive(Debug, Error)]
pub enum GenerateError {
  #[error("failed to parse interface: {0}")]
  Parse(#[from] SyntaxError),

  #[error("generated code for package {package} is not valid Go: {message}")]
  Format {
    package: String,
    message: String,
  },

  #[error("failed to run formatter '{program}': {source}")]
  FormatterUnavailable {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("failed to read file '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write file '{}': {source}", path.display())]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}
