use std::{fmt, io, path::PathBuf};

/// All errors that can occur while exporting a model.
#[derive(Debug)]
pub enum ExportError {
    /// Invalid export configuration, caught before tracing.
    InvalidConfig(String),
    /// The example input does not fit the model.
    Shape {
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    /// A parameter tensor could not be read back from the backend.
    Tensor(String),
    /// Constant folding hit an inconsistent graph.
    Fold(String),
    /// Writing the artifact failed.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid export config: {msg}"),
            Self::Shape { expected, found } => {
                write!(f, "example input has shape {found:?}, model expects {expected:?}")
            }
            Self::Tensor(msg) => write!(f, "tensor read failed: {msg}"),
            Self::Fold(msg) => write!(f, "constant folding failed: {msg}"),
            Self::Io { path, source } => write!(f, "cannot write {}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// All errors that can occur while reading an exported model back.
#[derive(Debug)]
pub enum InspectError {
    Io { path: PathBuf, source: io::Error },
    Decode(prost::DecodeError),
    /// The file decoded but is not a usable ONNX model.
    Malformed(String),
}

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Decode(e) => write!(f, "not an ONNX model: {e}"),
            Self::Malformed(msg) => write!(f, "malformed ONNX model: {msg}"),
        }
    }
}

impl std::error::Error for InspectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Decode(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }
}

impl From<prost::DecodeError> for InspectError {
    fn from(e: prost::DecodeError) -> Self {
        Self::Decode(e)
    }
}
