use std::fmt;

/// All errors that abort a training run.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// Invalid configuration, caught before the first epoch.
    InvalidConfig(String),
    /// The loss stopped being a finite number.
    Diverged { epoch: usize, loss: f32 },
    /// A tensor could not be read back from the backend.
    Tensor(String),
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid training config: {msg}"),
            Self::Diverged { epoch, loss } => {
                write!(f, "training diverged at epoch {epoch} (loss = {loss})")
            }
            Self::Tensor(msg) => write!(f, "tensor read failed: {msg}"),
        }
    }
}

impl std::error::Error for TrainingError {}
