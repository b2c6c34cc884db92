use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MountError {
    #[error("invalid mount specification: {0}")]
    InvalidSpec(String),

    #[error("jail root unavailable for jail {0}")]
    RootUnavailable(String),
}
