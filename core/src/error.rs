use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("Serde operation failed: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("The list is full, it can hold at most {capacity} entries")]
    CapacityExceeded { capacity: usize },
    #[error("Index {index} is out of range for a list of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("The presence transport cannot be established: {0}")]
    TransportUnavailable(io::Error),
    #[error("The self-hosted access point cannot be started: {0}")]
    AccessPointUnavailable(String),
    #[error("Malformed announce message: {0}")]
    MalformedAnnounce(&'static str),
    #[error("The transition from the current runnable state to the next one is forbidden")]
    WrongRunnableState,
    #[error("Other error occured: {0}")]
    Other(String),
}
