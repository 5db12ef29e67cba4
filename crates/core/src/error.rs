//! Crate error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::Model;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("{}: ROM image is {actual} bytes, {model} expects {expected}", path.display())]
    RomSize {
        path: PathBuf,
        model: Model,
        expected: usize,
        actual: usize,
    },
    #[error("unknown calculator model tag {0:#06x}")]
    UnknownModel(u32),
    #[error("could not switch to {requested}: {source}")]
    ModelRefused {
        requested: Model,
        /// Model still active after the failed switch.
        current: Option<Model>,
        #[source]
        source: Box<Error>,
    },
    #[error("snapshot truncated while reading {0}")]
    Truncated(&'static str),
    #[error("no calculator model is active")]
    NotStarted,
}
