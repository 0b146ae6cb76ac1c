use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("cannot open log destination {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot spawn log writer thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type LoggerResult<T> = Result<T, LoggerError>;
