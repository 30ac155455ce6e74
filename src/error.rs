//! Error types for the trace recorder
//!
//! Only fatal conditions are errors. A rename attempted after the session
//! opened is a warning, and unknown categories or subjects met during a mark
//! are registered on the spot.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ids::ObjectId;

/// Errors raised by a [`TraceSession`](crate::session::TraceSession)
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("Cannot open trace file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write trace record: {0}")]
    Write(#[from] io::Error),

    #[error("Module {object} is not registered")]
    UnregisteredModule { object: ObjectId },

    #[error("Trace session is closed")]
    Closed,

    #[error("No shared trace session is installed on this thread")]
    NotInstalled,

    #[error("Malformed record nesting: {0}")]
    Nesting(String),

    #[error("Invalid tracer configuration {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, TraceError>;
