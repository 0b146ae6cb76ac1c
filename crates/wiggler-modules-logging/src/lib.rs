//! Asynchronous file logger.
//!
//! Producers on any thread call [`Logger::write`]; a single writer thread
//! appends lines to the destination in arrival order.

mod error;
mod logger;
mod writer;

pub use crate::error::{LoggerError, LoggerResult};
pub use crate::logger::Logger;
