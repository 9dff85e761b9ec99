//! Utility module - fan-out engine, logging, payload validation

pub mod fanout;
pub mod logger;
pub mod validation;

pub use fanout::{FanOutPolicy, GatherOutcome, PartitionFailure};
pub use logger::{init_logger, init_logger_with_file};
