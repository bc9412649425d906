//! Library side of the `etax` command-line validator.

pub mod logging;
pub mod report;
