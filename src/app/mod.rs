//! Binary-side composition: tracing setup and exit codes.

pub(crate) mod exit_handler;
pub(crate) mod terminal;
