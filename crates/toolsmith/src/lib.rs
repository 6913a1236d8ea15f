//! toolsmith command-line interface.
//!
//! The binary is a thin shell over [`app::execute`]: parse arguments,
//! initialise tracing, wire signals to the cancellation token, print the
//! result and map failures to exit codes.

pub mod app;
pub mod cli;
pub mod shutdown;
pub mod tracing;
