//! Command handlers for the heapview CLI
//!
//! Each subcommand has its own module with a handler function.

pub mod dump;
pub mod owned;
