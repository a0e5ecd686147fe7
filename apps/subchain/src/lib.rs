//! # subchain
//!
//! Library side of the `subchain` binary, exposed so the command
//! implementations can be driven from integration tests.

pub mod cli;
