//! amp CLI library.
//!
//! The command implementations live here so they can be exercised from
//! tests; the `amp` binary is a thin clap layer on top.

pub mod commands;
