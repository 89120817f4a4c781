//! Command-line interface: argument parsing and the thin adapters around the
//! pipeline (the refresh job and the report read path).

mod commands;

pub use commands::*;
