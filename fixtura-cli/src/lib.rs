//! Support library for the fixtura CLI binary.
//!
//! Exposes the command pipeline and logging setup so integration tests can
//! drive `generate` without spawning a subprocess.

pub mod cli;
pub mod logging;
