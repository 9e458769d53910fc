//! Benchmark support crate for fixtura.
//!
//! Builds synthetic schemas of controllable shape so Criterion benchmarks can
//! measure population throughput as depth, breadth and selector count grow.

pub mod error;
pub mod params;
pub mod schemas;
