//! Benchmark utilities for the Rusty World ECS.
//!
//! Provides a standard component set and seeded world populations shared by the criterion
//! benches.
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_world_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_world_bench -- spawn
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod components;
