//! Host-side tooling for a UWB ranging testbed. Nodes built around DW1000
//! class radios run double-sided two-way ranging (DS-TWR) with each other
//! and print their results, and sometimes the raw radio timestamps, on
//! their serial consoles. This crate reads those consoles, turns the
//! telemetry into per-pair measurement series, and evaluates them.
//!
//! The pieces, roughly in the order data flows through them:
//!
//! - [serial_source] and [synthetic_source] produce `(stream, line)` pairs,
//!   from real hardware or from a simulated testbed.
//! - [telemetry] decodes each line, [collector] sorts the results into the
//!   [measurement_set]s of a run.
//! - [timestamp] and [ranging] compute distances from raw 40-bit
//!   timestamps, correcting for counter overflow.
//! - [outlier], [statistics] and [aggregation] filter the series and
//!   summarise them, optionally against surveyed ground truth.
//!
//! Distances always carry their [units::Unit]: raw radio ticks,
//! centimeters or meters.

#![warn(missing_docs)]
#[allow(missing_docs)]
pub mod args;
pub mod aggregation;
pub mod collector;
pub mod config;
pub mod error;
pub mod gui;
pub mod line_source;
pub mod measurement_set;
pub mod outlier;
pub mod ranging;
pub mod serial_source;
pub mod statistics;
pub mod synthetic_source;
pub mod telemetry;
pub mod timestamp;
pub mod units;
