#![deny(clippy::all)]
#![warn(clippy::pedantic)]

//! Benchmark harness for extbundle.
//!
//! Run benchmarks with: `cargo bench -p extbundle-bench`
//!
//! The manifest transform runs on every rebuild that touches the manifest and
//! output hashing on every rebuild, so both are measured here.
