#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for extbundle.
//!
//! Pure helpers with no logging dependencies: writing build outputs,
//! turning paths into asset identifiers, and content digests used to decide
//! whether an output was re-emitted.

pub mod fs;
pub mod hash;
