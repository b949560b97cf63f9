//! # Configuration Module
//!
//! Centralizes the capture-format constants so interdependent values stay
//! in one place. The storage layer derives directory geometry from these
//! constants; changing one usually means revisiting its dependents, which
//! are documented next to each value.
//!
//! - [`constants`]: All format constants with dependency documentation

pub mod constants;
pub use constants::*;
