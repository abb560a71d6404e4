//! # Configuration
//!
//! This module contains the configuration structures for a stream check run
//! and the logic for loading them from files and the environment.

pub mod check;
