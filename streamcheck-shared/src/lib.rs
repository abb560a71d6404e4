#![cfg_attr(not(test), forbid(unsafe_code))]
#![warn(clippy::pedantic)]

//! Shared configuration and models for the `StreamCheck` smoke test.

pub mod config;
pub mod models;
