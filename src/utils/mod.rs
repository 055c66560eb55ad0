//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `popsub_delivery` crate.
//!
//! It centralizes the error types shared by the transport and delivery layers
//! and the tracing setup used by the CLI.

pub mod error;
pub mod logging;
