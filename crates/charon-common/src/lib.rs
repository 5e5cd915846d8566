//! Shared utilities for Charon binaries.

pub mod logging;
