//! Shared building blocks: frames, configuration, errors and small numeric helpers.

pub(crate) mod config;
pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod math;
