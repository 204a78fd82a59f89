//! Time-of-day progression across a timelapse.

pub(crate) mod scheduler;
