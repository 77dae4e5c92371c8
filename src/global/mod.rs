//! Per-user locations used when nothing more specific is configured.

pub mod utils;
