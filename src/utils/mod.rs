//! Utility functions and helpers

pub mod atomic;

pub use atomic::{atomic_write, atomic_write_with, cleanup_temp_files};
