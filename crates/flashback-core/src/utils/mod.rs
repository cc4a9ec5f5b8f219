//! Small helpers shared by the storage layers.

pub mod format;
pub mod fs;

pub use format::{age_display, encode_file_key};
pub use fs::{write_atomic, write_atomic_async};
