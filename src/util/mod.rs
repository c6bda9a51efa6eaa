//! Utility modules for workstate-rs.

mod atomic_write;

pub use atomic_write::{TEMP_FILE_PREFIX, is_temp_file_name, write_atomic};
