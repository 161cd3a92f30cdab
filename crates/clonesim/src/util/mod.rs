pub mod format;
pub mod io;

pub use format::{bar, format_count, format_percentage, format_value};
pub use io::{atomic_write, atomic_write_bytes};
