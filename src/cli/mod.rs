pub mod commands;
pub mod counters;
pub mod io;
pub mod opts;

/// Integer type used for every count and matrix cell.
pub type BigCount = u64;
