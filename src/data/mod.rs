//! Tabular input: loading CSV files and removing duplicate rows.

mod clean;
mod loader;
mod table;

pub use clean::drop_duplicates;
pub use loader::{load_csv, read_csv};
pub use table::{Table, Value};
