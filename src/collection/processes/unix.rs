//! Unix-specific helpers shared by every collector.

mod user_table;

pub use self::user_table::UserTable;
