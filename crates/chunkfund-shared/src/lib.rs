pub mod constants;
pub mod error;
pub mod format;
pub mod settlement;
pub mod types;
