pub mod diff;
pub mod probe;
pub mod types;
