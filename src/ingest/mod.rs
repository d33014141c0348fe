pub mod client;
pub mod flatten;
pub mod types;
