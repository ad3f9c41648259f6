pub mod collector;
pub mod infra;
pub mod runtime;
