pub mod limit;
pub mod resolve;
