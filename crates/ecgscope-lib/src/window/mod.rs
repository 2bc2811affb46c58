pub mod decimation;
pub mod fetch;

pub use decimation::*;
pub use fetch::*;
