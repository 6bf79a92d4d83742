pub mod error;
pub mod math;
pub mod model;
pub mod operations;
pub mod tessellation;

pub use error::{BevelisError, Result};
