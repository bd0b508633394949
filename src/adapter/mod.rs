//! Conversions between workspace arrays and the flat value arrays of hub parameters.

pub mod array;
#[cfg(feature = "arrow")]
pub mod batch;
pub mod sampled_function;
pub mod time_tag;
