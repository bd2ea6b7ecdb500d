//! Shared vocabulary for fslite: status codes, the `Status` error type,
//! strongly-typed identifiers and node status.

#[allow(non_snake_case)]
pub mod status_code;

pub mod status;
pub mod result;

#[macro_use]
pub mod strong_type;

pub mod ids;

// Re-export commonly used items at the crate root.
pub use ids::*;
pub use result::{Result, make_error, make_error_msg};
pub use status::Status;
pub use status_code::*;
