//! Configuration and persisted calibration data
//!
//! Procedure tuning lives in plain structs with `Default` impls. The
//! calibration results are stored in flash as postcard-serialized records.

pub mod calibration;
pub mod store;
pub mod types;

pub use calibration::*;
pub use store::*;
pub use types::*;
