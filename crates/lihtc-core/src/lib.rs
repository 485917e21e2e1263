pub mod capital_stack;
pub mod cashflow;
pub mod equity;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod policy;
pub mod time_value;
pub mod types;

pub use error::LihtcError;
pub use types::*;

/// Standard result type for all underwriting operations
pub type LihtcResult<T> = Result<T, LihtcError>;
