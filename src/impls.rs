//! Concrete implementations of founts, pumps, and drains.

pub mod drains;
pub mod founts;
pub mod pumps;

// Re-export commonly used implementations
pub use drains::*;
pub use founts::*;
pub use pumps::*;
