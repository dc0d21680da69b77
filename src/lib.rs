//! # Push-based pipelines with cooperative backpressure
//!
//! This crate provides a unidirectional data-flow protocol connecting a
//! producer, an arbitrary chain of transformation stages, and a consumer,
//! designed for Rust's ownership model without an async runtime. A stage
//! is never forced to buffer unboundedly: the moment one has to hold an
//! item back, it pauses its upstream, and it resumes it once the backlog
//! clears. Everything happens with plain synchronous calls on one thread.
//!
//! ## Core Concepts
//!
//! - **Fount**: Produces items into a pipeline and honors pause/resume signals
//! - **Drain**: Consumes items and may signal its fount to pause
//! - **Pump**: User transformation logic plugged into a tube
//! - **Tube**: The engine binding a pump to its neighbors, owning all
//!   buffering and pause bookkeeping
//! - **Pipeline**: A chain of tubes acting as one segment
//!
//! ## Example
//!
//! ```rust
//! use siphon::prelude::*;
//!
//! fn main() -> siphon::Result<()> {
//!     let fount = IterFount::new(1..=5i64);
//!     let tube = Tube::new(MapPump::new(|x: i64| x * 2));
//!     let drain = CollectDrain::new();
//!
//!     fount.flow_to(&tube.drain())?.flow_to(&drain)?;
//!
//!     assert_eq!(drain.items(), vec![2, 4, 6, 8, 10]);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod impls;
pub mod kind;
pub mod pipeline;
pub mod traits;
pub mod tube;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::impls::{drains::*, founts::*, pumps::*};
    pub use crate::kind::{ExactMatch, Kind, KindQuery, KindRegistry};
    pub use crate::pipeline::{Pipeline, PipelineFount};
    pub use crate::traits::{
        Chainable, Drain, DrainRef, Fount, FountExt, FountRef, Progress, Pump,
    };
    pub use crate::tube::{Tube, TubeDrain, TubeFount};
    pub use crate::util::{drain_from_fn, fount_from_fn, pump_from_fn};
}

// Re-export main error type
pub use error::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
