//! Concurrency building blocks for long-running async services.
//!
//! - [`Supervisor`]: spawns tracked tokio tasks that share one cancellation
//!   token, contains their panics, and drains them on shutdown.
//! - [`Runner`]: a wait-group style task group with a shared stop signal.
//! - [`FastId`]: a lock-free generator of 64-bit, time-ordered identifiers
//!   built from a timestamp tick, a per-tick sequence and a node id.
//!
//! ```
//! use spindle::{FastId, FastIdConfig};
//!
//! let generator = FastId::new(FastIdConfig::default().with_node_id(7)).unwrap();
//! let a = generator.next_id();
//! let b = generator.next_id();
//! assert!(a < b);
//! assert_eq!(generator.get_node(a), 7);
//! ```

mod error;
mod fastid;
mod supervisor;
mod time;

pub use crate::error::*;
pub use crate::fastid::*;
pub use crate::supervisor::*;
pub use crate::time::*;
