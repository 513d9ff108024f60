//! StratoFlow Cloud orchestration primitives
//!
//! Provider engines drive long-running, asynchronous cloud mutations. This
//! crate holds the pieces every such engine needs regardless of the
//! provider behind it:
//!
//! - [`Deadline`]: an absolute instant handed to every blocking call
//! - [`await_state`]: the shared "poll until the resource reaches a state" loop
//! - [`SerializationLocks`]: fair per-domain mutation gates
//! - [`ActionType`]: what an idempotent lifecycle call did
//! - [`CloudError`]: the orchestration error taxonomy
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │             stratoflow-cloud-azure               │
//! │   provisioning saga · topology merger · disks   │
//! │        lifecycle ops · operation poller         │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               stratoflow-cloud                   │
//! │  ┌──────────┐ ┌────────────┐ ┌───────────────┐  │
//! │  │ Deadline │ │ await_state│ │ Serialization │  │
//! │  │          │ │ PollConfig │ │     Locks     │  │
//! │  └──────────┘ └────────────┘ └───────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod deadline;
pub mod error;
pub mod lock;
pub mod poll;

// Re-exports
pub use action::ActionType;
pub use deadline::Deadline;
pub use error::{CloudError, Result};
pub use lock::{LockDomain, LockGuard, SerializationLocks};
pub use poll::{PollConfig, PollStep, await_state};
