//! Typed provider documents
//!
//! Field names follow the provider's document schema; the injected
//! [`Codec`](crate::codec::Codec) maps them onto the wire format.

pub mod compute;
pub mod network;
pub mod storage;

pub use compute::*;
pub use network::*;
pub use storage::*;
