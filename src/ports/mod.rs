//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the inspection core and an
//! external system (remote query API, key/value storage, time).
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod storage;
pub mod transport;

pub use clock::Clock;
pub use storage::KeyValueStore;
pub use transport::{MetadataRequest, QuerySpec, Transport, TransportFuture};
