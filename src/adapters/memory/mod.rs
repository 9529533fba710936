//! In-memory adapters for tests and offline runs: canned transport rows, a
//! map-backed store, and a settable clock.

pub mod clock;
pub mod storage;
pub mod transport;

pub use clock::FixedClock;
pub use storage::MemoryStore;
pub use transport::StaticTransport;
