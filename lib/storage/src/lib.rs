//! In-memory quad storage for Quadflow.
//!
//! [MemoryQuadStore] keeps per-graph SPO/POS/OSP hash indexes behind a
//! copy-on-write root, so read snapshots are cheap `Arc` clones and stay
//! consistent while writers commit.

mod memory;

pub use memory::MemoryQuadStore;
