//! Replication transport seam and wire values.

pub mod log;
pub mod update;

pub use log::{MemoryLog, NullLog, ReplicatedLog};
pub use update::{StateSnapshot, Update};
