//! Disk-backed storage for oversized request bodies

pub mod temporary;

pub use temporary::{Spillover, TemporaryStore};
