//! Most recently refreshed label list, shared between the poller and scrapes
//!
//! The list lives behind an `Arc<[LabelSummary]>` that is swapped whole, so a
//! reader gets either the previous list or the new one. Locks are held only
//! for the pointer copy or swap, never across remote calls.

use std::sync::{Arc, PoisonError, RwLock};

use crate::models::LabelSummary;

type Labels = Arc<[LabelSummary]>;

/// Create a connected writer/reader pair over an empty snapshot
pub fn label_snapshot() -> (SnapshotWriter, SnapshotReader) {
    let current: Arc<RwLock<Labels>> = Arc::new(RwLock::new(Arc::from(Vec::new())));
    (
        SnapshotWriter {
            current: Arc::clone(&current),
        },
        SnapshotReader { current },
    )
}

/// The single write handle. Not `Clone`, so only its owner can replace labels.
#[derive(Debug)]
pub struct SnapshotWriter {
    current: Arc<RwLock<Labels>>,
}

impl SnapshotWriter {
    /// Atomically swap in a new complete label list
    pub fn replace(&mut self, labels: Vec<LabelSummary>) {
        let labels: Labels = Arc::from(labels);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = labels;
    }

    /// A reader over the same snapshot
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            current: Arc::clone(&self.current),
        }
    }
}

/// Cheap, cloneable read handle
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    current: Arc<RwLock<Labels>>,
}

impl SnapshotReader {
    /// The label list visible at call time
    pub fn read(&self) -> Labels {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }
}
