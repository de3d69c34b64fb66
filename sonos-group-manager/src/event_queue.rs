//! Per-source event buffering between the subscription transport and the
//! poll loop.

use std::collections::{BTreeMap, VecDeque};

use parking_lot::Mutex;

use crate::notification::Notification;
use crate::topology::ZoneId;

/// One FIFO per monitored source
///
/// Queues are created up front; the set of sources never changes. Producers
/// on any thread may `enqueue` concurrently with the poll loop's `drain`.
#[derive(Debug)]
pub struct EventQueue<T = Notification> {
    queues: BTreeMap<ZoneId, Mutex<VecDeque<T>>>,
}

impl<T> EventQueue<T> {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ZoneId>,
    {
        Self {
            queues: sources
                .into_iter()
                .map(|s| (s.into(), Mutex::new(VecDeque::new())))
                .collect(),
        }
    }

    /// Buffer `payload` under `source`; returns false (and drops it) for an
    /// unknown source
    pub fn enqueue(&self, source: &str, payload: T) -> bool {
        match self.queues.get(source) {
            Some(queue) => {
                queue.lock().push_back(payload);
                true
            }
            None => {
                tracing::debug!(source, "dropping event from unmonitored source");
                false
            }
        }
    }

    /// Take everything buffered so far
    ///
    /// Each source's queue is emptied completely before the next one, in
    /// source order. Order within a source is arrival order; across sources
    /// it is not.
    pub fn drain(&self) -> Vec<(ZoneId, T)> {
        let mut drained = Vec::new();
        for (source, queue) in &self.queues {
            let mut queue = queue.lock();
            drained.extend(queue.drain(..).map(|payload| (source.clone(), payload)));
        }
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(|q| q.lock().is_empty())
    }

    /// Number of buffered payloads across all sources
    pub fn len(&self) -> usize {
        self.queues.values().map(|q| q.lock().len()).sum()
    }

    pub fn sources(&self) -> impl Iterator<Item = &ZoneId> {
        self.queues.keys()
    }
}
