//! Per-entity bookkeeping of outstanding conversions.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;

use super::error::QueueError;
use crate::converter::ConversionTarget;
use crate::media::{JobPhase, MediaId};
use crate::stream::ProgressiveStreamHandle;

/// State of one outstanding conversion.
#[derive(Debug, Clone)]
pub struct TrackedConversion {
    pub cancel: CancellationToken,
    pub phase: JobPhase,
    pub stream: Option<Arc<ProgressiveStreamHandle>>,
}

/// Guarantees at most one outstanding conversion per entity.
#[derive(Debug, Default)]
pub struct ConversionTracker {
    entries: RwLock<HashMap<MediaId, TrackedConversion>>,
}

impl ConversionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a queued conversion. Fails if one is already tracked.
    pub fn try_track(&self, id: MediaId, cancel: CancellationToken) -> Result<(), QueueError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&id) {
            return Err(QueueError::AlreadyConverting { id });
        }
        entries.insert(
            id,
            TrackedConversion {
                cancel,
                phase: JobPhase::queued(),
                stream: None,
            },
        );
        Ok(())
    }

    pub fn untrack(&self, id: MediaId) -> Option<TrackedConversion> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    pub fn is_tracked(&self, id: MediaId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn phase(&self, id: MediaId) -> Option<JobPhase> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|entry| entry.phase)
    }

    /// Records progress. Returns false when `id` is not tracked.
    pub fn set_progress(&self, id: MediaId, target: ConversionTarget, percent: f32) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(&id) {
            Some(entry) => {
                entry.phase = JobPhase {
                    percent: percent.clamp(0.0, 100.0),
                    target,
                };
                true
            }
            None => false,
        }
    }

    pub fn set_stream(&self, id: MediaId, stream: Option<Arc<ProgressiveStreamHandle>>) {
        if let Some(entry) = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            entry.stream = stream;
        }
    }

    pub fn stream(&self, id: MediaId) -> Option<Arc<ProgressiveStreamHandle>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(|entry| entry.stream.clone())
    }

    /// Fires the cancellation token of `id`'s conversion.
    pub fn cancel(&self, id: MediaId) -> bool {
        match self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for entry in self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
        {
            entry.cancel.cancel();
        }
    }

    pub fn ids(&self) -> Vec<MediaId> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_second_conversion_for_same_entity() {
        let tracker = ConversionTracker::new();
        let id = MediaId::new();

        tracker.try_track(id, CancellationToken::new()).unwrap();
        let second = tracker.try_track(id, CancellationToken::new());
        assert_eq!(second, Err(QueueError::AlreadyConverting { id }));
        assert_eq!(tracker.len(), 1);

        tracker.untrack(id);
        assert!(tracker.try_track(id, CancellationToken::new()).is_ok());
    }

    #[test]
    fn test_phase_starts_queued() {
        let tracker = ConversionTracker::new();
        let id = MediaId::new();
        tracker.try_track(id, CancellationToken::new()).unwrap();

        let phase = tracker.phase(id).unwrap();
        assert!(phase.percent < 0.0);

        assert!(tracker.set_progress(id, ConversionTarget::Stream, 40.0));
        let phase = tracker.phase(id).unwrap();
        assert_eq!(phase.percent, 40.0);
        assert_eq!(phase.target, ConversionTarget::Stream);

        assert!(!tracker.set_progress(MediaId::new(), ConversionTarget::Stream, 1.0));
    }

    #[test]
    fn test_cancel_fires_token() {
        let tracker = ConversionTracker::new();
        let id = MediaId::new();
        let token = CancellationToken::new();
        tracker.try_track(id, token.clone()).unwrap();

        assert!(tracker.cancel(id));
        assert!(token.is_cancelled());
        assert!(!tracker.cancel(MediaId::new()));
    }

    #[test]
    fn test_concurrent_tracking_admits_one() {
        let tracker = ConversionTracker::new();
        let id = MediaId::new();

        let admitted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| tracker.try_track(id, CancellationToken::new()).is_ok()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });
        assert_eq!(admitted, 1);
    }
}
