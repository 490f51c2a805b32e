//! The media catalog.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::events::CatalogEvent;
use super::naming::NamingConvention;
use crate::media::{
    derive_status, CompanionState, JobPhase, MediaEntity, MediaId, MediaRecord, Status,
    StatusInputs, StatusOutcome,
};
use crate::store::DualKeyStore;

const EVENT_CAPACITY: usize = 256;

/// Every known media entity, reachable by id and by path.
pub struct MediaCatalog {
    store: DualKeyStore<MediaId, PathBuf, Arc<MediaEntity>>,
    naming: NamingConvention,
    events: broadcast::Sender<CatalogEvent>,
}

impl MediaCatalog {
    pub fn new(naming: NamingConvention) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: DualKeyStore::new(),
            naming,
            events,
        }
    }

    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    /// Receives every change raised after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: CatalogEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    pub fn lookup_path(&self, path: &Path) -> Option<Arc<MediaEntity>> {
        self.store.get_by_key(&path.to_path_buf())
    }

    pub fn lookup_id(&self, id: MediaId) -> Option<Arc<MediaEntity>> {
        self.store.get_by_id(&id)
    }

    /// Point-in-time copy of every entity.
    pub fn entities(&self) -> Vec<Arc<MediaEntity>> {
        self.store.values()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.store.keys()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Returns the entity for `path`, building it with `factory` if unknown.
    ///
    /// `factory` probes the file; `None` means the file is not media and no
    /// entity is created. The flag is true when a new entity was inserted.
    pub async fn add_or_refresh<F, Fut>(
        &self,
        path: &Path,
        factory: F,
    ) -> Option<(Arc<MediaEntity>, bool)>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Option<MediaRecord>>,
    {
        if let Some(existing) = self.lookup_path(path) {
            return Some((existing, false));
        }

        let Some(mut record) = factory(path.to_path_buf()).await else {
            debug!(path = %path.display(), "No entity created");
            return None;
        };
        record.path = path.to_path_buf();
        record.companion = None;

        Some(self.insert(record))
    }

    /// Inserts a ready-made record and resolves its companion.
    ///
    /// If another task inserted the same path first, that entity is returned
    /// instead.
    pub fn insert(&self, record: MediaRecord) -> (Arc<MediaEntity>, bool) {
        let path = record.path.clone();
        let entity = Arc::new(MediaEntity::new(record));

        match self
            .store
            .get_or_add(entity.id(), path.clone(), Arc::clone(&entity))
        {
            Ok((stored, true)) => {
                info!(id = %stored.id(), path = %path.display(), "Added media");
                self.emit(CatalogEvent::Added {
                    id: stored.id(),
                    path,
                });
                self.resolve_companion(&stored);
                (stored, true)
            }
            Ok((stored, false)) => (stored, false),
            Err(e) => match self.lookup_path(&path) {
                Some(existing) => {
                    debug!(path = %path.display(), error = %e, "Lost insert race");
                    (existing, false)
                }
                None => {
                    // Only the id collided.
                    let mut record = entity.snapshot();
                    record.id = MediaId::new();
                    self.insert(record)
                }
            },
        }
    }

    /// Removes `entity`, clearing both sides of its companion link first.
    pub fn remove(&self, entity: &MediaEntity) -> bool {
        self.unlink(entity);
        let path = entity.path();
        match self.store.try_remove(&entity.id(), &path) {
            Some(_) => {
                info!(id = %entity.id(), path = %path.display(), "Removed media");
                self.emit(CatalogEvent::Removed {
                    id: entity.id(),
                    path,
                });
                true
            }
            None => false,
        }
    }

    pub fn remove_path(&self, path: &Path) -> Option<Arc<MediaEntity>> {
        let entity = self.lookup_path(path)?;
        self.remove(&entity).then_some(entity)
    }

    /// Moves `entity` to `new_path`, keeping its id.
    ///
    /// Whatever was registered under `new_path` is displaced and returned.
    pub fn relocate(&self, entity: &Arc<MediaEntity>, new_path: &Path) -> Vec<Arc<MediaEntity>> {
        let old_path = entity.path();
        let name = self.naming.display_name(new_path);
        entity.update(|r| {
            r.path = new_path.to_path_buf();
            r.name = name;
        });

        let displaced: Vec<_> = self
            .store
            .add_or_update(entity.id(), new_path.to_path_buf(), Arc::clone(entity))
            .into_iter()
            .filter(|other| other.id() != entity.id())
            .collect();

        for other in &displaced {
            self.unlink(other);
            self.emit(CatalogEvent::Removed {
                id: other.id(),
                path: other.path(),
            });
        }

        info!(
            id = %entity.id(),
            from = %old_path.display(),
            to = %new_path.display(),
            "Relocated media"
        );
        self.emit(CatalogEvent::Updated { id: entity.id() });
        displaced
    }

    /// Links `entity` to its companion, if one can be found.
    ///
    /// Deterministic candidate paths are tried first. A converted file then
    /// looks for an original with the same stem and any extension, and
    /// finally everything falls back to a linear scan by similarity key.
    /// The first unlinked match wins.
    pub fn resolve_companion(&self, entity: &Arc<MediaEntity>) -> Option<Arc<MediaEntity>> {
        if let Some(current) = entity.companion().and_then(|id| self.lookup_id(id)) {
            return Some(current);
        }

        let path = entity.path();
        let available = |other: &Arc<MediaEntity>| {
            other.id() != entity.id()
                && other
                    .companion()
                    .is_none_or(|id| id == entity.id() || self.lookup_id(id).is_none())
        };

        let by_name = self
            .naming
            .companion_candidates(&path)
            .into_iter()
            .filter_map(|candidate| self.lookup_path(&candidate))
            .find(|other| available(other));

        let by_stem = || {
            if !self.naming.is_converted(&path) {
                return None;
            }
            self.store
                .values()
                .into_iter()
                .filter(|other| available(other))
                .find(|other| self.naming.is_original_of(&path, &other.path()))
        };

        let found = by_name.or_else(by_stem).or_else(|| {
            let key = entity.read(MediaRecord::similarity_key);
            self.store
                .values()
                .into_iter()
                .filter(|other| available(other))
                .find(|other| other.read(MediaRecord::similarity_key) == key)
        });

        let companion = found?;
        self.link(entity, &companion);
        Some(companion)
    }

    /// Symmetrically links two entities, dropping any previous partners.
    pub fn link(&self, a: &MediaEntity, b: &MediaEntity) {
        if a.id() == b.id() {
            return;
        }
        for (side, other) in [(a, b), (b, a)] {
            if let Some(previous) = side.companion() {
                if previous != other.id() {
                    if let Some(old) = self.lookup_id(previous) {
                        if old.companion() == Some(side.id()) {
                            old.set_companion(None);
                        }
                    }
                }
            }
        }
        a.set_companion(Some(b.id()));
        b.set_companion(Some(a.id()));

        debug!(a = %a.id(), b = %b.id(), "Linked companions");
        self.emit(CatalogEvent::CompanionLinked {
            id: a.id(),
            companion: b.id(),
        });
    }

    /// Clears both sides of `entity`'s companion link.
    pub fn unlink(&self, entity: &MediaEntity) -> Option<Arc<MediaEntity>> {
        let companion_id = entity.companion()?;
        entity.set_companion(None);
        let companion = self.lookup_id(companion_id)?;
        if companion.companion() == Some(entity.id()) {
            companion.set_companion(None);
            self.emit(CatalogEvent::Updated { id: companion.id() });
        }
        Some(companion)
    }

    /// Re-derives the status of `entity`, and of its companion when the
    /// state machine asks for it.
    ///
    /// `phase_of` reports the tracked job of an entity, if any.
    pub fn refresh_status_with(
        &self,
        entity: &MediaEntity,
        phase_of: &dyn Fn(MediaId) -> Option<JobPhase>,
    ) -> Status {
        let companion = entity.companion().and_then(|id| self.lookup_id(id));
        let outcome = Self::derive_for(entity, companion.as_deref(), phase_of(entity.id()));
        self.apply_status(entity, outcome.status);

        if outcome.refresh_companion {
            if let Some(companion) = companion {
                let theirs = Self::derive_for(&companion, Some(entity), phase_of(companion.id()));
                self.apply_status(&companion, theirs.status);
            }
        }
        outcome.status
    }

    /// Re-derives every entity, asking `phase_of` for its job state.
    pub fn refresh_all_with(&self, phase_of: &dyn Fn(MediaId) -> Option<JobPhase>) {
        for entity in self.entities() {
            self.refresh_status_with(&entity, phase_of);
        }
    }

    fn apply_status(&self, entity: &MediaEntity, status: Status) {
        if entity.set_status(status) {
            debug!(id = %entity.id(), %status, "Status changed");
            self.emit(CatalogEvent::StatusChanged {
                id: entity.id(),
                status,
            });
        }
    }

    fn derive_for(
        entity: &MediaEntity,
        companion: Option<&MediaEntity>,
        job: Option<JobPhase>,
    ) -> StatusOutcome {
        let (acceptable, subtitles_complete, subtitles_burned) =
            entity.read(|r| (r.playable, r.subtitles_complete(), r.burn_subtitles));
        let companion = companion.map(|other| {
            let preferred_over_self = entity.read(|mine| other.read(|theirs| mine.yields_to(theirs)));
            CompanionState {
                status: other.status(),
                preferred_over_self,
            }
        });
        derive_status(&StatusInputs {
            acceptable,
            subtitles_complete,
            subtitles_burned,
            companion,
            job,
        })
    }

    pub(crate) fn store(&self) -> &DualKeyStore<MediaId, PathBuf, Arc<MediaEntity>> {
        &self.store
    }
}

impl Default for MediaCatalog {
    fn default() -> Self {
        Self::new(NamingConvention::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(path: &str, duration_secs: u64, playable: bool) -> MediaRecord {
        let naming = NamingConvention::default();
        let path = PathBuf::from(path);
        let mut record = MediaRecord::new(&path, naming.display_name(&path));
        record.duration_secs = duration_secs;
        record.playable = playable;
        record
    }

    fn no_jobs(_: MediaId) -> Option<JobPhase> {
        None
    }

    fn assert_symmetric(catalog: &MediaCatalog) {
        for entity in catalog.entities() {
            if let Some(id) = entity.companion() {
                let other = catalog.lookup_id(id).expect("companion must exist");
                assert_eq!(other.companion(), Some(entity.id()));
            }
        }
    }

    #[tokio::test]
    async fn test_add_or_refresh_inserts_once() {
        let catalog = MediaCatalog::default();
        let path = Path::new("/movies/movie.mkv");

        let (first, added) = catalog
            .add_or_refresh(path, |p| async move { Some(MediaRecord::new(p, "movie")) })
            .await
            .unwrap();
        assert!(added);

        let (second, added) = catalog
            .add_or_refresh(path, |_| async { None })
            .await
            .unwrap();
        assert!(!added);
        assert_eq!(first.id(), second.id());
        assert_eq!(catalog.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_creates_nothing() {
        let catalog = MediaCatalog::default();
        let result = catalog
            .add_or_refresh(Path::new("/movies/notes.txt"), |_| async { None })
            .await;
        assert!(result.is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_lookup_by_id_and_path() {
        let catalog = MediaCatalog::default();
        let (entity, _) = catalog.insert(record("/movies/movie.mkv", 10, false));

        let by_path = catalog.lookup_path(Path::new("/movies/movie.mkv")).unwrap();
        let by_id = catalog.lookup_id(entity.id()).unwrap();
        assert!(Arc::ptr_eq(&by_path, &by_id));
    }

    #[test]
    fn test_companion_by_naming_convention() {
        let catalog = MediaCatalog::default();
        let (original, _) = catalog.insert(record("/movies/movie.mkv", 100, false));
        let (converted, _) = catalog.insert(record("/movies/_movie.mkv", 99, true));

        assert_eq!(original.companion(), Some(converted.id()));
        assert_eq!(converted.companion(), Some(original.id()));
        assert_symmetric(&catalog);
    }

    #[test]
    fn test_companion_in_demoted_directory() {
        let catalog = MediaCatalog::new(NamingConvention::new("_", Some("converted".to_string())));
        let (converted, _) = catalog.insert(record("/movies/converted/_movie.mkv", 1, true));
        let (original, _) = catalog.insert(record("/movies/movie.mkv", 2, false));

        assert_eq!(original.companion(), Some(converted.id()));
        assert_symmetric(&catalog);
    }

    #[test]
    fn test_companion_with_different_extension_inserted_first() {
        let catalog = MediaCatalog::default();
        let (original, _) = catalog.insert(record("/movies/Movie.avi", 7200, false));
        let (other, _) = catalog.insert(record("/movies/Other.avi", 7201, false));
        let (converted, _) = catalog.insert(record("/movies/_Movie.mkv", 7201, true));

        assert_eq!(converted.companion(), Some(original.id()));
        assert_eq!(original.companion(), Some(converted.id()));
        assert_eq!(other.companion(), None);
        assert_symmetric(&catalog);

        catalog.refresh_all_with(&no_jobs);
        catalog.refresh_all_with(&no_jobs);
        assert_eq!(original.status(), Status::Hidden);
        assert_eq!(converted.status(), Status::Playable);
    }

    #[test]
    fn test_companion_by_similarity_scan() {
        let catalog = MediaCatalog::default();
        let (a, _) = catalog.insert(record("/movies/a/Movie.mkv", 5400, false));
        let (b, _) = catalog.insert(record("/movies/b/movie.avi", 5400, false));
        let (c, _) = catalog.insert(record("/movies/c/movie.mp4", 5401, false));

        assert_eq!(a.companion(), Some(b.id()));
        assert_eq!(c.companion(), None);
        assert_symmetric(&catalog);
    }

    #[test]
    fn test_linked_entity_is_not_stolen() {
        let catalog = MediaCatalog::default();
        let (a, _) = catalog.insert(record("/x/movie.mkv", 60, false));
        let (b, _) = catalog.insert(record("/y/movie.mkv", 60, false));
        let (c, _) = catalog.insert(record("/z/movie.mkv", 60, false));

        assert_eq!(a.companion(), Some(b.id()));
        assert_eq!(c.companion(), None);
        assert_symmetric(&catalog);
    }

    #[test]
    fn test_remove_clears_both_sides() {
        let catalog = MediaCatalog::default();
        let (original, _) = catalog.insert(record("/movies/movie.mkv", 100, false));
        let (converted, _) = catalog.insert(record("/movies/_movie.mkv", 100, true));

        assert!(catalog.remove(&converted));
        assert_eq!(original.companion(), None);
        assert!(catalog.lookup_id(converted.id()).is_none());
        assert!(!catalog.remove(&converted));
    }

    #[test]
    fn test_relocate_displaces_existing_entry() {
        let catalog = MediaCatalog::default();
        let (moving, _) = catalog.insert(record("/movies/old.mkv", 1, true));
        let (occupant, _) = catalog.insert(record("/movies/new.mkv", 2, true));

        let displaced = catalog.relocate(&moving, Path::new("/movies/new.mkv"));
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].id(), occupant.id());

        let found = catalog.lookup_path(Path::new("/movies/new.mkv")).unwrap();
        assert_eq!(found.id(), moving.id());
        assert_eq!(found.name(), "new");
        assert!(catalog.lookup_path(Path::new("/movies/old.mkv")).is_none());
        assert_eq!(catalog.len(), 1);
        catalog.store().verify().unwrap();
    }

    #[test]
    fn test_status_converted_hides_original() {
        let catalog = MediaCatalog::default();
        let (original, _) = catalog.insert(record("/movies/movie.mkv", 100, false));
        catalog.refresh_status_with(&original, &no_jobs);
        assert_eq!(original.status(), Status::Unplayable);

        let (converted, _) = catalog.insert(record("/movies/_movie.mkv", 100, true));
        catalog.refresh_status_with(&converted, &no_jobs);

        assert_eq!(converted.status(), Status::Playable);
        assert_eq!(original.status(), Status::Hidden);
    }

    #[test]
    fn test_status_tie_break_independent_of_order() {
        for flip in [false, true] {
            let catalog = MediaCatalog::default();
            let mut older = record("/a/movie.mkv", 60, false);
            older.modified_at = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
            let mut newer = record("/b/movie.mkv", 60, false);
            newer.modified_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

            let (first, second) = if flip { (newer, older) } else { (older, newer) };
            let (first, _) = catalog.insert(first);
            let (second, _) = catalog.insert(second);
            catalog.refresh_status_with(&first, &no_jobs);
            catalog.refresh_status_with(&second, &no_jobs);

            let older = catalog.lookup_path(Path::new("/a/movie.mkv")).unwrap();
            let newer = catalog.lookup_path(Path::new("/b/movie.mkv")).unwrap();
            assert_eq!(older.status(), Status::Hidden, "flip={flip}");
            assert_eq!(newer.status(), Status::Unplayable, "flip={flip}");
        }
    }

    #[test]
    fn test_status_follows_job_phase() {
        use crate::converter::ConversionTarget;

        let catalog = MediaCatalog::default();
        let (entity, _) = catalog.insert(record("/movies/movie.mkv", 100, false));

        let queued = |_: MediaId| Some(JobPhase::queued());
        assert_eq!(catalog.refresh_status_with(&entity, &queued), Status::Queued);

        let streaming = |_: MediaId| {
            Some(JobPhase {
                percent: 40.0,
                target: ConversionTarget::Stream,
            })
        };
        assert_eq!(
            catalog.refresh_status_with(&entity, &streaming),
            Status::Streamable
        );
        assert_eq!(catalog.refresh_status_with(&entity, &no_jobs), Status::Unplayable);
    }

    #[test]
    fn test_events_are_broadcast() {
        let catalog = MediaCatalog::default();
        let mut rx = catalog.subscribe();

        let (original, _) = catalog.insert(record("/movies/movie.mkv", 100, false));
        let (converted, _) = catalog.insert(record("/movies/_movie.mkv", 100, true));

        assert!(matches!(rx.try_recv(), Ok(CatalogEvent::Added { id, .. }) if id == original.id()));
        assert!(matches!(rx.try_recv(), Ok(CatalogEvent::Added { id, .. }) if id == converted.id()));
        assert!(matches!(
            rx.try_recv(),
            Ok(CatalogEvent::CompanionLinked { id, companion }) if id == converted.id() && companion == original.id()
        ));
    }
}
