//! Library service: scanning, conversion orchestration and file-watch entry points.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::LibraryError;
use super::metadata::{MetadataCache, MetadataProvider};
use crate::catalog::{CatalogEvent, MediaCatalog, NamingConvention};
use crate::config::{Config, LibraryConfig};
use crate::converter::{
    ConversionProgress, ConversionTarget, Converter, ConverterError, MediaInfo, PlaybackProfile,
    SubtitleExtraction, SubtitleTrack, TranscodeRequest, VideoConstraints,
};
use crate::media::{MediaEntity, MediaId, MediaKind, MediaRecord, Resolution, Status, Subtitle};
use crate::queue::{ConversionJob, ConversionQueue, ConversionTracker, JobError, QueueError};
use crate::stream::{ProgressiveStreamHandle, StreamConfig};

const PROGRESS_CAPACITY: usize = 64;
const SUBTITLE_EXTENSION: &str = "vtt";

/// Outcome of a directory scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Media files found under the roots.
    pub discovered: usize,
    /// Entities created by this scan.
    pub added: usize,
    /// Entities dropped because their file is gone.
    pub removed: usize,
}

/// State shared with job steps and hooks.
struct Inner {
    catalog: Arc<MediaCatalog>,
    converter: Arc<dyn Converter>,
    tracker: ConversionTracker,
    profile: RwLock<PlaybackProfile>,
    library: LibraryConfig,
    constraints: VideoConstraints,
    stream: StreamConfig,
    metadata: Option<Arc<dyn MetadataProvider>>,
    metadata_cache: MetadataCache,
}

/// Front door of the media library.
///
/// Owns the catalog, the conversion queue and the tracker, and is the only
/// place that turns file events and user requests into catalog mutations
/// and conversion jobs.
pub struct LibraryService {
    inner: Arc<Inner>,
    queue: ConversionQueue,
}

impl LibraryService {
    /// Creates the service and starts its conversion worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: &Config, converter: Arc<dyn Converter>) -> Self {
        Self::build(config, converter, None)
    }

    /// Same as [`new`](Self::new), with a metadata provider consulted for
    /// every new entity.
    pub fn with_metadata(
        config: &Config,
        converter: Arc<dyn Converter>,
        provider: Arc<dyn MetadataProvider>,
    ) -> Self {
        Self::build(config, converter, Some(provider))
    }

    fn build(
        config: &Config,
        converter: Arc<dyn Converter>,
        metadata: Option<Arc<dyn MetadataProvider>>,
    ) -> Self {
        let catalog = Arc::new(MediaCatalog::new(config.library.naming()));
        Self {
            inner: Arc::new(Inner {
                catalog,
                converter,
                tracker: ConversionTracker::new(),
                profile: RwLock::new(config.playback.clone()),
                library: config.library.clone(),
                constraints: config.converter.video.clone(),
                stream: config.stream.clone(),
                metadata,
                metadata_cache: MetadataCache::new(),
            }),
            queue: ConversionQueue::start(),
        }
    }

    pub fn catalog(&self) -> &Arc<MediaCatalog> {
        &self.inner.catalog
    }

    pub fn tracker(&self) -> &ConversionTracker {
        &self.inner.tracker
    }

    pub fn metadata_cache(&self) -> &MetadataCache {
        &self.inner.metadata_cache
    }

    pub fn playback_profile(&self) -> PlaybackProfile {
        self.inner.profile()
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.inner.library
    }

    /// Whether `path` looks like a video this library indexes.
    pub fn is_media_path(&self, path: &Path) -> bool {
        self.inner.is_media_path(path)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Adds `path` to the catalog, probing it if unknown.
    ///
    /// Returns `None` when the file is not media or cannot be probed.
    pub async fn add_file(&self, path: &Path) -> Option<Arc<MediaEntity>> {
        if !self.inner.is_media_path(path) {
            return None;
        }

        let prober = Arc::clone(&self.inner);
        let (entity, added) = self
            .inner
            .catalog
            .add_or_refresh(path, move |path| async move { prober.probe_record(path).await })
            .await?;

        self.inner.refresh(&entity);
        if added {
            self.fetch_metadata(&entity).await;
        }
        Some(entity)
    }

    /// Walks every root, adds new media files and drops entities whose file
    /// is gone.
    pub async fn scan(&self) -> ScanSummary {
        let mut summary = ScanSummary::default();

        for root in &self.inner.library.roots {
            let is_dir = tokio::fs::metadata(root)
                .await
                .is_ok_and(|meta| meta.is_dir());
            if !is_dir {
                warn!("Library root {} is not a directory, skipping", root.display());
                continue;
            }

            let files = self.collect_media(root).await;
            summary.discovered += files.len();
            for path in files {
                let known = self.inner.catalog.lookup_path(&path).is_some();
                if self.add_file(&path).await.is_some() && !known {
                    summary.added += 1;
                }
            }
        }

        for entity in self.inner.catalog.entities() {
            if self.inner.tracker.is_tracked(entity.id()) {
                continue;
            }
            // Unreadable is not gone.
            if tokio::fs::try_exists(entity.path()).await.unwrap_or(true) {
                continue;
            }
            if self.forget(&entity) {
                summary.removed += 1;
            }
        }

        info!(
            discovered = summary.discovered,
            added = summary.added,
            removed = summary.removed,
            "Library scan finished"
        );
        summary
    }

    async fn collect_media(&self, root: &Path) -> Vec<PathBuf> {
        let mut pending = vec![root.to_path_buf()];
        let mut files = Vec::new();

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Failed to read directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        match entry.file_type().await {
                            Ok(kind) if kind.is_dir() => pending.push(path),
                            Ok(kind) if kind.is_file() && self.inner.is_media_path(&path) => {
                                files.push(path)
                            }
                            Ok(_) => {}
                            Err(e) => debug!("Skipping {}: {}", path.display(), e),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Failed to list {}: {}", dir.display(), e);
                        break;
                    }
                }
            }
        }

        files.sort();
        files
    }

    /// Removes `entity` and lets its former companion re-derive.
    fn forget(&self, entity: &Arc<MediaEntity>) -> bool {
        let companion = entity.companion();
        if !self.inner.catalog.remove(entity) {
            return false;
        }
        self.inner.metadata_cache.invalidate(&entity.path());
        if let Some(companion) = companion.and_then(|id| self.inner.catalog.lookup_id(id)) {
            self.inner.refresh(&companion);
        }
        true
    }

    async fn fetch_metadata(&self, entity: &MediaEntity) {
        let Some(provider) = &self.inner.metadata else {
            return;
        };

        let path = entity.path();
        if let Some(cached) = self.inner.metadata_cache.get(&path) {
            entity.set_metadata(Some(cached));
            return;
        }

        let (name, kind) = entity.read(|r| (r.name.clone(), r.kind.clone()));
        let title = match &kind {
            MediaKind::Episode { series, .. } if !series.is_empty() => series.clone(),
            _ => name,
        };

        match provider.lookup(&title, &kind).await {
            Ok(Some(metadata)) => {
                debug!("{} matched \"{}\" via {}", path.display(), metadata.title, provider.name());
                self.inner.metadata_cache.insert(path, metadata.clone());
                entity.set_metadata(Some(metadata));
                self.inner
                    .catalog
                    .emit(CatalogEvent::Updated { id: entity.id() });
            }
            Ok(None) => debug!("No metadata for \"{}\"", title),
            Err(e) => warn!("Metadata lookup for \"{}\" failed: {}", title, e),
        }
    }

    // =========================================================================
    // Conversion
    // =========================================================================

    /// Queues a conversion for `id`.
    ///
    /// Extracts missing subtitles and, when the file fails the playback
    /// profile (or subtitles must be burned in), transcodes it to a
    /// progressively readable rendition next to the original.
    pub fn request_conversion(&self, id: MediaId) -> Result<(), LibraryError> {
        let entity = self
            .inner
            .catalog
            .lookup_id(id)
            .ok_or(LibraryError::UnknownMedia { id })?;
        if self.inner.tracker.is_tracked(id) {
            return Err(QueueError::AlreadyConverting { id }.into());
        }

        let status = entity.status();
        if !status.needs_conversion() {
            return Err(LibraryError::NothingToConvert { id, status });
        }

        let (extract, transcode) = entity.read(|r| {
            let extract = !r.burn_subtitles && !r.missing_subtitles().is_empty();
            let transcode = !r.playable || r.burn_in_track().is_some();
            (extract, transcode)
        });
        if !extract && !transcode {
            return Err(LibraryError::NothingToConvert { id, status });
        }

        let mut job = ConversionJob::new(format!("convert {}", entity.name()));
        self.inner.tracker.try_track(id, job.cancel_token())?;

        if extract {
            let inner = Arc::clone(&self.inner);
            let target = Arc::clone(&entity);
            job = job.with_step(move |cancel| async move {
                inner.extract_subtitles(&target, cancel).await
            });
        }
        if transcode {
            let inner = Arc::clone(&self.inner);
            let target = Arc::clone(&entity);
            job = job.with_step(move |cancel| async move { inner.transcode(&target, cancel).await });
        }

        let job = self.attach_hooks(job, &entity);
        if !self.queue.try_add(job) {
            self.inner.tracker.untrack(id);
            self.inner.refresh(&entity);
            return Err(QueueError::Disposed.into());
        }
        Ok(())
    }

    fn attach_hooks(&self, job: ConversionJob, entity: &Arc<MediaEntity>) -> ConversionJob {
        let on_add = (Arc::clone(&self.inner), Arc::clone(entity));
        let on_start = (Arc::clone(&self.inner), Arc::clone(entity));
        let on_finally = (Arc::clone(&self.inner), Arc::clone(entity));
        let id = entity.id();

        job.on_add(move || {
            let (inner, entity) = on_add;
            inner.refresh(&entity);
        })
        .on_start(move || {
            let (inner, entity) = on_start;
            inner
                .tracker
                .set_progress(entity.id(), ConversionTarget::Subtitles, 0.0);
            inner.refresh(&entity);
        })
        .on_error(move |e| {
            if !e.is_cancelled() {
                debug!(%id, error = %e, "Conversion failed");
            }
        })
        .on_finally(move || {
            let (inner, entity) = on_finally;
            if let Some(tracked) = inner.tracker.untrack(entity.id()) {
                if let Some(stream) = tracked.stream {
                    stream.abort();
                }
            }
            if inner.catalog.lookup_id(entity.id()).is_some() {
                inner.refresh(&entity);
            }
        })
    }

    /// Cancels the outstanding conversion of `id`. Returns false if none.
    pub fn cancel_conversion(&self, id: MediaId) -> bool {
        let cancelled = self.inner.tracker.cancel(id);
        if cancelled {
            info!(%id, "Cancelling conversion");
        }
        cancelled
    }

    /// Queues every entity whose status a conversion can improve.
    pub fn convert_all_pending(&self) -> usize {
        let mut queued = 0;
        for entity in self.inner.catalog.entities() {
            if !entity.status().needs_conversion() || self.inner.tracker.is_tracked(entity.id()) {
                continue;
            }
            match self.request_conversion(entity.id()) {
                Ok(()) => queued += 1,
                Err(e) => debug!("Not converting {}: {}", entity.name(), e),
            }
        }
        if queued > 0 {
            info!("Queued {} conversions", queued);
        }
        queued
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Opens a stream of `id`.
    ///
    /// While a conversion writes the stream, readers follow its temporary
    /// output. Hidden entities resolve to their companion.
    pub async fn open_stream(&self, id: MediaId) -> Result<Arc<ProgressiveStreamHandle>, LibraryError> {
        let entity = self
            .inner
            .catalog
            .lookup_id(id)
            .ok_or(LibraryError::UnknownMedia { id })?;

        if let Some(handle) = self.direct_stream(&entity).await? {
            return Ok(handle);
        }

        let status = entity.status();
        if status == Status::Hidden {
            if let Some(companion) = entity.companion().and_then(|c| self.inner.catalog.lookup_id(c)) {
                if let Some(handle) = self.direct_stream(&companion).await? {
                    return Ok(handle);
                }
            }
        }
        Err(LibraryError::NotStreamable { id, status })
    }

    async fn direct_stream(
        &self,
        entity: &MediaEntity,
    ) -> Result<Option<Arc<ProgressiveStreamHandle>>, LibraryError> {
        if let Some(handle) = self.inner.tracker.stream(entity.id()) {
            return Ok(Some(handle));
        }
        if !entity.read(|r| r.playable) {
            return Ok(None);
        }

        let path = entity.path();
        let handle = ProgressiveStreamHandle::new(path.clone(), path, self.inner.stream.clone());
        handle.complete().await?;
        Ok(Some(Arc::new(handle)))
    }

    // =========================================================================
    // File-watch entry points
    // =========================================================================

    pub async fn on_file_created(&self, path: &Path) -> Option<Arc<MediaEntity>> {
        if is_subtitle(path) {
            self.on_subtitle_changed(path);
            return None;
        }
        if NamingConvention::is_temp(path) {
            return None;
        }
        self.add_file(path).await
    }

    pub fn on_file_deleted(&self, path: &Path) -> bool {
        if is_subtitle(path) {
            return self.on_subtitle_changed(path).is_some();
        }
        let Some(entity) = self.inner.catalog.lookup_path(path) else {
            return false;
        };
        self.inner.tracker.cancel(entity.id());
        self.forget(&entity)
    }

    /// Moves the entity at `from` to `to`, keeping its id.
    pub async fn on_file_renamed(&self, from: &Path, to: &Path) -> Option<Arc<MediaEntity>> {
        let Some(entity) = self.inner.catalog.lookup_path(from) else {
            return self.on_file_created(to).await;
        };
        if !self.inner.is_media_path(to) {
            self.on_file_deleted(from);
            return None;
        }

        self.inner.metadata_cache.invalidate(from);
        let former = self.inner.catalog.unlink(&entity);
        for displaced in self.inner.catalog.relocate(&entity, to) {
            self.inner.tracker.cancel(displaced.id());
        }
        self.inner.catalog.resolve_companion(&entity);
        self.inner.refresh(&entity);
        if let Some(former) = former {
            self.inner.refresh(&former);
        }
        Some(entity)
    }

    /// Re-derives the entity owning the subtitle file at `path`.
    pub fn on_subtitle_changed(&self, path: &Path) -> Option<MediaId> {
        let owner = self
            .inner
            .catalog
            .entities()
            .into_iter()
            .find(|entity| entity.read(|r| r.subtitles.iter().any(|s| s.path == path)))?;
        let status = self.inner.refresh(&owner);
        debug!("Subtitle {} changed, {} is now {}", path.display(), owner.name(), status);
        Some(owner.id())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Replaces the playback profile and re-evaluates every entity from its
    /// stored stream info. Returns the ids whose status changed.
    pub fn apply_playback_profile(&self, profile: PlaybackProfile) -> Vec<MediaId> {
        *self
            .inner
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = profile.clone();

        let entities = self.inner.catalog.entities();
        let before: HashMap<MediaId, Status> =
            entities.iter().map(|e| (e.id(), e.status())).collect();

        for entity in &entities {
            entity.update(|r| {
                r.playable = r
                    .stream_info
                    .as_ref()
                    .is_some_and(|info| profile.accepts(info));
            });
        }
        // Companions read each other's status, so settle in two passes.
        self.refresh_all();
        self.refresh_all();

        let changed: Vec<MediaId> = entities
            .iter()
            .filter(|e| before.get(&e.id()) != Some(&e.status()))
            .map(|e| e.id())
            .collect();
        info!("Playback profile applied, {} entities changed status", changed.len());
        changed
    }

    pub fn refresh_all(&self) {
        let tracker = &self.inner.tracker;
        self.inner
            .catalog
            .refresh_all_with(&|id| tracker.phase(id));
    }

    // =========================================================================
    // Persistence and lifecycle
    // =========================================================================

    /// Loads the catalog document and seeds the metadata cache from it.
    pub async fn load_catalog(&self) -> Result<usize, LibraryError> {
        let count = self
            .inner
            .catalog
            .load(&self.inner.library.catalog_path)
            .await?;
        for entity in self.inner.catalog.entities() {
            if let Some(metadata) = entity.metadata() {
                self.inner.metadata_cache.insert(entity.path(), metadata);
            }
        }
        Ok(count)
    }

    pub async fn save_catalog(&self) -> Result<usize, LibraryError> {
        Ok(self
            .inner
            .catalog
            .save(&self.inner.library.catalog_path)
            .await?)
    }

    /// Cancels every conversion and stops the queue worker.
    pub async fn shutdown(&self) {
        self.inner.tracker.cancel_all();
        self.queue.shutdown().await;
    }
}

impl Inner {
    fn profile(&self) -> PlaybackProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn refresh(&self, entity: &MediaEntity) -> Status {
        let tracker = &self.tracker;
        self.catalog
            .refresh_status_with(entity, &|id| tracker.phase(id))
    }

    fn is_media_path(&self, path: &Path) -> bool {
        if NamingConvention::is_temp(path) {
            return false;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.converter
            .supported_input_formats()
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(ext))
    }

    /// Probes `path` into a fresh record. Probe failures are logged and
    /// yield `None`.
    async fn probe_record(&self, path: PathBuf) -> Option<MediaRecord> {
        let info = match self.converter.probe(&path).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to probe {}: {}", path.display(), e);
                return None;
            }
        };
        if info.video_codec.is_none() {
            debug!("{} has no video stream", path.display());
            return None;
        }

        let name = self.catalog.naming().display_name(&path);
        let mut record = MediaRecord::new(path.clone(), name);
        record.size_bytes = info.size_bytes;
        record.duration_secs = info.duration_secs.max(0.0).round() as u64;
        record.resolution = Resolution::from_height(info.video_height);
        record.playable = self.profile().accepts(&info);
        record.subtitles = self.subtitles_for(&path, &info);
        record.modified_at = tokio::fs::metadata(&path)
            .await
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        record.stream_info = Some(info);
        Some(record)
    }

    fn subtitles_for(&self, video: &Path, info: &MediaInfo) -> Vec<Subtitle> {
        let preferred = self.library.preferred_subtitle_language.as_deref();
        let mut seen = HashSet::new();

        info.subtitle_streams
            .iter()
            .filter(|stream| stream.is_text())
            .filter(|stream| seen.insert(stream.index))
            .map(|stream| {
                let language = stream
                    .language
                    .clone()
                    .or_else(|| stream.title.clone())
                    .unwrap_or_else(|| "und".to_string());
                Subtitle {
                    index: stream.index,
                    path: NamingConvention::subtitle_path(video, stream.index, &language),
                    preferred: preferred.is_some_and(|p| p.eq_ignore_ascii_case(&language)),
                    language,
                }
            })
            .collect()
    }

    /// Feeds engine progress into the tracker until the sender is dropped.
    fn forward_progress(
        self: &Arc<Self>,
        entity: &Arc<MediaEntity>,
    ) -> (mpsc::Sender<ConversionProgress>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ConversionProgress>(PROGRESS_CAPACITY);
        let inner = Arc::clone(self);
        let entity = Arc::clone(entity);

        let task = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                if inner
                    .tracker
                    .set_progress(entity.id(), progress.target, progress.percent)
                {
                    inner.refresh(&entity);
                }
            }
        });
        (tx, task)
    }

    async fn extract_subtitles(
        self: &Arc<Self>,
        entity: &Arc<MediaEntity>,
        cancel: CancellationToken,
    ) -> Result<(), JobError> {
        let id = entity.id();
        let (input, tracks) = entity.read(|r| {
            let tracks: Vec<SubtitleTrack> = r
                .missing_subtitles()
                .into_iter()
                .map(|s| SubtitleTrack {
                    index: s.index,
                    output_path: s.path.clone(),
                })
                .collect();
            (r.path.clone(), tracks)
        });
        if tracks.is_empty() {
            return Ok(());
        }

        self.tracker.set_progress(id, ConversionTarget::Subtitles, 0.0);
        self.refresh(entity);

        let outputs: Vec<PathBuf> = tracks.iter().map(|t| t.output_path.clone()).collect();
        let request = SubtitleExtraction {
            job_id: id.to_string(),
            input_path: input.clone(),
            tracks,
        };
        let (tx, forwarder) = self.forward_progress(entity);
        let result = self.converter.extract_subtitles(request, tx, cancel).await;
        if let Err(e) = forwarder.await {
            debug!("Progress forwarder ended abnormally: {}", e);
        }

        match result {
            Ok(done) => {
                info!(
                    "Extracted {} subtitle tracks from {}",
                    done.outputs.len(),
                    input.display()
                );
                self.refresh(entity);
                Ok(())
            }
            Err(e) => {
                remove_all(&outputs).await;
                if matches!(e, ConverterError::Cancelled) {
                    return Err(JobError::Cancelled);
                }
                warn!(
                    "Subtitle extraction failed for {}, subtitles will be burned in next time",
                    input.display()
                );
                entity.update(|r| r.burn_subtitles = true);
                Err(e.into())
            }
        }
    }

    async fn transcode(
        self: &Arc<Self>,
        entity: &Arc<MediaEntity>,
        cancel: CancellationToken,
    ) -> Result<(), JobError> {
        let id = entity.id();
        let (input, burn) = entity.read(|r| (r.path.clone(), r.burn_in_track()));
        let final_path = self
            .catalog
            .naming()
            .converted_output(&input, self.constraints.container.extension());
        let temp_path = NamingConvention::temp_path(&final_path);
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let handle = Arc::new(ProgressiveStreamHandle::new(
            temp_path.clone(),
            final_path.clone(),
            self.stream.clone(),
        ));
        self.tracker.set_stream(id, Some(Arc::clone(&handle)));
        self.tracker.set_progress(id, ConversionTarget::Stream, 0.0);
        self.refresh(entity);

        let request = TranscodeRequest {
            job_id: id.to_string(),
            input_path: input,
            output_path: temp_path.clone(),
            constraints: self.constraints.clone(),
            burn_subtitle: burn,
        };
        let (tx, forwarder) = self.forward_progress(entity);
        let result = self.converter.transcode(request, tx, cancel).await;
        if let Err(e) = forwarder.await {
            debug!("Progress forwarder ended abnormally: {}", e);
        }

        if let Err(e) = result {
            handle.abort();
            remove_all(&[temp_path]).await;
            return Err(match e {
                ConverterError::Cancelled => JobError::Cancelled,
                other => other.into(),
            });
        }

        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            handle.abort();
            remove_all(&[temp_path]).await;
            return Err(e.into());
        }
        handle.complete().await?;

        self.adopt_converted(entity, &final_path, burn.is_some())
            .await
    }

    /// Registers the converted file and links it to its original.
    async fn adopt_converted(
        &self,
        original: &Arc<MediaEntity>,
        final_path: &Path,
        burned: bool,
    ) -> Result<(), JobError> {
        let Some(mut record) = self.probe_record(final_path.to_path_buf()).await else {
            return Err(JobError::failed(format!(
                "converted file {} could not be probed",
                final_path.display()
            )));
        };
        if !burned {
            record.subtitles = original.read(|r| r.subtitles.clone());
        }

        let converted = match self.catalog.lookup_path(final_path) {
            Some(existing) => {
                existing.update(|r| {
                    let companion = r.companion;
                    *r = record;
                    r.companion = companion;
                });
                existing
            }
            None => self.catalog.insert(record).0,
        };
        self.catalog.link(original, &converted);
        self.refresh(&converted);

        if self.library.supersede_originals {
            let path = original.path();
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    info!("Removed superseded original {}", path.display());
                    self.catalog.remove(original);
                    self.refresh(&converted);
                }
                Err(e) => warn!("Failed to remove original {}: {}", path.display(), e),
            }
        }
        Ok(())
    }
}

fn is_subtitle(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SUBTITLE_EXTENSION))
}

async fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
