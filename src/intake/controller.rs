use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use super::blob::{Blob, BlobId, BlobReader};

const EVENT_CAPACITY: usize = 64;

/// Cosmetic upload animation: `step` percent every `period`.
#[derive(Debug, Clone, Copy)]
pub struct ProgressSchedule {
    pub step: u8,
    pub period: Duration,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self {
            step: 5,
            period: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub source: Blob,
    pub preview: Option<String>,
    pub progress: u8,
    pub error: Option<String>,
    pub complete: bool,
}

impl FileEntry {
    fn new(source: Blob) -> Self {
        Self {
            source,
            preview: None,
            progress: 0,
            error: None,
            complete: false,
        }
    }

    #[must_use]
    pub fn view(&self) -> FileEntryView {
        FileEntryView {
            id: self.source.id(),
            name: self.source.name().to_string(),
            mime: self.source.mime().to_string(),
            size: self.source.size(),
            preview: self.preview.clone(),
            progress: self.progress,
            error: self.error.clone(),
            complete: self.complete,
        }
    }
}

/// What the presentation layer sees of an entry (no file bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntryView {
    pub id: BlobId,
    pub name: String,
    pub mime: String,
    pub size: u64,
    pub preview: Option<String>,
    pub progress: u8,
    pub error: Option<String>,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum IntakeEvent {
    SelectionChanged(Vec<FileEntryView>),
    Removed(FileEntryView),
}

struct Slot {
    entry: FileEntry,
    tasks: Vec<AbortHandle>,
}

impl Slot {
    fn abort(&self) {
        for t in &self.tasks {
            t.abort();
        }
    }
}

#[derive(Default)]
struct Selection {
    slots: Vec<Slot>,
}

impl Selection {
    fn position(&self, id: BlobId) -> Option<usize> {
        self.slots.iter().position(|s| s.entry.source.id() == id)
    }

    fn entry_mut(&mut self, id: BlobId) -> Option<&mut FileEntry> {
        self.slots
            .iter_mut()
            .find(|s| s.entry.source.id() == id)
            .map(|s| &mut s.entry)
    }

    fn views(&self) -> Vec<FileEntryView> {
        self.slots.iter().map(|s| s.entry.view()).collect()
    }

    fn drain(&mut self) {
        for slot in self.slots.drain(..) {
            slot.abort();
        }
    }
}

fn lock(m: &Mutex<Selection>) -> MutexGuard<'_, Selection> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Tick {
    Continue,
    Done,
    Gone,
}

fn bump_progress(selection: &Mutex<Selection>, id: BlobId, progress: u8) -> Tick {
    let mut sel = lock(selection);
    let Some(entry) = sel.entry_mut(id) else {
        return Tick::Gone;
    };
    entry.progress = entry.progress.max(progress);
    if entry.progress >= 100 {
        entry.complete = true;
        Tick::Done
    } else {
        Tick::Continue
    }
}

async fn run_progress(selection: Weak<Mutex<Selection>>, id: BlobId, schedule: ProgressSchedule) {
    let step = schedule.step.max(1);
    let mut progress: u8 = 0;
    loop {
        tokio::time::sleep(schedule.period).await;
        progress = progress.saturating_add(step).min(100);
        let Some(selection) = selection.upgrade() else {
            return;
        };
        match bump_progress(&selection, id, progress) {
            Tick::Continue => {}
            Tick::Done | Tick::Gone => return,
        }
    }
}

async fn run_preview(selection: Weak<Mutex<Selection>>, reader: Arc<dyn BlobReader>, blob: Blob) {
    let url = match reader.read_as_data_url(&blob).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(name = %blob.name(), error = %e, "preview read failed");
            return;
        }
    };
    let Some(selection) = selection.upgrade() else {
        return;
    };
    if let Some(entry) = lock(&selection).entry_mut(blob.id()) {
        entry.preview = Some(url);
    }
}

/// Owns the selected files, their previews and the upload animation.
///
/// Must be used from within a tokio runtime: adding files spawns the
/// preview and progress tasks.
pub struct IntakeController {
    selection: Arc<Mutex<Selection>>,
    max_files: usize,
    reader: Arc<dyn BlobReader>,
    schedule: ProgressSchedule,
    events: broadcast::Sender<IntakeEvent>,
}

impl std::fmt::Debug for IntakeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntakeController")
            .field("max_files", &self.max_files)
            .field("len", &self.len())
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl IntakeController {
    #[must_use]
    pub fn new(max_files: usize, reader: Arc<dyn BlobReader>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            selection: Arc::default(),
            max_files,
            reader,
            schedule: ProgressSchedule::default(),
            events,
        }
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: ProgressSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Selection-changed and removed notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<IntakeEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: IntakeEvent) {
        // no subscribers is fine
        self.events.send(event).ok();
    }

    /// Append candidates until the selection is full. Candidates past
    /// capacity, and blobs already selected, are dropped without error.
    pub fn add_files(&self, candidates: Vec<Blob>) -> Vec<FileEntryView> {
        let weak = Arc::downgrade(&self.selection);
        let (added, snapshot) = {
            let mut sel = lock(&self.selection);
            let mut added = Vec::new();
            for blob in candidates {
                if sel.slots.len() >= self.max_files {
                    tracing::debug!(max_files = self.max_files, "selection full, dropping rest");
                    break;
                }
                if sel.position(blob.id()).is_some() {
                    continue;
                }

                let id = blob.id();
                let mut tasks = vec![
                    tokio::spawn(run_progress(weak.clone(), id, self.schedule)).abort_handle(),
                ];
                if blob.is_image() {
                    tasks.push(
                        tokio::spawn(run_preview(weak.clone(), self.reader.clone(), blob.clone()))
                            .abort_handle(),
                    );
                }

                tracing::info!(name = %blob.name(), mime = %blob.mime(), size = blob.size(), "file added");
                let entry = FileEntry::new(blob);
                added.push(entry.view());
                sel.slots.push(Slot { entry, tasks });
            }
            (added, sel.views())
        };
        self.emit(IntakeEvent::SelectionChanged(snapshot));
        added
    }

    /// Remove by blob identity. Absent ids change nothing and emit nothing.
    pub fn remove_file(&self, id: BlobId) -> Option<FileEntryView> {
        let (removed, snapshot) = {
            let mut sel = lock(&self.selection);
            let idx = sel.position(id)?;
            let slot = sel.slots.remove(idx);
            slot.abort();
            (slot.entry.view(), sel.views())
        };
        tracing::info!(name = %removed.name, "file removed");
        self.emit(IntakeEvent::SelectionChanged(snapshot));
        self.emit(IntakeEvent::Removed(removed.clone()));
        Some(removed)
    }

    /// Swap the whole selection for a new set of candidates.
    pub fn replace_files(&self, candidates: Vec<Blob>) -> Vec<FileEntryView> {
        lock(&self.selection).drain();
        self.add_files(candidates)
    }

    pub fn clear(&self) {
        lock(&self.selection).drain();
        self.emit(IntakeEvent::SelectionChanged(Vec::new()));
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<FileEntryView> {
        lock(&self.selection).views()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.selection).slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn max_files(&self) -> usize {
        self.max_files
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len() >= self.max_files
    }

    /// The blob a submission sends along, if any. Later entries are ignored.
    #[must_use]
    pub fn first_blob(&self) -> Option<Blob> {
        lock(&self.selection)
            .slots
            .first()
            .map(|s| s.entry.source.clone())
    }

    #[must_use]
    pub fn uploaded_label(&self) -> String {
        let ok = lock(&self.selection)
            .slots
            .iter()
            .filter(|s| s.entry.error.is_none())
            .count();
        format!("{ok}/{} files uploaded", self.max_files)
    }
}

impl Drop for IntakeController {
    fn drop(&mut self) {
        lock(&self.selection).drain();
    }
}
