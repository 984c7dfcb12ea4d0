use crate::dashboard::config::{LayoutPreferences, WidgetId};
use crate::dashboard::layout::{normalize_with_report, AdjacencyRule, NORMALIZE_MAX_PASSES};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Durable storage for the serialized preferences blob.
pub trait PreferenceBackend: Send + Sync {
    /// Returns `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, blob: &str) -> Result<()>;
}

/// Stores the blob as a JSON file, replacing it atomically on every write.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceBackend for JsonFileBackend {
    fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read layout preferences {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    fn write(&self, blob: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create preferences folder {}", parent.display()))?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, blob)
            .with_context(|| format!("write layout preferences {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace layout preferences {}", self.path.display()))
    }
}

/// In-memory backend, shared between clones. Useful for tests and for hosts
/// without durable storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    blob: Arc<Mutex<Option<String>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        let backend = Self::default();
        if let Ok(mut slot) = backend.blob.lock() {
            *slot = Some(blob.into());
        }
        backend
    }

    pub fn contents(&self) -> Option<String> {
        self.blob.lock().ok().and_then(|slot| slot.clone())
    }

    /// Make every following write fail, simulating a full or read-only store.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreferenceBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        let slot = self
            .blob
            .lock()
            .map_err(|_| anyhow!("memory preference backend is poisoned"))?;
        Ok(slot.clone())
    }

    fn write(&self, blob: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("memory preference backend rejected the write"));
        }
        let mut slot = self
            .blob
            .lock()
            .map_err(|_| anyhow!("memory preference backend is poisoned"))?;
        *slot = Some(blob.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Read and repair preferences. Never fails: any problem yields defaults for
/// the affected part and a logged warning.
pub fn load_preferences(
    backend: &dyn PreferenceBackend,
    known: &[WidgetId],
    rules: &[AdjacencyRule],
    max_passes: usize,
) -> LayoutPreferences {
    let mut prefs = match backend.read() {
        Ok(Some(content)) => {
            let (prefs, warnings) = LayoutPreferences::from_json(&content);
            for w in warnings {
                tracing::warn!("{w}");
            }
            prefs
        }
        Ok(None) => LayoutPreferences::default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read layout preferences; using defaults");
            LayoutPreferences::default()
        }
    };
    let (order, repairs) = normalize_with_report(&prefs.order, rules, known, max_passes);
    for r in repairs {
        tracing::debug!("{r}");
    }
    prefs.order = order;
    prefs.retain_known(known);
    prefs
}

enum WriterMsg {
    Save(String),
    Flush(Sender<()>),
}

/// Single background writer so saves land in mutation order without blocking
/// the caller.
struct SaveWriter {
    tx: Option<Sender<WriterMsg>>,
    handle: Option<JoinHandle<()>>,
}

impl SaveWriter {
    fn spawn(backend: Arc<dyn PreferenceBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || writer_loop(rx, backend));
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    fn send(&self, msg: WriterMsg) -> bool {
        self.tx.as_ref().is_some_and(|tx| tx.send(msg).is_ok())
    }
}

impl Drop for SaveWriter {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn writer_loop(rx: Receiver<WriterMsg>, backend: Arc<dyn PreferenceBackend>) {
    while let Ok(msg) = rx.recv() {
        match msg {
            WriterMsg::Save(blob) => {
                let mut latest = blob;
                let mut acks = Vec::new();
                // Coalesce queued saves; a flush request ends the batch.
                loop {
                    match rx.try_recv() {
                        Ok(WriterMsg::Save(next)) => latest = next,
                        Ok(WriterMsg::Flush(ack)) => {
                            acks.push(ack);
                            break;
                        }
                        Err(_) => break,
                    }
                }
                if let Err(e) = backend.write(&latest) {
                    tracing::warn!(error = %e, "failed to save layout preferences");
                }
                for ack in acks {
                    let _ = ack.send(());
                }
            }
            WriterMsg::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

enum LoadState {
    Idle,
    Loading(Receiver<LayoutPreferences>),
    Ready,
}

/// Handle returned by [`PreferenceStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&LayoutPreferences)>;

/// Owner of the dashboard's [`LayoutPreferences`].
///
/// Every change goes through [`mutate`](Self::mutate), which updates the
/// in-memory value immediately, normalizes it, notifies subscribers and queues
/// a save. Persistence failures never reach the caller.
pub struct PreferenceStore {
    backend: Arc<dyn PreferenceBackend>,
    known: Vec<WidgetId>,
    rules: Vec<AdjacencyRule>,
    max_passes: usize,
    current: LayoutPreferences,
    load: LoadState,
    revision: u64,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
    writer: SaveWriter,
}

impl PreferenceStore {
    pub fn new(
        backend: Arc<dyn PreferenceBackend>,
        known: Vec<WidgetId>,
        rules: Vec<AdjacencyRule>,
    ) -> Self {
        let writer = SaveWriter::spawn(Arc::clone(&backend));
        let (order, _) = normalize_with_report(&known, &rules, &known, NORMALIZE_MAX_PASSES);
        Self {
            backend,
            current: LayoutPreferences {
                order,
                ..LayoutPreferences::default()
            },
            known,
            rules,
            max_passes: NORMALIZE_MAX_PASSES,
            load: LoadState::Idle,
            revision: 0,
            subscribers: Vec::new(),
            next_subscription: 0,
            writer,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    pub fn known_widgets(&self) -> &[WidgetId] {
        &self.known
    }

    pub fn rules(&self) -> &[AdjacencyRule] {
        &self.rules
    }

    pub fn preferences(&self) -> &LayoutPreferences {
        &self.current
    }

    /// Incremented on every committed change, including the initial load.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load, LoadState::Ready)
    }

    /// Start reading persisted preferences on a background thread. Only the
    /// first call has an effect.
    pub fn begin_load(&mut self) {
        if !matches!(self.load, LoadState::Idle) {
            return;
        }
        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let known = self.known.clone();
        let rules = self.rules.clone();
        let max_passes = self.max_passes;
        std::thread::spawn(move || {
            let prefs = load_preferences(backend.as_ref(), &known, &rules, max_passes);
            let _ = tx.send(prefs);
        });
        self.load = LoadState::Loading(rx);
    }

    /// Check whether a pending load finished. Returns `true` once loaded.
    pub fn poll_load(&mut self) -> bool {
        let result = match &self.load {
            LoadState::Idle => return false,
            LoadState::Ready => return true,
            LoadState::Loading(rx) => match rx.try_recv() {
                Ok(prefs) => prefs,
                Err(TryRecvError::Empty) => return false,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("layout preference loader exited early; using defaults");
                    self.defaults()
                }
            },
        };
        self.finish_load(result);
        true
    }

    /// Load synchronously, waiting for a load already in flight.
    pub fn load_blocking(&mut self) -> &LayoutPreferences {
        self.begin_load();
        if let LoadState::Loading(rx) = &self.load {
            let prefs = rx.recv().unwrap_or_else(|_| {
                tracing::warn!("layout preference loader exited early; using defaults");
                self.defaults()
            });
            self.finish_load(prefs);
        }
        &self.current
    }

    fn finish_load(&mut self, prefs: LayoutPreferences) {
        self.load = LoadState::Ready;
        self.current = prefs;
        self.revision += 1;
        tracing::debug!(widgets = self.current.order.len(), "layout preferences loaded");
        self.notify();
    }

    pub fn defaults(&self) -> LayoutPreferences {
        let (order, _) = normalize_with_report(&self.known, &self.rules, &self.known, self.max_passes);
        LayoutPreferences {
            order,
            ..LayoutPreferences::default()
        }
    }

    /// Apply `f` to the current preferences and commit the result.
    ///
    /// The result is normalized (ordering repaired, adjacency rules enforced,
    /// unknown widgets dropped) before it becomes current. Returns `false`
    /// when nothing changed or when the store has not finished loading.
    pub fn mutate<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(LayoutPreferences) -> LayoutPreferences,
    {
        if !self.is_loaded() {
            tracing::debug!("ignoring layout change requested before preferences loaded");
            return false;
        }
        let mut next = f(self.current.clone());
        let (order, repairs) =
            normalize_with_report(&next.order, &self.rules, &self.known, self.max_passes);
        for r in repairs {
            tracing::debug!("{r}");
        }
        next.order = order;
        next.retain_known(&self.known);
        if next == self.current {
            return false;
        }
        self.current = next;
        self.revision += 1;
        self.notify();
        self.save(&self.current);
        true
    }

    /// Restore registration order, expand everything and clear span overrides.
    pub fn reset(&mut self) -> bool {
        let defaults = self.defaults();
        self.mutate(|_| defaults)
    }

    /// Queue `prefs` for persistence. Failures are logged, never returned.
    pub fn save(&self, prefs: &LayoutPreferences) {
        match prefs.to_json() {
            Ok(blob) => {
                if !self.writer.send(WriterMsg::Save(blob)) {
                    tracing::warn!("layout preference writer unavailable; change kept in memory");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize layout preferences"),
        }
    }

    /// Block until every queued save has been attempted.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.writer.send(WriterMsg::Flush(ack_tx)) {
            let _ = ack_rx.recv();
        }
    }

    /// Register a callback run after every committed change.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&LayoutPreferences) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self) {
        for (_, callback) in &mut self.subscribers {
            callback(&self.current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn ids(raw: &[&str]) -> Vec<WidgetId> {
        raw.iter().map(|id| WidgetId::from(*id)).collect()
    }

    fn store_with(backend: MemoryBackend) -> PreferenceStore {
        PreferenceStore::new(
            Arc::new(backend),
            ids(&["a", "b", "c"]),
            vec![AdjacencyRule::new("a", "b")],
        )
    }

    #[test]
    fn missing_blob_loads_defaults() {
        let mut store = store_with(MemoryBackend::new());
        let prefs = store.load_blocking().clone();
        assert_eq!(prefs, LayoutPreferences::defaults(&ids(&["a", "b", "c"])));
        assert!(store.is_loaded());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn mutations_before_load_are_ignored() {
        let backend = MemoryBackend::new();
        let mut store = store_with(backend.clone());
        assert!(!store.mutate(|mut p| {
            p.order.reverse();
            p
        }));
        store.flush();
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn poll_load_resolves_eventually() {
        let mut store = store_with(MemoryBackend::with_blob(r#"{"cardOrder":["c","a","b"]}"#));
        assert!(!store.poll_load());
        store.begin_load();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !store.poll_load() {
            assert!(std::time::Instant::now() < deadline, "load never resolved");
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        assert_eq!(store.preferences().order, ids(&["c", "a", "b"]));
    }

    #[test]
    fn mutate_normalizes_and_persists() {
        let backend = MemoryBackend::new();
        let mut store = store_with(backend.clone());
        store.load_blocking();
        assert!(store.mutate(|mut p| {
            p.order = ids(&["b", "c", "a", "ghost"]);
            p
        }));
        assert_eq!(store.preferences().order, ids(&["c", "a", "b"]));
        store.flush();
        let saved = backend.contents().unwrap();
        let (reloaded, _) = LayoutPreferences::from_json(&saved);
        assert_eq!(reloaded.order, ids(&["c", "a", "b"]));
    }

    #[test]
    fn unchanged_mutation_does_not_save() {
        let backend = MemoryBackend::new();
        let mut store = store_with(backend.clone());
        store.load_blocking();
        let revision = store.revision();
        assert!(!store.mutate(|p| p));
        store.flush();
        assert_eq!(store.revision(), revision);
        assert_eq!(backend.write_count(), 0);
    }

    #[test]
    fn failed_save_keeps_in_memory_change() {
        let backend = MemoryBackend::new();
        let mut store = store_with(backend.clone());
        store.load_blocking();
        backend.set_fail_writes(true);
        assert!(store.mutate(|mut p| {
            p.set_collapsed(&WidgetId::from("c"), true);
            p
        }));
        store.flush();
        assert!(store.preferences().is_collapsed("c"));
        assert_eq!(backend.contents(), None);

        backend.set_fail_writes(false);
        assert!(store.mutate(|mut p| {
            p.set_span(&WidgetId::from("c"), 9);
            p
        }));
        store.flush();
        let (saved, _) = LayoutPreferences::from_json(&backend.contents().unwrap());
        assert!(saved.is_collapsed("c"));
        assert_eq!(saved.span("c"), Some(9));
    }

    #[test]
    fn subscribers_see_every_commit() {
        let mut store = store_with(MemoryBackend::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = store.subscribe(move |p| sink.borrow_mut().push(p.collapsed.len()));
        store.load_blocking();
        store.mutate(|mut p| {
            p.set_collapsed(&WidgetId::from("a"), true);
            p
        });
        assert!(store.unsubscribe(sub));
        store.mutate(|mut p| {
            p.set_collapsed(&WidgetId::from("b"), true);
            p
        });
        assert_eq!(*seen.borrow(), vec![0, 1]);
        assert!(!store.unsubscribe(sub));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut store = store_with(MemoryBackend::with_blob(
            r#"{"cardOrder":["c","a","b"],"collapsedSections":{"a":true},"columnSpans":{"b":12}}"#,
        ));
        store.load_blocking();
        assert!(store.reset());
        assert_eq!(store.preferences(), &store.defaults());
    }

    #[test]
    fn file_backend_treats_missing_and_empty_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("layout.json");
        let backend = JsonFileBackend::new(&path);
        assert_eq!(backend.read().unwrap(), None);
        backend.write("{}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{}"));
        std::fs::write(&path, "  ").unwrap();
        assert_eq!(backend.read().unwrap(), None);
    }
}
