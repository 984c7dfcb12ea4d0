use dashboard_layout::dashboard::store::{JsonFileBackend, PreferenceBackend, PreferenceStore};
use dashboard_layout::dashboard::{AdjacencyRule, WidgetId};
use std::sync::Arc;

fn known() -> Vec<WidgetId> {
    ["pipeline", "summary", "tasks", "emails"]
        .into_iter()
        .map(WidgetId::from)
        .collect()
}

fn store_at(path: &std::path::Path) -> PreferenceStore {
    let mut store = PreferenceStore::new(
        Arc::new(JsonFileBackend::new(path)),
        known(),
        vec![AdjacencyRule::new("pipeline", "summary")],
    );
    store.load_blocking();
    store
}

#[test]
fn first_run_creates_file_on_first_change() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs").join("layout.json");
    let mut store = store_at(&path);
    assert_eq!(store.preferences().order, known());
    assert!(!path.exists());

    store.mutate(|mut prefs| {
        prefs.set_collapsed(&WidgetId::from("tasks"), true);
        prefs
    });
    store.flush();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("\"collapsedSections\""));
    assert!(content.contains("\"tasks\": true"));
}

#[test]
fn file_roundtrip_restores_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");
    {
        let mut store = store_at(&path);
        store.mutate(|mut prefs| {
            prefs.order.reverse();
            prefs.set_span(&WidgetId::from("emails"), 7);
            prefs
        });
        // Dropping the store drains the writer.
    }
    let store = store_at(&path);
    let order: Vec<&str> = store.preferences().order.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["emails", "tasks", "pipeline", "summary"]);
    assert_eq!(store.preferences().span("emails"), Some(7));
}

#[test]
fn corrupt_fields_fall_back_one_by_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layout.json");
    std::fs::write(
        &path,
        r#"{ "cardOrder": ["tasks", "removed-widget", "tasks"], "collapsedSections": [1, 2], "columnSpans": { "tasks": 1 } }"#,
    )
    .unwrap();
    let store = store_at(&path);
    let order: Vec<&str> = store.preferences().order.iter().map(|id| id.as_str()).collect();
    assert_eq!(order, vec!["tasks", "pipeline", "summary", "emails"]);
    assert!(store.preferences().collapsed.is_empty());
    assert_eq!(store.preferences().span("tasks"), Some(3));
}

#[test]
fn unwritable_location_keeps_session_state() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the file should be makes every write fail.
    let path = dir.path().join("layout.json");
    std::fs::create_dir(&path).unwrap();
    let backend = JsonFileBackend::new(&path);
    assert!(backend.write("{}").is_err());

    let mut store = store_at(&path);
    assert!(store.mutate(|mut prefs| {
        prefs.set_collapsed(&WidgetId::from("emails"), true);
        prefs
    }));
    store.flush();
    assert!(store.preferences().is_collapsed("emails"));
}
