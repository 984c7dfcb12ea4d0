use crate::dashboard::spans::clamp_span;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Stable identifier of a registered dashboard widget.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(String);

impl WidgetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WidgetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WidgetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for WidgetId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

const CARD_ORDER: &str = "cardOrder";
const COLLAPSED_SECTIONS: &str = "collapsedSections";
const COLUMN_SPANS: &str = "columnSpans";

/// Persisted layout state: widget ordering, collapsed widgets and desired spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPreferences {
    pub order: Vec<WidgetId>,
    pub collapsed: BTreeSet<WidgetId>,
    /// Desired spans in wide-tier units, always within `[MIN_SPAN, MAX_SPAN]`.
    pub spans: BTreeMap<WidgetId, u8>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesBlob<'a> {
    card_order: &'a [WidgetId],
    collapsed_sections: BTreeMap<&'a WidgetId, bool>,
    column_spans: &'a BTreeMap<WidgetId, u8>,
}

impl LayoutPreferences {
    /// Registration order, nothing collapsed, no span overrides.
    pub fn defaults(known: &[WidgetId]) -> Self {
        Self {
            order: known.to_vec(),
            ..Self::default()
        }
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    pub fn set_collapsed(&mut self, id: &WidgetId, collapsed: bool) {
        if collapsed {
            self.collapsed.insert(id.clone());
        } else {
            self.collapsed.remove(id.as_str());
        }
    }

    pub fn span(&self, id: &str) -> Option<u8> {
        self.spans.get(id).copied()
    }

    /// Store a desired span, clamping it into the valid range.
    pub fn set_span(&mut self, id: &WidgetId, span: i64) {
        self.spans.insert(id.clone(), clamp_span(span));
    }

    /// Parse a persisted blob. Each field falls back to its default on its own,
    /// so a corrupt `columnSpans` never discards a valid `cardOrder`. Problems
    /// are returned as warnings rather than errors.
    pub fn from_json(content: &str) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut prefs = Self::default();
        if content.trim().is_empty() {
            return (prefs, warnings);
        }
        let root = match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                warnings.push("layout preferences are not a JSON object; using defaults".into());
                return (prefs, warnings);
            }
            Err(e) => {
                warnings.push(format!("layout preferences are unreadable ({e}); using defaults"));
                return (prefs, warnings);
            }
        };

        match root.get(CARD_ORDER) {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    match item.as_str() {
                        Some(id) => prefs.order.push(WidgetId::from(id)),
                        None => warnings.push(format!("ignoring non-string {CARD_ORDER} entry {item}")),
                    }
                }
            }
            Some(other) => warnings.push(format!("{CARD_ORDER} is not an array: {other}")),
        }

        if let Some(map) = object_field(&root, COLLAPSED_SECTIONS, &mut warnings) {
            for (id, value) in map {
                match value.as_bool() {
                    Some(true) => {
                        prefs.collapsed.insert(WidgetId::from(id.as_str()));
                    }
                    Some(false) => {}
                    None => warnings.push(format!(
                        "ignoring non-boolean {COLLAPSED_SECTIONS} entry for '{id}'"
                    )),
                }
            }
        }

        if let Some(map) = object_field(&root, COLUMN_SPANS, &mut warnings) {
            for (id, value) in map {
                let span = value.as_i64().or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| f.round() as i64)
                });
                match span {
                    Some(span) => prefs.set_span(&WidgetId::from(id.as_str()), span),
                    None => warnings.push(format!(
                        "ignoring non-numeric {COLUMN_SPANS} entry for '{id}'"
                    )),
                }
            }
        }

        (prefs, warnings)
    }

    /// Serialize to the persisted blob format.
    pub fn to_json(&self) -> anyhow::Result<String> {
        let blob = PreferencesBlob {
            card_order: &self.order,
            collapsed_sections: self.collapsed.iter().map(|id| (id, true)).collect(),
            column_spans: &self.spans,
        };
        Ok(serde_json::to_string_pretty(&blob)?)
    }

    /// Drop collapsed flags and spans for widgets outside `known`.
    pub fn retain_known(&mut self, known: &[WidgetId]) {
        self.collapsed.retain(|id| known.contains(id));
        self.spans.retain(|id, _| known.contains(id));
    }
}

fn object_field<'a>(
    root: &'a Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match root.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            warnings.push(format!("{key} is not an object: {other}"));
            None
        }
    }
}
