use crate::schema::Category;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalize entity label: lowercase, trim, collapse runs of whitespace
pub fn normalize_label(label: &str) -> String {
    let lowered = label.to_lowercase();
    WHITESPACE.replace_all(lowered.trim(), " ").into_owned()
}

/// Deduplication key. Two raw entities are the same real-world entity
/// iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub category: Category,
    pub label: String,
}

impl DedupKey {
    pub fn new(category: Category, label: &str) -> Self {
        Self {
            category,
            label: normalize_label(label),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.label.is_empty()
    }

    /// Name hashed into the v5 id: `<Category>:<normalized label>`.
    ///
    /// Frozen. Changing this changes every id ever emitted.
    pub fn stable_name(&self) -> String {
        format!("{}:{}", self.category.as_str(), self.label)
    }

    pub fn stable_id(&self, namespace: &Uuid) -> Uuid {
        Uuid::new_v5(namespace, self.stable_name().as_bytes())
    }
}
