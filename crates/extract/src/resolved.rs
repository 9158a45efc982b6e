use crate::report::ResolutionReport;
use crate::schema::Category;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A deduplicated entity with a stable id. One per (category, normalized label)
/// in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    pub id: Uuid,
    pub category: Category,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl ResolvedEntity {
    pub fn class_code(&self) -> &'static str {
        self.category.class_code()
    }

    /// String attribute carried through from the raw extraction.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// A relationship whose endpoints both exist in the registry that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRelationship {
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub property_code: String,
    pub property_label: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl ResolvedRelationship {
    pub fn is_reflexive(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub entities: Vec<ResolvedEntity>,
    pub relationships: Vec<ResolvedRelationship>,
    pub report: ResolutionReport,
}
