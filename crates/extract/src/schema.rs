use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of entity kinds the extraction service may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Person,
    Event,
    Place,
    Object,
    TimeSpan,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Person,
        Category::Event,
        Category::Place,
        Category::Object,
        Category::TimeSpan,
    ];

    /// Canonical name. Part of the stable id derivation, never change it.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Person => "Person",
            Category::Event => "Event",
            Category::Place => "Place",
            Category::Object => "Object",
            Category::TimeSpan => "TimeSpan",
        }
    }

    /// CIDOC CRM class code
    pub fn class_code(self) -> &'static str {
        match self {
            Category::Person => "E21",
            Category::Event => "E5",
            Category::Place => "E53",
            Category::Object => "E22",
            Category::TimeSpan => "E52",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity category: {0:?}")]
pub struct ParseCategoryError(pub String);

impl FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match folded.as_str() {
            "person" => Ok(Category::Person),
            "event" => Ok(Category::Event),
            "place" => Ok(Category::Place),
            "object" => Ok(Category::Object),
            "timespan" => Ok(Category::TimeSpan),
            _ => Err(ParseCategoryError(s.to_string())),
        }
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// An entity as emitted by the extraction service. `ref_id` is only
/// meaningful inside its own batch and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntity {
    pub ref_id: String,
    /// Category name as received; validated during resolution.
    #[serde(rename = "entity_type", alias = "category")]
    pub category: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, alias = "source_snippet", skip_serializing_if = "Option::is_none")]
    pub source_span: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

impl RawEntity {
    pub fn new(ref_id: impl Into<String>, category: Category, label: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            category: category.as_str().to_string(),
            label: label.into(),
            description: None,
            confidence: default_confidence(),
            source_span: None,
            attributes: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source_span(mut self, span: impl Into<String>) -> Self {
        self.source_span = Some(span.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// A relationship between two `ref_id`s, neither of which has been checked yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRelationship {
    pub source_ref: String,
    pub target_ref: String,
    pub property_code: String,
    pub property_label: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default, alias = "source_snippet", skip_serializing_if = "Option::is_none")]
    pub source_span: Option<String>,
}

impl RawRelationship {
    pub fn new(
        source_ref: impl Into<String>,
        target_ref: impl Into<String>,
        property_code: impl Into<String>,
        property_label: impl Into<String>,
    ) -> Self {
        Self {
            source_ref: source_ref.into(),
            target_ref: target_ref.into(),
            property_code: property_code.into(),
            property_label: property_label.into(),
            confidence: default_confidence(),
            source_span: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_source_span(mut self, span: impl Into<String>) -> Self {
        self.source_span = Some(span.into());
        self
    }
}

/// One batch returned by the extraction service for a single input text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    #[serde(default = "default_confidence")]
    pub overall_confidence: f64,
}

impl Default for RawExtraction {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            relationships: Vec::new(),
            overall_confidence: default_confidence(),
        }
    }
}
