use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which endpoint of a relationship could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkSide {
    Source,
    Target,
    Both,
}

/// A relationship dropped because an endpoint ref is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLink {
    /// Position in the raw relationship list
    pub index: usize,
    pub source_ref: String,
    pub target_ref: String,
    pub property_code: String,
    pub side: LinkSide,
}

impl BrokenLink {
    pub fn missing_refs(&self) -> Vec<&str> {
        match self.side {
            LinkSide::Source => vec![self.source_ref.as_str()],
            LinkSide::Target => vec![self.target_ref.as_str()],
            LinkSide::Both => vec![self.source_ref.as_str(), self.target_ref.as_str()],
        }
    }
}

/// A raw entity folded into an earlier canonical entity with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedDuplicate {
    pub index: usize,
    pub ref_id: String,
    pub canonical_id: Uuid,
}

/// A raw entity whose label normalized to nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub index: usize,
    pub ref_id: String,
}

/// A `ref_id` reused for a different entity. The first binding is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefConflict {
    pub index: usize,
    pub ref_id: String,
    pub bound_to: Uuid,
    pub ignored: Uuid,
}

/// Diagnostics accumulated during resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub broken_links: Vec<BrokenLink>,
    pub merged: Vec<MergedDuplicate>,
    pub skipped_entities: Vec<SkippedEntity>,
    pub ref_conflicts: Vec<RefConflict>,
}

impl ResolutionReport {
    /// Number of conditions worth surfacing. Merges are expected and not counted.
    pub fn diagnostic_count(&self) -> usize {
        self.broken_links.len() + self.skipped_entities.len() + self.ref_conflicts.len()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostic_count() == 0
    }
}
