//! Raw extraction records and the entity registry that turns them into
//! stable, deduplicated entities and relationships.
//!
//! Pipeline: extraction service -> [`RawExtraction`] -> [`Resolver`] -> [`Resolution`].

pub mod error;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod registry;
pub mod report;
pub mod resolved;
pub mod schema;

pub use error::ResolveError;
pub use llm::OllamaClient;
pub use normalizer::{normalize_label, DedupKey};
pub use registry::{resolve, EntityRegistry, Registration, Resolver, DEFAULT_NAMESPACE};
pub use report::{BrokenLink, LinkSide, MergedDuplicate, RefConflict, ResolutionReport, SkippedEntity};
pub use resolved::{Resolution, ResolvedEntity, ResolvedRelationship};
pub use schema::{Category, ParseCategoryError, RawEntity, RawExtraction, RawRelationship};

use anyhow::{Context, Result};

/// Client side of the extraction service: text in, [`RawExtraction`] out.
pub struct Extractor {
    llm_client: OllamaClient,
    max_json_retries: usize,
}

impl Extractor {
    pub fn new(llm_client: OllamaClient) -> Self {
        Self {
            llm_client,
            max_json_retries: 3,
        }
    }

    pub fn with_max_json_retries(mut self, max_json_retries: usize) -> Self {
        self.max_json_retries = max_json_retries.max(1);
        self
    }

    pub fn llm_client(&self) -> &OllamaClient {
        &self.llm_client
    }

    /// Ask the LLM for an extraction and return its JSON verbatim
    pub async fn request_json(&self, text: &str) -> Result<String> {
        let prompt = prompt::build_extraction_prompt(text);

        self.llm_client
            .generate_json_with_retry(&prompt, self.max_json_retries)
            .await
            .context("Failed to extract entities after retries")
    }

    /// Extract entities and relations from a chunk of text
    pub async fn extract_from_text(&self, text: &str) -> Result<RawExtraction> {
        let json = self.request_json(text).await?;
        parse_extraction(&json)
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(OllamaClient::default())
    }
}

/// Parse an extraction payload, tolerating a surrounding markdown code fence.
pub fn parse_extraction(json: &str) -> Result<RawExtraction> {
    serde_json::from_str(strip_code_fence(json)).context("Failed to parse extraction result")
}

pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "entities": [
            {"ref_id": "person_1", "entity_type": "Person", "label": "Albert Einstein", "confidence": 0.95},
            {"ref_id": "place_1", "entity_type": "Place", "label": "Ulm"}
        ],
        "relationships": [
            {"source_ref": "person_1", "target_ref": "place_1", "property_code": "P98", "property_label": "was born"}
        ]
    }"#;

    #[test]
    fn test_parse_extraction() {
        let raw = parse_extraction(PAYLOAD).unwrap();
        assert_eq!(raw.entities.len(), 2);
        assert_eq!(raw.entities[0].confidence, 0.95);
        assert_eq!(raw.relationships[0].confidence, 1.0);
    }

    #[test]
    fn test_parse_extraction_strips_code_fence() {
        let fenced = format!("```json\n{}\n```", PAYLOAD);
        let raw = parse_extraction(&fenced).unwrap();
        assert_eq!(raw.relationships.len(), 1);
    }

    #[test]
    fn test_parse_extraction_rejects_garbage() {
        assert!(parse_extraction("not json").is_err());
    }

    #[test]
    fn test_parsed_payload_resolves() {
        let raw = parse_extraction(PAYLOAD).unwrap();
        let resolution = Resolver::default().resolve_extraction(&raw).unwrap();
        assert_eq!(resolution.entities.len(), 2);
        assert_eq!(resolution.relationships.len(), 1);
    }

    #[test]
    fn test_extractor_retry_floor() {
        let extractor = Extractor::default().with_max_json_retries(0);
        assert_eq!(extractor.max_json_retries, 1);
        assert_eq!(extractor.llm_client().model(), "llama3");
    }
}
