//! Ontology-typed entity model and the mapper from resolved extractions.
//!
//! Pipeline: [`extract::Resolver`] -> [`map_to_ontology`] -> renderers.

pub mod error;
pub mod mapper;
pub mod model;
pub mod properties;
pub mod typing;

pub use error::{MappingError, PipelineError};
pub use mapper::map_to_ontology;
pub use model::{
    EntityBase, Event, Object, OntologyGraph, Person, Place, ShortcutLink, TimeSpan, TypedEntity,
    TypedRelation,
};
pub use properties::{ShortcutField, ShortcutRule, SHORTCUT_RULES};
pub use typing::{validate_typing, TypingMismatch, TypingViolation};

use extract::{RawExtraction, ResolutionReport, Resolver};

/// Result of resolving and mapping one extraction batch.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProcessedBatch {
    pub graph: OntologyGraph,
    pub report: ResolutionReport,
    /// Relations kept despite not fitting their property's domain/range
    pub typing: Vec<TypingViolation>,
}

/// Resolve a raw extraction and map it to the ontology.
pub fn process_extraction(
    resolver: &Resolver,
    raw: &RawExtraction,
) -> Result<ProcessedBatch, PipelineError> {
    let resolution = resolver.resolve_extraction(raw)?;
    let graph = map_to_ontology(&resolution.entities, &resolution.relationships)?;
    let typing = validate_typing(&graph);

    Ok(ProcessedBatch {
        graph,
        report: resolution.report,
        typing,
    })
}
