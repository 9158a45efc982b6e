use crate::error::{confidence_in_range, ResolveError};
use crate::normalizer::DedupKey;
use crate::report::{
    BrokenLink, LinkSide, MergedDuplicate, RefConflict, ResolutionReport, SkippedEntity,
};
use crate::resolved::{Resolution, ResolvedEntity, ResolvedRelationship};
use crate::schema::{Category, RawEntity, RawExtraction, RawRelationship};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Namespace for stable entity ids unless the caller injects another one.
pub const DEFAULT_NAMESPACE: Uuid = Uuid::from_u128(0x6ba7b810_9dad_11d1_80b4_00c04fd430c8);

/// Outcome of registering one raw entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First entity seen for its key
    Canonical(Uuid),
    /// Folded into an earlier entity with the same key
    Merged(Uuid),
    /// Blank label, not registered
    Skipped,
}

/// Maps batch-local `ref_id`s to canonical entities. One registry per batch.
#[derive(Debug)]
pub struct EntityRegistry {
    namespace: Uuid,
    entities: Vec<ResolvedEntity>,
    by_key: HashMap<DedupKey, usize>,
    by_id: HashMap<Uuid, usize>,
    by_ref: HashMap<String, usize>,
    registered: usize,
    report: ResolutionReport,
}

impl EntityRegistry {
    pub fn new(namespace: Uuid) -> Self {
        Self {
            namespace,
            entities: Vec::new(),
            by_key: HashMap::new(),
            by_id: HashMap::new(),
            by_ref: HashMap::new(),
            registered: 0,
            report: ResolutionReport::default(),
        }
    }

    /// Register a raw entity. The first entity for a key is canonical; later
    /// ones keep only their `ref_id` as an alias.
    pub fn register(&mut self, raw: &RawEntity) -> Result<Registration, ResolveError> {
        let index = self.registered;
        self.registered += 1;

        let category: Category =
            raw.category
                .parse()
                .map_err(|_| ResolveError::UnknownCategory {
                    index,
                    ref_id: raw.ref_id.clone(),
                    category: raw.category.clone(),
                })?;

        if !confidence_in_range(raw.confidence) {
            return Err(ResolveError::EntityConfidence {
                index,
                ref_id: raw.ref_id.clone(),
                value: raw.confidence,
            });
        }

        let key = DedupKey::new(category, &raw.label);
        if key.is_blank() {
            warn!(index, ref_id = %raw.ref_id, "Entity has blank label, skipping");
            self.report.skipped_entities.push(SkippedEntity {
                index,
                ref_id: raw.ref_id.clone(),
            });
            return Ok(Registration::Skipped);
        }

        let (slot, registration) = match self.by_key.get(&key) {
            Some(&slot) => {
                let canonical_id = self.entities[slot].id;
                debug!(
                    index,
                    ref_id = %raw.ref_id,
                    canonical_id = %canonical_id,
                    "Merging duplicate entity"
                );
                self.report.merged.push(MergedDuplicate {
                    index,
                    ref_id: raw.ref_id.clone(),
                    canonical_id,
                });
                (slot, Registration::Merged(canonical_id))
            }
            None => {
                let id = key.stable_id(&self.namespace);
                let slot = self.entities.len();
                self.entities.push(ResolvedEntity {
                    id,
                    category,
                    label: raw.label.clone(),
                    description: raw.description.clone(),
                    confidence: raw.confidence,
                    source_text: raw.source_span.clone(),
                    properties: raw.attributes.clone(),
                });
                self.by_key.insert(key, slot);
                self.by_id.insert(id, slot);
                (slot, Registration::Canonical(id))
            }
        };

        self.bind_ref(index, &raw.ref_id, slot);
        Ok(registration)
    }

    fn bind_ref(&mut self, index: usize, ref_id: &str, slot: usize) {
        match self.by_ref.get(ref_id) {
            None => {
                self.by_ref.insert(ref_id.to_string(), slot);
            }
            Some(&bound) if bound == slot => {}
            Some(&bound) => {
                let bound_to = self.entities[bound].id;
                let ignored = self.entities[slot].id;
                warn!(
                    index,
                    ref_id,
                    bound_to = %bound_to,
                    ignored = %ignored,
                    "ref_id reused for a different entity, keeping first binding"
                );
                self.report.ref_conflicts.push(RefConflict {
                    index,
                    ref_id: ref_id.to_string(),
                    bound_to,
                    ignored,
                });
            }
        }
    }

    pub fn resolve_ref(&self, ref_id: &str) -> Option<&ResolvedEntity> {
        self.by_ref.get(ref_id).map(|&slot| &self.entities[slot])
    }

    pub fn get(&self, id: &Uuid) -> Option<&ResolvedEntity> {
        self.by_id.get(id).map(|&slot| &self.entities[slot])
    }

    /// Rewrite a raw relationship onto canonical ids. Returns `Ok(None)` and
    /// records a broken link when either endpoint is unknown.
    pub fn link(
        &mut self,
        index: usize,
        raw: &RawRelationship,
    ) -> Result<Option<ResolvedRelationship>, ResolveError> {
        if !confidence_in_range(raw.confidence) {
            return Err(ResolveError::RelationshipConfidence {
                index,
                source_ref: raw.source_ref.clone(),
                target_ref: raw.target_ref.clone(),
                value: raw.confidence,
            });
        }

        let source = self.resolve_ref(&raw.source_ref).map(|e| e.id);
        let target = self.resolve_ref(&raw.target_ref).map(|e| e.id);

        let side = match (source, target) {
            (Some(source_id), Some(target_id)) => {
                return Ok(Some(ResolvedRelationship {
                    source_id,
                    target_id,
                    property_code: raw.property_code.clone(),
                    property_label: raw.property_label.clone(),
                    confidence: raw.confidence,
                    source_text: raw.source_span.clone(),
                }));
            }
            (None, Some(_)) => LinkSide::Source,
            (Some(_), None) => LinkSide::Target,
            (None, None) => LinkSide::Both,
        };

        warn!(
            index,
            source_ref = %raw.source_ref,
            target_ref = %raw.target_ref,
            property_code = %raw.property_code,
            side = ?side,
            "Broken relationship, skipping"
        );
        self.report.broken_links.push(BrokenLink {
            index,
            source_ref: raw.source_ref.clone(),
            target_ref: raw.target_ref.clone(),
            property_code: raw.property_code.clone(),
            side,
        });
        Ok(None)
    }

    /// Unique entities in first-seen order
    pub fn entities(&self) -> &[ResolvedEntity] {
        &self.entities
    }

    pub fn report(&self) -> &ResolutionReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn into_parts(self) -> (Vec<ResolvedEntity>, ResolutionReport) {
        (self.entities, self.report)
    }
}

/// Two-stage resolution: register every entity, then rewrite relationships.
///
/// Holds no state between calls, so one resolver can serve concurrent batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    namespace: Uuid,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Resolver {
    pub fn new(namespace: Uuid) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> Uuid {
        self.namespace
    }

    pub fn resolve(
        &self,
        entities: &[RawEntity],
        relationships: &[RawRelationship],
    ) -> Result<Resolution, ResolveError> {
        let mut registry = EntityRegistry::new(self.namespace);

        for raw in entities {
            registry.register(raw)?;
        }

        let mut resolved = Vec::with_capacity(relationships.len());
        for (index, raw) in relationships.iter().enumerate() {
            if let Some(rel) = registry.link(index, raw)? {
                resolved.push(rel);
            }
        }

        let (entities_out, report) = registry.into_parts();

        info!(
            raw_entities = entities.len(),
            entities = entities_out.len(),
            raw_relationships = relationships.len(),
            relationships = resolved.len(),
            broken_links = report.broken_links.len(),
            merged = report.merged.len(),
            "Resolved extraction batch"
        );

        Ok(Resolution {
            entities: entities_out,
            relationships: resolved,
            report,
        })
    }

    pub fn resolve_extraction(&self, raw: &RawExtraction) -> Result<Resolution, ResolveError> {
        self.resolve(&raw.entities, &raw.relationships)
    }
}

/// Resolve with [`DEFAULT_NAMESPACE`].
pub fn resolve(
    entities: &[RawEntity],
    relationships: &[RawRelationship],
) -> Result<Resolution, ResolveError> {
    Resolver::default().resolve(entities, relationships)
}
