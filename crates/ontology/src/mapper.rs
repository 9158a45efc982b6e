use crate::error::MappingError;
use crate::model::{EntityBase, Event, Object, OntologyGraph, Person, Place, TimeSpan, TypedEntity, TypedRelation};
use crate::properties::{rule_for, ShortcutField};
use extract::{Category, LinkSide, ResolvedEntity, ResolvedRelationship};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

const UNKNOWN_KIND: &str = "unknown";

type Indexed<'a> = Vec<(usize, &'a ResolvedRelationship)>;

/// Relationships by source and by target id, plus the category of every entity.
struct RelationIndex<'a> {
    categories: HashMap<Uuid, Category>,
    outgoing: HashMap<Uuid, Indexed<'a>>,
    incoming: HashMap<Uuid, Indexed<'a>>,
}

impl<'a> RelationIndex<'a> {
    fn build(
        entities: &[ResolvedEntity],
        relationships: &'a [ResolvedRelationship],
    ) -> Result<Self, MappingError> {
        let mut categories = HashMap::with_capacity(entities.len());
        let mut positions: HashMap<Uuid, usize> = HashMap::with_capacity(entities.len());

        for (index, entity) in entities.iter().enumerate() {
            if let Some(&first) = positions.get(&entity.id) {
                return Err(MappingError::DuplicateEntityId {
                    id: entity.id,
                    first,
                    second: index,
                });
            }
            positions.insert(entity.id, index);
            categories.insert(entity.id, entity.category);
        }

        let mut outgoing: HashMap<Uuid, Indexed<'a>> = HashMap::new();
        let mut incoming: HashMap<Uuid, Indexed<'a>> = HashMap::new();
        for (index, rel) in relationships.iter().enumerate() {
            let missing_source = !categories.contains_key(&rel.source_id);
            let missing_target = !categories.contains_key(&rel.target_id);
            let dangling = match (missing_source, missing_target) {
                (false, false) => None,
                (true, false) => Some((LinkSide::Source, rel.source_id)),
                (false, true) => Some((LinkSide::Target, rel.target_id)),
                (true, true) => Some((LinkSide::Both, rel.source_id)),
            };
            if let Some((side, id)) = dangling {
                return Err(MappingError::DanglingEndpoint { index, side, id });
            }

            outgoing.entry(rel.source_id).or_default().push((index, rel));
            incoming.entry(rel.target_id).or_default().push((index, rel));
        }

        Ok(Self {
            categories,
            outgoing,
            incoming,
        })
    }

    fn category_of(&self, id: &Uuid) -> Option<Category> {
        self.categories.get(id).copied()
    }

    /// Other end of the earliest relationship (input order) that satisfies
    /// the shortcut rule, scanning outgoing and inverse incoming edges.
    fn shortcut(&self, entity: &ResolvedEntity, field: ShortcutField) -> Option<Uuid> {
        let rule = rule_for(entity.category, field)?;

        let forward = self.outgoing.get(&entity.id).and_then(|rels| {
            rels.iter().find(|(_, rel)| {
                rule.matches_outgoing(&rel.property_code)
                    && self.category_of(&rel.target_id) == Some(rule.range)
            })
        });
        let inverse = self.incoming.get(&entity.id).and_then(|rels| {
            rels.iter().find(|(_, rel)| {
                rule.matches_incoming(&rel.property_code)
                    && self.category_of(&rel.source_id) == Some(rule.range)
            })
        });

        match (forward, inverse) {
            (Some(&(f, rel)), Some(&(i, _))) if f < i => Some(rel.target_id),
            (_, Some(&(_, rel))) => Some(rel.source_id),
            (Some(&(_, rel)), None) => Some(rel.target_id),
            (None, None) => None,
        }
    }
}

fn kind(entity: &ResolvedEntity, key: &str) -> String {
    entity.property_str(key).unwrap_or(UNKNOWN_KIND).to_string()
}

fn to_typed(entity: &ResolvedEntity, index: &RelationIndex<'_>) -> TypedEntity {
    let base = EntityBase::from(entity);

    // New categories must be wired in here explicitly.
    match entity.category {
        Category::Person => TypedEntity::Person(Person {
            base,
            current_location: index.shortcut(entity, ShortcutField::CurrentLocation),
        }),
        Category::Event => TypedEntity::Event(Event {
            base,
            event_type: kind(entity, "event_type"),
            timespan: index.shortcut(entity, ShortcutField::Timespan),
            took_place_at: index.shortcut(entity, ShortcutField::TookPlaceAt),
        }),
        Category::Place => TypedEntity::Place(Place {
            base,
            place_type: kind(entity, "place_type"),
        }),
        Category::Object => TypedEntity::Object(Object {
            base,
            object_type: kind(entity, "object_type"),
            current_location: index.shortcut(entity, ShortcutField::CurrentLocation),
            produced_by: index.shortcut(entity, ShortcutField::ProducedBy),
        }),
        Category::TimeSpan => TypedEntity::TimeSpan(TimeSpan {
            base,
            time_type: kind(entity, "time_type"),
        }),
    }
}

fn to_relation(rel: &ResolvedRelationship) -> TypedRelation {
    TypedRelation {
        source_id: rel.source_id,
        property_code: rel.property_code.clone(),
        property_label: rel.property_label.clone(),
        target_id: rel.target_id,
        confidence: rel.confidence,
        provenance: rel.source_text.clone(),
    }
}

/// Map resolved entities and relationships to ontology-typed ones.
///
/// Entity order follows `entities`, relation order follows `relationships`.
/// Every relationship yields a [`TypedRelation`] even when it also filled a
/// shortcut field.
pub fn map_to_ontology(
    entities: &[ResolvedEntity],
    relationships: &[ResolvedRelationship],
) -> Result<OntologyGraph, MappingError> {
    let index = RelationIndex::build(entities, relationships)?;

    let typed: Vec<TypedEntity> = entities.iter().map(|e| to_typed(e, &index)).collect();
    let relations: Vec<TypedRelation> = relationships.iter().map(to_relation).collect();

    debug!(
        entities = typed.len(),
        relations = relations.len(),
        "Mapped batch to ontology"
    );

    Ok(OntologyGraph {
        entities: typed,
        relations,
    })
}
