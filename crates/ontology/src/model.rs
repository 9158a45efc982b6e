use crate::properties::ShortcutField;
use extract::{Category, ResolvedEntity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Fields shared by every typed entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBase {
    pub id: Uuid,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl From<&ResolvedEntity> for EntityBase {
    fn from(entity: &ResolvedEntity) -> Self {
        Self {
            id: entity.id,
            label: entity.label.clone(),
            description: entity.description.clone(),
            confidence: entity.confidence,
            source_text: entity.source_text.clone(),
            properties: entity.properties.clone(),
        }
    }
}

/// E21 Person
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(flatten)]
    pub base: EntityBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<Uuid>,
}

/// E5 Event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub base: EntityBase,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timespan: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub took_place_at: Option<Uuid>,
}

/// E53 Place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub base: EntityBase,
    pub place_type: String,
}

/// E22 Human-Made Object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    #[serde(flatten)]
    pub base: EntityBase,
    pub object_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub produced_by: Option<Uuid>,
}

/// E52 Time-Span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    #[serde(flatten)]
    pub base: EntityBase,
    pub time_type: String,
}

/// The closed set of ontology-typed entities.
///
/// Shortcut fields are plain ids into the same batch; no entity owns another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum TypedEntity {
    Person(Person),
    Event(Event),
    Place(Place),
    Object(Object),
    TimeSpan(TimeSpan),
}

impl TypedEntity {
    pub fn base(&self) -> &EntityBase {
        match self {
            TypedEntity::Person(e) => &e.base,
            TypedEntity::Event(e) => &e.base,
            TypedEntity::Place(e) => &e.base,
            TypedEntity::Object(e) => &e.base,
            TypedEntity::TimeSpan(e) => &e.base,
        }
    }

    pub fn id(&self) -> Uuid {
        self.base().id
    }

    pub fn label(&self) -> &str {
        &self.base().label
    }

    pub fn category(&self) -> Category {
        match self {
            TypedEntity::Person(_) => Category::Person,
            TypedEntity::Event(_) => Category::Event,
            TypedEntity::Place(_) => Category::Place,
            TypedEntity::Object(_) => Category::Object,
            TypedEntity::TimeSpan(_) => Category::TimeSpan,
        }
    }

    pub fn class_code(&self) -> &'static str {
        self.category().class_code()
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            TypedEntity::Person(_) => "Person",
            TypedEntity::Event(_) => "Event",
            TypedEntity::Place(_) => "Place",
            TypedEntity::Object(_) => "Human-Made Object",
            TypedEntity::TimeSpan(_) => "Time-Span",
        }
    }

    /// Populated shortcut fields, in declaration order.
    pub fn shortcuts(&self) -> Vec<(ShortcutField, Uuid)> {
        let fields: Vec<(ShortcutField, Option<Uuid>)> = match self {
            TypedEntity::Person(p) => vec![(ShortcutField::CurrentLocation, p.current_location)],
            TypedEntity::Event(e) => vec![
                (ShortcutField::Timespan, e.timespan),
                (ShortcutField::TookPlaceAt, e.took_place_at),
            ],
            TypedEntity::Object(o) => vec![
                (ShortcutField::CurrentLocation, o.current_location),
                (ShortcutField::ProducedBy, o.produced_by),
            ],
            TypedEntity::Place(_) | TypedEntity::TimeSpan(_) => Vec::new(),
        };

        fields
            .into_iter()
            .filter_map(|(field, target)| target.map(|id| (field, id)))
            .collect()
    }
}

/// Generic (source, property, target) edge, one per resolved relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedRelation {
    pub source_id: Uuid,
    pub property_code: String,
    pub property_label: String,
    pub target_id: Uuid,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

/// A shortcut field expanded into an explicit edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutLink {
    pub source_id: Uuid,
    pub field: ShortcutField,
    pub property_code: String,
    pub target_id: Uuid,
}

/// Mapper output handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologyGraph {
    pub entities: Vec<TypedEntity>,
    pub relations: Vec<TypedRelation>,
}

impl OntologyGraph {
    pub fn entity(&self, id: &Uuid) -> Option<&TypedEntity> {
        self.entities.iter().find(|e| e.id() == *id)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Shortcut fields of every entity as edges, in entity order.
    pub fn shortcut_links(&self) -> Vec<ShortcutLink> {
        self.entities
            .iter()
            .flat_map(|entity| {
                let category = entity.category();
                entity.shortcuts().into_iter().filter_map(move |(field, target_id)| {
                    crate::properties::rule_for(category, field).map(|rule| ShortcutLink {
                        source_id: entity.id(),
                        field,
                        property_code: rule.property_code.to_string(),
                        target_id,
                    })
                })
            })
            .collect()
    }

    /// Ids referenced by relations or shortcuts that are not in `entities`.
    pub fn dangling_references(&self) -> Vec<Uuid> {
        let known: std::collections::HashSet<Uuid> = self.entities.iter().map(TypedEntity::id).collect();

        let relation_ends = self
            .relations
            .iter()
            .flat_map(|r| [r.source_id, r.target_id]);
        let shortcut_ends = self
            .entities
            .iter()
            .flat_map(|e| e.shortcuts().into_iter().map(|(_, id)| id));

        relation_ends
            .chain(shortcut_ends)
            .filter(|id| !known.contains(id))
            .collect()
    }
}
