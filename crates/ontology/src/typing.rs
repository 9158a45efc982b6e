//! Domain/range checks for relations against the property vocabulary the
//! extraction prompt advertises.
//!
//! Mismatches are warnings: the relation is still kept and rendered.

use crate::model::OntologyGraph;
use crate::properties::canonical_code;
use extract::Category;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use Category::{Event, Object, Person, Place, TimeSpan};

/// Accepted (source, target) category pairs for one property code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTyping {
    pub code: &'static str,
    pub pairs: &'static [(Category, Category)],
}

impl PropertyTyping {
    fn accepts_domain(&self, category: Category) -> bool {
        self.pairs.iter().any(|(domain, _)| *domain == category)
    }

    fn accepts_range(&self, category: Category) -> bool {
        self.pairs.iter().any(|(_, range)| *range == category)
    }

    fn accepts(&self, source: Category, target: Category) -> bool {
        self.pairs.contains(&(source, target))
    }
}

// P98 and P100 also accept the Person-first reading used in extraction output.
pub const PROPERTY_TYPING: &[PropertyTyping] = &[
    PropertyTyping { code: "P4", pairs: &[(Event, TimeSpan)] },
    PropertyTyping { code: "P7", pairs: &[(Event, Place)] },
    PropertyTyping { code: "P11", pairs: &[(Event, Person)] },
    PropertyTyping { code: "P14", pairs: &[(Event, Person)] },
    PropertyTyping { code: "P53", pairs: &[(Person, Place), (Object, Place)] },
    PropertyTyping { code: "P98", pairs: &[(Event, Person), (Person, Place), (Person, Event)] },
    PropertyTyping { code: "P100", pairs: &[(Event, Person), (Person, Event)] },
    PropertyTyping { code: "P108", pairs: &[(Event, Object)] },
    PropertyTyping { code: "P108i", pairs: &[(Object, Event)] },
];

pub fn typing_for(code: &str) -> Option<&'static PropertyTyping> {
    let code = canonical_code(code);
    PROPERTY_TYPING.iter().find(|t| t.code == code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypingMismatch {
    /// Source category is never a domain of the property
    Domain,
    /// Target category is never a range of the property
    Range,
    Both,
    /// Each end fits some pair, but not together
    Pairing,
}

/// A relation whose endpoint categories do not fit its property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingViolation {
    /// Position in `OntologyGraph::relations`
    pub index: usize,
    pub property_code: String,
    pub source_id: Uuid,
    pub source_category: Category,
    pub target_id: Uuid,
    pub target_category: Category,
    pub mismatch: TypingMismatch,
}

/// Check every relation with a known property code. Unknown codes and
/// relations whose endpoints are missing from the graph are not checked.
pub fn validate_typing(graph: &OntologyGraph) -> Vec<TypingViolation> {
    let mut violations = Vec::new();

    for (index, relation) in graph.relations.iter().enumerate() {
        let Some(typing) = typing_for(&relation.property_code) else {
            debug!(index, property_code = %relation.property_code, "No typing rule for property");
            continue;
        };
        let (Some(source), Some(target)) =
            (graph.entity(&relation.source_id), graph.entity(&relation.target_id))
        else {
            continue;
        };
        let (source_category, target_category) = (source.category(), target.category());

        let mismatch = match (
            typing.accepts_domain(source_category),
            typing.accepts_range(target_category),
        ) {
            (false, false) => TypingMismatch::Both,
            (false, true) => TypingMismatch::Domain,
            (true, false) => TypingMismatch::Range,
            (true, true) if !typing.accepts(source_category, target_category) => {
                TypingMismatch::Pairing
            }
            (true, true) => continue,
        };

        warn!(
            index,
            property_code = %relation.property_code,
            source = %source_category,
            target = %target_category,
            mismatch = ?mismatch,
            "Relation does not fit property domain/range"
        );
        violations.push(TypingViolation {
            index,
            property_code: relation.property_code.clone(),
            source_id: relation.source_id,
            source_category,
            target_id: relation.target_id,
            target_category,
            mismatch,
        });
    }

    violations
}
