use thiserror::Error;

/// Hard failures of the resolution stage. Broken links are not errors; they
/// are reported in [`crate::ResolutionReport`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("entity #{index} (ref_id {ref_id:?}) has category {category:?}, expected one of Person, Event, Place, Object, TimeSpan")]
    UnknownCategory {
        index: usize,
        ref_id: String,
        category: String,
    },

    #[error("entity #{index} (ref_id {ref_id:?}) has confidence {value}, expected a value in [0, 1]")]
    EntityConfidence {
        index: usize,
        ref_id: String,
        value: f64,
    },

    #[error("relationship #{index} ({source_ref:?} -> {target_ref:?}) has confidence {value}, expected a value in [0, 1]")]
    RelationshipConfidence {
        index: usize,
        source_ref: String,
        target_ref: String,
        value: f64,
    },
}

/// NaN is out of range.
pub(crate) fn confidence_in_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}
