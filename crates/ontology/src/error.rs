use extract::{LinkSide, ResolveError};
use thiserror::Error;
use uuid::Uuid;

/// Inputs to the mapper that break the no-dangling-reference guarantee.
/// Resolver output never produces these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("relationship #{index} {side:?} id {id} is not among the resolved entities")]
    DanglingEndpoint { index: usize, side: LinkSide, id: Uuid },

    #[error("entity id {id} appears more than once (entities #{first} and #{second})")]
    DuplicateEntityId { id: Uuid, first: usize, second: usize },
}

/// Failure of a full resolve + map pass for one batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),
}
