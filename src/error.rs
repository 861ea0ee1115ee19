use crate::model::AgentType;
use thiserror::Error;

/// Failures of the grid core.
///
/// All of them are deterministic given their inputs, so none is worth retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    #[error("side length must be positive and its square must fit in memory, but is {0}")]
    InvalidDimension(usize),

    #[error("fraction of {agent:?} must be in the range 0.0..=1.0, but is {value}")]
    InvalidFraction { agent: AgentType, value: f64 },

    #[error("{requested} cells requested, but the grid only has {capacity}")]
    OutOfCapacity { requested: usize, capacity: usize },

    #[error("cannot place {requested} {agent:?} agents in {available} vacancies")]
    InvariantBroken {
        agent: AgentType,
        requested: usize,
        available: usize,
    },

    #[error("threshold must be in the range 0.0..=1.0, but is {0}")]
    OutOfRangeThreshold(f64),
}
