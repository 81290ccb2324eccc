use crate::db_types::RatingAggregate;

/// The result of applying a rating event to an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingOutcome {
    /// The event was fresh; the aggregate now reflects it.
    Applied(RatingAggregate),
    /// The event had already been applied. Expected under at-least-once delivery; not an error.
    Duplicate,
}

impl RatingOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, RatingOutcome::Duplicate)
    }
}
