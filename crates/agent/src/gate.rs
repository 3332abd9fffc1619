//! Retrieval gate: the branch between planning and composition.

use nakshatra_core::knowledge::RetrievalQuery;

use crate::planner::RetrievalDecision;

/// The next stage of a turn after planning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route<'a> {
    /// Search the knowledge base with this query, then compose.
    Retrieve(&'a RetrievalQuery),
    /// Compose from the chart and history alone.
    Compose,
}

/// Retrieval runs exactly when the planner asked for it with a usable query.
pub fn route(decision: &RetrievalDecision) -> Route<'_> {
    match decision {
        RetrievalDecision::Retrieve(query) => Route::Retrieve(query),
        RetrievalDecision::Skip { .. } => Route::Compose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nakshatra_core::knowledge::MetadataFilters;

    #[test]
    fn retrieve_decision_routes_to_retrieval() {
        let query = RetrievalQuery::new("Leo traits", MetadataFilters::default()).unwrap();
        let decision = RetrievalDecision::Retrieve(query.clone());
        assert_eq!(route(&decision), Route::Retrieve(&query));
    }

    #[test]
    fn skip_routes_to_composer() {
        assert_eq!(route(&RetrievalDecision::skip("greeting")), Route::Compose);
    }
}
