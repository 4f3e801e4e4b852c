// Talent search: criteria, query composition, paged execution.
// Composition is pure; only the executor touches the SearchStore.

pub mod composer;
pub mod criteria;
pub mod executor;
pub mod handlers;
