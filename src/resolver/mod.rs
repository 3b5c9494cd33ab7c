//! Multi-strategy element resolution with retries
//!
//! Repository pages render the same control in different ways depending on
//! the course and how far the page has loaded. The resolver walks an ordered
//! list of location strategies, acts on the first element that is found and
//! visible, and retries the whole list a bounded number of times.

mod engine;

pub use engine::{Action, ElementResolver, ResolverConfig, Resolved, StrategyOutcome};
