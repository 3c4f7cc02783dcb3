//! Suggestion domain types and the static fallback table
//!
//! The fallback table answers every request the AI path cannot: entries are
//! embedded at compile time, filtered by situation and duration, shuffled,
//! and trimmed to three. Job seekers and career changers get a dedicated
//! table tuned to application-period stress.

pub mod fallback;
pub mod types;

pub use fallback::fallback_suggestions;
pub use types::{
    AgeGroup, BreakDuration, Category, Situation, Suggestion, SuggestionRequest, new_id,
};
