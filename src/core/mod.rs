//! Core domain abstractions

pub mod deadline;
pub mod rate;

// Re-export main types for cleaner imports
pub use deadline::Deadline;
pub use rate::{ParseQuoteError, Quote, QuotePayload, RateProvider};
