pub mod awesome_api;

// Re-export the provider trait next to its implementations
pub use crate::core::rate::RateProvider;
