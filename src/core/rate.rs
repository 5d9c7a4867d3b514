//! Rate abstractions and core types

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

use crate::core::deadline::Deadline;
use crate::error::FetchError;

/// A single observed foreign-exchange rate.
///
/// The value is a decimal so the provider's textual rate (e.g. `"5.1234"`)
/// round-trips without loss; serializing it back yields a decimal-equal
/// string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseQuoteError {
    #[error("not a decimal number: '{0}'")]
    NotANumber(String),
    #[error("negative rate: '{0}'")]
    Negative(String),
}

impl Quote {
    /// Parses a textual rate into a quote. A rate that fails to parse or is
    /// negative is an error, never a zero or sentinel value.
    pub fn parse(text: &str) -> Result<Self, ParseQuoteError> {
        let value = Decimal::from_str(text.trim())
            .map_err(|_| ParseQuoteError::NotANumber(text.to_string()))?;
        if value.is_sign_negative() {
            return Err(ParseQuoteError::Negative(text.to_string()));
        }
        Ok(Self { value })
    }
}

impl Display for Quote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Body of the service's success response. The wire payload carries exactly
/// one field; the decimal serializes as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotePayload {
    pub quote: Decimal,
}

/// A source of foreign-exchange rate observations.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches one quote for `pair`, abandoning the attempt once `deadline`
    /// expires.
    async fn fetch(&self, pair: &str, deadline: Deadline) -> Result<Quote, FetchError>;
}
