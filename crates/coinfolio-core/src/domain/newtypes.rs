//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// CoinId
// ============================================================================

/// Stable integer identifier of a tradable asset
///
/// The id space is owned by the market data provider and shared by the
/// catalog and holdings tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinId(u32);

impl CoinId {
    /// Create a CoinId from its raw provider value
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw provider value
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Value used as the SQLite primary key
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        i64::from(self.0)
    }
}

impl Display for CoinId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CoinId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|e| DomainError::InvalidCoinId(format!("{s}: {e}")))
    }
}

impl From<u32> for CoinId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl TryFrom<i64> for CoinId {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::InvalidCoinId(value.to_string()))
    }
}

// ============================================================================
// FiatCode
// ============================================================================

/// Quote currency code (e.g. `USD`, `EUR`, or a crypto quote such as `BTC`)
///
/// Codes are normalized to uppercase and must be 3 to 5 ASCII alphanumeric
/// characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FiatCode(String);

impl FiatCode {
    /// Create a validated, uppercased currency code
    ///
    /// # Errors
    /// Returns `DomainError::InvalidFiatCode` if the code has the wrong
    /// length or contains non-alphanumeric characters.
    pub fn new(code: impl AsRef<str>) -> Result<Self, DomainError> {
        let code = code.as_ref().trim();
        let valid_len = (3..=5).contains(&code.len());
        if !valid_len || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(DomainError::InvalidFiatCode(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// United States dollar, the provider's default quote currency
    #[must_use]
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Get the code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FiatCode {
    fn default() -> Self {
        Self::usd()
    }
}

impl Display for FiatCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FiatCode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for FiatCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FiatCode> for String {
    fn from(code: FiatCode) -> Self {
        code.0
    }
}

impl AsRef<str> for FiatCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
