//! Canonical recipient identities.
//!
//! A raw contact string (as typed into a spreadsheet: spaces, dashes,
//! parentheses) becomes the phone-based identity `<digits>@c.us`. Strings that
//! already carry an `@` suffix are trusted as-is. The country code is never
//! guessed: a number typed without it stays without it.
//!
//! CHANGELOG:
//! - 10/18/2026 - Dropped national-number prefixing (misaddressed foreign numbers)
//! - 10/15/2026 - Country plan made configurable
//! - 10/12/2026 - Initial implementation, adapted from send-by-phone normalization

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IdentityError;

/// Suffix of phone-based identities.
pub const PHONE_SUFFIX: &str = "@c.us";

/// Suffix of alias identities.
pub const ALIAS_SUFFIX: &str = "@lid";

/// Addressing string accepted by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientIdentity(String);

impl RecipientIdentity {
    /// Wrap an identity string without validation.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build the phone-based identity for an already canonical digit string.
    pub fn from_digits(digits: &str) -> Self {
        Self(format!("{}{}", digits, PHONE_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// User part before the `@`.
    pub fn user(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// Digits of the user part (empty for most alias ids).
    pub fn digits(&self) -> String {
        normalize_digits(self.user())
    }

    pub fn is_phone_based(&self) -> bool {
        self.0.ends_with(PHONE_SUFFIX)
    }

    pub fn is_alias(&self) -> bool {
        self.0.ends_with(ALIAS_SUFFIX)
    }
}

impl fmt::Display for RecipientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mobile numbering plan used to repair short numbers.
///
/// The default is Brazil: `55` + two-digit area code + nine-digit mobile
/// number. Older numbers missing the leading mobile `9` get it re-inserted
/// right after the area code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryPlan {
    pub country_code: String,
    pub canonical_len: usize,
    pub filler_digit: char,
    pub filler_offset: usize,
}

impl Default for CountryPlan {
    fn default() -> Self {
        Self {
            country_code: "55".to_string(),
            canonical_len: 13,
            filler_digit: '9',
            filler_offset: 4,
        }
    }
}

/// Strip every non-digit character.
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl CountryPlan {
    /// Bring a digit string to the plan's canonical length.
    ///
    /// Heuristic repair, not validation: only numbers that already carry the
    /// country code are touched, and no country code is ever added. Idempotent.
    pub fn ensure_country_digit_count(&self, digits: &str) -> String {
        let mut out = digits.to_string();
        if !out.starts_with(&self.country_code) || out.len() < self.filler_offset {
            return out;
        }

        while out.len() < self.canonical_len {
            out.insert(self.filler_offset, self.filler_digit);
        }
        out
    }

    /// Turn a raw contact string into a recipient identity.
    pub fn to_canonical_identity(&self, contact: &str) -> Result<RecipientIdentity, IdentityError> {
        let trimmed = contact.trim();
        if trimmed.contains('@') {
            return Ok(RecipientIdentity::new(trimmed));
        }

        let digits = normalize_digits(trimmed);
        if digits.is_empty() {
            return Err(IdentityError::InvalidContact(contact.to_string()));
        }

        Ok(RecipientIdentity::from_digits(
            &self.ensure_country_digit_count(&digits),
        ))
    }
}

/// Repair with the default plan.
pub fn ensure_country_digit_count(digits: &str) -> String {
    CountryPlan::default().ensure_country_digit_count(digits)
}

/// Canonical identity with the default plan.
pub fn to_canonical_identity(contact: &str) -> Result<RecipientIdentity, IdentityError> {
    CountryPlan::default().to_canonical_identity(contact)
}
