//! UK postcode parsing and formatting for MP Mailer.
//!
//! A [`Postcode`] holds the normalized form of a UK postcode: uppercase with
//! all whitespace removed. Both `"SW1A1AA"` and `"SW1A 1AA"` parse to the
//! same value. The display form re-inserts the single space before the
//! three-character inward code.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

/// UK postcode grammar, applied to the space-free normalized form.
///
/// One or two area letters, a digit (or `R`, for the GIR girobank code), an
/// optional alphanumeric, the inward digit, then two letters drawn from the
/// restricted final alphabet (C, I, K, M, O and V never appear there).
static POSTCODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z]{1,2}[0-9R][0-9A-Z]?[0-9][ABD-HJLNP-UW-Z]{2}$")
        .expect("postcode pattern is valid")
});

/// Length of the inward code (`1AA` in `SW1A 1AA`).
const INWARD_LEN: usize = 3;

/// A validated UK postcode in normalized form (uppercase, no whitespace).
///
/// Construct via [`Postcode::parse`] or [`Postcode::from_str`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Postcode(String);

/// Error returned when a string is not a valid UK postcode.
#[derive(Debug, thiserror::Error)]
#[error("not a valid UK postcode")]
pub struct InvalidPostcode;

impl Postcode {
    /// Parse a raw user-supplied postcode.
    ///
    /// Strips all whitespace and uppercases before validating, so any
    /// spacing variant of a valid postcode is accepted.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPostcode`] when the normalized form does not match
    /// the UK postcode grammar.
    pub fn parse(raw: &str) -> Result<Self, InvalidPostcode> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if !POSTCODE_RE.is_match(&normalized) {
            return Err(InvalidPostcode);
        }

        Ok(Self(normalized))
    }

    /// The normalized, space-free form (e.g. `SW1A1AA`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The display form with a single space before the inward code
    /// (e.g. `SW1A 1AA`).
    #[must_use]
    pub fn display(&self) -> String {
        let split = self.0.len() - INWARD_LEN;
        format!("{} {}", &self.0[..split], &self.0[split..])
    }
}

impl FromStr for Postcode {
    type Err = InvalidPostcode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl AsRef<str> for Postcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Postcode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Postcode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
