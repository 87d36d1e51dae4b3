//! Two-letter language codes used to pick a template variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lowercase ISO 639-1 style language code (`fr`, `nl`, `en`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale([u8; 2]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid locale {0:?}: expected a two-letter language code")]
pub struct LocaleError(pub String);

impl Locale {
    pub const FR: Locale = Locale(*b"fr");

    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("fr")
    }

    /// Parse `raw` if present and valid, otherwise use `fallback`.
    ///
    /// Source records carry free-form language fields (`"FR"`, `"fr-BE"`, `""`);
    /// only the leading language subtag is kept.
    pub fn parse_or(raw: Option<&str>, fallback: Locale) -> Locale {
        raw.and_then(|value| {
            let primary = value.trim().split(['-', '_']).next().unwrap_or_default();
            primary.parse().ok()
        })
        .unwrap_or(fallback)
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Ok(Self([a.to_ascii_lowercase(), b.to_ascii_lowercase()]))
            }
            _ => Err(LocaleError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.as_str().to_owned()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
