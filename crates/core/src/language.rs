//! The fixed set of languages offered for captions and translation.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A language from the supported menu, identified by its ISO-639-1 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Malayalam,
    Tamil,
    Telugu,
    Hindi,
    English,
}

/// Returned when a code does not name a supported language.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported language '{0}' (expected one of ml, ta, te, hi, en)")]
pub struct UnknownLanguage(pub String);

impl Language {
    /// Every supported language, in menu order.
    pub const ALL: [Language; 5] = [
        Language::Malayalam,
        Language::Tamil,
        Language::Telugu,
        Language::Hindi,
        Language::English,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Language::Malayalam => "ml",
            Language::Tamil => "ta",
            Language::Telugu => "te",
            Language::Hindi => "hi",
            Language::English => "en",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Malayalam => "Malayalam",
            Language::Tamil => "Tamil",
            Language::Telugu => "Telugu",
            Language::Hindi => "Hindi",
            Language::English => "English",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    /// Accepts a bare code (`ml`) or a menu label (`Malayalam (ml)`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // Menu labels carry the code in trailing parentheses.
        let code = match trimmed.rsplit_once('(') {
            Some((_, rest)) => rest.trim_end_matches(')').trim(),
            None => trimmed,
        };
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}
