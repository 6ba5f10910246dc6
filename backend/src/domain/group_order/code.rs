//! Join codes addressing live group-order sessions.

use std::fmt;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Validation errors returned by [`SessionCode::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeValidationError {
    Empty,
    TooLong { max: usize },
    InvalidCharacters,
}

impl fmt::Display for CodeValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "join code must not be empty"),
            Self::TooLong { max } => write!(f, "join code must be at most {max} characters"),
            Self::InvalidCharacters => {
                write!(f, "join code may only contain letters and digits")
            }
        }
    }
}

impl std::error::Error for CodeValidationError {}

/// Length of generated join codes.
pub const CODE_LENGTH: usize = 6;

/// Upper bound accepted when parsing caller-supplied codes.
pub const CODE_MAX_INPUT: usize = 12;

/// Alphabet used for generated codes. Ambiguous glyphs (`0`, `O`, `1`, `I`)
/// are excluded so codes survive verbal and handwritten relay.
const CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

/// Normalised join code for a group-order session.
///
/// Codes compare case-insensitively: parsing uppercases the input, so two
/// codes typed with different casing normalise to the same value.
///
/// # Examples
/// ```
/// use backend::domain::SessionCode;
///
/// let a = SessionCode::parse("vxk2pm").expect("valid code");
/// let b = SessionCode::parse("VXK2PM").expect("valid code");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    /// Normalise and validate a caller-supplied code.
    ///
    /// Accepts any ASCII-alphanumeric input so mistyped codes flow through
    /// to the session lookup (and its rate-limited failure path) instead of
    /// being rejected as malformed.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, CodeValidationError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CodeValidationError::Empty);
        }
        if trimmed.chars().count() > CODE_MAX_INPUT {
            return Err(CodeValidationError::TooLong {
                max: CODE_MAX_INPUT,
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CodeValidationError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Generate a fresh code from the unambiguous alphabet.
    ///
    /// Uniqueness against live sessions is the store's concern; callers
    /// retry on collision.
    pub fn generate() -> Self {
        let mut rng = SmallRng::from_entropy();
        let code = (0..CODE_LENGTH)
            .map(|_| {
                let index = rng.gen_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET[index])
            })
            .collect();
        Self(code)
    }

    /// The normalised textual form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for SessionCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SessionCode> for String {
    fn from(value: SessionCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for SessionCode {
    type Error = CodeValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
