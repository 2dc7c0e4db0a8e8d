//! Short code generation and custom name validation.
//!
//! Generation and persistence are decoupled: a generator only proposes
//! candidates, uniqueness is decided by the link store at insert time.

use crate::error::AppError;
use rand::Rng;
use serde_json::json;

/// Default length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Maximum length of a user-chosen custom name.
pub const MAX_CUSTOM_NAME_LENGTH: usize = 255;

/// Mixed-case letters and digits, 62 symbols.
pub const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Names that would shadow service routes.
const RESERVED_NAMES: &[&str] = &["health", "links", "api"];

/// Source of candidate short codes.
pub trait CodeGenerator: Send + Sync {
    /// Produces one candidate of exactly `length` characters.
    fn generate(&self, length: usize) -> String;
}

/// Draws codes uniformly from an alphabet using the thread-local CSPRNG.
///
/// Codes are not derivable from any sequence, so they cannot be guessed from
/// previously issued ones.
#[derive(Debug, Clone)]
pub struct RandomCodeGenerator {
    alphabet: Vec<u8>,
}

impl RandomCodeGenerator {
    /// Generator over the 62-symbol [`ALPHANUMERIC`] alphabet.
    pub fn alphanumeric() -> Self {
        Self {
            alphabet: ALPHANUMERIC.to_vec(),
        }
    }

    /// Generator over a custom ASCII alphabet.
    ///
    /// Narrow alphabets are useful to force collisions in tests.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the alphabet is empty or not ASCII.
    pub fn with_alphabet(alphabet: &[u8]) -> Result<Self, AppError> {
        if alphabet.is_empty() || !alphabet.is_ascii() {
            return Err(AppError::bad_request(
                "Code alphabet must be non-empty ASCII",
                json!({ "length": alphabet.len() }),
            ));
        }

        Ok(Self {
            alphabet: alphabet.to_vec(),
        })
    }
}

impl Default for RandomCodeGenerator {
    fn default() -> Self {
        Self::alphanumeric()
    }
}

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| self.alphabet[rng.random_range(0..self.alphabet.len())] as char)
            .collect()
    }
}

/// Validates a user-provided custom name.
///
/// # Rules
///
/// - Length: 1-255 characters
/// - Allowed characters: ASCII letters, digits, `-`, `_` and space
/// - Must contain at least one non-space character
/// - Cannot be a reserved route name
///
/// # Errors
///
/// Returns [`AppError::Validation`] if any rule is violated.
pub fn validate_custom_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() || name.len() > MAX_CUSTOM_NAME_LENGTH {
        return Err(AppError::bad_request(
            "Custom name must be 1-255 characters",
            json!({ "provided_length": name.len() }),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
    {
        return Err(AppError::bad_request(
            "Custom name can only contain letters, digits, dashes, underscores and spaces",
            json!({ "custom_name": name }),
        ));
    }

    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(AppError::bad_request(
            "This name is reserved",
            json!({ "custom_name": name }),
        ));
    }

    Ok(())
}
