//! Certificate code identifiers.
//!
//! Codes are ULIDs: 128 bits rendered as 26 Crockford base32 characters.
//! The top 48 bits hold the UTC millisecond timestamp and the remaining 80
//! bits are random, so codes sort lexicographically by creation time.
//! Within one millisecond the generator increments the previous random
//! part instead of drawing a new one, which keeps rapid batches strictly
//! increasing and collision free.

use std::sync::{Mutex, PoisonError};

use ulid::{Generator, Ulid};

/// Length of an encoded code.
pub const CODE_LEN: usize = 26;

#[derive(Debug, thiserror::Error)]
pub enum CodeError {
    /// More codes were requested within one millisecond than the random
    /// part can be incremented.
    #[error("code space exhausted for the current millisecond")]
    Exhausted,
}

/// Monotonic generator for certificate codes.
///
/// Cheap to share behind an `Arc`; the inner state is a mutex-guarded
/// `ulid::Generator`.
pub struct CodeGenerator {
    inner: Mutex<Generator>,
}

impl std::fmt::Debug for CodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGenerator").finish_non_exhaustive()
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Generator::new()),
        }
    }

    /// Produce `count` fresh codes, strictly increasing.
    pub fn new_codes(&self, count: usize) -> Result<Vec<String>, CodeError> {
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        (0..count)
            .map(|_| {
                generator
                    .generate()
                    .map(|ulid| ulid.to_string())
                    .map_err(|_| CodeError::Exhausted)
            })
            .collect()
    }
}

/// Syntax check only: `true` iff `code` is a well-formed ULID.
///
/// Says nothing about whether the code exists in storage.
pub fn is_valid_code(code: &str) -> bool {
    // The leading character carries only 3 bits; anything above '7'
    // would overflow 128 bits.
    code.len() == CODE_LEN
        && code.as_bytes().first().is_some_and(|b| (b'0'..=b'7').contains(b))
        && Ulid::from_string(code).is_ok()
}
