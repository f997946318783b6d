//! One-time verification codes.

use std::fmt;

use rand::RngExt;
use serde::{Deserialize, Serialize};

/// Smallest code that can be issued; six digits with no leading zero.
pub const OTP_MIN: u32 = 100_000;
/// Largest code that can be issued.
pub const OTP_MAX: u32 = 999_999;

/// A six-digit decimal code sent to an email address.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneTimeCode(String);

impl OneTimeCode {
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        Self(rng.random_range(OTP_MIN..=OTP_MAX).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against user input; surrounding whitespace is ignored.
    pub fn matches(&self, submitted: &str) -> bool {
        self.0 == submitted.trim()
    }
}

impl From<&str> for OneTimeCode {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

// Keep codes out of logs.
impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeCode(******)")
    }
}
