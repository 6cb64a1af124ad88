//! Pickup codes exchanged at physical handover
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Otp(#[n(0)] String);

impl Otp {
    /// Draws a 6-digit code uniformly from `[100000, 999999]`.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(rng.gen_range(OTP_MIN..=OTP_MAX).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, supplied: &str) -> bool {
        codes_equal(&self.0, supplied)
    }
}

/// Compares two codes without returning early on the first differing byte.
pub fn codes_equal(expected: &str, supplied: &str) -> bool {
    let (expected, supplied) = (expected.as_bytes(), supplied.as_bytes());
    if expected.len() != supplied.len() {
        return false;
    }

    let diff = expected
        .iter()
        .zip(supplied)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b));
    std::hint::black_box(diff) == 0
}

impl From<&str> for Otp {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
