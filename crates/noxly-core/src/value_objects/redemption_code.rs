//! Redemption code - the 6-digit token a consumer shows to staff

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Six ASCII digits, `000000`-`999999`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RedemptionCode(String);

impl RedemptionCode {
    pub const LENGTH: usize = 6;
    /// Number of distinct codes
    pub const SPACE: u32 = 1_000_000;

    /// Draw a code uniformly from the whole space
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(0..Self::SPACE);
        Self::from_number(n)
    }

    /// Left-pads `n` to six digits; `n` is reduced modulo the code space
    pub fn from_number(n: u32) -> Self {
        Self(format!("{:06}", n % Self::SPACE))
    }

    /// Parse user input, tolerating surrounding whitespace
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        if trimmed.len() == Self::LENGTH && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(DomainError::InvalidCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RedemptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RedemptionCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RedemptionCode> for String {
    fn from(code: RedemptionCode) -> Self {
        code.0
    }
}

/// Where the initiator draws candidate codes from
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> RedemptionCode;
}

/// Production source: uniform random codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn next_code(&self) -> RedemptionCode {
        RedemptionCode::generate()
    }
}
