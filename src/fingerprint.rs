use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{EngineError, EngineResult};

const N_BITS: usize = 512;
const N_WORDS: usize = N_BITS / 64;
const N_HEX: usize = N_BITS / 4;

/// A 512-bit structural fingerprint of a compound or gene cluster
///
/// Fingerprints are exchanged as 128 hexadecimal characters. The first
/// character holds bits `0..4`, with bit `0` as its most significant bit.
///
/// # Examples
///
/// ```
/// use npenrich::Fingerprint512;
///
/// let hex = format!("c{}", "0".repeat(127));
/// let fp = Fingerprint512::from_hex(&hex).unwrap();
/// assert!(fp.bit(0));
/// assert!(fp.bit(1));
/// assert!(!fp.bit(2));
/// assert_eq!(fp.count_ones(), 2);
/// assert_eq!(fp.to_hex(), hex);
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint512 {
    words: [u64; N_WORDS],
}

impl Fingerprint512 {
    /// Parses a fingerprint from its hexadecimal representation
    ///
    /// # Errors
    ///
    /// [`EngineError::Validation`] if the string is not exactly 128 hex characters
    pub fn from_hex(hex: &str) -> EngineResult<Self> {
        let hex = hex.trim();
        if hex.len() != N_HEX {
            return Err(EngineError::Validation(format!(
                "fingerprint512 must have {N_HEX} hex characters, got {}",
                hex.len()
            )));
        }
        let mut words = [0u64; N_WORDS];
        for (idx, c) in hex.chars().enumerate() {
            let nibble = c.to_digit(16).ok_or_else(|| {
                EngineError::Validation(format!("invalid hex character `{c}` in fingerprint512"))
            })?;
            let word = idx / 16;
            let shift = 60 - (idx % 16) * 4;
            words[word] |= u64::from(nibble) << shift;
        }
        Ok(Self { words })
    }

    /// Constructs a fingerprint with the given bits set
    ///
    /// Indices outside of `0..512` are ignored
    pub fn from_bits(bits: &[usize]) -> Self {
        let mut fp = Self::default();
        for &bit in bits.iter().filter(|bit| **bit < N_BITS) {
            fp.words[bit / 64] |= 1u64 << (63 - bit % 64);
        }
        fp
    }

    /// Returns the hexadecimal representation
    pub fn to_hex(&self) -> String {
        self.words.iter().map(|word| format!("{word:016x}")).collect()
    }

    /// Returns whether the bit at `idx` is set
    ///
    /// # Panics
    ///
    /// If `idx` is 512 or larger
    pub fn bit(&self, idx: usize) -> bool {
        assert!(idx < N_BITS, "fingerprint bit index out of range");
        self.words[idx / 64] & (1u64 << (63 - idx % 64)) != 0
    }

    /// The number of set bits
    pub fn count_ones(&self) -> u32 {
        self.words.iter().map(|word| word.count_ones()).sum()
    }

    /// Returns `true` if no bit is set
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Cosine similarity between two binary fingerprints
    ///
    /// Returns `None` if either fingerprint has no bits set
    pub fn cosine_similarity(&self, other: &Self) -> Option<f64> {
        let norm = f64::from(self.count_ones()) * f64::from(other.count_ones());
        if norm == 0.0 {
            return None;
        }
        let shared: u32 = self
            .words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones())
            .sum();
        Some(f64::from(shared) / norm.sqrt())
    }
}

impl TryFrom<&str> for Fingerprint512 {
    type Error = EngineError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Fingerprint512::from_hex(value)
    }
}

impl TryFrom<String> for Fingerprint512 {
    type Error = EngineError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint512::from_hex(&value)
    }
}

impl From<Fingerprint512> for String {
    fn from(fp: Fingerprint512) -> Self {
        fp.to_hex()
    }
}

impl Display for Fingerprint512 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint512 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint512({} bits)", self.count_ones())
    }
}
