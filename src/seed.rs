use std::fmt::{self, Display};
use std::str::FromStr;

use thiserror::Error;

/// Human-oriented base32, see
/// <http://philzimmermann.com/docs/human-oriented-base-32-encoding.txt>.
const BASE32_SYMBOLS: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

const ENCODED_LEN: usize = 8;

/// The generator version this crate implements.
pub const QUEST_GENERATOR_VERSION: u8 = 1;

/// Everything needed to reproduce a quest.
///
/// Encodes as 8 base32 characters holding 40 bits:
/// `[ version (4) | difficulty (4) | seed (32) ]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed {
    pub value: u32,
    /// Stored in 4 bits.
    pub version: u8,
    /// Stored in 4 bits.
    pub difficulty: u8,
}

impl Seed {
    pub fn new(value: u32) -> Self {
        Seed {
            value,
            version: QUEST_GENERATOR_VERSION,
            difficulty: 1,
        }
    }

    /// A seed from the system's entropy source.
    pub fn random() -> Self {
        Seed::new(rand::random())
    }

    pub fn encode(&self) -> String {
        debug_assert!(self.version < 16 && self.difficulty < 16);
        let small_numbers = u64::from((self.version & 0xf) << 4 | (self.difficulty & 0xf));
        let mut data = small_numbers << 32 | u64::from(self.value);

        let mut encoded = [0u8; ENCODED_LEN];
        for symbol in encoded.iter_mut().rev() {
            *symbol = BASE32_SYMBOLS[(data & 0x1f) as usize];
            data >>= 5;
        }
        encoded.iter().map(|&b| b as char).collect()
    }

    pub fn decode(encoded: &str) -> Result<Self, SeedError> {
        let len = encoded.chars().count();
        if len != ENCODED_LEN {
            return Err(SeedError::WrongLength(len));
        }

        let mut data: u64 = 0;
        for c in encoded.chars() {
            let index = BASE32_SYMBOLS
                .iter()
                .position(|&s| s as char == c)
                .ok_or(SeedError::InvalidSymbol(c))?;
            data = data << 5 | index as u64;
        }

        let small_numbers = (data >> 32) as u8;
        Ok(Seed {
            value: data as u32,
            version: small_numbers >> 4,
            difficulty: small_numbers & 0xf,
        })
    }

    /// Rejects seeds made by a different generator version.
    pub fn check_version(&self) -> Result<(), SeedError> {
        if self.version == QUEST_GENERATOR_VERSION {
            Ok(())
        } else {
            Err(SeedError::UnsupportedVersion(self.version))
        }
    }
}

impl Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Seed {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Seed::decode(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeedError {
    #[error("a seed has {} characters, got {0}", ENCODED_LEN)]
    WrongLength(usize),
    #[error("`{0}` is not a seed character")]
    InvalidSymbol(char),
    #[error(
        "seed was made by quest generator version {0}, this is version {}",
        QUEST_GENERATOR_VERSION
    )]
    UnsupportedVersion(u8),
}
