//! Serde adapters that write a [`Pubkey`] as its base58 string.

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serializer};
use solana_program::pubkey::Pubkey;

pub fn serialize<S>(pubkey: &Pubkey, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&pubkey.to_string())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Pubkey, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Pubkey::from_str(&s).map_err(serde::de::Error::custom)
}

/// Same encoding for a list of pubkeys
pub mod vec {
    use super::*;
    use serde::ser::SerializeSeq;

    pub fn serialize<S>(pubkeys: &[Pubkey], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(pubkeys.len()))?;
        for pubkey in pubkeys {
            seq.serialize_element(&pubkey.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Pubkey>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| Pubkey::from_str(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
