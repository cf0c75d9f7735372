//! Physical input keys and the response-key mapping.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::stimulus::Condition;

/// A key the participant can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Escape,
}

impl Key {
    /// Name used in config files and data logs (`d`, `space`, `escape`).
    pub fn name(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Space => "space".to_string(),
            Key::Escape => "escape".to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Key {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "space" | " " => Ok(Key::Space),
            "escape" | "esc" => Ok(Key::Escape),
            _ => {
                let mut chars = lowered.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Key::Char(c)),
                    _ => anyhow::bail!(
                        "Unknown key: {:?}. Use a single character, space or escape",
                        s
                    ),
                }
            }
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Assignment of the two response keys to the two labels.
///
/// Only two assignments exist: the first key means "meaningful" or the
/// first key means "meaningless". The mapping is drawn once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMapping {
    /// Left-hand response key (`d` by default)
    pub first: Key,
    /// Right-hand response key (`k` by default)
    pub second: Key,
    /// Label carried by `first`; `second` carries the opposite
    pub first_label: Condition,
}

impl KeyMapping {
    pub fn new(first: Key, second: Key, first_label: Condition) -> Self {
        Self {
            first,
            second,
            first_label,
        }
    }

    /// Pick one of the two assignments uniformly at random.
    pub fn random(first: Key, second: Key, rng: &mut impl Rng) -> Self {
        let first_label = if rng.random_bool(0.5) {
            Condition::Meaningful
        } else {
            Condition::Meaningless
        };
        Self::new(first, second, first_label)
    }

    /// Label of a response key, or `None` for any other key.
    pub fn label_of(&self, key: Key) -> Option<Condition> {
        if key == self.first {
            Some(self.first_label)
        } else if key == self.second {
            Some(self.first_label.opposite())
        } else {
            None
        }
    }

    /// The key that carries `label`.
    pub fn key_for(&self, label: Condition) -> Key {
        if self.first_label == label {
            self.first
        } else {
            self.second
        }
    }

    /// Both response keys, first then second.
    pub fn response_keys(&self) -> [Key; 2] {
        [self.first, self.second]
    }

    /// Data-log rendering, e.g. `D = meaningful, K = meaningless`.
    ///
    /// The embedded comma is part of the established log format.
    pub fn serialize_for_log(&self) -> String {
        format!(
            "{} = {}, {} = {}",
            self.first.name().to_uppercase(),
            self.first_label,
            self.second.name().to_uppercase(),
            self.first_label.opposite()
        )
    }
}
