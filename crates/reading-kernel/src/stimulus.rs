//! Stimulus records: the immutable rows a reading experiment is built from.
//!
//! A stimulus pairs a context passage with a short target phrase. Critical
//! items ("single" and "extended" types) come in pairs that share the first
//! token of their phrase; everything else is a filler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The semantic label a participant assigns to a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Meaningful,
    Meaningless,
}

impl Condition {
    /// Lowercase name as stored in stimulus files and data logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Meaningful => "meaningful",
            Condition::Meaningless => "meaningless",
        }
    }

    /// The other label.
    pub fn opposite(self) -> Self {
        match self {
            Condition::Meaningful => Condition::Meaningless,
            Condition::Meaningless => Condition::Meaningful,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meaningful" => Ok(Condition::Meaningful),
            "meaningless" => Ok(Condition::Meaningless),
            other => anyhow::bail!(
                "Unknown condition: {:?}. Valid: meaningful, meaningless",
                other
            ),
        }
    }
}

/// Stimulus type label, kept verbatim from the stimulus file.
///
/// Labels are open-ended (`single_x`, `extended_y`, ...), so the type is a
/// string newtype with classification helpers rather than a closed enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StimulusType(String);

impl StimulusType {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether items of this type must be separated from their partner.
    ///
    /// Matches on substring, so `single_x`, `extended-metaphor` and
    /// `not_single` all count as paired.
    pub fn is_paired(&self) -> bool {
        self.0.contains("single") || self.0.contains("extended")
    }

    /// The label with underscores and hyphens read as spaces.
    pub fn normalized(&self) -> String {
        self.0.trim().replace(['_', '-'], " ").to_lowercase()
    }
}

impl fmt::Display for StimulusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StimulusType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StimulusType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One row of the stimulus set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusRecord {
    /// Passage shown before the target phrase
    pub context: String,
    /// Target phrase, presented one whitespace token at a time
    pub stimulus: String,
    /// Item type label
    pub stimulus_type: StimulusType,
    /// Intended semantic label
    pub condition: Condition,
}

impl StimulusRecord {
    pub fn new(
        context: impl Into<String>,
        stimulus: impl Into<String>,
        stimulus_type: impl Into<StimulusType>,
        condition: Condition,
    ) -> Self {
        Self {
            context: context.into(),
            stimulus: stimulus.into(),
            stimulus_type: stimulus_type.into(),
            condition,
        }
    }

    /// Tokens of the target phrase in presentation order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.stimulus.split_whitespace()
    }

    /// Key that links the two members of a critical pair.
    ///
    /// Returns `None` for fillers. A paired item with an empty phrase keys on
    /// the empty string.
    pub fn pairing_key(&self) -> Option<&str> {
        if !self.stimulus_type.is_paired() {
            return None;
        }
        Some(self.words().next().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paired_types_match_on_substring() {
        assert!(StimulusType::from("single_x").is_paired());
        assert!(StimulusType::from("extended_metaphor").is_paired());
        assert!(!StimulusType::from("novel_metaphor").is_paired());
        assert!(!StimulusType::from("anomalous").is_paired());
    }

    #[test]
    fn test_pairing_key_is_first_token() {
        let item =
            StimulusRecord::new("ctx", "  time is   money", "single_a", Condition::Meaningful);
        assert_eq!(item.pairing_key(), Some("time"));

        let filler = StimulusRecord::new("ctx", "time is money", "literal", Condition::Meaningful);
        assert_eq!(filler.pairing_key(), None);
    }

    #[test]
    fn test_words_split_on_any_whitespace() {
        let item = StimulusRecord::new(
            "",
            "this\triver is\n champagne",
            "novel_metaphor",
            Condition::Meaningful,
        );
        let words: Vec<&str> = item.words().collect();
        assert_eq!(words, vec!["this", "river", "is", "champagne"]);
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!("Meaningful ".parse::<Condition>().unwrap(), Condition::Meaningful);
        assert_eq!("meaningless".parse::<Condition>().unwrap(), Condition::Meaningless);
        assert!("maybe".parse::<Condition>().is_err());
        assert_eq!(Condition::Meaningful.opposite(), Condition::Meaningless);
    }

    #[test]
    fn test_normalized_type() {
        assert_eq!(StimulusType::from("novel_metaphor").normalized(), "novel metaphor");
        assert_eq!(StimulusType::from("Literal-Sentence").normalized(), "literal sentence");
    }
}
