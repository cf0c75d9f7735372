//! Response scoring.
//!
//! The established protocol decides the correct key with a single fixed
//! table: the first response key is correct only when it carries
//! "meaningful" and the stimulus type appears in [`MEANINGFUL_TYPES`];
//! otherwise the second key is correct. The table spells types with spaces
//! while stimulus files use underscores, so under [`ScoringRule::Legacy`]
//! no real type ever matches and the second key is always correct. That
//! behavior is kept as the default so data stays comparable with earlier
//! sessions; the other rules must be selected explicitly.

use serde::Deserialize;

use crate::keys::{Key, KeyMapping};
use crate::stimulus::{Condition, StimulusRecord, StimulusType};

/// Types whose correct label is "meaningful", spelled as in the protocol.
pub const MEANINGFUL_TYPES: [&str; 3] =
    ["novel metaphor", "conventional metaphor", "literal sentence"];

/// How the correct key of a trial is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    /// Exact protocol comparison, spelling mismatch included
    Legacy,
    /// Compare types with underscores read as spaces; the correct key is the
    /// one mapped to the expected label
    NormalizedType,
    /// The stimulus's own condition column is the correct label
    Condition,
}

impl ScoringRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::NormalizedType => "normalized_type",
            Self::Condition => "condition",
        }
    }

    /// The key that scores 1 for this stimulus under this rule.
    pub fn correct_key(&self, stimulus: &StimulusRecord, mapping: &KeyMapping) -> Key {
        match self {
            Self::Legacy => {
                let listed = MEANINGFUL_TYPES.contains(&stimulus.stimulus_type.as_str());
                if mapping.first_label == Condition::Meaningful && listed {
                    mapping.first
                } else {
                    mapping.second
                }
            }
            Self::NormalizedType => {
                let normalized = stimulus.stimulus_type.normalized();
                let expected = if MEANINGFUL_TYPES.contains(&normalized.as_str()) {
                    Condition::Meaningful
                } else {
                    Condition::Meaningless
                };
                mapping.key_for(expected)
            }
            Self::Condition => mapping.key_for(stimulus.condition),
        }
    }

    /// 1 when `pressed` is the correct key, 0 otherwise.
    pub fn score(&self, stimulus: &StimulusRecord, mapping: &KeyMapping, pressed: Key) -> u8 {
        u8::from(pressed == self.correct_key(stimulus, mapping))
    }
}

impl std::str::FromStr for ScoringRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "normalized_type" | "normalized-type" | "normalized" => Ok(Self::NormalizedType),
            "condition" => Ok(Self::Condition),
            _ => anyhow::bail!(
                "Unknown scoring rule: {}. Valid: legacy, normalized_type, condition",
                s
            ),
        }
    }
}

/// Types in a stimulus set that the legacy table misses only because of
/// spelling.
///
/// Used to warn at startup that legacy scoring treats them as "meaningless".
pub fn spelling_mismatches<'a>(
    stimuli: impl IntoIterator<Item = &'a StimulusRecord>,
) -> Vec<StimulusType> {
    let mut found: Vec<StimulusType> = Vec::new();
    for record in stimuli {
        let ty = &record.stimulus_type;
        let exact = MEANINGFUL_TYPES.contains(&ty.as_str());
        let loose = MEANINGFUL_TYPES.contains(&ty.normalized().as_str());
        if loose && !exact && !found.contains(ty) {
            found.push(ty.clone());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d_meaningful() -> KeyMapping {
        KeyMapping::new(Key::Char('d'), Key::Char('k'), Condition::Meaningful)
    }

    fn k_meaningful() -> KeyMapping {
        KeyMapping::new(Key::Char('d'), Key::Char('k'), Condition::Meaningless)
    }

    fn item(ty: &str, condition: Condition) -> StimulusRecord {
        StimulusRecord::new("ctx", "this river is champagne", ty, condition)
    }

    #[test]
    fn test_legacy_listed_type_with_d_meaningful() {
        let stimulus = item("novel metaphor", Condition::Meaningful);
        let rule = ScoringRule::Legacy;
        assert_eq!(rule.score(&stimulus, &d_meaningful(), Key::Char('d')), 1);
        assert_eq!(rule.score(&stimulus, &d_meaningful(), Key::Char('k')), 0);
    }

    #[test]
    fn test_legacy_underscored_type_never_matches() {
        // Stored spelling differs from the table, so "k" is always correct.
        let stimulus = item("novel_metaphor", Condition::Meaningful);
        let rule = ScoringRule::Legacy;
        assert_eq!(rule.correct_key(&stimulus, &d_meaningful()), Key::Char('k'));
        assert_eq!(rule.score(&stimulus, &d_meaningful(), Key::Char('d')), 0);
    }

    #[test]
    fn test_legacy_k_meaningful_always_scores_k() {
        let stimulus = item("literal sentence", Condition::Meaningful);
        let rule = ScoringRule::Legacy;
        assert_eq!(rule.correct_key(&stimulus, &k_meaningful()), Key::Char('k'));
        let anomalous = item("anomalous", Condition::Meaningless);
        assert_eq!(rule.correct_key(&anomalous, &k_meaningful()), Key::Char('k'));
    }

    #[test]
    fn test_normalized_rule_follows_mapping() {
        let rule = ScoringRule::NormalizedType;
        let metaphor = item("conventional_metaphor", Condition::Meaningful);
        assert_eq!(rule.correct_key(&metaphor, &d_meaningful()), Key::Char('d'));
        assert_eq!(rule.correct_key(&metaphor, &k_meaningful()), Key::Char('k'));

        let anomalous = item("anomalous", Condition::Meaningless);
        assert_eq!(rule.correct_key(&anomalous, &d_meaningful()), Key::Char('k'));
        assert_eq!(rule.correct_key(&anomalous, &k_meaningful()), Key::Char('d'));
    }

    #[test]
    fn test_condition_rule_uses_condition_column() {
        let rule = ScoringRule::Condition;
        let single = item("single_x", Condition::Meaningless);
        assert_eq!(rule.correct_key(&single, &d_meaningful()), Key::Char('k'));
        assert_eq!(rule.score(&single, &k_meaningful(), Key::Char('d')), 1);
    }

    #[test]
    fn test_spelling_mismatches_reports_each_type_once() {
        let stimuli = vec![
            item("novel_metaphor", Condition::Meaningful),
            item("novel_metaphor", Condition::Meaningful),
            item("literal sentence", Condition::Meaningful),
            item("anomalous", Condition::Meaningless),
        ];
        let found = spelling_mismatches(&stimuli);
        assert_eq!(found, vec![StimulusType::from("novel_metaphor")]);
    }

    #[test]
    fn test_rule_parse() {
        assert_eq!("legacy".parse::<ScoringRule>().unwrap(), ScoringRule::Legacy);
        assert_eq!("normalized".parse::<ScoringRule>().unwrap(), ScoringRule::NormalizedType);
        assert!("strict".parse::<ScoringRule>().is_err());
    }
}
