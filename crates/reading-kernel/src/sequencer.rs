//! Constrained trial ordering.
//!
//! Critical items are grouped by pairing key; fillers are shuffled and used
//! as spacers between the two members of each pair. The result is always a
//! permutation of the input. When fillers run out the spacing degrades
//! instead of failing.

use rand::prelude::*;
use tracing::{debug, warn};

use crate::stimulus::StimulusRecord;

/// Orders stimuli so paired items are separated by fillers.
#[derive(Debug, Clone)]
pub struct TrialSequencer {
    buffer_min: usize,
}

impl TrialSequencer {
    pub fn new(buffer_min: usize) -> Self {
        Self { buffer_min }
    }

    pub fn buffer_min(&self) -> usize {
        self.buffer_min
    }

    /// Produce a randomized ordering of `records`.
    ///
    /// Group order: groups are collected in first-appearance order and then
    /// shuffled with `rng`, so a fixed seed reproduces the same ordering.
    pub fn sequence<R: Rng + ?Sized>(
        &self,
        records: Vec<StimulusRecord>,
        rng: &mut R,
    ) -> Vec<StimulusRecord> {
        let total = records.len();
        let (mut groups, mut fillers) = partition(records);

        fillers.shuffle(rng);
        groups.shuffle(rng);

        let mut fillers = fillers.into_iter();
        let mut ordered = Vec::with_capacity(total);

        for group in groups {
            let PairGroup { key, mut members } = group;
            if members.len() > 2 {
                warn!(
                    key = %key,
                    members = members.len(),
                    "Pairing key has more than two members; chaining them with buffers"
                );
            }
            members.shuffle(rng);

            let mut members = members.into_iter();
            if let Some(first) = members.next() {
                ordered.push(first);
            }
            ordered.extend(fillers.by_ref().take(self.buffer_min));
            // Members beyond the second each get their own buffer.
            let mut rest = members.peekable();
            while let Some(member) = rest.next() {
                ordered.push(member);
                if rest.peek().is_some() {
                    ordered.extend(fillers.by_ref().take(self.buffer_min));
                }
            }
        }

        ordered.extend(fillers);
        debug!(trials = ordered.len(), buffer_min = self.buffer_min, "Sequenced trials");
        ordered
    }
}

/// Items sharing one pairing key, in input order.
#[derive(Debug)]
struct PairGroup {
    key: String,
    members: Vec<StimulusRecord>,
}

fn partition(records: Vec<StimulusRecord>) -> (Vec<PairGroup>, Vec<StimulusRecord>) {
    let mut groups: Vec<PairGroup> = Vec::new();
    let mut fillers = Vec::new();

    for record in records {
        match record.pairing_key().map(str::to_string) {
            Some(key) => match groups.iter_mut().find(|g| g.key == key) {
                Some(group) => group.members.push(record),
                None => groups.push(PairGroup {
                    key,
                    members: vec![record],
                }),
            },
            None => fillers.push(record),
        }
    }

    (groups, fillers)
}

/// Separation observed for one pairing key in an ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairSpacing {
    pub key: String,
    /// Positions of the members in trial order
    pub positions: Vec<usize>,
    /// Items strictly between consecutive members
    pub gaps: Vec<usize>,
}

/// Summary of how well an ordering honors the buffer constraint.
#[derive(Debug, Clone, Default)]
pub struct SequenceReport {
    pub total: usize,
    pub fillers: usize,
    pub singles: usize,
    pub pairs: Vec<PairSpacing>,
}

impl SequenceReport {
    /// Inspect an ordering produced by [`TrialSequencer::sequence`].
    pub fn from_order(order: &[StimulusRecord]) -> Self {
        let mut pairs: Vec<PairSpacing> = Vec::new();
        let mut fillers = 0;

        for (pos, record) in order.iter().enumerate() {
            match record.pairing_key() {
                Some(key) => match pairs.iter_mut().find(|p| p.key == key) {
                    Some(spacing) => spacing.positions.push(pos),
                    None => pairs.push(PairSpacing {
                        key: key.to_string(),
                        positions: vec![pos],
                        gaps: Vec::new(),
                    }),
                },
                None => fillers += 1,
            }
        }

        for spacing in &mut pairs {
            spacing.gaps = spacing.positions.windows(2).map(|w| w[1] - w[0] - 1).collect();
        }

        let singles = pairs.iter().filter(|p| p.positions.len() == 1).count();
        pairs.retain(|p| p.positions.len() > 1);

        Self {
            total: order.len(),
            fillers,
            singles,
            pairs,
        }
    }

    /// Smallest gap across all pairs, if any pair exists.
    pub fn min_gap(&self) -> Option<usize> {
        self.pairs.iter().flat_map(|p| p.gaps.iter().copied()).min()
    }

    /// Pairs whose gap fell short of `buffer_min`.
    pub fn short_pairs(&self, buffer_min: usize) -> Vec<&PairSpacing> {
        self.pairs
            .iter()
            .filter(|p| p.gaps.iter().any(|&g| g < buffer_min))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::Condition;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn filler(i: usize) -> StimulusRecord {
        StimulusRecord::new(
            format!("context {}", i),
            format!("filler{} is phrase", i),
            "novel_metaphor",
            Condition::Meaningful,
        )
    }

    fn paired(key: &str, variant: &str) -> StimulusRecord {
        StimulusRecord::new(
            format!("context for {} {}", key, variant),
            format!("{} is {}", key, variant),
            "single_x",
            Condition::Meaningful,
        )
    }

    fn counts(records: &[StimulusRecord]) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for r in records {
            *map.entry(r.stimulus.clone()).or_insert(0) += 1;
        }
        map
    }

    fn position(order: &[StimulusRecord], stimulus: &str) -> usize {
        order.iter().position(|r| r.stimulus == stimulus).expect("present")
    }

    #[test]
    fn test_output_is_permutation() {
        let mut input: Vec<StimulusRecord> = (0..40).map(filler).collect();
        for key in ["time", "love", "life", "mind"] {
            input.push(paired(key, "a"));
            input.push(paired(key, "b"));
        }
        input.push(paired("hope", "alone"));

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let order = TrialSequencer::new(5).sequence(input.clone(), &mut rng);

        assert_eq!(order.len(), input.len());
        assert_eq!(counts(&order), counts(&input));
    }

    #[test]
    fn test_pair_separated_by_exact_buffer() {
        let mut input: Vec<StimulusRecord> = (0..25).map(filler).collect();
        input.push(paired("time", "a thief"));
        input.push(paired("time", "a river"));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let order = TrialSequencer::new(20).sequence(input, &mut rng);

        assert_eq!(order.len(), 27);
        let a = position(&order, "time is a thief");
        let b = position(&order, "time is a river");
        assert_eq!(a.abs_diff(b) - 1, 20);

        let report = SequenceReport::from_order(&order);
        assert_eq!(report.pairs.len(), 1);
        assert_eq!(report.min_gap(), Some(20));
        assert!(report.short_pairs(20).is_empty());
    }

    #[test]
    fn test_every_pair_gets_full_buffer_while_fillers_last() {
        let mut input: Vec<StimulusRecord> = (0..30).map(filler).collect();
        for key in ["alpha", "beta", "gamma"] {
            input.push(paired(key, "one"));
            input.push(paired(key, "two"));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let order = TrialSequencer::new(10).sequence(input, &mut rng);
        let report = SequenceReport::from_order(&order);

        assert_eq!(report.pairs.len(), 3);
        for pair in &report.pairs {
            assert_eq!(pair.gaps, vec![10], "pair {} not buffered", pair.key);
        }
    }

    #[test]
    fn test_buffer_degrades_when_fillers_run_out() {
        let mut input: Vec<StimulusRecord> = (0..3).map(filler).collect();
        input.push(paired("alpha", "one"));
        input.push(paired("alpha", "two"));
        input.push(paired("beta", "one"));
        input.push(paired("beta", "two"));

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let order = TrialSequencer::new(20).sequence(input.clone(), &mut rng);

        assert_eq!(counts(&order), counts(&input));
        let report = SequenceReport::from_order(&order);
        // The first group placed takes all three fillers; the second gets none.
        let mut gaps: Vec<usize> = report.pairs.iter().flat_map(|p| p.gaps.clone()).collect();
        gaps.sort_unstable();
        assert_eq!(gaps, vec![0, 3]);
    }

    #[test]
    fn test_single_member_appears_once() {
        let mut input: Vec<StimulusRecord> = (0..5).map(filler).collect();
        input.push(paired("lonely", "alone"));

        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let order = TrialSequencer::new(2).sequence(input, &mut rng);

        assert_eq!(order.len(), 6);
        assert_eq!(order.iter().filter(|r| r.stimulus == "lonely is alone").count(), 1);
        let report = SequenceReport::from_order(&order);
        assert_eq!(report.singles, 1);
        assert!(report.pairs.is_empty());
    }

    #[test]
    fn test_oversized_group_is_chained_not_dropped() {
        let mut input: Vec<StimulusRecord> = (0..10).map(filler).collect();
        input.push(paired("time", "one"));
        input.push(paired("time", "two"));
        input.push(paired("time", "three"));

        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let order = TrialSequencer::new(3).sequence(input.clone(), &mut rng);

        assert_eq!(counts(&order), counts(&input));
        let report = SequenceReport::from_order(&order);
        assert_eq!(report.pairs[0].gaps, vec![3, 3]);
    }

    #[test]
    fn test_only_fillers_is_shuffle() {
        let input: Vec<StimulusRecord> = (0..50).map(filler).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let order = TrialSequencer::new(20).sequence(input.clone(), &mut rng);
        assert_eq!(counts(&order), counts(&input));
        assert_ne!(order, input);
    }

    #[test]
    fn test_empty_input() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(TrialSequencer::new(20).sequence(Vec::new(), &mut rng).is_empty());
    }

    #[test]
    fn test_reproducible_with_seed() {
        let mut input: Vec<StimulusRecord> = (0..30).map(filler).collect();
        for key in ["alpha", "beta", "gamma", "delta"] {
            input.push(paired(key, "one"));
            input.push(paired(key, "two"));
        }

        let sequencer = TrialSequencer::new(4);
        let first = sequencer.sequence(input.clone(), &mut ChaCha8Rng::seed_from_u64(99));
        let second = sequencer.sequence(input, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(first, second);
    }
}
