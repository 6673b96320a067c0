//! Unique random index selection with duplicate relaxation.

use rand::Rng;
use tracing::debug;

use crate::constants::sampler::DRAW_RETRY_LIMIT;
use crate::emit::EmitSinks;
use crate::errors::QbankError;
use crate::index::SeenIndex;
use crate::types::QuestionText;

#[derive(Debug, Clone)]
/// Small deterministic RNG (splitmix64) for reproducible sampling in tests
/// and demos. Production runs seed a process-wide RNG instead.
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    /// RNG starting from a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64_internal(&mut self) -> u64 {
        let mut z = self.state.wrapping_add(0x9E3779B97F4A7C15);
        self.state = z;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl rand::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64_internal() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.next_u64_internal()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut offset = 0;
        while offset < dest.len() {
            let bytes = self.next_u64_internal().to_le_bytes();
            let copy_len = (dest.len() - offset).min(bytes.len());
            dest[offset..offset + copy_len].copy_from_slice(&bytes[..copy_len]);
            offset += copy_len;
        }
    }
}

/// One sampling request: how many emissions, how many reference duplicates
/// to tolerate, and whether emissions update the membership log.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    /// Number of questions to emit. Must be positive and at most the
    /// candidate count.
    pub count: usize,
    /// Max accepted emissions tolerated that duplicate the reference set.
    pub duplicate_limit: usize,
    /// Fold newly emitted questions into the membership index and log
    /// sink as they are produced.
    pub update_mode: bool,
}

impl SampleRequest {
    /// Request `count` emissions with no relaxation and no log updates.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            duplicate_limit: 0,
            update_mode: false,
        }
    }
}

/// Counters describing one finished sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Accepted emissions (equals the requested count on success).
    pub emitted: usize,
    /// Accepted emissions classified as reference duplicates.
    pub duplicates_accepted: usize,
    /// Draws rejected because the duplicate budget was already spent.
    pub rejected_draws: usize,
    /// Random index draws attempted, including ones landing on used slots.
    pub draw_attempts: u64,
    /// Times the bounded retry loop fell back to a linear scan.
    pub fallback_scans: usize,
}

/// Draws unique random candidate indices and applies the duplicate
/// relaxation policy while emitting.
#[derive(Debug)]
pub struct Sampler<R: Rng> {
    rng: R,
}

impl<R: Rng> Sampler<R> {
    /// Sampler over the given random source.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Run one sampling pass over `questions`.
    ///
    /// Relaxation is active iff `index` is provided: drawn questions found
    /// in the index count against `request.duplicate_limit`, and once that
    /// budget is spent further duplicate draws are rejected and the slot
    /// redrawn. A rejected draw keeps its bitmap slot used, so a run that
    /// can no longer succeed drains the bitmap and surfaces as
    /// [`QbankError::Exhausted`] instead of looping forever.
    ///
    /// Every accepted emission goes to the pretty sink. In update mode a
    /// reference duplicate skips the log sink (it is already represented in
    /// the reference log); anything else is written to the log sink and,
    /// in update mode, marked seen immediately so later draws in the same
    /// run observe earlier emissions.
    pub fn run(
        &mut self,
        questions: &[QuestionText],
        request: &SampleRequest,
        mut index: Option<&mut SeenIndex>,
        sinks: &mut EmitSinks<'_>,
    ) -> Result<RunStats, QbankError> {
        if request.count == 0 {
            return Err(QbankError::Configuration(
                "requested count must be positive".into(),
            ));
        }
        if request.count > questions.len() {
            return Err(QbankError::Configuration(format!(
                "requested {} questions but the bank holds {}",
                request.count,
                questions.len()
            )));
        }
        if request.update_mode && index.is_none() {
            return Err(QbankError::Configuration(
                "update mode needs a reference index to update".into(),
            ));
        }

        let mut used = vec![false; questions.len()];
        let mut budget = request.duplicate_limit;
        let mut stats = RunStats::default();

        while stats.emitted < request.count {
            let Some(chosen) = self.draw_unused(&mut used, &mut stats) else {
                return Err(QbankError::Exhausted(format!(
                    "only {} of {} requested questions available within duplicate limit {}",
                    stats.emitted, request.count, request.duplicate_limit
                )));
            };
            let question = &questions[chosen];

            let mut duplicate = false;
            if let Some(seen) = index.as_deref_mut() {
                if seen.is_seen(question) {
                    if budget == 0 {
                        stats.rejected_draws += 1;
                        debug!(index = chosen, "rejected reference duplicate, budget spent");
                        continue;
                    }
                    budget -= 1;
                    duplicate = true;
                    stats.duplicates_accepted += 1;
                }
            }

            sinks.emit_pretty(stats.emitted, question)?;
            if !(request.update_mode && duplicate) {
                sinks.emit_log(question)?;
                if request.update_mode {
                    if let Some(seen) = index.as_deref_mut() {
                        seen.mark_seen(question);
                    }
                }
            }
            stats.emitted += 1;
        }

        Ok(stats)
    }

    /// Pick an unused index: up to [`DRAW_RETRY_LIMIT`] uniform random
    /// draws accepting the first free slot, then a deterministic scan for
    /// the first free slot. Every random draw counts against the retry
    /// budget, repeats of the same used index included. The chosen slot is
    /// marked used unconditionally; `None` once every slot is used.
    fn draw_unused(&mut self, used: &mut [bool], stats: &mut RunStats) -> Option<usize> {
        for _ in 0..DRAW_RETRY_LIMIT {
            stats.draw_attempts += 1;
            let candidate = self.rng.random_range(0..used.len());
            if !used[candidate] {
                used[candidate] = true;
                return Some(candidate);
            }
        }
        stats.fallback_scans += 1;
        let candidate = used.iter().position(|flag| !flag)?;
        used[candidate] = true;
        Some(candidate)
    }
}

/// Number of candidate questions already present in the reference index.
pub fn reference_overlap(questions: &[QuestionText], index: &SeenIndex) -> usize {
    questions
        .iter()
        .filter(|question| index.is_seen(question))
        .count()
}

/// Largest emission count a bank can satisfy given its overlap with the
/// reference set and the configured duplicate limit.
pub fn max_offerable(candidates: usize, reference_overlap: usize, duplicate_limit: usize) -> usize {
    candidates.saturating_sub(reference_overlap) + duplicate_limit
}

/// Enforce the capacity precondition before any emission begins:
/// `candidates - reference_overlap + duplicate_limit >= requested`.
pub fn check_capacity(
    candidates: usize,
    reference_overlap: usize,
    duplicate_limit: usize,
    requested: usize,
) -> Result<(), QbankError> {
    let offerable = max_offerable(candidates, reference_overlap, duplicate_limit);
    if requested > offerable {
        return Err(QbankError::Configuration(format!(
            "requested {requested} questions but only {offerable} are available; \
             lower the count or raise the duplicate limit"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(texts: &[&str]) -> Vec<QuestionText> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    fn run_to_buffers(
        questions: &[QuestionText],
        request: &SampleRequest,
        index: Option<&mut SeenIndex>,
        seed: u64,
    ) -> Result<(RunStats, String, String), QbankError> {
        let mut pretty = Vec::new();
        let mut log = Vec::new();
        let stats = {
            let mut sinks = EmitSinks::new(Some(&mut pretty), Some(&mut log));
            Sampler::new(DeterministicRng::new(seed)).run(questions, request, index, &mut sinks)?
        };
        Ok((
            stats,
            String::from_utf8(pretty).expect("utf8 pretty output"),
            String::from_utf8(log).expect("utf8 log output"),
        ))
    }

    fn emitted_texts(pretty: &str) -> Vec<String> {
        pretty
            .split("\n\n")
            .filter(|block| !block.is_empty())
            .map(|block| {
                let close = block.find(')').expect("ordinal prefix");
                block[close + 1..].to_string()
            })
            .collect()
    }

    #[test]
    fn emits_every_candidate_exactly_once_when_count_equals_bank() {
        let questions = bank(&["alpha", "beta", "gamma"]);
        let (stats, pretty, log) =
            run_to_buffers(&questions, &SampleRequest::new(3), None, 7).expect("run");
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.duplicates_accepted, 0);

        let mut texts = emitted_texts(&pretty);
        texts.sort();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        // ordinals reflect emission order
        for ordinal in 0..3 {
            assert!(pretty.contains(&format!("Q{ordinal})")));
        }
        // log sink got the record form for each emission
        assert_eq!(log.matches("<q").count(), 3);
    }

    #[test]
    fn repeated_runs_never_repeat_an_index() {
        let questions = bank(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        for seed in 0..16 {
            let (_, pretty, _) =
                run_to_buffers(&questions, &SampleRequest::new(8), None, seed).expect("run");
            let mut texts = emitted_texts(&pretty);
            texts.sort();
            texts.dedup();
            assert_eq!(texts.len(), 8, "seed {seed} emitted a duplicate index");
        }
    }

    #[test]
    fn zero_count_is_a_configuration_error() {
        let questions = bank(&["alpha"]);
        let err = run_to_buffers(&questions, &SampleRequest::new(0), None, 1)
            .expect_err("zero count");
        assert!(matches!(err, QbankError::Configuration(_)));
    }

    #[test]
    fn overlong_count_fails_before_any_emission() {
        let questions = bank(&["alpha", "beta"]);
        let mut pretty = Vec::new();
        let mut sinks = EmitSinks::new(Some(&mut pretty), None);
        let err = Sampler::new(DeterministicRng::new(3))
            .run(&questions, &SampleRequest::new(3), None, &mut sinks)
            .expect_err("count exceeds bank");
        assert!(matches!(err, QbankError::Configuration(_)));
        assert!(pretty.is_empty());
    }

    #[test]
    fn update_mode_without_index_is_rejected() {
        let questions = bank(&["alpha"]);
        let request = SampleRequest {
            count: 1,
            duplicate_limit: 0,
            update_mode: true,
        };
        let err = run_to_buffers(&questions, &request, None, 1).expect_err("no index");
        assert!(matches!(err, QbankError::Configuration(_)));
    }

    #[test]
    fn zero_budget_never_emits_reference_duplicates() {
        let questions = bank(&["alpha", "beta", "gamma", "delta"]);
        let mut index = SeenIndex::new();
        index.mark_seen("ALPHA");
        for seed in 0..16 {
            let request = SampleRequest::new(3);
            let (stats, pretty, _) =
                run_to_buffers(&questions, &request, Some(&mut index), seed).expect("run");
            let mut texts = emitted_texts(&pretty);
            texts.sort();
            assert_eq!(texts, vec!["beta", "delta", "gamma"]);
            assert_eq!(stats.duplicates_accepted, 0);
        }
    }

    #[test]
    fn accepted_duplicates_never_exceed_the_budget() {
        let questions = bank(&["alpha", "beta", "gamma", "delta", "epsilon"]);
        let mut index = SeenIndex::new();
        for seen in ["alpha", "beta", "gamma"] {
            index.mark_seen(seen);
        }
        for seed in 0..16 {
            let request = SampleRequest {
                count: 4,
                duplicate_limit: 2,
                update_mode: false,
            };
            let (stats, _, _) =
                run_to_buffers(&questions, &request, Some(&mut index), seed).expect("run");
            assert!(stats.duplicates_accepted <= 2, "seed {seed} overspent");
            assert_eq!(stats.emitted, 4);
        }
    }

    #[test]
    fn unsatisfiable_run_surfaces_as_exhausted() {
        let questions = bank(&["alpha", "beta"]);
        let mut index = SeenIndex::new();
        index.mark_seen("alpha");
        index.mark_seen("beta");
        let (request, seed) = (SampleRequest::new(1), 5);
        let err =
            run_to_buffers(&questions, &request, Some(&mut index), seed).expect_err("exhausted");
        assert!(matches!(err, QbankError::Exhausted(_)));
    }

    #[test]
    fn update_mode_skips_the_log_for_reference_duplicates() {
        let questions = bank(&["alpha", "beta", "gamma", "delta"]);
        let mut index = SeenIndex::new();
        index.mark_seen("ALPHA");
        let request = SampleRequest {
            count: 4,
            duplicate_limit: 1,
            update_mode: true,
        };
        let (stats, pretty, log) =
            run_to_buffers(&questions, &request, Some(&mut index), 11).expect("run");
        assert_eq!(stats.emitted, 4);
        assert_eq!(stats.duplicates_accepted, 1);
        assert_eq!(pretty.matches("alpha").count(), 1);
        assert!(!log.contains("alpha"));
        for fresh in ["beta", "gamma", "delta"] {
            assert_eq!(log.matches(&crate::emit::log_line(fresh)).count(), 1);
            assert!(index.is_seen(fresh), "{fresh} marked seen during the run");
        }
    }

    #[test]
    fn update_mode_counts_in_run_normalized_twins_against_the_budget() {
        // two bank entries normalize equal; once the first is emitted and
        // marked seen, the second becomes a duplicate of the run itself
        let questions = bank(&["define foo", "Define\tFOO", "beta"]);
        let request = SampleRequest {
            count: 2,
            duplicate_limit: 0,
            update_mode: true,
        };
        for seed in 0..16 {
            let mut index = SeenIndex::new();
            let (stats, pretty, _) =
                run_to_buffers(&questions, &request, Some(&mut index), seed).expect("run");
            assert_eq!(stats.emitted, 2);
            let texts = emitted_texts(&pretty);
            let twins = texts
                .iter()
                .filter(|text| text.to_ascii_lowercase().contains("define"))
                .count();
            assert_eq!(twins, 1, "seed {seed} emitted both normalized twins");
            assert!(texts.iter().any(|text| text == "beta"));
        }
    }

    #[test]
    fn capacity_boundary_matches_the_formula() {
        assert!(check_capacity(10, 8, 2, 4).is_ok());
        let err = check_capacity(10, 8, 2, 5).expect_err("over capacity");
        assert!(matches!(err, QbankError::Configuration(_)));
        assert_eq!(max_offerable(10, 8, 2), 4);
        assert_eq!(max_offerable(3, 5, 1), 1);
    }

    #[test]
    fn reference_overlap_counts_insensitive_matches() {
        let questions = bank(&["alpha", "BETA", " gamma "]);
        let mut index = SeenIndex::new();
        index.mark_seen("beta");
        index.mark_seen("GAMMA");
        index.mark_seen("unrelated");
        assert_eq!(reference_overlap(&questions, &index), 2);
    }

    #[test]
    fn draw_fallback_scan_fires_only_near_exhaustion() {
        let questions = bank(&["alpha", "beta", "gamma"]);
        let (stats, _, _) =
            run_to_buffers(&questions, &SampleRequest::new(3), None, 21).expect("run");
        assert!(stats.draw_attempts >= 3);
        // with 65k retries against 3 slots the scan should never be needed
        assert_eq!(stats.fallback_scans, 0);
    }

    // always yields the top index of any range, so every retry after the
    // first draw lands on an already used slot
    struct SaturatingRng;

    impl rand::RngCore for SaturatingRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(u8::MAX);
        }
    }

    #[test]
    fn exhausted_retries_fall_back_to_a_first_unused_scan() {
        let questions = bank(&["alpha", "beta", "gamma"]);
        let mut pretty = Vec::new();
        let stats = {
            let mut sinks = EmitSinks::new(Some(&mut pretty), None);
            Sampler::new(SaturatingRng)
                .run(&questions, &SampleRequest::new(3), None, &mut sinks)
                .expect("run")
        };
        // the first draw takes the top slot; every later draw repeats it,
        // so the scan supplies the remaining slots in input order
        let pretty = String::from_utf8(pretty).expect("utf8 pretty output");
        assert_eq!(emitted_texts(&pretty), vec!["gamma", "alpha", "beta"]);
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.fallback_scans, 2);
        assert_eq!(stats.draw_attempts, 1 + 2 * DRAW_RETRY_LIMIT as u64);
    }

    #[test]
    fn deterministic_rng_is_reproducible() {
        let mut first = DeterministicRng::new(99);
        let mut second = DeterministicRng::new(99);
        use rand::RngCore;
        for _ in 0..8 {
            assert_eq!(first.next_u64(), second.next_u64());
        }
        let mut bytes = [0u8; 13];
        first.fill_bytes(&mut bytes);
        assert_ne!(bytes, [0u8; 13]);
    }
}
