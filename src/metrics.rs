//! Derived measurements over finished sampling runs.

use crate::sampler::RunStats;

/// How hard a run had to work per accepted emission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawProfile {
    /// Random draws spent per emission. 1.0 means every draw landed on a
    /// fresh slot; values climb as the used bitmap fills up.
    pub draws_per_emission: f64,
    /// Share of accepted emissions that spent duplicate budget.
    pub duplicate_ratio: f64,
    /// Share of draws rejected outright for duplicating the reference set.
    pub rejection_ratio: f64,
}

/// Profile a finished run. `None` when nothing was emitted, since the
/// per-emission ratios are undefined for an empty run.
pub fn draw_profile(stats: &RunStats) -> Option<DrawProfile> {
    if stats.emitted == 0 {
        return None;
    }
    let emitted = stats.emitted as f64;
    let draws = stats.draw_attempts as f64;
    Some(DrawProfile {
        draws_per_emission: draws / emitted,
        duplicate_ratio: stats.duplicates_accepted as f64 / emitted,
        rejection_ratio: if stats.draw_attempts == 0 {
            0.0
        } else {
            stats.rejected_draws as f64 / draws
        },
    })
}
