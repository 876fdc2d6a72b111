//! Scoring for a single removal.

/// Remaining-token count below which the bonus starts paying out.
pub const BONUS_THRESHOLD: usize = 50;
/// Bonus points per token under [`BONUS_THRESHOLD`].
pub const BONUS_PER_TOKEN: u32 = 100;

/// Score change produced by removing one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScoreDelta {
    /// Added to the running cluster score: `size²`.
    pub cluster_points: u32,
    /// Replaces the previous bonus outright; it is not added to it.
    pub bonus: u32,
}

/// Points for removing `removed` tokens when `remaining` are left on the board.
pub fn score_removal(removed: usize, remaining: usize) -> ScoreDelta {
    let removed = removed as u32;
    ScoreDelta {
        cluster_points: removed.saturating_mul(removed),
        bonus: bonus_for(remaining),
    }
}

/// `max(0, 50 - remaining) * 100`.
pub fn bonus_for(remaining: usize) -> u32 {
    BONUS_THRESHOLD.saturating_sub(remaining) as u32 * BONUS_PER_TOKEN
}
