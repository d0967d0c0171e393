//! Score, level and gravity speed.

use std::time::Duration;

/// Fastest gravity; also the period while soft drop is held.
pub const FAST_TICK_MS: u64 = 50;
/// Gravity period at level 1.
const BASE_TICK_MS: u64 = 450;
/// Gravity speed-up per level.
const TICK_STEP_MS: u64 = 20;
/// A soft-drop release this soon after the press counts as a tap.
pub const SOFT_DROP_TAP_MS: u64 = 80;

/// Points for a lock that cleared `rows` rows at `level`:
/// `300k + 40(k²−1) + 100·level²`. Zero when nothing cleared.
pub fn line_clear_points(rows: usize, level: u32) -> u32 {
    if rows == 0 {
        return 0;
    }
    let k = rows as u32;
    let level_bonus = 100u32.saturating_mul(level.saturating_mul(level));
    let row_bonus = 40 * (k * k - 1);
    (300 * k).saturating_add(row_bonus).saturating_add(level_bonus)
}

/// Score needed to move up from `level` to `level + 1`: `1000·(level+1)³ / 5`.
pub fn next_level_threshold(level: u32) -> u64 {
    let next = u64::from(level) + 1;
    1000 * next * next * next / 5
}

/// Level after a score change. Never goes down; may jump several levels.
pub fn level_for_score(level: u32, score: u32) -> u32 {
    let mut level = level.max(1);
    while u64::from(score) >= next_level_threshold(level) {
        level += 1;
    }
    level
}

/// Gravity period for `level`: `max(50, 450 − (level−1)·20)` ms.
pub fn gravity_interval(level: u32) -> Duration {
    let speedup = u64::from(level.saturating_sub(1)).saturating_mul(TICK_STEP_MS);
    Duration::from_millis(BASE_TICK_MS.saturating_sub(speedup).max(FAST_TICK_MS))
}
