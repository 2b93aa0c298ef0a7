// src/store/rank.rs

//! Clip rank computation.

use chrono::{DateTime, Utc};

use crate::models::RankingConfig;

/// Compute the recency/popularity rank of a clip.
///
/// `rank = view_count / effective_age_days ^ decay_exponent`, where the
/// effective age is floored at `min_age_secs` so a brand-new clip cannot
/// divide by a near-zero age. With an exponent above 1 the rank decays
/// faster than view counts typically grow, favoring recent-and-popular
/// clips over merely old-and-popular ones.
pub fn compute_rank(
    view_count: u32,
    uploaded_at: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &RankingConfig,
) -> f64 {
    let min_age = chrono::Duration::seconds(config.min_age_secs as i64);
    let age = (now - uploaded_at).max(min_age);
    let age_days = age.num_milliseconds() as f64 / 86_400_000.0;
    f64::from(view_count) / age_days.powf(config.decay_exponent)
}
