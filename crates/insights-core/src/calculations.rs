//! Derived metrics shared by the aggregators.
//!
//! Every ratio here is defined as `0.0` when its denominator is zero.

/// A user with more than this many `update` events counts as a content
/// builder even without create or publish activity.
pub const CONTENT_BUILDER_UPDATE_THRESHOLD: u64 = 5;

/// Weight of each distinct user in the adoption score.
const ADOPTION_USER_WEIGHT: f64 = 0.5;
/// Weight of each published entry in the adoption score.
const ADOPTION_PUBLISHED_WEIGHT: f64 = 2.0;

// ── MetricsCalculator ─────────────────────────────────────────────────────────

/// Stateless collection of ratio, score and classification calculations.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Publish/unpublish events per distinct entry.
    pub fn publish_ratio(total_publishes: u64, total_entries: usize) -> f64 {
        if total_entries == 0 {
            return 0.0;
        }
        total_publishes as f64 / total_entries as f64
    }

    /// Ranking score for a content-type × locale pair:
    /// `entries × (users × 0.5) + published × 2`.
    pub fn adoption_score(entries: usize, users: usize, published_entries: usize) -> f64 {
        entries as f64 * (users as f64 * ADOPTION_USER_WEIGHT)
            + published_entries as f64 * ADOPTION_PUBLISHED_WEIGHT
    }

    /// Mean items per author, rounded to two decimals.
    pub fn avg_items_per_author(total_items: u64, total_users: usize) -> f64 {
        if total_users == 0 {
            return 0.0;
        }
        Self::round_to(total_items as f64 / total_users as f64, 2)
    }

    /// `part / whole × 100`, unrounded.
    pub fn usage_percentage(part: usize, whole: usize) -> f64 {
        if whole == 0 {
            return 0.0;
        }
        part as f64 / whole as f64 * 100.0
    }

    /// Whether a user's event counts so far mark them as authoring content.
    pub fn is_content_builder(create_events: u64, update_events: u64, publish_events: u64) -> bool {
        create_events > 0
            || update_events > CONTENT_BUILDER_UPDATE_THRESHOLD
            || publish_events > 0
    }

    /// Round half away from zero to `decimals` places.
    pub fn round_to(value: f64, decimals: u32) -> f64 {
        let factor = 10_f64.powi(decimals as i32);
        (value * factor).round() / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── publish_ratio ────────────────────────────────────────────────────────

    #[test]
    fn test_publish_ratio() {
        assert!((MetricsCalculator::publish_ratio(3, 2) - 1.5).abs() < 1e-9);
        assert!((MetricsCalculator::publish_ratio(1, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_publish_ratio_zero_entries() {
        assert_eq!(MetricsCalculator::publish_ratio(7, 0), 0.0);
    }

    // ── adoption_score ───────────────────────────────────────────────────────

    #[test]
    fn test_adoption_score() {
        // 4 entries × (3 users × 0.5) + 2 published × 2 = 6 + 4
        assert!((MetricsCalculator::adoption_score(4, 3, 2) - 10.0).abs() < 1e-9);
        assert_eq!(MetricsCalculator::adoption_score(0, 5, 0), 0.0);
    }

    // ── avg_items_per_author ─────────────────────────────────────────────────

    #[test]
    fn test_avg_items_per_author_rounds_to_two_places() {
        assert!((MetricsCalculator::avg_items_per_author(10, 3) - 3.33).abs() < 1e-9);
        assert!((MetricsCalculator::avg_items_per_author(5, 3) - 1.67).abs() < 1e-9);
    }

    #[test]
    fn test_avg_items_per_author_no_users() {
        assert_eq!(MetricsCalculator::avg_items_per_author(0, 0), 0.0);
    }

    // ── usage_percentage ─────────────────────────────────────────────────────

    #[test]
    fn test_usage_percentage() {
        assert!((MetricsCalculator::usage_percentage(1, 4) - 25.0).abs() < 1e-9);
        assert_eq!(MetricsCalculator::usage_percentage(3, 0), 0.0);
    }

    // ── is_content_builder ───────────────────────────────────────────────────

    #[test]
    fn test_is_content_builder_thresholds() {
        assert!(MetricsCalculator::is_content_builder(1, 0, 0));
        assert!(MetricsCalculator::is_content_builder(0, 0, 1));
        assert!(!MetricsCalculator::is_content_builder(0, 5, 0));
        assert!(MetricsCalculator::is_content_builder(0, 6, 0));
        assert!(!MetricsCalculator::is_content_builder(0, 0, 0));
    }
}
