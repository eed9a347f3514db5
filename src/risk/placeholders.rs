//! Static categories for risk areas without a derivation pipeline yet.

use super::{RiskCategory, RiskLevel};
use crate::jobs::KeyEventAggregate;

fn placeholder(
    slug: &str,
    label: &str,
    status: &str,
    summary: &str,
    trend: &[f64],
    score: f64,
) -> RiskCategory {
    RiskCategory {
        slug: slug.to_string(),
        label: label.to_string(),
        level: RiskLevel::of_score(score),
        status: status.to_string(),
        score,
        summary: summary.to_string(),
        trend: trend.to_vec(),
        meta: None,
    }
}

/// Rates, growth, market conditions and key events, in display order.
///
/// The key-events category keeps its fixed score; the latest key-event
/// aggregate, when present, is attached as `meta`.
pub fn placeholder_categories(key_events: Option<&KeyEventAggregate>) -> Vec<RiskCategory> {
    let mut events = placeholder(
        "geopolitics",
        "Key Events",
        "Moderate",
        "Structural geopolitical developments.",
        &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 2.0, 2.0],
        0.0,
    );
    events.meta = key_events.and_then(|a| serde_json::to_value(a).ok());

    vec![
        placeholder(
            "rates",
            "Interest Rates",
            "Elevated",
            "Policy rates remain above neutral levels.",
            &[0.5, 0.75, 1.5, 2.5, 3.5, 4.25, 4.5, 4.5],
            1.0,
        ),
        placeholder(
            "growth",
            "Growth",
            "Slowing",
            "Leading indicators moderating.",
            &[55.0, 54.0, 53.0, 52.0, 50.0, 49.0, 48.0, 47.0],
            -1.0,
        ),
        placeholder(
            "market",
            "Market Conditions",
            "Cautious",
            "Volatility above median levels.",
            &[15.0, 16.0, 18.0, 22.0, 28.0, 24.0, 21.0, 19.0],
            -1.0,
        ),
        events,
    ]
}
