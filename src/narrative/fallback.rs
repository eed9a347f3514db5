//! Template narratives built purely from the metrics. Never fail.

use super::config::NarrativeConfig;
use super::prompts::{fmt_pct, AssetClass, AssetPrefixes};
use super::schema::{DeepAnalysis, SummaryNarrative};
use crate::signal::{MetricSet, Polarity, ScoreScale};

/// Headline stored for backfilled periods older than the narrative cutoff.
pub const HISTORICAL_HEADLINE: &str = "Historical CPI regime data.";

const UNAVAILABLE: &str = "Inflation data is currently unavailable.";

fn level_comment(core: f64) -> &'static str {
    if core > 4.0 {
        "Core inflation remains elevated relative to policy targets."
    } else if core < 2.0 {
        "Core inflation is running below traditional target levels."
    } else {
        "Core inflation is broadly aligned with policy targets."
    }
}

fn momentum_comment(momentum: Option<f64>) -> Option<&'static str> {
    let m = momentum?;
    Some(if m > 0.3 {
        "Short-term price momentum is accelerating."
    } else if m < -0.3 {
        "Short-term price momentum is easing."
    } else {
        "Short-term price momentum remains stable."
    })
}

fn expectations_comment(breakeven: Option<f64>) -> Option<&'static str> {
    let b = breakeven?;
    Some(if b > 3.0 {
        "Market-based expectations imply elevated forward inflation risk."
    } else if b < 2.0 {
        "Market expectations remain contained."
    } else {
        "Market expectations are anchored near long-term norms."
    })
}

fn key_risks(metrics: &MetricSet) -> Vec<String> {
    let mut risks = Vec::new();
    match metrics.regime {
        crate::signal::InflationRegime::InflationaryPressure => {
            risks.push("Persistent price pressure could delay policy easing.".to_string())
        }
        crate::signal::InflationRegime::Disinflationary => {
            risks.push("Cooling prices may signal weakening demand.".to_string())
        }
        crate::signal::InflationRegime::Neutral => {
            risks.push("A surprise in core prices could shift the regime.".to_string())
        }
    }
    if metrics.momentum.is_some_and(|m| m.abs() > 0.3) {
        risks.push("Short-term momentum is moving away from the trend.".to_string());
    }
    if metrics.breakeven_5y.is_some_and(|b| !(2.0..=3.0).contains(&b)) {
        risks.push("Market expectations sit outside their usual range.".to_string());
    }
    risks
}

pub fn template_summary(metrics: &MetricSet) -> SummaryNarrative {
    let Some(core) = metrics.core_yoy else {
        return SummaryNarrative {
            headline: "Inflation data unavailable".to_string(),
            summary: UNAVAILABLE.to_string(),
            key_risks: Vec::new(),
        };
    };

    let summary = [
        Some(level_comment(core)),
        momentum_comment(metrics.momentum),
        expectations_comment(metrics.breakeven_5y),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    SummaryNarrative {
        headline: format!("Inflation regime: {}", metrics.regime),
        summary,
        key_risks: key_risks(metrics),
    }
}

fn asset_body(asset: AssetClass, direction: Polarity) -> &'static str {
    match (asset, direction) {
        (AssetClass::Stocks, Polarity::Positive) => {
            "Rising input costs and higher discount rates can weigh on equity valuations."
        }
        (AssetClass::Stocks, Polarity::Negative) => {
            "Easing price pressure can support valuations if growth holds up."
        }
        (AssetClass::Bonds, Polarity::Positive) => {
            "Sticky inflation tends to push yields higher and pressure duration."
        }
        (AssetClass::Bonds, Polarity::Negative) => {
            "Cooling inflation historically supports longer-duration bonds."
        }
        (AssetClass::Gold, Polarity::Positive) => {
            "Demand for inflation hedges often lifts gold in this backdrop."
        }
        (AssetClass::Gold, Polarity::Negative) => {
            "Lower hedging demand can leave gold driven by real rates instead."
        }
        (AssetClass::Silver, Polarity::Positive) => {
            "Silver tends to track gold with added industrial sensitivity."
        }
        (AssetClass::Silver, Polarity::Negative) => {
            "Silver may lag as both hedge and industrial demand soften."
        }
        (AssetClass::Oil, Polarity::Positive) => {
            "Energy prices are both a driver and a beneficiary of inflationary periods."
        }
        (AssetClass::Oil, Polarity::Negative) => {
            "Softer energy prices often accompany disinflationary phases."
        }
        (_, Polarity::Neutral) => {
            "The inflation backdrop is not a dominant driver for this asset class right now."
        }
    }
}

fn drivers_text(metrics: &MetricSet) -> String {
    if metrics.core_yoy.is_none() {
        return "Inflation data is unavailable at this time.".to_string();
    }
    let momentum_view = match metrics.momentum {
        Some(m) if m > 0.3 => "renewed upward pressure in price dynamics",
        Some(m) if m < -0.3 => "a moderation in underlying price pressures",
        Some(_) => "relative stability in near-term price movements",
        None => "limited short-term directional clarity",
    };
    let expectations_view = match metrics.breakeven_5y {
        Some(b) if b > 3.0 => "investors are pricing elevated inflation expectations",
        Some(b) if b < 2.0 => "investors expect contained inflation ahead",
        Some(_) => "expectations remain broadly anchored",
        None => "forward-looking data is insufficient",
    };
    format!(
        "Headline inflation stands at {}, with core inflation at {}. \
         Three-month momentum of {} indicates {}. \
         Five-year breakeven inflation at {} suggests {}. \
         The inflation regime is classified as \"{}\".",
        fmt_pct(metrics.headline_yoy, 1),
        fmt_pct(metrics.core_yoy, 1),
        fmt_pct(metrics.momentum, 2),
        momentum_view,
        fmt_pct(metrics.breakeven_5y, 2),
        expectations_view,
        metrics.regime,
    )
}

fn regime_shift_text(metrics: &MetricSet) -> String {
    let threshold = ScoreScale::CATEGORY.threshold;
    let distance = match ScoreScale::CATEGORY.classify(metrics.score) {
        Polarity::Neutral => threshold - metrics.score.abs(),
        _ => metrics.score.abs() - threshold,
    };
    let risk = if distance <= 0.5 { "elevated" } else { "low" };
    format!(
        "Regime-shift risk is {risk}: the score of {:.1} sits {:.1} points \
         from the nearest regime boundary.",
        metrics.score, distance
    )
}

/// Six populated sections; asset sections carry the required prefixes.
pub fn template_deep_analysis(metrics: &MetricSet, config: &NarrativeConfig) -> DeepAnalysis {
    let prefixes = AssetPrefixes::for_metrics(metrics, config);
    let direction = Polarity::of_sign(metrics.score);
    let section =
        |asset: AssetClass| format!("{} {}", prefixes.get(asset), asset_body(asset, direction));

    DeepAnalysis {
        drivers: drivers_text(metrics),
        stocks: section(AssetClass::Stocks),
        bonds: section(AssetClass::Bonds),
        gold: section(AssetClass::Gold),
        silver: section(AssetClass::Silver),
        oil: section(AssetClass::Oil),
        regime_shift_risk: regime_shift_text(metrics),
    }
}
