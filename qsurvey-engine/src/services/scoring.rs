//! Scoring & Aggregation Engine
//!
//! Read-only. Only COMPLETED response sessions are counted. Scale statistics
//! are computed here rather than in SQL so the result is the same on every run:
//! rows arrive fully ordered and respondent scores are ranked by
//! (score, respondent id) before any summation.

use super::ensure_survey_exists;
use crate::db;
use crate::db::stats::ScaleItemRow;
use crate::error::EngineResult;
use crate::models::{AverageScore, OptionCount, QuestionCount, ScaleStatistics};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Item score after reverse coding (`max + min - score` when reversed)
pub fn item_score(score: i64, is_reverse: bool, min_score: i64, max_score: i64) -> i64 {
    if is_reverse {
        max_score + min_score - score
    } else {
        score
    }
}

/// Weighted mean of `(item score, weight)` pairs; `None` when the weights sum
/// to zero or the sums overflow
pub fn respondent_scale_score(items: &[(i64, Decimal)]) -> Option<f64> {
    let (weighted, total_weight) = items.iter().try_fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(weighted, total), &(score, weight)| {
            let product = Decimal::from(score).checked_mul(weight)?;
            Some((weighted.checked_add(product)?, total.checked_add(weight)?))
        },
    )?;
    if total_weight.is_zero() {
        return None;
    }
    weighted.checked_div(total_weight)?.to_f64()
}

/// Count, mean, sample stddev and median of respondent scores
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub count: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub median: Option<f64>,
}

/// Summarise `(respondent id, score)` pairs
///
/// Values are ranked by score then respondent id; the median of an even count
/// is the mean of the two central values.
pub fn describe(mut scores: Vec<(i64, f64)>) -> Distribution {
    scores.sort_by(rank_order);
    let n = scores.len();
    if n == 0 {
        return Distribution {
            count: 0,
            mean: None,
            stddev: None,
            median: None,
        };
    }

    let values: Vec<f64> = scores.iter().map(|(_, v)| *v).collect();
    let mean = values.iter().sum::<f64>() / n as f64;
    let stddev = if n >= 2 {
        let squares: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some((squares / (n - 1) as f64).sqrt())
    } else {
        None
    };
    let median = match n % 2 {
        1 => values[n / 2],
        _ => (values[n / 2 - 1] + values[n / 2]) / 2.0,
    };

    Distribution {
        count: n,
        mean: Some(mean),
        stddev,
        median: Some(median),
    }
}

/// Ranking order for `(respondent id, score)`: score, then respondent id
fn rank_order(a: &(i64, f64), b: &(i64, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}

/// Per-scale respondent scores from ordered item rows
fn scale_scores(items: &[ScaleItemRow]) -> BTreeMap<i64, Vec<(i64, f64)>> {
    let mut grouped: BTreeMap<(i64, i64), Vec<(i64, Decimal)>> = BTreeMap::new();
    for item in items {
        grouped
            .entry((item.scale_id, item.respondent_id))
            .or_default()
            .push((
                item_score(item.score, item.is_reverse, item.min_score, item.max_score),
                item.weight,
            ));
    }

    let mut per_scale: BTreeMap<i64, Vec<(i64, f64)>> = BTreeMap::new();
    for ((scale_id, respondent_id), scored) in grouped {
        if let Some(score) = respondent_scale_score(&scored) {
            per_scale.entry(scale_id).or_default().push((respondent_id, score));
        }
    }
    per_scale
}

/// Answered count per question (zero counts included), in display order
pub async fn question_counts(pool: &SqlitePool, survey_id: i64) -> EngineResult<Vec<QuestionCount>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    db::stats::question_counts(&mut conn, survey_id).await
}

/// Selection count per option (zero counts included)
pub async fn option_counts(pool: &SqlitePool, survey_id: i64) -> EngineResult<Vec<OptionCount>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;
    db::stats::option_counts(&mut conn, survey_id).await
}

/// Mean selected-option score of SINGLE_CHOICE questions with scored answers
pub async fn average_scores(pool: &SqlitePool, survey_id: i64) -> EngineResult<Vec<AverageScore>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;

    Ok(db::stats::score_totals(&mut conn, survey_id)
        .await?
        .into_iter()
        .map(|t| AverageScore {
            question_id: t.question_id,
            display_order: t.display_order,
            scored_count: t.scored_count,
            average: t.score_sum as f64 / t.scored_count as f64,
        })
        .collect())
}

/// Statistics for every scale of the survey, in scale id order
pub async fn scale_statistics(pool: &SqlitePool, survey_id: i64) -> EngineResult<Vec<ScaleStatistics>> {
    let mut conn = pool.acquire().await?;
    ensure_survey_exists(&mut conn, survey_id).await?;

    let scales = db::scales::load_scales(&mut conn, survey_id).await?;
    let items = db::stats::scale_items(&mut conn, survey_id).await?;
    let mut per_scale = scale_scores(&items);
    debug!(survey_id, scales = scales.len(), items = items.len(), "Computing scale statistics");

    Ok(scales
        .into_iter()
        .map(|scale| {
            let dist = describe(per_scale.remove(&scale.scale_id).unwrap_or_default());
            ScaleStatistics {
                scale_id: scale.scale_id,
                scale_code: scale.scale_code,
                scale_name: scale.scale_name,
                count: dist.count,
                mean: dist.mean,
                stddev: dist.stddev,
                median: dist.median,
            }
        })
        .collect())
}
