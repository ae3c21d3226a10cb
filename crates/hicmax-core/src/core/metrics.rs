//! Post-hoc agreement between a reconstructed structure and its constraints.
//!
//! These numbers are reported per structure and drive the conversion exponent
//! sweep; the optimizer itself never looks at them.

use crate::core::models::constraint::ConstraintSet;
use crate::core::utils::geometry;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureMetrics {
    /// Root mean squared error between reconstructed and target distances.
    pub rmse: f64,
    /// Spearman correlation of contact frequency against reconstructed distance.
    pub spearman_if_vs_distance: Option<f64>,
    /// Spearman correlation of target against reconstructed distance.
    pub spearman_target_vs_distance: Option<f64>,
    /// Pearson correlation of target against reconstructed distance.
    pub pearson_target_vs_distance: Option<f64>,
}

impl StructureMetrics {
    pub fn compute(coords: &[f64], constraints: &ConstraintSet) -> Self {
        let mut frequencies = Vec::with_capacity(constraints.len());
        let mut targets = Vec::with_capacity(constraints.len());
        let mut distances = Vec::with_capacity(constraints.len());
        for c in constraints {
            frequencies.push(c.frequency());
            targets.push(c.target_distance());
            distances.push(geometry::distance(coords, c.pos1(), c.pos2()));
        }

        Self {
            rmse: rmse(&distances, &targets).unwrap_or(0.0),
            spearman_if_vs_distance: spearman(&frequencies, &distances),
            spearman_target_vs_distance: spearman(&targets, &distances),
            pearson_target_vs_distance: pearson(&targets, &distances),
        }
    }
}

/// Averages over several structures; correlations average only the defined values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsSummary {
    pub count: usize,
    pub rmse: f64,
    pub spearman_if_vs_distance: Option<f64>,
    pub spearman_target_vs_distance: Option<f64>,
    pub pearson_target_vs_distance: Option<f64>,
}

impl MetricsSummary {
    pub fn average<'a, I>(metrics: I) -> Self
    where
        I: IntoIterator<Item = &'a StructureMetrics>,
    {
        let all: Vec<&StructureMetrics> = metrics.into_iter().collect();
        if all.is_empty() {
            return Self::default();
        }
        let mean_of = |values: Vec<f64>| -> Option<f64> {
            (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
        };

        Self {
            count: all.len(),
            rmse: all.iter().map(|m| m.rmse).sum::<f64>() / all.len() as f64,
            spearman_if_vs_distance: mean_of(
                all.iter().filter_map(|m| m.spearman_if_vs_distance).collect(),
            ),
            spearman_target_vs_distance: mean_of(
                all.iter()
                    .filter_map(|m| m.spearman_target_vs_distance)
                    .collect(),
            ),
            pearson_target_vs_distance: mean_of(
                all.iter()
                    .filter_map(|m| m.pearson_target_vs_distance)
                    .collect(),
            ),
        }
    }
}

pub fn rmse(actual: &[f64], expected: &[f64]) -> Option<f64> {
    if actual.len() != expected.len() || actual.is_empty() {
        return None;
    }
    let sum: f64 = actual
        .iter()
        .zip(expected)
        .map(|(a, e)| (a - e).powi(2))
        .sum();
    Some((sum / actual.len() as f64).sqrt())
}

/// Pearson correlation; `None` for mismatched/short input or zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// 1-based ranks; ties share the mean of the ranks they span.
pub fn ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let shared = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = shared;
        }
        start = end;
    }
    ranks
}

pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() {
        return None;
    }
    pearson(&ranks(x), &ranks(y))
}
