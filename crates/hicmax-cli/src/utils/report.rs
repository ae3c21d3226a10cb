//! Plain-text run logs written next to the generated structures.

use hicmax::core::metrics::{MetricsSummary, StructureMetrics};
use hicmax::workflows::alpha_search::AlphaSearchResult;
use std::fmt;
use std::path::Path;

/// Parameters echoed at the top of every run log.
pub struct RunHeader<'a> {
    pub input: &'a Path,
    pub alpha: f64,
    pub learning_rate: f64,
    pub chromosome_lengths: Option<&'a [usize]>,
}

impl fmt::Display for RunHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Input file: {}", self.input.display())?;
        writeln!(f, "Conversion exponent: {}", self.alpha)?;
        writeln!(f, "Learning rate: {}", self.learning_rate)?;
        if let Some(lengths) = self.chromosome_lengths {
            let joined: Vec<String> = lengths.iter().map(ToString::to_string).collect();
            writeln!(f, "Chromosome lengths: {}", joined.join(" "))?;
        }
        Ok(())
    }
}

fn fmt_correlation(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| v.to_string())
}

/// Log for a single generated structure.
pub struct StructureLog<'a> {
    pub header: &'a RunHeader<'a>,
    pub metrics: &'a StructureMetrics,
    pub cost: f64,
    pub iterations: usize,
}

impl fmt::Display for StructureLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        writeln!(f, "Log-likelihood: {}", self.cost)?;
        writeln!(f, "Iterations: {}", self.iterations)?;
        writeln!(f, "RMSE: {}", self.metrics.rmse)?;
        writeln!(
            f,
            "Spearman correlation IFs vs. Reconstructed Dist: {}",
            fmt_correlation(self.metrics.spearman_if_vs_distance)
        )?;
        writeln!(
            f,
            "Spearman correlation WishDist vs. Reconstructed Dist: {}",
            fmt_correlation(self.metrics.spearman_target_vs_distance)
        )?;
        writeln!(
            f,
            "Pearson correlation WishDist vs. Reconstructed Dist: {}",
            fmt_correlation(self.metrics.pearson_target_vs_distance)
        )
    }
}

/// Averages over every structure of the run.
pub struct SummaryLog<'a> {
    pub header: &'a RunHeader<'a>,
    pub summary: &'a MetricsSummary,
}

impl fmt::Display for SummaryLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header)?;
        writeln!(f, "Structures: {}", self.summary.count)?;
        writeln!(f, "AVG RMSE: {}", self.summary.rmse)?;
        writeln!(
            f,
            "AVG Spearman correlation IFs vs. Reconstructed Dist: {}",
            fmt_correlation(self.summary.spearman_if_vs_distance)
        )?;
        writeln!(
            f,
            "AVG Spearman correlation WishDist vs. Reconstructed Dist: {}",
            fmt_correlation(self.summary.spearman_target_vs_distance)
        )?;
        writeln!(
            f,
            "AVG Pearson correlation WishDist vs. Reconstructed Dist: {}",
            fmt_correlation(self.summary.pearson_target_vs_distance)
        )
    }
}

/// Outcome of the conversion exponent sweep.
pub struct AlphaLog<'a>(pub &'a AlphaSearchResult);

impl fmt::Display for AlphaLog<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Best convert factor: {:.2}, pick models generated using this convert factor as your final models",
            self.0.best_alpha
        )?;
        writeln!(f)?;
        writeln!(f, "{:<8}{:<24}{}", "alpha", "spearman_if_vs_dist", "avg_rmse")?;
        for candidate in &self.0.candidates {
            writeln!(
                f,
                "{:<8.2}{:<24}{}",
                candidate.alpha,
                fmt_correlation(candidate.score()),
                candidate.summary.rmse
            )?;
        }
        Ok(())
    }
}
