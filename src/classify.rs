//! Quantile breakpoints and choropleth bucket lookup.

use thiserror::Error;

use crate::color::{ColorScale, ColorToken};

/// Errors raised while computing or applying quantile breakpoints.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifyError {
    /// No numeric value to compute quantiles from.
    #[error("cannot compute quantiles of an empty sample")]
    EmptyInput,

    /// Malformed probabilities, breakpoints or color scale.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of what went wrong.
        reason: String,
    },
}

fn invalid(reason: impl Into<String>) -> ClassifyError {
    ClassifyError::InvalidArgument {
        reason: reason.into(),
    }
}

/// Non-decreasing quantile values, one per requested probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoints(Vec<f64>);

impl Breakpoints {
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of classification buckets (`len - 1`).
    pub fn bucket_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Lower and upper bound of every bucket.
    pub fn ranges(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

/// R-7 (linear interpolation) quantiles of `sample` at `probs`.
///
/// The sample is copied and sorted; NaN and infinite entries are skipped, so
/// an îlot whose relative change divides by zero does not poison every
/// breakpoint. `probs` must be
/// non-empty, finite, within `[0, 1]` and non-decreasing.
pub fn compute_quantiles(sample: &[f64], probs: &[f64]) -> Result<Breakpoints, ClassifyError> {
    if probs.is_empty() {
        return Err(invalid("no quantile probabilities given"));
    }
    if let Some(q) = probs.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        return Err(invalid(format!("probability {q} is outside [0, 1]")));
    }
    if probs.windows(2).any(|w| w[1] < w[0]) {
        return Err(invalid("quantile probabilities must be non-decreasing"));
    }

    let mut sorted: Vec<f64> = sample.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(ClassifyError::EmptyInput);
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let values = probs
        .iter()
        .map(|&q| {
            let pos = (n - 1) as f64 * q;
            let base = (pos.floor() as usize).min(n - 1);
            let frac = pos - base as f64;
            match sorted.get(base + 1) {
                Some(next) if frac > 0.0 && *next != sorted[base] => {
                    sorted[base] + frac * (next - sorted[base])
                }
                _ => sorted[base],
            }
        })
        .collect();

    Ok(Breakpoints(values))
}

/// Breakpoints paired with the color scale they index into.
#[derive(Debug, Clone)]
pub struct Classifier {
    breakpoints: Breakpoints,
    scale: ColorScale,
}

impl Classifier {
    /// Pair `breakpoints` with `scale`.
    ///
    /// The scale needs one color per bucket, optionally followed by one
    /// overflow color for values the buckets do not capture.
    pub fn new(breakpoints: Breakpoints, scale: ColorScale) -> Result<Self, ClassifyError> {
        let buckets = breakpoints.bucket_count();
        if buckets == 0 {
            return Err(invalid("at least two breakpoints are required"));
        }
        if scale.len() != buckets && scale.len() != buckets + 1 {
            return Err(invalid(format!(
                "color scale has {} colors for {buckets} buckets",
                scale.len()
            )));
        }
        Ok(Self { breakpoints, scale })
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// Index of the color used for `value`.
    ///
    /// First bucket whose upper bound is `>= value`. Values above the top
    /// breakpoint, NaN and missing values all land on the last color.
    pub fn bucket(&self, value: Option<f64>) -> usize {
        let last = self.scale.len() - 1;
        let Some(value) = value else {
            return last;
        };
        self.breakpoints.0[1..]
            .iter()
            .position(|upper| value <= *upper)
            .unwrap_or(last)
    }

    pub fn color(&self, value: Option<f64>) -> ColorToken {
        self.scale.colors()[self.bucket(value)]
    }
}

/// Color of `value` given `quantiles` and `color_scale`.
pub fn classify(
    value: Option<f64>,
    quantiles: &Breakpoints,
    color_scale: &ColorScale,
) -> Result<ColorToken, ClassifyError> {
    let classifier = Classifier::new(quantiles.clone(), color_scale.clone())?;
    Ok(classifier.color(value))
}
