//! Held-out regression metrics.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub n: usize,
    pub rmse: f64,
    pub mae: f64,
    /// `None` when the observed targets have zero variance.
    pub r2: Option<f64>,
}

/// Compare predictions against observations. `None` for empty or mismatched input.
pub fn regression_metrics(predicted: &[f64], observed: &[f64]) -> Option<RegressionMetrics> {
    let n = observed.len();
    if n == 0 || predicted.len() != n {
        return None;
    }
    let nf = n as f64;

    let mut sse = 0.0;
    let mut sae = 0.0;
    for (p, y) in predicted.iter().zip(observed) {
        let r = y - p;
        sse += r * r;
        sae += r.abs();
    }

    let mean = observed.iter().sum::<f64>() / nf;
    let sst: f64 = observed.iter().map(|y| (y - mean) * (y - mean)).sum();
    let r2 = if sst > 0.0 { Some(1.0 - sse / sst) } else { None };

    Some(RegressionMetrics {
        n,
        rmse: (sse / nf).sqrt(),
        mae: sae / nf,
        r2,
    })
}
