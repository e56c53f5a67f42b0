//! Synthetic county sample with a known linear relationship.
//!
//! ```text
//! Obesity_Percentage_2017 = intercept + slope * Obesity_Percentage_2012 + N(0, noise_sigma)
//! ```
//!
//! All quantities are in source units (percent 0–100). The remaining inputs
//! get plausible random values so the table looks like the real atlas. Every
//! record is built through [`StructuredRecord::from_source`], i.e. with the
//! same validation and normalization as ingested data.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::{InputField, StructuredRecord};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: u64,
    pub intercept: f64,
    pub slope: f64,
    /// Gaussian noise on the target, in percentage points. Zero is allowed.
    pub noise_sigma: f64,
    /// Probability that any one input (never the 2012 obesity rate) is blanked.
    pub missing_rate: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 200,
            seed: 42,
            intercept: 4.0,
            slope: 0.9,
            noise_sigma: 1.0,
            missing_rate: 0.0,
        }
    }
}

impl SampleConfig {
    /// Target for a given 2012 obesity rate, without noise.
    pub fn expected_target(&self, obesity_2012: f64) -> f64 {
        self.intercept + self.slope * obesity_2012
    }
}

pub fn generate_sample(config: &SampleConfig) -> Result<Vec<StructuredRecord>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }
    if !(config.noise_sigma.is_finite() && config.noise_sigma >= 0.0) {
        return Err(AppError::new(2, "Noise sigma must be finite and >= 0."));
    }
    if !(0.0..1.0).contains(&config.missing_rate) {
        return Err(AppError::new(2, "Missing rate must be in [0, 1)."));
    }
    if !(config.intercept.is_finite() && config.slope.is_finite()) {
        return Err(AppError::new(2, "Intercept and slope must be finite."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sigma)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut records = Vec::with_capacity(config.count);
    for i in 0..config.count {
        let obesity_2012: f64 = rng.gen_range(15.0..45.0);
        let diabetes_2008: f64 = rng.gen_range(5.0..16.0);
        let diabetes_2013 = (diabetes_2008 + rng.gen_range(-1.0..3.0)).clamp(0.0, 100.0);
        let facilities_2011 = f64::from(rng.gen_range(0u32..40));
        let facilities_2016 = (facilities_2011 + f64::from(rng.gen_range(0u32..8)) - 3.0).max(0.0);
        let population_k: f64 = rng.gen_range(2.0..400.0);
        let per_1000_2011 = facilities_2011 / population_k;
        let per_1000_2016 = facilities_2016 / (population_k * rng.gen_range(0.95..1.08));

        let mut inputs = [
            Some(diabetes_2008),
            Some(diabetes_2013),
            Some(obesity_2012),
            Some(facilities_2011),
            Some(facilities_2016),
            Some(per_1000_2011),
            Some(per_1000_2016),
            Some(percent_change(facilities_2011, facilities_2016)),
            Some(percent_change(per_1000_2011, per_1000_2016)),
        ];
        if config.missing_rate > 0.0 {
            for (slot, field) in inputs.iter_mut().zip(InputField::ALL) {
                if field != InputField::ObesityPercentage2012 && rng.gen_bool(config.missing_rate) {
                    *slot = None;
                }
            }
        }

        let target = (config.expected_target(obesity_2012) + noise.sample(&mut rng)).clamp(0.0, 100.0);
        let fips = format!("{:05}", 1001 + 2 * i);
        let record = StructuredRecord::from_source(Some(fips), inputs, Some(target))
            .map_err(|e| AppError::new(4, format!("Generated an invalid record: {e}")))?;
        records.push(record);
    }

    debug!(count = records.len(), seed = config.seed, "synthetic sample generated");
    Ok(records)
}

fn percent_change(from: f64, to: f64) -> f64 {
    if from > 0.0 {
        ((to - from) / from * 100.0).max(-100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sample() {
        let config = SampleConfig {
            count: 20,
            ..SampleConfig::default()
        };
        assert_eq!(generate_sample(&config).unwrap(), generate_sample(&config).unwrap());
    }

    #[test]
    fn noiseless_target_follows_the_line() {
        let config = SampleConfig {
            count: 50,
            noise_sigma: 0.0,
            ..SampleConfig::default()
        };
        for r in generate_sample(&config).unwrap() {
            let x = r.obesity_percentage_2012.unwrap() * 100.0;
            let y = r.obesity_percentage_2017.unwrap() * 100.0;
            assert!((y - config.expected_target(x)).abs() < 1e-9);
        }
    }

    #[test]
    fn missing_rate_blanks_inputs_but_not_the_driver() {
        let config = SampleConfig {
            count: 100,
            missing_rate: 0.5,
            ..SampleConfig::default()
        };
        let records = generate_sample(&config).unwrap();
        assert!(records.iter().all(|r| r.obesity_percentage_2012.is_some()));
        assert!(records.iter().any(|r| r.diabetes_percentage_2008.is_none()));
    }

    #[test]
    fn rejects_bad_config() {
        let zero = SampleConfig {
            count: 0,
            ..SampleConfig::default()
        };
        assert_eq!(generate_sample(&zero).unwrap_err().exit_code(), 2);
        let negative_noise = SampleConfig {
            noise_sigma: -1.0,
            ..SampleConfig::default()
        };
        assert!(generate_sample(&negative_noise).is_err());
    }
}
