//! Record types shared by ingest, training and serving.

use serde::{Deserialize, Serialize};

use crate::domain::features::{FeatureVector, MISSING, Stage};
use crate::domain::schema::{
    InputField, TARGET_FIELD, TARGET_KIND, canonical_field_names, normalize_source_value,
};
use crate::error::PipelineError;

/// One county observation restricted to the canonical schema.
///
/// Values are in model units: percentage fields are fractions in `[0, 1]`.
/// `None` means the value was not observed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    /// County FIPS code. Never reaches the model.
    pub fips: Option<String>,

    pub diabetes_percentage_2008: Option<f64>,
    pub diabetes_percentage_2013: Option<f64>,
    pub obesity_percentage_2012: Option<f64>,
    pub recreation_facilities_2011: Option<f64>,
    pub recreation_facilities_2016: Option<f64>,
    pub recreation_facilities_per_1000_2011: Option<f64>,
    pub recreation_facilities_per_1000_2016: Option<f64>,
    pub recreation_facilities_percent_change: Option<f64>,
    pub recreation_facilities_per_1000_percent_change: Option<f64>,

    /// Target (`Obesity_Percentage_2017`). Absent at serving time.
    pub obesity_percentage_2017: Option<f64>,
}

impl StructuredRecord {
    /// Build a record from source-unit values (percent 0–100).
    ///
    /// Every present value is range-checked and normalized by the same rule
    /// used for prediction requests.
    pub fn from_source(
        fips: Option<String>,
        inputs: [Option<f64>; 9],
        target: Option<f64>,
    ) -> Result<Self, PipelineError> {
        let mut record = StructuredRecord {
            fips,
            ..Default::default()
        };
        for (field, value) in InputField::ALL.into_iter().zip(inputs) {
            let normalized = value
                .map(|v| normalize_source_value(field.name(), field.kind(), v))
                .transpose()?;
            record.set(field, normalized);
        }
        record.obesity_percentage_2017 = target
            .map(|v| normalize_source_value(TARGET_FIELD, TARGET_KIND, v))
            .transpose()?;
        Ok(record)
    }

    pub fn get(&self, field: InputField) -> Option<f64> {
        match field {
            InputField::DiabetesPercentage2008 => self.diabetes_percentage_2008,
            InputField::DiabetesPercentage2013 => self.diabetes_percentage_2013,
            InputField::ObesityPercentage2012 => self.obesity_percentage_2012,
            InputField::RecreationFacilities2011 => self.recreation_facilities_2011,
            InputField::RecreationFacilities2016 => self.recreation_facilities_2016,
            InputField::RecreationFacilitiesPer1000_2011 => self.recreation_facilities_per_1000_2011,
            InputField::RecreationFacilitiesPer1000_2016 => self.recreation_facilities_per_1000_2016,
            InputField::RecreationFacilitiesPercentChange => self.recreation_facilities_percent_change,
            InputField::RecreationFacilitiesPer1000PercentChange => {
                self.recreation_facilities_per_1000_percent_change
            }
        }
    }

    pub fn set(&mut self, field: InputField, value: Option<f64>) {
        let slot = match field {
            InputField::DiabetesPercentage2008 => &mut self.diabetes_percentage_2008,
            InputField::DiabetesPercentage2013 => &mut self.diabetes_percentage_2013,
            InputField::ObesityPercentage2012 => &mut self.obesity_percentage_2012,
            InputField::RecreationFacilities2011 => &mut self.recreation_facilities_2011,
            InputField::RecreationFacilities2016 => &mut self.recreation_facilities_2016,
            InputField::RecreationFacilitiesPer1000_2011 => &mut self.recreation_facilities_per_1000_2011,
            InputField::RecreationFacilitiesPer1000_2016 => &mut self.recreation_facilities_per_1000_2016,
            InputField::RecreationFacilitiesPercentChange => &mut self.recreation_facilities_percent_change,
            InputField::RecreationFacilitiesPer1000PercentChange => {
                &mut self.recreation_facilities_per_1000_percent_change
            }
        };
        *slot = value;
    }

    /// Input values in canonical order (`None` where unobserved).
    pub fn inputs(&self) -> [Option<f64>; 9] {
        InputField::ALL.map(|f| self.get(f))
    }

    /// Raw-stage feature vector in canonical order, target excluded.
    ///
    /// Unobserved values become [`MISSING`] so the preprocessor imputes them.
    pub fn feature_vector(&self) -> FeatureVector {
        let values = InputField::ALL
            .iter()
            .map(|&f| self.get(f).unwrap_or(MISSING))
            .collect();
        FeatureVector::from_parts(Stage::Raw, canonical_field_names(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_source_normalizes_only_percentages() {
        let record = StructuredRecord::from_source(
            Some("01001".into()),
            [
                Some(9.5),
                Some(11.0),
                Some(30.0),
                Some(4.0),
                Some(5.0),
                Some(0.07),
                Some(0.09),
                Some(25.0),
                Some(-10.0),
            ],
            Some(32.0),
        )
        .unwrap();

        assert!((record.diabetes_percentage_2008.unwrap() - 0.095).abs() < 1e-12);
        assert!((record.obesity_percentage_2012.unwrap() - 0.30).abs() < 1e-12);
        assert_eq!(record.recreation_facilities_2011, Some(4.0));
        assert_eq!(record.recreation_facilities_percent_change, Some(25.0));
        assert_eq!(record.recreation_facilities_per_1000_percent_change, Some(-10.0));
        assert!((record.obesity_percentage_2017.unwrap() - 0.32).abs() < 1e-12);
    }

    #[test]
    fn from_source_rejects_implausible_values() {
        let mut inputs = [Some(1.0); 9];
        inputs[3] = Some(-2.0);
        let err = StructuredRecord::from_source(None, inputs, None).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidInput { ref field, .. } if field == "Recreation_Facilities_2011"
        ));
    }

    #[test]
    fn feature_vector_marks_missing_and_excludes_target() {
        let mut record = StructuredRecord::default();
        record.set(InputField::ObesityPercentage2012, Some(0.3));
        record.obesity_percentage_2017 = Some(0.31);

        let v = record.feature_vector();
        assert_eq!(v.stage(), Stage::Raw);
        assert_eq!(v.len(), 9);
        assert!(!v.fields().iter().any(|f| f == TARGET_FIELD));
        assert_eq!(v.get("Obesity_Percentage_2012"), Some(0.3));
        assert!(v.get("Diabetes_Percentage_2008").unwrap().is_nan());
    }
}
