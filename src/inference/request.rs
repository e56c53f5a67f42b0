//! Prediction request boundary.
//!
//! A request carries the nine inputs in source units (percent 0–100), exactly
//! as a form or JSON client supplies them. Every field is required; nothing
//! is coerced. Conversion goes through [`StructuredRecord::from_source`], the
//! same normalization the training table went through.

use serde::{Deserialize, Serialize};

use crate::domain::{InputField, StructuredRecord, normalize_source_value};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    #[serde(rename = "Diabetes_Percentage_2008")]
    pub diabetes_percentage_2008: f64,
    #[serde(rename = "Diabetes_Percentage_2013")]
    pub diabetes_percentage_2013: f64,
    #[serde(rename = "Obesity_Percentage_2012")]
    pub obesity_percentage_2012: f64,
    #[serde(rename = "Recreation_Facilities_2011")]
    pub recreation_facilities_2011: f64,
    #[serde(rename = "Recreation_Facilities_2016")]
    pub recreation_facilities_2016: f64,
    #[serde(rename = "Recreation_Facilities_per_1000_2011")]
    pub recreation_facilities_per_1000_2011: f64,
    #[serde(rename = "Recreation_Facilities_per_1000_2016")]
    pub recreation_facilities_per_1000_2016: f64,
    #[serde(rename = "Recreation_Facilities_Percent_Change_2011_16")]
    pub recreation_facilities_percent_change: f64,
    #[serde(rename = "Recreation_Facilities_Per_1000_Pop_Percent_Change_2011_16")]
    pub recreation_facilities_per_1000_percent_change: f64,
}

impl PredictionRequest {
    /// Build a request from values in canonical order.
    pub fn from_values(values: [f64; 9]) -> Self {
        let [a, b, c, d, e, f, g, h, i] = values;
        Self {
            diabetes_percentage_2008: a,
            diabetes_percentage_2013: b,
            obesity_percentage_2012: c,
            recreation_facilities_2011: d,
            recreation_facilities_2016: e,
            recreation_facilities_per_1000_2011: f,
            recreation_facilities_per_1000_2016: g,
            recreation_facilities_percent_change: h,
            recreation_facilities_per_1000_percent_change: i,
        }
    }

    /// Parse a JSON object keyed by canonical field names.
    ///
    /// A missing or unknown key is reported as `InvalidInput`.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::InvalidInput {
            field: "request".to_string(),
            reason: e.to_string(),
        })
    }

    /// Values in canonical order.
    pub fn values(&self) -> [f64; 9] {
        [
            self.diabetes_percentage_2008,
            self.diabetes_percentage_2013,
            self.obesity_percentage_2012,
            self.recreation_facilities_2011,
            self.recreation_facilities_2016,
            self.recreation_facilities_per_1000_2011,
            self.recreation_facilities_per_1000_2016,
            self.recreation_facilities_percent_change,
            self.recreation_facilities_per_1000_percent_change,
        ]
    }

    /// Reject non-finite or implausible values, naming the offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (field, value) in InputField::ALL.into_iter().zip(self.values()) {
            normalize_source_value(field.name(), field.kind(), value)?;
        }
        Ok(())
    }

    /// Validate and normalize into a serving-time record (no target).
    pub fn to_record(&self) -> Result<StructuredRecord, PipelineError> {
        StructuredRecord::from_source(None, self.values().map(Some), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "Diabetes_Percentage_2008": 9.5,
        "Diabetes_Percentage_2013": 11.0,
        "Obesity_Percentage_2012": 30.0,
        "Recreation_Facilities_2011": 4,
        "Recreation_Facilities_2016": 5,
        "Recreation_Facilities_per_1000_2011": 0.07,
        "Recreation_Facilities_per_1000_2016": 0.09,
        "Recreation_Facilities_Percent_Change_2011_16": 25.0,
        "Recreation_Facilities_Per_1000_Pop_Percent_Change_2011_16": -10.0
    }"#;

    #[test]
    fn json_request_normalizes_like_training_data() {
        let request = PredictionRequest::from_json(VALID).unwrap();
        request.validate().unwrap();
        let record = request.to_record().unwrap();
        assert!((record.obesity_percentage_2012.unwrap() - 0.30).abs() < 1e-12);
        assert_eq!(record.recreation_facilities_2011, Some(4.0));
        assert_eq!(record.obesity_percentage_2017, None);
    }

    #[test]
    fn missing_and_unknown_fields_are_rejected() {
        let missing = VALID.replace("\"Diabetes_Percentage_2008\": 9.5,", "");
        let err = PredictionRequest::from_json(&missing).unwrap_err();
        assert!(err.to_string().contains("Diabetes_Percentage_2008"));

        let extra = VALID.replace("{", "{\"FIPS\": 1001,");
        assert!(PredictionRequest::from_json(&extra).is_err());
    }

    #[test]
    fn out_of_range_percentage_is_rejected_not_coerced() {
        let mut values = PredictionRequest::from_json(VALID).unwrap().values();
        values[1] = 140.0;
        let request = PredictionRequest::from_values(values);
        let err = request.validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidInput { ref field, .. } if field == "Diabetes_Percentage_2013"
        ));
        assert!(request.to_record().is_err());
    }

    #[test]
    fn absurd_facility_counts_are_rejected() {
        let mut values = PredictionRequest::from_json(VALID).unwrap().values();
        values[3] = 1e300;
        let err = PredictionRequest::from_values(values).validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidInput { ref field, .. } if field == "Recreation_Facilities_2011"
        ));
    }
}
