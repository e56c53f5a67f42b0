//! Canonical field schema.
//!
//! The nine model inputs are declared once here, in the order every fitted
//! artifact sees them. Which fields are percentages is part of the schema
//! (`FieldKind`), not something inferred from a column name.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// How a field is expressed in source data and how it is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Percent of adults, quoted 0–100 at the source, stored as a fraction.
    Percentage,
    /// Facility count.
    Count,
    /// Facilities per 1,000 residents.
    Rate,
    /// Percent change between two years. Not normalized.
    PercentChange,
}

impl FieldKind {
    /// Convert a source-unit value into model units.
    pub fn normalize(self, value: f64) -> f64 {
        match self {
            FieldKind::Percentage => value / 100.0,
            FieldKind::Count | FieldKind::Rate | FieldKind::PercentChange => value,
        }
    }

    /// Inverse of [`FieldKind::normalize`].
    pub fn denormalize(self, value: f64) -> f64 {
        match self {
            FieldKind::Percentage => value * 100.0,
            FieldKind::Count | FieldKind::Rate | FieldKind::PercentChange => value,
        }
    }

    /// Plausible source-unit range `(min, max)` for this kind.
    pub fn source_range(self) -> (f64, f64) {
        match self {
            FieldKind::Percentage => (0.0, 100.0),
            // Far above any county; catches unit slips and garbage input.
            FieldKind::Count => (0.0, 1e6),
            FieldKind::Rate => (0.0, 1e3),
            // A count cannot fall by more than 100%.
            FieldKind::PercentChange => (-100.0, 1e6),
        }
    }
}

/// One of the nine canonical model inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputField {
    DiabetesPercentage2008,
    DiabetesPercentage2013,
    ObesityPercentage2012,
    RecreationFacilities2011,
    RecreationFacilities2016,
    RecreationFacilitiesPer1000_2011,
    RecreationFacilitiesPer1000_2016,
    RecreationFacilitiesPercentChange,
    RecreationFacilitiesPer1000PercentChange,
}

/// Canonical name of the prediction target.
pub const TARGET_FIELD: &str = "Obesity_Percentage_2017";

/// Source column of the target in the raw atlas export.
pub const TARGET_RAW_COLUMN: &str = "PCT_OBESE_ADULTS17";

/// The target is a percentage like the other obesity field.
pub const TARGET_KIND: FieldKind = FieldKind::Percentage;

/// Identifier column carried through structuring but never modeled.
pub const ID_FIELD: &str = "FIPS";

impl InputField {
    /// All inputs, in canonical order.
    pub const ALL: [InputField; 9] = [
        InputField::DiabetesPercentage2008,
        InputField::DiabetesPercentage2013,
        InputField::ObesityPercentage2012,
        InputField::RecreationFacilities2011,
        InputField::RecreationFacilities2016,
        InputField::RecreationFacilitiesPer1000_2011,
        InputField::RecreationFacilitiesPer1000_2016,
        InputField::RecreationFacilitiesPercentChange,
        InputField::RecreationFacilitiesPer1000PercentChange,
    ];

    /// Canonical column name.
    pub fn name(self) -> &'static str {
        match self {
            InputField::DiabetesPercentage2008 => "Diabetes_Percentage_2008",
            InputField::DiabetesPercentage2013 => "Diabetes_Percentage_2013",
            InputField::ObesityPercentage2012 => "Obesity_Percentage_2012",
            InputField::RecreationFacilities2011 => "Recreation_Facilities_2011",
            InputField::RecreationFacilities2016 => "Recreation_Facilities_2016",
            InputField::RecreationFacilitiesPer1000_2011 => "Recreation_Facilities_per_1000_2011",
            InputField::RecreationFacilitiesPer1000_2016 => "Recreation_Facilities_per_1000_2016",
            InputField::RecreationFacilitiesPercentChange => "Recreation_Facilities_Percent_Change_2011_16",
            InputField::RecreationFacilitiesPer1000PercentChange => {
                "Recreation_Facilities_Per_1000_Pop_Percent_Change_2011_16"
            }
        }
    }

    /// Column name in the raw atlas export.
    pub fn raw_column(self) -> &'static str {
        match self {
            InputField::DiabetesPercentage2008 => "PCT_DIABETES_ADULTS08",
            InputField::DiabetesPercentage2013 => "PCT_DIABETES_ADULTS13",
            InputField::ObesityPercentage2012 => "PCT_OBESE_ADULTS12",
            InputField::RecreationFacilities2011 => "RECFAC11",
            InputField::RecreationFacilities2016 => "RECFAC16",
            InputField::RecreationFacilitiesPer1000_2011 => "RECFACPTH11",
            InputField::RecreationFacilitiesPer1000_2016 => "RECFACPTH16",
            InputField::RecreationFacilitiesPercentChange => "PCH_RECFAC_11_16",
            InputField::RecreationFacilitiesPer1000PercentChange => "PCH_RECFACPTH_11_16",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            InputField::DiabetesPercentage2008
            | InputField::DiabetesPercentage2013
            | InputField::ObesityPercentage2012 => FieldKind::Percentage,
            InputField::RecreationFacilities2011 | InputField::RecreationFacilities2016 => FieldKind::Count,
            InputField::RecreationFacilitiesPer1000_2011 | InputField::RecreationFacilitiesPer1000_2016 => {
                FieldKind::Rate
            }
            InputField::RecreationFacilitiesPercentChange
            | InputField::RecreationFacilitiesPer1000PercentChange => FieldKind::PercentChange,
        }
    }

    /// Position in canonical order.
    pub fn index(self) -> usize {
        InputField::ALL
            .iter()
            .position(|&f| f == self)
            .unwrap_or_default()
    }

    pub fn from_name(name: &str) -> Option<InputField> {
        InputField::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// Canonical input names as owned strings (the form fitted artifacts store).
pub fn canonical_field_names() -> Vec<String> {
    InputField::ALL.iter().map(|f| f.name().to_string()).collect()
}

/// Validate a source-unit value and convert it to model units.
///
/// Rejects non-finite values and values outside [`FieldKind::source_range`].
pub fn normalize_source_value(field: &str, kind: FieldKind, value: f64) -> Result<f64, PipelineError> {
    if !value.is_finite() {
        return Err(PipelineError::InvalidInput {
            field: field.to_string(),
            reason: format!("non-finite value {value}"),
        });
    }
    let (lo, hi) = kind.source_range();
    if value < lo || value > hi {
        return Err(PipelineError::InvalidInput {
            field: field.to_string(),
            reason: format!("{value} outside plausible range [{lo}, {hi}]"),
        });
    }
    Ok(kind.normalize(value))
}
