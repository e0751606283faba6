//! Per-building roof measurements

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roof complexity tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Complexity {
    Simple,
    #[default]
    Moderate,
    Complex,
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Complexity::Simple => write!(f, "simple"),
            Complexity::Moderate => write!(f, "moderate"),
            Complexity::Complex => write!(f, "complex"),
        }
    }
}

/// Area broken down by slope band, in squares
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeBreakdown {
    pub steep_squares: f64,
    pub standard_squares: f64,
    pub flat_squares: f64,
}

/// Physical quantities measured for one building
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    /// Roof area in squares (100 sq ft)
    pub total_squares: f64,

    /// Predominant pitch as "N/12"
    pub predominant_pitch: String,

    pub ridge_length: f64,
    pub hip_length: f64,
    pub valley_length: f64,
    pub eave_length: f64,
    pub rake_length: f64,

    pub penetrations: u32,
    pub skylights: u32,
    pub chimneys: u32,

    pub complexity: Complexity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub slope_breakdown: Option<SlopeBreakdown>,
}

impl Default for Measurements {
    fn default() -> Self {
        Self {
            total_squares: 0.0,
            predominant_pitch: "6/12".to_string(),
            ridge_length: 0.0,
            hip_length: 0.0,
            valley_length: 0.0,
            eave_length: 0.0,
            rake_length: 0.0,
            penetrations: 0,
            skylights: 0,
            chimneys: 0,
            complexity: Complexity::default(),
            slope_breakdown: None,
        }
    }
}

/// Measurement values that violate the non-negative invariant
#[derive(Debug, Error, PartialEq)]
pub enum MeasurementError {
    #[error("{field} must be a non-negative number (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("Invalid pitch '{0}'. Use the form N/12")]
    InvalidPitch(String),
}

impl Measurements {
    /// Measurements for a simple roof of the given area
    pub fn with_squares(total_squares: f64) -> Self {
        Self {
            total_squares,
            ..Self::default()
        }
    }

    /// Check that all lengths and areas are non-negative and the pitch parses
    pub fn validate(&self) -> Result<(), MeasurementError> {
        let mut fields = vec![
            ("total_squares", self.total_squares),
            ("ridge_length", self.ridge_length),
            ("hip_length", self.hip_length),
            ("valley_length", self.valley_length),
            ("eave_length", self.eave_length),
            ("rake_length", self.rake_length),
        ];
        if let Some(slopes) = &self.slope_breakdown {
            fields.push(("steep_squares", slopes.steep_squares));
            fields.push(("standard_squares", slopes.standard_squares));
            fields.push(("flat_squares", slopes.flat_squares));
        }
        for (field, value) in fields {
            if value < 0.0 || !value.is_finite() {
                return Err(MeasurementError::Negative { field, value });
            }
        }
        if self.pitch_rise().is_none() {
            return Err(MeasurementError::InvalidPitch(
                self.predominant_pitch.clone(),
            ));
        }
        Ok(())
    }

    /// Rise per 12 of run parsed from the pitch string
    pub fn pitch_rise(&self) -> Option<f64> {
        let (rise, run) = self.predominant_pitch.trim().split_once('/')?;
        let rise: f64 = rise.trim().parse().ok()?;
        let run: f64 = run.trim().parse().ok()?;
        if run != 12.0 || rise < 0.0 {
            return None;
        }
        Some(rise)
    }

    /// Length in feet of the named edge
    pub fn length(&self, edge: Edge) -> f64 {
        match edge {
            Edge::Ridge => self.ridge_length,
            Edge::Hip => self.hip_length,
            Edge::Valley => self.valley_length,
            Edge::Eave => self.eave_length,
            Edge::Rake => self.rake_length,
        }
    }

    /// Combine several buildings into one job-level record
    ///
    /// Additive fields are summed. Pitch and complexity come from the first
    /// building, so a mixed-pitch job reports only that building's pitch.
    pub fn combine<'a>(all: impl IntoIterator<Item = &'a Measurements>) -> Measurements {
        let mut iter = all.into_iter();
        let Some(first) = iter.next() else {
            return Measurements::default();
        };
        let mut combined = first.clone();
        for m in iter {
            combined.total_squares += m.total_squares;
            combined.ridge_length += m.ridge_length;
            combined.hip_length += m.hip_length;
            combined.valley_length += m.valley_length;
            combined.eave_length += m.eave_length;
            combined.rake_length += m.rake_length;
            combined.penetrations += m.penetrations;
            combined.skylights += m.skylights;
            combined.chimneys += m.chimneys;
            combined.slope_breakdown = match (combined.slope_breakdown, m.slope_breakdown) {
                (None, None) => None,
                (a, b) => {
                    let a = a.unwrap_or_default();
                    let b = b.unwrap_or_default();
                    Some(SlopeBreakdown {
                        steep_squares: a.steep_squares + b.steep_squares,
                        standard_squares: a.standard_squares + b.standard_squares,
                        flat_squares: a.flat_squares + b.flat_squares,
                    })
                }
            };
        }
        combined
    }
}

/// Measured roof edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Ridge,
    Hip,
    Valley,
    Eave,
    Rake,
}
