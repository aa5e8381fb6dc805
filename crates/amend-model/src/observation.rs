// SPDX-License-Identifier: Apache-2.0

use crate::geography::ValidationError;
use serde::{Deserialize, Serialize};

/// A CSO outfall record from the NECIR 2011 survey: one discharge point
/// with its reported annual discharge volume and event count.
///
/// `latitude`/`longitude` are `None` when the source row had no usable
/// coordinates; such rows are excluded from spatial aggregation and
/// surfaced as a count, never dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsoOutfall {
    pub outfall_id: String,
    pub municipality_raw: String,
    pub receiving_water: String,
    pub nearest_pipe_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Reported annual discharge volume, millions of gallons.
    pub discharge_mgal: Option<f64>,
    /// Reported number of discharge events in the year.
    pub discharge_count: Option<f64>,
    pub year: u16,
}

impl CsoOutfall {
    #[must_use]
    pub fn location(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }
}

/// Confidence of the heuristic penalty-amount extraction.
///
/// The extraction keeps the source system's documented approximation: the
/// first dollar amount in the prose. Prose listing several amounts (partial
/// suspensions, multi-year schedules) is marked `Ambiguous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyConfidence {
    Single,
    Ambiguous,
    None,
}

/// One enforcement action scraped from a DEP news archive page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnforcementAction {
    pub year: u16,
    /// Date string as published (`M/D/YY` or `M/D/YYYY`).
    pub date: String,
    pub text: String,
    /// Penalty dollars extracted from the prose, if any.
    pub penalty_dollars: Option<f64>,
    pub penalty_confidence: PenaltyConfidence,
    /// Order-type keywords found in the prose (lowercased).
    pub order_types: Vec<String>,
    /// Canonical municipality names resolved from the prose.
    pub municipalities: Vec<String>,
}

/// One CSO incident row from the EEA data portal API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalIncident {
    #[serde(rename = "incidentId")]
    pub incident_id: i64,
    #[serde(rename = "municipality", default)]
    pub municipality: String,
    #[serde(rename = "waterBody", default)]
    pub water_body: String,
    #[serde(rename = "incidentDate", default)]
    pub incident_date: String,
    #[serde(rename = "volumeOfEvent", default)]
    pub volume_gallons: Option<f64>,
    #[serde(rename = "reporterClass", default)]
    pub reporter_class: String,
}

impl PortalIncident {
    /// Calendar year of the incident, taken from the leading `YYYY-` of the
    /// portal's ISO date string.
    #[must_use]
    pub fn year(&self) -> Option<u16> {
        self.incident_date.get(..4).and_then(|y| y.parse().ok())
    }
}

/// Canonical municipality row from the census ACS subdivision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TownPopulation {
    pub name: String,
    pub population: u64,
    pub per_capita_income: Option<f64>,
}

impl TownPopulation {
    pub fn new(name: &str, population: u64) -> Result<Self, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError("municipality name must not be empty".to_string()));
        }
        Ok(Self {
            name: trimmed.to_string(),
            population,
            per_capita_income: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outfall_location_requires_both_coordinates() {
        let mut o = CsoOutfall {
            outfall_id: "DER-001".to_string(),
            municipality_raw: "Boston".to_string(),
            receiving_water: "Boston Harbor".to_string(),
            nearest_pipe_address: String::new(),
            latitude: Some(42.3),
            longitude: None,
            discharge_mgal: Some(1.5),
            discharge_count: Some(4.0),
            year: 2011,
        };
        assert_eq!(o.location(), None);
        o.longitude = Some(-71.05);
        assert_eq!(o.location(), Some((-71.05, 42.3)));
    }

    #[test]
    fn portal_incident_year_comes_from_iso_date() {
        let row = PortalIncident {
            incident_id: 7,
            municipality: "Lowell".to_string(),
            water_body: "Merrimack River".to_string(),
            incident_date: "2022-07-04T00:00:00".to_string(),
            volume_gallons: Some(120000.0),
            reporter_class: "Verified Data Report".to_string(),
        };
        assert_eq!(row.year(), Some(2022));
    }
}
