// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Geo-join engine for the AMEND archive.
//!
//! Assigns point observations to polygon geographies (census block groups,
//! municipalities, watersheds), rolls magnitudes up per polygon, and
//! aggregates block-group indicators to coarser geographies by
//! population-weighted mean.

mod aggregate;
mod assign;
mod geojson;
mod geometry;

use std::fmt::{Display, Formatter};

pub use aggregate::{
    rollup_indicators, rollup_magnitudes, weighted_mean, IndicatorRollupRow, MagnitudeRollup,
};
pub use assign::{assign_points, Assignment, AssignmentOutcome, NEAREST_FALLBACK_DEGREES};
pub use geojson::{load_feature_collection, parse_feature_collection, GeoFeature};
pub use geometry::{MultiPolygon, Point, Ring};

pub const CRATE_NAME: &str = "amend-geo";

#[derive(Debug)]
pub struct GeoError(pub String);

impl Display for GeoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GeoError {}
