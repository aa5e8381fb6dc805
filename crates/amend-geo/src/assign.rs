// SPDX-License-Identifier: Apache-2.0

use crate::geojson::GeoFeature;
use crate::geometry::Point;
use amend_model::{AssignmentReport, GeoUnitId};

/// Planar-degree threshold for the nearest-polygon fallback. A point
/// farther than this from every polygon stays unmatched. Roughly 5 km at
/// Massachusetts latitudes; outfall coordinates are occasionally digitized
/// just offshore of their true municipality.
pub const NEAREST_FALLBACK_DEGREES: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssignmentOutcome {
    Contained,
    NearestFallback,
    Unmatched,
}

/// Assignment of one point to a geographic unit, if any.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub unit_id: Option<GeoUnitId>,
    pub outcome: AssignmentOutcome,
}

/// Assign each point to the polygon containing it.
///
/// `features` must be sorted by unit id (as `load_feature_collection`
/// returns them): a point inside more than one polygon resolves to the
/// first match in that order, and the collision is tallied. A point inside
/// no polygon falls back to the nearest feature by vertex distance when
/// within [`NEAREST_FALLBACK_DEGREES`], otherwise it is unmatched.
pub fn assign_points(
    points: &[Option<Point>],
    features: &[GeoFeature],
    report: &mut AssignmentReport,
) -> Vec<Assignment> {
    let mut out = Vec::with_capacity(points.len());
    for point in points {
        let Some(p) = point else {
            report.missing_coordinates += 1;
            out.push(Assignment {
                unit_id: None,
                outcome: AssignmentOutcome::Unmatched,
            });
            continue;
        };
        out.push(assign_one(p, features, report));
    }
    out
}

fn assign_one(
    p: &Point,
    features: &[GeoFeature],
    report: &mut AssignmentReport,
) -> Assignment {
    let mut containing = features.iter().filter(|f| f.geometry.contains(p));
    if let Some(first) = containing.next() {
        if containing.next().is_some() {
            report.multiple_containment += 1;
        }
        report.assigned += 1;
        return Assignment {
            unit_id: Some(first.unit_id.clone()),
            outcome: AssignmentOutcome::Contained,
        };
    }

    let nearest = features
        .iter()
        .map(|f| (f, f.geometry.min_vertex_distance(p)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((feature, distance)) = nearest {
        if distance <= NEAREST_FALLBACK_DEGREES {
            report.assigned += 1;
            report.nearest_fallback += 1;
            return Assignment {
                unit_id: Some(feature.unit_id.clone()),
                outcome: AssignmentOutcome::NearestFallback,
            };
        }
    }

    report.unmatched += 1;
    Assignment {
        unit_id: None,
        outcome: AssignmentOutcome::Unmatched,
    }
}
