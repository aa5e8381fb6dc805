// SPDX-License-Identifier: Apache-2.0

/// A longitude/latitude pair in degrees, GeoJSON axis order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    #[must_use]
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Planar degree distance. Adequate at municipal scale for the
    /// nearest-polygon fallback; not a geodesic.
    #[must_use]
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.lon - other.lon;
        let dy = self.lat - other.lat;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A closed linear ring of vertices. The closing vertex may be present or
/// absent; containment treats the ring as implicitly closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring(pub Vec<Point>);

impl Ring {
    /// Even-odd ray-casting containment. Points exactly on an edge count
    /// as inside so boundary outfalls are never dropped.
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        let v = &self.0;
        if v.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (a, b) = (&v[i], &v[j]);
            if on_segment(p, a, b) {
                return true;
            }
            if (a.lat > p.lat) != (b.lat > p.lat) {
                let x_cross = (b.lon - a.lon) * (p.lat - a.lat) / (b.lat - a.lat) + a.lon;
                if p.lon < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

fn on_segment(p: &Point, a: &Point, b: &Point) -> bool {
    const EPS: f64 = 1e-12;
    let cross = (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon);
    if cross.abs() > EPS {
        return false;
    }
    let dot = (p.lon - a.lon) * (b.lon - a.lon) + (p.lat - a.lat) * (b.lat - a.lat);
    let len_sq = (b.lon - a.lon).powi(2) + (b.lat - a.lat).powi(2);
    dot >= -EPS && dot <= len_sq + EPS
}

/// One or more polygons, each an exterior ring plus zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    /// (exterior, holes) per polygon.
    pub polygons: Vec<(Ring, Vec<Ring>)>,
}

impl MultiPolygon {
    #[must_use]
    pub fn contains(&self, p: &Point) -> bool {
        self.polygons.iter().any(|(exterior, holes)| {
            exterior.contains(p) && !holes.iter().any(|h| h.contains(p))
        })
    }

    /// Minimum planar distance from `p` to any vertex. Used only for the
    /// nearest-polygon fallback, where vertex precision is sufficient.
    #[must_use]
    pub fn min_vertex_distance(&self, p: &Point) -> f64 {
        self.polygons
            .iter()
            .flat_map(|(exterior, holes)| {
                exterior.0.iter().chain(holes.iter().flat_map(|h| h.0.iter()))
            })
            .map(|v| p.distance(v))
            .fold(f64::INFINITY, f64::min)
    }

    /// Arithmetic mean of exterior vertices. Matches the source archive's
    /// use of polygon centroids for block-group-to-parent assignment.
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        let mut lon_sum = 0.0;
        let mut lat_sum = 0.0;
        let mut n = 0usize;
        for (exterior, _) in &self.polygons {
            for v in &exterior.0 {
                lon_sum += v.lon;
                lat_sum += v.lat;
                n += 1;
            }
        }
        if n == 0 {
            return None;
        }
        Some(Point::new(lon_sum / n as f64, lat_sum / n as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Ring {
        Ring(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    #[test]
    fn interior_point_is_inside() {
        assert!(unit_square().contains(&Point::new(0.5, 0.5)));
    }

    #[test]
    fn exterior_point_is_outside() {
        assert!(!unit_square().contains(&Point::new(1.5, 0.5)));
        assert!(!unit_square().contains(&Point::new(-0.1, 0.5)));
    }

    #[test]
    fn boundary_point_counts_as_inside() {
        assert!(unit_square().contains(&Point::new(0.0, 0.5)));
        assert!(unit_square().contains(&Point::new(0.5, 1.0)));
        assert!(unit_square().contains(&Point::new(1.0, 1.0)));
    }

    #[test]
    fn hole_excludes_contained_point() {
        let hole = Ring(vec![
            Point::new(0.25, 0.25),
            Point::new(0.75, 0.25),
            Point::new(0.75, 0.75),
            Point::new(0.25, 0.75),
        ]);
        let mp = MultiPolygon {
            polygons: vec![(unit_square(), vec![hole])],
        };
        assert!(!mp.contains(&Point::new(0.5, 0.5)));
        assert!(mp.contains(&Point::new(0.1, 0.1)));
    }

    #[test]
    fn centroid_of_unit_square_vertices() {
        let mp = MultiPolygon {
            polygons: vec![(unit_square(), vec![])],
        };
        let c = mp.centroid().expect("centroid");
        assert!((c.lon - 0.5).abs() < 1e-12);
        assert!((c.lat - 0.5).abs() < 1e-12);
    }

    #[test]
    fn concave_polygon_containment() {
        // L-shape: notch cut out of the upper right.
        let l_shape = Ring(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert!(l_shape.contains(&Point::new(0.5, 1.5)));
        assert!(!l_shape.contains(&Point::new(1.5, 1.5)));
    }
}
