//! Spatial summary of an export
//!
//! Computes the centroid and area of the convex hull around the distinct
//! sampling locations. Hull construction happens in a Lambert azimuthal
//! equal-area projection centred on the mean location, so planar polygon
//! area is true area on the sphere up to the straight-edge approximation.

use crate::constants::EARTH_RADIUS_KM;
use crate::models::SpatialSummary;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

/// Relative tolerance below which a hull is treated as degenerate
const AREA_EPSILON: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("the {points} distinct locations are collinear, no hull area can be computed")]
    Collinear { points: usize },

    #[error("locations span {span:.1} degrees of longitude and cross the antimeridian")]
    AntimeridianCrossing { span: f64 },
}

/// Hull-based summary over two or more distinct (lat, lon) points
pub trait GeometryEngine: Send + Sync {
    fn summarize(&self, points: &[(f64, f64)]) -> Result<SpatialSummary, GeometryError>;
}

/// Convex hull in a Lambert azimuthal equal-area projection
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualAreaHullEngine;

impl GeometryEngine for EqualAreaHullEngine {
    fn summarize(&self, points: &[(f64, f64)]) -> Result<SpatialSummary, GeometryError> {
        let (min_lon, max_lon) = points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, lon)| {
                (lo.min(lon), hi.max(lon))
            });
        let span = max_lon - min_lon;
        if span > 180.0 {
            return Err(GeometryError::AntimeridianCrossing { span });
        }

        let n = points.len() as f64;
        let center_lat = points.iter().map(|p| p.0).sum::<f64>() / n;
        let center_lon = points.iter().map(|p| p.1).sum::<f64>() / n;
        let projection = Laea::new(center_lat, center_lon);

        let projected: Vec<(f64, f64)> = points
            .iter()
            .map(|&(lat, lon)| projection.forward(lat, lon))
            .collect();

        let hull = convex_hull(projected);
        let area = polygon_area(&hull);
        let scale = hull
            .iter()
            .map(|(x, y)| x * x + y * y)
            .fold(0.0, f64::max)
            .max(f64::MIN_POSITIVE);
        if hull.len() < 3 || area <= AREA_EPSILON * scale {
            return Err(GeometryError::Collinear {
                points: points.len(),
            });
        }

        let (cx, cy) = polygon_centroid(&hull, area);
        let (central_latitude, central_longitude) = projection.inverse(cx, cy);

        debug!(
            "Convex hull with {} vertices over {} points, area {:.3} km²",
            hull.len(),
            points.len(),
            area
        );

        Ok(SpatialSummary {
            central_latitude,
            central_longitude,
            area_sq_km: area,
        })
    }
}

/// Summarizes distinct export locations through a [`GeometryEngine`]
pub struct SpatialSummarizer {
    engine: Box<dyn GeometryEngine>,
}

impl Default for SpatialSummarizer {
    fn default() -> Self {
        Self::new(Box::new(EqualAreaHullEngine))
    }
}

impl std::fmt::Debug for SpatialSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialSummarizer").finish_non_exhaustive()
    }
}

impl SpatialSummarizer {
    pub fn new(engine: Box<dyn GeometryEngine>) -> Self {
        Self { engine }
    }

    /// Centroid and area for a set of (lat, lon) points
    ///
    /// Returns `Ok(None)` for an empty set. A single location yields that
    /// point with zero area.
    pub fn summarize(
        &self,
        points: &[(f64, f64)],
    ) -> Result<Option<SpatialSummary>, GeometryError> {
        let distinct = distinct_points(points);

        match distinct.len() {
            0 => Ok(None),
            1 => Ok(Some(SpatialSummary {
                central_latitude: distinct[0].0,
                central_longitude: distinct[0].1,
                area_sq_km: 0.0,
            })),
            _ => self.engine.summarize(&distinct).map(Some).inspect_err(|e| {
                warn!("Spatial summary unavailable: {}", e);
            }),
        }
    }
}

fn distinct_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut seen = HashSet::new();
    points
        .iter()
        .copied()
        .filter(|(lat, lon)| seen.insert((lat.to_bits(), lon.to_bits())))
        .collect()
}

/// Spherical Lambert azimuthal equal-area projection, output in kilometres
#[derive(Debug, Clone, Copy)]
struct Laea {
    lat0: f64,
    lon0: f64,
    sin_lat0: f64,
    cos_lat0: f64,
}

impl Laea {
    fn new(center_lat: f64, center_lon: f64) -> Self {
        let lat0 = center_lat.to_radians();
        Self {
            lat0,
            lon0: center_lon.to_radians(),
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
        }
    }

    fn forward(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (lat, dlon) = (lat.to_radians(), lon.to_radians() - self.lon0);
        let (sin_lat, cos_lat) = lat.sin_cos();
        let denom = 1.0 + self.sin_lat0 * sin_lat + self.cos_lat0 * cos_lat * dlon.cos();
        let k = (2.0 / denom).sqrt();

        (
            EARTH_RADIUS_KM * k * cos_lat * dlon.sin(),
            EARTH_RADIUS_KM * k * (self.cos_lat0 * sin_lat - self.sin_lat0 * cos_lat * dlon.cos()),
        )
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = x.hypot(y);
        if rho == 0.0 {
            return (self.lat0.to_degrees(), self.lon0.to_degrees());
        }

        let c = 2.0 * (rho / (2.0 * EARTH_RADIUS_KM)).clamp(-1.0, 1.0).asin();
        let (sin_c, cos_c) = c.sin_cos();
        let lat = (cos_c * self.sin_lat0 + y * sin_c * self.cos_lat0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let lon = self.lon0
            + (x * sin_c).atan2(rho * self.cos_lat0 * cos_c - y * self.sin_lat0 * sin_c);

        (lat.to_degrees(), lon.to_degrees())
    }
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Andrew's monotone chain; counter-clockwise, no repeated closing vertex
fn convex_hull(mut points: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Shoelace area of a counter-clockwise polygon
fn polygon_area(vertices: &[(f64, f64)]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let twice: f64 = vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .map(|(a, b)| a.0 * b.1 - b.0 * a.1)
        .sum();
    (twice / 2.0).abs()
}

fn polygon_centroid(vertices: &[(f64, f64)], area: f64) -> (f64, f64) {
    let (sx, sy) = vertices
        .iter()
        .zip(vertices.iter().cycle().skip(1))
        .fold((0.0, 0.0), |(sx, sy), (a, b)| {
            let f = a.0 * b.1 - b.0 * a.1;
            (sx + (a.0 + b.0) * f, sy + (a.1 + b.1) * f)
        });
    (sx / (6.0 * area), sy / (6.0 * area))
}
