//! # Proximity Index
//!
//! Grid-clustered index over a fixed set of geo-points answering bounded-radius,
//! bounded-count nearest-neighbour queries.
//!
//! Points are bucketed into fixed-size latitude/longitude cells. A query scans the
//! cell containing the centre and then successively wider Chebyshev rings of cells
//! around it, stopping as soon as no unvisited cell can hold a point that is both
//! inside the radius and closer than the current k-th candidate. Distances are
//! great-circle (haversine) distances on a spherical Earth.

use crate::model::{GeoPoint, Location};
use hashbrown::HashMap;
use std::cmp::Ordering;
use thiserror::Error;

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default cell edge in degrees (~11.1 km of latitude).
pub const DEFAULT_CELL_DEGREES: f64 = 0.1;

/// Slack applied to ring lower bounds to absorb floating point error at cell edges.
const BOUND_SLACK_KM: f64 = 1e-9;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("duplicate point id: {0}")]
    DuplicateId(String),
    #[error("invalid coordinate for point {id}: lat {lat}, lon {lon}")]
    InvalidCoordinate { id: String, lat: f64, lon: f64 },
    #[error("point id must not be empty")]
    EmptyId,
    #[error("invalid grid resolution: {0} degrees")]
    InvalidResolution(f64),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum QueryError {
    #[error("k must be at least 1")]
    ZeroResults,
    #[error("radius must be a positive number of kilometres, got {0}")]
    InvalidRadius(f64),
}

/// Validated query bounds for [`ProximityIndex::k_nearest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    k: usize,
    radius_km: f64,
}

impl QueryParams {
    pub fn new(k: usize, radius_km: f64) -> Result<Self, QueryError> {
        if k == 0 {
            return Err(QueryError::ZeroResults);
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(QueryError::InvalidRadius(radius_km));
        }
        Ok(Self { k, radius_km })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }
}

/// A query hit together with its distance from the query centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub point: &'a GeoPoint,
    pub distance_km: f64,
}

/// Cell key: (latitude row, longitude column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey {
    row: i32,
    col: i32,
}

#[derive(Debug, Clone, Copy)]
struct Grid {
    cell_degrees: f64,
    rows: i32,
    cols: i32,
}

impl Grid {
    fn new(cell_degrees: f64) -> Result<Self, IndexError> {
        if !cell_degrees.is_finite() || cell_degrees <= 0.0 || cell_degrees > 90.0 {
            return Err(IndexError::InvalidResolution(cell_degrees));
        }
        // Columns must tile the full circle so ring offsets wrap cleanly.
        let cols = (360.0 / cell_degrees).round();
        if (cols * cell_degrees - 360.0).abs() > 1e-9 {
            return Err(IndexError::InvalidResolution(cell_degrees));
        }
        Ok(Self {
            cell_degrees,
            rows: (180.0 / cell_degrees).round() as i32,
            cols: cols as i32,
        })
    }

    fn cell_of(&self, location: Location) -> CellKey {
        let row = ((location.lat + 90.0) / self.cell_degrees).floor() as i32;
        let col = ((location.lon + 180.0) / self.cell_degrees).floor() as i32;
        CellKey {
            row: row.clamp(0, self.rows - 1),
            col: col.rem_euclid(self.cols),
        }
    }

    fn row_south_edge(&self, row: i32) -> f64 {
        row as f64 * self.cell_degrees - 90.0
    }

    fn col_west_edge(&self, col: i32) -> f64 {
        col as f64 * self.cell_degrees - 180.0
    }

    /// Chebyshev distance between two cells, wrapping across the antimeridian.
    fn ring_of(&self, center: CellKey, cell: CellKey) -> i32 {
        let d_row = (center.row - cell.row).abs();
        let d_col = (center.col - cell.col).abs();
        d_row.max(d_col.min(self.cols - d_col))
    }
}

/// Immutable proximity index. Safe to share between any number of readers.
#[derive(Debug, Clone)]
pub struct ProximityIndex {
    grid: Grid,
    points: Vec<GeoPoint>,
    by_id: HashMap<String, usize>,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl ProximityIndex {
    /// Build an index with the default grid resolution.
    pub fn build(points: impl IntoIterator<Item = GeoPoint>) -> Result<Self, IndexError> {
        Self::build_with_resolution(points, DEFAULT_CELL_DEGREES)
    }

    pub fn build_with_resolution(
        points: impl IntoIterator<Item = GeoPoint>,
        cell_degrees: f64,
    ) -> Result<Self, IndexError> {
        let grid = Grid::new(cell_degrees)?;
        let mut index = Self {
            grid,
            points: Vec::new(),
            by_id: HashMap::new(),
            cells: HashMap::new(),
        };
        for point in points {
            index.insert(point)?;
        }
        Ok(index)
    }

    fn insert(&mut self, point: GeoPoint) -> Result<(), IndexError> {
        if point.id.is_empty() {
            return Err(IndexError::EmptyId);
        }
        if !valid_coordinate(point.lat, point.lon) {
            return Err(IndexError::InvalidCoordinate {
                id: point.id,
                lat: point.lat,
                lon: point.lon,
            });
        }
        if self.by_id.contains_key(&point.id) {
            return Err(IndexError::DuplicateId(point.id));
        }

        let slot = self.points.len();
        let cell = self.grid.cell_of(point.location());
        self.by_id.insert(point.id.clone(), slot);
        self.cells.entry(cell).or_default().push(slot);
        self.points.push(point);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GeoPoint> {
        self.by_id.get(id).map(|&slot| &self.points[slot])
    }

    /// Number of occupied cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Up to `k` points within `radius_km` of `center` accepted by `predicate`,
    /// nearest first, ties broken by ascending id.
    pub fn k_nearest<F>(
        &self,
        center: Location,
        params: &QueryParams,
        predicate: F,
    ) -> Vec<Neighbor<'_>>
    where
        F: Fn(&GeoPoint) -> bool,
    {
        let mut candidates: Vec<(f64, usize)> = Vec::new();
        if self.points.is_empty() {
            return Vec::new();
        }

        let center = Location::new(center.lat, wrap_longitude(center.lon));
        let origin = self.grid.cell_of(center);
        let bounds = RingBounds::new(&self.grid, center, origin, params.radius_km);

        let mut ring = 0;
        loop {
            if ring > 0 {
                let bound = bounds.unvisited_lower_bound(ring);
                if bound > params.radius_km {
                    break;
                }
                if candidates.len() >= params.k {
                    sort_candidates(&mut candidates, &self.points);
                    if candidates[params.k - 1].0 < bound {
                        break;
                    }
                }
            }

            let ring_cells = if ring == 0 { 1 } else { 8 * ring as usize };
            if 2 * ring >= self.grid.cols || ring_cells > self.cells.len() {
                // Ring enumeration would cost more than the occupied cells left.
                for (cell, slots) in &self.cells {
                    if self.grid.ring_of(origin, *cell) >= ring {
                        self.collect(center, params, &predicate, slots, &mut candidates);
                    }
                }
                break;
            }

            for cell in ring_cells_of(&self.grid, origin, ring) {
                if let Some(slots) = self.cells.get(&cell) {
                    self.collect(center, params, &predicate, slots, &mut candidates);
                }
            }
            ring += 1;
        }

        sort_candidates(&mut candidates, &self.points);
        candidates.truncate(params.k);
        candidates
            .into_iter()
            .map(|(distance_km, slot)| Neighbor {
                point: &self.points[slot],
                distance_km,
            })
            .collect()
    }

    fn collect<F>(
        &self,
        center: Location,
        params: &QueryParams,
        predicate: &F,
        slots: &[usize],
        candidates: &mut Vec<(f64, usize)>,
    ) where
        F: Fn(&GeoPoint) -> bool,
    {
        for &slot in slots {
            let point = &self.points[slot];
            let distance = haversine_km(center, point.location());
            if distance <= params.radius_km && predicate(point) {
                candidates.push((distance, slot));
            }
        }
    }
}

fn valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Map any longitude into [-180, 180).
fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

fn sort_candidates(candidates: &mut [(f64, usize)], points: &[GeoPoint]) {
    candidates.sort_by(|a, b| match a.0.total_cmp(&b.0) {
        Ordering::Equal => points[a.1].id.cmp(&points[b.1].id),
        other => other,
    });
}

/// Great-circle distance between two locations in kilometres.
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Cells at exactly Chebyshev distance `ring` from `origin`, skipping rows
/// outside the grid and wrapping columns.
fn ring_cells_of(grid: &Grid, origin: CellKey, ring: i32) -> Vec<CellKey> {
    if ring == 0 {
        return vec![origin];
    }
    let mut cells = Vec::with_capacity(8 * ring as usize);
    for d_row in -ring..=ring {
        let row = origin.row + d_row;
        if row < 0 || row >= grid.rows {
            continue;
        }
        let wrap = |d_col: i32| CellKey {
            row,
            col: (origin.col + d_col).rem_euclid(grid.cols),
        };
        if d_row.abs() == ring {
            cells.extend((-ring..=ring).map(wrap));
        } else {
            cells.push(wrap(-ring));
            cells.push(wrap(ring));
        }
    }
    cells
}

/// Lower bounds on the distance from the query centre to any in-radius point
/// lying in a ring not yet visited.
struct RingBounds {
    center: Location,
    origin: CellKey,
    grid: Grid,
    /// cos(lat) of the centre times the smallest cos(lat) any in-radius point can have.
    lon_scale: f64,
}

impl RingBounds {
    fn new(grid: &Grid, center: Location, origin: CellKey, radius_km: f64) -> Self {
        let band = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let extreme_lat = (center.lat.abs() + band).min(90.0);
        let lon_scale = (center.lat.to_radians().cos() * extreme_lat.to_radians().cos()).max(0.0);
        Self {
            center,
            origin,
            grid: *grid,
            lon_scale,
        }
    }

    /// Bound for every cell with Chebyshev distance >= `ring` from the origin.
    fn unvisited_lower_bound(&self, ring: i32) -> f64 {
        let grid = &self.grid;

        let north_row = self.origin.row + ring;
        let south_row = self.origin.row - ring;
        let north_gap = if north_row < grid.rows {
            grid.row_south_edge(north_row) - self.center.lat
        } else {
            f64::INFINITY
        };
        let south_gap = if south_row >= 0 {
            self.center.lat - grid.row_south_edge(south_row + 1)
        } else {
            f64::INFINITY
        };
        let lat_gap = north_gap.min(south_gap).max(0.0);
        let lat_bound = EARTH_RADIUS_KM * lat_gap.to_radians();

        let east_gap = grid.col_west_edge(self.origin.col + ring) - self.center.lon;
        let west_gap = self.center.lon - grid.col_west_edge(self.origin.col - ring + 1);
        let lon_gap = east_gap.min(west_gap).clamp(0.0, 180.0);
        let h = self.lon_scale * (lon_gap.to_radians() / 2.0).sin().powi(2);
        let lon_bound = 2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin();

        lat_bound.min(lon_bound) - BOUND_SLACK_KM
    }
}
