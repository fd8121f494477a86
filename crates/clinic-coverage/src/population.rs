//! Population aggregation over grid cells
//!
//! Two interchangeable attribution policies:
//! - radius: a cell counts when its vertex-mean centroid lies within the
//!   catchment radius of the reference point (boundary inclusive)
//! - containment: a cell counts when it contains the reference point
//!
//! Both are best-effort. Cells whose geometry cannot be evaluated are skipped
//! and logged, they never fail the sum. Each query is O(cells).

use crate::adapter::PopulationCell;
use crate::geometry::{distance_km, point_in_polygon, Point};
use crate::DEFAULT_CATCHMENT_RADIUS_KM;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How population is attributed to a reference point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum CatchmentStrategy {
    Radius { radius_km: f64 },
    Containment,
}

impl Default for CatchmentStrategy {
    fn default() -> Self {
        CatchmentStrategy::Radius {
            radius_km: DEFAULT_CATCHMENT_RADIUS_KM,
        }
    }
}

impl CatchmentStrategy {
    /// Population attributed to `reference` under this strategy
    pub fn population_near(&self, cells: &[PopulationCell], reference: Point) -> u64 {
        match *self {
            CatchmentStrategy::Radius { radius_km } => sum_population_within_radius(cells, reference, radius_km),
            CatchmentStrategy::Containment => sum_population_containing(cells, reference),
        }
    }
}

/// Sum of cells whose centroid is within `radius_km` of `reference`
pub fn sum_population_within_radius(cells: &[PopulationCell], reference: Point, radius_km: f64) -> u64 {
    if !reference.is_finite() {
        return 0;
    }

    let mut total = 0u64;
    let mut skipped = 0usize;

    for cell in cells {
        let Some(center) = cell.geometry.centroid() else {
            skipped += 1;
            continue;
        };
        if distance_km(reference, center) <= radius_km {
            total = total.saturating_add(cell.population);
        }
    }

    if skipped > 0 {
        debug!("Radius sum skipped {} cells without a single-ring centroid", skipped);
    }
    total
}

/// Sum of cells whose polygon contains `reference`
pub fn sum_population_containing(cells: &[PopulationCell], reference: Point) -> u64 {
    if !reference.is_finite() {
        return 0;
    }

    let mut total = 0u64;
    let mut skipped = 0usize;

    for cell in cells {
        if !cell.geometry.is_well_formed() {
            skipped += 1;
            continue;
        }
        if point_in_polygon(reference, &cell.geometry) {
            total = total.saturating_add(cell.population);
        }
    }

    if skipped > 0 {
        debug!("Containment sum skipped {} malformed cells", skipped);
    }
    total
}
