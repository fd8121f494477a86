//! High-demand zone detection
//!
//! Finds populous grid cells that sit far from every facility. Each zone is
//! tagged with a priority band by its distance to the nearest clinic and with
//! the district whose boundary contains the cell centroid.

use crate::adapter::{FacilityRecord, PopulationCell};
use crate::districts::{normalize_district_name, DistrictBoundary};
use crate::geometry::{distance_km, point_in_polygon, Geometry, Point};
use crate::round2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

/// District label for centroids outside every boundary
pub const UNKNOWN_DISTRICT: &str = "Unknown district";

/// Demand zone thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    /// Cells below this population are ignored
    pub min_population: u64,
    /// Cells with a clinic closer than this (km) are served
    pub min_gap_km: f64,
    /// Nearest clinic at least this far (km) is a moderate gap
    pub moderate_km: f64,
    /// Nearest clinic at least this far (km) is a critical gap
    pub critical_km: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            min_population: 1500,
            min_gap_km: 0.5,
            moderate_km: 1.0,
            critical_km: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandPriority {
    Low,
    Moderate,
    Critical,
}

impl DemandPriority {
    pub fn from_distance(nearest_km: f64, config: &DemandConfig) -> Self {
        if nearest_km >= config.critical_km {
            DemandPriority::Critical
        } else if nearest_km >= config.moderate_km {
            DemandPriority::Moderate
        } else {
            DemandPriority::Low
        }
    }
}

/// Populous cell underserved by clinics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandZone {
    pub cell_id: String,
    pub center: Point,
    pub population: u64,
    pub district: String,
    pub priority: DemandPriority,
    /// Distance to the nearest facility, rounded to two decimals
    pub distance_km: f64,
    pub geometry: Geometry,
}

/// Detect demand zones, most urgent first (priority, then population).
///
/// Empty when there are no locatable facilities to measure against.
pub fn find_demand_zones(
    cells: &[PopulationCell],
    facilities: &[FacilityRecord],
    districts: &[DistrictBoundary],
    config: &DemandConfig,
) -> Vec<DemandZone> {
    let positions: Vec<Point> = facilities.iter().filter_map(FacilityRecord::position).collect();
    if positions.is_empty() {
        debug!("No locatable facilities, skipping demand zones");
        return Vec::new();
    }

    let mut zones = Vec::new();
    let mut skipped = 0usize;

    for cell in cells.iter().filter(|c| c.population >= config.min_population) {
        let Some(center) = cell.geometry.centroid() else {
            skipped += 1;
            continue;
        };

        let nearest = positions
            .iter()
            .map(|p| distance_km(center, *p))
            .fold(f64::INFINITY, f64::min);
        if nearest < config.min_gap_km {
            continue;
        }

        zones.push(DemandZone {
            cell_id: cell.id.clone(),
            center,
            population: cell.population,
            district: district_at(center, districts),
            priority: DemandPriority::from_distance(nearest, config),
            distance_km: round2(nearest),
            geometry: cell.geometry.clone(),
        });
    }

    zones.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.population.cmp(&a.population))
            .then_with(|| b.distance_km.partial_cmp(&a.distance_km).unwrap_or(Ordering::Equal))
    });

    info!(
        "Found {} demand zones ({} cells without a single-ring centroid)",
        zones.len(),
        skipped
    );

    zones
}

/// Name of the first boundary containing `point`
pub fn district_at(point: Point, districts: &[DistrictBoundary]) -> String {
    districts
        .iter()
        .find(|d| point_in_polygon(point, &d.geometry))
        .map(|d| d.name.clone())
        .unwrap_or_else(|| UNKNOWN_DISTRICT.to_string())
}

/// Zones whose district label contains the normalized query; a blank query keeps all
pub fn zones_in_district(zones: Vec<DemandZone>, district: &str) -> Vec<DemandZone> {
    let needle = normalize_district_name(district);
    if needle.is_empty() {
        return zones;
    }
    zones
        .into_iter()
        .filter(|z| z.district.to_lowercase().contains(&needle))
        .collect()
}
