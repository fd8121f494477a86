//! Dashboard input snapshot
//!
//! Inputs arrive independently and in any order (geolocation, facility list,
//! population grid, district statistics). The snapshot keeps the latest value
//! of each; derived views stay empty until their inputs are all present.

use crate::adapter::{FacilityRecord, PopulationCell};
use crate::config::CoverageConfig;
use crate::demand::{find_demand_zones, DemandZone};
use crate::districts::{project_district_aggregates, DistrictAggregate, DistrictBoundary, DistrictStat};
use crate::geometry::Point;
use crate::ranking::{rank_facilities, RankedFacility};

#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    user_location: Option<Point>,
    facilities: Option<Vec<FacilityRecord>>,
    population: Option<Vec<PopulationCell>>,
    district_stats: Option<Vec<DistrictStat>>,
    district_boundaries: Option<Vec<DistrictBoundary>>,
}

impl DashboardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` records a failed or denied geolocation
    pub fn set_user_location(&mut self, location: Option<Point>) {
        self.user_location = location;
    }

    pub fn set_facilities(&mut self, facilities: Vec<FacilityRecord>) {
        self.facilities = Some(facilities);
    }

    pub fn set_population(&mut self, cells: Vec<PopulationCell>) {
        self.population = Some(cells);
    }

    pub fn set_district_stats(&mut self, stats: Vec<DistrictStat>) {
        self.district_stats = Some(stats);
    }

    pub fn set_district_boundaries(&mut self, boundaries: Vec<DistrictBoundary>) {
        self.district_boundaries = Some(boundaries);
    }

    pub fn facilities(&self) -> &[FacilityRecord] {
        self.facilities.as_deref().unwrap_or_default()
    }

    /// Ranked facilities once location, facilities and population are known
    pub fn top_facilities(&self, config: &CoverageConfig) -> Vec<RankedFacility> {
        match (&self.facilities, &self.population) {
            (Some(facilities), Some(cells)) => {
                rank_facilities(self.user_location, facilities, cells, &config.ranking)
            }
            _ => Vec::new(),
        }
    }

    pub fn district_aggregates(&self, config: &CoverageConfig) -> Vec<DistrictAggregate> {
        self.district_stats
            .as_deref()
            .map(|stats| project_district_aggregates(stats, config.districts.overload_threshold))
            .unwrap_or_default()
    }

    /// Boundaries are optional; without them every zone is in the unknown district
    pub fn demand_zones(&self, config: &CoverageConfig) -> Vec<DemandZone> {
        match (&self.population, &self.facilities) {
            (Some(cells), Some(facilities)) => find_demand_zones(
                cells,
                facilities,
                self.district_boundaries.as_deref().unwrap_or_default(),
                &config.demand,
            ),
            _ => Vec::new(),
        }
    }
}
