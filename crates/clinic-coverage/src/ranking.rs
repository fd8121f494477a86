//! Facility ranking
//!
//! Implements the two-factor proximity/demand model:
//! Score(f) = w_d·D(user, f) + w_p·P(f)
//!
//! D is measured from the user; P is measured around the facility itself,
//! as a proxy for how much demand the clinic already serves.

use crate::adapter::{FacilityRecord, PopulationCell};
use crate::geometry::{distance_km, Point};
use crate::population::CatchmentStrategy;
use crate::{round2, DEFAULT_TOP_N, W_DISTANCE, W_POPULATION};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight per km of distance from the user
    pub w_distance: f64,
    /// Weight per resident in the facility's catchment
    pub w_population: f64,
    /// How nearby population is attributed to a facility
    pub catchment: CatchmentStrategy,
    /// Entries returned
    pub top_n: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            w_distance: W_DISTANCE,
            w_population: W_POPULATION,
            catchment: CatchmentStrategy::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// A facility with its ranking factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFacility {
    pub facility: FacilityRecord,
    /// Great-circle distance from the user (km)
    pub distance_km: f64,
    /// `distance_km` rounded to two decimals
    pub display_distance_km: f64,
    /// Residents attributed to the facility's catchment
    pub nearby_population: u64,
    /// Composite score, lower is better
    pub score: f64,
}

/// Rank facilities for a user, best first.
///
/// Returns an empty list without a user location. Unlocatable facilities are
/// dropped. Equal scores keep input order.
pub fn rank_facilities(
    user_location: Option<Point>,
    facilities: &[FacilityRecord],
    cells: &[PopulationCell],
    config: &RankingConfig,
) -> Vec<RankedFacility> {
    let Some(user) = user_location.filter(Point::is_finite) else {
        return Vec::new();
    };

    let mut ranked: Vec<RankedFacility> = facilities
        .iter()
        .filter_map(|facility| facility.position().map(|pos| (facility, pos)))
        .map(|(facility, pos)| score_facility(facility, pos, user, cells, config))
        .collect();

    ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
    ranked.truncate(config.top_n);
    ranked
}

/// Score a single locatable facility
fn score_facility(
    facility: &FacilityRecord,
    position: Point,
    user: Point,
    cells: &[PopulationCell],
    config: &RankingConfig,
) -> RankedFacility {
    let distance = distance_km(user, position);
    let nearby_population = config.catchment.population_near(cells, position);
    let score = distance * config.w_distance + nearby_population as f64 * config.w_population;

    debug!(
        "Scored {}: {:.3} (dist={:.2}km, pop={})",
        facility.name, score, distance, nearby_population
    );

    RankedFacility {
        facility: facility.clone(),
        distance_km: distance,
        display_distance_km: round2(distance),
        nearby_population,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;
    use geo::{LineString, Polygon};

    fn cell_around(lon: f64, lat: f64, population: u64) -> PopulationCell {
        let d = 0.0005;
        let ring = vec![
            Point::new(lon - d, lat - d),
            Point::new(lon + d, lat - d),
            Point::new(lon + d, lat + d),
            Point::new(lon - d, lat + d),
        ];
        PopulationCell::new(format!("{lon},{lat}"), Geometry::Polygon(Polygon::new(LineString::from(ring), vec![])), population)
    }

    #[test]
    fn test_single_facility_end_to_end() {
        let facilities = vec![FacilityRecord::new("1", "Clinic", 43.24, 76.90)];
        let ranked = rank_facilities(Some(Point::new(76.91, 43.25)), &facilities, &[], &RankingConfig::default());

        assert_eq!(ranked.len(), 1);
        let top = &ranked[0];
        assert_eq!(top.facility.id.0, "1");
        assert_eq!(top.nearby_population, 0);
        assert!((top.distance_km - 1.38).abs() < 0.05, "distance: {}", top.distance_km);
        assert!((top.score - top.distance_km * W_DISTANCE).abs() < 1e-12);
        assert_eq!(top.display_distance_km, round2(top.distance_km));
    }

    #[test]
    fn test_no_user_location() {
        let facilities = vec![FacilityRecord::new("1", "Clinic", 43.24, 76.90)];
        assert!(rank_facilities(None, &facilities, &[], &RankingConfig::default()).is_empty());
        assert!(rank_facilities(Some(Point::new(f64::NAN, 43.0)), &facilities, &[], &RankingConfig::default()).is_empty());
    }

    #[test]
    fn test_empty_facilities() {
        assert!(rank_facilities(Some(Point::new(76.9, 43.2)), &[], &[], &RankingConfig::default()).is_empty());
    }

    #[test]
    fn test_top_n_sorted_and_valid_only() {
        let user = Point::new(76.90, 43.20);
        let mut facilities: Vec<FacilityRecord> = (0..10)
            .map(|i| FacilityRecord::new(format!("f{i}"), format!("Clinic {i}"), 43.20 + 0.01 * (10 - i) as f64, 76.90))
            .collect();
        facilities.push(FacilityRecord::new("bad", "Nowhere", f64::NAN, 76.90));
        facilities.push(FacilityRecord::new("far", "Far", 95.0, 76.90));

        let ranked = rank_facilities(Some(user), &facilities, &[], &RankingConfig::default());

        assert_eq!(ranked.len(), 5);
        assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
        assert!(ranked.iter().all(|r| r.facility.id.0 != "bad" && r.facility.id.0 != "far"));
        assert_eq!(ranked[0].facility.id.0, "f9");
    }

    #[test]
    fn test_population_penalises_busy_clinics() {
        let user = Point::new(76.90, 43.20);
        let busy = FacilityRecord::new("busy", "Busy", 43.201, 76.90);
        let quiet = FacilityRecord::new("quiet", "Quiet", 43.215, 76.90);
        let cells = vec![cell_around(76.90, 43.201, 20000)];

        let ranked = rank_facilities(Some(user), &[busy, quiet], &cells, &RankingConfig::default());

        assert_eq!(ranked[0].facility.id.0, "quiet");
        assert_eq!(ranked[1].nearby_population, 20000);
    }

    #[test]
    fn test_population_measured_at_facility_not_user() {
        // Dense cell around the user, facility 5 km away
        let user = Point::new(76.90, 43.20);
        let facility = FacilityRecord::new("f", "F", 43.245, 76.90);
        let cells = vec![cell_around(76.90, 43.20, 50000)];

        let ranked = rank_facilities(Some(user), &[facility], &cells, &RankingConfig::default());
        assert_eq!(ranked[0].nearby_population, 0);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let user = Point::new(76.90, 43.20);
        let facilities = vec![
            FacilityRecord::new("first", "A", 43.21, 76.90),
            FacilityRecord::new("second", "B", 43.21, 76.90),
            FacilityRecord::new("third", "C", 43.21, 76.90),
        ];

        let ranked = rank_facilities(Some(user), &facilities, &[], &RankingConfig::default());
        let ids: Vec<_> = ranked.iter().map(|r| r.facility.id.0.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_containment_catchment() {
        let user = Point::new(76.90, 43.20);
        let facility = FacilityRecord::new("f", "F", 43.201, 76.90);
        let cells = vec![cell_around(76.90, 43.201, 1200), cell_around(76.902, 43.201, 800)];

        let config = RankingConfig {
            catchment: CatchmentStrategy::Containment,
            ..RankingConfig::default()
        };
        let ranked = rank_facilities(Some(user), &[facility.clone()], &cells, &config);
        assert_eq!(ranked[0].nearby_population, 1200);

        let ranked = rank_facilities(Some(user), &[facility], &cells, &RankingConfig::default());
        assert_eq!(ranked[0].nearby_population, 2000);
    }

    #[test]
    fn test_top_n_zero() {
        let config = RankingConfig { top_n: 0, ..RankingConfig::default() };
        let facilities = vec![FacilityRecord::new("1", "Clinic", 43.24, 76.90)];
        assert!(rank_facilities(Some(Point::new(76.9, 43.2)), &facilities, &[], &config).is_empty());
    }
}
