//! Clinic Coverage
//!
//! Ranks healthcare facilities by proximity and surrounding demand, sums
//! gridded population near or inside arbitrary polygons, and projects
//! per-district population/clinic statistics into a status-tagged view.
//!
//! # Ranking Model
//!
//! ```text
//! Score(f) = w_d·D(user, f) + w_p·P(f)
//! ```
//!
//! | Factor | Weight | Description |
//! |--------|--------|-------------|
//! | D      | 0.7    | Great-circle distance from the user (km) |
//! | P      | 0.0003 | Residents within the facility's catchment |
//!
//! Lower is better: a clinic that is close and not already serving a dense
//! population ranks first.
//!
//! # Data Flow
//!
//! ```text
//! backend JSON → adapter → { ranking, districts, demand } → export
//! ```
//!
//! Every computation is a pure function over an immutable snapshot of its
//! inputs. Missing inputs yield empty results, never errors.

use thiserror::Error;

pub mod adapter;
pub mod config;
pub mod demand;
pub mod districts;
pub mod export;
pub mod geometry;
pub mod loader;
pub mod population;
pub mod ranking;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod wkt;

pub use adapter::{FacilityId, FacilityRecord, PopulationCell, RecordError};
pub use config::CoverageConfig;
pub use districts::{project_district_aggregates, DistrictAggregate, DistrictStatus};
pub use geometry::{distance_km, point_in_polygon, Geometry, Point};
pub use population::{sum_population_containing, sum_population_within_radius, CatchmentStrategy};
pub use ranking::{rank_facilities, RankedFacility, RankingConfig};

/// Mean Earth radius used by the haversine formula (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default catchment radius: the immediate walking catchment of a clinic (km)
pub const DEFAULT_CATCHMENT_RADIUS_KM: f64 = 0.7;

/// Distance weight of the ranking score
pub const W_DISTANCE: f64 = 0.7;

/// Nearby-population weight of the ranking score
pub const W_POPULATION: f64 = 0.0003;

/// Number of facilities returned by a ranking pass
pub const DEFAULT_TOP_N: usize = 5;

/// Residents per clinic above which a district is overloaded
pub const DEFAULT_OVERLOAD_THRESHOLD: f64 = 15000.0;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unexpected payload shape in {0}: expected {1}")]
    UnexpectedShape(String, &'static str),
}

pub type Result<T> = std::result::Result<T, CoverageError>;

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
