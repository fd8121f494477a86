//! Report and GeoJSON export

use crate::adapter::FacilityRecord;
use crate::demand::{DemandPriority, DemandZone};
use crate::districts::{DistrictAggregate, DistrictSummary};
use crate::geometry::{Geometry, Point};
use crate::population::CatchmentStrategy;
use crate::ranking::{RankedFacility, RankingConfig};
use geojson::{feature, Feature, FeatureCollection, JsonObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn generated_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Ranking pass result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub ranked: Vec<RankedFacility>,
    pub metadata: RankingMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingMetadata {
    pub user_location: Option<Point>,
    pub total_facilities: usize,
    pub locatable_facilities: usize,
    pub population_cells: usize,
    pub top_n: usize,
    pub w_distance: f64,
    pub w_population: f64,
    pub catchment: CatchmentStrategy,
    pub generated_at: String,
}

impl RankingReport {
    pub fn new(
        ranked: Vec<RankedFacility>,
        user_location: Option<Point>,
        facilities: &[FacilityRecord],
        population_cells: usize,
        config: &RankingConfig,
    ) -> Self {
        let metadata = RankingMetadata {
            user_location,
            total_facilities: facilities.len(),
            locatable_facilities: facilities.iter().filter(|f| f.is_locatable()).count(),
            population_cells,
            top_n: config.top_n,
            w_distance: config.w_distance,
            w_population: config.w_population,
            catchment: config.catchment,
            generated_at: generated_at(),
        };
        Self { ranked, metadata }
    }
}

/// District projection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictReport {
    pub districts: Vec<DistrictAggregate>,
    pub summary: DistrictSummary,
    pub overload_threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district_filter: Option<String>,
    pub generated_at: String,
}

impl DistrictReport {
    pub fn new(districts: Vec<DistrictAggregate>, overload_threshold: f64, district_filter: Option<String>) -> Self {
        Self {
            summary: DistrictSummary::from_rows(&districts),
            districts,
            overload_threshold,
            district_filter,
            generated_at: generated_at(),
        }
    }
}

/// Demand zone detection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandReport {
    pub zones: Vec<DemandZone>,
    pub by_priority: BTreeMap<DemandPriority, usize>,
    pub total_population: u64,
    pub generated_at: String,
}

impl DemandReport {
    pub fn new(zones: Vec<DemandZone>) -> Self {
        let mut by_priority = BTreeMap::new();
        for zone in &zones {
            *by_priority.entry(zone.priority).or_insert(0) += 1;
        }
        let total_population = zones.iter().map(|z| z.population).sum();
        Self {
            zones,
            by_priority,
            total_population,
            generated_at: generated_at(),
        }
    }
}

/// Facility marker layer; unlocatable facilities get no marker
pub fn facilities_to_geojson(facilities: &[FacilityRecord]) -> FeatureCollection {
    let features = facilities
        .iter()
        .filter_map(|f| {
            let position = f.position()?;
            Some(point_feature(&f.id.0, position, properties(f)))
        })
        .collect();
    collection(features)
}

/// Ranked facility layer, with rank (1-based) and scoring factors
pub fn ranked_to_geojson(ranked: &[RankedFacility]) -> FeatureCollection {
    let features = ranked
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let mut props = properties(&r.facility);
            props.insert("rank".to_string(), (i + 1).into());
            props.insert("distance_km".to_string(), r.display_distance_km.into());
            props.insert("nearby_population".to_string(), r.nearby_population.into());
            props.insert("score".to_string(), r.score.into());
            let position = Point::new(r.facility.longitude, r.facility.latitude);
            point_feature(&r.facility.id.0, position, props)
        })
        .collect();
    collection(features)
}

/// Demand zone polygon layer
pub fn demand_zones_to_geojson(zones: &[DemandZone]) -> FeatureCollection {
    let features = zones
        .iter()
        .map(|z| {
            let mut props = JsonObject::new();
            props.insert("population".to_string(), z.population.into());
            props.insert("district".to_string(), z.district.clone().into());
            props.insert("priority".to_string(), serde_json::to_value(z.priority).unwrap_or_default());
            props.insert("distance_km".to_string(), z.distance_km.into());
            Feature {
                bbox: None,
                geometry: Some(to_geojson_geometry(&z.geometry)),
                id: Some(feature::Id::String(z.cell_id.clone())),
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();
    collection(features)
}

pub fn to_geojson_geometry(geometry: &Geometry) -> geojson::Geometry {
    let value = match geometry {
        Geometry::Polygon(polygon) => geojson::Value::from(polygon),
        Geometry::MultiPolygon(polygons) => geojson::Value::from(polygons),
    };
    geojson::Geometry::new(value)
}

fn properties(facility: &FacilityRecord) -> JsonObject {
    match serde_json::to_value(facility) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => JsonObject::new(),
    }
}

fn point_feature(id: &str, position: Point, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Point(vec![position.lon, position.lat]))),
        id: Some(feature::Id::String(id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
