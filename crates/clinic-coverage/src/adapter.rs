//! Backend payload adapter
//!
//! Converts loosely typed backend rows into canonical records. Every raw field
//! is optional and coordinates may arrive as numbers or numeric strings; a row
//! that cannot be trusted is rejected with a [`RecordError`] instead of
//! carrying `NaN` into the scoring math.

use crate::districts::{DistrictBoundary, DistrictStat};
use crate::geometry::{Geometry, Point};
use crate::wkt::{self, WktError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};

/// Category label used when the backend has none
pub const UNSPECIFIED_CATEGORY: &str = "Unspecified";

/// 2GIS link used when the backend has none
pub const MISSING_LINK: &str = "#";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("row does not match the expected shape: {0}")]
    InvalidRow(String),
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not numeric: {value:?}")]
    NonNumeric { field: &'static str, value: String },
    #[error("field `{0}` is not finite")]
    NonFinite(&'static str),
    #[error("field `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("malformed geometry: {0}")]
    MalformedGeometry(#[from] WktError),
    #[error("geometry has degenerate or non-finite rings")]
    DegenerateGeometry,
    #[error("negative population: {0}")]
    NegativePopulation(f64),
}

/// JSON scalar that may be a number or a string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawScalar {
    Number(serde_json::Number),
    Text(String),
}

impl RawScalar {
    fn to_f64(&self, field: &'static str) -> Result<f64, RecordError> {
        let value = match self {
            RawScalar::Number(n) => n.as_f64().ok_or(RecordError::NonFinite(field))?,
            RawScalar::Text(s) => s.trim().parse::<f64>().map_err(|_| RecordError::NonNumeric {
                field,
                value: s.clone(),
            })?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(RecordError::NonFinite(field))
        }
    }

    fn into_label(self) -> String {
        match self {
            RawScalar::Number(n) => n.to_string(),
            RawScalar::Text(s) => s,
        }
    }
}

/// Geometry as EWKT text or an already-decoded GeoJSON object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawGeometry {
    Text(String),
    GeoJson(geojson::Geometry),
}

impl RawGeometry {
    fn decode(&self) -> Result<Geometry, RecordError> {
        let geometry = match self {
            RawGeometry::Text(text) => wkt::parse_wkt(text)?,
            RawGeometry::GeoJson(geometry) => wkt::from_geojson(geometry)?,
        };
        if geometry.is_well_formed() {
            Ok(geometry)
        } else {
            Err(RecordError::DegenerateGeometry)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacilityId(pub String);

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FacilityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Canonical healthcare facility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub id: FacilityId,
    pub name: String,
    pub address: String,
    pub categories: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    pub url_2gis: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_3: Option<String>,
}

impl FacilityRecord {
    /// Minimal record with placeholder display fields
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: FacilityId(id.into()),
            name: name.into(),
            address: String::new(),
            categories: UNSPECIFIED_CATEGORY.to_string(),
            latitude,
            longitude,
            district: None,
            url_2gis: MISSING_LINK.to_string(),
            website: None,
            email: None,
            phone_1: None,
            phone_2: None,
            phone_3: None,
        }
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    /// Finite, in-range coordinates
    pub fn is_locatable(&self) -> bool {
        is_valid_latitude(self.latitude) && is_valid_longitude(self.longitude)
    }

    /// Position for spatial operations, `None` when unlocatable
    pub fn position(&self) -> Option<Point> {
        self.is_locatable()
            .then(|| Point::new(self.longitude, self.latitude))
    }
}

fn is_valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

fn is_valid_longitude(lon: f64) -> bool {
    lon.is_finite() && (-180.0..=180.0).contains(&lon)
}

/// Facility row as served by the hospitals endpoint.
/// `y` is latitude and `x` is longitude.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFacility {
    pub id: Option<RawScalar>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    pub categories: Option<String>,
    pub y: Option<RawScalar>,
    pub x: Option<RawScalar>,
    #[serde(alias = "gis_url")]
    pub gis_uri: Option<String>,
    #[serde(alias = "website_1")]
    pub website: Option<String>,
    #[serde(alias = "email")]
    pub email_1: Option<String>,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub phone_3: Option<String>,
}

/// Empty strings count as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<RawFacility> for FacilityRecord {
    type Error = RecordError;

    fn try_from(raw: RawFacility) -> Result<Self, Self::Error> {
        let latitude = raw.y.as_ref().ok_or(RecordError::MissingField("y"))?.to_f64("y")?;
        let longitude = raw.x.as_ref().ok_or(RecordError::MissingField("x"))?.to_f64("x")?;
        if !is_valid_latitude(latitude) {
            return Err(RecordError::OutOfRange { field: "y", value: latitude });
        }
        if !is_valid_longitude(longitude) {
            return Err(RecordError::OutOfRange { field: "x", value: longitude });
        }

        let name = non_empty(raw.name).ok_or(RecordError::MissingField("name"))?;
        let id = raw
            .id
            .map(RawScalar::into_label)
            .unwrap_or_else(|| name.clone());

        Ok(Self {
            id: FacilityId(id),
            name,
            address: raw.address.unwrap_or_default(),
            categories: non_empty(raw.categories).unwrap_or_else(|| UNSPECIFIED_CATEGORY.to_string()),
            latitude,
            longitude,
            district: non_empty(raw.district),
            url_2gis: non_empty(raw.gis_uri).unwrap_or_else(|| MISSING_LINK.to_string()),
            website: non_empty(raw.website),
            email: non_empty(raw.email_1),
            phone_1: non_empty(raw.phone_1),
            phone_2: non_empty(raw.phone_2),
            phone_3: non_empty(raw.phone_3),
        })
    }
}

/// Population-bearing grid polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationCell {
    pub id: String,
    pub geometry: Geometry,
    pub population: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl PopulationCell {
    pub fn new(id: impl Into<String>, geometry: Geometry, population: u64) -> Self {
        Self {
            id: id.into(),
            geometry,
            population,
            region: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Grid row as served by the population endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RawPopulationCell {
    pub id: Option<RawScalar>,
    pub geometry: Option<RawGeometry>,
    #[serde(alias = "population")]
    pub total_sum_population: Option<RawScalar>,
    pub name_region: Option<String>,
}

impl TryFrom<RawPopulationCell> for PopulationCell {
    type Error = RecordError;

    fn try_from(raw: RawPopulationCell) -> Result<Self, Self::Error> {
        let geometry = raw
            .geometry
            .as_ref()
            .ok_or(RecordError::MissingField("geometry"))?
            .decode()?;
        let population = match &raw.total_sum_population {
            Some(value) => non_negative_count(value, "total_sum_population")?,
            None => 0,
        };

        Ok(Self {
            id: raw.id.map(RawScalar::into_label).unwrap_or_default(),
            geometry,
            population,
            region: non_empty(raw.name_region),
        })
    }
}

fn non_negative_count(value: &RawScalar, field: &'static str) -> Result<u64, RecordError> {
    let value = value.to_f64(field)?;
    if value < 0.0 {
        return Err(RecordError::NegativePopulation(value));
    }
    Ok(value.round() as u64)
}

/// District statistics row
#[derive(Debug, Clone, Deserialize)]
pub struct RawDistrictStat {
    pub district: Option<String>,
    pub population: Option<RawScalar>,
    pub clinic_count: Option<RawScalar>,
}

impl TryFrom<RawDistrictStat> for DistrictStat {
    type Error = RecordError;

    fn try_from(raw: RawDistrictStat) -> Result<Self, Self::Error> {
        let district = non_empty(raw.district).ok_or(RecordError::MissingField("district"))?;
        let population = match &raw.population {
            Some(value) => non_negative_count(value, "population")?,
            None => 0,
        };
        let clinic_count = match &raw.clinic_count {
            Some(value) => {
                let count = value.to_f64("clinic_count")?;
                if count < 0.0 {
                    return Err(RecordError::OutOfRange { field: "clinic_count", value: count });
                }
                count.round() as u32
            }
            None => 0,
        };

        Ok(Self {
            district,
            population,
            clinic_count,
        })
    }
}

/// Administrative district boundary feature
#[derive(Debug, Clone, Deserialize)]
pub struct RawDistrictFeature {
    pub id: Option<RawScalar>,
    pub geometry: Option<RawGeometry>,
    #[serde(default)]
    pub properties: RawDistrictProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDistrictProperties {
    pub name_ru: Option<String>,
    pub name_kz: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<RawDistrictFeature> for DistrictBoundary {
    type Error = RecordError;

    fn try_from(raw: RawDistrictFeature) -> Result<Self, Self::Error> {
        let props = raw.properties;
        let name = non_empty(props.name_ru)
            .or_else(|| non_empty(props.name))
            .or_else(|| non_empty(props.name_kz))
            .or_else(|| raw.id.map(RawScalar::into_label))
            .ok_or(RecordError::MissingField("properties.name_ru"))?;
        let geometry = raw
            .geometry
            .as_ref()
            .ok_or(RecordError::MissingField("geometry"))?
            .decode()?;

        Ok(Self { name, geometry })
    }
}

/// Decode and convert a batch row by row, logging and skipping rejected rows.
///
/// A row that does not even deserialize into `R` is rejected like any other
/// invalid record, so one bad row never costs the rest of the batch.
pub fn adapt_all<R, T>(rows: Vec<serde_json::Value>, kind: &str) -> Vec<T>
where
    R: DeserializeOwned,
    T: TryFrom<R, Error = RecordError>,
{
    let total = rows.len();
    let mut adapted = Vec::with_capacity(total);

    for (i, row) in rows.into_iter().enumerate() {
        let record = serde_json::from_value::<R>(row)
            .map_err(|e| RecordError::InvalidRow(e.to_string()))
            .and_then(T::try_from);
        match record {
            Ok(record) => adapted.push(record),
            Err(e) => warn!("Skipping {} row {}: {}", kind, i, e),
        }
    }

    info!(
        "Adapted {} {} rows ({} rejected)",
        adapted.len(),
        kind,
        total - adapted.len()
    );

    adapted
}
