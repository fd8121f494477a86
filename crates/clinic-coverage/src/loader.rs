//! Data loading from backend JSON snapshots

use crate::adapter::{
    adapt_all, FacilityRecord, PopulationCell, RawDistrictFeature, RawDistrictStat, RawFacility,
    RawPopulationCell,
};
use crate::districts::{DistrictBoundary, DistrictStat};
use crate::{CoverageError, Result};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Read a JSON array, or the array under one of `keys` in an object wrapper.
/// Rows stay untyped; each one is decoded on its own by the adapter.
fn read_rows(path: &Path, keys: &[&str]) -> Result<Vec<Value>> {
    let file = File::open(path)?;
    let raw: Value = serde_json::from_reader(BufReader::new(file))?;

    let rows = match raw {
        Value::Array(rows) => Some(rows),
        Value::Object(mut wrapper) => keys.iter().find_map(|k| match wrapper.remove(*k) {
            Some(Value::Array(rows)) => Some(rows),
            _ => None,
        }),
        _ => None,
    };

    rows.ok_or_else(|| {
        CoverageError::UnexpectedShape(
            path.display().to_string(),
            "a JSON array or an object wrapping one",
        )
    })
}

/// Load hospitals (`/api/hospitals/` payload)
pub fn load_facilities(path: impl AsRef<Path>) -> Result<Vec<FacilityRecord>> {
    let path = path.as_ref();
    info!("Loading facilities from {:?}", path);
    let rows = read_rows(path, &["results", "hospitals"])?;
    Ok(adapt_all::<RawFacility, _>(rows, "facility"))
}

/// Load the population grid (`/api/grids-population/` payload)
pub fn load_population_cells(path: impl AsRef<Path>) -> Result<Vec<PopulationCell>> {
    let path = path.as_ref();
    info!("Loading population grid from {:?}", path);
    let rows = read_rows(path, &["results", "cells"])?;
    Ok(adapt_all::<RawPopulationCell, _>(rows, "population cell"))
}

/// Load district statistics (`/api/analytics/district-stats/` payload)
pub fn load_district_stats(path: impl AsRef<Path>) -> Result<Vec<DistrictStat>> {
    let path = path.as_ref();
    info!("Loading district statistics from {:?}", path);
    let rows = read_rows(path, &["results", "districts"])?;
    Ok(adapt_all::<RawDistrictStat, _>(rows, "district stat"))
}

/// Load district boundaries (FeatureCollection with WKT geometries)
pub fn load_district_boundaries(path: impl AsRef<Path>) -> Result<Vec<DistrictBoundary>> {
    let path = path.as_ref();
    info!("Loading district boundaries from {:?}", path);
    let rows = read_rows(path, &["features"])?;
    Ok(adapt_all::<RawDistrictFeature, _>(rows, "district boundary"))
}
