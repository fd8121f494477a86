//! District statistics: population-per-clinic projection and filtering

use crate::adapter::{FacilityRecord, PopulationCell};
use crate::geometry::Geometry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Suffixes dropped when matching district names loosely
const DISTRICT_SUFFIXES: [&str; 2] = [" район", " district"];

/// Raw per-district counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictStat {
    pub district: String,
    pub population: u64,
    pub clinic_count: u32,
}

impl DistrictStat {
    pub fn new(district: impl Into<String>, population: u64, clinic_count: u32) -> Self {
        Self {
            district: district.into(),
            population,
            clinic_count,
        }
    }
}

/// Administrative district polygon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictBoundary {
    pub name: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistrictStatus {
    Normal,
    Overloaded,
}

/// Projected district row, ready for tables, charts and ranking bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictAggregate {
    pub district: String,
    pub population: u64,
    pub clinic_count: u32,
    /// `population / max(clinic_count, 1)`
    pub population_per_clinic: f64,
    pub status: DistrictStatus,
    /// Same as `population_per_clinic`; lower is better served
    pub score: f64,
    /// False when the district has no clinic at all
    pub has_coverage: bool,
}

/// Compute ratios and statuses, best-served first.
///
/// A district without clinics is treated as maximum shortage: its ratio is its
/// whole population. Rows sharing a district name are merged.
pub fn project_district_aggregates(raw_stats: &[DistrictStat], threshold: f64) -> Vec<DistrictAggregate> {
    let mut merged: BTreeMap<&str, (u64, u32)> = BTreeMap::new();
    for stat in raw_stats {
        let entry = merged.entry(stat.district.as_str()).or_default();
        entry.0 = entry.0.saturating_add(stat.population);
        entry.1 = entry.1.saturating_add(stat.clinic_count);
    }

    let mut aggregates: Vec<DistrictAggregate> = merged
        .into_iter()
        .map(|(district, (population, clinic_count))| {
            let ratio = population as f64 / clinic_count.max(1) as f64;
            let status = if ratio > threshold {
                DistrictStatus::Overloaded
            } else {
                DistrictStatus::Normal
            };
            DistrictAggregate {
                district: district.to_string(),
                population,
                clinic_count,
                population_per_clinic: ratio,
                status,
                score: ratio,
                has_coverage: clinic_count > 0,
            }
        })
        .collect();

    aggregates.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.district.cmp(&b.district))
    });

    debug!(
        "Projected {} districts ({} overloaded at threshold {})",
        aggregates.len(),
        aggregates.iter().filter(|a| a.status == DistrictStatus::Overloaded).count(),
        threshold
    );

    aggregates
}

/// Per-district counts from raw records.
///
/// Population is summed per cell region; clinics are counted per facility
/// district. Only regions that carry population produce a row.
pub fn build_district_stats(facilities: &[FacilityRecord], cells: &[PopulationCell]) -> Vec<DistrictStat> {
    let mut population_by_region: BTreeMap<&str, u64> = BTreeMap::new();
    for cell in cells {
        if let Some(region) = cell.region.as_deref() {
            let total = population_by_region.entry(region).or_default();
            *total = total.saturating_add(cell.population);
        }
    }

    let mut clinics_by_district: HashMap<&str, u32> = HashMap::new();
    for facility in facilities {
        if let Some(district) = facility.district.as_deref().filter(|d| !d.is_empty()) {
            *clinics_by_district.entry(district).or_default() += 1;
        }
    }

    population_by_region
        .into_iter()
        .map(|(region, population)| DistrictStat {
            district: region.to_string(),
            population,
            clinic_count: clinics_by_district.get(region).copied().unwrap_or(0),
        })
        .collect()
}

/// Which districts a view shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DistrictFilter {
    #[default]
    All,
    Named(String),
}

impl DistrictFilter {
    /// `None` or a blank name selects every district
    pub fn from_option(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(n) if !n.is_empty() => DistrictFilter::Named(n.to_string()),
            _ => DistrictFilter::All,
        }
    }

    pub fn matches(&self, district: &str) -> bool {
        match self {
            DistrictFilter::All => true,
            DistrictFilter::Named(name) => name == district,
        }
    }

    pub fn apply<'a>(&self, aggregates: &'a [DistrictAggregate]) -> Vec<&'a DistrictAggregate> {
        aggregates.iter().filter(|a| self.matches(&a.district)).collect()
    }
}

/// Totals over a (filtered) set of district rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistrictSummary {
    pub districts: usize,
    pub total_population: u64,
    pub total_clinics: u64,
    pub overloaded: usize,
    pub uncovered: usize,
}

impl DistrictSummary {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a DistrictAggregate>) -> Self {
        rows.into_iter().fold(Self::default(), |mut s, row| {
            s.districts += 1;
            s.total_population = s.total_population.saturating_add(row.population);
            s.total_clinics += u64::from(row.clinic_count);
            if row.status == DistrictStatus::Overloaded {
                s.overloaded += 1;
            }
            if !row.has_coverage {
                s.uncovered += 1;
            }
            s
        })
    }
}

/// Lowercased name with surrounding space and a trailing "район"/"district" removed
pub fn normalize_district_name(name: &str) -> String {
    let mut cleaned = name.trim().to_lowercase();
    for suffix in DISTRICT_SUFFIXES {
        if let Some(stripped) = cleaned.strip_suffix(suffix) {
            cleaned = stripped.trim_end().to_string();
            break;
        }
    }
    cleaned
}

/// Facilities whose district contains the normalized query, case-insensitively
pub fn facilities_in_district<'a>(facilities: &'a [FacilityRecord], district: &str) -> Vec<&'a FacilityRecord> {
    let needle = normalize_district_name(district);
    if needle.is_empty() {
        return facilities.iter().collect();
    }
    facilities
        .iter()
        .filter(|f| {
            f.district
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Distinct, non-empty facility districts in sorted order
pub fn district_names(facilities: &[FacilityRecord]) -> Vec<String> {
    facilities
        .iter()
        .filter_map(|f| f.district.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use geo::{LineString, Polygon};
    use crate::DEFAULT_OVERLOAD_THRESHOLD;

    #[test]
    fn test_overloaded_and_normal() {
        let stats = vec![DistrictStat::new("Almaly", 10000, 1), DistrictStat::new("Medeu", 1000, 2)];
        let aggregates = project_district_aggregates(&stats, 5000.0);

        let almaly = aggregates.iter().find(|a| a.district == "Almaly").unwrap();
        assert_eq!(almaly.population_per_clinic, 10000.0);
        assert_eq!(almaly.status, DistrictStatus::Overloaded);

        let medeu = aggregates.iter().find(|a| a.district == "Medeu").unwrap();
        assert_eq!(medeu.population_per_clinic, 500.0);
        assert_eq!(medeu.status, DistrictStatus::Normal);
    }

    #[test]
    fn test_ratio_equal_to_threshold_is_normal() {
        let aggregates = project_district_aggregates(&[DistrictStat::new("Bostandyk", 10000, 2)], 5000.0);
        assert_eq!(aggregates[0].status, DistrictStatus::Normal);
    }

    #[test]
    fn test_zero_clinics_is_maximum_shortage() {
        let aggregates = project_district_aggregates(&[DistrictStat::new("Nauryzbay", 40000, 0)], DEFAULT_OVERLOAD_THRESHOLD);
        let row = &aggregates[0];

        assert_eq!(row.population_per_clinic, 40000.0);
        assert!(!row.has_coverage);
        assert_eq!(row.status, DistrictStatus::Overloaded);
    }

    #[test]
    fn test_sorted_by_score_then_name() {
        let stats = vec![
            DistrictStat::new("Turksib", 9000, 3),  // 3000
            DistrictStat::new("Auezov", 6000, 3),   // 2000
            DistrictStat::new("Alatau", 2000, 1),   // 2000
            DistrictStat::new("Zhetysu", 1000, 1),  // 1000
        ];
        let names: Vec<_> = project_district_aggregates(&stats, 5000.0)
            .into_iter()
            .map(|a| a.district)
            .collect();

        assert_eq!(names, vec!["Zhetysu", "Alatau", "Auezov", "Turksib"]);
    }

    #[test]
    fn test_duplicate_districts_merge() {
        let stats = vec![DistrictStat::new("Almaly", 3000, 1), DistrictStat::new("Almaly", 5000, 1)];
        let aggregates = project_district_aggregates(&stats, 5000.0);

        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].population, 8000);
        assert_eq!(aggregates[0].clinic_count, 2);
        assert_eq!(aggregates[0].population_per_clinic, 4000.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(project_district_aggregates(&[], 5000.0).is_empty());
    }

    #[test]
    fn test_build_district_stats() {
        let square = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let geometry = Geometry::Polygon(Polygon::new(LineString::from(square), vec![]));
        let cells = vec![
            PopulationCell::new("1", geometry.clone(), 100).with_region("Almaly"),
            PopulationCell::new("2", geometry.clone(), 250).with_region("Almaly"),
            PopulationCell::new("3", geometry.clone(), 70).with_region("Medeu"),
            PopulationCell::new("4", geometry, 999),
        ];
        let facilities = vec![
            FacilityRecord::new("a", "A", 43.2, 76.9).with_district("Almaly"),
            FacilityRecord::new("b", "B", 43.2, 76.9).with_district("Almaly"),
            FacilityRecord::new("c", "C", 43.2, 76.9).with_district("Turksib"),
            FacilityRecord::new("d", "D", 43.2, 76.9),
        ];

        let stats = build_district_stats(&facilities, &cells);
        assert_eq!(
            stats,
            vec![DistrictStat::new("Almaly", 350, 2), DistrictStat::new("Medeu", 70, 0)]
        );
    }

    #[test]
    fn test_filter_and_summary() {
        let stats = vec![
            DistrictStat::new("Almaly", 30000, 1),
            DistrictStat::new("Medeu", 1000, 2),
            DistrictStat::new("Nauryzbay", 500, 0),
        ];
        let aggregates = project_district_aggregates(&stats, 15000.0);

        let all = DistrictSummary::from_rows(DistrictFilter::All.apply(&aggregates));
        assert_eq!(all.districts, 3);
        assert_eq!(all.total_population, 31500);
        assert_eq!(all.total_clinics, 3);
        assert_eq!(all.overloaded, 1);
        assert_eq!(all.uncovered, 1);

        let medeu = DistrictFilter::from_option(Some(" Medeu "));
        let rows = medeu.apply(&aggregates);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].district, "Medeu");

        assert_eq!(DistrictFilter::from_option(Some("  ")), DistrictFilter::All);
    }

    #[test]
    fn test_normalize_district_name() {
        assert_eq!(normalize_district_name("Алмалинский район"), "алмалинский");
        assert_eq!(normalize_district_name("  Medeu District "), "medeu");
        assert_eq!(normalize_district_name("Turksib"), "turksib");
    }

    #[test]
    fn test_facilities_in_district_and_names() {
        let facilities = vec![
            FacilityRecord::new("a", "A", 43.2, 76.9).with_district("Алмалинский"),
            FacilityRecord::new("b", "B", 43.2, 76.9).with_district("Медеуский"),
            FacilityRecord::new("c", "C", 43.2, 76.9).with_district("Алмалинский"),
            FacilityRecord::new("d", "D", 43.2, 76.9).with_district(""),
        ];

        let found = facilities_in_district(&facilities, "Алмалинский район");
        let ids: Vec<_> = found.iter().map(|f| f.id.0.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);

        assert_eq!(district_names(&facilities), vec!["Алмалинский", "Медеуский"]);
    }
}
