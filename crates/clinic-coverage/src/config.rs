//! Configuration: defaults plus an optional JSON override file

use crate::demand::DemandConfig;
use crate::population::CatchmentStrategy;
use crate::ranking::RankingConfig;
use crate::{CoverageError, Result, DEFAULT_OVERLOAD_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// District projection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistrictConfig {
    /// Residents per clinic above which a district is overloaded
    pub overload_threshold: f64,
}

impl Default for DistrictConfig {
    fn default() -> Self {
        Self {
            overload_threshold: DEFAULT_OVERLOAD_THRESHOLD,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub ranking: RankingConfig,
    pub districts: DistrictConfig,
    pub demand: DemandConfig,
}

impl CoverageConfig {
    /// Load from JSON; absent keys keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from {:?}", path);

        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ranking = &self.ranking;
        non_negative("ranking.w_distance", ranking.w_distance)?;
        non_negative("ranking.w_population", ranking.w_population)?;
        if let CatchmentStrategy::Radius { radius_km } = ranking.catchment {
            non_negative("ranking.catchment.radius_km", radius_km)?;
        }

        non_negative("districts.overload_threshold", self.districts.overload_threshold)?;

        let demand = &self.demand;
        non_negative("demand.min_gap_km", demand.min_gap_km)?;
        non_negative("demand.moderate_km", demand.moderate_km)?;
        non_negative("demand.critical_km", demand.critical_km)?;
        if !(demand.min_gap_km <= demand.moderate_km && demand.moderate_km <= demand.critical_km) {
            return Err(CoverageError::InvalidConfig(format!(
                "demand bands must be ordered: min_gap_km ({}) <= moderate_km ({}) <= critical_km ({})",
                demand.min_gap_km, demand.moderate_km, demand.critical_km
            )));
        }
        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(CoverageError::InvalidConfig(format!(
            "{} must be a finite non-negative number, got {}",
            field, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoverageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.districts.overload_threshold, 15000.0);
        assert_eq!(
            config.ranking.catchment,
            CatchmentStrategy::Radius { radius_km: 0.7 }
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{"ranking": {"top_n": 3, "catchment": {"strategy": "containment"}}, "districts": {"overload_threshold": 5000}}"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = CoverageConfig::load(file.path()).unwrap();
        assert_eq!(config.ranking.top_n, 3);
        assert_eq!(config.ranking.w_distance, 0.7);
        assert_eq!(config.ranking.catchment, CatchmentStrategy::Containment);
        assert_eq!(config.districts.overload_threshold, 5000.0);
        assert_eq!(config.demand, DemandConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = CoverageConfig::default();
        config.ranking.w_population = -1.0;
        assert!(matches!(config.validate(), Err(CoverageError::InvalidConfig(_))));

        let mut config = CoverageConfig::default();
        config.demand.moderate_km = 3.0;
        assert!(matches!(config.validate(), Err(CoverageError::InvalidConfig(_))));

        let mut config = CoverageConfig::default();
        config.ranking.catchment = CatchmentStrategy::Radius { radius_km: f64::NAN };
        assert!(matches!(config.validate(), Err(CoverageError::InvalidConfig(_))));
    }
}
