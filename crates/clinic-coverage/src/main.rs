//! Clinic Coverage CLI
//!
//! Ranks clinics for a location, projects district load and finds
//! underserved population cells from backend JSON snapshots.
//!
//! Usage:
//!   coverage rank --facilities data/hospitals.json \
//!                 --population data/grids.json \
//!                 --lon 76.91 --lat 43.24 --output ranked.json --geojson
//!   coverage districts --stats data/district_stats.json --threshold 12000
//!   coverage demand --facilities data/hospitals.json --population data/grids.json \
//!                   --districts data/districts.geojson --district medeu
//!   coverage search --facilities data/hospitals.json "city clinic"

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clinic_coverage::demand::zones_in_district;
use clinic_coverage::districts::{build_district_stats, district_names, facilities_in_district, DistrictFilter};
use clinic_coverage::export::{self, DemandReport, DistrictReport, RankingReport};
use clinic_coverage::search::{find_by_name, match_in_message};
use clinic_coverage::snapshot::DashboardSnapshot;
use clinic_coverage::{
    loader, project_district_aggregates, CatchmentStrategy, CoverageConfig, Point,
    DEFAULT_CATCHMENT_RADIUS_KM,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "coverage",
    about = "Clinic accessibility and district load analytics"
)]
struct Args {
    /// JSON configuration file; flags below override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank facilities by distance and nearby population
    Rank {
        /// Hospitals JSON file
        #[arg(short, long)]
        facilities: PathBuf,

        /// Population grid JSON file
        #[arg(short, long)]
        population: PathBuf,

        /// User longitude
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// User latitude
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Number of facilities to keep
        #[arg(long)]
        top_n: Option<usize>,

        /// How nearby population is counted
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,

        /// Catchment radius in km (radius strategy)
        #[arg(long)]
        radius_km: Option<f64>,

        /// Only rank facilities in this district
        #[arg(short, long)]
        district: Option<String>,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also output GeoJSON (ranked layer plus facility markers)
        #[arg(long, requires = "output")]
        geojson: bool,
    },

    /// Project per-district load
    Districts {
        /// District statistics JSON file
        #[arg(short, long, conflicts_with_all = ["facilities", "population"])]
        stats: Option<PathBuf>,

        /// Hospitals JSON file, used with --population when no stats file is given
        #[arg(short, long, requires = "population")]
        facilities: Option<PathBuf>,

        /// Population grid JSON file
        #[arg(short, long, requires = "facilities")]
        population: Option<PathBuf>,

        /// Residents per clinic above which a district is overloaded
        #[arg(long)]
        threshold: Option<f64>,

        /// Only report this district
        #[arg(short, long)]
        district: Option<String>,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find populous cells far from any clinic
    Demand {
        /// Hospitals JSON file
        #[arg(short, long)]
        facilities: PathBuf,

        /// Population grid JSON file
        #[arg(short, long)]
        population: PathBuf,

        /// District boundaries FeatureCollection
        #[arg(short, long)]
        districts: Option<PathBuf>,

        /// Only report zones in this district (needs --districts)
        #[arg(long, requires = "districts")]
        district: Option<String>,

        /// Output JSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also output GeoJSON
        #[arg(long, requires = "output")]
        geojson: bool,
    },

    /// Look a facility up by name
    Search {
        /// Hospitals JSON file
        #[arg(short, long)]
        facilities: PathBuf,

        /// Name fragment or free-text message
        query: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Strategy {
    Radius,
    Containment,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = match &args.config {
        Some(path) => CoverageConfig::load(path)?,
        None => CoverageConfig::default(),
    };

    match args.command {
        Command::Rank {
            facilities,
            population,
            lon,
            lat,
            top_n,
            strategy,
            radius_km,
            district,
            output,
            geojson,
        } => {
            let mut config = config;
            if let Some(n) = top_n {
                config.ranking.top_n = n;
            }
            config.ranking.catchment = catchment(config.ranking.catchment, strategy, radius_km);
            config.validate()?;
            let location = Point::new(lon, lat);
            run_rank(&config, &facilities, &population, location, district.as_deref(), output, geojson)
        }
        Command::Districts {
            stats,
            facilities,
            population,
            threshold,
            district,
            output,
        } => {
            let mut config = config;
            if let Some(t) = threshold {
                config.districts.overload_threshold = t;
            }
            config.validate()?;

            let stats = match (stats, facilities, population) {
                (Some(path), _, _) => loader::load_district_stats(path)?,
                (None, Some(f), Some(p)) => {
                    build_district_stats(&loader::load_facilities(f)?, &loader::load_population_cells(p)?)
                }
                _ => bail!("districts needs --stats, or --facilities with --population"),
            };

            let threshold = config.districts.overload_threshold;
            let aggregates = project_district_aggregates(&stats, threshold);
            let filter = DistrictFilter::from_option(district.as_deref());
            let rows: Vec<_> = filter.apply(&aggregates).into_iter().cloned().collect();
            if rows.is_empty() && filter != DistrictFilter::All {
                warn!("No district matches {:?}", district);
            }

            let report = DistrictReport::new(rows, threshold, district);
            info!(
                "{} districts, {} overloaded, {} without clinics",
                report.summary.districts, report.summary.overloaded, report.summary.uncovered
            );
            for row in &report.districts {
                info!(
                    "  {:30} | {:>9} residents | {:>3} clinics | {:?}",
                    row.district, row.population, row.clinic_count, row.status
                );
            }
            write_json(output.as_deref(), &report)
        }
        Command::Demand {
            facilities,
            population,
            districts,
            district,
            output,
            geojson,
        } => {
            let mut snapshot = DashboardSnapshot::new();
            snapshot.set_facilities(loader::load_facilities(facilities)?);
            snapshot.set_population(loader::load_population_cells(population)?);
            if let Some(path) = districts {
                snapshot.set_district_boundaries(loader::load_district_boundaries(path)?);
            }

            let mut zones = snapshot.demand_zones(&config);
            if let Some(name) = &district {
                zones = zones_in_district(zones, name);
                info!("{} demand zones in {:?}", zones.len(), name);
            }

            let report = DemandReport::new(zones);
            info!("Found {} demand zones", report.zones.len());
            for (priority, count) in &report.by_priority {
                info!("  {:?}: {} zones", priority, count);
            }

            write_json(output.as_deref(), &report)?;
            if let (true, Some(path)) = (geojson, output) {
                write_geojson(&path.with_extension("geojson"), &export::demand_zones_to_geojson(&report.zones))?;
            }
            Ok(())
        }
        Command::Search { facilities, query } => {
            let facilities = loader::load_facilities(facilities)?;

            let mut matches = find_by_name(&facilities, &query);
            if matches.is_empty() {
                matches.extend(match_in_message(&facilities, &query));
            }

            match matches.first() {
                Some(f) => info!("Focus: {} ({})", f.name, f.id),
                None => warn!("No facility matches {:?}", query),
            }

            write_json(None, &matches)
        }
    }
}

fn catchment(current: CatchmentStrategy, strategy: Option<Strategy>, radius_km: Option<f64>) -> CatchmentStrategy {
    let configured_radius = match current {
        CatchmentStrategy::Radius { radius_km } => radius_km,
        CatchmentStrategy::Containment => DEFAULT_CATCHMENT_RADIUS_KM,
    };
    let radius = CatchmentStrategy::Radius {
        radius_km: radius_km.unwrap_or(configured_radius),
    };
    match strategy {
        Some(Strategy::Containment) => CatchmentStrategy::Containment,
        Some(Strategy::Radius) => radius,
        None if current == CatchmentStrategy::Containment => current,
        None => radius,
    }
}

fn run_rank(
    config: &CoverageConfig,
    facilities: &Path,
    population: &Path,
    location: Point,
    district: Option<&str>,
    output: Option<PathBuf>,
    geojson: bool,
) -> Result<()> {
    if !location.is_finite() {
        bail!("user location must be finite, got {:?}", location);
    }

    info!("{}", "=".repeat(60));
    info!("Clinic ranking");
    info!("{}", "=".repeat(60));

    let mut snapshot = DashboardSnapshot::new();
    snapshot.set_user_location(Some(location));
    let mut facilities = loader::load_facilities(facilities)?;
    if let Some(name) = district {
        let in_district: Vec<_> = facilities_in_district(&facilities, name).into_iter().cloned().collect();
        if in_district.is_empty() {
            warn!("No facility in district {:?}; known districts: {}", name, district_names(&facilities).join(", "));
        }
        info!("{} of {} facilities in {:?}", in_district.len(), facilities.len(), name);
        facilities = in_district;
    }
    snapshot.set_facilities(facilities);
    let cells = loader::load_population_cells(population)?;
    let cell_count = cells.len();
    snapshot.set_population(cells);

    let ranked = snapshot.top_facilities(config);
    info!("\nTop {} facilities:", ranked.len());
    for r in &ranked {
        info!(
            "  {:8.3} | {:40} | {:6.2} km | {:>7} residents",
            r.score,
            r.facility.name.chars().take(40).collect::<String>(),
            r.display_distance_km,
            r.nearby_population
        );
    }

    let report = RankingReport::new(ranked, Some(location), snapshot.facilities(), cell_count, &config.ranking);
    write_json(output.as_deref(), &report)?;

    if let (true, Some(path)) = (geojson, output) {
        write_geojson(&path.with_extension("geojson"), &export::ranked_to_geojson(&report.ranked))?;
        write_geojson(
            &path.with_extension("facilities.geojson"),
            &export::facilities_to_geojson(snapshot.facilities()),
        )?;
    }
    Ok(())
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            info!("Writing output to {:?}", path);
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, value)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, value)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn write_geojson(path: &Path, collection: &geojson::FeatureCollection) -> Result<()> {
    info!("Writing GeoJSON to {:?}", path);
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, collection)?;
    Ok(())
}
