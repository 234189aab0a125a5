use charter_score::config::AppConfig;
use charter_score::error::AppError;
use charter_score::scoring::{InMemoryScoringStore, PeriodType, ScoringService};
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the charter snapshot at `path`, or seed the demo charter when no path is configured.
pub(crate) fn load_store(path: Option<&Path>) -> Result<InMemoryScoringStore, AppError> {
    match path {
        Some(path) => {
            let file = File::open(path)?;
            let store = InMemoryScoringStore::from_reader(BufReader::new(file))?;
            info!(path = %path.display(), "loaded charter snapshot");
            Ok(store)
        }
        None => {
            info!("no APP_DATA_PATH configured; serving the demo charter");
            Ok(crate::demo::demo_store())
        }
    }
}

/// Service used by the one-shot CLI commands. `data` overrides `APP_DATA_PATH`.
pub(crate) fn cli_service(
    data: Option<PathBuf>,
    today: Option<NaiveDate>,
    no_timeline: bool,
) -> Result<ScoringService<InMemoryScoringStore>, AppError> {
    let config = AppConfig::load()?;
    let data = data.or(config.data_path);
    let store = load_store(data.as_deref())?;

    let mut scoring = config.scoring;
    if no_timeline {
        scoring.timeline_weighting = false;
    }

    let service = ScoringService::new(Arc::new(store), scoring);
    Ok(match today {
        Some(today) => service.with_today(today),
        None => service,
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Parse a reporting month given as `YYYY-MM` into its first day.
pub(crate) fn parse_month(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| format!("failed to parse '{raw}' as YYYY-MM"))
}

pub(crate) fn parse_period_type(raw: &str) -> Result<PeriodType, String> {
    PeriodType::from_str(raw)
}
