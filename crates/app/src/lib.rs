//! Stencil command line front end.
//!
//! Wires the file and fixture adapters into a templating session, loads one
//! dashboard and reports the resolved variables, interpolations and URL query.

mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use stencil_application::ports::DataSource;
use stencil_application::use_cases::{
    LoadDashboard, LoadDashboardInput, SaveDashboard,
};
use stencil_application::variable_resolver::ReplaceFormat;
use stencil_application::{SessionPorts, TemplatingSession};
use stencil_domain::{RawTimeRange, VariableValue};
use stencil_infrastructure::{
    FileDashboardRepository, InMemoryDataSourceRegistry, InMemoryLocation, SettingsRepository,
    SystemClock, TracingEvents, load_fixtures,
};
use tracing::info;

pub use report::{Interpolation, Report, VariableReport};

/// Command line arguments.
#[derive(Debug, Clone, Parser)]
#[command(name = "stencil", version)]
#[command(about = "Resolve dashboard template variables against fixture data sources")]
pub struct Cli {
    /// Uid of the dashboard to load
    pub uid: String,

    /// Directory holding `<uid>.json` dashboard files
    #[arg(short = 'd', long, default_value = ".")]
    pub dashboards: PathBuf,

    /// JSON file with an array of data source fixtures
    #[arg(long)]
    pub datasources: Option<PathBuf>,

    /// Initial URL query, e.g. `var-host=a&var-host=b`
    #[arg(short = 'q', long, default_value = "")]
    pub query: String,

    /// Start of the time range; the dashboard's range is used when absent
    #[arg(long)]
    pub from: Option<String>,

    /// End of the time range
    #[arg(long, default_value = "now")]
    pub to: String,

    /// Settings file; defaults to the user config directory
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Selects a value after loading, as `name=value`; repeat for several values
    #[arg(long = "set", value_parser = parse_selection)]
    pub selections: Vec<(String, String)>,

    /// Template to interpolate; may be repeated
    #[arg(short = 'i', long = "interpolate")]
    pub templates: Vec<String>,

    /// Format applied to interpolated values, e.g. `csv` or `date:iso`
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Writes the variables back into the dashboard file
    #[arg(long)]
    pub save: bool,

    /// Saves current selections as the dashboard defaults
    #[arg(long, requires = "save")]
    pub save_current_as_default: bool,

    /// Prints the report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_selection(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

impl Cli {
    fn time_range(&self) -> Option<RawTimeRange> {
        self.from.as_ref().map(|from| RawTimeRange {
            from: from.clone(),
            to: self.to.clone(),
        })
    }

    /// Groups `--set` values by variable; repeated names become a list.
    fn grouped_selections(&self) -> Vec<(String, VariableValue)> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (name, value) in &self.selections {
            match grouped.iter_mut().find(|(n, _)| n == name) {
                Some((_, values)) => values.push(value.clone()),
                None => grouped.push((name.clone(), vec![value.clone()])),
            }
        }
        grouped
            .into_iter()
            .map(|(name, mut values)| {
                let value = if values.len() == 1 {
                    VariableValue::Single(values.remove(0))
                } else {
                    VariableValue::Multi(values)
                };
                (name, value)
            })
            .collect()
    }
}

/// Loads the dashboard named by `cli` and builds the report.
///
/// # Errors
///
/// Returns an error if settings, fixtures or the dashboard cannot be read, a
/// selected variable does not exist, or saving fails.
pub async fn run(cli: Cli) -> anyhow::Result<Report> {
    let settings_repository = cli
        .settings
        .as_ref()
        .map_or_else(SettingsRepository::new, SettingsRepository::with_path);
    let settings = settings_repository
        .load()
        .await
        .context("failed to load settings")?;

    let sources = match &cli.datasources {
        Some(path) => load_fixtures(path)
            .await
            .with_context(|| format!("failed to read data sources from {}", path.display()))?,
        None => Vec::new(),
    };
    let registry = InMemoryDataSourceRegistry::new(
        sources
            .into_iter()
            .map(|source| Arc::new(source) as Arc<dyn DataSource>)
            .collect(),
    );

    let location = Arc::new(InMemoryLocation::from_query_string(
        &cli.query,
        settings.max_url_length,
    ));
    let events = Arc::new(TracingEvents::new());
    let session = TemplatingSession::new(
        SessionPorts {
            datasources: Arc::new(registry),
            location: location.clone(),
            events: events.clone(),
            clock: Arc::new(SystemClock::new()),
        },
        settings,
    );

    let repository = FileDashboardRepository::new(&cli.dashboards);
    let loaded = LoadDashboard::new(repository.clone())
        .execute(
            &session,
            LoadDashboardInput {
                uid: cli.uid.clone(),
                time_range: cli.time_range(),
                ..LoadDashboardInput::default()
            },
        )
        .await?;
    info!(uid = %loaded.uid, variables = loaded.variables, "dashboard loaded");

    for (name, value) in cli.grouped_selections() {
        let Some(variable) = session.variable(&name) else {
            bail!("unknown variable: {name}");
        };
        session
            .select_value(&variable.id, value)
            .await
            .with_context(|| format!("failed to select a value for {name}"))?;
    }

    let format = cli.format.clone().map(ReplaceFormat::Named);
    let interpolations = cli
        .templates
        .iter()
        .map(|template| Interpolation {
            template: template.clone(),
            result: session.replace(Some(template), None, format.as_ref()),
        })
        .collect();

    let saved = if cli.save {
        SaveDashboard::new(repository)
            .execute(&session, cli.save_current_as_default)
            .await?;
        true
    } else {
        false
    };

    let url_query = location.to_query_string()?;
    let report = Report::new(&session, interpolations, url_query, &events.notifications(), saved);
    session.teardown();
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_selection() {
        assert_eq!(
            parse_selection("host=web-1=a").unwrap(),
            ("host".to_string(), "web-1=a".to_string())
        );
        assert!(parse_selection("host").is_err());
        assert!(parse_selection("=x").is_err());
    }

    #[test]
    fn test_repeated_selections_become_a_list() {
        let cli = Cli::parse_from([
            "stencil", "d1", "--set", "host=a", "--set", "env=prod", "--set", "host=b",
        ]);
        assert_eq!(
            cli.grouped_selections(),
            vec![
                ("host".to_string(), VariableValue::from(vec!["a", "b"])),
                ("env".to_string(), VariableValue::from("prod")),
            ]
        );
    }

    #[test]
    fn test_time_range_only_with_from() {
        let cli = Cli::parse_from(["stencil", "d1"]);
        assert_eq!(cli.time_range(), None);

        let cli = Cli::parse_from(["stencil", "d1", "--from", "now-1h"]);
        assert_eq!(
            cli.time_range(),
            Some(RawTimeRange {
                from: "now-1h".to_string(),
                to: "now".to_string(),
            })
        );
    }
}
