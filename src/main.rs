use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use facetshape::data::QueryResponse;
use facetshape::{build_chart, ChartKind, ChartOptions};

#[derive(Parser, Debug)]
#[command(name = "facetshape")]
#[command(about = "Classify NRQL query results and reshape them into chart series", long_about = None)]
struct Args {
    /// Chart to shape the result for
    #[arg(value_enum)]
    chart: ChartKind,

    /// Chart width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Chart height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Drop the "Other" facet bucket
    #[arg(long)]
    hide_other: bool,

    /// Dependent axis label
    #[arg(long = "y-label")]
    y_label: Option<String>,

    /// JSON file with chart options; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Args {
    fn chart_options(&self) -> Result<ChartOptions> {
        let mut options = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => ChartOptions::default(),
        };

        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if self.hide_other {
            options.show_other = false;
        }
        if let Some(label) = &self.y_label {
            options.y_axis_label = Some(label.clone());
        }

        Ok(options)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let options = args.chart_options()?;

    // Read the query delivery from stdin
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read query result from stdin")?;
    let value: serde_json::Value =
        serde_json::from_str(&input).context("Failed to parse query result JSON")?;
    let response = QueryResponse::from_json(&value)?;

    debug!(chart = args.chart.name(), ?options, "shaping query result");
    let outcome = build_chart(args.chart, &response, &options);

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize chart outcome")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json).context("Failed to write outcome to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
