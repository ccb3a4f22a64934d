use std::path::PathBuf;

use anyhow::bail;
use clap::{Args, Parser, Subcommand};

mod aggregate;
mod data;
mod models;
mod report;
mod session;

use data::FilterSpec;
use models::Metric;
use session::{Credentials, Session};

#[derive(Parser)]
#[command(name = "warehouse-collection-scoreboard")]
#[command(about = "Ranked collection metrics over a warehouse event export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Value selections matching the dashboard's sidebar filters. Repeating a
/// flag adds to the selection; omitting it leaves that column unrestricted.
#[derive(Args, Debug)]
struct FilterArgs {
    #[arg(long)]
    name: Vec<String>,
    #[arg(long)]
    registration: Vec<String>,
    #[arg(long)]
    period: Vec<String>,
}

impl FilterArgs {
    fn to_spec(&self) -> FilterSpec {
        let some_if_given = |values: &Vec<String>| {
            if values.is_empty() {
                None
            } else {
                Some(values.clone())
            }
        };
        FilterSpec {
            names: some_if_given(&self.name),
            registrations: some_if_given(&self.registration),
            periods: some_if_given(&self.period),
        }
    }

    fn scope_label(&self) -> Option<String> {
        let selected: Vec<&str> = self
            .name
            .iter()
            .chain(self.registration.iter())
            .chain(self.period.iter())
            .map(String::as_str)
            .collect();
        if selected.is_empty() {
            None
        } else {
            Some(selected.join(", "))
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the distinct filterable values in the dataset
    Filters {
        #[arg(long)]
        data: PathBuf,
    },
    /// Print one ranked aggregate to stdout
    Rank {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, value_enum)]
        metric: Metric,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate the full report (requires login)
    Report {
        #[arg(long)]
        data: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
        /// Append a mean line to each period block
        #[arg(long)]
        mean: bool,
        /// Emit the derived tables as JSON instead of markdown
        #[arg(long)]
        json: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Filters { data } => {
            let events = data::load_events(&data)?;
            println!("Names:");
            for name in data::distinct_names(&events) {
                println!("- {name}");
            }
            println!("Registrations:");
            for registration in data::distinct_registrations(&events) {
                println!("- {registration}");
            }
            println!("Periods:");
            for period in data::distinct_periods(&events) {
                println!("- {period}");
            }
        }
        Commands::Rank {
            data,
            metric,
            filters,
            limit,
        } => {
            let events = data::load_events(&data)?;
            let filtered = data::filter_events(&events, &filters.to_spec());
            let rows = aggregate::compute(metric, &filtered);

            if rows.is_empty() {
                println!("No rows match this selection.");
                return Ok(());
            }

            println!("Top employees by {}:", metric.label().to_lowercase());
            for row in rows.iter().take(limit) {
                let value = match metric {
                    Metric::Score => report::format_decimal(row.value),
                    _ => report::format_int(row.value),
                };
                println!(
                    "- {} ({}, {}) {}",
                    row.name, row.registration, row.period, value
                );
            }
        }
        Commands::Report {
            data,
            filters,
            mean,
            json,
            out,
            user,
            password,
        } => {
            let credentials = Credentials::from_env()?;
            let mut session = Session::new();
            if !session.login(&credentials, &user, &password) {
                bail!("invalid username or password");
            }

            let events = data::load_events(&data)?;
            let filtered = data::filter_events(&events, &filters.to_spec());
            let contents = if json {
                report::build_json(&filtered)?
            } else {
                report::build_report(filters.scope_label().as_deref(), &filtered, mean)
            };
            std::fs::write(&out, contents)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
