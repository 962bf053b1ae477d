use std::error::Error;
use std::fs;

use clap::Parser;
use tracing::{debug, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod axis;
mod config;
mod draw;
mod table;

use axis::{select_axis, METRICS};
use config::Config;
use draw::{render, Outcome};
use table::{ExperimentGroup, ResultTable};

fn main() -> Result<(), Box<dyn Error>> {
    // a builder for `FmtSubscriber`.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(Config::parse())?;
    debug!("Config: {:?}", config);

    let table = ResultTable::load(&config.results)?;
    if table.rows.is_empty() {
        warn!("No rows in {}", config.results.display());
        return Ok(());
    }

    fs::create_dir_all(&config.out_dir)?;

    let groups = table.groups();
    print_baselines(&table, &groups);

    for group in &groups {
        let Some(axis) = select_axis(group) else {
            warn!(
                "Skipping experiment {}: no varying axis ({} row(s))",
                group.experiment,
                group.rows.len()
            );
            continue;
        };
        debug!(
            "Experiment {}: axis {} ({:?})",
            group.experiment, axis.column, axis.kind
        );
        for metric in METRICS {
            match render(group, &axis, metric, &config.out_dir)? {
                Outcome::Written(path) => println!("Wrote {}", path.display()),
                Outcome::Skipped(reason) => {
                    warn!("Skipping {} / {}: {}", group.experiment, metric, reason)
                }
            }
        }
    }

    println!("Done. Open the images in {}", config.out_dir.display());
    Ok(())
}

/// Dumps single-configuration groups before any charts, so baseline numbers
/// are visible even though they produce no chart of their own.
fn print_baselines(table: &ResultTable, groups: &[ExperimentGroup]) {
    for group in groups {
        if group.rows.len() != 1 {
            continue;
        }
        println!("{}:", group.experiment);
        for column in &table.columns {
            if let Some(value) = group.rows[0].get(column) {
                println!("  {column} = {value}");
            }
        }
    }
}
