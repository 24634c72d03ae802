use crate::analyzers::ClusteringEngine;
use crate::cli::args::{Cli, Commands};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{ClusterLevel, CountyAggregate, DataSource, LevelClustering};
use crate::processors::AttendancePipeline;
use crate::readers::PresenceReader;
use crate::utils::progress::ProgressReporter;
use crate::writers::CsvWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        settings = settings.with_data_dir(data_dir);
    }

    match cli.command {
        Commands::Aggregate {
            input,
            direct_urban_rural,
        } => {
            let pipeline = AttendancePipeline::new(settings).with_direct_urban_rural(direct_urban_rural);
            let progress = ProgressReporter::new_spinner("Aggregating presence data...", false);

            let outcome = pipeline.process_presence(input.as_deref(), &mut StdRng::from_entropy())?;
            progress.finish_with_message(&format!("Aggregated {} counties", outcome.aggregates.len()));

            if let Some(reason) = &outcome.fallback_reason {
                println!("⚠️  Presence data unusable: {}", reason);
                println!("   Wrote synthetic attendance instead");
            }
            if let Some(copy) = &outcome.archived_copy {
                println!("Archived source as {}", copy.display());
            }
            print_attendance(&outcome.aggregates);
            println!("\n✅ Attendance table written to {}", outcome.output.display());
        }

        Commands::Update {
            fresh,
            presence,
            interval,
        } => {
            let pipeline = AttendancePipeline::new(settings);
            let mut rng = StdRng::from_entropy();

            if interval == 0 {
                update_cycle(&pipeline, fresh, presence.as_deref(), &mut rng)?;
                println!("✅ Tables updated");
                return Ok(());
            }

            println!("Updating every {} seconds, Ctrl-C to stop", interval);
            let mut ticker = tokio::time::interval(Duration::from_secs(interval));
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Update loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = update_cycle(&pipeline, fresh, presence.as_deref(), &mut rng) {
                            error!(error = %e, "Update cycle failed");
                        }
                    }
                }
            }
        }

        Commands::Demographics { output } => {
            let report = AttendancePipeline::new(settings).demographic_report()?;
            emit_json(&report, output.as_deref())?;
        }

        Commands::Cluster {
            input,
            level,
            n_clusters,
            max_workers,
            output,
        } => {
            let input = input.unwrap_or_else(|| settings.cluster_path());
            let k = n_clusters.unwrap_or(settings.clustering.default_clusters);
            if let Some(workers) = max_workers {
                settings.clustering.max_workers = workers;
            }

            let progress = ProgressReporter::new_spinner(
                &format!("Clustering {} units into {} groups...", level, k),
                false,
            );
            let result = cluster_file(settings, input, level, k).await?;
            progress.finish_with_message(&format!(
                "Clustered {} units into {} groups",
                result.result.clustered_data.len(),
                result.result.n_clusters
            ));

            for warning in &result.result.warnings {
                println!("⚠️  {}", warning);
            }
            emit_json(&result, output.as_deref())?;
        }

        Commands::Show { county } => {
            let pipeline = AttendancePipeline::new(settings);
            match county {
                Some(name) => {
                    let attendance = pipeline.county_attendance(&name)?;
                    println!("{}", serde_json::to_string_pretty(&attendance)?);
                    match pipeline.county_results(&name) {
                        Ok(results) => println!("{}", serde_json::to_string_pretty(&results)?),
                        Err(e) => println!("Results: {}", e),
                    }
                }
                None => print_attendance(&pipeline.attendance()?),
            }
        }

        Commands::Status => {
            let pipeline = AttendancePipeline::new(settings);
            let updates = pipeline.last_updates();
            println!("Data directory:  {}", pipeline.settings().data_dir.display());
            println!("Attendance:      {}", updates.attendance_last_update);
            println!("Results:         {}", updates.results_last_update);
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    // A subscriber already installed (tests, embedding) is kept as is
    if installed.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
    Ok(())
}

fn update_cycle<R: Rng>(
    pipeline: &AttendancePipeline,
    fresh: bool,
    presence: Option<&Path>,
    rng: &mut R,
) -> Result<()> {
    if let Some(source) = presence {
        let outcome = pipeline.process_presence(Some(source), rng)?;
        let results = pipeline.update_results(rng)?;
        info!(
            source = %outcome.data_source,
            results = ?results,
            "Processed presence file"
        );
    } else if fresh {
        pipeline.generate_fresh(rng)?;
        info!("Generated fresh attendance and results");
    } else {
        let summary = pipeline.update_existing(rng)?;
        info!(
            attendance = ?summary.attendance,
            results = ?summary.results,
            "Updated existing tables"
        );
    }
    Ok(())
}

async fn cluster_file(
    settings: Settings,
    input: PathBuf,
    level: ClusterLevel,
    n_clusters: usize,
) -> Result<LevelClustering> {
    tokio::task::spawn_blocking(move || {
        let table = PresenceReader::new(settings.columns.clone()).read(&input)?;
        ClusteringEngine::new(settings.columns, settings.clustering).cluster(&table, level, n_clusters)
    })
    .await?
}

fn emit_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            CsvWriter::new().write_json(value, path)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn print_attendance(rows: &[CountyAggregate]) {
    if rows.is_empty() {
        println!("No attendance data");
        return;
    }

    println!(
        "\n{:<18} {:>12} {:>10} {:>8}",
        "County", "Registered", "Votes", "Turnout"
    );
    for row in rows {
        println!(
            "{:<18} {:>12} {:>10} {:>7.2}%",
            row.county, row.total_voters, row.votes_cast, row.attendance_percentage
        );
    }

    if rows.iter().any(|r| r.data_source == DataSource::Synthetic) {
        println!("(synthetic data)");
    }
}
