use clap::Parser;
use pretty_assertions::assert_eq;
use presence_processor::analyzers::ClusteringEngine;
use presence_processor::cli::{run, Cli};
use presence_processor::models::{ClusterLevel, DataSource};
use presence_processor::processors::{AttendancePipeline, TableUpdate};
use presence_processor::readers::{read_attendance, PresenceReader};
use presence_processor::{ClusteringSettings, ColumnMapping, Result, Settings};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

const HEADER: &str = "Judet,Localitate,Nr sectie de votare,Nume sectie de votare,Mediu,\
Înscriși pe liste permanente,LT,LP,Barbati 18-24,Barbati 25-34,Barbati 35-44,Barbati 45-64,\
Barbati 65+,Femei 18-24,Femei 25-34,Femei 35-44,Femei 45-64,Femei 65+";

/// One presence row: the young/old split is mirrored across genders
fn station_row(county: &str, town: &str, id: u32, kind: &str, young: u64, old: u64) -> String {
    let votes = 2 * (young + old);
    format!(
        "{county},{town},{id},Scoala {id},{kind},{},{votes},{votes},{young},0,0,0,{old},{young},0,0,0,{old}",
        votes * 2
    )
}

fn write_presence(path: &Path, rows: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "{}", HEADER)?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}

fn sample_rows() -> Vec<String> {
    vec![
        station_row("ALBA", "Alba Iulia", 1, "U", 80, 20),
        station_row("ALBA", "Alba Iulia", 2, "U", 70, 30),
        station_row("ALBA", "Blaj", 3, "R", 60, 40),
        station_row("CLUJ", "Cluj-Napoca", 4, "U", 20, 80),
        station_row("CLUJ", "Dej", 5, "R", 30, 70),
        station_row("CLUJ", "Dej", 6, "R", 25, 75),
        station_row("OLT", "Slatina", 7, "U", 50, 50),
        station_row("OLT", "Caracal", 8, "R", 45, 55),
        station_row("OLT", "Caracal", 9, "R", 55, 45),
    ]
}

fn settings_for(dir: &TempDir) -> Settings {
    Settings::default().with_data_dir(dir.path().to_path_buf())
}

#[test]
fn test_presence_to_demographic_report() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_for(&dir);
    write_presence(&settings.presence_path(), &sample_rows())?;

    let pipeline = AttendancePipeline::new(settings);
    let outcome = pipeline.process_presence(None, &mut StdRng::seed_from_u64(3))?;
    assert_eq!(outcome.data_source, DataSource::Presence);
    assert!(outcome.archived_copy.is_some());

    let counties: Vec<&str> = outcome.aggregates.iter().map(|a| a.county.as_str()).collect();
    assert_eq!(counties, vec!["Alba", "Cluj", "Olt"]);

    let alba = pipeline.county_attendance("alba")?;
    assert_eq!(alba.votes_cast, 600);
    assert_eq!(alba.total_voters, 1200);
    assert_eq!(alba.attendance_percentage, 50.0);
    assert_eq!(alba.male_voters, Some(300));
    assert_eq!(alba.urban_stations, Some(2));
    assert_eq!(alba.rural_stations, Some(1));

    let report = pipeline.demographic_report()?;
    assert_eq!(report.counties.len(), 3);
    assert_eq!(report.national.totals.total_votes, 1800);
    assert_eq!(report.national.percentages.male, Some(50.0));
    assert_eq!(report.national.percentages.female, Some(50.0));
    assert!(report.has_urban_rural_data);
    assert!(report.urban_rural_estimated);
    assert_eq!(report.data_source, DataSource::Presence);

    let json = serde_json::to_value(&report)?;
    assert_eq!(json["national"]["male_percentage"], 50.0);
    assert_eq!(json["data_source"], "presence");
    Ok(())
}

#[test]
fn test_direct_urban_rural_split() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_for(&dir);
    write_presence(&settings.presence_path(), &sample_rows())?;

    let pipeline = AttendancePipeline::new(settings).with_direct_urban_rural(true);
    pipeline.process_presence(None, &mut StdRng::seed_from_u64(3))?;

    let report = pipeline.demographic_report()?;
    assert!(!report.urban_rural_estimated);
    let split = report.national.totals.urban_rural.expect("direct split");
    assert_eq!(split.urban.votes + split.rural.votes, 1800);
    // U stations: 1, 2, 4, 7
    assert_eq!(split.urban.votes, 200 + 200 + 200 + 200);
    Ok(())
}

#[test]
fn test_windows_1250_presence_with_cedillas() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_for(&dir);
    std::fs::create_dir_all(dir.path())?;

    // Legacy exports spell s-comma with a cedilla, which Windows-1250 can encode
    let text = format!(
        "{}\n{}\n{}\n",
        HEADER.replace('ș', "ş"),
        station_row("TIMIŞ", "Timişoara", 1, "U", 40, 10),
        station_row("Timiş", "Lugoj", 2, "R", 30, 20),
    );
    let (bytes, _, unmappable) = encoding_rs::WINDOWS_1250.encode(&text);
    assert!(!unmappable);
    assert!(std::str::from_utf8(&bytes).is_err());
    std::fs::write(settings.presence_path(), &bytes)?;

    let pipeline = AttendancePipeline::new(settings);
    let outcome = pipeline.process_presence(None, &mut StdRng::seed_from_u64(3))?;
    assert_eq!(outcome.data_source, DataSource::Presence);

    let counties: Vec<&str> = outcome.aggregates.iter().map(|a| a.county.as_str()).collect();
    assert_eq!(counties, vec!["Timis"]);
    let timis = pipeline.county_attendance("timis")?;
    assert_eq!(timis.votes_cast, 200);
    assert_eq!(timis.total_voters, 400);
    Ok(())
}

#[test]
fn test_unusable_presence_falls_back() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_for(&dir);
    let path = settings.presence_path();
    std::fs::create_dir_all(dir.path())?;
    std::fs::write(&path, "Judet,Înscriși pe liste permanente\nCLUJ,100\n")?;

    let pipeline = AttendancePipeline::new(settings);
    let outcome = pipeline.process_presence(None, &mut StdRng::seed_from_u64(5))?;

    assert_eq!(outcome.data_source, DataSource::Synthetic);
    assert_eq!(outcome.aggregates.len(), 42);
    assert!(outcome.fallback_reason.unwrap().contains("LT"));

    let stored = read_attendance(&outcome.output)?;
    assert_eq!(stored.len(), 42);
    assert!(stored.iter().all(|r| r.votes_cast <= r.total_voters));
    Ok(())
}

#[test]
fn test_clustering_at_every_level() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("Cluster").join("presence_now.csv");
    write_presence(&path, &sample_rows())?;

    let table = PresenceReader::new(ColumnMapping::default()).read(&path)?;
    let engine = ClusteringEngine::new(ColumnMapping::default(), ClusteringSettings::default());

    for (level, units) in [
        (ClusterLevel::County, 3),
        (ClusterLevel::Town, 6),
        (ClusterLevel::Polling, 9),
    ] {
        let clustering = engine.cluster(&table, level, 2)?;
        assert_eq!(clustering.cluster_level, level);
        assert_eq!(clustering.result.clustered_data.len(), units);
        assert_eq!(clustering.result.n_clusters, 2);
        assert!(clustering.result.warnings.is_empty());

        let json = serde_json::to_value(&clustering)?;
        let first = &json["clustered_data"][0];
        assert!(first.get("county").is_some());
        assert_eq!(first.get("town").is_some(), level != ClusterLevel::County);
        assert_eq!(first.get("polling_station").is_some(), level == ClusterLevel::Polling);
        assert!(json["cluster_centers"]["0"].get("male_18_24_pct").is_some());
    }

    // Young-leaning and old-leaning counties land in different clusters
    let counties = engine.cluster(&table, ClusterLevel::County, 2)?;
    let label = |name: &str| {
        counties
            .result
            .clustered_data
            .iter()
            .find(|u| u.key.county == name)
            .map(|u| u.cluster)
    };
    assert_ne!(label("Alba"), label("Cluj"));
    Ok(())
}

#[test]
fn test_clustering_is_reproducible() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("presence.csv");
    write_presence(&path, &sample_rows())?;
    let table = PresenceReader::new(ColumnMapping::default()).read(&path)?;

    let single = ClusteringSettings {
        max_workers: 1,
        ..Default::default()
    };
    let a = ClusteringEngine::new(ColumnMapping::default(), single)
        .cluster(&table, ClusterLevel::Polling, 3)?;
    let b = ClusteringEngine::new(ColumnMapping::default(), ClusteringSettings::default())
        .cluster(&table, ClusterLevel::Polling, 3)?;

    assert_eq!(serde_json::to_value(&a)?, serde_json::to_value(&b)?);
    Ok(())
}

#[test]
fn test_repeated_updates_keep_shares_normalized() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = AttendancePipeline::new(settings_for(&dir));
    let mut rng = StdRng::seed_from_u64(11);

    pipeline.generate_fresh(&mut rng)?;
    let before = pipeline.attendance()?;

    for _ in 0..2 {
        let summary = pipeline.update_existing(&mut rng)?;
        assert_eq!(summary.attendance, TableUpdate::Updated);
        assert_eq!(summary.results, TableUpdate::Updated);
    }

    for row in pipeline.results()? {
        assert!((row.share_total() - 100.0).abs() <= 0.1, "{:?}", row);
    }
    for (old, new) in before.iter().zip(pipeline.attendance()?.iter()) {
        assert_eq!(old.county, new.county);
        assert!(new.votes_cast >= old.votes_cast);
        assert!(new.votes_cast <= new.total_voters);
    }
    Ok(())
}

#[tokio::test]
async fn test_cli_update_then_status() -> Result<()> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().to_string_lossy().to_string();

    let cli = Cli::try_parse_from(["presence-processor", "--data-dir", data_dir.as_str(), "update", "--fresh"])
        .expect("valid arguments");
    run(cli).await?;

    let settings = settings_for(&dir);
    assert_eq!(read_attendance(&settings.attendance_path())?.len(), 42);
    assert!(settings.results_path().exists());

    let report_path = dir.path().join("report.json");
    let report_arg = report_path.to_string_lossy().to_string();
    let cli = Cli::try_parse_from([
        "presence-processor",
        "--data-dir",
        data_dir.as_str(),
        "demographics",
        "--output",
        report_arg.as_str(),
    ])
    .expect("valid arguments");
    run(cli).await?;

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report_path)?)?;
    assert_eq!(report["counties"].as_array().map(Vec::len), Some(42));
    assert_eq!(report["data_source"], "synthetic");

    let cli = Cli::try_parse_from(["presence-processor", "--data-dir", data_dir.as_str(), "status"])
        .expect("valid arguments");
    run(cli).await?;
    Ok(())
}

#[tokio::test]
async fn test_cli_cluster_writes_json() -> Result<()> {
    let dir = TempDir::new()?;
    let settings = settings_for(&dir);
    write_presence(&settings.cluster_path(), &sample_rows())?;

    let data_dir = dir.path().to_string_lossy().to_string();
    let output = dir.path().join("clusters.json");
    let output_arg = output.to_string_lossy().to_string();
    let cli = Cli::try_parse_from([
        "presence-processor",
        "--data-dir",
        data_dir.as_str(),
        "cluster",
        "--level",
        "town",
        "-k",
        "10",
        "--output",
        output_arg.as_str(),
    ])
    .expect("valid arguments");
    run(cli).await?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(json["cluster_level"], "town");
    assert_eq!(json["requested_clusters"], 10);
    assert_eq!(json["n_clusters"], 5);
    assert_eq!(json["warnings"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn test_cli_show_county() -> Result<()> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().to_string_lossy().to_string();
    let config = dir.path().join("missing.toml");
    let config_arg = config.to_string_lossy().to_string();

    let cli = Cli::try_parse_from(["presence-processor", "--data-dir", data_dir.as_str(), "update", "--fresh"])
        .expect("valid arguments");
    run(cli).await?;

    let cli = Cli::try_parse_from([
        "presence-processor",
        "-c",
        config_arg.as_str(),
        "--data-dir",
        data_dir.as_str(),
        "show",
        "--county",
        "cluj",
    ])
    .expect("valid arguments");
    run(cli).await?;

    let cli = Cli::try_parse_from(["presence-processor", "--data-dir", data_dir.as_str(), "show", "--county", "Atlantis"])
        .expect("valid arguments");
    assert!(run(cli).await.is_err());

    let cli = Cli::try_parse_from(["presence-processor", "--data-dir", data_dir.as_str(), "show"])
        .expect("valid arguments");
    run(cli).await?;
    Ok(())
}
