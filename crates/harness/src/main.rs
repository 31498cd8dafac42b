use std::path::PathBuf;

use clap::Parser;
use epigraph_harness::{load_fixture, run_fixture};
use epigraph_migration::{Migrator, MigratorTrait};
use epigraph_shared::APP_ENV;
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Loads fixture episodes, runs them through the ingestion pipeline, and
/// diffs the resulting graph against each fixture's `expectations.yaml`.
#[derive(Parser)]
#[command(name = "epigraph-harness")]
struct Cli {
  /// A single fixture directory, or a directory of fixture directories.
  path: PathBuf,
}

fn discover_fixtures(path: &PathBuf) -> std::io::Result<Vec<PathBuf>> {
  if path.join("episode.json").exists() {
    return Ok(vec![path.clone()]);
  }

  let mut fixtures = Vec::new();
  for entry in std::fs::read_dir(path)? {
    let entry = entry?;
    if entry.path().join("episode.json").exists() {
      fixtures.push(entry.path());
    }
  }
  fixtures.sort();
  Ok(fixtures)
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}=debug", env!("CARGO_CRATE_NAME")).into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cli = Cli::parse();

  let fixture_dirs = match discover_fixtures(&cli.path) {
    Ok(dirs) if !dirs.is_empty() => dirs,
    Ok(_) => {
      eprintln!("no fixtures found under {}", cli.path.display());
      return std::process::ExitCode::from(2);
    }
    Err(e) => {
      eprintln!("failed to read {}: {e}", cli.path.display());
      return std::process::ExitCode::from(2);
    }
  };

  let db = match Database::connect(APP_ENV.database_url.as_str()).await {
    Ok(db) => db,
    Err(e) => {
      eprintln!("database connection failed: {e}");
      return std::process::ExitCode::from(2);
    }
  };

  if let Err(e) = Migrator::up(&db, None).await {
    eprintln!("migration failed: {e}");
    return std::process::ExitCode::from(2);
  }

  let mut any_failed = false;

  for dir in fixture_dirs {
    let fixture = match load_fixture(&dir) {
      Ok(f) => f,
      Err(e) => {
        eprintln!("[{}] load error: {e}", dir.display());
        return std::process::ExitCode::from(2);
      }
    };

    let result = match run_fixture(&db, &fixture).await {
      Ok(r) => r,
      Err(e) => {
        eprintln!("[{}] pipeline error: {e}", fixture.name);
        return std::process::ExitCode::from(2);
      }
    };

    if result.passed() {
      println!("PASS {}", result.name);
    } else {
      any_failed = true;
      println!("FAIL {}", result.name);
      for failure in &result.failures {
        println!("  [{}/{}] {}", failure.category, failure.kind, failure.message);
      }
    }
  }

  if any_failed { std::process::ExitCode::from(1) } else { std::process::ExitCode::SUCCESS }
}
