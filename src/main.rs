use std::env;

use anyhow::Context;
use quiz_srs::api::{app_router, ApiState};
use quiz_srs::config::Config;
use quiz_srs::db::Db;
use quiz_srs::import::{self, ImportFailure};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db = Db::new(&config.database_url).await?;

    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("import") => run_import(&db, &args[1..]).await,
        None | Some("serve") => serve(db, &config).await,
        Some(other) => {
            anyhow::bail!("unknown command '{}'; expected 'serve' or 'import <files...>'", other)
        }
    }
}

async fn serve(db: Db, config: &Config) -> anyhow::Result<()> {
    let app = app_router(ApiState { db });
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    log::info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_import(db: &Db, paths: &[String]) -> anyhow::Result<()> {
    if paths.is_empty() {
        anyhow::bail!("usage: quiz-srs import <file.json>...");
    }

    let mut items = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();
    for path in paths {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => items.push((path.clone(), contents)),
            Err(err) => {
                log::warn!("Could not read {}: {}", path, err);
                unreadable.push(ImportFailure {
                    source: path.clone(),
                    kind: "io".to_string(),
                    message: format!("The file could not be read: {}", err),
                });
            }
        }
    }

    let mut summary = import::import_batch(db, items).await;
    summary.error_count += unreadable.len();
    summary.failures.extend(unreadable);

    println!("{}", serde_json::to_string_pretty(&summary)?);
    println!(
        "Imported {} file(s), {} failed",
        summary.success_count, summary.error_count
    );
    Ok(())
}
