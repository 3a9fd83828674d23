use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use memsync_core::{AppBuilder, Config, observability};

const USAGE: &str = "\
usage: memsync <command>

commands:
  worker                     run the background sync loop until Ctrl-C
  save <project> <content>   queue a memory and report queue health
  status                     print the queue status report
  dlq                        list dead-lettered entries and their next retry

environment:
  MEMSYNC_CONFIG             path to a JSON config file
  MEMSYNC_DATA_DIR           directory holding the queue files (default ~/.claude)
  MEMSYNC_API_URL            memory backend base URL
  RUST_LOG                   log filter (default info)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var_os("MEMSYNC_CONFIG").map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("failed to load configuration")?;
    observability::init(config.json_logs);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let app = AppBuilder::new(config).build().context("failed to build app")?;

    match args.first().map(String::as_str) {
        Some("worker") => {
            tracing::info!(
                api_url = %app.config().api_url,
                data_dir = %app.config().data_dir.display(),
                "memsync worker"
            );
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let worker = tokio::spawn(app.worker().run(shutdown_rx));

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);

            worker.await.context("sync worker task panicked")?;
        }
        Some("save") => {
            let Some(project) = args.get(1) else {
                bail!("{USAGE}");
            };
            let content = args[2..].join(" ");
            if content.trim().is_empty() {
                bail!("nothing to save\n\n{USAGE}");
            }

            let receipt = app
                .producer()
                .save(project.as_str(), content)
                .await
                .context("failed to queue memory")?;
            println!("{receipt}");
        }
        Some("status") => {
            let status = app
                .producer()
                .status()
                .await
                .context("failed to read queue status")?;
            println!("{status}");

            if let Some(snapshot) = app.metrics().load() {
                println!();
                println!(
                    "Worker last reported {} (backend {}, {} queued, {} dead letters)",
                    snapshot.last_update.format("%Y-%m-%d %H:%M:%S UTC"),
                    snapshot.vps_status,
                    snapshot.queue_size,
                    snapshot.dlq_size
                );
            }
        }
        Some("dlq") => {
            let dead_letters = app.dead_letters();
            let items = dead_letters.load();
            if items.is_empty() {
                println!("Dead-letter queue is empty");
                return Ok(());
            }

            println!("{} dead-lettered entries", items.len());
            for item in &items {
                let next = format_epoch(dead_letters.next_retry_at(item));
                println!(
                    "  {}  project={}  failures={}  next retry {}",
                    item.id().short(),
                    item.entry.project_id,
                    item.backoff_exponent(),
                    next
                );
            }
        }
        _ => bail!("{USAGE}"),
    }

    Ok(())
}

fn format_epoch(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
