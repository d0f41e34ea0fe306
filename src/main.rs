use anyhow::{bail, Context};
use clap::Parser;
use fs_err as fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

mod chat;
mod cli;
mod config;
mod errors;
mod flight;
mod identify;
mod log;
mod prompt;
mod provider;
mod store;
mod ux;
mod wire;

use cli::Command;
use config::Config;
use store::{FileSlot, PlantStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    log::init_tracing(args.debug);

    let cfg = Config::resolve(&args, |k| std::env::var(k).ok())?;
    tracing::debug!(data_dir = %cfg.data_dir.display(), provider = ?cfg.provider, "config resolved");

    let store = Arc::new(PlantStore::new(FileSlot::new(&cfg.data_dir)));
    let exchange_log = log::ExchangeLog::new(&cfg.data_dir, cfg.save_request, cfg.save_response);

    match args.command {
        Command::Identify { image } => {
            let prov = provider::make_provider(&cfg, &cfg.model)?;
            let flow = identify::IdentificationFlow::new(store, prov).with_exchange_log(exchange_log);

            let pb = ux::spinner("Analyzing your plant...");
            let outcome = flow.identify(&image).await;
            pb.finish_and_clear();
            tracing::debug!(state = ?flow.state(), "identification finished");

            match outcome {
                Ok(record) => ux::show_plant(&record),
                Err(e) => {
                    ux::show_failure(identify::FAILURE_NOTICE);
                    return Err(e).with_context(|| format!("identifying {}", image.display()));
                }
            }
        }

        Command::Gallery => ux::show_gallery(&store.load()),

        Command::Show { index, save_image } => {
            let Some(plant) = store.get(index) else {
                bail!("no plant at index {index}");
            };
            ux::show_plant(&plant);
            if let Some(out) = save_image {
                export_image(&plant, &out)?;
                println!("photo written to {}", out.display());
            }
        }

        Command::Delete { index, yes } => {
            let plants = store.load();
            let Some(plant) = plants.get(index) else {
                println!("No plant at index {index}; gallery unchanged.");
                return Ok(());
            };
            if !yes && !ux::confirm(&format!("Delete {} ({})?", plant.name, plant.scientific_name)) {
                println!("Aborted by user.");
                return Ok(());
            }
            let remaining = store.remove_at(index).context("deleting plant")?;
            ux::show_gallery(&remaining);
        }

        Command::Chat => {
            let prov = provider::make_provider(&cfg, &cfg.chat_model)?;
            let session = chat::ChatSession::new(store.clone(), prov).with_exchange_log(exchange_log);
            run_chat(&session, &store).await?;
        }

        Command::Watch => {
            ux::show_gallery(&store.load());
            let id = store.on_external_change(|plants| ux::show_gallery(plants));
            let handle = store::spawn_watcher(store.clone(), Duration::from_millis(cfg.watch_interval_ms));
            tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
            handle.abort();
            store.unsubscribe(id);
        }
    }

    Ok(())
}

async fn run_chat(session: &chat::ChatSession, store: &PlantStore) -> anyhow::Result<()> {
    ux::chat_banner(chat::greeting(store.load().len()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        ux::chat_prompt();
        let Some(line) = lines.next_line().await.context("reading chat input")? else {
            break;
        };
        let input = line.trim();
        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }
        let pb = ux::spinner("Thinking...");
        let outcome = session.submit(&line).await;
        pb.finish_and_clear();
        if let chat::ChatOutcome::Replied(reply) = outcome {
            ux::show_chat_message(&reply);
        }
    }
    tracing::debug!(messages = session.messages().len(), "chat closed");
    Ok(())
}

fn export_image(plant: &wire::PlantRecord, out: &Path) -> anyhow::Result<()> {
    let bytes = plant.encoded_image()?.decode()?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(out, bytes)?;
    Ok(())
}
