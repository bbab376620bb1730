use clap::{Parser, Subcommand};
use doujin_scraper::app::ports::{DocumentStorePort, HttpClientPort, ObjectStorePort};
use doujin_scraper::config::{Config, ObjectBackend};
use doujin_scraper::infra::{JsonFileDocumentStore, LocalObjectStore, ReqwestHttp, SupabaseObjectStore};
use doujin_scraper::scheduler::Scheduler;
use doujin_scraper::{logging, server, telemetry, Pipeline};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "doujin_scraper")]
#[command(about = "doujin.com.tw event listing scraper")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scrape and exit
    Run,
    /// Serve the on-demand HTTP trigger (and the daily schedule)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(long)]
        port: Option<u16>,
        /// Do not start the daily scheduler alongside the server
        #[arg(long)]
        no_schedule: bool,
    },
    /// Run only the daily scheduler
    Schedule,
}

fn images_dir(config: &Config) -> PathBuf {
    Path::new(&config.storage.data_dir).join("images")
}

fn build_pipeline(config: &Config) -> anyhow::Result<Arc<Pipeline>> {
    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(
        &config.scraper.user_agent,
        config.scraper.timeout(),
    )?);
    let store: Arc<dyn DocumentStorePort> =
        Arc::new(JsonFileDocumentStore::new(&config.storage.data_dir));
    let objects: Arc<dyn ObjectStorePort> = match config.storage.object_backend {
        ObjectBackend::Local => Arc::new(LocalObjectStore::new(
            images_dir(config),
            config.storage.public_base_url.clone(),
        )),
        ObjectBackend::Supabase => Arc::new(SupabaseObjectStore::from_env()?),
    };
    Ok(Arc::new(Pipeline::from_config(config, http, store, objects)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let _log_guard = logging::init_logging(&config.logging);
    info!("Loaded config from {:?}", cli.config);
    let pipeline = build_pipeline(&config)?;

    match cli.command {
        Commands::Run => match pipeline.run().await {
            Ok(summary) => {
                println!("✅ {}", summary.message);
                if summary.skipped_cards > 0 {
                    println!("⚠️  {} event cards could not be parsed", summary.skipped_cards);
                }
            }
            Err(e) => {
                error!("Scrape failed: {}", e);
                return Err(e.into());
            }
        },
        Commands::Serve { port, no_schedule } => {
            telemetry::init_metrics();
            if !no_schedule {
                let scheduler = Scheduler::new(pipeline.clone(), config.schedule.clone());
                tokio::spawn(async move {
                    if let Err(e) = scheduler.run_forever().await {
                        error!("Scheduler stopped: {}", e);
                    }
                });
            }
            let images = match config.storage.object_backend {
                ObjectBackend::Local => Some(images_dir(&config)),
                ObjectBackend::Supabase => None,
            };
            server::start_server(pipeline, images, port.unwrap_or(config.server.port)).await?;
        }
        Commands::Schedule => {
            telemetry::init_metrics();
            info!("Starting daily scheduler");
            Scheduler::new(pipeline, config.schedule.clone())
                .run_forever()
                .await?;
        }
    }
    Ok(())
}
