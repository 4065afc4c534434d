use decomp_diff::api::build_router;
use decomp_diff::logging::setup_logging;
use decomp_diff::manifest::Manifest;
use decomp_diff::notify::WebhookNotifier;
use decomp_diff::pipeline::Pipeline;
use decomp_diff::process::SystemRunner;
use decomp_diff::queue::task_queue;
use decomp_diff::worker::run_worker;
use decomp_diff::{AppState, load_config};
use std::sync::Arc;
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "diff_config.toml";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("DIFF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = match load_config(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match setup_logging(config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Using config at {:?}", config_path);
    info!("Work directory: {}", config.work_dir.display());

    let manifest = match Manifest::load(&config.manifest_path()).await {
        Ok(manifest) if !manifest.is_empty() => manifest,
        Ok(_) => {
            error!("Manifest {} lists no artifacts", config.manifest_path().display());
            std::process::exit(1);
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if config.notify.webhook_url.is_none() {
        warn!("No notification webhook configured; diffs will be published silently");
    }

    let client = reqwest::Client::new();
    match manifest.ensure_cached(&client, &config.input_dir()).await {
        Ok(downloaded) => info!(
            "{} manifest artifacts cached ({} downloaded)",
            manifest.entries().len(),
            downloaded
        ),
        Err(e) => {
            error!("Failed to populate {}: {}", config.input_dir().display(), e);
            std::process::exit(1);
        }
    }

    let (tasks, receiver) = task_queue();
    let pipeline = Pipeline::new(
        &config,
        SystemRunner,
        WebhookNotifier::new(client, config.notify.clone()),
    );
    tokio::spawn(run_worker(pipeline, receiver));

    let state = Arc::new(AppState::new(config.secret.clone(), tasks));
    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Cannot bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", bind_address);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
