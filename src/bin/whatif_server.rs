//! What-if scenario server
//!
//! Serves the scenario engine over REST with an in-memory record store.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retail_whatif::config::{load_baseline_file, EngineConfig, DEFAULT_AUTHOR};
use retail_whatif::storage::InMemoryScenarioStore;
use retail_whatif::{transport, ProbabilityModel, ScenarioManager};

#[derive(Parser, Debug)]
#[command(name = "whatif-server")]
#[command(about = "What-if scenario simulation server for retail planning", version)]
struct Cli {
    /// TCP address to bind the web server
    #[arg(long, env = "WHATIF_BIND", default_value = "0.0.0.0:3131")]
    bind: SocketAddr,

    /// JSON file holding baseline financials
    #[arg(long, env = "WHATIF_BASELINE_FILE")]
    baseline_file: Option<PathBuf>,

    /// Override the baseline monthly revenue
    #[arg(long, env = "WHATIF_MONTHLY_REVENUE")]
    monthly_revenue: Option<f64>,

    /// Override the baseline margin rate (0..1)
    #[arg(long, env = "WHATIF_MARGIN_RATE")]
    margin_rate: Option<f64>,

    /// Probability model: `fixed`, `fixed:<p>` or `roi-banded`
    #[arg(long, env = "WHATIF_PROBABILITY_MODEL", default_value = "fixed")]
    probability_model: ProbabilityModel,

    /// Author recorded when a request does not name one
    #[arg(long, env = "WHATIF_DEFAULT_AUTHOR", default_value = DEFAULT_AUTHOR)]
    default_author: String,
}

impl Cli {
    fn engine_config(&self) -> retail_whatif::ScenarioResult<EngineConfig> {
        let mut baseline = match &self.baseline_file {
            Some(path) => load_baseline_file(path)?,
            None => retail_whatif::BaselineFinancials::default(),
        };
        if let Some(revenue) = self.monthly_revenue {
            baseline.monthly_revenue = revenue;
        }
        if let Some(rate) = self.margin_rate {
            baseline.margin_rate = rate;
        }

        let config = EngineConfig {
            baseline,
            probability_model: self.probability_model,
            default_created_by: self.default_author.clone(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Resolves once `signal` fires. If the handler cannot be installed the
/// server keeps running without graceful shutdown.
async fn shutdown_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("Shutting down"),
        Err(err) => {
            error!("Failed to listen for ctrl-c, graceful shutdown disabled: {err}");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retail_whatif=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match cli.engine_config() {
        Ok(config) => config,
        Err(err) => {
            error!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };
    info!(
        monthly_revenue = config.baseline.monthly_revenue,
        margin_rate = config.baseline.margin_rate,
        stores = config.baseline.stores.len(),
        probability_model = %config.probability_model,
        "baseline loaded"
    );

    let manager = ScenarioManager::new(Arc::new(InMemoryScenarioStore::new()), config);
    let app = transport::router(manager);

    let listener = match TcpListener::bind(cli.bind).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {}: {err}", cli.bind);
            std::process::exit(1);
        }
    };

    info!("What-if server v{} listening on http://{}", env!("CARGO_PKG_VERSION"), cli.bind);

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(signal::ctrl_c()))
        .await
    {
        error!("Server error: {err}");
        std::process::exit(1);
    }
}
