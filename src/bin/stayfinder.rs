use std::path::PathBuf;

use clap::Parser;
use stayfinder_rs::config::{ConfigOverrides, DependentsOverrides, StayConfig, TracingOverrides};
use stayfinder_rs::dispatch::{self, Role};
use stayfinder_rs::telemetry;
use tracing::{error, info};

/// stayfinder - run one role of the hotel search fleet
#[derive(Debug, Parser)]
#[command(name = "stayfinder", version)]
struct Cli {
    /// Role to run: geo, rate, profile, search or frontend
    role: String,

    /// Path to config file (TOML)
    #[arg(short, long, env = "STAYFINDER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port [default: 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// OTLP/gRPC endpoint of the span collector
    #[arg(long)]
    collector: Option<String>,

    /// Geo dependent address [default: geo:8080]
    #[arg(long)]
    geoaddr: Option<String>,

    /// Rate dependent address [default: rate:8080]
    #[arg(long)]
    rateaddr: Option<String>,

    /// Profile dependent address [default: profile:8080]
    #[arg(long)]
    profileaddr: Option<String>,

    /// Search dependent address [default: search:8080]
    #[arg(long)]
    searchaddr: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let dependents = DependentsOverrides {
            geo: self.geoaddr.clone(),
            rate: self.rateaddr.clone(),
            profile: self.profileaddr.clone(),
            search: self.searchaddr.clone(),
        };
        let has_dependents = dependents.geo.is_some()
            || dependents.rate.is_some()
            || dependents.profile.is_some()
            || dependents.search.is_some();

        ConfigOverrides {
            port: self.port,
            tracing: self.collector.clone().map(|collector| TracingOverrides {
                collector: Some(collector),
            }),
            dependents: has_dependents.then_some(dependents),
        }
    }
}

/// Resolve the role, then the configuration. An unknown role fails before any
/// configuration is read.
fn prepare(cli: &Cli) -> anyhow::Result<(Role, StayConfig)> {
    let role: Role = cli.role.parse()?;
    // Load config: CLI > Env > File > Defaults
    let config = StayConfig::load(cli.config.as_deref(), cli.overrides())?;
    Ok((role, config))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (role, config) = prepare(&cli)?;
    telemetry::init_logging(&config.log);

    info!(%role, addr = %config.listen_addr(), "starting");
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown requested");
    };

    if let Err(err) = dispatch::run(role, config, shutdown).await {
        error!(%role, error = %err, "role failed");
        return Err(err.into());
    }
    Ok(())
}
