use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hearth_gateway::auth::{JwksIdentityResolver, OauthClient};
use hearth_gateway::stores::memory::{
    MemoryCredentialStore, MemoryRegistry, MemoryStateStore, StaticIdentityResolver,
};
use hearth_gateway::stores::{EndpointRegistry, IdentityResolver};
use hearth_gateway::{
    DirectiveRouter, EndpointRecord, EnvelopeShapeValidator, GatewayConfig, Services,
};

/// Hearth - smart-home directive gateway
#[derive(Parser)]
#[command(name = "hearth", version, about)]
struct Cli {
    /// Endpoints seed file (JSON array of endpoint records)
    #[arg(short, long, env = "HEARTH_ENDPOINTS")]
    endpoints: Option<PathBuf>,

    /// Directive document to route; reads stdin when omitted
    #[arg(short, long)]
    directive: Option<PathBuf>,

    /// Token accepted as the development user when no JWKS URL is set
    #[arg(long, default_value = "hearth-dev-token")]
    dev_token: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "directive processing failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();

    let registry = Arc::new(MemoryRegistry::new());
    if let Some(path) = &cli.endpoints {
        let records: Vec<EndpointRecord> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        for record in records {
            tracing::info!(endpoint_id = %record.endpoint_id, "seeding endpoint");
            registry.upsert_endpoint(record).await?;
        }
    }

    let identity: Arc<dyn IdentityResolver> = match &config.jwks_url {
        Some(jwks_url) => Arc::new(JwksIdentityResolver::new(jwks_url.clone())),
        None => Arc::new(StaticIdentityResolver::new().with_token(&cli.dev_token, "0")),
    };

    let services = Services {
        identity,
        registry,
        state: Arc::new(MemoryStateStore::new()),
        exchanger: Arc::new(OauthClient::new(config.token_url.clone())),
        credentials: Arc::new(MemoryCredentialStore::new()),
    };

    let router = DirectiveRouter::new(services, config.oauth)
        .with_validator(Arc::new(EnvelopeShapeValidator));

    let body = match &cli.directive {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let response = router.route(&body).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "hearth_gateway=info",
        1 => "hearth_gateway=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}
