use clap::Parser;
use secrets_broker::BrokerConfig;
use secrets_broker::config::BIND_ADDRESS_ENV;
use std::process;

/// Serves namespaced secrets stored as Kubernetes Secret resources.
#[derive(Parser)]
#[command(name = "secrets-broker", version)]
struct BrokerArgs {
    /// Address to listen on [default: 0.0.0.0:8080]
    #[arg(long, env = BIND_ADDRESS_ENV)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = real_main().await {
        eprintln!("broker exited with error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> anyhow::Result<()> {
    let args = BrokerArgs::parse();
    secrets_broker::telemetry::init()?;
    let config = BrokerConfig::resolve(args.bind)?;
    secrets_broker::run(config).await
}
