use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use secrets_core::{HttpTransport, K8sSecretDatabase, KubeConfig, Secret, SecretDatabase};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Parser)]
#[command(name = "secrets-cli", version, about = "Secret manager admin CLI")]
struct Cli {
    #[command(flatten)]
    credential: CredentialArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct CredentialArgs {
    /// Bearer token to authenticate with
    #[arg(long, global = true, env = "SECRET_MANAGER_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// File holding the bearer token
    #[arg(long, global = true, default_value = SERVICE_ACCOUNT_TOKEN_PATH)]
    token_file: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Create a secret; the value is read from stdin unless --value is given
    Save(SaveArgs),
    /// Print one secret as JSON
    Get {
        #[arg(long)]
        namespace: String,
        #[arg(long)]
        name: String,
    },
    /// Print every secret in a namespace as JSON
    List {
        #[arg(long)]
        namespace: String,
    },
    /// Print every secret in the cluster with values cleared
    ListAll,
}

#[derive(Args)]
struct SaveArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    namespace: String,
    #[arg(long)]
    value: Option<String>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = real_main().await {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let token = cli.credential.resolve()?;
    let config = KubeConfig::from_env().context("invalid kubernetes settings")?;
    let transport = HttpTransport::from_config(&config)?;
    let database = K8sSecretDatabase::new(transport, token);

    match cli.command {
        Command::Save(args) => {
            let value = match args.value {
                Some(value) => value,
                None => read_stdin_value()?,
            };
            let secret = Secret::plain(args.id, args.name, args.namespace, value);
            let label = secret.to_string();
            database
                .save(secret)
                .await
                .with_context(|| format!("failed to save {label}"))?;
            println!("saved {label}");
        }
        Command::Get { namespace, name } => {
            let secret = database
                .get(&namespace, &name)
                .await
                .with_context(|| format!("failed to get {namespace}/{name}"))?;
            println!("{}", serde_json::to_string_pretty(&secret)?);
        }
        Command::List { namespace } => {
            let secrets = database
                .list(&namespace)
                .await
                .with_context(|| format!("failed to list {namespace}"))?;
            println!("{}", serde_json::to_string_pretty(&secrets)?);
        }
        Command::ListAll => {
            let secrets = database
                .list_all_namespace_for_admin()
                .await
                .context("failed to list secrets across namespaces")?;
            println!("{}", serde_json::to_string_pretty(&secrets)?);
        }
    }
    Ok(())
}

impl CredentialArgs {
    fn resolve(&self) -> Result<String> {
        if let Some(token) = self.token.as_deref().filter(|token| !token.is_empty()) {
            return Ok(token.to_string());
        }
        let raw = fs::read_to_string(&self.token_file)
            .with_context(|| format!("failed to read token file {}", self.token_file.display()))?;
        let token = raw.trim();
        if token.is_empty() {
            bail!("token file {} is empty", self.token_file.display());
        }
        Ok(token.to_string())
    }
}

fn read_stdin_value() -> Result<String> {
    let mut value = String::new();
    io::stdin()
        .read_to_string(&mut value)
        .context("failed to read secret value from stdin")?;
    if value.ends_with('\n') {
        value.pop();
        if value.ends_with('\r') {
            value.pop();
        }
    }
    Ok(value)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}
