//! esdb HTTP probe
//!
//! Usage:
//!   esdb-http --url http://localhost:2113/info
//!   esdb-http --url http://localhost:2113/streams/orders --user admin --password changeit
//!   esdb-http --method post --url http://localhost:2113/streams/orders \
//!             --content-type application/vnd.eventstore.events+json --body '[...]'
//!   esdb-http --url http://10.0.0.5:2113/gossip --host-header node1:2113 --timeout-secs 2

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use esdb_http::{HttpAsyncClient, HttpClientConfig, HttpError, HttpResponse, UserCredentials};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "esdb-http")]
#[command(about = "Send a single request through the esdb HTTP transport", long_about = None)]
#[command(version)]
struct Cli {
    /// Absolute request URL
    #[arg(long)]
    url: String,

    /// HTTP method
    #[arg(long, value_enum, default_value_t = Method::Get)]
    method: Method,

    /// Request body (POST/PUT)
    #[arg(long)]
    body: Option<String>,

    /// Content-Type of the body (POST/PUT)
    #[arg(long, default_value = "application/json")]
    content_type: String,

    /// Username for Basic authentication
    #[arg(long, requires = "password")]
    user: Option<String>,

    /// Password for Basic authentication
    #[arg(long, requires = "user")]
    password: Option<String>,

    /// Override the Host header (GET only)
    #[arg(long)]
    host_header: Option<String>,

    /// Request timeout in seconds (defaults to ESDB_HTTP_TIMEOUT_SECS or 30)
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Get,
    Post,
    Put,
    Delete,
}

enum Outcome {
    Success(HttpResponse),
    Failure(HttpError),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let mut config = HttpClientConfig::from_env().context("invalid environment configuration")?;
    if let Some(secs) = cli.timeout_secs {
        if !secs.is_finite() || secs <= 0.0 {
            bail!("--timeout-secs must be a positive number, got {}", secs);
        }
        config = config.timeout_secs(secs);
    }
    let client = HttpAsyncClient::new(config).context("failed to create HTTP client")?;

    let credentials = match (&cli.user, &cli.password) {
        (Some(user), Some(password)) => Some(UserCredentials::new(user, password)),
        _ => None,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let failure_tx = tx.clone();
    let on_success = move |response| {
        let _ = tx.send(Outcome::Success(response));
    };
    let on_failure = move |error| {
        let _ = failure_tx.send(Outcome::Failure(error));
    };

    let body = || cli.body.as_deref().context("--body is required for POST and PUT");
    match cli.method {
        Method::Get => client.get(
            &cli.url,
            credentials.as_ref(),
            on_success,
            on_failure,
            cli.host_header.as_deref(),
        ),
        Method::Post => client.post(
            &cli.url,
            body()?,
            &cli.content_type,
            credentials.as_ref(),
            on_success,
            on_failure,
        ),
        Method::Put => client.put(
            &cli.url,
            body()?,
            &cli.content_type,
            credentials.as_ref(),
            on_success,
            on_failure,
        ),
        Method::Delete => client.delete(&cli.url, credentials.as_ref(), on_success, on_failure),
    }
    .context("request rejected")?;

    match rx.recv().await {
        Some(Outcome::Success(response)) => {
            println!(
                "{} {} ({}ms)",
                response.status_code, response.status_description, response.latency_ms
            );
            let mut headers: Vec<_> = response.headers.iter().collect();
            headers.sort();
            for (name, value) in headers {
                println!("{}: {}", name, value);
            }
            println!();
            println!("{}", response.body);
            Ok(())
        }
        Some(Outcome::Failure(error)) => bail!("request failed: {}", error.sanitized_message()),
        None => bail!("request finished without a result"),
    }
}

/// Initialize logging based on log level
fn init_logging(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok(); // Ignore error if already initialized

    Ok(())
}
