mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use futures::StreamExt;
use restspec::{Body, Call, Expect, Outcome, Resource, Session, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Spec-driven REST client
#[derive(Parser, Debug)]
#[command(name = "restspec", version, about, long_about = None)]
struct Args {
    /// API description to load (URL or local file)
    #[arg(short, long)]
    spec: Option<String>,

    /// Base URL to use when no spec is given
    #[arg(short, long)]
    base_url: Option<String>,

    /// Remember --spec as the default for later runs
    #[arg(long)]
    remember: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List endpoints and their operations
    Endpoints,
    /// Print every record of an endpoint, one JSON object per line
    List { endpoint: String },
    /// Print one record by id
    Get { endpoint: String, id: String },
    /// Invoke a declared operation
    Call {
        endpoint: String,
        operation: String,
        /// Path template parameter, as name=value
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
        /// Query parameter, as name=value
        #[arg(short, long = "query", value_parser = parse_pair)]
        query: Vec<(String, String)>,
        /// Expect a list of records instead of one
        #[arg(long)]
        many: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("restspec started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("restspec").join("restspec.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".restspec").join("restspec.log");
    }
    PathBuf::from("restspec.log")
}

async fn open_session(args: &Args, config: &Config) -> Result<Session> {
    let transport: Arc<dyn Transport> = Arc::new(config.transport()?);

    if let Some(spec) = config.effective_spec(args.spec.as_deref()) {
        if spec.starts_with("http://") || spec.starts_with("https://") {
            return Session::from_url_with(&spec, transport)
                .await
                .with_context(|| format!("Failed to load spec from {}", spec));
        }
        let loaded = Session::from_file(&spec)
            .await
            .with_context(|| format!("Failed to load spec file {}", spec))?;
        let spec = loaded.spec().cloned().context("Spec file produced no spec")?;
        loaded.close().await;
        return Ok(Session::from_spec_with(spec, transport));
    }

    match config.effective_base_url(args.base_url.as_deref()) {
        Some(base_url) => {
            let base_url = url::Url::parse(&base_url).context("Invalid base URL")?;
            Ok(Session::with_transport(base_url, None, transport))
        },
        None => bail!("No spec or base URL given (use --spec or --base-url)"),
    }
}

fn print_resource(resource: &Resource) -> Result<()> {
    println!("{}", serde_json::to_string(&resource.to_json())?);
    Ok(())
}

async fn run(args: &Args, session: &Session) -> Result<()> {
    match &args.command {
        Command::Endpoints => {
            let Some(spec) = session.spec() else {
                bail!("No spec loaded; endpoints are unknown");
            };
            println!("{}", session.base_url());
            for (path, endpoint) in spec.endpoints() {
                println!("{}", path);
                for operation in endpoint.operations.values() {
                    println!("  {:<8} {}", operation.method, operation.id);
                }
            }
        },
        Command::List { endpoint } => {
            let api = endpoint_or_path(session, endpoint);
            let mut items = api.list();
            while let Some(item) = items.next().await {
                print_resource(&item?)?;
            }
        },
        Command::Get { endpoint, id } => {
            let resource = endpoint_or_path(session, endpoint).get_by_id(id).await?;
            print_resource(&resource)?;
        },
        Command::Call {
            endpoint,
            operation,
            params,
            query,
            many,
        } => {
            let api = session.endpoint(endpoint)?;
            let mut call = Call::new();
            for (name, value) in params {
                call = call.param(name, value);
            }
            for (name, value) in query {
                call = call.query(name, value);
            }

            if !*many && api.resolve(operation)?.method == reqwest::Method::DELETE {
                match api.invoke(operation, call).await? {
                    Body::Data(value) => println!("{}", value),
                    Body::Text(text) => println!("{}", text),
                    Body::Raw(raw) => println!("[{} bytes]", raw.bytes.len()),
                }
                return Ok(());
            }

            let expect = if *many { Expect::Many } else { Expect::One };
            match api.call(operation, call, expect).await? {
                Outcome::Single(resource) => print_resource(&resource)?,
                Outcome::Many(mut items) => {
                    while let Some(item) = items.next().await {
                        print_resource(&item?)?;
                    }
                },
            }
        },
    }
    Ok(())
}

/// Spec endpoint when one matches, literal path otherwise
fn endpoint_or_path(session: &Session, name: &str) -> restspec::Api {
    session.endpoint(name).unwrap_or_else(|_| session.api(name))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();
    if args.remember {
        if let Some(spec) = &args.spec {
            config.set_spec(spec)?;
        }
    }

    let session = open_session(&args, &config).await?;
    let result = run(&args, &session).await;
    session.close().await;

    if let Err(err) = &result {
        tracing::error!("Command failed: {:?}", err);
    }
    result
}
