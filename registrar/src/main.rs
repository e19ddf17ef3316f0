use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError};
use register_client::{ClientRegisterRepository, RegisterError};
use register_common::kubernetes::KubeStore;
use register_common::{MetaDataRegisterDto, StoreError, UriRegisterDto};
use register_server::ServerRegisterRepository;
use register_server::publisher::LogPublisher;
use serde::de::DeserializeOwned;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use statsd::MetricsError;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod logging;
mod statsd;

#[derive(Parser)]
#[command(about = "Service registration through Kubernetes ConfigMaps")]
struct Cli {
    #[arg(long, default_value = "registrar.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Watch registration records and publish them as registration events.
    Watch,
    /// Register an interface described by a JSON metadata file.
    RegisterMetadata(PayloadArgs),
    /// Register an instance described by a JSON uri file.
    RegisterUri(PayloadArgs),
    /// Take an instance described by a JSON uri file offline.
    Offline(PayloadArgs),
}

#[derive(Args)]
struct PayloadArgs {
    #[arg(long)]
    file: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Register(#[from] RegisterError),
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };
    let _sentry = logging::init(config.logging.as_ref());

    match run(cli.command, config).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "registrar failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(command: CliCommand, config: Config) -> Result<(), CliError> {
    statsd::init(config.metrics.as_ref())?;
    let store = Arc::new(KubeStore::connect(&config.kubernetes.credentials).await?);

    match command {
        CliCommand::Watch => {
            let server = ServerRegisterRepository::init(store, Arc::new(LogPublisher));
            let admin: AdminService<_, std::io::Error> = AdminService::new(server.status());
            let listener = &config.admin_listener;

            let served = run_http_service(&listener.host, listener.port, admin, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "Could not listen for shutdown signal");
                }
            })
            .await;

            server.close().await;
            served?;
        }
        CliCommand::RegisterMetadata(args) => {
            let metadata: MetaDataRegisterDto = read_payload(&args.file)?;
            let client = ClientRegisterRepository::new(store, &config.client);
            let name = client.persist_interface(&metadata).await?;
            println!("{name}");
        }
        CliCommand::RegisterUri(args) => {
            let uri: UriRegisterDto = read_payload(&args.file)?;
            let client = ClientRegisterRepository::new(store, &config.client);
            let name = client.persist_uri(&uri).await?;
            println!("{name}");
        }
        CliCommand::Offline(args) => {
            let uri: UriRegisterDto = read_payload(&args.file)?;
            let client = ClientRegisterRepository::new(store, &config.client);
            client.offline(&uri).await?;
        }
    }

    Ok(())
}

fn read_payload<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_commands() {
        let cli = Cli::try_parse_from(["registrar", "watch"]).expect("parse watch");
        assert!(matches!(cli.command, CliCommand::Watch));
        assert_eq!(cli.config, PathBuf::from("registrar.yaml"));

        let cli = Cli::try_parse_from([
            "registrar",
            "--config",
            "/etc/registrar.yaml",
            "register-uri",
            "--file",
            "uri.json",
        ])
        .expect("parse register-uri");
        let CliCommand::RegisterUri(args) = cli.command else {
            panic!("expected register-uri");
        };
        assert_eq!(args.file, PathBuf::from("uri.json"));

        assert!(Cli::try_parse_from(["registrar", "offline"]).is_err());
    }

    #[test]
    fn read_uri_payload() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(
            tmp,
            r#"{{"rpcType":"http","contextPath":"/order","host":"10.0.0.5","port":8080}}"#
        )
        .expect("write json");

        let uri: UriRegisterDto = read_payload(tmp.path()).expect("read payload");
        assert_eq!(uri.instance(), "10.0.0.5:8080");
        assert_eq!(uri.context_path.as_deref(), Some("/order"));
    }

    #[test]
    fn read_malformed_payload() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "not json").expect("write");

        let result: Result<UriRegisterDto, _> = read_payload(tmp.path());
        assert!(matches!(result, Err(CliError::Decode(_))));
    }
}
