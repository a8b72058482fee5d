//! Binary entrypoint: loads configuration, wires up the object store, authenticator, event
//! bus and session manager, then runs the SSH/SFTP server until SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use russh::server::Server as _;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use vaultfs_sftp::auth::RegistryAuthenticator;
use vaultfs_sftp::config::Config;
use vaultfs_sftp::events::EventBus;
use vaultfs_sftp::metrics::MetricsListener;
use vaultfs_sftp::server::ssh::{load_or_generate_host_key, SharedState, SshServer};
use vaultfs_sftp::session::SessionManager;
use vaultfs_sftp::store::{ObjectStore, S3Config, S3Store};
use vaultfs_sftp::upload::UploadClock;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "fatal startup error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.enabled {
        subscriber.init();
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let host_key = load_or_generate_host_key(&config.ssh.host_key_path)?;

    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(S3Config {
        endpoint: config.s3.endpoint.clone(),
        bucket: config.s3.bucket.clone(),
        region: config.s3.region.clone(),
        access_key: config.s3.access_key.clone(),
        secret_key: config.s3.secret_key.clone(),
    }));

    let events = EventBus::new();
    events.subscribe(Arc::new(MetricsListener));
    events.subscribe(Arc::new(vaultfs_sftp::events::TracingListener));

    let authenticator = Arc::new(RegistryAuthenticator::new(
        store.clone(),
        config.user_base_path.clone(),
        config.default_subdirectories_vec(),
        config.create_default_subdirs,
    ));

    let sessions = Arc::new(SessionManager::new(Duration::from_secs(config.idle_timeout_secs), events.clone()));

    let state = Arc::new(SharedState {
        store,
        authenticator,
        events,
        upload_clock: Arc::new(UploadClock::new()),
        sessions: sessions.clone(),
        config: Arc::new(config.clone()),
    });

    let ssh_config = Arc::new(russh::server::Config {
        auth_rejection_time: Duration::from_secs(1),
        auth_rejection_time_initial: Some(Duration::from_secs(0)),
        keys: vec![host_key],
        ..Default::default()
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(%addr, "starting sftp server");

    let mut server = SshServer { state };
    let serve = server.run_on_address(ssh_config, addr);

    tokio::select! {
        result = serve => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
            sessions.disconnect_all();
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
