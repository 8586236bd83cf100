use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use log::info;

use crate::auth::Authorizer;
use crate::cli::Settings;
use crate::config::ServerConfig;
use crate::daemon;
use crate::engine::{ConnectionHandler, FtpServer, ListenerConfig};
use crate::error::{EXIT_OK, StartupError, error_to_exit_code, handle_error};
use crate::logging;

/// A configured engine with its control socket already bound
pub struct Prepared {
    pub server: FtpServer<Authorizer>,
    pub listener: TcpListener,
}

impl Prepared {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

/// Loads configuration and users, opens the logs and binds the listener.
///
/// Everything that can fail for operator reasons fails here, while the process
/// still has its terminal.
pub fn prepare(settings: &Settings) -> Result<Prepared, StartupError> {
    let config = ServerConfig::load(&settings.config)?;
    let port = settings.port.unwrap_or(config.default_port);
    info!("Loaded configuration from {}", settings.config.display());

    let authorizer = Authorizer::from_config(&config)?;

    let sinks = logging::build_sinks(&settings.log_dir, config.disable_logging || settings.silent);

    let handler = ConnectionHandler {
        authorizer: Arc::new(authorizer),
        banner: config.banner.clone(),
        max_login_attempts: config.max_login_attempts,
    };

    let listener_config = ListenerConfig {
        bind_address: SocketAddr::from(([0, 0, 0, 0], port)),
        max_connections: config.max_connections,
        max_connections_per_source: config.max_connections_per_ip,
    };
    let listener = listener_config.bind()?;
    info!("Server bound to {}", listener_config.bind_address);

    Ok(Prepared {
        server: FtpServer::new(handler, listener_config, sinks),
        listener,
    })
}

/// Optionally detaches, then serves until the process is terminated.
pub fn run(prepared: Prepared, detach: bool) -> Result<(), StartupError> {
    if detach {
        daemon::detach()?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(prepared.server.serve(prepared.listener))?;
    Ok(())
}

/// Brings the daemon up and returns the process exit code.
pub fn start(settings: Settings) -> i32 {
    logging::setup_logging(settings.silent);
    info!("Launching FTP server...");

    match prepare(&settings).and_then(|prepared| run(prepared, settings.daemon)) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            handle_error(&e);
            error_to_exit_code(&e)
        }
    }
}
