use std::io;
use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use super::limits::{ConnectionLimiter, ConnectionSlot};
use super::responses::{SERVICE_UNAVAILABLE, format_response};
use super::session::run_session;
use super::{Authorize, ConnectionHandler, ListenerConfig, LogSinks};

/// The engine: accept loop plus one task per control connection
pub struct FtpServer<A> {
    handler: ConnectionHandler<A>,
    listener_config: ListenerConfig,
    sinks: LogSinks,
}

impl<A: Authorize> FtpServer<A> {
    pub fn new(handler: ConnectionHandler<A>, listener_config: ListenerConfig, sinks: LogSinks) -> Self {
        Self {
            handler,
            listener_config,
            sinks,
        }
    }

    pub fn listener_config(&self) -> &ListenerConfig {
        &self.listener_config
    }

    /// Accepts connections on an already bound listener until the process ends.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn serve(self, listener: std::net::TcpListener) -> io::Result<()> {
        listener.set_nonblocking(true)?;
        let listener = TcpListener::from_std(listener)?;
        let limiter = self.listener_config.limiter();

        self.sinks.line(&format!(
            "Serving FTP on {} (max {} clients, {} per address)",
            listener.local_addr()?,
            self.listener_config.max_connections,
            self.listener_config.max_connections_per_source
        ));

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => self.admit(stream, addr, &limiter),
                Err(e) => self.sinks.error(&format!("Error accepting connection: {}", e)),
            }
        }
    }

    fn admit(&self, stream: TcpStream, addr: SocketAddr, limiter: &ConnectionLimiter) {
        match limiter.try_acquire(addr.ip()) {
            Ok(slot) => {
                self.sinks.line(&format!("{} connected.", addr));
                let handler = self.handler.clone();
                let sinks = self.sinks.clone();

                // Spawn a task for each client so accept loop doesn't block
                tokio::spawn(async move {
                    handle_client(stream, addr, slot, handler, sinks).await;
                });
            }
            Err(limit) => {
                self.sinks.line(&format!("{} refused: {}", addr, limit));
                let reply = format_response(SERVICE_UNAVAILABLE, &limit.to_string());
                tokio::spawn(async move {
                    let mut stream = stream;
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        }
    }
}

async fn handle_client<A: Authorize>(
    stream: TcpStream,
    addr: SocketAddr,
    slot: ConnectionSlot,
    handler: ConnectionHandler<A>,
    sinks: LogSinks,
) {
    if let Err(e) = run_session(stream, addr, handler, sinks.clone()).await {
        sinks.error(&format!("Error while handling client {}: {}", addr, e));
    }
    drop(slot);
    sinks.line(&format!("{} disconnected.", addr));
}
