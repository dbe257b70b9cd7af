//! Accept loops for the plain TCP and TLS listeners.
//!
//! Both loops share one connection-cap semaphore: `max_clients` bounds
//! the whole server, not each listener. Accept errors never stop a
//! loop; a watch signal does.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio_rustls::TlsAcceptor;

use crate::context::ServerContext;
use crate::error::{Result, ServerError};
use crate::handler;

/// Bind a listener socket.
pub async fn bind(bind_addr: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{bind_addr}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Accept loop for plain TCP connections.
pub async fn run(
    listener: TcpListener,
    clients: Arc<Semaphore>,
    context: Arc<ServerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let permit = match clients.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(peer = %peer, "Connection limit reached, rejecting");
                            continue;
                        }
                    };
                    let context = Arc::clone(&context);
                    tokio::spawn(async move {
                        let _permit = permit;
                        let active = context.connection_opened();
                        tracing::info!(peer = %peer, active, "Client connected");
                        if let Err(err) =
                            handler::serve_connection(stream, Arc::clone(&context), peer.to_string()).await
                        {
                            tracing::warn!(peer = %peer, error = %err, "Connection ended with error");
                        }
                        context.connection_closed();
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "Accept failed");
                }
            },
            _ = shutdown.changed() => {
                tracing::info!("Listener stopping");
                break;
            }
        }
    }
}

/// Accept loop for the TLS listener. A failed handshake closes that
/// socket only.
pub async fn run_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    clients: Arc<Semaphore>,
    context: Arc<ServerContext>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let permit = match clients.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(peer = %peer, "Connection limit reached, rejecting");
                            continue;
                        }
                    };
                    let acceptor = acceptor.clone();
                    let context = Arc::clone(&context);
                    tokio::spawn(async move {
                        let _permit = permit;
                        let tls_stream = match acceptor.accept(stream).await {
                            Ok(tls_stream) => tls_stream,
                            Err(err) => {
                                tracing::warn!(peer = %peer, error = %err, "TLS handshake failed");
                                return;
                            }
                        };
                        let active = context.connection_opened();
                        tracing::info!(peer = %peer, active, "TLS client connected");
                        if let Err(err) =
                            handler::serve_connection(tls_stream, Arc::clone(&context), peer.to_string()).await
                        {
                            tracing::warn!(peer = %peer, error = %err, "Connection ended with error");
                        }
                        context.connection_closed();
                    });
                }
                Err(err) => {
                    tracing::error!(error = %err, "Accept failed");
                }
            },
            _ = shutdown.changed() => {
                tracing::info!("TLS listener stopping");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpStream;

    use netwarden_core::config::WardenConfig;
    use netwarden_discover::registry::DeviceRegistry;
    use netwarden_store::AllowlistStore;

    use super::*;

    fn test_context() -> (Arc<ServerContext>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let (store, _) = AllowlistStore::open(dir.path().join("allowlist.txt")).unwrap();
        let store = Arc::new(store);
        let registry = Arc::new(DeviceRegistry::new(Arc::clone(&store), false));
        (
            Arc::new(ServerContext::new(WardenConfig::default(), store, registry)),
            dir,
        )
    }

    #[tokio::test]
    async fn serves_tcp_clients_until_shutdown() {
        let (context, _dir) = test_context();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let clients = Arc::new(Semaphore::new(4));

        let loop_task = tokio::spawn(run(listener, clients, Arc::clone(&context), shutdown_rx));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"STATUS\nQUIT\n").await.unwrap();
        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();

        assert!(output.starts_with("NetWarden"));
        assert!(output.contains("MESSAGE:Server operational"));
        assert!(output.contains("MESSAGE:Goodbye"));

        shutdown_tx.send(true).unwrap();
        loop_task.await.unwrap();
        assert_eq!(context.total_connections(), 1);
    }

    #[tokio::test]
    async fn connections_over_the_cap_are_closed_unserved() {
        let (context, _dir) = test_context();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let clients = Arc::new(Semaphore::new(1));

        let loop_task = tokio::spawn(run(listener, clients, Arc::clone(&context), shutdown_rx));

        // First client takes the only permit and keeps its session open.
        let first = TcpStream::connect(addr).await.unwrap();
        let mut first_reader = BufReader::new(first);
        let mut welcome = String::new();
        first_reader.read_line(&mut welcome).await.unwrap();
        assert!(welcome.starts_with("NetWarden"));

        // Second client is dropped without even a welcome line.
        let mut second = TcpStream::connect(addr).await.unwrap();
        let mut output = Vec::new();
        second.read_to_end(&mut output).await.unwrap();
        assert!(output.is_empty());

        shutdown_tx.send(true).unwrap();
        loop_task.await.unwrap();
    }
}
