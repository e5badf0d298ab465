use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, field, info, instrument, warn};

use crate::commands;
use crate::config::Config;
use crate::connection::Connection;
use crate::store::Store;
use crate::Error;

/// Binds the listener described by `config` and serves clients until accepting fails.
pub async fn run(config: Config) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    let listener = TcpListener::bind(config.addr()).await?;

    serve(listener, Store::new(), config).await
}

/// Accepts connections on `listener`, each served by its own task sharing `store`.
pub async fn serve(listener: TcpListener, store: Store, config: Config) -> Result<(), Error> {
    info!("Listening on {}", listener.local_addr()?);

    loop {
        let (socket, client_address) = listener.accept().await?;
        let store = store.clone();
        let config = config.clone();
        info!("Accepted connection from {:?}", client_address);

        let handler = handle_connection(socket, client_address, store, config);
        spawn_connection(handler, client_address);
    }
}

/// Runs a connection handler on its own task.
///
/// A panic ends this connection only; the listener and other clients keep going.
pub(crate) fn spawn_connection<F>(handler: F, client_address: SocketAddr) -> JoinHandle<()>
where
    F: Future<Output = Result<(), Error>> + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(handler).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(%client_address, "Closing connection: {}", e),
            Err(panic) => error!(
                %client_address,
                "Connection handler panicked: {}",
                panic_message(panic.as_ref())
            ),
        }
    })
}

/// Serves one client until it disconnects.
///
/// Requests are handled strictly in order. Framing, decoding and I/O errors end the connection;
/// command errors are logged and the next request is read.
#[instrument(name = "connection", skip_all, fields(connection_id, client_address))]
pub async fn handle_connection<S>(
    stream: S,
    client_address: SocketAddr,
    store: Store,
    config: Config,
) -> Result<(), Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut conn = Connection::with_config(stream, &config);

    tracing::Span::current()
        .record("connection_id", field::display(conn.id))
        .record("client_address", field::display(client_address));

    while let Some(request) = conn.read_request().await? {
        debug!("Received request from client: {:?}", request);

        let res = match commands::dispatch(request, &store) {
            Ok(res) => res,
            Err(e) => {
                warn!("Error handling command: {}", e);
                continue;
            }
        };

        debug!("Sending response to client: {}", res);
        conn.write_frame(res).await?;
    }

    info!("Connection closed");
    Ok(())
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
