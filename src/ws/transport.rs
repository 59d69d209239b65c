use async_trait::async_trait;

use crate::error::LibsqlError;
use crate::proto::{Request, Response};

/// A live connection that answers stream requests.
///
/// Requests issued one after another are processed by the server in that order. A failed
/// request does not close the connection; once the connection itself is lost `is_closed`
/// reports it and every request fails with `TRANSPORT_ERROR`.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn request(&self, request: Request) -> Result<Response, LibsqlError>;

    fn is_closed(&self) -> bool;

    /// Close the connection. Requests still waiting for a response fail.
    async fn close(&self);
}

#[cfg(feature = "ws")]
pub use websocket::WebSocketTransport;

#[cfg(feature = "ws")]
mod websocket {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard};

    use async_trait::async_trait;
    use futures_util::stream::{SplitSink, SplitStream};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::HeaderValue;
    use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
    use tokio_tungstenite::tungstenite::protocol::Message;
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
    use url::Url;

    use super::StreamTransport;
    use crate::error::LibsqlError;
    use crate::proto::{ClientMsg, Request, Response, ServerMsg};
    use crate::ws::SUBPROTOCOL;

    type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
    type Waiter = oneshot::Sender<Result<Response, LibsqlError>>;
    type PendingMap = Arc<Mutex<HashMap<i64, Waiter>>>;

    fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<i64, Waiter>> {
        match pending.lock() {
            Ok(guard) => guard,
            // Recover the map; a panicking waiter does not invalidate the others.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// [`StreamTransport`] over a WebSocket. A reader task routes responses to their callers by
    /// request id.
    pub struct WebSocketTransport {
        sink: tokio::sync::Mutex<SplitSink<Socket, Message>>,
        pending: PendingMap,
        next_request_id: AtomicI64,
        closed: Arc<AtomicBool>,
        reader: JoinHandle<()>,
    }

    impl WebSocketTransport {
        /// Connect and authenticate. The server's answer to the hello arrives asynchronously;
        /// a rejected credential closes the connection and fails pending requests.
        ///
        /// # Errors
        ///
        /// `TRANSPORT_ERROR` if the WebSocket handshake fails.
        pub async fn connect(url: &Url, jwt: Option<String>) -> Result<Self, LibsqlError> {
            let mut request = url.as_str().into_client_request()?;
            request
                .headers_mut()
                .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

            tracing::debug!(%url, "connecting websocket");
            let (socket, _) = connect_async(request).await?;
            let (mut sink, stream) = socket.split();

            let hello = serde_json::to_string(&ClientMsg::Hello { jwt })?;
            sink.send(Message::text(hello)).await?;

            let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let reader = tokio::spawn(read_loop(stream, pending.clone(), closed.clone()));

            Ok(Self {
                sink: tokio::sync::Mutex::new(sink),
                pending,
                next_request_id: AtomicI64::new(0),
                closed,
                reader,
            })
        }
    }

    async fn read_loop(
        mut stream: SplitStream<Socket>,
        pending: PendingMap,
        closed: Arc<AtomicBool>,
    ) {
        let reason = loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(frame = text.as_str(), "received");
                    match serde_json::from_str::<ServerMsg>(text.as_str()) {
                        Ok(ServerMsg::HelloOk) => tracing::debug!("hello accepted"),
                        Ok(ServerMsg::HelloError { error }) => {
                            break LibsqlError::from_server(
                                format!("Authentication failed: {}", error.message),
                                error.code.as_deref(),
                            );
                        }
                        Ok(ServerMsg::ResponseOk {
                            request_id,
                            response,
                        }) => resolve(&pending, request_id, Ok(response)),
                        Ok(ServerMsg::ResponseError { request_id, error }) => resolve(
                            &pending,
                            request_id,
                            Err(LibsqlError::from_server(error.message, error.code.as_deref())),
                        ),
                        Err(err) => break LibsqlError::from(err),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    break LibsqlError::transport("WebSocket was closed by the server");
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => break LibsqlError::from(err),
            }
        };

        closed.store(true, Ordering::Release);
        tracing::error!("websocket connection lost: {reason}");
        for (_, waiter) in lock(&pending).drain() {
            let _ = waiter.send(Err(reason.clone()));
        }
    }

    fn resolve(pending: &PendingMap, request_id: i64, outcome: Result<Response, LibsqlError>) {
        match lock(pending).remove(&request_id) {
            Some(waiter) => {
                let _ = waiter.send(outcome);
            }
            None => tracing::warn!(request_id, "response for unknown request"),
        }
    }

    fn connection_closed() -> LibsqlError {
        LibsqlError::transport("The WebSocket connection is closed")
    }

    #[async_trait]
    impl StreamTransport for WebSocketTransport {
        async fn request(&self, request: Request) -> Result<Response, LibsqlError> {
            if self.is_closed() {
                return Err(connection_closed());
            }
            let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let frame = serde_json::to_string(&ClientMsg::Request {
                request_id,
                request,
            })?;
            let (tx, rx) = oneshot::channel();
            lock(&self.pending).insert(request_id, tx);
            // The reader marks the connection closed before draining waiters; re-checking here
            // keeps a late insert from waiting forever.
            if self.is_closed() {
                lock(&self.pending).remove(&request_id);
                return Err(connection_closed());
            }

            tracing::trace!(request_id, "sending request");
            if let Err(err) = self.sink.lock().await.send(Message::text(frame)).await {
                lock(&self.pending).remove(&request_id);
                return Err(err.into());
            }

            rx.await.unwrap_or_else(|_| Err(connection_closed()))
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::Acquire)
        }

        async fn close(&self) {
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Err(err) = self.sink.lock().await.close().await {
                tracing::debug!("error while closing websocket: {err}");
            }
            self.reader.abort();
            for (_, waiter) in lock(&self.pending).drain() {
                let _ = waiter.send(Err(LibsqlError::client_closed()));
            }
        }
    }

    impl Drop for WebSocketTransport {
        fn drop(&mut self) {
            self.reader.abort();
        }
    }
}
