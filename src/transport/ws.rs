use crate::error::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

#[derive(Debug)]
pub struct WsStream(WebSocketStream<MaybeTlsStream<TcpStream>>);

impl WsStream {
    pub(crate) const fn new(stream: WebSocketStream<MaybeTlsStream<TcpStream>>) -> Self {
        Self(stream)
    }
}

impl futures::Stream for WsStream {
    type Item = std::result::Result<
        tokio_tungstenite::tungstenite::Message,
        tokio_tungstenite::tungstenite::Error,
    >;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.0).poll_next(cx)
    }
}

impl futures::Sink<tokio_tungstenite::tungstenite::Message> for WsStream {
    type Error = tokio_tungstenite::tungstenite::Error;

    fn poll_ready(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_ready(cx)
    }

    fn start_send(
        mut self: std::pin::Pin<&mut Self>,
        item: tokio_tungstenite::tungstenite::Message,
    ) -> std::result::Result<(), Self::Error> {
        std::pin::Pin::new(&mut self.0).start_send(item)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_close(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::result::Result<(), Self::Error>> {
        std::pin::Pin::new(&mut self.0).poll_close(cx)
    }
}

const SOCKET_PATH_SEGMENT: &str = "websocket";
const PROTOCOL_VERSION: &str = "1.0.0";

/// Establish a WebSocket connection to a realtime endpoint.
///
/// The endpoint is the service base URL (for example
/// `wss://project.supabase.co/realtime/v1`); the `websocket` path segment is
/// appended if missing, and the access key travels as the `apikey` query
/// parameter.
///
/// # Errors
/// Returns an error if the endpoint URL is invalid or the handshake fails.
pub async fn connect(endpoint: &str, access_key: &str) -> Result<WsStream> {
    let mut url = Url::parse(endpoint)?;

    if !url.path().trim_end_matches('/').ends_with(SOCKET_PATH_SEGMENT) {
        let path = format!("{}/{SOCKET_PATH_SEGMENT}", url.path().trim_end_matches('/'));
        url.set_path(&path);
    }

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("apikey", access_key);
        query.append_pair("vsn", PROTOCOL_VERSION);
    }

    let (ws_stream, _) = connect_async(url.as_str()).await?;

    tracing::debug!("Connected to realtime endpoint");

    Ok(WsStream::new(ws_stream))
}
