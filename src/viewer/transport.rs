//! Transport seam between the connection manager and the network
//!
//! The manager only needs "dial and give me a stream of text frames". The
//! production [`WsConnector`] does that over tokio-tungstenite; tests plug in
//! an in-memory connector instead.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt, stream::BoxStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Message, client::IntoClientRequest, http::Uri},
};
use tracing::{debug, info};

/// Text frames from one open channel. The stream ends when the channel closes;
/// an `Err` item means the transport failed.
pub type MessageStream = BoxStream<'static, Result<String>>;

/// Interval between keep-alive pings on an open channel
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on the TCP connect plus WebSocket upgrade
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can open a push channel to the hub
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<MessageStream>;
}

/// Dials the hub's `/ws` endpoint
pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    /// `api_url` is the hub base URL; http(s) is mapped to ws(s)
    pub fn new(api_url: &str) -> Self {
        let ws_url = api_url
            .trim_end_matches('/')
            .replace("http://", "ws://")
            .replace("https://", "wss://");

        Self {
            url: format!("{}/ws", ws_url),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Stops the ping task once the read half is dropped
struct PingGuard(JoinHandle<()>);

impl Drop for PingGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<MessageStream> {
        let uri: Uri = self.url.parse().context("Failed to parse WebSocket URL")?;

        let host = uri
            .authority()
            .ok_or_else(|| anyhow::anyhow!("WebSocket URL missing host"))?
            .as_str()
            .to_string();

        let scheme = uri
            .scheme_str()
            .ok_or_else(|| anyhow::anyhow!("WebSocket URL missing scheme"))?;

        // Build Origin header (wss -> https, ws -> http)
        let origin_scheme = if scheme == "wss" { "https" } else { "http" };
        let origin = format!("{}://{}", origin_scheme, host);

        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .context("Failed to create WebSocket request")?;

        let headers = request.headers_mut();
        headers.insert(
            "Origin",
            origin
                .parse()
                .context("Failed to parse Origin header value")?,
        );
        headers.insert(
            "User-Agent",
            concat!("agentwatch-viewer/", env!("CARGO_PKG_VERSION"))
                .parse()
                .context("Failed to parse User-Agent header value")?,
        );

        debug!(url = %self.url, %origin, "connecting to WebSocket");

        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(request))
            .await
            .with_context(|| format!("Timed out connecting to WebSocket at {}", self.url))?
            .with_context(|| format!("Failed to connect to WebSocket at {}", self.url))?;

        info!("WebSocket connected to {}", self.url);

        let (mut write, read) = ws_stream.split();

        let ping_task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(PING_INTERVAL).await;
                if write.send(Message::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        });

        let frames = futures::stream::unfold(
            (read, PingGuard(ping_task)),
            |(mut read, guard)| async move {
                loop {
                    match read.next().await? {
                        Ok(Message::Text(text)) => return Some((Ok(text), (read, guard))),
                        Ok(Message::Close(_)) => {
                            info!("WebSocket closed by server");
                            return None;
                        }
                        // Pings are answered by tungstenite itself
                        Ok(_) => continue,
                        Err(e) => {
                            let err = anyhow::Error::new(e).context("WebSocket message error");
                            return Some((Err(err), (read, guard)));
                        }
                    }
                }
            },
        );

        Ok(frames.boxed())
    }
}
