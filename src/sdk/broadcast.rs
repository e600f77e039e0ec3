use crate::config::RealtimeCredentials;
use crate::error::{Error, Result};
use crate::protocol::realtime::{ChannelEvent, RealtimeMessage, ReplyStatus, LOG_CHANNEL};
use crate::transport::ws::{self, WsStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Upper bound on concurrently in-flight broadcasts; beyond it messages are
/// dropped rather than queued.
const MAX_INFLIGHT_BROADCASTS: usize = 8;
/// How long a send is given to flush before the connection closes.
const SEND_FLUSH_DELAY: Duration = Duration::from_millis(200);
/// Bound on waiting for the channel join reply.
const JOIN_REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fire-and-forget publisher of status lines on the `agent_logs` channel.
///
/// Purely observational: [`broadcast`](Self::broadcast) never blocks the
/// caller and never raises. Each call runs its own connect → join → send →
/// close sequence on an independent connection; overlapping calls
/// interleave freely.
pub struct StatusBroadcaster {
    credentials: Option<RealtimeCredentials>,
    inflight: Arc<Semaphore>,
}

impl StatusBroadcaster {
    #[must_use]
    pub fn new(credentials: Option<RealtimeCredentials>) -> Self {
        Self {
            credentials,
            inflight: Arc::new(Semaphore::new(MAX_INFLIGHT_BROADCASTS)),
        }
    }

    /// Build from `SUPABASE_REALTIME_URL` / `SUPABASE_ANON_KEY`. Missing
    /// credentials are tolerated; every broadcast attempt then logs an error
    /// locally and performs no network action.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(RealtimeCredentials::from_env())
    }

    /// A broadcaster that drops everything. Useful where the side channel is
    /// intentionally off.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Publish one status line, best effort. The publish sequence runs on a
    /// detached task that is never awaited by the caller; without a current
    /// tokio runtime the message is dropped with a local error log.
    pub fn broadcast(&self, message: impl Into<String>) {
        self.try_schedule(message.into());
    }

    /// Returns whether a publish task was actually scheduled.
    fn try_schedule(&self, message: String) -> bool {
        let Some(credentials) = self.credentials.clone() else {
            tracing::error!(
                channel = LOG_CHANNEL,
                "realtime credentials missing; dropping log broadcast"
            );
            return false;
        };

        let Ok(permit) = Arc::clone(&self.inflight).try_acquire_owned() else {
            tracing::warn!(
                channel = LOG_CHANNEL,
                "too many in-flight log broadcasts; dropping message"
            );
            return false;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                channel = LOG_CHANNEL,
                "no async runtime available; dropping log broadcast"
            );
            return false;
        };

        runtime.spawn(async move {
            let _permit = permit;
            if let Err(err) = publish_log(&credentials, &message).await {
                tracing::error!(channel = LOG_CHANNEL, error = %err, "log broadcast failed");
            }
        });
        true
    }
}

/// One full publish sequence: connect, join the log channel, send a single
/// `log` broadcast, give the send a moment to flush, close.
async fn publish_log(credentials: &RealtimeCredentials, message: &str) -> Result<()> {
    let mut stream = ws::connect(&credentials.endpoint, &credentials.access_key).await?;

    let join = RealtimeMessage::join_log_channel(&credentials.access_key, "1")?;
    send_frame(&mut stream, &join).await?;

    match await_join_reply(&mut stream).await {
        Ok(()) => tracing::debug!(channel = LOG_CHANNEL, "subscribed to log channel"),
        Err(Error::ConnectionClosed) => {
            tracing::warn!(channel = LOG_CHANNEL, "log channel closed unexpectedly");
            return Err(Error::ConnectionClosed);
        }
        Err(err) => {
            tracing::error!(channel = LOG_CHANNEL, error = %err, "log channel subscribe error");
            return Err(err);
        }
    }

    let frame = RealtimeMessage::broadcast_log(message, "2")?;
    send_frame(&mut stream, &frame).await?;

    tokio::time::sleep(SEND_FLUSH_DELAY).await;

    stream.close().await?;
    Ok(())
}

async fn send_frame(stream: &mut WsStream, frame: &RealtimeMessage) -> Result<()> {
    let json = serde_json::to_string(frame)?;
    stream.send(Message::Text(json.into())).await?;
    Ok(())
}

/// Wait for the `phx_reply` to the join, bounded by [`JOIN_REPLY_TIMEOUT`].
async fn await_join_reply(stream: &mut WsStream) -> Result<()> {
    let deadline = tokio::time::Instant::now() + JOIN_REPLY_TIMEOUT;

    loop {
        let msg = tokio::time::timeout_at(deadline, stream.next())
            .await
            .map_err(|_| Error::SubscribeRejected("timed out waiting for join reply".to_string()))?;

        match msg.ok_or(Error::ConnectionClosed)?? {
            Message::Text(text) => {
                let frame: RealtimeMessage = serde_json::from_str(&text)?;
                match frame.event {
                    ChannelEvent::Reply => {
                        let reply = frame.reply_payload()?;
                        return match reply.status {
                            ReplyStatus::Ok => Ok(()),
                            _ => Err(Error::SubscribeRejected(reply.response.to_string())),
                        };
                    }
                    ChannelEvent::Error => {
                        return Err(Error::SubscribeRejected(frame.payload.to_string()));
                    }
                    ChannelEvent::Close => return Err(Error::ConnectionClosed),
                    _ => {}
                }
            }
            Message::Close(_) => return Err(Error::ConnectionClosed),
            Message::Ping(payload) => stream.send(Message::Pong(payload)).await?,
            _ => {}
        }
    }
}
