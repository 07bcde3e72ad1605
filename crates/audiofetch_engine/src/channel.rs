//! The server's push connection.

use std::sync::mpsc::Sender;
use std::time::Duration;

use audiofetch_logging::{af_debug, af_info, af_warn};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::types::{ApiError, EngineEvent, FailureKind};
use crate::wire::ChannelFrame;

/// Longest wait for the websocket upgrade before the attempt counts as failed.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// `ws://{host}/ws` (or `wss://` for https bases), keeping any base path prefix.
pub fn channel_url(base_url: &str) -> Result<Url, ApiError> {
    let mut url = Url::parse(base_url)
        .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("unsupported scheme {other}"),
            ))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "cannot switch to websocket scheme"))?;
    url.path_segments_mut()
        .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot hold a path"))?
        .pop_if_empty()
        .push("ws");
    url.set_query(None);
    Ok(url)
}

/// Runs one connection to completion. Emits `ChannelOpened`, then one
/// `ChannelFrame` per decodable text frame, and always ends with exactly one
/// `ChannelClosed`, including when the connection never opened or the
/// handshake did not finish within `handshake_timeout`.
pub async fn run_channel(url: Url, handshake_timeout: Duration, events: Sender<EngineEvent>) {
    af_debug!("Connecting push channel to {url}");
    let connect = tokio_tungstenite::connect_async(url.as_str());
    let connected = match tokio::time::timeout(handshake_timeout, connect).await {
        Ok(Ok((socket, _))) => Ok(socket),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("handshake timed out after {handshake_timeout:?}")),
    };
    let mut socket = match connected {
        Ok(socket) => socket,
        Err(reason) => {
            af_warn!("Push channel connect failed: {reason}");
            let _ = events.send(EngineEvent::ChannelClosed {
                reason: Some(reason),
            });
            return;
        }
    };
    af_info!("Push channel open");
    if events.send(EngineEvent::ChannelOpened).is_err() {
        return;
    }

    let reason = loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ChannelFrame>(&text) {
                Ok(ChannelFrame::Unknown) => af_debug!("Ignoring frame: {text}"),
                Ok(frame) => {
                    if events.send(EngineEvent::ChannelFrame(frame)).is_err() {
                        break None;
                    }
                }
                Err(err) => af_warn!("Malformed push frame ({err}): {text}"),
            },
            Some(Ok(Message::Close(frame))) => {
                break frame.map(|frame| frame.reason.into_owned());
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => break Some(err.to_string()),
            None => break None,
        }
    };

    af_info!("Push channel closed ({})", reason.as_deref().unwrap_or("no reason"));
    let _ = events.send(EngineEvent::ChannelClosed { reason });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_url_switches_scheme() {
        assert_eq!(
            channel_url("http://host:8000").unwrap().as_str(),
            "ws://host:8000/ws"
        );
        assert_eq!(
            channel_url("https://example.com/app/?x=1").unwrap().as_str(),
            "wss://example.com/app/ws"
        );
        assert!(channel_url("ftp://host").is_err());
    }
}
