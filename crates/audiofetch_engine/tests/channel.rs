use std::sync::mpsc;
use std::time::Duration;

use audiofetch_engine::{run_channel, ChannelFrame, EngineEvent, WireStatus};
use futures_util::SinkExt;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

async fn serve_once(frames: Vec<&'static str>) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
        for frame in frames {
            socket.send(Message::Text(frame.to_string())).await.unwrap();
        }
        socket.close(None).await.unwrap();
    });
    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

fn drain(rx: &mpsc::Receiver<EngineEvent>) -> Vec<EngineEvent> {
    rx.try_iter().collect()
}

#[tokio::test]
async fn channel_reports_open_frames_and_close() {
    audiofetch_logging::initialize_for_tests();
    let url = serve_once(vec![
        r#"{"type":"connection_established","connection_id":"c1"}"#,
        r#"{"type":"heartbeat"}"#,
        "not json",
        r#"{"type":"job_update","job_id":"j1","data":{"status":"streaming","auto_download":true}}"#,
    ])
    .await;

    let (tx, rx) = mpsc::channel();
    tokio::time::timeout(Duration::from_secs(5), run_channel(url, Duration::from_secs(2), tx))
        .await
        .unwrap();

    let events = drain(&rx);
    assert_eq!(events.len(), 4, "{events:?}");
    assert_eq!(events[0], EngineEvent::ChannelOpened);
    assert_eq!(
        events[1],
        EngineEvent::ChannelFrame(ChannelFrame::ConnectionEstablished {
            connection_id: "c1".to_string()
        })
    );
    match &events[2] {
        EngineEvent::ChannelFrame(ChannelFrame::JobUpdate { job_id, data }) => {
            assert_eq!(job_id, "j1");
            assert_eq!(data.status, Some(WireStatus::Streaming));
            assert_eq!(data.auto_download, Some(true));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(matches!(events[3], EngineEvent::ChannelClosed { .. }));
}

#[tokio::test]
async fn failed_connect_reports_single_close() {
    audiofetch_logging::initialize_for_tests();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, rx) = mpsc::channel();
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    tokio::time::timeout(Duration::from_secs(5), run_channel(url, Duration::from_secs(2), tx))
        .await
        .unwrap();

    let events = drain(&rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        EngineEvent::ChannelClosed { reason: Some(_) }
    ));
}

#[tokio::test]
async fn stuck_handshake_reports_single_close() {
    audiofetch_logging::initialize_for_tests();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accepts the TCP connection but never answers the upgrade.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let (tx, rx) = mpsc::channel();
    let url = Url::parse(&format!("ws://{addr}/ws")).unwrap();
    tokio::time::timeout(
        Duration::from_secs(5),
        run_channel(url, Duration::from_millis(300), tx),
    )
    .await
    .unwrap();
    server.abort();

    let events = drain(&rx);
    assert_eq!(events.len(), 1, "{events:?}");
    match &events[0] {
        EngineEvent::ChannelClosed { reason: Some(reason) } => {
            assert!(reason.contains("timed out"), "{reason}")
        }
        other => panic!("unexpected event {other:?}"),
    }
}
