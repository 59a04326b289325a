//! End-to-end event contract checks against a local fake provider.
//!
//! The fake speaks just enough HTTP/1.1 to exercise the streaming decode
//! path: a status line, headers, then an EOF-terminated event-stream body.

use std::sync::mpsc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use backend_api::{
    AskOptions, BackendClient, BackendProfile, BackendRegistry, FailureReason, ProviderFamily,
    StreamEvent,
};

struct FakeProvider {
    addr: std::net::SocketAddr,
    handle: tokio::task::JoinHandle<()>,
}

/// Serves exactly one request: writes `head`, then each body part with a
/// short pause, then either closes or holds the socket open.
async fn serve_once(head: &'static str, parts: Vec<&'static str>, hold_open: bool) -> FakeProvider {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake provider");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept connection");

        // Drain the request head; the fake never inspects the payload.
        let mut scratch = [0_u8; 4096];
        let mut request = Vec::new();
        loop {
            let read = socket.read(&mut scratch).await.expect("read request");
            request.extend_from_slice(&scratch[..read]);
            if read == 0 || request.windows(4).any(|window| window == b"\r\n\r\n") {
                break;
            }
        }

        socket
            .write_all(head.as_bytes())
            .await
            .expect("write response head");
        for part in parts {
            socket.write_all(part.as_bytes()).await.expect("write part");
            socket.flush().await.expect("flush part");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        if hold_open {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    });

    FakeProvider { addr, handle }
}

fn client_for(addr: std::net::SocketAddr, family: ProviderFamily) -> BackendClient {
    let profile = BackendProfile::new(
        "fake",
        family,
        format!("http://{addr}/v1/stream"),
        "test-credential",
        "fake-model",
    )
    .with_model("fake-model", 4096);

    let mut registry = BackendRegistry::default();
    registry.insert(profile).expect("valid profile");
    registry.select("fake", None).expect("valid selection");
    BackendClient::new(registry).expect("client builds")
}

const STREAM_HEAD: &str =
    "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn started_deltas_and_completed_arrive_in_order() {
    let provider = serve_once(
        STREAM_HEAD,
        vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
        ],
        false,
    )
    .await;

    let client = client_for(provider.addr, ProviderFamily::OpenAi);
    let (tx, rx) = mpsc::channel();
    let job = client
        .ask(
            AskOptions {
                prompt: "greet".to_owned(),
                ..AskOptions::default()
            },
            Box::new(move |event| {
                let _ = tx.send(event);
            }),
        )
        .expect("dispatch succeeds");
    job.join().await;
    provider.handle.abort();

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![
            StreamEvent::Started {
                backend: "fake".to_owned(),
                model: "fake-model".to_owned(),
                temperature: 0.7,
            },
            StreamEvent::Delta {
                text: "Hel".to_owned(),
            },
            StreamEvent::Delta {
                text: "lo".to_owned(),
            },
            StreamEvent::Completed {
                status: 200,
                body: "Hello".to_owned(),
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn anthropic_frames_and_message_stop_decode_to_full_body() {
    let provider = serve_once(
        STREAM_HEAD,
        vec![
            "data: {\"delta\":{\"text\":\"cd\"}}\n",
            "data: {\"type\":\"message_stop\"}\n",
        ],
        false,
    )
    .await;

    let client = client_for(provider.addr, ProviderFamily::Anthropic);
    let (tx, rx) = mpsc::channel();
    let job = client
        .ask(
            AskOptions {
                prompt: "greet".to_owned(),
                ..AskOptions::default()
            },
            Box::new(move |event| {
                let _ = tx.send(event);
            }),
        )
        .expect("dispatch succeeds");
    job.join().await;
    provider.handle.abort();

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[1],
        StreamEvent::Delta {
            text: "cd".to_owned(),
        }
    );
    assert_eq!(
        events[2],
        StreamEvent::Completed {
            status: 200,
            body: "cd".to_owned(),
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn http_error_status_surfaces_body_through_completed() {
    let provider = serve_once(
        "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 9\r\nconnection: close\r\n\r\n",
        vec!["boom body"],
        false,
    )
    .await;

    let client = client_for(provider.addr, ProviderFamily::OpenAi);
    let (tx, rx) = mpsc::channel();
    let job = client
        .ask(
            AskOptions {
                prompt: "greet".to_owned(),
                ..AskOptions::default()
            },
            Box::new(move |event| {
                let _ = tx.send(event);
            }),
        )
        .expect("dispatch succeeds");
    job.join().await;
    provider.handle.abort();

    let events: Vec<StreamEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        StreamEvent::Completed {
            status: 500,
            body: "boom body".to_owned(),
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelling_a_job_suppresses_later_data_and_fails_once_with_cancelled() {
    let provider = serve_once(
        STREAM_HEAD,
        vec!["data: {\"choices\":[{\"delta\":{\"content\":\"first\"}}]}\n"],
        true,
    )
    .await;

    let client = client_for(provider.addr, ProviderFamily::OpenAi);
    let (tx, rx) = mpsc::channel();
    let job = client
        .ask(
            AskOptions {
                prompt: "greet".to_owned(),
                ..AskOptions::default()
            },
            Box::new(move |event| {
                let _ = tx.send(event);
            }),
        )
        .expect("dispatch succeeds");

    // Wait until the first delta proves the stream is live, then cancel.
    let mut events = Vec::new();
    while events.len() < 2 {
        events.push(rx.recv_timeout(Duration::from_secs(5)).expect("live event"));
    }
    job.cancel();
    job.join().await;
    provider.handle.abort();

    events.extend(rx.try_iter());
    let terminal: Vec<&StreamEvent> = events.iter().filter(|event| event.is_terminal()).collect();
    assert_eq!(
        terminal,
        vec![&StreamEvent::Failed {
            reason: FailureReason::Cancelled,
        }]
    );
    assert!(
        events.last().is_some_and(StreamEvent::is_terminal),
        "no events may follow the terminal event"
    );
}
