#![allow(dead_code)]

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use ytv_client::core::LinkOpener;

pub const VIDEO_BYTES: usize = 64 * 1024;

/// What the fake `/api/process-download` answers with.
#[derive(Clone)]
pub enum ProcessReply {
    File { disposition: Option<String> },
    Chunked,
    /// `chunks` KiB pieces, one every `interval`.
    Trickle { chunks: usize, interval: Duration },
    Error { status: StatusCode, body: Value },
}

pub struct MockBackend {
    pub info_calls: AtomicUsize,
    pub process_calls: AtomicUsize,
    pub audio_calls: AtomicUsize,
    pub last_info_body: Mutex<Option<Value>>,
    pub last_process_body: Mutex<Option<Value>>,
    pub info_reply: Mutex<(StatusCode, Value)>,
    pub process_reply: Mutex<ProcessReply>,
    /// Time `/api/process-download` spends "processing" before answering.
    pub process_delay: Mutex<Duration>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            info_calls: AtomicUsize::new(0),
            process_calls: AtomicUsize::new(0),
            audio_calls: AtomicUsize::new(0),
            last_info_body: Mutex::new(None),
            last_process_body: Mutex::new(None),
            info_reply: Mutex::new((StatusCode::OK, Value::Null)),
            process_reply: Mutex::new(ProcessReply::File {
                disposition: Some("attachment; filename=\"Test Clip_1080p.mp4\"".to_string()),
            }),
            process_delay: Mutex::new(Duration::ZERO),
        })
    }

    pub fn set_info_reply(&self, status: StatusCode, body: Value) {
        *self.info_reply.lock().unwrap() = (status, body);
    }

    pub fn set_process_reply(&self, reply: ProcessReply) {
        *self.process_reply.lock().unwrap() = reply;
    }

    pub fn set_process_delay(&self, delay: Duration) {
        *self.process_delay.lock().unwrap() = delay;
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }

    pub fn audio_calls(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }
}

pub fn video_info(base: &str) -> Value {
    json!({
        "title": "Test Clip",
        "thumbnail": "https://i.ytimg.com/vi/abc/hqdefault.jpg",
        "video_formats": [{"resolution": "1920x1080"}, {"resolution": "640x360"}],
        "audio_formats": [{
            "quality": "medium",
            "ext": "m4a",
            "url": format!("{}/media/audio.m4a", base),
            "filesize_str": "3.2MiB"
        }],
        "video_id": "abc"
    })
}

async fn get_info(State(mock): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    mock.info_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_info_body.lock().unwrap() = Some(body);
    let (status, reply) = mock.info_reply.lock().unwrap().clone();
    (status, Json(reply)).into_response()
}

async fn process_download(State(mock): State<Arc<MockBackend>>, Json(body): Json<Value>) -> Response {
    mock.process_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_process_body.lock().unwrap() = Some(body);
    let reply = mock.process_reply.lock().unwrap().clone();
    let delay = *mock.process_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    match reply {
        ProcessReply::File { disposition } => {
            let mut response = vec![7u8; VIDEO_BYTES].into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, "video/mp4".parse().unwrap());
            if let Some(disposition) = disposition {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, disposition.parse().unwrap());
            }
            response
        }
        ProcessReply::Chunked => {
            let chunks: Vec<Result<Vec<u8>, std::io::Error>> =
                (0..4).map(|_| Ok(vec![1u8; 1024])).collect();
            Body::from_stream(futures::stream::iter(chunks)).into_response()
        }
        ProcessReply::Trickle { chunks, interval } => {
            let stream = futures::stream::unfold(0, move |sent| async move {
                if sent == chunks {
                    return None;
                }
                tokio::time::sleep(interval).await;
                Some((Ok::<_, std::io::Error>(vec![5u8; 1024]), sent + 1))
            });
            Body::from_stream(stream).into_response()
        }
        ProcessReply::Error { status, body } => (status, Json(body)).into_response(),
    }
}

async fn audio(State(mock): State<Arc<MockBackend>>) -> Response {
    mock.audio_calls.fetch_add(1, Ordering::SeqCst);
    let mut response = vec![3u8; 2048].into_response();
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, "audio/mp4".parse().unwrap());
    response
}

/// Starts the fake backend and returns its base URL.
pub async fn spawn_backend(mock: Arc<MockBackend>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    mock.set_info_reply(StatusCode::OK, video_info(&base));

    let router = Router::new()
        .route("/api/get-info", post(get_info))
        .route("/api/process-download", post(process_download))
        .route("/media/audio.m4a", get(audio))
        .with_state(mock);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    base
}

/// Base URL nothing listens on.
pub async fn dead_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    base
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &str) {
        self.opened.lock().unwrap().push(url.to_string());
    }
}
