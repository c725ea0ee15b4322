use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

/// Serves the router built by `build` on an ephemeral localhost port and
/// returns its base url. `build` gets that url so responses can link back.
pub async fn spawn_with<F>(build: F) -> String
where
    F: FnOnce(&str) -> Router,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let app = build(&base);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

pub async fn spawn(app: Router) -> String {
    spawn_with(|_| app).await
}

/// Base url of a port nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Requests the fake generation api received.
#[derive(Clone, Default)]
pub struct Recorded {
    pub chat: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    pub image: Arc<Mutex<Vec<Value>>>,
    pub downloads: Arc<AtomicUsize>,
}

impl Recorded {
    pub fn chat_calls(&self) -> usize {
        self.chat.lock().unwrap().len()
    }

    pub fn image_calls(&self) -> usize {
        self.image.lock().unwrap().len()
    }

    pub fn download_calls(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

/// Canned chat-completion and image-generation endpoints plus an image host.
/// `{base}` in the image body is replaced with the server's own url.
pub struct FakeApi {
    pub chat: (StatusCode, String),
    pub image: (StatusCode, String),
}

#[derive(Clone)]
struct FakeState {
    chat: (StatusCode, String),
    image: (StatusCode, String),
    recorded: Recorded,
}

impl FakeApi {
    pub fn ok(content: &str) -> Self {
        Self {
            chat: (StatusCode::OK, Self::chat_content(content)),
            image: (StatusCode::OK, Self::image_urls(&["{base}/img.png"])),
        }
    }

    pub fn chat_content(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
        .to_string()
    }

    pub fn image_urls(urls: &[&str]) -> String {
        let data: Vec<Value> = urls.iter().map(|u| json!({ "url": u })).collect();
        json!({ "created": 1, "data": data }).to_string()
    }

    pub async fn spawn(self) -> (String, Recorded) {
        let recorded = Recorded::default();
        let rec = recorded.clone();
        let base = spawn_with(move |base| {
            let state = FakeState {
                chat: self.chat,
                image: (self.image.0, self.image.1.replace("{base}", base)),
                recorded: rec,
            };
            Router::new()
                .route("/chat/completions", post(chat))
                .route("/images/generations", post(image))
                .route("/img.png", get(download))
                .with_state(state)
        })
        .await;
        (base, recorded)
    }
}

async fn chat(
    State(st): State<FakeState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    st.recorded.chat.lock().unwrap().push((auth, body));
    st.chat
}

async fn image(State(st): State<FakeState>, Json(body): Json<Value>) -> (StatusCode, String) {
    st.recorded.image.lock().unwrap().push(body);
    st.image
}

async fn download(State(st): State<FakeState>) -> ([(header::HeaderName, &'static str); 1], &'static [u8]) {
    st.recorded.downloads.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], FAKE_PNG)
}
