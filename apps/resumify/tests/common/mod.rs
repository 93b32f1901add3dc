//! In-memory Resume Service served over real HTTP on an ephemeral port.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use resumify::api_client::HttpResumeApi;
use resumify::models::chat::WireMessage;
use resumify::models::resume::{ResumeDocument, ResumeForm};
use resumify::state::ClientState;

pub const PAGE: &str = "cGFnZQ=="; // "page"

#[derive(Default)]
pub struct Store {
    pub resumes: Vec<ResumeDocument>,
    pub next_id: usize,
    pub puts: Vec<(String, Value)>,
    pub chat_reply: String,
    pub chat_bodies: Vec<Value>,
    pub uploads: Vec<(String, Option<String>, usize)>,
}

impl Store {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", self.next_id)
    }

    fn find(&self, id: &str) -> Option<&ResumeDocument> {
        self.resumes.iter().find(|r| r.id == id)
    }
}

type Shared = Arc<Mutex<Store>>;
type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": { "code": "NOT_FOUND", "message": "Resume not found" } })),
    )
}

pub struct FakeBackend {
    pub base_url: String,
    pub store: Shared,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let store: Shared = Arc::new(Mutex::new(Store {
            chat_reply: "Happy to help.".to_string(),
            ..Default::default()
        }));
        let app = Router::new()
            .route("/api/resumes", get(list_resumes))
            .route("/api/resume", post(create_resume))
            .route("/api/resume/:id", put(update_resume).delete(delete_resume))
            .route("/api/resume/duplicate/:id", post(duplicate_resume))
            .route("/api/resume/preview/:id", get(preview_resume))
            .route("/api/resume/download/:id", get(download_resume))
            .route("/api/score", post(score))
            .route("/api/chat", post(chat))
            .route("/api/speech", post(speech))
            .route("/api/transcribe", post(transcribe))
            .route("/api/examples", get(list_examples))
            .route("/api/example/preview/:id", get(preview_example))
            .route("/api/example/use/:id", post(use_example))
            .with_state(store.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            store,
        }
    }

    /// Client state against this backend with a short autosave quiet period.
    pub fn client_state(&self, quiet: Duration) -> ClientState {
        let api = HttpResumeApi::new(self.base_url.clone(), Duration::from_secs(5)).unwrap();
        ClientState::with_api(Arc::new(api), quiet)
    }

    pub fn seed(&self, form: ResumeForm) -> String {
        let mut store = self.store.lock();
        let id = store.fresh_id();
        store.resumes.push(ResumeDocument {
            id: id.clone(),
            form,
            created_at: Some("2024-01-01T00:00:00.000Z".to_string()),
            updated_at: Some("2024-01-01T00:00:00.000Z".to_string()),
            images: Vec::new(),
        });
        id
    }

    pub fn stored(&self, id: &str) -> Option<ResumeForm> {
        self.store.lock().find(id).map(|r| r.form.clone())
    }

    pub fn put_count(&self) -> usize {
        self.store.lock().puts.len()
    }

    pub fn reply_with(&self, text: &str) {
        self.store.lock().chat_reply = text.to_string();
    }
}

async fn list_resumes(State(store): State<Shared>) -> Json<Vec<ResumeDocument>> {
    Json(store.lock().resumes.clone())
}

async fn create_resume(State(store): State<Shared>) -> (StatusCode, Json<Value>) {
    let mut store = store.lock();
    let id = store.fresh_id();
    store.resumes.push(ResumeDocument {
        id: id.clone(),
        ..Default::default()
    });
    (StatusCode::CREATED, Json(json!({ "id": id })))
}

async fn update_resume(
    State(store): State<Shared>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ResumeDocument>> {
    let form: ResumeForm = serde_json::from_value(body.clone()).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": e.to_string() })),
        )
    })?;
    let mut store = store.lock();
    store.puts.push((id.clone(), body));
    let doc = store
        .resumes
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(not_found)?;
    doc.form = form;
    doc.updated_at = Some("2024-01-02T00:00:00.000Z".to_string());
    let mut reply = doc.clone();
    reply.images = vec![PAGE.to_string()];
    Ok(Json(reply))
}

async fn delete_resume(
    State(store): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut store = store.lock();
    let before = store.resumes.len();
    store.resumes.retain(|r| r.id != id);
    if store.resumes.len() == before {
        return Err(not_found());
    }
    Ok(Json(json!({ "message": "Resume deleted" })))
}

async fn duplicate_resume(
    State(store): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let mut store = store.lock();
    let mut copy = store.find(&id).cloned().ok_or_else(not_found)?;
    copy.id = store.fresh_id();
    let new_id = copy.id.clone();
    store.resumes.push(copy);
    Ok(Json(json!({ "id": new_id })))
}

async fn preview_resume(
    State(store): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    store.lock().find(&id).ok_or_else(not_found)?;
    Ok(Json(json!({ "images": [format!("data:image/jpeg;base64,{PAGE}")] })))
}

async fn download_resume(
    State(store): State<Shared>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    store.lock().find(&id).ok_or_else(not_found)?;
    Ok(([(header::CONTENT_TYPE, "application/pdf")], b"%PDF-1.4 test".to_vec()))
}

async fn score(Json(body): Json<Value>) -> ApiResult<Json<Value>> {
    match body.get("resume_id").and_then(Value::as_str) {
        Some(_) => Ok(Json(json!({ "score": 81.0 }))),
        None => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "resume_id is required" })),
        )),
    }
}

async fn chat(State(store): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut store = store.lock();
    store.chat_bodies.push(body.clone());
    let mut messages: Vec<WireMessage> =
        serde_json::from_value(body["messages"].clone()).unwrap_or_default();
    messages.push(WireMessage {
        role: "assistant".to_string(),
        content: store.chat_reply.clone(),
    });
    Json(json!({ "messages": messages }))
}

async fn speech(Json(body): Json<Value>) -> impl IntoResponse {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    ([(header::CONTENT_TYPE, "audio/mpeg")], format!("mp3:{text}"))
}

async fn transcribe(State(store): State<Shared>, mut multipart: Multipart) -> Json<Value> {
    let mut size = 0;
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.unwrap();
        size = data.len();
        store.lock().uploads.push((name, file_name, size));
    }
    Json(json!({ "transcription": format!("heard {size} bytes") }))
}

async fn list_examples() -> Json<Value> {
    Json(json!([
        { "_id": "example-1", "wantedJobTitle": "Data Scientist", "firstName": "Sam" },
        { "_id": "example-2", "wantedJobTitle": "Chef" }
    ]))
}

async fn preview_example(Path(_id): Path<String>) -> Json<Value> {
    Json(json!({ "images": [PAGE, PAGE] }))
}

async fn use_example(State(store): State<Shared>, Path(id): Path<String>) -> Json<Value> {
    let mut store = store.lock();
    let new_id = store.fresh_id();
    store.resumes.push(ResumeDocument {
        id: new_id.clone(),
        form: ResumeForm {
            wanted_job_title: format!("from {id}"),
            ..Default::default()
        },
        ..Default::default()
    });
    Json(json!({ "id": new_id }))
}
