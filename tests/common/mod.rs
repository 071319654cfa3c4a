#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value as JsonValue;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use helpdesk_users::{
    dto::user_dto::CreateUserPayload,
    error::{Error, Result},
    middleware::auth::AuthKeys,
    models::user::{NewUser, User, UserChanges},
    routes,
    services::{upload_service::ProfileUploads, user_store::UserStore},
    utils::token::issue_token,
    AppState,
};

pub const BOUNDARY: &str = "----helpdesk-test-boundary";

/// In-memory [`UserStore`]. Picture writes can be made to fail to exercise
/// rollback paths.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<Vec<User>>>,
    fail_picture_writes: Arc<AtomicBool>,
}

impl MemoryUserStore {
    pub fn fail_picture_writes(&self, fail: bool) {
        self.fail_picture_writes.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.snapshot(id))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&new.email)) {
            return Err(Error::BadRequest("Email is already registered".into()));
        }
        let user = User::from_new(new);
        users.push(user.clone());
        Ok(user)
    }

    async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.apply(changes);
            u.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>> {
        let mut users = self.users.lock().unwrap();
        let pos = users.iter().position(|u| u.id == id);
        Ok(pos.map(|i| users.remove(i)))
    }

    async fn set_profile_picture(&self, id: Uuid, path: Option<String>) -> Result<Option<User>> {
        if self.fail_picture_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("store unavailable".into()));
        }
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
            u.profile_picture = path;
            u.clone()
        }))
    }
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: MemoryUserStore,
    pub uploads_root: TempDir,
}

pub fn setup() -> TestApp {
    let uploads_root = tempfile::tempdir().expect("tempdir");
    let store = MemoryUserStore::default();
    let state = AppState::new(
        Arc::new(store.clone()),
        ProfileUploads::new(uploads_root.path()),
        AuthKeys::new("test_secret_key", 1),
    );
    let app = routes::router(state.clone());
    TestApp {
        app,
        state,
        store,
        uploads_root,
    }
}

impl TestApp {
    pub async fn seed_user(&self, name: &str, email: &str, role: &str) -> (User, String) {
        let user = self
            .state
            .user_service
            .create(CreateUserPayload {
                name: name.into(),
                email: email.into(),
                password: "password123".into(),
                role: Some(role.into()),
                phone: Some("555-0100".into()),
                location: None,
                bio: None,
                department: Some("Support".into()),
                email_notifications: None,
                push_notifications: None,
            })
            .await
            .expect("seed user");
        let token = issue_token(&self.state.auth, &user).expect("token");
        (user, token)
    }

    pub fn profile_files(&self) -> Vec<String> {
        let dir = self.state.user_service.uploads().dir();
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn file_for(&self, public_url: &str) -> std::path::PathBuf {
        self.state
            .user_service
            .uploads()
            .path_for(public_url)
            .expect("path for url")
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, JsonValue) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, body)
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Option<JsonValue>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A multipart body with a single file field.
pub fn file_body(field: &str, file_name: &str, mime: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// A multipart body with only a text field.
pub fn text_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{f}\"\r\n\r\n{v}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = field,
        v = value
    )
    .into_bytes()
}

pub fn multipart_request(method: &str, uri: &str, token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn png_bytes(tag: u8) -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend(std::iter::repeat(tag).take(64));
    data
}
