//! Route-level tests through the full router and an in-memory database

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use std::net::SocketAddr;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use super::{build_router, AppState};
use crate::config::Config;
use crate::db::{create_test_pool, migrations::run_migrations};
use crate::models::{CreateUserInput, Role};
use crate::services::SessionSigner;

const PASSWORD: &str = "correct-horse-battery";

struct TestApp {
    router: Router,
    state: AppState,
    _uploads: TempDir,
}

async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let pool = create_test_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();

    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    configure(&mut config);

    let signer = SessionSigner::new(b"test-secret-test-secret-test-sec", 24);
    let state = AppState::new(pool, config, signer);
    TestApp {
        router: build_router(state.clone()),
        state,
        _uploads: uploads,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

impl TestApp {
    async fn create_user(&self, email: &str, role: Role) {
        self.state
            .user_service
            .create(CreateUserInput {
                email: email.to_string(),
                name: "Test User".to_string(),
                password: PASSWORD.to_string(),
                role,
            })
            .await
            .unwrap();
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn login(&self, email: &str) -> String {
        let (status, _, body) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_login_sets_cookie_and_me_accepts_it() {
    let app = spawn_app().await;
    app.create_user("admin@motionhouse.test", Role::Admin).await;

    let (status, headers, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "Admin@Motionhouse.test", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "ADMIN");
    assert!(body["user"].get("password_hash").is_none());

    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, session)
        .body(Body::empty())
        .unwrap();
    let (status, _, me) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "admin@motionhouse.test");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_generic() {
    let app = spawn_app().await;
    app.create_user("admin@motionhouse.test", Role::Admin).await;

    let (status, _, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "admin@motionhouse.test", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _, unknown) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "nobody@motionhouse.test", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown["error"]["message"], body["error"]["message"]);
}

#[tokio::test]
async fn test_role_groups() {
    let app = spawn_app().await;
    app.create_user("writer@motionhouse.test", Role::Writer).await;
    app.create_user("sales@motionhouse.test", Role::Sales).await;
    let writer = app.login("writer@motionhouse.test").await;
    let sales = app.login("sales@motionhouse.test").await;

    let (status, _, _) = app.get("/api/admin/dashboard", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, body) = app.get("/api/admin/users", Some(&writer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _, _) = app.get("/api/admin/leads", Some(&writer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app.get("/api/admin/articles", Some(&sales)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) = app.get("/api/admin/dashboard", Some(&writer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], 2);

    let (status, _, _) = app.get("/api/admin/leads", Some(&sales)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_pricing_estimate() {
    let app = spawn_app().await;

    let (status, _, body) = app
        .json(
            "POST",
            "/api/pricing/estimate",
            None,
            json!({ "minutes": 1, "complexity_factor": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["total"]["min"].as_f64().unwrap() - 2100.0).abs() < 1e-6);
    assert!((body["total"]["max"].as_f64().unwrap() - 2300.0).abs() < 1e-6);

    let (status, _, body) = app
        .json(
            "POST",
            "/api/pricing/estimate",
            None,
            json!({ "minutes": 0, "complexity_factor": 0.5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["minutes"].is_array());
}

#[tokio::test]
async fn test_contact_creates_lead_with_estimate() {
    let app = spawn_app().await;

    let (status, _, body) = app
        .json(
            "POST",
            "/api/contact",
            None,
            json!({
                "name": "Dana",
                "email": "dana@client.test",
                "message": "We need a 10 minute VFX piece",
                "estimate": { "minutes": 10, "complexity_factor": 1 }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let lead_id = body["lead_id"].as_i64().unwrap();
    assert!((body["estimate"]["total"]["min"].as_f64().unwrap() - 38300.0).abs() < 1e-6);

    let lead = app.state.lead_service.get(lead_id).await.unwrap();
    assert_eq!(lead.estimate_min, Some(body["estimate"]["total"]["min"].as_f64().unwrap()));
    assert_eq!(lead.source, "contact_form");
}

#[tokio::test]
async fn test_contact_rejects_unknown_fields() {
    let app = spawn_app().await;

    let (status, _, body) = app
        .json(
            "POST",
            "/api/contact",
            None,
            json!({
                "name": "Dana",
                "email": "dana@client.test",
                "message": "Hello",
                "status": "converted"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_contact_form_is_rate_limited() {
    let app = spawn_app_with(|config| config.rate_limit.form_submissions = 2).await;
    let body = json!({ "name": "Dana", "email": "dana@client.test", "message": "Hello" });

    for _ in 0..2 {
        let (status, _, _) = app.json("POST", "/api/contact", None, body.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, headers, err) = app.json("POST", "/api/contact", None, body).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err["error"]["code"], "RATE_LIMITED");
    assert!(headers.contains_key(header::RETRY_AFTER));
    assert!(err["error"]["details"]["retry_after"].as_i64().unwrap() > 0);
}

fn contact_from(peer: [u8; 4], forwarded_for: &str) -> Request<Body> {
    let body = json!({ "name": "Dana", "email": "dana@client.test", "message": "Hello" });
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/contact")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from(body.to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from((peer, 50000))));
    request
}

#[tokio::test]
async fn test_contact_limit_holds_when_forwarded_for_rotates() {
    let app = spawn_app_with(|config| config.rate_limit.form_submissions = 2).await;

    for n in 1..=2 {
        let (status, _, _) = app
            .send(contact_from([10, 0, 0, 5], &format!("198.51.100.{}", n)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _, err) = app
        .send(contact_from([10, 0, 0, 5], "198.51.100.3"))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err["error"]["code"], "RATE_LIMITED");

    // A different peer has its own window
    let (status, _, _) = app
        .send(contact_from([10, 0, 0, 6], "198.51.100.3"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_trusted_proxy_limits_per_forwarded_client() {
    let app = spawn_app_with(|config| {
        config.rate_limit.form_submissions = 1;
        config.server.trust_proxy = true;
    })
    .await;

    let (status, _, _) = app.send(contact_from([10, 0, 0, 1], "203.0.113.1")).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _, _) = app.send(contact_from([10, 0, 0, 1], "203.0.113.2")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, _) = app.send(contact_from([10, 0, 0, 1], "203.0.113.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_newsletter_duplicate_is_conflict() {
    let app = spawn_app().await;
    let body = json!({ "email": "fan@studio.test" });

    let (status, _, _) = app.json("POST", "/api/newsletter", None, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, err) = app.json("POST", "/api/newsletter", None, body.clone()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "CONFLICT");

    let (status, _, ok) = app
        .json("POST", "/api/newsletter/unsubscribe", None, body.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ok["ok"], true);

    let (status, _, _) = app.json("POST", "/api/newsletter", None, body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_settings_update_invalidates_public_cache() {
    let app = spawn_app().await;
    app.create_user("admin@motionhouse.test", Role::Admin).await;
    let admin = app.login("admin@motionhouse.test").await;

    let (status, _, before) = app.get("/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(before["site_name"], "Motionhouse");
    assert!(before.get("notification_email").is_none());

    let (status, _, updated) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            json!({ "site_name": "Studio North", "notification_email": "sales@studio.test" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["notification_email"], "sales@studio.test");

    let (_, _, after) = app.get("/api/settings", None).await;
    assert_eq!(after["site_name"], "Studio North");

    let (status, _, _) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            json!({ "theme": "dark" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_published_article_is_public() {
    let app = spawn_app().await;
    app.create_user("writer@motionhouse.test", Role::Writer).await;
    let writer = app.login("writer@motionhouse.test").await;

    let (status, _, draft) = app
        .json(
            "POST",
            "/api/admin/articles",
            Some(&writer),
            json!({ "title": "Behind the reel", "content": "# Draft" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let slug = draft["slug"].as_str().unwrap().to_string();

    let (status, _, _) = app.get(&format!("/api/articles/{}", slug), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = draft["id"].as_i64().unwrap();
    let (status, _, published) = app
        .json(
            "PUT",
            &format!("/api/admin/articles/{}", id),
            Some(&writer),
            json!({ "status": "PUBLISHED" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(published["published_at"].is_string());

    let (status, _, article) = app.get(&format!("/api/articles/{}", slug), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(article["title"], "Behind the reel");

    let (status, _, list) = app.get("/api/articles", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, _, _) = app
        .get("/api/admin/articles?status=bogus", Some(&writer))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lead_delete_requires_admin() {
    let app = spawn_app().await;
    app.create_user("admin@motionhouse.test", Role::Admin).await;
    app.create_user("sales@motionhouse.test", Role::Sales).await;
    let admin = app.login("admin@motionhouse.test").await;
    let sales = app.login("sales@motionhouse.test").await;

    let (_, _, created) = app
        .json(
            "POST",
            "/api/contact",
            None,
            json!({ "name": "Dana", "email": "dana@client.test", "message": "Hello" }),
        )
        .await;
    let lead_id = created["lead_id"].as_i64().unwrap();
    let uri = format!("/api/admin/leads/{}", lead_id);

    let (status, _, note) = app
        .json(
            "POST",
            &format!("{}/interactions", uri),
            Some(&sales),
            json!({ "kind": "CALL", "content": "Left a voicemail" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(note["kind"], "CALL");

    let (status, _, _) = app.json("DELETE", &uri, Some(&sales), Value::Null).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app.json("DELETE", &uri, Some(&admin), Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) = app.get(&uri, Some(&sales)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_paths_reject_traversal() {
    let app = spawn_app().await;

    for uri in [
        "/uploads/%2e%2e/config.yml",
        "/uploads/..%2Fconfig.yml",
        "/uploads/a%5Cb.png",
        "/uploads/a%00.png",
    ] {
        let (status, _, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }

    let (status, _, _) = app.get("/uploads/missing.png", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_uploaded_file_is_served() {
    let app = spawn_app().await;
    std::fs::write(app.state.config.upload.path.join("still.png"), b"\x89PNG").unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/uploads/still.png")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(response.headers()[header::CONTENT_SECURITY_POLICY], "sandbox");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"\x89PNG");
}

#[tokio::test]
async fn test_uploaded_file_supports_ranges() {
    let app = spawn_app().await;
    let reel: Vec<u8> = (0..=255).collect();
    std::fs::write(app.state.config.upload.path.join("reel.mp4"), &reel).unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/uploads/reel.mp4")
                .header(header::RANGE, "bytes=16-31")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers()[header::CONTENT_SECURITY_POLICY], "sandbox");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], &reel[16..32]);
}

#[tokio::test]
async fn test_upload_directory_is_not_served() {
    let app = spawn_app().await;
    std::fs::create_dir(app.state.config.upload.path.join("2026")).unwrap();

    let (status, _, body) = app.get("/uploads/2026", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bad_path_and_query_params_are_json_errors() {
    let app = spawn_app().await;
    app.create_user("owner@studio.test", Role::Admin).await;
    let token = app.login("owner@studio.test").await;

    for uri in [
        "/api/admin/users/abc",
        "/api/admin/leads/12x",
        "/api/admin/users?page=first",
        "/api/admin/activity?user_id=me",
    ] {
        let (status, headers, body) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json", "{}", uri);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", uri);
    }
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, _, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}
