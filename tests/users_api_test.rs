mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use helpdesk_users::error::Error;
use serde_json::json;
use uuid::Uuid;

use common::{json_request, setup};

#[tokio::test]
async fn list_users_omits_passwords_and_requires_staff() {
    let app = setup();
    let (_, admin_token) = app.seed_user("Root", "root@example.com", "admin").await;
    let (_, manager_token) = app.seed_user("Mia", "mia@example.com", "manager").await;
    let (_, agent_token) = app.seed_user("Aldo", "aldo@example.com", "agent").await;

    let (status, body) = app
        .send(json_request("GET", "/api/users", Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["count"], 3);
    for user in body["users"].as_array().unwrap() {
        assert!(user.get("password").is_none());
        assert!(user.get("passwordHash").is_none());
        assert!(user.get("password_hash").is_none());
    }

    let (status, _) = app
        .send(json_request("GET", "/api/users", Some(&manager_token), None))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(json_request("GET", "/api/users", Some(&agent_token), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(json_request("GET", "/api/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(json_request("GET", "/api/users", Some("not-a-token"), None))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn get_user_by_unknown_id_is_not_found() {
    let app = setup();
    let (admin, admin_token) = app.seed_user("Root", "root@example.com", "admin").await;

    let uri = format!("/api/users/{}", Uuid::new_v4());
    let (status, body) = app
        .send(json_request("GET", &uri, Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "User not found");

    let uri = format!("/api/users/{}", admin.id);
    let (status, body) = app
        .send(json_request("GET", &uri, Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "root@example.com");
}

#[tokio::test]
async fn own_profile_update_ignores_email_and_other_fields() {
    let app = setup();
    let (user, token) = app.seed_user("Aldo", "aldo@example.com", "agent").await;

    let payload = json!({
        "name": "Aldo Moro",
        "email": "hijack@example.com",
        "role": "admin",
        "department": "Finance",
        "bio": "Tier 2 support",
        "pushNotifications": true
    });
    let (status, body) = app
        .send(json_request("PUT", "/api/users/profile", Some(&token), Some(payload)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Aldo Moro");
    assert_eq!(body["user"]["email"], "aldo@example.com");
    assert_eq!(body["user"]["role"], "agent");
    assert_eq!(body["user"]["department"], "Support");
    assert_eq!(body["user"]["bio"], "Tier 2 support");
    assert_eq!(body["user"]["pushNotifications"], true);
    assert_eq!(body["user"]["phone"], "555-0100");

    let stored = app.store.snapshot(user.id).unwrap();
    assert_eq!(stored.email, "aldo@example.com");
    assert_eq!(stored.role, "agent");

    let (status, body) = app
        .send(json_request("GET", "/api/users/profile", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Aldo Moro");
}

#[tokio::test]
async fn own_profile_update_rejects_empty_name() {
    let app = setup();
    let (_, token) = app.seed_user("Aldo", "aldo@example.com", "agent").await;

    let (status, body) = app
        .send(json_request(
            "PUT",
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn admin_manages_users() {
    let app = setup();
    let (_, admin_token) = app.seed_user("Root", "root@example.com", "admin").await;
    let (_, agent_token) = app.seed_user("Aldo", "aldo@example.com", "agent").await;

    let new_user = json!({
        "name": "Nora",
        "email": "Nora@Example.com",
        "password": "secret1",
        "role": "agent",
        "department": "Billing"
    });

    let (status, _) = app
        .send(json_request("POST", "/api/users", Some(&agent_token), Some(new_user.clone())))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request("POST", "/api/users", Some(&admin_token), Some(new_user.clone())))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["email"], "nora@example.com");
    assert_eq!(body["user"]["role"], "agent");
    assert!(body["user"]["profilePicture"].is_null());
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(json_request("POST", "/api/users", Some(&admin_token), Some(new_user)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is already registered");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&admin_token),
            Some(json!({ "name": "X", "email": "not-an-email", "password": "secret1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&admin_token),
            Some(json!({ "name": "X", "email": "x@example.com", "password": "secret1", "role": "root" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/users/{}", id);
    let (status, body) = app
        .send(json_request(
            "PUT",
            &uri,
            Some(&admin_token),
            Some(json!({ "role": "manager", "department": "Escalations" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "manager");
    assert_eq!(body["user"]["department"], "Escalations");
    assert_eq!(body["user"]["name"], "Nora");

    let missing = format!("/api/users/{}", Uuid::new_v4());
    let (status, _) = app
        .send(json_request("PUT", &missing, Some(&admin_token), Some(json!({ "name": "Y" }))))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(json_request("DELETE", &uri, Some(&agent_token), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request("DELETE", &uri, Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, _) = app
        .send(json_request("DELETE", &uri, Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_then_me() {
    let app = setup();
    app.seed_user("Aldo", "aldo@example.com", "agent").await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "aldo@example.com", "password": "wrong-password" })),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "aldo@example.com", "password": "password123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user"]["name"], "Aldo");

    let (status, body) = app
        .send(json_request("GET", "/api/auth/me", Some(&token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "aldo@example.com");
}

#[tokio::test]
async fn health_and_openapi_are_public() {
    let app = setup();

    let (status, body) = app.send(json_request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["uploads"], "missing");

    app.state.user_service.uploads().ensure_dir().await.unwrap();
    let (_, body) = app.send(json_request("GET", "/api/health", None, None)).await;
    assert_eq!(body["uploads"], "ready");

    let (status, body) = app
        .send(json_request("GET", "/api/openapi.json", None, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/users/profile/picture"].is_object());
}

#[tokio::test]
async fn malformed_ids_and_bodies_get_the_json_error_body() {
    let app = setup();
    let (_, admin_token) = app.seed_user("Root", "root@example.com", "admin").await;

    let (status, body) = app
        .send(json_request("GET", "/api/users/not-a-uuid", Some(&admin_token), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let req = Request::builder()
        .method("PUT")
        .uri("/api/users/profile")
        .header("authorization", format!("Bearer {}", admin_token))
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "root@example.com" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let app = setup();
    let (user, token) = app.seed_user("Aldo", "aldo@example.com", "agent").await;
    let (_, admin_token) = app.seed_user("Root", "root@example.com", "admin").await;

    let (status, body) = app
        .send(json_request(
            "PUT",
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "   " })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Name is required"));
    assert_eq!(app.store.snapshot(user.id).unwrap().name, "Aldo");

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/users",
            Some(&admin_token),
            Some(json!({ "name": "   ", "email": "blank@example.com", "password": "secret1" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/users/{}", user.id);
    let (status, _) = app
        .send(json_request("PUT", &uri, Some(&admin_token), Some(json!({ "name": "\t" }))))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(json_request(
            "PUT",
            "/api/users/profile",
            Some(&token),
            Some(json!({ "name": "  Aldo Moro  " })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "Aldo Moro");
}

#[tokio::test]
async fn admin_bootstrap_validates_and_runs_once() {
    let app = setup();
    let users = &app.state.user_service;

    assert!(matches!(
        users.bootstrap_admin("not-an-email", "secret123").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        users.bootstrap_admin("ops@example.com", "short").await,
        Err(Error::Validation(_))
    ));
    assert!(users.list().await.unwrap().is_empty());

    let admin = users
        .bootstrap_admin("ops@example.com", "secret123")
        .await
        .unwrap()
        .expect("admin created");
    assert_eq!(admin.role, "admin");
    assert!(users
        .bootstrap_admin("OPS@example.com", "other-secret")
        .await
        .unwrap()
        .is_none());
    assert_eq!(users.list().await.unwrap().len(), 1);

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ops@example.com", "password": "secret123" })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
}
