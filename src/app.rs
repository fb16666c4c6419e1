/*
 * Responsibility
 * - Config読み込み → 依存生成 (pool, services) → Router 組み立て
 * - Middleware の適用 (request-id / trace / limit / timeout, Bearer guard)
 * - axum::serve() で起動し、Ctrl-C / SIGTERM で graceful shutdown
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::{Config, HttpSettings},
    middleware,
    repos::{PgTaskRepo, PgUserRepo},
    services::{
        accounts::AccountService,
        auth::{PasswordHasher, TokenService},
        tasks::TaskService,
    },
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG=info,task_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development: 即クラッシュさせて気づけるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let state = build_state(&config, pool.clone())?;
    let app = build_router(state, &config.http);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

fn build_state(config: &Config, pool: PgPool) -> Result<AppState> {
    let tokens = Arc::new(TokenService::new(&config.tokens)?);
    let passwords = PasswordHasher::new(&config.passwords)?;

    let accounts = AccountService::new(
        Arc::new(PgUserRepo::new(pool.clone())),
        passwords,
        tokens.clone(),
    );
    let tasks = TaskService::new(Arc::new(PgTaskRepo::new(pool)));

    Ok(AppState::new(accounts, tasks, tokens))
}

pub(crate) fn build_router(state: AppState, http: &HttpSettings) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, http)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::testing;

    struct TestApp {
        router: Router,
        repo: Arc<crate::repos::memory::MemoryRepo>,
    }

    impl TestApp {
        fn new() -> Self {
            let (state, repo) = testing::memory_state();
            Self {
                router: build_router(state, &HttpSettings::default()),
                repo,
            }
        }

        async fn call(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };

            let response = self
                .router
                .clone()
                .oneshot(builder.body(body).unwrap())
                .await
                .unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        async fn signup(&self, username: &str, password: &str) -> String {
            let creds = json!({"username": username, "password": password});
            let (status, _) = self
                .call("POST", "/api/v1/auth/register", None, Some(creds.clone()))
                .await;
            assert_eq!(status, StatusCode::CREATED);

            let (status, body) = self
                .call("POST", "/api/v1/auth/login", None, Some(creds))
                .await;
            assert_eq!(status, StatusCode::OK);
            body["access_token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.call("GET", "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn register_and_login_responses() {
        let app = TestApp::new();
        let creds = json!({"username": "alice", "password": "pw123"});

        let (status, body) = app
            .call("POST", "/api/v1/auth/register", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert!(body.get("password_hash").is_none());

        let (status, body) = app
            .call("POST", "/api/v1/auth/register", None, Some(creds.clone()))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let (status, body) = app.call("POST", "/api/v1/auth/login", None, Some(creds)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3600);
    }

    #[tokio::test]
    async fn bad_logins_are_indistinguishable() {
        let app = TestApp::new();
        app.signup("alice", "pw123").await;

        let wrong = json!({"username": "alice", "password": "nope"});
        let unknown = json!({"username": "mallory", "password": "pw123"});
        let (s1, b1) = app.call("POST", "/api/v1/auth/login", None, Some(wrong)).await;
        let (s2, b2) = app.call("POST", "/api/v1/auth/login", None, Some(unknown)).await;

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(b1, b2);
        assert_eq!(b1["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn register_rejects_missing_fields() {
        let app = TestApp::new();
        let (status, body) = app
            .call("POST", "/api/v1/auth/register", None, Some(json!({"username": "alice"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = TestApp::new();

        let (status, body) = app.call("GET", "/api/v1/tasks", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "TOKEN_MISSING");

        let (status, body) = app.call("GET", "/api/v1/tasks", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "TOKEN_INVALID");

        let expired = testing::token_service()
            .issue_at(uuid::Uuid::new_v4(), chrono::Utc::now() - chrono::Duration::hours(2))
            .unwrap();
        let (status, body) = app
            .call("GET", "/api/v1/tasks", Some(&expired.access_token), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
    }

    #[tokio::test]
    async fn rejected_write_persists_nothing() {
        let app = TestApp::new();

        let (status, _) = app
            .call("POST", "/api/v1/tasks", None, Some(json!({"title": "sneaky"})))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = app.signup("alice", "pw123").await;
        let (status, body) = app
            .call("POST", "/api/v1/tasks", Some(&token), Some(json!({"title": "  "})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = app
            .call(
                "POST",
                "/api/v1/tasks",
                Some(&token),
                Some(json!({"title": "x", "owner_id": "someone-else"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert_eq!(app.repo.task_count(), 0);
    }

    #[tokio::test]
    async fn tasks_are_isolated_between_users() {
        let app = TestApp::new();
        let alice = app.signup("alice", "pw123").await;
        let bob = app.signup("bob", "hunter2").await;

        let (status, created) = app
            .call("POST", "/api/v1/tasks", Some(&alice), Some(json!({"title": "Buy milk"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["status"], "pending");
        assert!(created.get("owner_id").is_none());
        let task_uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

        let (_, listed) = app.call("GET", "/api/v1/tasks", Some(&bob), None).await;
        assert_eq!(listed["tasks"], json!([]));
        assert_eq!(listed["pagination"]["total_items"], 0);

        let (missing_status, missing_body) = app
            .call(
                "GET",
                &format!("/api/v1/tasks/{}", uuid::Uuid::new_v4()),
                Some(&bob),
                None,
            )
            .await;

        let (status, body) = app.call("GET", &task_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!((status, &body), (missing_status, &missing_body));

        let (status, body) = app
            .call("PATCH", &task_uri, Some(&bob), Some(json!({"title": "hacked"})))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, missing_body);

        let (status, _) = app.call("DELETE", &task_uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app.call("GET", &task_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Buy milk");
    }

    #[tokio::test]
    async fn owner_can_update_and_delete() {
        let app = TestApp::new();
        let alice = app.signup("alice", "pw123").await;

        let (_, created) = app
            .call(
                "POST",
                "/api/v1/tasks",
                Some(&alice),
                Some(json!({"title": "Buy milk", "description": "2 liters"})),
            )
            .await;
        let task_uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

        let (status, body) = app
            .call("PUT", &task_uri, Some(&alice), Some(json!({"status": "done"})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "done");
        assert_eq!(body["description"], "2 liters");

        let (status, _) = app
            .call("PATCH", &task_uri, Some(&alice), Some(json!({"status": "To Do"})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .call("PATCH", &task_uri, Some(&alice), Some(json!({"description": null})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], Value::Null);
        assert_eq!(body["status"], "done");

        let (status, body) = app.call("DELETE", &task_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _) = app.call("GET", &task_uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_task_id_is_a_validation_error() {
        let app = TestApp::new();
        let alice = app.signup("alice", "pw123").await;

        let (status, body) = app
            .call("GET", "/api/v1/tasks/not-a-uuid", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn listing_is_paginated() {
        let app = TestApp::new();
        let alice = app.signup("alice", "pw123").await;
        for i in 1..=4 {
            app.call(
                "POST",
                "/api/v1/tasks",
                Some(&alice),
                Some(json!({"title": format!("task {i}")})),
            )
            .await;
        }

        let (status, body) = app.call("GET", "/api/v1/tasks", Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tasks"].as_array().unwrap().len(), 3);
        assert_eq!(body["tasks"][0]["title"], "task 4");
        assert_eq!(
            body["pagination"],
            json!({
                "total_items": 4,
                "total_pages": 2,
                "current_page": 1,
                "per_page": 3,
                "has_next": true,
                "has_prev": false,
            })
        );

        let (_, body) = app
            .call("GET", "/api/v1/tasks?page=2&per_page=3", Some(&alice), None)
            .await;
        assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"]["has_next"], false);

        let (status, _) = app
            .call("GET", "/api/v1/tasks?page=0", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .call("GET", "/api/v1/tasks?per_page=abc", Some(&alice), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn storage_outage_is_a_generic_500() {
        let app = TestApp::new();
        let alice = app.signup("alice", "pw123").await;
        app.repo.set_unavailable(true);

        let (status, body) = app.call("GET", "/api/v1/tasks", Some(&alice), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
        assert_eq!(body["error"]["message"], "internal server error");
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let app = TestApp::new();
        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
