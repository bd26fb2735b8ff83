//! Demo service wiring a database, a token issuer, and a web engine into one
//! container.
//!
//! ```text
//! armature-demo --db-dsn sqlite://demo.db --http-port 3000
//! ```
//!
//! Routes: `GET /healthz` pings the database, `POST /tokens` issues a signed
//! token for a subject, `GET /me` echoes the claims of a presented bearer
//! token.

mod shutdown;

use std::sync::Arc;

use armature::Container;
use armature_db::SqlDb;
use armature_http::{ApiError, WebEngine};
use armature_token::TokenIssuer;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    db: Arc<SqlDb>,
    tokens: Arc<TokenIssuer>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("armature-demo: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let container = Container::builder()
        .name("armature-demo")
        .register(Arc::new(SqlDb::new("db", "")))
        .register(Arc::new(TokenIssuer::new("jwt")))
        .register(Arc::new(WebEngine::new("web", "")))
        .build();

    container.load().await?;

    let log = container.logger("armature-demo");
    let db = match container.lookup_as::<SqlDb>("db") {
        Some(db) => db,
        None => log.fatal("database component missing"),
    };
    let tokens = match container.lookup_as::<TokenIssuer>("jwt") {
        Some(tokens) => tokens,
        None => log.fatal("token component missing"),
    };
    let web = match container.lookup_as::<WebEngine>("web") {
        Some(web) => web,
        None => log.fatal("web component missing"),
    };

    let state = AppState { db, tokens };
    let routes = Router::new()
        .route("/healthz", get(healthz))
        .route("/tokens", post(issue_token))
        .route("/me", get(whoami))
        .with_state(state);
    web.merge(routes)?;

    let mut server = tokio::spawn({
        let web = web.clone();
        async move { web.serve().await }
    });

    tokio::select! {
        res = &mut server => {
            // The engine never exits on its own; reaching here is a failure.
            container.stop().await?;
            return match res {
                Ok(outcome) => outcome,
                Err(join_err) => Err(join_err.into()),
            };
        }
        _ = shutdown::wait_for_shutdown() => {
            log.info("shutdown signal received");
        }
    }

    container.stop().await?;
    server.await??;
    Ok(())
}

async fn healthz(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let pool = state
        .db
        .pool()
        .map_err(|err| ApiError::database(err.to_string()))?;
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|err| ApiError::database(err.to_string()))?;
    Ok(Json(json!({ "status": "ok" })))
}

#[derive(Deserialize)]
struct IssueRequest {
    sub: String,
    lifetime_secs: Option<u64>,
}

async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<IssueRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.sub.trim().is_empty() {
        return Err(ApiError::validation("'sub' must not be empty"));
    }
    let token_id = Uuid::new_v4().to_string();
    let (token, lifetime) = state
        .tokens
        .issue(&token_id, &req.sub, req.lifetime_secs)
        .map_err(|err| ApiError::internal(err.to_string()))?;
    Ok(Json(json!({
        "token": token,
        "expires_in": lifetime,
    })))
}

async fn whoami(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    let claims = state
        .tokens
        .parse(token)
        .map_err(|err| ApiError::invalid_token(err.to_string()))?;
    Ok(Json(json!({
        "sub": claims.sub,
        "jti": claims.jti,
        "exp": claims.exp,
    })))
}
