//! HTTP surface of the self-order gateway.
//!
//! Routes:
//! - `GET /pos-self-order/return-to-order` — payment-return redirect
//! - `GET /pos-self-order/orders/{id}/summary` — per-visit order summary
//! - `GET /pos-self-order/configs/{id}/landing` — landing button visibility
//! - `POST /pos-self-order/orders` — create an order
//! - `POST /pos-self-order/orders/{id}/lines` — append a batch of lines
//! - `POST /pos-self-order/orders/{id}/submit` — mark sent to kitchen
//! - `POST /pos-self-order/orders/{id}/settle` — unpaid -> paid
//! - `GET /health` — liveness probe

use actix_web::http::{header, StatusCode};
use actix_web::{web, App, HttpResponse, HttpServer, Responder, ResponseError};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::db::DbState;
use crate::orders;
use crate::resolver::ReferenceResolver;
use crate::store::{SelfOrderStore, SqliteStore, StoreError};

/// Shared application state: one db connection plus the resolver settings
/// loaded at startup.
pub struct AppState {
    pub db: DbState,
    pub resolver: ReferenceResolver,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// HTTP-facing error. Domain `String` errors are classified by message;
/// store errors keep their own mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => ApiError::NotFound(format!("order not found: {id}")),
            StoreError::Db(e) => ApiError::Internal(format!("database error: {e}")),
        }
    }
}

/// Classify a domain-layer error message.
fn domain_error(message: String) -> ApiError {
    if message.contains("not found") {
        ApiError::NotFound(message)
    } else if message.contains("already settled") {
        ApiError::Conflict(message)
    } else {
        ApiError::BadRequest(message)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "error": self.to_string() }))
    }
}

/// Lock the shared connection, mapping poisoning to a 500.
fn lock_conn(state: &AppState) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>, ApiError> {
    state
        .db
        .conn
        .lock()
        .map_err(|e| ApiError::Internal(format!("store unavailable: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ReturnToOrderQuery {
    pub reference: Option<String>,
}

/// Payment-return redirect. Always answers with a 303 to somewhere
/// navigable; only a store failure surfaces as an error.
async fn return_to_order(
    state: web::Data<AppState>,
    query: web::Query<ReturnToOrderQuery>,
) -> Result<HttpResponse, ApiError> {
    let conn = lock_conn(&state)?;
    let store = SqliteStore::new(&conn);
    let target = state.resolver.resolve(query.reference.as_deref(), &store)?;

    info!(
        config_id = target.config_id,
        location = %target.location,
        "payment return redirect"
    );
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, target.location))
        .finish())
}

/// Per-visit order summary as JSON.
async fn order_summary(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let conn = lock_conn(&state)?;
    let summary = orders::order_summary(&conn, &order_id)?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Landing button visibility for a config.
async fn landing_visibility(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, ApiError> {
    let config_id = path.into_inner();
    let conn = lock_conn(&state)?;
    let store = SqliteStore::new(&conn);

    let config = store
        .list_configs(&[])?
        .into_iter()
        .find(|c| c.id == config_id)
        .ok_or_else(|| ApiError::NotFound(format!("config not found: {config_id}")))?;
    let drafts = orders::list_draft_orders(&conn, config_id)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "offersContinueOrdering": orders::offers_continue_ordering(&config, &drafts),
        "hidesProductsLink": orders::hides_products_link(&config, &drafts),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    #[serde(alias = "config_id")]
    pub config_id: i64,
}

async fn create_order(
    state: web::Data<AppState>,
    payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, ApiError> {
    let conn = lock_conn(&state)?;
    let order = orders::create_order(&conn, payload.config_id).map_err(domain_error)?;
    Ok(HttpResponse::Created().json(order))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendLinesPayload {
    pub items: Vec<orders::NewLine>,
    /// Open a new ordering session for this batch (the "continue
    /// ordering" flow).
    #[serde(default, alias = "new_session")]
    pub new_session: bool,
}

async fn append_lines(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<AppendLinesPayload>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let conn = lock_conn(&state)?;
    let session = orders::append_lines(&conn, &order_id, &payload.items, payload.new_session)
        .map_err(domain_error)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "session": session })))
}

async fn submit_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let conn = lock_conn(&state)?;
    orders::mark_submitted(&conn, &order_id).map_err(domain_error)?;
    Ok(HttpResponse::NoContent().finish())
}

async fn settle_order(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    let conn = lock_conn(&state)?;
    orders::settle_order(&conn, &order_id).map_err(domain_error)?;
    Ok(HttpResponse::NoContent().finish())
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "pos-self-order-gateway"
    }))
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Register all routes. Shared so tests can mount the same app.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/pos-self-order")
            .route("/return-to-order", web::get().to(return_to_order))
            .route("/orders", web::post().to(create_order))
            .route("/orders/{order_id}/summary", web::get().to(order_summary))
            .route("/orders/{order_id}/lines", web::post().to(append_lines))
            .route("/orders/{order_id}/submit", web::post().to(submit_order))
            .route("/orders/{order_id}/settle", web::post().to(settle_order))
            .route(
                "/configs/{config_id}/landing",
                web::get().to(landing_visibility),
            ),
    )
    .route("/health", web::get().to(health));
}

/// Run the HTTP server until shutdown.
pub async fn run(state: AppState, bind: &str) -> std::io::Result<()> {
    let data = web::Data::new(state);
    info!("Listening on http://{bind}");

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(bind)?
        .run()
        .await
}

// ===========================================================================
// Tests
// ===========================================================================
