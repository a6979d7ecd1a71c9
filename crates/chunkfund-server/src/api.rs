use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use chunkfund_shared::format::format_currency;
use chunkfund_shared::types::{InvoiceId, Party, TransferId, TransferKind};
use chunkfund_store::{
    CashTransfer, Database, Invoice, InvoiceDetail, NewInvoice, PlatformEarnings,
    PurchaseOutcome, SettlementReport, User, UserDashboard,
};

use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::error::ServerError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
        }
    }

    /// Lock the ledger for the duration of one store call.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Database>, ServerError> {
        self.db
            .lock()
            .map_err(|e| ServerError::Internal(format!("Lock poisoned: {e}")))
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_users).post(create_user))
        .route("/invoices", get(list_open_invoices).post(create_invoice))
        .route("/invoices/:id", get(invoice_detail))
        .route("/invoices/:id/purchase", post(purchase_chunks))
        .route("/invoices/:id/activate", post(check_activation))
        .route("/invoices/:id/settle", post(settle_invoice))
        .route("/invoices/:id/transfers", get(invoice_transfers))
        .route("/transfers", get(transfer_history))
        .route("/me/dashboard", get(dashboard))
        .route("/platform/earnings", get(platform_earnings))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    instance: String,
}

#[derive(Deserialize)]
struct CreateUserRequest {
    username: String,
}

#[derive(Deserialize)]
struct PurchaseRequest {
    chunks: u32,
}

#[derive(Serialize)]
struct ActivationResponse {
    invoice_id: InvoiceId,
    activated: bool,
}

/// A transfer with its display labels filled in.
#[derive(Serialize)]
struct TransferView {
    id: TransferId,
    kind: TransferKind,
    description: String,
    amount: f64,
    amount_display: String,
    from: Party,
    from_label: String,
    to: Party,
    to_label: String,
    timestamp: DateTime<Utc>,
}

impl From<CashTransfer> for TransferView {
    fn from(t: CashTransfer) -> Self {
        Self {
            amount_display: format_currency(t.amount),
            from_label: t.from_label(),
            to_label: t.to_label(),
            id: t.id,
            kind: t.kind,
            description: t.description,
            amount: t.amount,
            from: t.from,
            to: t.to,
            timestamp: t.timestamp,
        }
    }
}

#[derive(Serialize)]
struct InvoiceTransfersView {
    invoice_id: InvoiceId,
    debtor_name: String,
    original_amount: f64,
    transfers: Vec<TransferView>,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        instance: state.config.instance_name.clone(),
    })
}

// ─── Users ───

async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ServerError> {
    let users = state.lock_db()?.list_users()?;
    Ok(Json(users))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ServerError> {
    let user = state.lock_db()?.create_user(&req.username)?;
    Ok((StatusCode::CREATED, Json(user)))
}

// ─── Invoices ───

async fn list_open_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<Invoice>>, ServerError> {
    let invoices = state.lock_db()?.list_open_invoices()?;
    Ok(Json(invoices))
}

async fn create_invoice(
    State(state): State<AppState>,
    ctx: RequestContext,
    Json(req): Json<NewInvoice>,
) -> Result<(StatusCode, Json<Invoice>), ServerError> {
    let invoice = state.lock_db()?.create_invoice(ctx.user_id(), &req)?;
    info!(invoice_id = %invoice.id, owner = %ctx.user.username, "Invoice listed via API");
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn invoice_detail(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<InvoiceDetail>, ServerError> {
    let detail = state.lock_db()?.invoice_detail(id)?;
    Ok(Json(detail))
}

async fn purchase_chunks(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<InvoiceId>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseOutcome>, ServerError> {
    let outcome = state.lock_db()?.purchase_chunks(id, ctx.user_id(), req.chunks)?;
    Ok(Json(outcome))
}

async fn check_activation(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<ActivationResponse>, ServerError> {
    let activated = state.lock_db()?.check_activation(id)?;
    Ok(Json(ActivationResponse {
        invoice_id: id,
        activated,
    }))
}

async fn settle_invoice(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<InvoiceId>,
) -> Result<Json<SettlementReport>, ServerError> {
    let report = state.lock_db()?.settle_owner_payment(id, ctx.user_id())?;
    info!(
        invoice_id = %id,
        owner = %ctx.user.username,
        fee = %format_currency(report.plan.platform_fee),
        "Invoice marked as paid via API"
    );
    Ok(Json(report))
}

// ─── Cash transfers ───

async fn invoice_transfers(
    State(state): State<AppState>,
    Path(id): Path<InvoiceId>,
) -> Result<Json<Vec<TransferView>>, ServerError> {
    let transfers = {
        let db = state.lock_db()?;
        db.get_invoice(id)?;
        db.list_transfers_for_invoice(id)?
    };
    Ok(Json(transfers.into_iter().map(TransferView::from).collect()))
}

async fn transfer_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceTransfersView>>, ServerError> {
    let history = state.lock_db()?.transfer_history()?;
    let views = history
        .into_iter()
        .map(|entry| InvoiceTransfersView {
            invoice_id: entry.invoice_id,
            debtor_name: entry.debtor_name,
            original_amount: entry.original_amount,
            transfers: entry.transfers.into_iter().map(TransferView::from).collect(),
        })
        .collect();
    Ok(Json(views))
}

// ─── Reports ───

async fn dashboard(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<UserDashboard>, ServerError> {
    let dash = state.lock_db()?.user_dashboard(ctx.user_id())?;
    Ok(Json(dash))
}

async fn platform_earnings(
    State(state): State<AppState>,
) -> Result<Json<PlatformEarnings>, ServerError> {
    let earnings = state.lock_db()?.platform_earnings()?;
    Ok(Json(earnings))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
