use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cipherisk_engine::signatures::{decrypt_request_message, sign, verify_signature, SigningKey};
use cipherisk_engine::{Decryptor, EncryptedArithmetic, EngineError};
use cipherisk_execution::{ownership, registry, results, ErrorKind};
use cipherisk_service::{RiskService, SubmitError};
use cipherisk_types::transaction::Transaction;
use cipherisk_types::{CiphertextHandle, ResultId, RiskEvent};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing::info;

pub struct AppState<E> {
    pub service: RiskService<E>,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

/// Engines the HTTP layer can serve: usable by the service and able to
/// answer ACL-checked decryption requests.
pub trait ServedEngine:
    EncryptedArithmetic + Decryptor + Clone + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<E> ServedEngine for E
where
    E: EncryptedArithmetic + Decryptor + Clone + Serialize + DeserializeOwned,
    E: Send + Sync + 'static,
{
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub kind: Option<ErrorKind>,
    pub retryable: bool,
    pub message: String,
}

pub struct ApiError(StatusCode, ErrorBody);

impl ApiError {
    fn new(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError(
            status,
            ErrorBody { kind: Some(kind), retryable: kind.is_retryable(), message: message.into() },
        )
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, ErrorKind::InvalidInput, message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, ErrorKind::NotConfigured, message)
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match &err {
            SubmitError::Rejected(e) => {
                let kind = e.kind();
                let status = match kind {
                    ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                    ErrorKind::NotConfigured => StatusCode::NOT_FOUND,
                    ErrorKind::ZeroDenominator => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::InvalidInput | ErrorKind::InvalidAddress => StatusCode::BAD_REQUEST,
                };
                ApiError::new(status, kind, e.to_string())
            }
            SubmitError::Persistence(_) => ApiError(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody { kind: None, retryable: true, message: err.to_string() },
            ),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::AccessDenied(_) | EngineError::InvalidSignature => {
                ApiError::new(StatusCode::FORBIDDEN, ErrorKind::Unauthorized, err.to_string())
            }
            EngineError::UnknownHandle(_) => ApiError::not_found(err.to_string()),
            other => ApiError::bad_request(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

fn parse_id(s: &str) -> Result<[u8; 32], ApiError> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| ApiError::bad_request(format!("invalid hex: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| ApiError::bad_request("identifiers are 32 bytes"))
}

/// Wire form of a transaction: the sender proves control of its address
/// by signing the transaction id.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: String,
}

impl SignedTransaction {
    pub fn sign(transaction: Transaction, key: &SigningKey) -> Self {
        let signature = hex::encode(sign(key, &transaction.id()));
        Self { transaction, signature }
    }

    fn verify(&self) -> Result<(), ApiError> {
        let signature = hex::decode(&self.signature)
            .map_err(|_| ApiError::bad_request("invalid signature hex"))?;
        verify_signature(&self.transaction.sender, &self.transaction.id(), &signature)?;
        Ok(())
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub tx_id: String,
    pub result_id: Option<ResultId>,
    pub events: Vec<RiskEvent>,
}

#[derive(Serialize)]
pub struct AssetParamResponse {
    pub asset_id: String,
    pub weight_bp: u16,
    pub cap_amount: u64,
}

#[derive(Serialize)]
pub struct OwnerResponse {
    pub portfolio_id: String,
    pub owner: Option<String>,
    pub result_count: u64,
}

#[derive(Serialize)]
pub struct ResultResponse {
    pub portfolio_id: String,
    pub result_id: ResultId,
    pub submitter: String,
    pub timestamp: u64,
    pub risk_handle: String,
    pub health_handle: String,
    pub denominator: u64,
    pub position_count: u32,
}

#[derive(Deserialize)]
pub struct DecryptRequest {
    pub handle: String,
    pub requester: String,
    pub signature: String,
}

#[derive(Serialize)]
pub struct DecryptResponse {
    pub handle: String,
    pub value: u64,
}

#[derive(Deserialize)]
pub struct EventQuery {
    #[serde(default)]
    pub from: u64,
    #[serde(default = "default_event_limit")]
    pub limit: u64,
}

fn default_event_limit() -> u64 {
    100
}

pub fn router<E>(service: RiskService<E>) -> Router
where
    E: ServedEngine,
{
    Router::new()
        .route("/", get(root))
        .route("/state/root", get(state_root::<E>))
        .route("/tx", post(submit_tx::<E>))
        .route("/assets/:asset_id", get(get_asset::<E>))
        .route("/portfolios/:portfolio_id", get(get_portfolio::<E>))
        .route("/portfolios/:portfolio_id/results/:result_id", get(get_result::<E>))
        .route("/decrypt", post(decrypt::<E>))
        .route("/events", get(get_events::<E>))
        .with_state(AppState { service })
}

pub async fn start_server<E>(service: RiskService<E>, addr: SocketAddr) -> anyhow::Result<()>
where
    E: ServedEngine,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", addr);
    axum::serve(listener, router(service)).await?;
    Ok(())
}

async fn root() -> &'static str {
    "cipherisk confidential risk engine"
}

async fn state_root<E>(State(app): State<AppState<E>>) -> Json<String>
where
    E: ServedEngine,
{
    Json(hex::encode(app.service.state_root().await))
}

async fn submit_tx<E>(
    State(app): State<AppState<E>>,
    Json(signed): Json<SignedTransaction>,
) -> Result<Json<SubmitResponse>, ApiError>
where
    E: ServedEngine,
{
    signed.verify()?;
    let receipt = app.service.submit(signed.transaction).await?;
    Ok(Json(SubmitResponse {
        tx_id: hex::encode(receipt.tx_id),
        result_id: receipt.outcome.result_id(),
        events: receipt.events,
    }))
}

async fn get_asset<E>(
    State(app): State<AppState<E>>,
    Path(asset_id): Path<String>,
) -> Result<Json<AssetParamResponse>, ApiError>
where
    E: ServedEngine,
{
    let id = parse_id(&asset_id)?;
    let param = app
        .service
        .read(|state, _| registry::get_asset_param(state, &id))
        .await
        .ok_or_else(|| ApiError::not_found("asset is not configured"))?;
    Ok(Json(AssetParamResponse {
        asset_id: hex::encode(id),
        weight_bp: param.weight_bp,
        cap_amount: param.cap_amount,
    }))
}

async fn get_portfolio<E>(
    State(app): State<AppState<E>>,
    Path(portfolio_id): Path<String>,
) -> Result<Json<OwnerResponse>, ApiError>
where
    E: ServedEngine,
{
    let id = parse_id(&portfolio_id)?;
    let (owner, result_count) = app
        .service
        .read(|state, _| (ownership::owner_of(state, &id), results::result_count(state, &id)))
        .await;
    Ok(Json(OwnerResponse {
        portfolio_id: hex::encode(id),
        owner: owner.map(hex::encode),
        result_count,
    }))
}

async fn get_result<E>(
    State(app): State<AppState<E>>,
    Path((portfolio_id, result_id)): Path<(String, ResultId)>,
) -> Result<Json<ResultResponse>, ApiError>
where
    E: ServedEngine,
{
    let id = parse_id(&portfolio_id)?;
    let stored = app
        .service
        .read(|state, _| results::get(state, &id, result_id).cloned())
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(Json(ResultResponse {
        portfolio_id: hex::encode(id),
        result_id,
        submitter: hex::encode(stored.submitter),
        timestamp: stored.timestamp,
        risk_handle: stored.risk_score.handle().to_hex(),
        health_handle: stored.health_score.handle().to_hex(),
        denominator: stored.denominator,
        position_count: stored.position_count,
    }))
}

async fn decrypt<E>(
    State(app): State<AppState<E>>,
    Json(req): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, ApiError>
where
    E: ServedEngine,
{
    let handle = CiphertextHandle::from_hex(&req.handle)
        .ok_or_else(|| ApiError::bad_request("invalid handle"))?;
    let requester = parse_id(&req.requester)?;
    let signature = hex::decode(&req.signature)
        .map_err(|_| ApiError::bad_request("invalid signature hex"))?;
    verify_signature(&requester, &decrypt_request_message(&handle), &signature)?;

    let value = app.service.read(|_, engine| engine.decrypt(&handle, &requester)).await?;
    Ok(Json(DecryptResponse { handle: handle.to_hex(), value }))
}

async fn get_events<E>(
    State(app): State<AppState<E>>,
    Query(q): Query<EventQuery>,
) -> Result<Json<Vec<RiskEvent>>, ApiError>
where
    E: ServedEngine,
{
    let storage = app
        .service
        .storage()
        .ok_or_else(|| ApiError::not_found("event log requires persistent storage"))?;
    let events = storage
        .load_events(q.from, q.limit.min(1000))
        .map_err(|e| ApiError(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody { kind: None, retryable: true, message: e.to_string() },
        ))?;
    Ok(Json(events))
}
