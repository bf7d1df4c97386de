// src/services/api_server.rs
//! API Server for the SSI registries
//!
//! This module provides the REST API interface over the identifier and
//! credential registries. It is the surface the dApp frontend and other
//! consuming applications talk to.
//!
//! The API is built using Axum and includes endpoints for:
//! - Identifier registration, resolution, document updates and transfers
//! - Reverse lookup from a controller address to its identifier
//! - Credential registration, revocation and status checks
//! - Credential verification against both registries
//! - Recent registry events for indexers and audit views
//!
//! # Caller identity
//! Mutating endpoints act on behalf of the address in the `x-caller-address`
//! header. Authenticating that address is the job of the gateway in front of
//! this service.

use crate::bootstrap::Registries;
use crate::contracts::{ErrorKind, RegistryError};
use crate::models::credential::{CredentialRecord, CredentialStatus};
use crate::models::did::IdentifierRecord;
use crate::models::event::RegistryEvent;
use crate::services::event_log::EventLog;
use crate::services::verifier::{CredentialVerifier, Verification};
use axum::{
    async_trait,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{FromRequest, FromRequestParts, Json, Path, Query, Request, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use ethers_core::types::{Address, Bytes, H256};
use log::{error, info, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task;
use tower_http::cors::CorsLayer;

/// Header carrying the address a request acts for.
pub const CALLER_HEADER: &str = "x-caller-address";

/// Upper bound for `/events?limit=`.
const MAX_EVENT_PAGE: usize = 1_000;

// API request and response structures

/// Request payload for registering an identifier
#[derive(Serialize, Deserialize)]
pub struct RegisterIdentifierRequest {
    pub identifier: String,
    pub document_hash: H256,
    pub document_location: String,
}

/// Request payload for replacing an identifier's document pointer
#[derive(Serialize, Deserialize)]
pub struct UpdateDocumentRequest {
    pub document_hash: H256,
    pub document_location: String,
}

/// Request payload for transferring an identifier
#[derive(Serialize, Deserialize)]
pub struct TransferOwnershipRequest {
    pub new_controller: Address,
}

/// Response for reverse lookup
#[derive(Serialize, Deserialize)]
struct IdentifierOfResponse {
    controller: Address,
    identifier: String,
}

/// Request payload for registering a credential
#[derive(Serialize, Deserialize)]
pub struct RegisterCredentialRequest {
    pub credential_hash: H256,
}

/// Response for credential status checks
#[derive(Serialize, Deserialize)]
struct CredentialStatusResponse {
    credential_hash: H256,
    exists: bool,
    revoked: bool,
    status: CredentialStatus,
}

/// Request payload for verifying a credential
#[derive(Serialize, Deserialize)]
pub struct VerifyCredentialRequest {
    pub credential_hash: H256,
    pub issuer_identifier: String,
    /// 65-byte `r || s || v` signature, hex encoded
    pub signature: Bytes,
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
}

/// Response containing recent registry events
#[derive(Serialize)]
struct EventsResponse {
    events: Vec<RegistryEvent>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    identifiers: usize,
    credentials: usize,
}

/// Error body returned by every failing endpoint.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler failure, rendered as an [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            error: error.to_string(),
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let kind = err.kind();
        let status = match kind {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::AlreadyExists | ErrorKind::AlreadyRevoked => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::InvariantViolation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if kind == ErrorKind::Storage {
            error!("storage failure: {}", err);
        }
        let label = serde_json::to_value(kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "internal".to_string());
        ApiError {
            status,
            error: label,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.error,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

/// Address the request acts for, taken from [`CALLER_HEADER`].
pub struct Caller(pub Address);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.headers.get(CALLER_HEADER).ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                "missing_caller",
                format!("{} header is required", CALLER_HEADER),
            )
        })?;
        let text = value
            .to_str()
            .map_err(|_| ApiError::bad_request(format!("{} is not valid ASCII", CALLER_HEADER)))?;
        let address = Address::from_str(text.trim())
            .map_err(|_| ApiError::bad_request(format!("{} is not an address: {}", CALLER_HEADER, text)))?;
        Ok(Caller(address))
    }
}

/// JSON body extractor that fails with an [`ErrorResponse`] instead of axum's
/// plain-text rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

/// Query-string counterpart of [`ApiJson`].
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

/// Runs registry work on the blocking pool. File-backed tables write to disk
/// while the registry gate is held.
async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work).await.map_err(|e| {
        error!("registry task failed: {}", e);
        ApiError::internal("registry task failed")
    })?
}

fn parse_hash(raw: &str) -> Result<H256, ApiError> {
    H256::from_str(raw).map_err(|_| ApiError::bad_request(format!("not a 32-byte hex hash: {}", raw)))
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    Address::from_str(raw).map_err(|_| ApiError::bad_request(format!("not an address: {}", raw)))
}

/// API server state containing all service dependencies
#[derive(Clone)]
pub struct ApiServer {
    registries: Registries,

    /// Service for verifying credentials
    verifier: Arc<CredentialVerifier>,

    /// Sink for every mutation, also backs `/events`
    events: Arc<EventLog>,
}

impl ApiServer {
    /// Creates a new instance of the API server
    ///
    /// # Arguments
    /// * `registries` - Identifier and credential registries to serve
    /// * `events` - Event log receiving every successful mutation
    pub fn new(registries: Registries, events: Arc<EventLog>) -> Self {
        let verifier = CredentialVerifier::new(registries.identifiers.clone(), registries.credentials.clone());
        ApiServer {
            registries,
            verifier: Arc::new(verifier),
            events,
        }
    }

    /// Builds the router with all API routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/identifiers", post(Self::register_identifier_handler))
            .route("/identifiers/:identifier", get(Self::resolve_identifier_handler))
            .route("/identifiers/:identifier/document", put(Self::update_document_handler))
            .route("/identifiers/:identifier/controller", put(Self::transfer_ownership_handler))
            .route("/controllers/:address/identifier", get(Self::identifier_of_handler))
            .route("/credentials", post(Self::register_credential_handler))
            .route("/credentials/:hash", get(Self::get_credential_handler))
            .route("/credentials/:hash/status", get(Self::credential_status_handler))
            .route("/credentials/:hash/revoke", post(Self::revoke_credential_handler))
            .route("/verify", post(Self::verify_credential_handler))
            .route("/events", get(Self::events_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(self.clone()))
    }

    /// Starts the API server and begins listening for requests
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "127.0.0.1:3000")
    ///
    /// # Errors
    /// Returns the I/O error if the address cannot be bound or the server
    /// stops abnormally.
    pub async fn run(&self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on http://{}", addr);
        axum::serve(listener, self.router()).await
    }

    async fn health_handler(State(state): State<Arc<ApiServer>>) -> Result<impl IntoResponse, ApiError> {
        let health = blocking(move || {
            Ok(HealthResponse {
                status: "ok",
                identifiers: state.registries.identifiers.count()?,
                credentials: state.registries.credentials.count()?,
            })
        })
        .await?;
        Ok(Json(health))
    }

    // =====================
    // Identifier Handlers
    // =====================

    /// Registers a new identifier for the caller
    ///
    /// # Endpoint
    /// POST /identifiers
    ///
    /// # Responses
    /// - 201 Created: Returns the new record
    /// - 400 Bad Request: Body is not a valid request
    /// - 409 Conflict: Identifier already registered
    /// - 422 Unprocessable Entity: Empty fields, or caller already controls an identifier
    async fn register_identifier_handler(
        State(state): State<Arc<ApiServer>>,
        Caller(caller): Caller,
        ApiJson(payload): ApiJson<RegisterIdentifierRequest>,
    ) -> Result<(StatusCode, Json<IdentifierRecord>), ApiError> {
        let record = blocking(move || {
            Ok(state.registries.identifiers.register(
                caller,
                &payload.identifier,
                payload.document_hash,
                &payload.document_location,
                state.events.as_ref(),
            )?)
        })
        .await?;
        Ok((StatusCode::CREATED, Json(record)))
    }

    /// Resolves an identifier to its record
    ///
    /// # Endpoint
    /// GET /identifiers/:identifier
    ///
    /// # Responses
    /// - 200 OK: Returns the record
    /// - 404 Not Found: Identifier never registered
    async fn resolve_identifier_handler(
        Path(identifier): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<IdentifierRecord>, ApiError> {
        let lookup = identifier.clone();
        blocking(move || Ok(state.registries.identifiers.resolve(&lookup)?))
            .await?
            .map(Json)
            .ok_or_else(|| ApiError::not_found(format!("identifier `{}` is not registered", identifier)))
    }

    /// Replaces the document hash and location
    ///
    /// # Endpoint
    /// PUT /identifiers/:identifier/document
    ///
    /// # Responses
    /// - 200 OK: Returns the updated record
    /// - 403 Forbidden: Caller is not the controller
    /// - 404 Not Found: Identifier never registered
    async fn update_document_handler(
        Path(identifier): Path<String>,
        State(state): State<Arc<ApiServer>>,
        Caller(caller): Caller,
        ApiJson(payload): ApiJson<UpdateDocumentRequest>,
    ) -> Result<Json<IdentifierRecord>, ApiError> {
        let record = blocking(move || {
            Ok(state.registries.identifiers.update_document(
                caller,
                &identifier,
                payload.document_hash,
                &payload.document_location,
                state.events.as_ref(),
            )?)
        })
        .await?;
        Ok(Json(record))
    }

    /// Transfers control of an identifier
    ///
    /// # Endpoint
    /// PUT /identifiers/:identifier/controller
    ///
    /// # Responses
    /// - 200 OK: Returns the updated record
    /// - 403 Forbidden: Caller is not the controller
    /// - 422 Unprocessable Entity: Target already controls an identifier
    async fn transfer_ownership_handler(
        Path(identifier): Path<String>,
        State(state): State<Arc<ApiServer>>,
        Caller(caller): Caller,
        ApiJson(payload): ApiJson<TransferOwnershipRequest>,
    ) -> Result<Json<IdentifierRecord>, ApiError> {
        let record = blocking(move || {
            Ok(state.registries.identifiers.transfer_ownership(
                caller,
                &identifier,
                payload.new_controller,
                state.events.as_ref(),
            )?)
        })
        .await?;
        Ok(Json(record))
    }

    /// Looks up the identifier controlled by an address
    ///
    /// # Endpoint
    /// GET /controllers/:address/identifier
    async fn identifier_of_handler(
        Path(address): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Result<impl IntoResponse, ApiError> {
        let controller = parse_address(&address)?;
        let found = blocking(move || Ok(state.registries.identifiers.identifier_of(controller)?)).await?;
        match found {
            Some(identifier) => Ok(Json(IdentifierOfResponse { controller, identifier })),
            None => Err(ApiError::not_found(format!("{:?} controls no identifier", controller))),
        }
    }

    // =====================
    // Credential Handlers
    // =====================

    /// Registers a credential hash with the caller as issuer
    ///
    /// # Endpoint
    /// POST /credentials
    ///
    /// # Responses
    /// - 201 Created: Returns the new record
    /// - 409 Conflict: Hash already registered
    async fn register_credential_handler(
        State(state): State<Arc<ApiServer>>,
        Caller(caller): Caller,
        ApiJson(payload): ApiJson<RegisterCredentialRequest>,
    ) -> Result<(StatusCode, Json<CredentialRecord>), ApiError> {
        let record = blocking(move || {
            Ok(state
                .registries
                .credentials
                .register(caller, payload.credential_hash, state.events.as_ref())?)
        })
        .await?;
        Ok((StatusCode::CREATED, Json(record)))
    }

    async fn get_credential_handler(
        Path(hash): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Result<Json<CredentialRecord>, ApiError> {
        let hash = parse_hash(&hash)?;
        blocking(move || Ok(state.registries.credentials.get(hash)?))
            .await?
            .map(Json)
            .ok_or_else(|| ApiError::not_found(format!("credential {:?} is not registered", hash)))
    }

    /// Reports whether a credential is known and whether it is revoked
    ///
    /// # Endpoint
    /// GET /credentials/:hash/status
    ///
    /// # Responses
    /// - 200 OK: Always, unknown hashes report `exists: false`
    async fn credential_status_handler(
        Path(hash): Path<String>,
        State(state): State<Arc<ApiServer>>,
    ) -> Result<impl IntoResponse, ApiError> {
        let hash = parse_hash(&hash)?;
        let record = blocking(move || Ok(state.registries.credentials.get(hash)?)).await?;
        Ok(Json(CredentialStatusResponse {
            credential_hash: hash,
            exists: record.is_some(),
            revoked: record.as_ref().map_or(false, |r| r.revoked),
            status: CredentialStatus::of(record.as_ref()),
        }))
    }

    /// Revokes a credential
    ///
    /// # Endpoint
    /// POST /credentials/:hash/revoke
    ///
    /// # Responses
    /// - 200 OK: Returns the revoked record
    /// - 403 Forbidden: Caller is not the issuer
    /// - 404 Not Found: Hash never registered
    /// - 409 Conflict: Already revoked
    async fn revoke_credential_handler(
        Path(hash): Path<String>,
        State(state): State<Arc<ApiServer>>,
        Caller(caller): Caller,
    ) -> Result<Json<CredentialRecord>, ApiError> {
        let hash = parse_hash(&hash)?;
        let record = blocking(move || {
            Ok(state
                .registries
                .credentials
                .revoke(caller, hash, state.events.as_ref())?)
        })
        .await?;
        Ok(Json(record))
    }

    /// Verifies a presented credential
    ///
    /// # Endpoint
    /// POST /verify
    ///
    /// # Responses
    /// - 200 OK: Returns `{ valid, reason?, issuer? }`
    async fn verify_credential_handler(
        State(state): State<Arc<ApiServer>>,
        ApiJson(payload): ApiJson<VerifyCredentialRequest>,
    ) -> Result<Json<Verification>, ApiError> {
        let credential_hash = payload.credential_hash;
        let outcome = blocking(move || {
            Ok(state
                .verifier
                .verify(payload.credential_hash, &payload.issuer_identifier, &payload.signature)?)
        })
        .await?;
        if !outcome.valid {
            warn!(
                "credential {:?} failed verification: {:?}",
                credential_hash, outcome.reason
            );
        }
        Ok(Json(outcome))
    }

    // =====================
    // Events
    // =====================

    /// Returns recent registry events, newest first
    ///
    /// # Endpoint
    /// GET /events?limit=n
    async fn events_handler(
        ApiQuery(query): ApiQuery<EventsQuery>,
        State(state): State<Arc<ApiServer>>,
    ) -> Json<EventsResponse> {
        let limit = query.limit.unwrap_or(50).min(MAX_EVENT_PAGE);
        Json(EventsResponse {
            events: state.events.recent(limit),
        })
    }
}
