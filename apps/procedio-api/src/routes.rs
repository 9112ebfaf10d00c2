use axum::{
	Json, Router,
	extract::{
		FromRequest, FromRequestParts, Path, Query, Request, State,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::{StatusCode, request::Parts},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use procedio_domain::rewards::XpAction;
use procedio_service::{
	AwardOutcome, AwardRequest, CelebrationOutcome, EscalateRequest, Escalation, EscalationList,
	EscalationReceipt, Error, ListEscalationsRequest, ObserveRequest, ProgressSnapshot, Quiz,
	QuizRequest, ResponseMode, RouteRequest, SetXpRequest, progress,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/copilot/route", post(route_question))
		.route("/v1/copilot/escalations", post(escalate))
		.route("/v1/escalations", get(list_escalations))
		.route("/v1/escalations/{escalation_id}/resolve", post(resolve_escalation))
		.route("/v1/profiles/{user_id}/progress", get(progress_snapshot))
		.route("/v1/profiles/{user_id}/xp", post(award_xp).put(set_xp))
		.route("/v1/celebrations/observe", post(observe_celebrations))
		.route("/v1/quiz", post(generate_quiz))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct AwardBody {
	action: XpAction,
}

#[derive(Debug, Deserialize)]
struct SetXpBody {
	xp: i64,
}

#[derive(Debug, Serialize)]
struct ResolvedBody {
	escalation: Escalation,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn route_question(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<RouteRequest>,
) -> Result<Json<ResponseMode>, ApiError> {
	let cancel = CancellationToken::new();
	// Fires when axum drops this future, e.g. on client disconnect.
	let _cancel_on_drop = cancel.clone().drop_guard();
	let response = state.service.route(payload, &cancel).await?;

	Ok(Json(response))
}

async fn escalate(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<EscalateRequest>,
) -> Result<(StatusCode, Json<EscalationReceipt>), ApiError> {
	let receipt = state.service.escalate(payload).await?;

	Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_escalations(
	State(state): State<AppState>,
	ApiQuery(query): ApiQuery<ListEscalationsRequest>,
) -> Result<Json<EscalationList>, ApiError> {
	let response = state.service.list_escalations(query).await?;

	Ok(Json(response))
}

async fn resolve_escalation(
	State(state): State<AppState>,
	ApiPath(escalation_id): ApiPath<Uuid>,
) -> Result<Json<ResolvedBody>, ApiError> {
	let escalation = state.service.resolve_escalation(escalation_id).await?;

	Ok(Json(ResolvedBody { escalation }))
}

async fn progress_snapshot(
	State(state): State<AppState>,
	ApiPath(user_id): ApiPath<String>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
	let response = state.service.progress(&user_id).await?;

	Ok(Json(response))
}

async fn award_xp(
	State(state): State<AppState>,
	ApiPath(user_id): ApiPath<String>,
	ApiJson(payload): ApiJson<AwardBody>,
) -> Result<Json<AwardOutcome>, ApiError> {
	let response = state.service.award_xp(AwardRequest { user_id, action: payload.action }).await?;

	Ok(Json(response))
}

async fn set_xp(
	State(state): State<AppState>,
	ApiPath(user_id): ApiPath<String>,
	ApiJson(payload): ApiJson<SetXpBody>,
) -> Result<Json<AwardOutcome>, ApiError> {
	let response = state.service.set_xp(SetXpRequest { user_id, xp: payload.xp }).await?;

	Ok(Json(response))
}

async fn observe_celebrations(
	ApiJson(payload): ApiJson<ObserveRequest>,
) -> Result<Json<CelebrationOutcome>, ApiError> {
	let response = progress::observe_celebrations(payload)?;

	Ok(Json(response))
}

async fn generate_quiz(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<QuizRequest>,
) -> Result<Json<Quiz>, ApiError> {
	let cancel = CancellationToken::new();
	let _cancel_on_drop = cancel.clone().drop_guard();
	let response = state.service.generate_quiz(payload, &cancel).await?;

	Ok(Json(response))
}

/// JSON body whose rejections render as [`ApiError`].
pub struct ApiJson<T>(pub T);
impl<S, T> FromRequest<S> for ApiJson<T>
where
	S: Send + Sync,
	T: DeserializeOwned,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Json(value) = Json::<T>::from_request(req, state)
			.await
			.map_err(|rejection: JsonRejection| ApiError::invalid_request(rejection.body_text()))?;

		Ok(Self(value))
	}
}

pub struct ApiQuery<T>(pub T);
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
	S: Send + Sync,
	T: DeserializeOwned,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Query(value) = Query::<T>::from_request_parts(parts, state)
			.await
			.map_err(|rejection: QueryRejection| ApiError::invalid_request(rejection.body_text()))?;

		Ok(Self(value))
	}
}

pub struct ApiPath<T>(pub T);
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
	S: Send + Sync,
	T: DeserializeOwned + Send,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		let Path(value) = Path::<T>::from_request_parts(parts, state)
			.await
			.map_err(|rejection: PathRejection| ApiError::invalid_request(rejection.body_text()))?;

		Ok(Self(value))
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: String,
	error_code: &'static str,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}

	fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();
		let (status, code) = match &err {
			Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			Error::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			Error::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
			Error::Provider { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
			Error::MalformedModelOutput { .. } =>
				(StatusCode::INTERNAL_SERVER_ERROR, "MALFORMED_MODEL_OUTPUT"),
			Error::Storage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
		};

		if status.is_server_error() {
			tracing::error!(error_code = code, error = %message, "Request failed.");
		}

		Self::new(status, code, message)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error: self.message, error_code: self.error_code };

		(self.status, Json(body)).into_response()
	}
}
