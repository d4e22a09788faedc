//! UM-Bridge model handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::Uri,
    Json,
};
use modelbridge_types::protocol::{
    EvaluateRequest, EvaluateResponse, InfoResponse, InputSizesResponse, ModelInfoRequest,
    ModelInfoResponse, OutputSizesResponse, SizesRequest, SupportFlags, PROTOCOL_VERSION,
};
use modelbridge_types::EvaluationRequest;
use tracing::info;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Protocol version and served models
pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        protocol_version: PROTOCOL_VERSION,
        models: vec![state.model_name.clone()],
    })
}

/// Input vector sizes
pub async fn input_sizes(
    State(state): State<AppState>,
    payload: Result<Json<SizesRequest>, JsonRejection>,
) -> ApiResult<Json<InputSizesResponse>> {
    let request = body(payload)?;
    state.check_model(&request.name)?;
    Ok(Json(InputSizesResponse {
        input_sizes: state.engine.input_sizes().to_vec(),
    }))
}

/// Output vector sizes
pub async fn output_sizes(
    State(state): State<AppState>,
    payload: Result<Json<SizesRequest>, JsonRejection>,
) -> ApiResult<Json<OutputSizesResponse>> {
    let request = body(payload)?;
    state.check_model(&request.name)?;
    Ok(Json(OutputSizesResponse {
        output_sizes: state.engine.output_sizes().to_vec(),
    }))
}

/// Supported operations
pub async fn model_info(
    State(state): State<AppState>,
    payload: Result<Json<ModelInfoRequest>, JsonRejection>,
) -> ApiResult<Json<ModelInfoResponse>> {
    let request = body(payload)?;
    state.check_model(&request.name)?;
    Ok(Json(ModelInfoResponse {
        support: SupportFlags::evaluate_only(),
    }))
}

/// Run one evaluation.
///
/// Shape is checked here so malformed requests do not queue behind a
/// running solver; the engine serializes the rest.
pub async fn evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> ApiResult<Json<EvaluateResponse>> {
    let request = body(payload)?;
    state.check_model(&request.name)?;
    state.engine.shape().validate_inputs(&request.input)?;

    if state.engine.is_busy() {
        info!("Solver busy, evaluation queued");
    }

    let outcome = state
        .engine
        .evaluate(EvaluationRequest::new(request.input, request.config))
        .await?;

    Ok(Json(EvaluateResponse {
        output: outcome.outputs,
        solver_exit_status: outcome.exit_code,
    }))
}

/// Gradient, ApplyJacobian and ApplyHessian
pub async fn unsupported(uri: Uri) -> ApiError {
    let operation = uri.path().trim_start_matches('/').to_string();
    ApiError::UnsupportedFeature(format!(
        "Feature '{}' is not supported by this model",
        operation
    ))
}
