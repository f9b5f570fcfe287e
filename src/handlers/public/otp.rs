use axum::extract::State;
use serde_json::{json, Value};

use crate::database::models::token::{SendOtpRequest, VerifyOtpRequest};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::otp;
use crate::state::AppState;

/// POST /api/otp/send - mail a fresh code to the account's address
pub async fn send(State(state): State<AppState>, JsonBody(request): JsonBody<SendOtpRequest>) -> ApiResult<Value> {
    let user_id = request.user_id.ok_or_else(|| ApiError::bad_request("userId requis"))?;
    otp::send_code(&state.pool, state.mailer.as_ref(), &state.config.tokens, user_id).await?;
    Ok(ApiResponse::done())
}

/// POST /api/otp/verify - consume a code, or with `checkOnly` report whether
/// this user verified recently
pub async fn verify(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyOtpRequest>,
) -> ApiResult<Value> {
    let user_id = request.user_id.ok_or_else(|| ApiError::bad_request("userId requis"))?;

    if request.check_only {
        let already = otp::is_already_verified(&state.pool, user_id).await?;
        return Ok(ApiResponse::success(json!({ "alreadyVerified": already })));
    }

    let code = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("code requis"))?;

    otp::verify_code(&state.pool, &state.config.tokens, user_id, code).await?;
    Ok(ApiResponse::success(json!({
        "valid": true,
        "message": "Code vérifié avec succès",
    })))
}
