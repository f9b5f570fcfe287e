use axum::extract::State;
use serde::Deserialize;

use crate::database::models::cra::ValidationAction;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::cra_validation::{self, ValidationOutcome};
use crate::state::AppState;

/// Raw body so a missing field and an unknown action get distinct messages
#[derive(Debug, Default, Deserialize)]
pub struct ValidateBody {
    pub token: Option<String>,
    pub action: Option<String>,
}

fn parse_action(raw: &str) -> Result<ValidationAction, ApiError> {
    match raw {
        "approve" => Ok(ValidationAction::Approve),
        "reject" => Ok(ValidationAction::Reject),
        _ => Err(ApiError::bad_request("action invalide")),
    }
}

/// POST /api/cra/validate - client decision from the emailed link
pub async fn validate(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ValidateBody>,
) -> ApiResult<ValidationOutcome> {
    let (Some(token), Some(action)) = (
        body.token.filter(|t| !t.trim().is_empty()),
        body.action.filter(|a| !a.trim().is_empty()),
    ) else {
        return Err(ApiError::bad_request("token et action requis"));
    };
    let action = parse_action(action.trim())?;

    let outcome = cra_validation::validate(&state.pool, state.mailer.as_ref(), token.trim(), action).await?;
    Ok(ApiResponse::success(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions() {
        assert_eq!(parse_action("approve").unwrap(), ValidationAction::Approve);
        assert_eq!(parse_action("reject").unwrap(), ValidationAction::Reject);
        assert_eq!(parse_action("maybe").unwrap_err().status_code(), 400);
    }
}
