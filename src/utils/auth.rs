use actix_web::HttpRequest;

use crate::errors::AppError;
use crate::utils::jwt::{self, Claims};

/// Bearer-token check every employee route runs before any core logic. Login
/// and token issuance live outside this service; this only verifies that the
/// request already carries a valid admin token.
pub fn authenticate(req: &HttpRequest) -> Result<Claims, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.split_whitespace().nth(1))
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    jwt::validate_token(token).map_err(|_| AppError::Unauthorized("Invalid token".to_string()))
}
