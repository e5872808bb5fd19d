use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// Decodes a JSON request body. An empty body is reported as missing rather
/// than as a syntax error.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("request body is required"));
    }
    Ok(serde_json::from_slice(body)?)
}
