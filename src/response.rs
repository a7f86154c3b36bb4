//! Response envelope returned to purchase callers.

use serde::Serialize;

/// Status codes the envelope may carry; anything else becomes 500.
const KNOWN_CODES: [u16; 8] = [200, 201, 400, 401, 403, 404, 422, 500];

/// `{ message, error, code, results }` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponse<T> {
    /// Human-readable outcome.
    pub message: String,
    /// Whether this is an error response.
    pub error: bool,
    /// HTTP status code.
    pub code: u16,
    /// Payload, absent on errors.
    pub results: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `results`.
    pub fn success(message: impl Into<String>, results: T, code: u16) -> Self {
        Self {
            message: message.into(),
            error: false,
            code,
            results: Some(results),
        }
    }

    /// Error response; unknown codes are reported as 500.
    pub fn failure(message: impl Into<String>, code: u16) -> Self {
        let code = if KNOWN_CODES.contains(&code) { code } else { 500 };
        Self {
            message: message.into(),
            error: true,
            code,
            results: None,
        }
    }
}
