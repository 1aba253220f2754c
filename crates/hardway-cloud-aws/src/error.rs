//! EC2 error classification

use hardway_cloud::CloudError;

/// Error codes EC2 returns when the caller is not allowed in
const AUTH_CODES: &[&str] = &[
    "AuthFailure",
    "UnauthorizedOperation",
    "InvalidClientTokenId",
    "ExpiredToken",
    "OptInRequired",
];

/// Map an EC2 error code and message onto a [`CloudError`]
pub fn classify_error(code: Option<&str>, message: Option<&str>) -> CloudError {
    let message = message.unwrap_or("no error message");
    match code {
        Some(code) if AUTH_CODES.contains(&code) => {
            CloudError::AuthenticationFailed(format!("{}: {}", code, message))
        }
        Some(code) => CloudError::ApiError(format!("{}: {}", code, message)),
        None => CloudError::ApiError(message.to_string()),
    }
}
