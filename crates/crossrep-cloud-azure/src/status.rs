//! HTTP status classification

use crate::body::ErrorResponse;
use crossrep_cloud::GatewayError;
use reqwest::StatusCode;

/// Map a non-success response to a gateway error
pub fn classify(status: StatusCode, body: &str) -> GatewayError {
    let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (String::new(), body.trim().to_string()),
    };
    let detail = if code.is_empty() {
        format!("{}: {}", status, message)
    } else {
        format!("{} {}: {}", status, code, message)
    };

    if status.is_client_error() && is_already_authorized(&code, &message) {
        return GatewayError::ReplicationAlreadyAuthorized(detail);
    }

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => GatewayError::Transient(detail),
        s if s.is_server_error() => GatewayError::Transient(detail),
        StatusCode::CONFLICT => GatewayError::Conflict(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::AuthenticationFailed(detail),
        _ => GatewayError::Permanent(detail),
    }
}

fn is_already_authorized(code: &str, message: &str) -> bool {
    code.to_lowercase().contains("alreadyauthorized")
        || message.to_lowercase().contains("already authorized")
}

/// Map a transport failure: anything that never produced a response may be retried
pub fn transport(error: reqwest::Error) -> GatewayError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        GatewayError::Transient(error.to_string())
    } else if error.is_decode() {
        GatewayError::Permanent(format!("unreadable response: {}", error))
    } else {
        GatewayError::Permanent(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            assert!(classify(status, "").is_transient(), "{}", status);
        }
    }

    #[test]
    fn test_conflict_and_auth() {
        let body = r#"{ "error": { "code": "CannotDeleteResource", "message": "pool has volumes" } }"#;
        let err = classify(StatusCode::CONFLICT, body);
        assert!(matches!(&err, GatewayError::Conflict(m) if m.contains("CannotDeleteResource")));

        assert!(matches!(
            classify(StatusCode::FORBIDDEN, ""),
            GatewayError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, "bad size"),
            GatewayError::Permanent(_)
        ));
    }

    #[test]
    fn test_already_authorized() {
        let body = r#"{ "error": { "code": "VolumeReplicationAlreadyAuthorized", "message": "" } }"#;
        assert!(matches!(
            classify(StatusCode::CONFLICT, body),
            GatewayError::ReplicationAlreadyAuthorized(_)
        ));

        let body = r#"{ "error": { "code": "BadRequest", "message": "Replication is already authorized" } }"#;
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, body),
            GatewayError::ReplicationAlreadyAuthorized(_)
        ));
    }
}
