//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use gateway::GatewayError;
use settlement::SettlementError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Settlement layer error.
    Settlement(SettlementError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Settlement(err) => settlement_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn settlement_error_to_response(err: SettlementError) -> (StatusCode, String) {
    let status = match &err {
        SettlementError::OrderNotFound(_) | SettlementError::UnrecognizedTransaction { .. } => {
            StatusCode::NOT_FOUND
        }
        SettlementError::Forbidden { .. } => StatusCode::FORBIDDEN,
        SettlementError::InsufficientStock { .. } | SettlementError::ConflictingPayment { .. } => {
            StatusCode::CONFLICT
        }
        SettlementError::Domain(domain_err) => match domain_err {
            DomainError::InvalidStateTransition { .. }
            | DomainError::ConflictingNotification { .. } => StatusCode::CONFLICT,
            DomainError::InvalidRequest(_)
            | DomainError::AmountMismatch { .. }
            | DomainError::Money(_) => StatusCode::BAD_REQUEST,
        },
        SettlementError::Gateway(gateway_err) => match gateway_err {
            GatewayError::InvalidSignature
            | GatewayError::MalformedCallback(_)
            | GatewayError::Unsupported(_) => StatusCode::BAD_REQUEST,
            GatewayError::RefundRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Unavailable(_) => {
                tracing::error!(error = %gateway_err, "upstream gateway unavailable");
                StatusCode::BAD_GATEWAY
            }
        },
    };
    (status, err.to_string())
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, UserId};

    fn status_of(err: SettlementError) -> StatusCode {
        settlement_error_to_response(err).0
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(SettlementError::OrderNotFound(OrderId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(SettlementError::Forbidden {
                user_id: UserId::new()
            }),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(SettlementError::ConflictingPayment {
                order_id: OrderId::new()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(SettlementError::Gateway(GatewayError::InvalidSignature)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(SettlementError::Gateway(GatewayError::Unavailable(
                "down".into()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(SettlementError::Domain(DomainError::InvalidRequest(
                "no".into()
            ))),
            StatusCode::BAD_REQUEST
        );
    }
}
