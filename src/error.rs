use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("UNAUTHORIZED")]
    Unauthorized,
    #[error("FORBIDDEN")]
    Forbidden,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidTransition(&'static str),
    #[error("{0}")]
    Internal(&'static str),
    #[error("DATABASE_ERROR")]
    Database(#[from] mongodb::error::Error),
    #[error("SERIALIZATION_FAILED")]
    Serialization(#[from] mongodb::bson::ser::Error),
    #[error("DESERIALIZATION_FAILED")]
    Deserialization(#[from] mongodb::bson::de::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidTransition(_) => StatusCode::CONFLICT,
            ApiError::Internal(_)
            | ApiError::Database(_)
            | ApiError::Serialization(_)
            | ApiError::Deserialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Database(error) => tracing::error!(error = %error, "storage failure"),
            ApiError::Serialization(error) => tracing::error!(error = %error, "bson encoding failure"),
            ApiError::Deserialization(error) => {
                tracing::error!(error = %error, "bson decoding failure")
            }
            _ => (),
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn error_body_carries_the_code() {
        let response = ApiError::NotFound("PROJECT_NOT_FOUND").error_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "PROJECT_NOT_FOUND");
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::BadRequest("USER_MUST_HAVE_VALID_EMAIL").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidTransition("EVALUATION_ALREADY_FINALIZED").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("PROFILE_CREATION_FAILED").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
