//! Errors raised by the AWS API adapters

use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{operation} failed: {message}")]
    Aws {
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("{operation} returned no {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("invalid {operation} request: {message}")]
    InvalidRequest {
        operation: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn missing(operation: &'static str, field: &'static str) -> Self {
        ApiError::MissingField { operation, field }
    }
}

/// Map an SDK failure to [`ApiError`], keeping the service code and message
///
/// Both service SDKs share the smithy error types, so this serves
/// CloudFormation and MSK Connect alike.
pub(crate) fn sdk_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let service = err.as_service_error();
    let code = service.and_then(|e| e.code()).map(str::to_string);
    let message = service
        .and_then(|e| e.message())
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    ApiError::Aws {
        operation,
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_operation() {
        let err = ApiError::Aws {
            operation: "DescribeStacks",
            code: Some("ValidationError".to_string()),
            message: "Stack with id s does not exist".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "DescribeStacks failed: Stack with id s does not exist"
        );
    }

    #[test]
    fn missing_field_names_operation_and_field() {
        assert_eq!(
            ApiError::missing("CreateStack", "StackId").to_string(),
            "CreateStack returned no StackId"
        );
    }
}
