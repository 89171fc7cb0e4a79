//! Mapping AWS SDK errors onto the broker's error taxonomy.
//!
//! Classification is by error code first, transport class second. Codes the
//! table does not know fall through to [`ClientError::Provider`] with the
//! code and message preserved, so nothing is silently swallowed.

use aws_sdk_ec2::error::ProvideErrorMetadata;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;

use cirrus_core::ClientError;

/// Classify an SDK error from any AWS service call.
///
/// `context` names the call ("ec2 DescribeInstances") and prefixes every
/// message so failures are attributable without provider types leaking out.
pub fn classify_error<E, R>(context: &str, err: SdkError<E, R>) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.code().map(str::to_string);
    let message = err.message().map(str::to_string);
    let detail = DisplayErrorContext(&err).to_string();

    match err {
        SdkError::TimeoutError(_) => {
            ClientError::Transient(format!("{}: request timed out", context))
        }
        SdkError::DispatchFailure(_) => {
            ClientError::Transient(format!("{}: connection failure: {}", context, detail))
        }
        SdkError::ResponseError(_) => {
            ClientError::Transient(format!("{}: malformed provider response", context))
        }
        SdkError::ServiceError(_) => classify_code(
            context,
            code.as_deref().unwrap_or("Unknown"),
            message.as_deref().unwrap_or(&detail),
        ),
        _ => ClientError::Provider(format!("{}: {}", context, detail)),
    }
}

/// Classify a service error by its AWS error code.
pub fn classify_code(context: &str, code: &str, message: &str) -> ClientError {
    let described = format!("{}: {} - {}", context, code, message);
    match code {
        "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation" | "AuthFailure"
        | "Forbidden" | "OptInRequired" => ClientError::Forbidden(described),

        "ExpiredToken" | "ExpiredTokenException" | "InvalidClientTokenId"
        | "UnrecognizedClientException" | "SignatureDoesNotMatch"
        | "MissingAuthenticationToken" => ClientError::Credential(described),

        "Throttling" | "ThrottlingException" | "RequestLimitExceeded"
        | "TooManyRequestsException" | "SlowDown" | "ServiceUnavailable" | "InternalError"
        | "InternalFailure" | "RequestTimeout" => ClientError::Transient(described),

        "NoSuchBucket" | "NoSuchKey" | "NoSuchEntity" => ClientError::NotFound(described),

        _ if code.ends_with("NotFound") || code.ends_with("NotFoundException") => {
            ClientError::NotFound(described)
        }

        _ => ClientError::Provider(described),
    }
}
