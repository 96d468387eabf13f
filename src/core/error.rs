use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationInvalidArgument,

    BindingMalformedDocument,
    BindingTypeMismatch,

    DownloadFailed,

    FsDirectoryCreate,
    FsCleanupFailed,
    FsWriteFailed,

    ArchiveExtractFailed,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::BindingMalformedDocument => "binding.malformed_document",
            ErrorCode::BindingTypeMismatch => "binding.type_mismatch",

            ErrorCode::DownloadFailed => "download.failed",

            ErrorCode::FsDirectoryCreate => "fs.directory_create",
            ErrorCode::FsCleanupFailed => "fs.cleanup_failed",
            ErrorCode::FsWriteFailed => "fs.write_failed",

            ErrorCode::ArchiveExtractFailed => "archive.extract_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MalformedDocumentDetails {
    pub source: String,
    pub path: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMismatchDetails {
    pub path: String,
    pub expected: String,
    pub found: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFailedDetails {
    pub url: String,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub attempts: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathErrorDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractFailedDetails {
    pub archive: String,
    pub destination: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            value,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            details,
        )
    }

    /// The binding document is not the expected `{label: [{...}]}` shape.
    pub fn binding_malformed(
        source: impl Into<String>,
        path: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let problem = problem.into();
        let details = to_details(MalformedDocumentDetails {
            source: source.clone(),
            path: path.into(),
            problem: problem.clone(),
        });

        Self::new(
            ErrorCode::BindingMalformedDocument,
            format!("Malformed {}: {}", source, problem),
            details,
        )
        .with_hint(format!("Check the {} value provided by the platform", source))
    }

    pub fn binding_type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let expected = expected.into();
        let found = found.into();
        let message = format!("Expected {} at {}, found {}", expected, path, found);
        let details = to_details(TypeMismatchDetails {
            path,
            expected,
            found,
        });

        Self::new(ErrorCode::BindingTypeMismatch, message, details)
    }

    /// `retryable` records whether the downloader considered the failure
    /// transient (transport errors, 5xx), not whether a retry was left.
    pub fn download_failed(
        url: impl Into<String>,
        error: impl Into<String>,
        status: Option<u16>,
        attempts: u32,
        retryable: bool,
    ) -> Self {
        let url = url.into();
        let error = error.into();
        let message = format!("Download of {} failed: {}", url, error);
        let details = to_details(DownloadFailedDetails {
            url,
            error,
            status,
            attempts,
        });

        let mut err = Self::new(ErrorCode::DownloadFailed, message, details);
        err.retryable = Some(retryable);
        err
    }

    pub fn directory_create(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("Creating {} failed", path);
        let details = to_details(PathErrorDetails {
            path,
            error: error.into(),
        });

        Self::new(ErrorCode::FsDirectoryCreate, message, details)
    }

    pub fn cleanup_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("Removing {} failed", path);
        let details = to_details(PathErrorDetails {
            path,
            error: error.into(),
        });

        Self::new(ErrorCode::FsCleanupFailed, message, details)
            .with_hint("The agent was extracted but the archive was left behind")
    }

    pub fn write_failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("Writing {} failed", path);
        let details = to_details(PathErrorDetails {
            path,
            error: error.into(),
        });

        Self::new(ErrorCode::FsWriteFailed, message, details)
    }

    pub fn extract_failed(
        archive: impl Into<String>,
        destination: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        let archive = archive.into();
        let message = format!("Extracting {} failed", archive);
        let details = to_details(ExtractFailedDetails {
            archive,
            destination: destination.into(),
            error: error.into(),
        });

        Self::new(ErrorCode::ArchiveExtractFailed, message, details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: impl Into<String>) -> Self {
        let details = to_details(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = to_details(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        });

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = to_details(InternalIoErrorDetails {
            error: error.into(),
            context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            serde_json::json!({ "error": error.into(), "context": context }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    /// Add one field to an object `details` payload.
    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        if let Value::Object(map) = &mut self.details {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    /// Prefix the message with the failing step, keeping code and details.
    pub fn with_context(mut self, prefix: impl AsRef<str>) -> Self {
        self.message = format!("{}: {}", prefix.as_ref(), self.message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_have_dotted_names() {
        assert_eq!(
            ErrorCode::BindingMalformedDocument.as_str(),
            "binding.malformed_document"
        );
        assert_eq!(ErrorCode::DownloadFailed.as_str(), "download.failed");
        assert_eq!(ErrorCode::FsCleanupFailed.as_str(), "fs.cleanup_failed");
    }

    #[test]
    fn download_failed_carries_retry_verdict_and_url() {
        let err = Error::download_failed("http://broker/x.zip", "boom", Some(503), 2, true)
            .with_detail("path", "/tmp/x.zip");

        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.details["url"], "http://broker/x.zip");
        assert_eq!(err.details["path"], "/tmp/x.zip");
        assert_eq!(err.details["status"], 503);
        assert_eq!(err.details["attempts"], 2);

        let err = Error::download_failed("http://broker/x.zip", "gone", Some(404), 1, false);
        assert_eq!(err.retryable, Some(false));
        assert!(err.details.get("path").is_none());
    }

    #[test]
    fn with_context_prefixes_message_only() {
        let err = Error::write_failed("/deps/0/profile.d/riverbed.sh", "denied")
            .with_context("Failed to write launch environment");

        assert_eq!(err.code, ErrorCode::FsWriteFailed);
        assert!(err
            .message
            .starts_with("Failed to write launch environment: Writing /deps/0/profile.d"));
        assert_eq!(err.details["error"], "denied");
    }
}
