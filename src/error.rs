//! Gate-level error taxonomy shared by the limiter, token service, stores, and flows.

// crates.io
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenScope, UserId},
	record::Version,
	store::StoreError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
///
/// Variant payloads and the [`Display`] text are internal diagnostics. Callers across the
/// service boundary only ever see [`Error::rejection`], which carries the [`ErrorKind`] and a
/// generic message.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure (including deadline expiry).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The operating system's secure random source failed.
	#[error("Secure random source failed: {message}.")]
	Entropy {
		/// Error text reported by the random source.
		message: String,
	},
	/// A token lifetime pushes its expiry past the supported date range.
	#[error("Token lifetime of {ttl} overflows the expiry instant.")]
	ExpiryOverflow {
		/// Lifetime that was requested.
		ttl: Duration,
	},
	/// A record has been updated so many times its version counter is exhausted.
	#[error("Record version {current} cannot be advanced.")]
	VersionExhausted {
		/// Version stored on the record.
		current: Version,
	},
	/// A password could not be hashed or checked.
	#[error("Password hashing failed: {message}.")]
	PasswordHash {
		/// Error text reported by the hasher.
		message: String,
	},

	/// The client's token bucket is exhausted.
	#[error("Client {client} exhausted its request budget.")]
	RateLimited {
		/// Client whose budget ran out.
		client: ClientId,
	},
	/// The presented credential is malformed, unknown, expired, or scoped for another purpose.
	#[error("Credential rejected: {rejection}.")]
	InvalidCredentialFormat {
		/// Internal classification of the rejection.
		rejection: CredentialRejection,
	},
	/// The email and password pair does not match any account.
	#[error("Email and password do not match an account.")]
	InvalidCredentials,
	/// An anonymous identity reached a gated operation.
	#[error("Operation requires an authenticated user.")]
	AuthenticationRequired,
	/// The user is authenticated but has not activated the account.
	#[error("User {user} has not activated the account.")]
	AccountInactive {
		/// Inactive user.
		user: UserId,
	},
	/// The user is activated but lacks the capability.
	#[error("User {user} lacks the `{permission}` permission.")]
	PermissionDenied {
		/// User that was denied.
		user: UserId,
		/// Capability code the operation requires.
		permission: String,
	},
	/// The stored record no longer carries the version the caller read.
	#[error("Record version {expected} is no longer current.")]
	EditConflict {
		/// Version the caller submitted.
		expected: Version,
	},
	/// Client-supplied input failed validation.
	#[error("Input failed validation: {errors:?}.")]
	FailedValidation {
		/// Field name mapped to the first failure reason for that field.
		errors: BTreeMap<String, String>,
	},
}
impl Error {
	/// Builds a single-field validation failure.
	pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::FailedValidation { errors: BTreeMap::from([(field.into(), reason.into())]) }
	}

	/// Classifies the error into the externally visible taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Storage(_)
			| Self::Config(_)
			| Self::Entropy { .. }
			| Self::ExpiryOverflow { .. }
			| Self::VersionExhausted { .. }
			| Self::PasswordHash { .. } => ErrorKind::InternalFailure,
			Self::RateLimited { .. } => ErrorKind::RateLimited,
			Self::InvalidCredentialFormat { .. } => ErrorKind::InvalidCredentialFormat,
			Self::InvalidCredentials => ErrorKind::InvalidCredentials,
			Self::AuthenticationRequired => ErrorKind::AuthenticationRequired,
			Self::AccountInactive { .. } => ErrorKind::AccountInactive,
			Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
			Self::EditConflict { .. } => ErrorKind::EditConflict,
			Self::FailedValidation { .. } => ErrorKind::FailedValidation,
		}
	}

	/// Renders the caller-facing rejection without any internal detail.
	///
	/// Validation failures are the only kind whose field reasons are echoed, since they describe
	/// the caller's own input.
	pub fn rejection(&self) -> Rejection {
		let kind = self.kind();
		let body = match self {
			Self::FailedValidation { errors } => json!({ "error": errors }),
			_ => json!({ "error": kind.public_message() }),
		};

		Rejection { kind, body }
	}
}

/// Externally visible error kinds; the boundary layer maps these onto transport responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	/// Bucket exhausted; retry later.
	RateLimited,
	/// Malformed, unknown, or expired credential; re-authenticate.
	InvalidCredentialFormat,
	/// Email and password pair rejected at login.
	InvalidCredentials,
	/// Anonymous caller on a gated operation.
	AuthenticationRequired,
	/// Authenticated but not activated.
	AccountInactive,
	/// Activated but lacking the capability.
	PermissionDenied,
	/// Optimistic-concurrency version mismatch; re-fetch and resubmit.
	EditConflict,
	/// Caller input failed validation.
	FailedValidation,
	/// Unexpected collaborator failure.
	InternalFailure,
}
impl ErrorKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ErrorKind::RateLimited => "rate_limited",
			ErrorKind::InvalidCredentialFormat => "invalid_credential_format",
			ErrorKind::InvalidCredentials => "invalid_credentials",
			ErrorKind::AuthenticationRequired => "authentication_required",
			ErrorKind::AccountInactive => "account_inactive",
			ErrorKind::PermissionDenied => "permission_denied",
			ErrorKind::EditConflict => "edit_conflict",
			ErrorKind::FailedValidation => "failed_validation",
			ErrorKind::InternalFailure => "internal_failure",
		}
	}

	/// Generic message shown to callers.
	pub const fn public_message(self) -> &'static str {
		match self {
			ErrorKind::RateLimited => "rate limit exceeded",
			ErrorKind::InvalidCredentialFormat => "invalid or missing authentication token",
			ErrorKind::InvalidCredentials => "invalid authentication credentials",
			ErrorKind::AuthenticationRequired =>
				"you must be authenticated to access this resource",
			ErrorKind::AccountInactive =>
				"your user account must be activated to access this resource",
			ErrorKind::PermissionDenied =>
				"your user account doesn't have the necessary permissions to access this resource",
			ErrorKind::EditConflict =>
				"unable to update the record due to an edit conflict, please try again",
			ErrorKind::FailedValidation => "the request failed validation",
			ErrorKind::InternalFailure =>
				"the server encountered a problem and could not process your request",
		}
	}

	/// Returns `true` when the caller may retry the same operation later.
	pub const fn is_retryable(self) -> bool {
		matches!(self, ErrorKind::RateLimited | ErrorKind::EditConflict)
	}
}
impl Display for ErrorKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Caller-facing rendering of an [`Error`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rejection {
	/// Taxonomy kind the boundary layer maps to a transport status.
	pub kind: ErrorKind,
	/// JSON envelope of the form `{"error": ...}`.
	pub body: Value,
}

/// Internal reason a bearer credential was rejected.
///
/// Every variant surfaces as [`ErrorKind::InvalidCredentialFormat`]; the distinction only
/// reaches logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialRejection {
	/// The authorization value is not `Bearer <token>`.
	MalformedHeader,
	/// The token failed syntactic validation.
	MalformedToken,
	/// No stored token matches the digest.
	UnknownToken,
	/// A stored token matches but its expiry has passed.
	ExpiredToken,
	/// A stored token matches but was minted for another scope.
	ScopeMismatch {
		/// Scope the token was minted for.
		actual: TokenScope,
	},
}
impl Display for CredentialRejection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::MalformedHeader => f.write_str("malformed authorization header"),
			Self::MalformedToken => f.write_str("malformed token"),
			Self::UnknownToken => f.write_str("unknown token"),
			Self::ExpiredToken => f.write_str("expired token"),
			Self::ScopeMismatch { actual } => write!(f, "token scoped for {actual}"),
		}
	}
}

/// Configuration and lifecycle failures raised while wiring the gate.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration text could not be parsed.
	#[error("Configuration could not be parsed at `{}`.", .source.path())]
	Parse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Rate limiter settings are unusable.
	#[error("Rate limiter configuration is invalid: {reason}.")]
	InvalidLimiter {
		/// Which constraint was violated.
		reason: &'static str,
	},
	/// A token lifetime is zero or negative.
	#[error("The {field} must be positive.")]
	NonPositiveTtl {
		/// Offending configuration field.
		field: &'static str,
	},
	/// A token lifetime exceeds the supported maximum.
	#[error("The {field} must not exceed {max_secs} seconds.")]
	TtlTooLong {
		/// Offending configuration field.
		field: &'static str,
		/// Largest accepted lifetime in seconds.
		max_secs: i64,
	},
	/// The storage deadline is zero.
	#[error("The storage deadline must be positive.")]
	ZeroDeadline,
	/// A background task was started outside a Tokio runtime.
	#[error("No Tokio runtime is available to host the sweep task.")]
	NoRuntime,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_internal_failure_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let error: Error = store_error.clone().into();

		assert_eq!(error.kind(), ErrorKind::InternalFailure);
		assert!(error.to_string().contains("database unreachable"));

		let source = StdError::source(&error)
			.expect("Gate error should expose the underlying store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn rejections_hide_internal_detail() {
		let denied = Error::PermissionDenied {
			user: UserId::new(7),
			permission: "movies:write".into(),
		};
		let rejection = denied.rejection();

		assert_eq!(rejection.kind, ErrorKind::PermissionDenied);
		assert!(!rejection.body.to_string().contains("movies:write"));
		assert!(denied.to_string().contains("movies:write"), "Logs keep the missing code.");

		let internal: Error = StoreError::Timeout.into();

		assert_eq!(
			internal.rejection().body,
			json!({ "error": ErrorKind::InternalFailure.public_message() })
		);
	}

	#[test]
	fn credential_rejections_are_externally_uniform() {
		let bodies = [
			CredentialRejection::MalformedHeader,
			CredentialRejection::UnknownToken,
			CredentialRejection::ExpiredToken,
			CredentialRejection::ScopeMismatch { actual: TokenScope::Activation },
		]
		.into_iter()
		.map(|rejection| Error::InvalidCredentialFormat { rejection }.rejection())
		.collect::<Vec<_>>();

		assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
	}

	#[test]
	fn validation_failures_echo_field_reasons() {
		let rejection = Error::invalid_field("token", "must be 26 bytes long").rejection();

		assert_eq!(rejection.kind, ErrorKind::FailedValidation);
		assert_eq!(rejection.body, json!({ "error": { "token": "must be 26 bytes long" } }));
	}

	#[test]
	fn only_throttling_and_conflicts_are_retryable() {
		assert!(ErrorKind::RateLimited.is_retryable());
		assert!(ErrorKind::EditConflict.is_retryable());
		assert!(!ErrorKind::PermissionDenied.is_retryable());
		assert_eq!(
			serde_json::to_string(&ErrorKind::InvalidCredentialFormat)
				.expect("ErrorKind should serialize to JSON."),
			"\"invalid_credential_format\""
		);
	}
}
