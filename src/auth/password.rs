//! Account passwords: plaintext rules and the bcrypt digest stored in their place.

// self
use crate::{_prelude::*, validate::Validator};

/// Shortest accepted password, in bytes.
pub const MIN_PASSWORD_BYTES: usize = 8;
/// Longest accepted password, in bytes; bcrypt ignores anything past this.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Records password reasons under the `password` field.
pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
	v.check(!password.is_empty(), "password", "must be provided");
	v.check(password.len() >= MIN_PASSWORD_BYTES, "password", "must be at least 8 bytes long");
	v.check(
		password.len() <= MAX_PASSWORD_BYTES,
		"password",
		"must not be more than 72 bytes long",
	);
}

/// bcrypt digest of an account password; the plaintext itself is never kept.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);
impl PasswordHash {
	/// Work factor applied to production hashes.
	pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;
	/// Cheapest work factor bcrypt accepts.
	pub const MIN_COST: u32 = 4; // bcrypt::MIN_COST is private upstream; same value.

	/// Hashes `plaintext` with a fresh salt. CPU bound; async callers run it off the executor.
	pub fn new(plaintext: &str, cost: u32) -> Result<Self> {
		bcrypt::hash(plaintext, cost)
			.map(Self)
			.map_err(|e| Error::PasswordHash { message: e.to_string() })
	}

	/// Wraps a digest read back from storage.
	pub fn from_digest(digest: impl Into<String>) -> Self {
		Self(digest.into())
	}

	/// Returns the encoded digest for persistence.
	pub fn digest(&self) -> &str {
		&self.0
	}

	/// Checks `plaintext` against the digest. A malformed digest is an error, not a mismatch.
	pub fn matches(&self, plaintext: &str) -> Result<bool> {
		bcrypt::verify(plaintext, &self.0)
			.map_err(|e| Error::PasswordHash { message: e.to_string() })
	}
}
impl Debug for PasswordHash {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PasswordHash").field(&"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn plaintext_length_rules() {
		let reason = |password: &str| {
			let mut v = Validator::new();

			validate_password_plaintext(&mut v, password);

			v.reason("password").map(str::to_owned)
		};

		assert_eq!(reason("").as_deref(), Some("must be provided"));
		assert_eq!(reason("short").as_deref(), Some("must be at least 8 bytes long"));
		assert_eq!(reason(&"p".repeat(73)).as_deref(), Some("must not be more than 72 bytes long"));
		assert_eq!(reason("pa55word"), None);
		assert_eq!(reason(&"p".repeat(72)), None);
	}

	#[test]
	fn digests_verify_only_their_own_plaintext() {
		let hash = PasswordHash::new("pa55word", PasswordHash::MIN_COST)
			.expect("Hashing a valid password should succeed.");

		assert!(hash.digest().starts_with("$2"));
		assert!(hash.matches("pa55word").expect("Verification should run."));
		assert!(!hash.matches("pa55w0rd").expect("Verification should run."));
		assert_eq!(format!("{hash:?}"), "PasswordHash(\"<redacted>\")");
	}

	#[test]
	fn malformed_digests_are_errors() {
		let err = PasswordHash::from_digest("not-a-bcrypt-digest")
			.matches("pa55word")
			.expect_err("A malformed digest must not verify.");

		assert_eq!(err.kind(), crate::error::ErrorKind::InternalFailure);
	}
}
