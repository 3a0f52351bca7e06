//! Token plaintext wrapper that redacts sensitive material.

// self
use crate::{_prelude::*, auth::TokenHash};

/// Client-visible token value; shown to its owner once and never persisted or logged.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPlaintext(String);
impl TokenPlaintext {
	/// Exact length of every issued plaintext (16 random bytes in unpadded base-32).
	pub const LEN: usize = 26;

	/// Wraps a plaintext value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Digest that storage keys the token by.
	pub fn hash(&self) -> TokenHash {
		TokenHash::digest(&self.0)
	}
}
impl AsRef<str> for TokenPlaintext {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenPlaintext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenPlaintext").field(&"<redacted>").finish()
	}
}
impl Display for TokenPlaintext {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
impl Serialize for TokenPlaintext {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: serde::Serializer,
	{
		serializer.serialize_str(&self.0)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn plaintext_formatters_redact() {
		let plaintext = TokenPlaintext::new("Y3QMGX3PJ3WLRL2YRTQGQ6KRHU");

		assert_eq!(format!("{plaintext:?}"), "TokenPlaintext(\"<redacted>\")");
		assert_eq!(format!("{plaintext}"), "<redacted>");
		assert_eq!(plaintext.expose().len(), TokenPlaintext::LEN);
	}

	#[test]
	fn serialization_hands_the_value_to_its_owner() {
		let plaintext = TokenPlaintext::new("Y3QMGX3PJ3WLRL2YRTQGQ6KRHU");

		assert_eq!(
			serde_json::to_string(&plaintext).expect("Plaintext should serialize."),
			"\"Y3QMGX3PJ3WLRL2YRTQGQ6KRHU\""
		);
	}
}
