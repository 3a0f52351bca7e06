//! SHA-256 digests of token plaintexts; the only token material that reaches storage.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// 32-byte SHA-256 digest of a token plaintext.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenHash([u8; 32]);
impl TokenHash {
	/// Digest length in bytes.
	pub const LEN: usize = 32;

	/// Hashes the plaintext exactly as the client presents it.
	pub fn digest(plaintext: &str) -> Self {
		Self(Sha256::digest(plaintext.as_bytes()).into())
	}

	/// Wraps raw digest bytes read back from storage.
	pub const fn from_bytes(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	/// Borrows the raw digest bytes.
	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}
}
impl Debug for TokenHash {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenHash(")?;

		for byte in &self.0[..4] {
			write!(f, "{byte:02x}")?;
		}

		f.write_str("..)")
	}
}
