//! Persisted token rows and their lifecycle helpers.

// self
use crate::{
	_prelude::*,
	auth::{TokenHash, TokenScope, UserId},
};

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable.
	Active,
	/// Token reached its expiry instant.
	Expired,
}

/// Stored form of an issued token. The plaintext is never part of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
	/// SHA-256 digest of the plaintext.
	pub hash: TokenHash,
	/// Owning user.
	pub user_id: UserId,
	/// Purpose the token was minted for.
	pub scope: TokenScope,
	/// Absolute expiry instant.
	pub expiry: OffsetDateTime,
}
impl TokenRecord {
	/// Creates a record expiring `ttl` after `issued_at`.
	///
	/// Fails with [`Error::ExpiryOverflow`] when the expiry falls outside the representable
	/// date range.
	pub fn new(
		hash: TokenHash,
		user_id: UserId,
		scope: TokenScope,
		issued_at: OffsetDateTime,
		ttl: Duration,
	) -> Result<Self> {
		let expiry = issued_at.checked_add(ttl).ok_or(Error::ExpiryOverflow { ttl })?;

		Ok(Self { hash, user_id, scope, expiry })
	}

	/// Computes the lifecycle status at a given instant; valid only while `instant < expiry`.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expiry { TokenStatus::Active } else { TokenStatus::Expired }
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record authenticates `scope` at `instant`.
	pub fn grants(&self, scope: TokenScope, instant: OffsetDateTime) -> bool {
		self.scope == scope && !self.is_expired_at(instant)
	}
}
