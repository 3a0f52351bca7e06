//! Token issuance, revocation, and resolution on top of a [`TokenStore`].
//!
//! Plaintexts are 16 bytes from the operating system's secure random source, encoded as
//! 26 characters of unpadded base-32. Only their SHA-256 digests are handed to storage.

// crates.io
use data_encoding::BASE32_NOPAD;
use rand::{TryRngCore, rngs::OsRng};
// self
use crate::{
	_prelude::*,
	auth::{TokenHash, TokenPlaintext, TokenRecord, TokenScope, User, UserId},
	clock::Clock,
	error::CredentialRejection,
	store::{self, TokenStore},
	validate::Validator,
};

/// Freshly issued token returned to its owner exactly once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
	/// Plaintext the client must present; serialized as `token`.
	#[serde(rename = "token")]
	pub plaintext: TokenPlaintext,
	/// Absolute expiry instant.
	#[serde(with = "time::serde::rfc3339")]
	pub expiry: OffsetDateTime,
	/// Scope the token authenticates.
	#[serde(skip)]
	pub scope: TokenScope,
}

/// Issues and resolves scoped bearer tokens.
#[derive(Clone)]
pub struct TokenService {
	store: Arc<dyn TokenStore>,
	clock: Arc<dyn Clock>,
	deadline: StdDuration,
}
impl TokenService {
	/// Number of random bytes behind every plaintext.
	pub const ENTROPY_BYTES: usize = 16;

	/// Creates a service bounded by [`store::DEFAULT_DEADLINE`].
	pub fn new(store: Arc<dyn TokenStore>, clock: Arc<dyn Clock>) -> Self {
		Self { store, clock, deadline: store::DEFAULT_DEADLINE }
	}

	/// Overrides the deadline applied to each storage call.
	pub fn with_storage_deadline(mut self, deadline: StdDuration) -> Self {
		self.deadline = deadline;

		self
	}

	/// Clock used to stamp issuance and resolve expiry.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Mints a plaintext and the record that would persist it, without touching storage.
	pub fn generate(
		user: UserId,
		ttl: Duration,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> Result<(TokenPlaintext, TokenRecord)> {
		let mut bytes = [0_u8; Self::ENTROPY_BYTES];

		OsRng
			.try_fill_bytes(&mut bytes)
			.map_err(|e| Error::Entropy { message: e.to_string() })?;

		let plaintext = TokenPlaintext::new(BASE32_NOPAD.encode(&bytes));

		debug_assert_eq!(plaintext.expose().len(), TokenPlaintext::LEN);

		let record = TokenRecord::new(plaintext.hash(), user, scope, now, ttl)?;

		Ok((plaintext, record))
	}

	/// Generates and persists a token, returning the plaintext only once the write succeeded.
	pub async fn issue(
		&self,
		user: UserId,
		ttl: Duration,
		scope: TokenScope,
	) -> Result<IssuedToken> {
		let (plaintext, record) = Self::generate(user, ttl, scope, self.clock.now())?;
		let expiry = record.expiry;

		store::within(self.deadline, self.store.insert(record)).await?;

		Ok(IssuedToken { plaintext, expiry, scope })
	}

	/// Deletes every token of `scope` owned by `user`; other scopes are untouched.
	pub async fn revoke_all(&self, user: UserId, scope: TokenScope) -> Result<u64> {
		Ok(store::within(self.deadline, self.store.delete_all_for_user(user, scope)).await?)
	}

	/// Revokes the user's tokens of `scope`, then issues a replacement.
	pub async fn reissue(
		&self,
		user: UserId,
		ttl: Duration,
		scope: TokenScope,
	) -> Result<IssuedToken> {
		self.revoke_all(user, scope).await?;

		self.issue(user, ttl, scope).await
	}

	/// Syntactic check applied before any lookup.
	pub fn validate_plaintext(raw: &str) -> Validator {
		let mut v = Validator::new();

		v.check(!raw.is_empty(), "token", "must be provided");
		v.check(raw.len() == TokenPlaintext::LEN, "token", "must be 26 bytes long");

		v
	}

	/// Resolves the owner of an unexpired token of `scope`.
	///
	/// A miss becomes [`Error::InvalidCredentialFormat`]. The rejection distinguishes unknown,
	/// expired, and wrongly scoped tokens for logging; callers render all three identically.
	pub async fn resolve_user(
		&self,
		plaintext: &TokenPlaintext,
		scope: TokenScope,
	) -> Result<User> {
		let hash = plaintext.hash();
		let now = self.clock.now();

		if let Some(user) =
			store::within(self.deadline, self.store.find_user_by_token_hash(&hash, scope, now))
				.await?
		{
			return Ok(user);
		}

		let rejection = self.classify_miss(&hash, scope, now).await;

		Err(Error::InvalidCredentialFormat { rejection })
	}

	async fn classify_miss(
		&self,
		hash: &TokenHash,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> CredentialRejection {
		// Diagnostic only; a failed fetch must not change the verdict.
		let record =
			store::within(self.deadline, self.store.fetch_token(hash)).await.ok().flatten();

		match record {
			Some(record) if record.scope != scope =>
				CredentialRejection::ScopeMismatch { actual: record.scope },
			Some(record) if record.is_expired_at(now) => CredentialRejection::ExpiredToken,
			_ => CredentialRejection::UnknownToken,
		}
	}
}
impl Debug for TokenService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenService")
			.field("clock", &self.clock)
			.field("deadline", &self.deadline)
			.finish_non_exhaustive()
	}
}
