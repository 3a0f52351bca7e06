//! Storage contracts consumed by the gate and a built-in in-memory implementation.
//!
//! The gate never talks to a database directly. Tokens, permissions, and versioned records
//! are reached through these traits, and every call is bounded by [`within`] so a stalled
//! backend surfaces as [`StoreError::Timeout`] instead of a hung request.

pub mod memory;

pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{PermissionSet, TokenHash, TokenRecord, TokenScope, User, UserId},
	record::{Filters, Listing, Movie, MovieCriteria, Version, VersionedRecord},
};

/// Default bound applied to each storage call.
pub const DEFAULT_DEADLINE: StdDuration = StdDuration::from_secs(3);

/// Boxed future returned by every storage contract.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Token persistence. Only digests cross this boundary, never plaintexts.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Persists a freshly issued token.
	fn insert(&self, record: TokenRecord) -> StoreFuture<'_, ()>;

	/// Returns the owner of the token whose digest is `hash`, provided the token carries `scope`
	/// and `now` is before its expiry.
	fn find_user_by_token_hash<'a>(
		&'a self,
		hash: &'a TokenHash,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<User>>;

	/// Fetches the raw token row for `hash` regardless of scope or expiry.
	fn fetch_token<'a>(&'a self, hash: &'a TokenHash) -> StoreFuture<'a, Option<TokenRecord>>;

	/// Deletes every token of `scope` owned by `user`, returning how many were removed.
	fn delete_all_for_user(&self, user: UserId, scope: TokenScope) -> StoreFuture<'_, u64>;
}

/// Read side of the permission tables, plus the grant used by registration.
pub trait PermissionStore
where
	Self: Send + Sync,
{
	/// Fetches every permission code granted to `user`.
	fn get_all_for_user(&self, user: UserId) -> StoreFuture<'_, PermissionSet>;

	/// Grants additional codes to `user`.
	fn add_for_user(&self, user: UserId, codes: PermissionSet) -> StoreFuture<'_, ()>;
}

/// Versioned record persistence with an atomic conditional update.
pub trait RecordStore<R>
where
	Self: Send + Sync,
	R: VersionedRecord,
{
	/// Inserts a new record at [`Version::INITIAL`].
	fn insert(&self, fields: R::Fields, created_at: OffsetDateTime) -> StoreFuture<'_, R>;

	/// Fetches the current record, if present.
	fn fetch(&self, id: R::Id) -> StoreFuture<'_, Option<R>>;

	/// Applies `fields` and bumps the version, only if the stored version equals `expected`.
	///
	/// Returns the new version, or `None` when no record matched id + version. Implementations
	/// must perform this as one compare-and-set, never a read followed by a write.
	fn conditional_update(
		&self,
		id: R::Id,
		expected: Version,
		fields: R::Fields,
	) -> StoreFuture<'_, Option<Version>>;

	/// Removes the record, returning whether it existed.
	fn delete(&self, id: R::Id) -> StoreFuture<'_, bool>;
}

/// User persistence plus the lookup login needs.
pub trait UserStore
where
	Self: RecordStore<User>,
{
	/// Fetches the account registered under `email`, compared exactly.
	fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>>;
}

/// Movie persistence plus the paged listing query.
pub trait MovieStore
where
	Self: RecordStore<Movie>,
{
	/// Returns the page `filters` selects from the movies matching `criteria`.
	///
	/// Rows are ordered by the sort column, then by ascending id. `filters` must already have
	/// passed [`Filters::validate`]; an unsafe sort key panics.
	fn list<'a>(
		&'a self,
		criteria: &'a MovieCriteria,
		filters: &'a Filters,
	) -> StoreFuture<'a, Listing<Movie>>;
}

/// Error type produced by storage implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The call did not complete within its deadline.
	#[error("Storage call exceeded its deadline.")]
	Timeout,
	/// A unique constraint rejected the write.
	#[error("Duplicate value for unique field `{field}`.")]
	Duplicate {
		/// Field whose uniqueness was violated.
		field: String,
	},
}

/// Awaits a storage call, failing with [`StoreError::Timeout`] once `deadline` elapses.
pub async fn within<F, T>(deadline: StdDuration, call: F) -> Result<T, StoreError>
where
	F: Future<Output = Result<T, StoreError>>,
{
	tokio::time::timeout(deadline, call).await.map_err(|_| StoreError::Timeout)?
}
