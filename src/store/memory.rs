//! Thread-safe in-memory store implementing every contract, for local development and tests.

// std
use std::sync::atomic::{AtomicI64, Ordering};
// self
use crate::{
	_prelude::*,
	auth::{
		PermissionSet, RecordId, TokenHash, TokenRecord, TokenScope, User, UserFields, UserId,
	},
	record::{
		Filters, Listing, Metadata, Movie, MovieCriteria, MovieFields, SortDirection, Version,
		VersionedRecord,
	},
	store::{
		MovieStore, PermissionStore, RecordStore, StoreError, StoreFuture, TokenStore, UserStore,
	},
};

/// Thread-safe storage backend that keeps every table in-process.
#[derive(Debug, Default)]
pub struct MemoryStore {
	tokens: RwLock<HashMap<TokenHash, TokenRecord>>,
	permissions: RwLock<HashMap<UserId, PermissionSet>>,
	users: VersionedTable<User>,
	movies: VersionedTable<Movie>,
}
impl MemoryStore {
	/// Number of token rows currently stored.
	pub fn token_count(&self) -> usize {
		self.tokens.read().len()
	}

	/// Token rows owned by `user`, for inspection in tests and demos.
	pub fn tokens_for(&self, user: UserId) -> Vec<TokenRecord> {
		self.tokens.read().values().filter(|record| record.user_id == user).cloned().collect()
	}

	fn find_user_now(
		&self,
		hash: &TokenHash,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> Option<User> {
		let owner = self
			.tokens
			.read()
			.get(hash)
			.filter(|record| record.grants(scope, now))
			.map(|record| record.user_id)?;

		self.users.rows.read().get(&owner).cloned()
	}

	fn list_movies_now(&self, criteria: &MovieCriteria, filters: &Filters) -> Listing<Movie> {
		let column = filters.sort_column();
		let direction = filters.sort_direction();
		let mut matched = self
			.movies
			.rows
			.read()
			.values()
			.filter(|movie| criteria.matches(movie))
			.cloned()
			.collect::<Vec<_>>();

		matched.sort_by(|a, b| {
			let order = match direction {
				SortDirection::Ascending => a.compare_on(b, column),
				SortDirection::Descending => b.compare_on(a, column),
			};

			order.then_with(|| a.id.cmp(&b.id))
		});

		let total = matched.len() as u64;
		let records = matched.into_iter().skip(filters.offset()).take(filters.limit()).collect();

		Listing { records, metadata: Metadata::calculate(total, filters.page, filters.page_size) }
	}

	fn delete_tokens_now(&self, user: UserId, scope: TokenScope) -> u64 {
		let mut guard = self.tokens.write();
		let before = guard.len();

		guard.retain(|_, record| !(record.user_id == user && record.scope == scope));

		(before - guard.len()) as u64
	}
}
impl TokenStore for MemoryStore {
	fn insert(&self, record: TokenRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			self.tokens.write().insert(record.hash, record);

			Ok(())
		})
	}

	fn find_user_by_token_hash<'a>(
		&'a self,
		hash: &'a TokenHash,
		scope: TokenScope,
		now: OffsetDateTime,
	) -> StoreFuture<'a, Option<User>> {
		Box::pin(async move { Ok(self.find_user_now(hash, scope, now)) })
	}

	fn fetch_token<'a>(&'a self, hash: &'a TokenHash) -> StoreFuture<'a, Option<TokenRecord>> {
		Box::pin(async move { Ok(self.tokens.read().get(hash).cloned()) })
	}

	fn delete_all_for_user(&self, user: UserId, scope: TokenScope) -> StoreFuture<'_, u64> {
		Box::pin(async move { Ok(self.delete_tokens_now(user, scope)) })
	}
}
impl PermissionStore for MemoryStore {
	fn get_all_for_user(&self, user: UserId) -> StoreFuture<'_, PermissionSet> {
		Box::pin(async move { Ok(self.permissions.read().get(&user).cloned().unwrap_or_default()) })
	}

	fn add_for_user(&self, user: UserId, codes: PermissionSet) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.permissions.write();
			let merged = guard.get(&user).map(|held| held.union(&codes)).unwrap_or(codes);

			guard.insert(user, merged);

			Ok(())
		})
	}
}
impl RecordStore<User> for MemoryStore {
	fn insert(&self, fields: UserFields, created_at: OffsetDateTime) -> StoreFuture<'_, User> {
		Box::pin(async move { self.users.insert_now(fields, created_at) })
	}

	fn fetch(&self, id: UserId) -> StoreFuture<'_, Option<User>> {
		Box::pin(async move { Ok(self.users.rows.read().get(&id).cloned()) })
	}

	fn conditional_update(
		&self,
		id: UserId,
		expected: Version,
		fields: UserFields,
	) -> StoreFuture<'_, Option<Version>> {
		Box::pin(async move { self.users.update_now(id, expected, fields) })
	}

	fn delete(&self, id: UserId) -> StoreFuture<'_, bool> {
		Box::pin(async move { Ok(self.users.rows.write().remove(&id).is_some()) })
	}
}
impl UserStore for MemoryStore {
	fn find_by_email<'a>(&'a self, email: &'a str) -> StoreFuture<'a, Option<User>> {
		Box::pin(async move {
			Ok(self.users.rows.read().values().find(|user| user.fields.email == email).cloned())
		})
	}
}
impl RecordStore<Movie> for MemoryStore {
	fn insert(&self, fields: MovieFields, created_at: OffsetDateTime) -> StoreFuture<'_, Movie> {
		Box::pin(async move { self.movies.insert_now(fields, created_at) })
	}

	fn fetch(&self, id: RecordId) -> StoreFuture<'_, Option<Movie>> {
		Box::pin(async move { Ok(self.movies.rows.read().get(&id).cloned()) })
	}

	fn conditional_update(
		&self,
		id: RecordId,
		expected: Version,
		fields: MovieFields,
	) -> StoreFuture<'_, Option<Version>> {
		Box::pin(async move { self.movies.update_now(id, expected, fields) })
	}

	fn delete(&self, id: RecordId) -> StoreFuture<'_, bool> {
		Box::pin(async move { Ok(self.movies.rows.write().remove(&id).is_some()) })
	}
}

impl MovieStore for MemoryStore {
	fn list<'a>(
		&'a self,
		criteria: &'a MovieCriteria,
		filters: &'a Filters,
	) -> StoreFuture<'a, Listing<Movie>> {
		Box::pin(async move { Ok(self.list_movies_now(criteria, filters)) })
	}
}

#[derive(Debug)]
struct VersionedTable<R>
where
	R: VersionedRecord,
{
	rows: RwLock<BTreeMap<R::Id, R>>,
	next_id: AtomicI64,
}
impl<R> VersionedTable<R>
where
	R: VersionedRecord,
{
	fn insert_now(&self, fields: R::Fields, created_at: OffsetDateTime) -> Result<R, StoreError> {
		let mut guard = self.rows.write();

		if let Some(field) = guard.values().find_map(|row| row.conflicting_field(&fields)) {
			return Err(StoreError::Duplicate { field: field.into() });
		}

		let id = R::Id::from(self.next_id.fetch_add(1, Ordering::Relaxed));
		let record = R::create(id, fields, created_at);

		guard.insert(id, record.clone());

		Ok(record)
	}

	fn update_now(
		&self,
		id: R::Id,
		expected: Version,
		fields: R::Fields,
	) -> Result<Option<Version>, StoreError> {
		let mut guard = self.rows.write();

		if !guard.get(&id).is_some_and(|row| row.version() == expected) {
			return Ok(None);
		}
		if let Some(field) = guard
			.values()
			.filter(|row| row.id() != id)
			.find_map(|row| row.conflicting_field(&fields))
		{
			return Err(StoreError::Duplicate { field: field.into() });
		}

		let Some(next) = expected.next() else {
			return Err(StoreError::Backend { message: format!("version {expected} is exhausted") });
		};

		if let Some(row) = guard.get_mut(&id) {
			row.apply(fields, next);
		}

		Ok(Some(next))
	}
}
impl<R> Default for VersionedTable<R>
where
	R: VersionedRecord,
{
	fn default() -> Self {
		Self { rows: RwLock::new(BTreeMap::new()), next_id: AtomicI64::new(1) }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::record::Runtime;

	fn movie_fields(title: &str) -> MovieFields {
		MovieFields {
			title: title.into(),
			year: 1942,
			runtime: Runtime(102),
			genres: vec!["drama".into()],
		}
	}

	#[tokio::test]
	async fn ids_are_assigned_sequentially_from_one() {
		let store = MemoryStore::default();
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let first = <MemoryStore as RecordStore<Movie>>::insert(&store, movie_fields("A"), created)
			.await
			.expect("First insert should succeed.");
		let second = <MemoryStore as RecordStore<Movie>>::insert(&store, movie_fields("B"), created)
			.await
			.expect("Second insert should succeed.");

		assert_eq!(first.id, RecordId::new(1));
		assert_eq!(second.id, RecordId::new(2));
		assert_eq!(second.version, Version::INITIAL);
	}

	#[tokio::test]
	async fn version_check_runs_before_uniqueness() {
		let store = MemoryStore::default();
		let created = macros::datetime!(2025-01-01 00:00 UTC);
		let fields = |email: &str| UserFields {
			name: "n".into(),
			email: email.into(),
			activated: false,
			password_hash: None,
		};
		let a = <MemoryStore as RecordStore<User>>::insert(&store, fields("a@x.io"), created)
			.await
			.expect("User A insert should succeed.");

		<MemoryStore as RecordStore<User>>::insert(&store, fields("b@x.io"), created)
			.await
			.expect("User B insert should succeed.");

		let stale = <MemoryStore as RecordStore<User>>::conditional_update(
			&store,
			a.id,
			Version::new(9),
			fields("b@x.io"),
		)
		.await;

		assert_eq!(stale, Ok(None));

		let duplicate = <MemoryStore as RecordStore<User>>::conditional_update(
			&store,
			a.id,
			a.version,
			fields("b@x.io"),
		)
		.await;

		assert_eq!(duplicate, Err(StoreError::Duplicate { field: "email".into() }));
	}
}
