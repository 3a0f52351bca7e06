//! Permission-gated movie operations.
//!
//! Every operation declares its [`Requirement`] and runs behind [`Gatekeeper::run`]: reads need
//! `movies:read`, writes need `movies:write`. Listings are paged and sorted through [`Filters`].

// self
use crate::{
	_prelude::*,
	auth::{MOVIES_READ, MOVIES_WRITE, RecordId},
	clock::Clock,
	gate::{Gatekeeper, Inbound, Requirement},
	record::{self, Filters, Listing, Movie, MovieCriteria, MovieFields, MovieUpdate, Version},
	store::{self, MovieStore},
	validate::Validator,
};

/// Movie catalog fronted by the authorization pipeline.
#[derive(Clone)]
pub struct Catalog {
	gate: Arc<Gatekeeper>,
	movies: Arc<dyn MovieStore>,
	clock: Arc<dyn Clock>,
	deadline: StdDuration,
}
impl Catalog {
	/// Requirement declared by [`Catalog::show_movie`] and [`Catalog::list_movies`].
	pub const READ: Requirement = Requirement::Permission(MOVIES_READ);
	/// Requirement declared by the mutating operations.
	pub const WRITE: Requirement = Requirement::Permission(MOVIES_WRITE);

	/// Creates the catalog over `movies`, guarded by `gate`.
	pub fn new(
		gate: Arc<Gatekeeper>,
		movies: Arc<dyn MovieStore>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self { gate, movies, clock, deadline: store::DEFAULT_DEADLINE }
	}

	/// Overrides the deadline applied to each storage call.
	pub fn with_storage_deadline(mut self, deadline: StdDuration) -> Self {
		self.deadline = deadline;

		self
	}

	/// Validates and stores a new movie.
	pub async fn create_movie(&self, inbound: &Inbound, fields: MovieFields) -> Result<Movie> {
		self.gate
			.run(inbound, Self::WRITE, |_| async move {
				self.validate(&fields)?;

				let now = self.clock.now();

				Ok(store::within(self.deadline, self.movies.insert(fields, now)).await?)
			})
			.await
	}

	/// Fetches one movie; `None` when it does not exist.
	pub async fn show_movie(&self, inbound: &Inbound, id: RecordId) -> Result<Option<Movie>> {
		self.gate
			.run(inbound, Self::READ, |_| async move {
				Ok(store::within(self.deadline, self.movies.fetch(id)).await?)
			})
			.await
	}

	/// Lists one page of the movies matching `criteria`.
	///
	/// The sort safelist is always [`Movie::SORT_SAFELIST`], whatever `filters` carried in.
	pub async fn list_movies(
		&self,
		inbound: &Inbound,
		criteria: MovieCriteria,
		filters: Filters,
	) -> Result<Listing<Movie>> {
		self.gate
			.run(inbound, Self::READ, |_| async move {
				let filters = Filters { sort_safelist: Movie::SORT_SAFELIST, ..filters };
				let mut v = Validator::new();

				filters.validate(&mut v);
				v.finish()?;

				Ok(store::within(self.deadline, self.movies.list(&criteria, &filters)).await?)
			})
			.await
	}

	/// Applies a partial edit under optimistic concurrency.
	///
	/// When `expected` is given it must match the stored version before anything is written.
	/// Returns `None` when the movie does not exist.
	pub async fn update_movie(
		&self,
		inbound: &Inbound,
		id: RecordId,
		expected: Option<Version>,
		update: MovieUpdate,
	) -> Result<Option<Movie>> {
		self.gate
			.run(inbound, Self::WRITE, |_| async move {
				let Some(mut movie) = store::within(self.deadline, self.movies.fetch(id)).await?
				else {
					return Ok(None);
				};

				if let Some(expected) = expected
					&& expected != movie.version
				{
					return Err(Error::EditConflict { expected });
				}

				let fields = update.apply_to(&movie.fields);

				self.validate(&fields)?;
				record::apply_update(self.movies.as_ref(), self.deadline, &mut movie, fields)
					.await?;

				Ok(Some(movie))
			})
			.await
	}

	/// Hard-deletes a movie, returning whether it existed.
	pub async fn delete_movie(&self, inbound: &Inbound, id: RecordId) -> Result<bool> {
		self.gate
			.run(inbound, Self::WRITE, |_| async move {
				Ok(store::within(self.deadline, self.movies.delete(id)).await?)
			})
			.await
	}

	fn validate(&self, fields: &MovieFields) -> Result<()> {
		let mut v = Validator::new();

		fields.validate(&mut v, self.clock.now());

		v.finish()
	}
}
impl Debug for Catalog {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Catalog")
			.field("gate", &self.gate)
			.field("deadline", &self.deadline)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_preludet::{build_test_harness, seed_user},
		auth::{ClientId, TokenScope},
		config::LimiterConfig,
		record::Runtime,
	};

	fn fields() -> MovieFields {
		MovieFields {
			title: "Moana".into(),
			year: 2016,
			runtime: Runtime(107),
			genres: vec!["animation".into(), "adventure".into()],
		}
	}

	#[tokio::test]
	async fn writers_create_and_readers_cannot() {
		let harness = build_test_harness(LimiterConfig { enabled: false, ..Default::default() });
		let catalog =
			Catalog::new(harness.gate.clone(), harness.store.clone(), harness.clock.clone());
		let writer = seed_user(&harness.store, "writer", true, &[MOVIES_READ, MOVIES_WRITE]).await;
		let reader = seed_user(&harness.store, "reader", true, &[MOVIES_READ]).await;
		let client = ClientId::new("198.51.100.1").expect("Client fixture should be valid.");
		let token = |user| {
			let tokens = harness.gate.tokens().clone();

			async move {
				tokens
					.issue(user, Duration::hours(1), TokenScope::Authentication)
					.await
					.expect("Issuing should succeed.")
			}
		};
		let writer = Inbound::bearer(client.clone(), &token(writer.id).await.plaintext);
		let reader = Inbound::bearer(client, &token(reader.id).await.plaintext);
		let movie = catalog.create_movie(&writer, fields()).await.expect("Writer may create.");

		assert_eq!(movie.version, Version::INITIAL);
		assert!(matches!(
			catalog.create_movie(&reader, fields()).await,
			Err(Error::PermissionDenied { .. })
		));
		assert_eq!(
			catalog.show_movie(&reader, movie.id).await.expect("Reader may read."),
			Some(movie.clone())
		);

		let updated = catalog
			.update_movie(&writer, movie.id, Some(movie.version), MovieUpdate {
				year: Some(2017),
				..Default::default()
			})
			.await
			.expect("Update should succeed.")
			.expect("Movie should exist.");

		assert_eq!(updated.version, Version::new(2));
		assert!(matches!(
			catalog
				.update_movie(&writer, movie.id, Some(movie.version), MovieUpdate::default())
				.await,
			Err(Error::EditConflict { .. })
		));
		assert!(catalog.delete_movie(&writer, movie.id).await.expect("Delete should succeed."));
		assert!(!catalog.delete_movie(&writer, movie.id).await.expect("Delete should succeed."));
	}

	#[tokio::test]
	async fn listing_requires_read_and_valid_filters() {
		let harness = build_test_harness(LimiterConfig { enabled: false, ..Default::default() });
		let catalog =
			Catalog::new(harness.gate.clone(), harness.store.clone(), harness.clock.clone());
		let reader = seed_user(&harness.store, "reader", true, &[MOVIES_READ]).await;
		let outsider = seed_user(&harness.store, "outsider", true, &[]).await;
		let client = ClientId::new("198.51.100.2").expect("Client fixture should be valid.");
		let bearer = |user| {
			let tokens = harness.gate.tokens().clone();
			let client = client.clone();

			async move {
				let issued = tokens
					.issue(user, Duration::hours(1), TokenScope::Authentication)
					.await
					.expect("Issuing should succeed.");

				Inbound::bearer(client, &issued.plaintext)
			}
		};
		let reader = bearer(reader.id).await;
		let outsider = bearer(outsider.id).await;

		for title in ["Moana", "Frozen", "Coco"] {
			<crate::store::MemoryStore as crate::store::RecordStore<Movie>>::insert(
				&harness.store,
				MovieFields { title: title.into(), ..fields() },
				harness.clock.now(),
			)
			.await
			.expect("Inserting a movie fixture should succeed.");
		}

		let by_title = Filters { sort: "title".into(), ..Filters::new(Movie::SORT_SAFELIST) };
		let listing = catalog
			.list_movies(&reader, MovieCriteria::default(), by_title.clone())
			.await
			.expect("Reader may list.");
		let titles = listing.records.iter().map(|movie| movie.fields.title.as_str());

		assert_eq!(titles.collect::<Vec<_>>(), ["Coco", "Frozen", "Moana"]);
		assert_eq!(listing.metadata.total_records, 3);
		assert!(matches!(
			catalog.list_movies(&outsider, MovieCriteria::default(), by_title.clone()).await,
			Err(Error::PermissionDenied { .. })
		));

		let err = catalog
			.list_movies(&reader, MovieCriteria::default(), Filters {
				page: 0,
				sort: "rating".into(),
				sort_safelist: &["rating"],
				..by_title
			})
			.await
			.expect_err("Invalid paging and unsafe sort keys must fail validation.");

		let Error::FailedValidation { errors } = &err else {
			panic!("Expected a validation failure, got {err:?}.");
		};

		assert_eq!(errors["page"], "must be greater than zero");
		assert_eq!(errors["sort"], "invalid sort value");
	}
}
