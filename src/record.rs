//! Version-stamped records and the conditional update protocol applied to every mutation.
//!
//! An update carries the version its author last read. The store applies the new fields and
//! bumps the version by one only if the stored version still equals that value, as a single
//! compare-and-set. A miss is reported as [`Error::EditConflict`] whether the record went stale
//! or was deleted; the caller re-fetches and resubmits, the server never retries on its behalf.

pub mod filter;

pub use filter::*;

// std
use std::cmp::Ordering;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
// self
use crate::{
	_prelude::*,
	auth::RecordId,
	store::{self, RecordStore},
	validate::{self, Validator},
};

/// Monotonic record version; starts at [`Version::INITIAL`] and grows by one per update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u32);
impl Version {
	/// Version stamped on freshly created records.
	pub const INITIAL: Self = Self(1);

	/// Wraps a raw version number read back from storage or a client.
	pub const fn new(value: u32) -> Self {
		Self(value)
	}

	/// Returns the raw version number.
	pub const fn get(self) -> u32 {
		self.0
	}

	/// Version a successful update produces, or `None` once the counter is exhausted.
	pub const fn next(self) -> Option<Self> {
		match self.0.checked_add(1) {
			Some(value) => Some(Self(value)),
			None => None,
		}
	}
}
impl Display for Version {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}", self.0)
	}
}

/// Mutable entity guarded by optimistic concurrency.
pub trait VersionedRecord
where
	Self: 'static + Clone + Debug + Send + Sync,
{
	/// Identifier type assigned by storage.
	type Id: 'static + Copy + Ord + Debug + Display + From<i64> + Send + Sync;
	/// Editable field values.
	type Fields: 'static + Clone + Debug + Send + Sync;

	/// Materializes a new record at [`Version::INITIAL`].
	fn create(id: Self::Id, fields: Self::Fields, created_at: OffsetDateTime) -> Self;

	/// Storage identifier.
	fn id(&self) -> Self::Id;

	/// Version currently carried by this copy.
	fn version(&self) -> Version;

	/// Overwrites the editable fields and version after a successful conditional write.
	fn apply(&mut self, fields: Self::Fields, version: Version);

	/// Names the unique field `fields` would duplicate if written next to `self`.
	fn conflicting_field(&self, _fields: &Self::Fields) -> Option<&'static str> {
		None
	}
}

/// Submits a conditional write and returns the new version.
///
/// `None` from the store (no row matched id + version) becomes [`Error::EditConflict`]. A
/// record whose version cannot advance fails with [`Error::VersionExhausted`] before the store
/// is called.
pub async fn commit_update<R, S>(
	store: &S,
	deadline: StdDuration,
	id: R::Id,
	expected: Version,
	fields: R::Fields,
) -> Result<Version>
where
	R: VersionedRecord,
	S: ?Sized + RecordStore<R>,
{
	let next = expected.next().ok_or(Error::VersionExhausted { current: expected })?;

	match store::within(deadline, store.conditional_update(id, expected, fields)).await? {
		Some(version) => {
			debug_assert_eq!(version, next);

			Ok(version)
		},
		None => Err(Error::EditConflict { expected }),
	}
}

/// Commits `fields` against the version `record` carries and updates `record` in place.
pub async fn apply_update<R, S>(
	store: &S,
	deadline: StdDuration,
	record: &mut R,
	fields: R::Fields,
) -> Result<Version>
where
	R: VersionedRecord,
	S: ?Sized + RecordStore<R>,
{
	let version =
		commit_update::<R, S>(store, deadline, record.id(), record.version(), fields.clone())
			.await?;

	record.apply(fields, version);

	Ok(version)
}

/// Error returned when a runtime string is not `"<minutes> mins"`.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Runtime must be formatted as \"<minutes> mins\".")]
pub struct RuntimeFormatError;

/// Movie length in minutes, serialized as `"<n> mins"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Runtime(pub i32);
impl Display for Runtime {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{} mins", self.0)
	}
}
impl FromStr for Runtime {
	type Err = RuntimeFormatError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.split(' ');
		let (Some(value), Some("mins"), None) = (parts.next(), parts.next(), parts.next()) else {
			return Err(RuntimeFormatError);
		};

		value.parse().map(Self).map_err(|_| RuntimeFormatError)
	}
}
impl Serialize for Runtime {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}
impl<'de> Deserialize<'de> for Runtime {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = <String>::deserialize(deserializer)?;

		raw.parse().map_err(DeError::custom)
	}
}

/// Editable movie attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieFields {
	/// Display title.
	pub title: String,
	/// Release year.
	pub year: i32,
	/// Length in minutes.
	pub runtime: Runtime,
	/// Genre labels, unique, one to five entries.
	pub genres: Vec<String>,
}
impl MovieFields {
	const MAX_GENRES: usize = 5;
	const MAX_TITLE_BYTES: usize = 500;
	const MIN_YEAR: i32 = 1894;

	/// Checks the fields against catalog rules; `now` bounds the release year.
	pub fn validate(&self, v: &mut Validator, now: OffsetDateTime) {
		v.check(!self.title.is_empty(), "title", "must be provided");
		v.check(
			self.title.len() <= Self::MAX_TITLE_BYTES,
			"title",
			"must not be more than 500 bytes long",
		);
		v.check(self.year != 0, "year", "must be provided");
		v.check(self.year > Self::MIN_YEAR, "year", "must be greater than 1894");
		v.check(self.year <= now.year(), "year", "must not be in the future");
		v.check(self.runtime.0 != 0, "runtime", "must be provided");
		v.check(self.runtime.0 > 0, "runtime", "must be a positive integer");
		v.check(!self.genres.is_empty(), "genres", "must contain at least 1 genre");
		v.check(
			self.genres.len() <= Self::MAX_GENRES,
			"genres",
			"must not contain more than 5 genres",
		);
		v.check(validate::unique(&self.genres), "genres", "must not contain duplicate values");
	}
}

/// Partial movie edit; absent fields keep their stored value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieUpdate {
	/// Replacement title.
	pub title: Option<String>,
	/// Replacement release year.
	pub year: Option<i32>,
	/// Replacement runtime.
	pub runtime: Option<Runtime>,
	/// Replacement genre list.
	pub genres: Option<Vec<String>>,
}
impl MovieUpdate {
	/// Overlays this edit onto `current`.
	pub fn apply_to(&self, current: &MovieFields) -> MovieFields {
		MovieFields {
			title: self.title.clone().unwrap_or_else(|| current.title.clone()),
			year: self.year.unwrap_or(current.year),
			runtime: self.runtime.unwrap_or(current.runtime),
			genres: self.genres.clone().unwrap_or_else(|| current.genres.clone()),
		}
	}
}

/// Criteria narrowing a movie listing; empty criteria match every movie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieCriteria {
	/// Words that must all appear in the title, compared case-insensitively.
	pub title: String,
	/// Genres the movie must carry, all of them.
	pub genres: Vec<String>,
}
impl MovieCriteria {
	/// Returns `true` when `movie` satisfies every criterion.
	pub fn matches(&self, movie: &Movie) -> bool {
		let title = movie.fields.title.to_lowercase();
		let words = title.split_whitespace().collect::<Vec<_>>();

		self.title.to_lowercase().split_whitespace().all(|wanted| words.contains(&wanted))
			&& self.genres.iter().all(|genre| movie.fields.genres.contains(genre))
	}
}

/// Catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
	/// Storage identifier.
	pub id: RecordId,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Editable attributes.
	#[serde(flatten)]
	pub fields: MovieFields,
	/// Optimistic-concurrency version.
	pub version: Version,
}
impl Movie {
	/// Sort keys a movie listing accepts.
	pub const SORT_SAFELIST: &'static [&'static str] =
		&["id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime"];

	/// Ascending order on `column`; unknown columns fall back to the identifier.
	pub fn compare_on(&self, other: &Self, column: &str) -> Ordering {
		match column {
			"title" => self.fields.title.cmp(&other.fields.title),
			"year" => self.fields.year.cmp(&other.fields.year),
			"runtime" => self.fields.runtime.cmp(&other.fields.runtime),
			_ => self.id.cmp(&other.id),
		}
	}
}
impl VersionedRecord for Movie {
	type Fields = MovieFields;
	type Id = RecordId;

	fn create(id: Self::Id, fields: Self::Fields, created_at: OffsetDateTime) -> Self {
		Self { id, created_at, fields, version: Version::INITIAL }
	}

	fn id(&self) -> Self::Id {
		self.id
	}

	fn version(&self) -> Version {
		self.version
	}

	fn apply(&mut self, fields: Self::Fields, version: Version) {
		self.fields = fields;
		self.version = version;
	}
}
