//! Paging and sort options for list queries, and the pagination metadata returned with a page.

// self
use crate::{
	_prelude::*,
	validate::{self, Validator},
};

/// Sort direction derived from the `-` prefix of a sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
	/// Smallest value first.
	Ascending,
	/// Largest value first.
	Descending,
}

/// Page selection and sort key for a list query.
///
/// `sort` names a column, optionally prefixed with `-` for descending order. The owning query
/// supplies `sort_safelist`; only values on it are accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filters {
	/// One-based page number.
	pub page: i64,
	/// Records per page.
	pub page_size: i64,
	/// Sort key, e.g. `title` or `-year`.
	pub sort: String,
	/// Every sort key the query accepts, including the `-` forms.
	pub sort_safelist: &'static [&'static str],
}
impl Filters {
	/// Largest accepted page number.
	pub const MAX_PAGE: i64 = 10_000_000;
	/// Largest accepted page size.
	pub const MAX_PAGE_SIZE: i64 = 100;

	/// First page of 20 records sorted by `id`, restricted to `sort_safelist`.
	pub fn new(sort_safelist: &'static [&'static str]) -> Self {
		Self { page: 1, page_size: 20, sort: "id".into(), sort_safelist }
	}

	/// Checks page bounds and that the sort key is on the safelist.
	pub fn validate(&self, v: &mut Validator) {
		v.check(self.page > 0, "page", "must be greater than zero");
		v.check(self.page <= Self::MAX_PAGE, "page", "must be a maximum of 10 million");
		v.check(self.page_size > 0, "page_size", "must be greater than zero");
		v.check(self.page_size <= Self::MAX_PAGE_SIZE, "page_size", "must be a maximum of 100");
		v.check(
			validate::permitted(&self.sort.as_str(), self.sort_safelist),
			"sort",
			"invalid sort value",
		);
	}

	/// Column named by the sort key, without its direction prefix.
	///
	/// # Panics
	///
	/// Panics when the sort key is not on the safelist; callers validate first.
	pub fn sort_column(&self) -> &str {
		if !self.sort_safelist.contains(&self.sort.as_str()) {
			panic!("unsafe sort parameter: {}", self.sort);
		}

		self.sort.trim_start_matches('-')
	}

	/// Direction encoded by the sort key.
	pub fn sort_direction(&self) -> SortDirection {
		match self.sort.starts_with('-') {
			true => SortDirection::Descending,
			false => SortDirection::Ascending,
		}
	}

	/// Maximum number of records on the page.
	pub fn limit(&self) -> usize {
		usize::try_from(self.page_size).unwrap_or(0)
	}

	/// Number of records preceding the page.
	pub fn offset(&self) -> usize {
		usize::try_from(self.page.saturating_sub(1).saturating_mul(self.page_size)).unwrap_or(0)
	}
}

/// Pagination details for one page of results; all zero when nothing matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
	/// Page that was returned.
	pub current_page: i64,
	/// Records per page.
	pub page_size: i64,
	/// Always `1` when anything matched.
	pub first_page: i64,
	/// Last page that holds records.
	pub last_page: i64,
	/// Records matching the query across every page.
	pub total_records: u64,
}
impl Metadata {
	/// Derives the metadata for `page` of a result set holding `total_records`.
	pub fn calculate(total_records: u64, page: i64, page_size: i64) -> Self {
		if total_records == 0 || page_size <= 0 {
			return Self::default();
		}

		let last_page = total_records.div_ceil(page_size.unsigned_abs());

		Self {
			current_page: page,
			page_size,
			first_page: 1,
			last_page: i64::try_from(last_page).unwrap_or(i64::MAX),
			total_records,
		}
	}

	/// Returns `true` when nothing matched.
	pub fn is_empty(&self) -> bool {
		self.total_records == 0
	}
}

/// One page of records plus its pagination metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Listing<R> {
	/// Records on the requested page, in sort order.
	pub records: Vec<R>,
	/// Omitted from the serialized form when empty.
	#[serde(skip_serializing_if = "Metadata::is_empty")]
	pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SAFELIST: &[&str] = &["id", "title", "-id", "-title"];

	fn filters(page: i64, page_size: i64, sort: &str) -> Filters {
		Filters { page, page_size, sort: sort.into(), ..Filters::new(SAFELIST) }
	}

	fn reasons(filters: &Filters) -> Validator {
		let mut v = Validator::new();

		filters.validate(&mut v);

		v
	}

	#[test]
	fn paging_bounds_are_enforced() {
		assert!(reasons(&Filters::new(SAFELIST)).is_valid());
		assert!(reasons(&filters(Filters::MAX_PAGE, Filters::MAX_PAGE_SIZE, "-title")).is_valid());

		let low = reasons(&filters(0, 0, "id"));

		assert_eq!(low.reason("page"), Some("must be greater than zero"));
		assert_eq!(low.reason("page_size"), Some("must be greater than zero"));

		let high = reasons(&filters(Filters::MAX_PAGE + 1, 101, "id"));

		assert_eq!(high.reason("page"), Some("must be a maximum of 10 million"));
		assert_eq!(high.reason("page_size"), Some("must be a maximum of 100"));
	}

	#[test]
	fn sort_keys_off_the_safelist_fail_validation() {
		let v = reasons(&filters(1, 20, "year; DROP TABLE movies"));

		assert_eq!(v.reason("sort"), Some("invalid sort value"));
		assert_eq!(reasons(&filters(1, 20, "-year")).reason("sort"), Some("invalid sort value"));
	}

	#[test]
	fn sort_key_splits_into_column_and_direction() {
		let descending = filters(1, 20, "-title");

		assert_eq!(descending.sort_column(), "title");
		assert_eq!(descending.sort_direction(), SortDirection::Descending);
		assert_eq!(filters(1, 20, "id").sort_direction(), SortDirection::Ascending);
	}

	#[test]
	#[should_panic(expected = "unsafe sort parameter: rating")]
	fn unsafe_sort_column_panics() {
		filters(1, 20, "rating").sort_column();
	}

	#[test]
	fn limit_and_offset_follow_the_page() {
		let third = filters(3, 25, "id");

		assert_eq!(third.limit(), 25);
		assert_eq!(third.offset(), 50);
		assert_eq!(Filters::new(SAFELIST).offset(), 0);
	}

	#[test]
	fn metadata_rounds_the_last_page_up() {
		assert_eq!(Metadata::calculate(0, 1, 20), Metadata::default());
		assert_eq!(Metadata::calculate(41, 2, 20), Metadata {
			current_page: 2,
			page_size: 20,
			first_page: 1,
			last_page: 3,
			total_records: 41,
		});

		let empty = Listing::<u8> { records: Vec::new(), metadata: Metadata::default() };
		let payload = serde_json::to_value(&empty).expect("Listing should serialize.");

		assert!(payload.get("metadata").is_none());
	}
}
