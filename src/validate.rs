//! Field-keyed validation reasons collected before any storage work happens.

// std
use std::sync::LazyLock;
// crates.io
use regex::Regex;
// self
use crate::_prelude::*;

/// Email sanity pattern following the WHATWG "valid e-mail address" production.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@",
		r"[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
		r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
	))
	.expect("Email pattern should compile.")
});

/// Accumulates the first failure reason reported for each field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Validator {
	errors: BTreeMap<String, String>,
}
impl Validator {
	/// Creates an empty validator.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns `true` if no check has failed.
	pub fn is_valid(&self) -> bool {
		self.errors.is_empty()
	}

	/// Records `reason` for `field` unless the field already has one.
	pub fn add_error(&mut self, field: impl Into<String>, reason: impl Into<String>) {
		self.errors.entry(field.into()).or_insert_with(|| reason.into());
	}

	/// Records `reason` for `field` when `ok` is false.
	pub fn check(&mut self, ok: bool, field: &str, reason: &str) {
		if !ok {
			self.add_error(field, reason);
		}
	}

	/// Returns the reason recorded for `field`, if any.
	pub fn reason(&self, field: &str) -> Option<&str> {
		self.errors.get(field).map(String::as_str)
	}

	/// Borrows every recorded reason.
	pub fn errors(&self) -> &BTreeMap<String, String> {
		&self.errors
	}

	/// Converts the collected reasons into [`Error::FailedValidation`] when any check failed.
	pub fn finish(self) -> Result<()> {
		if self.errors.is_empty() {
			Ok(())
		} else {
			Err(Error::FailedValidation { errors: self.errors })
		}
	}
}

/// Returns `true` when every value in `values` is distinct.
pub fn unique<T>(values: &[T]) -> bool
where
	T: Eq + std::hash::Hash,
{
	let mut seen = std::collections::HashSet::with_capacity(values.len());

	values.iter().all(|value| seen.insert(value))
}

/// Returns `true` when `value` is one of `permitted`.
pub fn permitted<T>(value: &T, permitted: &[T]) -> bool
where
	T: PartialEq,
{
	permitted.contains(value)
}

/// Returns `true` when `value` matches `rx`.
pub fn matches(value: &str, rx: &Regex) -> bool {
	rx.is_match(value)
}
