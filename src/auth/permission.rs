//! Capability codes granted to users.

// std
use std::collections::BTreeSet;
// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Read access to the movie catalog.
pub const MOVIES_READ: &str = "movies:read";
/// Write access to the movie catalog.
pub const MOVIES_WRITE: &str = "movies:write";

/// Errors emitted when validating permission codes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PermissionCodeError {
	/// Empty codes are not allowed.
	#[error("Permission codes cannot be empty.")]
	Empty,
	/// Codes cannot contain whitespace characters.
	#[error("Permission code contains whitespace: {code}.")]
	ContainsWhitespace {
		/// The offending code.
		code: String,
	},
}

/// Normalized, deduplicated set of permission codes held by one user.
///
/// Codes are sorted so membership checks are a binary search and equality does not depend on
/// the order storage returned them in.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct PermissionSet(Arc<[String]>);
impl PermissionSet {
	/// Creates a normalized permission set from any iterator of codes.
	pub fn new<I, S>(codes: I) -> Result<Self, PermissionCodeError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut set = BTreeSet::new();

		for code in codes {
			let owned: String = code.into();

			if owned.is_empty() {
				return Err(PermissionCodeError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(PermissionCodeError::ContainsWhitespace { code: owned });
			}

			set.insert(owned);
		}

		Ok(Self(Arc::from(set.into_iter().collect::<Vec<_>>())))
	}

	/// Builds a set from compile-time codes that are known to be well formed.
	pub(crate) fn from_static(codes: &[&'static str]) -> Self {
		let mut owned = codes.iter().map(|code| (*code).to_owned()).collect::<Vec<_>>();

		owned.sort();
		owned.dedup();

		debug_assert!(
			owned.iter().all(|code| !code.is_empty() && !code.contains(char::is_whitespace))
		);

		Self(Arc::from(owned))
	}

	/// Number of distinct codes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no codes are granted.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the set grants `code`.
	pub fn includes(&self, code: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(code)).is_ok()
	}

	/// Iterator over the sorted codes.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Returns a new set containing the codes of both sets.
	pub fn union(&self, other: &Self) -> Self {
		let merged = self.iter().chain(other.iter()).map(str::to_owned).collect::<BTreeSet<_>>();

		Self(Arc::from(merged.into_iter().collect::<Vec<_>>()))
	}
}
impl Debug for PermissionSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("PermissionSet").field(&self.0).finish()
	}
}
impl Display for PermissionSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0.join(" "))
	}
}
impl Serialize for PermissionSet {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for code in self.0.iter() {
			seq.serialize_element(code)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for PermissionSet {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		PermissionSet::new(values).map_err(DeError::custom)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn codes_normalize_and_dedupe() {
		let lhs = PermissionSet::new([MOVIES_WRITE, MOVIES_READ, MOVIES_READ])
			.expect("Left-hand permission set should be valid.");
		let rhs = PermissionSet::new([MOVIES_READ, MOVIES_WRITE])
			.expect("Right-hand permission set should be valid.");

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.len(), 2);
		assert_eq!(lhs.to_string(), "movies:read movies:write");
	}

	#[test]
	fn includes_is_exact() {
		let set = PermissionSet::new([MOVIES_READ]).expect("Permission set should be valid.");

		assert!(set.includes(MOVIES_READ));
		assert!(!set.includes(MOVIES_WRITE));
		assert!(!set.includes("movies"));
		assert!(!PermissionSet::default().includes(MOVIES_READ));
	}

	#[test]
	fn invalid_codes_error() {
		assert_eq!(PermissionSet::new([""]), Err(PermissionCodeError::Empty));
		assert!(matches!(
			PermissionSet::new(["movies: write"]),
			Err(PermissionCodeError::ContainsWhitespace { .. })
		));
		assert!(serde_json::from_str::<PermissionSet>("[\"a b\"]").is_err());
	}

	#[test]
	fn union_merges_sorted() {
		let read = PermissionSet::new([MOVIES_READ]).expect("Read set should be valid.");
		let write = PermissionSet::new([MOVIES_WRITE]).expect("Write set should be valid.");

		assert_eq!(read.union(&write).iter().collect::<Vec<_>>(), vec![MOVIES_READ, MOVIES_WRITE]);
	}
}
