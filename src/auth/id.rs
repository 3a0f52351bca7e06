//! Strongly typed identifiers enforced across the gate.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_numeric_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(i64);
		impl $name {
			/// Wraps a storage-assigned identifier.
			pub const fn new(value: i64) -> Self {
				Self(value)
			}

			/// Returns the raw identifier.
			pub const fn get(self) -> i64 {
				self.0
			}
		}
		impl From<i64> for $name {
			fn from(value: i64) -> Self {
				Self(value)
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}", self.0)
			}
		}
	};
}

const CLIENT_ID_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier.
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier.
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_numeric_id! { UserId, "Storage-assigned identifier of a user account.", "User" }
def_numeric_id! { RecordId, "Storage-assigned identifier of a catalog record.", "Record" }

/// Per-request client identifier fed to the rate limiter (usually an IP address).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);
impl ClientId {
	/// Creates a new identifier after validation.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let view = value.as_ref();

		validate_view("Client", view)?;

		Ok(Self(view.to_owned()))
	}
}
impl Deref for ClientId {
	type Target = str;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl AsRef<str> for ClientId {
	fn as_ref(&self) -> &str {
		&self.0
	}
}
impl From<ClientId> for String {
	fn from(value: ClientId) -> Self {
		value.0
	}
}
impl TryFrom<String> for ClientId {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		validate_view("Client", &value)?;

		Ok(Self(value))
	}
}
impl Borrow<str> for ClientId {
	fn borrow(&self) -> &str {
		&self.0
	}
}
impl Debug for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Client({})", self.0)
	}
}
impl Display for ClientId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}
impl FromStr for ClientId {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > CLIENT_ID_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: CLIENT_ID_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn client_ids_validate() {
		assert!(ClientId::new(" 10.0.0.1").is_err(), "Leading whitespace must be rejected.");
		assert!(ClientId::new("").is_err());
		assert!(ClientId::new("a".repeat(CLIENT_ID_MAX_LEN + 1)).is_err());

		let client = ClientId::new("203.0.113.7").expect("Client fixture should be valid.");

		assert_eq!(client.as_ref(), "203.0.113.7");
		assert_eq!(format!("{client:?}"), "Client(203.0.113.7)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let client: ClientId = serde_json::from_str("\"198.51.100.2\"")
			.expect("Client should deserialize successfully.");

		assert_eq!(client.as_ref(), "198.51.100.2");
		assert!(serde_json::from_str::<ClientId>("\"with space\"").is_err());

		let user: UserId = serde_json::from_str("42").expect("User id should deserialize.");

		assert_eq!(user, UserId::new(42));
		assert_eq!(format!("{user:?}"), "User(42)");
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<ClientId, u8> = HashMap::from_iter([(
			ClientId::new("192.0.2.1").expect("Client used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("192.0.2.1"), Some(&7));
	}
}
