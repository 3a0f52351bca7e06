//! Resolved request principals.

// self
use crate::{
	_prelude::*,
	auth::{PasswordHash, PermissionSet, UserId},
	record::{Version, VersionedRecord},
	validate::{self, Validator},
};

/// Editable account attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFields {
	/// Display name.
	pub name: String,
	/// Unique login email.
	pub email: String,
	/// Whether the account has been activated.
	pub activated: bool,
	/// bcrypt digest of the login password; never serialized.
	#[serde(skip)]
	pub password_hash: Option<PasswordHash>,
}
impl UserFields {
	const MAX_NAME_BYTES: usize = 500;

	/// Checks the name and email against account rules.
	///
	/// # Panics
	///
	/// Panics when no password hash is set; every account is created with one.
	pub fn validate(&self, v: &mut Validator) {
		v.check(!self.name.is_empty(), "name", "must be provided");
		v.check(
			self.name.len() <= Self::MAX_NAME_BYTES,
			"name",
			"must not be more than 500 bytes long",
		);
		validate_email(v, &self.email);

		assert!(self.password_hash.is_some(), "missing password hash for user");
	}
}

/// Records email reasons under the `email` field.
pub fn validate_email(v: &mut Validator, email: &str) {
	v.check(!email.is_empty(), "email", "must be provided");
	v.check(
		validate::matches(email, &validate::EMAIL_RX),
		"email",
		"must be a valid email address",
	);
}

/// Stored user account; itself a versioned record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct User {
	/// Storage identifier.
	pub id: UserId,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Editable attributes.
	#[serde(flatten)]
	pub fields: UserFields,
	/// Optimistic-concurrency version; never shown to clients.
	#[serde(skip_serializing)]
	pub version: Version,
}
impl User {
	/// Returns `true` once the account has been activated.
	pub fn is_activated(&self) -> bool {
		self.fields.activated
	}
}
impl VersionedRecord for User {
	type Fields = UserFields;
	type Id = UserId;

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

	fn conflicting_field(&self, fields: &Self::Fields) -> Option<&'static str> {
		(self.fields.email == fields.email).then_some("email")
	}
}

/// Authenticated user plus the permission codes fetched for it, once a gate asked for them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
	/// Account the credential resolved to.
	pub user: User,
	/// Permission codes, populated by the permission gate.
	pub permissions: Option<PermissionSet>,
}
impl Principal {
	/// Wraps a freshly resolved user with no permissions fetched yet.
	pub fn new(user: User) -> Self {
		Self { user, permissions: None }
	}
}

/// Identity attached to one request; constructed per request and never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Identity {
	/// No credential was presented.
	#[default]
	Anonymous,
	/// A credential resolved to a stored user.
	User(Principal),
}
impl Identity {
	/// Returns `true` for the anonymous identity.
	pub fn is_anonymous(&self) -> bool {
		matches!(self, Self::Anonymous)
	}

	/// Anonymous callers are never activated.
	pub fn is_activated(&self) -> bool {
		matches!(self, Self::User(principal) if principal.user.is_activated())
	}

	/// Anonymous callers hold no permissions; users only once the permission gate fetched them.
	pub fn has_permission(&self, code: &str) -> bool {
		match self {
			Self::User(Principal { permissions: Some(set), .. }) => set.includes(code),
			_ => false,
		}
	}

	/// Borrows the resolved user, if any.
	pub fn user(&self) -> Option<&User> {
		match self {
			Self::User(principal) => Some(&principal.user),
			Self::Anonymous => None,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::MOVIES_WRITE;

	fn fields(name: &str, email: &str, activated: bool) -> UserFields {
		UserFields {
			name: name.into(),
			email: email.into(),
			activated,
			password_hash: Some(PasswordHash::from_digest("$2b$04$fixture")),
		}
	}

	fn user(activated: bool) -> User {
		User::create(
			UserId::new(1),
			fields("Jay", "jay@greenlight.com", activated),
			macros::datetime!(2025-01-01 00:00 UTC),
		)
	}

	#[test]
	fn anonymous_fails_every_check() {
		let identity = Identity::Anonymous;

		assert!(identity.is_anonymous());
		assert!(!identity.is_activated());
		assert!(!identity.has_permission(MOVIES_WRITE));
		assert!(identity.user().is_none());
	}

	#[test]
	fn permissions_only_count_once_fetched() {
		let mut principal = Principal::new(user(true));

		assert!(!Identity::User(principal.clone()).has_permission(MOVIES_WRITE));

		principal.permissions =
			Some(PermissionSet::new([MOVIES_WRITE]).expect("Permission fixture should be valid."));

		let identity = Identity::User(principal);

		assert!(identity.is_activated());
		assert!(identity.has_permission(MOVIES_WRITE));
	}

	#[test]
	fn user_serialization_hides_version() {
		let payload = serde_json::to_value(user(false)).expect("User should serialize to JSON.");

		assert!(payload.get("version").is_none());
		assert!(payload.get("password_hash").is_none());
		assert_eq!(payload["email"], "jay@greenlight.com");
		assert_eq!(payload["activated"], false);
	}

	#[test]
	fn email_uniqueness_is_the_only_conflict() {
		let existing = user(false);
		let mut fields = existing.fields.clone();

		assert_eq!(existing.conflicting_field(&fields), Some("email"));

		fields.email = "other@greenlight.com".into();

		assert_eq!(existing.conflicting_field(&fields), None);
	}

	#[test]
	fn account_validation() {
		let mut v = Validator::new();

		fields("", "nope", false).validate(&mut v);

		assert_eq!(v.reason("name"), Some("must be provided"));
		assert_eq!(v.reason("email"), Some("must be a valid email address"));
	}

	#[test]
	#[should_panic(expected = "missing password hash for user")]
	fn validating_an_account_without_a_password_hash_panics() {
		let mut unhashed = fields("Jay", "jay@greenlight.com", false);

		unhashed.password_hash = None;
		unhashed.validate(&mut Validator::new());
	}
}
