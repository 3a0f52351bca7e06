//! Account lifecycle flows: registration, activation, password login, and email changes.
//!
//! These flows are the token service's main callers. Registration issues an activation token,
//! activation spends it, login trades an email and password for an authentication token, and
//! credential changes revoke outstanding authentication tokens.

// self
use crate::{
	_prelude::*,
	auth::{
		IssuedToken, MOVIES_READ, PasswordHash, PermissionSet, TokenPlaintext, TokenScope,
		TokenService, User, UserFields, UserId, identity, password,
	},
	config::TokenConfig,
	record::{self, Version},
	store::{self, PermissionStore, StoreError, UserStore},
	validate::Validator,
};

/// Outcome of a successful registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Registration {
	/// Stored, not yet activated account.
	pub user: User,
	/// Activation token to deliver out of band.
	#[serde(skip)]
	pub activation: IssuedToken,
}

/// Account flows over a user store, its permission grants, and the token service.
#[derive(Clone)]
pub struct Accounts {
	users: Arc<dyn UserStore>,
	permissions: Arc<dyn PermissionStore>,
	tokens: TokenService,
	lifetimes: TokenConfig,
	deadline: StdDuration,
	password_cost: u32,
}
impl Accounts {
	/// Builds the flows over one store that holds users and permissions.
	pub fn new<S>(store: Arc<S>, tokens: TokenService, lifetimes: TokenConfig) -> Self
	where
		S: 'static + UserStore + PermissionStore,
	{
		Self {
			users: store.clone(),
			permissions: store,
			tokens,
			lifetimes,
			deadline: store::DEFAULT_DEADLINE,
			password_cost: PasswordHash::DEFAULT_COST,
		}
	}

	/// Overrides the deadline applied to each storage call.
	pub fn with_storage_deadline(mut self, deadline: StdDuration) -> Self {
		self.deadline = deadline;

		self
	}

	/// Overrides the bcrypt work factor used for new password hashes.
	pub fn with_password_cost(mut self, cost: u32) -> Self {
		self.password_cost = cost;

		self
	}

	/// Creates an inactive account, grants `movies:read`, and issues an activation token.
	///
	/// The password is checked and hashed before the account is validated; only its bcrypt
	/// digest is stored.
	pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<Registration> {
		let mut v = Validator::new();

		password::validate_password_plaintext(&mut v, password);

		let fields = UserFields {
			name: name.to_owned(),
			email: email.to_owned(),
			activated: false,
			password_hash: Some(self.hash_password(password).await?),
		};

		fields.validate(&mut v);
		v.finish()?;

		let now = self.tokens.clock().now();
		let user = store::within(self.deadline, self.users.insert(fields, now))
			.await
			.map_err(duplicate_email)?;
		let read = PermissionSet::from_static(&[MOVIES_READ]);

		store::within(self.deadline, self.permissions.add_for_user(user.id, read)).await?;

		let activation = self
			.tokens
			.issue(user.id, self.lifetimes.activation_ttl(), TokenScope::Activation)
			.await?;

		#[cfg(feature = "tracing")]
		tracing::info!(user = %user.id, "registered account");

		Ok(Registration { user, activation })
	}

	/// Spends an activation token: marks the account activated and revokes every activation
	/// token the user holds.
	pub async fn activate(&self, plaintext: &str) -> Result<User> {
		TokenService::validate_plaintext(plaintext).finish()?;

		let mut user = self
			.tokens
			.resolve_user(&TokenPlaintext::new(plaintext), TokenScope::Activation)
			.await
			.map_err(|e| match e {
				Error::InvalidCredentialFormat { .. } =>
					Error::invalid_field("token", "invalid or expired activation token"),
				e => e,
			})?;
		let fields = UserFields { activated: true, ..user.fields.clone() };

		record::apply_update(self.users.as_ref(), self.deadline, &mut user, fields).await?;
		self.tokens.revoke_all(user.id, TokenScope::Activation).await?;

		Ok(user)
	}

	/// Trades an email and password for a fresh authentication token, superseding earlier ones.
	///
	/// An unknown email and a wrong password both fail with [`Error::InvalidCredentials`].
	pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken> {
		let mut v = Validator::new();

		identity::validate_email(&mut v, email);
		password::validate_password_plaintext(&mut v, password);
		v.finish()?;

		let Some(user) = store::within(self.deadline, self.users.find_by_email(email)).await?
		else {
			return Err(Error::InvalidCredentials);
		};
		let hash = user.fields.password_hash.clone().ok_or_else(|| Error::PasswordHash {
			message: format!("user {} has no stored password hash", user.id),
		})?;

		if !Self::verify_password(hash, password).await? {
			#[cfg(feature = "tracing")]
			tracing::debug!(user = %user.id, "password mismatch");

			return Err(Error::InvalidCredentials);
		}

		self.tokens
			.reissue(user.id, self.lifetimes.authentication_ttl(), TokenScope::Authentication)
			.await
	}

	/// Replaces the account email under optimistic concurrency, then revokes the user's
	/// authentication tokens.
	pub async fn change_email(&self, user: UserId, expected: Version, email: &str) -> Result<User> {
		let mut v = Validator::new();

		identity::validate_email(&mut v, email);
		v.finish()?;

		let Some(mut current) = store::within(self.deadline, self.users.fetch(user)).await? else {
			return Err(Error::EditConflict { expected });
		};

		if current.version != expected {
			return Err(Error::EditConflict { expected });
		}

		let fields = UserFields { email: email.to_owned(), ..current.fields.clone() };

		record::apply_update(self.users.as_ref(), self.deadline, &mut current, fields)
			.await
			.map_err(|e| match e {
				Error::Storage(store_error) => duplicate_email(store_error),
				e => e,
			})?;
		self.tokens.revoke_all(current.id, TokenScope::Authentication).await?;

		Ok(current)
	}

	async fn hash_password(&self, password: &str) -> Result<PasswordHash> {
		let (plaintext, cost) = (password.to_owned(), self.password_cost);

		tokio::task::spawn_blocking(move || PasswordHash::new(&plaintext, cost))
			.await
			.map_err(|e| Error::PasswordHash { message: e.to_string() })?
	}

	async fn verify_password(hash: PasswordHash, password: &str) -> Result<bool> {
		let plaintext = password.to_owned();

		tokio::task::spawn_blocking(move || hash.matches(&plaintext))
			.await
			.map_err(|e| Error::PasswordHash { message: e.to_string() })?
	}
}
impl Debug for Accounts {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Accounts")
			.field("tokens", &self.tokens)
			.field("lifetimes", &self.lifetimes)
			.field("deadline", &self.deadline)
			.field("password_cost", &self.password_cost)
			.finish_non_exhaustive()
	}
}

fn duplicate_email(e: StoreError) -> Error {
	match e {
		StoreError::Duplicate { field } if field == "email" =>
			Error::invalid_field("email", "a user with this email address already exists"),
		e => Error::Storage(e),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::test_clock, store::MemoryStore};

	const PASSWORD: &str = "pa55word";

	fn accounts() -> (Accounts, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let tokens = TokenService::new(store.clone(), test_clock());
		let accounts = Accounts::new(store.clone(), tokens, TokenConfig::default())
			.with_password_cost(PasswordHash::MIN_COST);

		(accounts, store)
	}

	#[tokio::test]
	async fn registration_rejects_bad_input_and_duplicates() {
		let (accounts, _) = accounts();
		let err =
			accounts.register("", "nope", "short").await.expect_err("Invalid input must fail.");

		assert!(matches!(&err, Error::FailedValidation { errors } if errors.len() == 3));
		assert_eq!(err.rejection().body["error"]["password"], "must be at least 8 bytes long");

		let err = accounts
			.register("ada", "ada@example.com", &"p".repeat(73))
			.await
			.expect_err("Overlong passwords must fail.");

		assert_eq!(
			err.rejection().body["error"]["password"],
			"must not be more than 72 bytes long"
		);

		let registration = accounts
			.register("ada", "ada@example.com", PASSWORD)
			.await
			.expect("First registration succeeds.");
		let hash = registration.user.fields.password_hash.expect("Accounts store a hash.");

		assert_ne!(hash.digest(), PASSWORD);
		assert!(hash.matches(PASSWORD).expect("Verification should run."));

		let err = accounts
			.register("ada2", "ada@example.com", PASSWORD)
			.await
			.expect_err("Duplicate email must fail.");

		assert_eq!(
			err.rejection().body["error"]["email"],
			"a user with this email address already exists"
		);
	}

	#[tokio::test]
	async fn activation_is_single_use() {
		let (accounts, store) = accounts();
		let registration = accounts
			.register("ada", "ada@example.com", PASSWORD)
			.await
			.expect("Registration succeeds.");
		let plaintext = registration.activation.plaintext.expose().to_owned();
		let user = accounts.activate(&plaintext).await.expect("Activation succeeds.");

		assert!(user.is_activated());
		assert_eq!(user.version, Version::new(2));
		assert!(store.tokens_for(user.id).is_empty());

		let err = accounts.activate(&plaintext).await.expect_err("A spent token must fail.");

		assert_eq!(
			err.rejection().body["error"]["token"],
			"invalid or expired activation token"
		);
	}

	#[tokio::test]
	async fn malformed_activation_tokens_fail_validation() {
		let (accounts, _) = accounts();
		let err = accounts.activate("short").await.expect_err("Short tokens must fail.");

		assert!(matches!(
			&err,
			Error::FailedValidation { errors } if errors["token"] == "must be 26 bytes long"
		));
	}

	#[tokio::test]
	async fn email_change_revokes_authentication_tokens() {
		let (accounts, store) = accounts();
		let registration = accounts
			.register("ada", "ada@example.com", PASSWORD)
			.await
			.expect("Registration succeeds.");
		let user = accounts
			.activate(registration.activation.plaintext.expose())
			.await
			.expect("Activation succeeds.");

		accounts.login("ada@example.com", PASSWORD).await.expect("Login succeeds.");

		let err = accounts
			.change_email(user.id, Version::INITIAL, "new@example.com")
			.await
			.expect_err("A stale version must conflict.");

		assert!(matches!(err, Error::EditConflict { .. }));
		assert_eq!(store.tokens_for(user.id).len(), 1);

		let updated = accounts
			.change_email(user.id, user.version, "new@example.com")
			.await
			.expect("Current version succeeds.");

		assert_eq!(updated.fields.email, "new@example.com");
		assert_eq!(Some(updated.version), user.version.next());
		assert!(store.tokens_for(user.id).is_empty());
	}

	#[tokio::test]
	async fn login_checks_the_password() {
		let (accounts, store) = accounts();
		let registration = accounts
			.register("ada", "ada@example.com", PASSWORD)
			.await
			.expect("Registration succeeds.");
		let user = registration.user;
		let err = accounts
			.login("ada@example.com", "pa55w0rd")
			.await
			.expect_err("A wrong password must fail.");

		assert!(matches!(err, Error::InvalidCredentials));
		assert_eq!(err.rejection().body["error"], "invalid authentication credentials");

		let err = accounts
			.login("nobody@example.com", PASSWORD)
			.await
			.expect_err("An unknown email must fail.");

		assert!(matches!(err, Error::InvalidCredentials));

		let err = accounts.login("ada@example.com", "").await.expect_err("Empty passwords fail.");

		assert_eq!(err.rejection().body["error"]["password"], "must be provided");

		let issued = accounts.login("ada@example.com", PASSWORD).await.expect("Login succeeds.");

		assert_eq!(issued.scope, TokenScope::Authentication);
		assert_eq!(
			store
				.tokens_for(user.id)
				.iter()
				.filter(|record| record.scope == TokenScope::Authentication)
				.count(),
			1
		);
	}
}
