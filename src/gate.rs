//! Authorization pipeline run in front of every protected operation.
//!
//! Stages run in a fixed order and the first failure short-circuits:
//!
//! 1. rate limit on the client key
//! 2. bearer credential resolution into an [`Identity`]
//! 3. the operation's [`Requirement`]: authenticated, then activated, then permission
//!
//! The resolved identity is handed to the operation explicitly; nothing is stashed in ambient
//! request state.

pub mod client;

// self
use crate::{
	_prelude::*,
	auth::{
		ClientId, Identity, PermissionSet, Principal, TokenPlaintext, TokenScope, TokenService,
		UserId,
	},
	clock::Clock,
	config::GateConfig,
	error::{ConfigError, CredentialRejection},
	limit::RateLimiter,
	obs::{self, GateOutcome, GateSpan, GateStage},
	store::{self, PermissionStore, TokenStore},
};

/// Transport-agnostic view of an incoming request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inbound {
	/// Rate-limit key, usually the caller's address.
	pub client: ClientId,
	/// Raw `Authorization` value, if the caller sent one.
	pub authorization: Option<String>,
}
impl Inbound {
	/// Builds a request view without credentials.
	pub fn anonymous(client: ClientId) -> Self {
		Self { client, authorization: None }
	}

	/// Builds a request view carrying `Bearer <plaintext>`.
	pub fn bearer(client: ClientId, plaintext: &TokenPlaintext) -> Self {
		Self { client, authorization: Some(format!("Bearer {}", plaintext.expose())) }
	}
}

/// Access level an operation declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Requirement {
	/// Anyone, including anonymous callers.
	Public,
	/// Any authenticated user.
	Authenticated,
	/// An authenticated user whose account is activated.
	Activated,
	/// An activated user holding the permission code.
	Permission(&'static str),
}

/// Runs the rate limiter, authenticator, and authorization gates.
#[derive(Clone)]
pub struct Gatekeeper {
	limiter: Arc<RateLimiter>,
	tokens: TokenService,
	permissions: Arc<dyn PermissionStore>,
	deadline: StdDuration,
}
impl Gatekeeper {
	/// Wires the pipeline from its collaborators, bounding storage calls by
	/// [`store::DEFAULT_DEADLINE`].
	pub fn new(
		limiter: Arc<RateLimiter>,
		tokens: TokenService,
		permissions: Arc<dyn PermissionStore>,
	) -> Self {
		Self { limiter, tokens, permissions, deadline: store::DEFAULT_DEADLINE }
	}

	/// Builds the limiter and token service from `config` over one store.
	pub fn from_config<S>(
		config: &GateConfig,
		store: Arc<S>,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ConfigError>
	where
		S: 'static + TokenStore + PermissionStore,
	{
		config.validate()?;

		let deadline = config.storage_deadline();
		let limiter = RateLimiter::new(config.limiter.clone(), clock.clone())?;
		let tokens = TokenService::new(store.clone(), clock).with_storage_deadline(deadline);

		Ok(Self { limiter: Arc::new(limiter), tokens, permissions: store, deadline })
	}

	/// Overrides the deadline applied to the permission lookup.
	pub fn with_storage_deadline(mut self, deadline: StdDuration) -> Self {
		self.deadline = deadline;

		self
	}

	/// Shared limiter registry, e.g. for starting its sweeper.
	pub fn limiter(&self) -> &Arc<RateLimiter> {
		&self.limiter
	}

	/// Token service used to resolve credentials.
	pub fn tokens(&self) -> &TokenService {
		&self.tokens
	}

	/// Debits the client's bucket.
	pub fn admit(&self, client: &ClientId) -> Result<()> {
		if self.limiter.allow(client) {
			Ok(())
		} else {
			Err(Error::RateLimited { client: client.clone() })
		}
	}

	/// Resolves the authorization value into an identity.
	///
	/// A missing or empty value is anonymous. Anything else must be exactly `Bearer <token>`
	/// with a well-formed, live authentication-scope token.
	pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity> {
		let Some(header) = authorization.filter(|value| !value.is_empty()) else {
			return Ok(Identity::Anonymous);
		};
		let plaintext = parse_bearer(header)?;

		if !TokenService::validate_plaintext(plaintext).is_valid() {
			return Err(Error::InvalidCredentialFormat {
				rejection: CredentialRejection::MalformedToken,
			});
		}

		let user = self
			.tokens
			.resolve_user(&TokenPlaintext::new(plaintext), TokenScope::Authentication)
			.await?;

		Ok(Identity::User(Principal::new(user)))
	}

	/// Rejects anonymous identities.
	pub fn require_authenticated(identity: &Identity) -> Result<&Principal> {
		match identity {
			Identity::User(principal) => Ok(principal),
			Identity::Anonymous => Err(Error::AuthenticationRequired),
		}
	}

	/// Rejects anonymous identities, then users that have not activated their account.
	pub fn require_activated(identity: &Identity) -> Result<&Principal> {
		let principal = Self::require_authenticated(identity)?;

		if principal.user.is_activated() {
			Ok(principal)
		} else {
			Err(Error::AccountInactive { user: principal.user.id })
		}
	}

	/// Checks activation, fetches the user's permissions, and requires `code` among them.
	///
	/// Returns the identity carrying the fetched [`PermissionSet`].
	pub async fn require_permission(&self, identity: Identity, code: &str) -> Result<Identity> {
		let user = Self::require_activated(&identity)?.user.clone();
		let granted = self.fetch_permissions(user.id).await?;

		if !granted.includes(code) {
			return Err(Error::PermissionDenied { user: user.id, permission: code.to_owned() });
		}

		Ok(Identity::User(Principal { user, permissions: Some(granted) }))
	}

	/// Runs every stage for `requirement` and returns the admitted identity.
	pub async fn check(&self, inbound: &Inbound, requirement: Requirement) -> Result<Identity> {
		let client = &inbound.client;

		{
			let _guard = GateSpan::new(GateStage::RateLimit).entered();

			observe(GateStage::RateLimit, client, self.admit(client))?;
		}

		let span = GateSpan::new(GateStage::Authenticate);
		let identity = observe(
			GateStage::Authenticate,
			client,
			span.instrument(self.authenticate(inbound.authorization.as_deref())).await,
		)?;

		match requirement {
			Requirement::Public => Ok(identity),
			Requirement::Authenticated => {
				let _guard = GateSpan::new(GateStage::RequireAuthenticated).entered();

				observe(
					GateStage::RequireAuthenticated,
					client,
					Self::require_authenticated(&identity).map(|_| ()),
				)?;

				Ok(identity)
			},
			Requirement::Activated => {
				let _guard = GateSpan::new(GateStage::RequireActivated).entered();

				observe(
					GateStage::RequireActivated,
					client,
					Self::require_activated(&identity).map(|_| ()),
				)?;

				Ok(identity)
			},
			Requirement::Permission(code) => {
				let span = GateSpan::new(GateStage::RequirePermission);

				observe(
					GateStage::RequirePermission,
					client,
					span.instrument(self.require_permission(identity, code)).await,
				)
			},
		}
	}

	/// Admits the request and runs `handler` with the resolved identity.
	///
	/// The handler never runs when a stage rejects the request.
	pub async fn run<F, Fut, T>(
		&self,
		inbound: &Inbound,
		requirement: Requirement,
		handler: F,
	) -> Result<T>
	where
		F: FnOnce(Identity) -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let identity = self.check(inbound, requirement).await?;
		let span = GateSpan::new(GateStage::Handler);

		observe(GateStage::Handler, &inbound.client, span.instrument(handler(identity)).await)
	}

	async fn fetch_permissions(&self, user: UserId) -> Result<PermissionSet> {
		Ok(store::within(self.deadline, self.permissions.get_all_for_user(user)).await?)
	}
}
impl Debug for Gatekeeper {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gatekeeper")
			.field("limiter", &self.limiter)
			.field("tokens", &self.tokens)
			.field("deadline", &self.deadline)
			.finish_non_exhaustive()
	}
}

/// Splits `Bearer <token>` on a single space; any other shape is malformed.
fn parse_bearer(header: &str) -> Result<&str> {
	let mut parts = header.split(' ');

	match (parts.next(), parts.next(), parts.next()) {
		(Some("Bearer"), Some(token), None) => Ok(token),
		_ => Err(Error::InvalidCredentialFormat {
			rejection: CredentialRejection::MalformedHeader,
		}),
	}
}

fn observe<T>(stage: GateStage, client: &ClientId, result: Result<T>) -> Result<T> {
	obs::record_gate_outcome(stage, GateOutcome::of(&result));

	if let Err(e) = &result {
		obs::log_rejection(stage, client, e);
	}

	result
}
