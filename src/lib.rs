//! Request admission for catalog APIs: per-client token buckets, scoped bearer tokens,
//! permission gates, and optimistic record versioning in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod gate;
pub mod limit;
pub mod obs;
pub mod record;
pub mod store;
pub mod validate;
#[cfg(any(test, feature = "test"))]
#[doc(hidden)]
pub mod _preludet {
	//! Test-only prelude and fixtures, enabled via `cfg(test)` or the `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{PasswordHash, PermissionSet, TokenService, User, UserFields},
		clock::{Clock, ManualClock},
		config::LimiterConfig,
		gate::Gatekeeper,
		limit::RateLimiter,
		store::{MemoryStore, PermissionStore, RecordStore},
	};

	/// Wall-clock instant every test clock starts from.
	pub const TEST_EPOCH: OffsetDateTime = time::macros::datetime!(2025-11-10 12:00 UTC);
	/// Password every seeded user logs in with.
	pub const TEST_PASSWORD: &str = "pa55word";

	/// Everything an integration test needs to drive the pipeline end to end.
	#[derive(Debug)]
	pub struct TestHarness {
		/// Fully wired gatekeeper.
		pub gate: Arc<Gatekeeper>,
		/// Backing store shared by every collaborator.
		pub store: Arc<MemoryStore>,
		/// Clock shared by the limiter, token service, and store lookups.
		pub clock: Arc<ManualClock>,
	}

	/// Builds a [`ManualClock`] pinned at [`TEST_EPOCH`].
	pub fn test_clock() -> Arc<ManualClock> {
		Arc::new(ManualClock::new(TEST_EPOCH))
	}

	/// Wires a gatekeeper over a fresh [`MemoryStore`] using the provided limiter settings.
	pub fn build_test_harness(limiter: LimiterConfig) -> TestHarness {
		let clock = test_clock();
		let store = Arc::new(MemoryStore::default());
		let shared_clock: Arc<dyn Clock> = clock.clone();
		let limiter = RateLimiter::new(limiter, shared_clock.clone())
			.expect("Limiter fixture configuration should be valid.");
		let tokens = TokenService::new(store.clone(), shared_clock);
		let gate = Gatekeeper::new(Arc::new(limiter), tokens, store.clone());

		TestHarness { gate: Arc::new(gate), store, clock }
	}

	/// Inserts a user with [`TEST_PASSWORD`] and grants it the provided permission codes.
	pub async fn seed_user(
		store: &MemoryStore,
		name: &str,
		activated: bool,
		permissions: &[&str],
	) -> User {
		let password_hash = PasswordHash::new(TEST_PASSWORD, PasswordHash::MIN_COST)
			.expect("Hashing the fixture password should succeed.");
		let fields = UserFields {
			name: name.into(),
			email: format!("{name}@reelgate.test"),
			activated,
			password_hash: Some(password_hash),
		};
		let user = <MemoryStore as RecordStore<User>>::insert(store, fields, TEST_EPOCH)
			.await
			.expect("Seeding a user fixture should succeed.");

		if !permissions.is_empty() {
			let codes = PermissionSet::new(permissions.iter().copied())
				.expect("Permission fixture codes should be valid.");

			store
				.add_for_user(user.id, codes)
				.await
				.expect("Granting permission fixtures should succeed.");
		}

		user
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use color_eyre as _;
