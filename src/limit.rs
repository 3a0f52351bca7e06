//! Per-client token buckets with a background sweep of idle entries.
//!
//! Each client gets a bucket holding up to `burst` tokens that refills continuously at `rps`
//! tokens per second. A request debits one token when at least one is available. Buckets are
//! created lazily (full) on a client's first request and evicted by [`RateLimiter::sweep`] once
//! the client has been idle for [`LimiterConfig::IDLE_INTERVALS`] sweep intervals.

// crates.io
use tokio::{
	runtime::Handle,
	task::JoinHandle,
	time::{self, Instant},
};
// self
use crate::{
	_prelude::*,
	auth::ClientId,
	clock::Clock,
	config::LimiterConfig,
	error::ConfigError,
	obs,
};

/// Point-in-time view of one client's bucket.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientBudget {
	/// Tokens left after the most recent request, before any refill since then.
	pub allowance: f64,
	/// Instant of the client's most recent request.
	pub last_seen: OffsetDateTime,
}

#[derive(Debug)]
struct Bucket {
	allowance: f64,
	last_refill: OffsetDateTime,
	last_seen: OffsetDateTime,
}
impl Bucket {
	fn full(burst: f64, now: OffsetDateTime) -> Self {
		Self { allowance: burst, last_refill: now, last_seen: now }
	}

	fn try_take(&mut self, rps: f64, burst: f64, now: OffsetDateTime) -> bool {
		// A clock that stepped backwards refills nothing.
		if now > self.last_refill {
			let elapsed = (now - self.last_refill).as_seconds_f64();

			self.allowance = (self.allowance + elapsed * rps).min(burst);
			self.last_refill = now;
		}

		self.last_seen = now;

		if self.allowance >= 1.0 {
			self.allowance -= 1.0;

			true
		} else {
			false
		}
	}
}

/// Registry of per-client buckets, shared by every request.
///
/// All mutation happens under one lock, so concurrent requests from the same client are
/// serialized and can never overdraw the bucket.
#[derive(Debug)]
pub struct RateLimiter {
	config: LimiterConfig,
	clock: Arc<dyn Clock>,
	clients: Mutex<HashMap<ClientId, Bucket>>,
}
impl RateLimiter {
	/// Builds an empty registry after validating `config`.
	pub fn new(config: LimiterConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self { config, clock, clients: Mutex::new(HashMap::new()) })
	}

	/// Settings this registry was built with.
	pub fn config(&self) -> &LimiterConfig {
		&self.config
	}

	/// Refills the client's bucket for the elapsed time, then tries to debit one token.
	///
	/// Always admits, without touching any state, while limiting is disabled.
	pub fn allow(&self, client: &ClientId) -> bool {
		if !self.config.enabled {
			return true;
		}

		let now = self.clock.now();
		let burst = f64::from(self.config.burst);
		let mut clients = self.clients.lock();

		if let Some(bucket) = clients.get_mut(client) {
			return bucket.try_take(self.config.rps, burst, now);
		}

		let mut bucket = Bucket::full(burst, now);
		let allowed = bucket.try_take(self.config.rps, burst, now);

		clients.insert(client.clone(), bucket);

		allowed
	}

	/// Evicts every client idle for longer than the configured threshold and returns how many
	/// were removed.
	pub fn sweep(&self) -> usize {
		let now = self.clock.now();
		let threshold = self.config.idle_threshold();
		let mut clients = self.clients.lock();
		let before = clients.len();

		clients.retain(|_, bucket| now - bucket.last_seen <= threshold);

		let evicted = before - clients.len();
		let remaining = clients.len();

		drop(clients);
		obs::record_limiter_evictions(evicted);
		obs::log_sweep(evicted, remaining);

		evicted
	}

	/// Number of tracked clients.
	pub fn len(&self) -> usize {
		self.clients.lock().len()
	}

	/// Returns `true` when no client is tracked.
	pub fn is_empty(&self) -> bool {
		self.clients.lock().is_empty()
	}

	/// Snapshot of one client's bucket, if tracked.
	pub fn budget(&self, client: &ClientId) -> Option<ClientBudget> {
		self.clients
			.lock()
			.get(client)
			.map(|bucket| ClientBudget { allowance: bucket.allowance, last_seen: bucket.last_seen })
	}

	/// Spawns the periodic sweep on the current Tokio runtime.
	///
	/// The task only holds a weak reference and exits once the registry is dropped. The first
	/// sweep runs one full interval after start.
	pub fn start_sweeper(self: &Arc<Self>) -> Result<SweepHandle, ConfigError> {
		let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
		let registry = Arc::downgrade(self);
		let period = self.config.sweep_interval();
		let task = runtime.spawn(async move {
			let mut ticker = time::interval_at(Instant::now() + period, period);

			loop {
				ticker.tick().await;

				let Some(limiter) = registry.upgrade() else { break };

				limiter.sweep();
			}
		});

		Ok(SweepHandle { task })
	}
}

/// Owns the background sweep task; stopping or dropping it cancels the task.
#[derive(Debug)]
pub struct SweepHandle {
	task: JoinHandle<()>,
}
impl SweepHandle {
	/// Cancels the sweep task.
	pub fn stop(self) {
		self.task.abort();
	}

	/// Returns `true` once the task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}
impl Drop for SweepHandle {
	fn drop(&mut self) {
		self.task.abort();
	}
}
