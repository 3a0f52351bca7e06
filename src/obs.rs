//! Optional observability helpers for the admission pipeline.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `reelgate.gate` with the `stage` field, plus
//!   events for denials, internal failures, and limiter sweeps.
//! - Enable `metrics` to increment the `reelgate_gate_total` counter for every stage verdict,
//!   labeled by `stage` + `outcome`, and `reelgate_rate_limiter_evicted_total` per sweep.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline stages observed by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateStage {
	/// Per-client token bucket.
	RateLimit,
	/// Bearer credential resolution.
	Authenticate,
	/// Anonymous rejection.
	RequireAuthenticated,
	/// Activation check.
	RequireActivated,
	/// Permission lookup and check.
	RequirePermission,
	/// The protected operation itself.
	Handler,
}
impl GateStage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateStage::RateLimit => "rate_limit",
			GateStage::Authenticate => "authenticate",
			GateStage::RequireAuthenticated => "require_authenticated",
			GateStage::RequireActivated => "require_activated",
			GateStage::RequirePermission => "require_permission",
			GateStage::Handler => "handler",
		}
	}
}
impl Display for GateStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Verdict labels recorded per stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateOutcome {
	/// The request moved on to the next stage.
	Pass,
	/// The stage rejected the request on policy grounds.
	Deny,
	/// A collaborator failed while the stage ran.
	Failure,
}
impl GateOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			GateOutcome::Pass => "pass",
			GateOutcome::Deny => "deny",
			GateOutcome::Failure => "failure",
		}
	}

	/// Classifies a stage result; internal failures are separated from policy denials.
	pub fn of<T>(result: &Result<T>) -> Self {
		match result {
			Ok(_) => GateOutcome::Pass,
			Err(e) if e.kind() == crate::error::ErrorKind::InternalFailure => GateOutcome::Failure,
			Err(_) => GateOutcome::Deny,
		}
	}
}
impl Display for GateOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
