// self
use crate::obs::{GateOutcome, GateStage};

/// Records a stage verdict via the global metrics recorder (when enabled).
pub fn record_gate_outcome(stage: GateStage, outcome: GateOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"reelgate_gate_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (stage, outcome);
	}
}

/// Records how many idle limiter entries a sweep evicted.
pub fn record_limiter_evictions(evicted: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("reelgate_rate_limiter_evicted_total").increment(evicted as u64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = evicted;
	}
}
