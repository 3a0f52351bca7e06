// self
use crate::{_prelude::*, auth::ClientId, obs::GateStage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// A span builder used by pipeline stages.
#[derive(Clone, Debug)]
pub struct GateSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl GateSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: GateStage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("reelgate.gate", stage = stage.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> GateSpanGuard {
		#[cfg(feature = "tracing")]
		{
			GateSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			GateSpanGuard {}
		}
	}

	/// Instruments an async stage without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`GateSpan::entered`].
pub struct GateSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for GateSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GateSpanGuard(..)")
	}
}

/// Logs a rejected request. Internal failures log at `error`, policy denials at `debug`.
///
/// The full [`Error`] is logged, including the internal reason a credential was rejected,
/// while callers only ever see the generic rejection body.
pub fn log_rejection(stage: GateStage, client: &ClientId, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		if error.kind() == crate::error::ErrorKind::InternalFailure {
			tracing::error!(stage = stage.as_str(), client = %client, %error, "request failed");
		} else {
			tracing::debug!(
				stage = stage.as_str(),
				client = %client,
				kind = error.kind().as_str(),
				%error,
				"request denied"
			);
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, client, error);
	}
}

/// Logs the result of a limiter sweep.
pub fn log_sweep(evicted: usize, remaining: usize) {
	#[cfg(feature = "tracing")]
	{
		if evicted > 0 {
			tracing::debug!(evicted, remaining, "rate limiter swept idle clients");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (evicted, remaining);
	}
}
