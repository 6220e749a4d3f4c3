// self
use crate::{
	_prelude::*,
	obs::{self, FlowKind, FlowOutcome},
};

/// Future returned by [`FlowSpan::instrument`]; instrumented only when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; instrumented only when tracing is enabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// One observed run of a gateway flow.
///
/// Creating the span records an [`FlowOutcome::Attempt`]; [`FlowSpan::finish`] records the
/// terminal outcome and, with tracing enabled, logs failures inside the span.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	kind: FlowKind,
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a span for `kind` at `stage` and counts the attempt.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("auth_gateway.flow", flow = kind.as_str(), stage);

			Self { kind, span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self { kind }
		}
	}

	/// Flow kind this span was opened for.
	pub fn kind(&self) -> FlowKind {
		self.kind
	}

	/// Runs `fut` inside the span without holding an entered guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
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

	/// Records the terminal outcome of the flow from `result`.
	pub fn finish<T, E>(&self, result: &Result<T, E>)
	where
		E: Display,
	{
		match result {
			Ok(_) => obs::record_flow_outcome(self.kind, FlowOutcome::Success),
			Err(e) => {
				#[cfg(feature = "tracing")]
				self.span.in_scope(|| tracing::debug!(error = %e, "flow failed"));
				#[cfg(not(feature = "tracing"))]
				let _ = e;

				obs::record_flow_outcome(self.kind, FlowOutcome::Failure);
			},
		}
	}
}
