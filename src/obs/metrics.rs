// self
use crate::obs::{FlowKind, FlowOutcome};

/// Bumps `auth_gateway_flow_total{flow, outcome}`.
///
/// A renewal wave contributes one `renewal` attempt plus one `queued` outcome per request that
/// parked behind it, so `queued / attempt` approximates the average wave width.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	metrics::counter!(
		"auth_gateway_flow_total",
		"flow" => kind.as_str(),
		"outcome" => outcome.as_str()
	)
	.increment(1);
	#[cfg(not(feature = "metrics"))]
	let _ = (kind, outcome);
}

/// Records how many parked requests a settled renewal released.
pub fn record_wave_release(released: usize) {
	#[cfg(feature = "metrics")]
	metrics::histogram!("auth_gateway_renewal_wave_released").record(released as f64);
	#[cfg(not(feature = "metrics"))]
	let _ = released;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_flow_outcome(FlowKind::Renewal, FlowOutcome::Queued);
		record_wave_release(3);
	}
}
