// self
use crate::obs::{LoginOutcome, ViewKind};

/// Records a login outcome via the global metrics recorder (when enabled).
pub fn record_login_outcome(kind: ViewKind, outcome: LoginOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"rest_social_auth_login_total",
			"view" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recording_without_a_recorder_is_harmless() {
		record_login_outcome(ViewKind::TokenOnly, LoginOutcome::Failure);
	}
}
