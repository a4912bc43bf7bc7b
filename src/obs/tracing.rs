// crates.io
use tracing::{Span, field, instrument::Instrumented};
// self
use crate::{
	_prelude::*,
	obs::{ViewKind, ViewStage},
};

/// Span wrapping one view run.
///
/// The `stage` field starts at [`ViewStage::Received`] and is advanced with
/// [`ViewSpan::stage`] as the request moves through the view.
#[derive(Clone, Debug)]
pub struct ViewSpan {
	span: Span,
}
impl ViewSpan {
	/// Creates a span tagged with the view kind and backend name.
	pub fn new(kind: ViewKind, backend: &str) -> Self {
		let span = tracing::info_span!(
			"rest_social_auth.view",
			view = kind.as_str(),
			backend,
			stage = ViewStage::Received.as_str(),
			user_id = field::Empty,
		);

		Self { span }
	}

	/// Records the stage the request reached.
	pub fn stage(&self, stage: ViewStage) {
		self.span.record("stage", stage.as_str());
	}

	/// Records the local user the login resolved to.
	pub fn user(&self, user_id: u64) {
		self.span.record("user_id", user_id);
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = ViewSpan::new(ViewKind::Session, "facebook");

		span.stage(ViewStage::BackendAttached);

		let value = span.instrument(async { 42 }).await;

		assert_eq!(value, 42);
	}
}
