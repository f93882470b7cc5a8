use std::{
	sync::{Arc, Mutex},
	time::Duration,
};

use serde::Serialize;

use crate::clock::Clock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
	Closed,
	Open,
	HalfOpen,
}

struct BreakerInner {
	state: CircuitState,
	consecutive_failures: u32,
	opened_at: Duration,
	/// When the current half-open trial call was admitted.
	trial_started_at: Option<Duration>,
}

/// Guards the embedding provider. Opens after `failure_threshold` consecutive failures. Once
/// `recovery_timeout` has passed it admits a single trial call, and closes again on the first
/// success. A trial that never reports back frees its slot after another `recovery_timeout`.
pub struct CircuitBreaker {
	failure_threshold: u32,
	recovery_timeout: Duration,
	clock: Arc<dyn Clock>,
	inner: Mutex<BreakerInner>,
}
impl CircuitBreaker {
	pub fn new(cfg: &wayfinder_config::CircuitBreaker, clock: Arc<dyn Clock>) -> Self {
		Self {
			failure_threshold: cfg.failure_threshold.max(1),
			recovery_timeout: Duration::from_millis(cfg.recovery_timeout_ms),
			clock,
			inner: Mutex::new(BreakerInner {
				state: CircuitState::Closed,
				consecutive_failures: 0,
				opened_at: Duration::ZERO,
				trial_started_at: None,
			}),
		}
	}

	/// Current state, moving `Open` to `HalfOpen` when the recovery timeout has elapsed.
	pub fn state(&self) -> CircuitState {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		self.refresh(&mut inner);

		inner.state
	}

	pub fn allow_request(&self) -> bool {
		let now = self.clock.now();
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		self.refresh(&mut inner);

		match inner.state {
			CircuitState::Closed => true,
			CircuitState::Open => false,
			CircuitState::HalfOpen => {
				let slot_free = inner.trial_started_at.is_none_or(|started| {
					now.saturating_sub(started) >= self.recovery_timeout
				});

				if slot_free {
					inner.trial_started_at = Some(now);
				}

				slot_free
			},
		}
	}

	pub fn record_success(&self) {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		inner.state = CircuitState::Closed;
		inner.consecutive_failures = 0;
		inner.trial_started_at = None;
	}

	pub fn record_failure(&self) {
		let now = self.clock.now();
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		self.refresh(&mut inner);

		inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

		if inner.state == CircuitState::HalfOpen
			|| inner.consecutive_failures >= self.failure_threshold
		{
			if inner.state != CircuitState::Open {
				tracing::warn!(
					consecutive_failures = inner.consecutive_failures,
					"Embedding circuit breaker opened."
				);
			}

			inner.state = CircuitState::Open;
			inner.opened_at = now;
			inner.trial_started_at = None;
		}
	}

	pub fn reset(&self) {
		let mut inner = self.inner.lock().unwrap_or_else(|err| err.into_inner());

		inner.state = CircuitState::Closed;
		inner.consecutive_failures = 0;
		inner.opened_at = Duration::ZERO;
		inner.trial_started_at = None;
	}

	fn refresh(&self, inner: &mut BreakerInner) {
		if inner.state == CircuitState::Open
			&& self.clock.now().saturating_sub(inner.opened_at) >= self.recovery_timeout
		{
			inner.state = CircuitState::HalfOpen;
		}
	}
}
