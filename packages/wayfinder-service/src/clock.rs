//! Time source for the embedding cache, lock polling, and the circuit breaker.
//!
//! `now` is a monotonic offset from the clock's own epoch, not wall time.

use std::{
	sync::Mutex,
	time::{Duration, Instant},
};

use crate::BoxFuture;

pub trait Clock
where
	Self: Send + Sync,
{
	fn now(&self) -> Duration;

	fn sleep<'a>(&'a self, duration: Duration) -> BoxFuture<'a, ()>;
}

pub struct SystemClock {
	origin: Instant,
}
impl SystemClock {
	pub fn new() -> Self {
		Self { origin: Instant::now() }
	}
}
impl Default for SystemClock {
	fn default() -> Self {
		Self::new()
	}
}
impl Clock for SystemClock {
	fn now(&self) -> Duration {
		self.origin.elapsed()
	}

	fn sleep<'a>(&'a self, duration: Duration) -> BoxFuture<'a, ()> {
		Box::pin(tokio::time::sleep(duration))
	}
}

/// Virtual clock for tests. `sleep` advances time instantly and yields to the scheduler.
#[derive(Default)]
pub struct ManualClock {
	now: Mutex<Duration>,
}
impl ManualClock {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn advance(&self, duration: Duration) {
		let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());

		*now = now.saturating_add(duration);
	}
}
impl Clock for ManualClock {
	fn now(&self) -> Duration {
		*self.now.lock().unwrap_or_else(|err| err.into_inner())
	}

	fn sleep<'a>(&'a self, duration: Duration) -> BoxFuture<'a, ()> {
		Box::pin(async move {
			self.advance(duration);

			tokio::task::yield_now().await;
		})
	}
}
