//! Event bus for change notifications between the coordinator and its
//! observers.
//!
//! Built on a tokio broadcast channel: every status-changing action
//! publishes a [`CoordinatorEvent`], and any number of subscribers
//! (dashboards, the assignment sweep, tests) receive it. Delivery is
//! at-least-once from the consumer's point of view; a slow subscriber can
//! miss events, which is why observers also poll.

use dispatch_types::CoordinatorEvent;
use tokio::sync::broadcast;

/// Broadcast bus carrying coordinator events to all subscribers.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<CoordinatorEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event to all current subscribers.
	///
	/// Publishing with no subscribers is not an error; the event is
	/// simply dropped.
	pub fn publish(&self, event: CoordinatorEvent) {
		let _ = self.sender.send(event);
	}

	/// Creates a new subscription to the event stream.
	pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}
