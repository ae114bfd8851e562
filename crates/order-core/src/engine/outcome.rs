//! Result of a successful order creation.

use order_types::Order;
use std::fmt;

/// Whether the order reached a persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceOutcome {
	Persisted,
	/// No persistence backend is wired; the order exists only in the response.
	Unpersisted,
}

/// What happened to the new-order notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
	Sent,
	/// The backend reported an error, carried here as text.
	Failed(String),
	/// No notification backend is wired.
	Skipped,
}

impl PersistenceOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			PersistenceOutcome::Persisted => "persisted",
			PersistenceOutcome::Unpersisted => "unpersisted",
		}
	}
}

impl NotificationOutcome {
	pub fn as_str(&self) -> &'static str {
		match self {
			NotificationOutcome::Sent => "sent",
			NotificationOutcome::Failed(_) => "failed",
			NotificationOutcome::Skipped => "skipped",
		}
	}
}

impl fmt::Display for PersistenceOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl fmt::Display for NotificationOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A created order together with how each side effect went.
#[derive(Debug, Clone)]
pub struct OrderCreated {
	pub order: Order,
	pub persistence: PersistenceOutcome,
	pub notification: NotificationOutcome,
}

impl OrderCreated {
	/// True when every wired side effect succeeded and nothing was skipped.
	pub fn is_complete(&self) -> bool {
		self.persistence == PersistenceOutcome::Persisted
			&& self.notification == NotificationOutcome::Sent
	}
}
