//! Actor roles participating in the order lifecycle.
//!
//! Behavior is dispatched by actor capability: the lifecycle engine keys
//! its transition table explicitly by (state, role, action) instead of
//! per-view conditionals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of roles that may request lifecycle transitions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
	/// The customer who placed the order.
	Customer,
	/// The vendor fulfilling the order.
	Vendor,
	/// The delivery partner assigned to the order.
	DeliveryPartner,
	/// Platform administrator; observes but holds no transitions.
	Admin,
	/// The assignment resolver acting on the system's behalf.
	Resolver,
}

impl ActorRole {
	/// Returns an iterator over all roles.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Customer,
			Self::Vendor,
			Self::DeliveryPartner,
			Self::Admin,
			Self::Resolver,
		]
		.into_iter()
	}
}

impl fmt::Display for ActorRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ActorRole::Customer => f.write_str("customer"),
			ActorRole::Vendor => f.write_str("vendor"),
			ActorRole::DeliveryPartner => f.write_str("delivery_partner"),
			ActorRole::Admin => f.write_str("admin"),
			ActorRole::Resolver => f.write_str("resolver"),
		}
	}
}

/// An authenticated actor: a role plus the identity it acts as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
	/// The capability set this actor holds.
	pub role: ActorRole,
	/// Identifier of the customer, vendor or partner profile.
	pub id: String,
}

impl Actor {
	pub fn new(role: ActorRole, id: impl Into<String>) -> Self {
		Self {
			role,
			id: id.into(),
		}
	}
}
