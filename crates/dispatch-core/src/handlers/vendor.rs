//! Vendor handler: order review and the vendor's order feed.

use crate::handlers::CoordinatorError;
use crate::state::TransitionApplier;
use dispatch_lifecycle::Action;
use dispatch_storage::StoreService;
use dispatch_types::{Actor, ActorRole, Order};
use std::sync::Arc;

/// Handler for vendor-initiated operations.
pub struct VendorHandler {
	store: Arc<StoreService>,
	applier: Arc<TransitionApplier>,
}

impl VendorHandler {
	pub fn new(store: Arc<StoreService>, applier: Arc<TransitionApplier>) -> Self {
		Self { store, applier }
	}

	/// Approves a pending order, making it eligible for assignment.
	pub async fn approve(
		&self,
		vendor_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		let actor = Actor::new(ActorRole::Vendor, vendor_id);
		let (order, _) = self
			.applier
			.transition(order_id, &actor, Action::Approve)
			.await?;
		Ok(order)
	}

	/// Rejects an order before a partner accepts it. If a request was
	/// already offered to a partner, it is cancelled in the same unit.
	pub async fn reject(
		&self,
		vendor_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		let actor = Actor::new(ActorRole::Vendor, vendor_id);
		let (order, _) = self
			.applier
			.transition(order_id, &actor, Action::Reject)
			.await?;
		Ok(order)
	}

	/// Returns the vendor's orders, newest first.
	pub async fn orders(&self, vendor_id: &str) -> Result<Vec<Order>, CoordinatorError> {
		Ok(self.store.orders_for_vendor(vendor_id).await?)
	}
}
