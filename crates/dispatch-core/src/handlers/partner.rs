//! Partner handler: assignment responses, delivery progress and the
//! partner's request feed.

use crate::engine::event_bus::EventBus;
use crate::handlers::CoordinatorError;
use crate::state::TransitionApplier;
use dispatch_lifecycle::Action;
use dispatch_storage::{StorageError, StoreService};
use dispatch_types::{
	Actor, ActorRole, CoordinatorEvent, DeliveryRequest, Order, PartnerProfile, RequestEvent,
};
use std::sync::Arc;

/// Handler for delivery-partner-initiated operations.
pub struct PartnerHandler {
	store: Arc<StoreService>,
	applier: Arc<TransitionApplier>,
	event_bus: EventBus,
}

impl PartnerHandler {
	pub fn new(
		store: Arc<StoreService>,
		applier: Arc<TransitionApplier>,
		event_bus: EventBus,
	) -> Self {
		Self {
			store,
			applier,
			event_bus,
		}
	}

	async fn transition(
		&self,
		partner_id: &str,
		order_id: &str,
		action: Action,
	) -> Result<Order, CoordinatorError> {
		let actor = Actor::new(ActorRole::DeliveryPartner, partner_id);
		let (order, _) = self.applier.transition(order_id, &actor, action).await?;
		Ok(order)
	}

	/// Accepts an offered assignment.
	pub async fn accept(
		&self,
		partner_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		self.transition(partner_id, order_id, Action::Accept).await
	}

	/// Declines an offered assignment. The order stays approved and
	/// becomes eligible for re-assignment.
	pub async fn reject_assignment(
		&self,
		partner_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		self.transition(partner_id, order_id, Action::RejectAssignment)
			.await
	}

	/// Marks the order collected from the vendor.
	pub async fn mark_picked_up(
		&self,
		partner_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		self.transition(partner_id, order_id, Action::MarkPickedUp)
			.await
	}

	/// Marks the order en route to the customer.
	pub async fn mark_out_for_delivery(
		&self,
		partner_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		self.transition(partner_id, order_id, Action::MarkOutForDelivery)
			.await
	}

	/// Marks the order handed to the customer.
	pub async fn mark_delivered(
		&self,
		partner_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		self.transition(partner_id, order_id, Action::MarkDelivered)
			.await
	}

	/// Removes a terminal request from the partner's dashboard.
	pub async fn delete_request(
		&self,
		partner_id: &str,
		request_id: &str,
	) -> Result<(), CoordinatorError> {
		let request = self
			.store
			.get_request(request_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoordinatorError::NotFound(format!("request {}", request_id))
				},
				other => other.into(),
			})?;
		if request.partner_id != partner_id {
			return Err(CoordinatorError::Unauthorized(format!(
				"partner {} does not own request {}",
				partner_id, request_id
			)));
		}
		if !request.is_terminal() {
			return Err(CoordinatorError::Conflict(format!(
				"request is {} and cannot be deleted until terminal",
				request.status
			)));
		}

		self.store.delete_request(request_id).await?;
		self.event_bus
			.publish(CoordinatorEvent::Request(RequestEvent::Deleted {
				request_id: request_id.to_string(),
			}));
		Ok(())
	}

	/// Returns a registered partner's requests, newest first.
	pub async fn requests(
		&self,
		partner_id: &str,
	) -> Result<Vec<DeliveryRequest>, CoordinatorError> {
		self.store
			.get_partner(partner_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoordinatorError::NotFound(format!("partner {}", partner_id))
				},
				other => other.into(),
			})?;
		Ok(self.store.requests_for_partner(partner_id).await?)
	}

	/// Updates the partner's availability and last known position.
	///
	/// Assignment only considers partners that are active and located,
	/// so this is how a partner enters and leaves the candidate pool.
	pub async fn update_profile(&self, profile: PartnerProfile) -> Result<(), CoordinatorError> {
		self.store.store_partner(&profile).await?;
		Ok(())
	}
}
