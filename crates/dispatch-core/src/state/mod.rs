//! Lockstep application of lifecycle decisions to persisted state.
//!
//! An allowed transition names the status both records must move to; this
//! module performs those writes as one logical unit. The request is
//! written first, then the order, each guarded by its expected prior
//! status. A guard failure on the first write is an ordinary conflict the
//! actor retries after refetching. A failure on the second write, after
//! the first already landed, leaves the pair disagreeing and is surfaced
//! as a divergence, never swallowed.

use crate::engine::event_bus::EventBus;
use crate::handlers::CoordinatorError;
use chrono::Utc;
use dispatch_lifecycle::{decide, Action, LifecycleView, Outcome, SideEffect};
use dispatch_storage::{records::RequestTimestamps, StorageError, StoreService};
use dispatch_types::{
	Actor, ActorRole, CoordinatorEvent, DeliveryRequest, Order, OrderEvent, PartnerResponse,
	RequestEvent,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Applies lifecycle decisions to the record store.
pub struct TransitionApplier {
	store: Arc<StoreService>,
	event_bus: EventBus,
}

impl TransitionApplier {
	/// Creates a new TransitionApplier.
	pub fn new(store: Arc<StoreService>, event_bus: EventBus) -> Self {
		Self { store, event_bus }
	}

	/// Runs one actor-requested transition end to end.
	///
	/// Loads fresh state, checks ownership, asks the lifecycle engine
	/// for a decision and executes the resulting writes and side
	/// effects. Returns the updated pair.
	#[instrument(skip_all, fields(order_id = %order_id, role = %actor.role, action = %action))]
	pub async fn transition(
		&self,
		order_id: &str,
		actor: &Actor,
		action: Action,
	) -> Result<(Order, Option<DeliveryRequest>), CoordinatorError> {
		let order = self
			.store
			.get_order(order_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoordinatorError::NotFound(format!("order {}", order_id))
				},
				other => other.into(),
			})?;
		let request = self.store.get_delivery_request(order_id).await?;

		authorize(&order, request.as_ref(), actor, action)?;

		let view = LifecycleView::of(&order, request.as_ref());
		let outcome = decide(&view, actor.role, action)?;

		self.apply(order, request, actor, action, outcome).await
	}

	/// Executes the writes and side effects of an allowed transition.
	async fn apply(
		&self,
		order: Order,
		request: Option<DeliveryRequest>,
		actor: &Actor,
		action: Action,
		outcome: Outcome,
	) -> Result<(Order, Option<DeliveryRequest>), CoordinatorError> {
		let now = Utc::now();
		let mut timestamps = RequestTimestamps::default();
		for effect in &outcome.effects {
			match effect {
				SideEffect::SetPickedUpAt => timestamps.picked_up_at = Some(now),
				SideEffect::SetDeliveredAt => timestamps.delivered_at = Some(now),
				_ => {},
			}
		}

		// Request first. A guard failure here means nothing was written
		// yet, so the caller sees an ordinary conflict.
		let prior_request_status = request.as_ref().map(|r| r.status);
		let mut request_changed = false;
		let updated_request = match (&request, outcome.next_request) {
			(Some(req), Some(next)) if next != req.status => {
				let updated = self
					.store
					.update_request_status(&req.id, req.status, next, timestamps)
					.await?;
				request_changed = true;
				Some(updated)
			},
			_ => request,
		};

		// Then the order. If the request write already landed, a failure
		// here is a divergence the actor must see.
		let mut order_changed = false;
		let prior_order_status = order.delivery_status;
		let updated_order = if outcome.next_order != order.delivery_status {
			match self
				.store
				.update_order_status(&order.id, order.delivery_status, outcome.next_order)
				.await
			{
				Ok(updated) => {
					order_changed = true;
					updated
				},
				Err(e) if request_changed => {
					return Err(CoordinatorError::Divergence {
						order_id: order.id,
						message: format!(
							"request moved to {} but order write failed: {}",
							outcome
								.next_request
								.map(|s| s.as_str())
								.unwrap_or("unchanged"),
							e
						),
					});
				},
				Err(e) => return Err(e.into()),
			}
		} else {
			order
		};

		// Audit writes are non-gating: a failure is logged, not surfaced.
		for effect in &outcome.effects {
			if let SideEffect::RecordPartnerResponse(response_action) = effect {
				if let Some(req) = &updated_request {
					let response = PartnerResponse {
						id: Uuid::new_v4().to_string(),
						request_id: req.id.clone(),
						partner_id: actor.id.clone(),
						action: *response_action,
						responded_at: now,
					};
					if let Err(e) = self.store.record_partner_response(&response).await {
						tracing::warn!(
							request_id = %req.id,
							error = %e,
							"Failed to record partner response audit row"
						);
					} else {
						self.event_bus.publish(CoordinatorEvent::Request(
							RequestEvent::PartnerResponded {
								request_id: req.id.clone(),
								partner_id: actor.id.clone(),
								action: *response_action,
							},
						));
					}
				}
			}
		}

		if request_changed {
			if let (Some(req), Some(from)) = (&updated_request, prior_request_status) {
				self.event_bus
					.publish(CoordinatorEvent::Request(RequestEvent::StatusChanged {
						request_id: req.id.clone(),
						order_id: req.order_id.clone(),
						from,
						to: req.status,
					}));
			}
		}
		if order_changed {
			self.event_bus
				.publish(CoordinatorEvent::Order(OrderEvent::StatusChanged {
					order_id: updated_order.id.clone(),
					from: prior_order_status,
					to: updated_order.delivery_status,
				}));
		}

		tracing::info!(
			order_id = %updated_order.id,
			action = %action,
			role = %actor.role,
			status = %updated_order.delivery_status,
			"Applied transition"
		);

		Ok((updated_order, updated_request))
	}
}

/// Checks that the actor owns the record its role mutates.
///
/// Resolver and admin act on any record; the other roles only on their
/// own. This is a separate failure from a lifecycle denial so clients can
/// tell "not yours" apart from "wrong state".
fn authorize(
	order: &Order,
	request: Option<&DeliveryRequest>,
	actor: &Actor,
	action: Action,
) -> Result<(), CoordinatorError> {
	let owns = match actor.role {
		ActorRole::Customer => order.customer_id == actor.id,
		ActorRole::Vendor => order.vendor_id == actor.id,
		ActorRole::DeliveryPartner => request.is_some_and(|r| r.partner_id == actor.id),
		ActorRole::Resolver | ActorRole::Admin => true,
	};
	if owns {
		Ok(())
	} else {
		Err(CoordinatorError::Unauthorized(format!(
			"{} {} does not own order {} for {}",
			actor.role, actor.id, order.id, action
		)))
	}
}
