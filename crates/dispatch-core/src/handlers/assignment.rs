//! Assignment handler: offers approved orders to delivery partners.
//!
//! Runs on behalf of the resolver role, either when an approval lands or
//! from the periodic sweep that retries orders still waiting for a
//! partner. Creation of the request is insert-guarded by the store, so
//! two concurrent resolver runs can never offer the same order twice.

use crate::engine::event_bus::EventBus;
use crate::handlers::CoordinatorError;
use chrono::Utc;
use dispatch_assignment::{AssignmentError, AssignmentService};
use dispatch_lifecycle::{decide, Action, LifecycleView, TransitionDenied};
use dispatch_storage::{StorageError, StoreService};
use dispatch_types::{
	ActorRole, CoordinatorEvent, DeliveryRequest, OrderEvent, OrderStatus, RequestEvent,
	RequestStatus,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for resolver-initiated partner assignment.
pub struct AssignmentHandler {
	store: Arc<StoreService>,
	assignment: Arc<AssignmentService>,
	event_bus: EventBus,
}

impl AssignmentHandler {
	pub fn new(
		store: Arc<StoreService>,
		assignment: Arc<AssignmentService>,
		event_bus: EventBus,
	) -> Self {
		Self {
			store,
			assignment,
			event_bus,
		}
	}

	/// Offers an approved order to the best available partner.
	///
	/// Idempotent per order: if a live request already exists the call
	/// reports the order as already assigned instead of creating a
	/// duplicate. When no partner is available the order stays approved
	/// with no request, a state observers can distinguish from "awaiting
	/// partner".
	#[instrument(skip_all, fields(order_id = %order_id))]
	pub async fn assign(&self, order_id: &str) -> Result<DeliveryRequest, CoordinatorError> {
		let order = self.store.get_order(order_id).await.map_err(|e| match e {
			StorageError::NotFound => CoordinatorError::NotFound(format!("order {}", order_id)),
			other => other.into(),
		})?;
		let existing = self.store.get_delivery_request(order_id).await?;

		let view = LifecycleView::of(&order, existing.as_ref());
		decide(&view, ActorRole::Resolver, Action::Assign)?;

		let vendor = self
			.store
			.get_vendor(&order.vendor_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoordinatorError::NotFound(format!("vendor {}", order.vendor_id))
				},
				other => other.into(),
			})?;
		let partners = self.store.all_partners().await?;
		let partner_id = self
			.assignment
			.select_partner(&vendor, &partners)
			.await
			.map_err(|e| match e {
				AssignmentError::NoPartnerAvailable => CoordinatorError::NoPartnerAvailable,
				AssignmentError::VendorLocationMissing => CoordinatorError::VendorLocationMissing,
				AssignmentError::InvalidConfiguration(msg) => CoordinatorError::Storage(msg),
			})?;

		let request = DeliveryRequest {
			id: Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			partner_id: partner_id.clone(),
			vendor_id: order.vendor_id.clone(),
			status: RequestStatus::Assigned,
			picked_up_at: None,
			delivered_at: None,
			created_at: Utc::now(),
		};
		// Insert-guarded: a concurrent resolver run loses here.
		match self.store.create_request(&request).await {
			Ok(()) => {},
			Err(StorageError::Conflict) => {
				return Err(CoordinatorError::Denied(TransitionDenied::AlreadyAssigned));
			},
			Err(e) => return Err(e.into()),
		}

		// The request exists now, so a failed order write is a
		// divergence the caller must see, not an ordinary conflict.
		match self
			.store
			.update_order_status(order_id, OrderStatus::Approved, OrderStatus::Assigned)
			.await
		{
			Ok(_) => {},
			Err(e) => {
				return Err(CoordinatorError::Divergence {
					order_id: order_id.to_string(),
					message: format!("request {} created but order write failed: {}", request.id, e),
				});
			},
		}

		self.event_bus
			.publish(CoordinatorEvent::Request(RequestEvent::Created {
				request_id: request.id.clone(),
				order_id: order_id.to_string(),
				partner_id: partner_id.clone(),
			}));
		self.event_bus
			.publish(CoordinatorEvent::Order(OrderEvent::StatusChanged {
				order_id: order_id.to_string(),
				from: OrderStatus::Approved,
				to: OrderStatus::Assigned,
			}));
		tracing::info!(
			order_id = %order_id,
			partner_id = %partner_id,
			request_id = %request.id,
			"Order offered to partner"
		);
		Ok(request)
	}

	/// Sweeps for approved orders still waiting for a partner and tries
	/// to assign each. The polling fallback behind event-driven
	/// assignment: an order approved while no partner was available is
	/// picked up here once one appears.
	pub async fn sweep(&self) {
		let orders = match self.store.all_orders().await {
			Ok(orders) => orders,
			Err(e) => {
				tracing::warn!(error = %e, "Assignment sweep could not list orders");
				return;
			},
		};

		for order in orders {
			if order.delivery_status != OrderStatus::Approved {
				continue;
			}
			match self.store.get_delivery_request(&order.id).await {
				Ok(Some(_)) => continue,
				Ok(None) => {},
				Err(e) => {
					tracing::warn!(order_id = %order.id, error = %e, "Sweep lookup failed");
					continue;
				},
			}
			match self.assign(&order.id).await {
				Ok(_) => {},
				// Normal while no partner is active; the next sweep retries.
				Err(CoordinatorError::NoPartnerAvailable)
				| Err(CoordinatorError::VendorLocationMissing) => {
					tracing::debug!(order_id = %order.id, "No partner available yet");
				},
				Err(CoordinatorError::Denied(_)) | Err(CoordinatorError::Conflict(_)) => {},
				Err(e) => {
					tracing::warn!(order_id = %order.id, error = %e, "Assignment failed");
				},
			}
		}
	}
}
