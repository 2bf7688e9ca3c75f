//! Customer handler: checkout, cancellation, deletion and order views.

use crate::engine::event_bus::EventBus;
use crate::handlers::CoordinatorError;
use crate::state::TransitionApplier;
use chrono::Utc;
use dispatch_lifecycle::{deletion_allowed, Action};
use dispatch_storage::{StorageError, StoreService};
use dispatch_types::{
	Actor, ActorRole, AddressSnapshot, CheckoutRequest, CoordinatorEvent, EffectiveStatus, Order,
	OrderEvent, OrderItem, OrderStatus, OrderView, PaymentStatus,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Handler for customer-initiated operations.
pub struct CustomerHandler {
	store: Arc<StoreService>,
	applier: Arc<TransitionApplier>,
	event_bus: EventBus,
}

impl CustomerHandler {
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

	/// Creates a new order from a cart.
	///
	/// Item names and prices are copied onto the order so later catalog
	/// edits do not rewrite history, and the chosen address is copied
	/// for the same reason. The order starts pending and waits for the
	/// vendor's review.
	#[instrument(skip_all, fields(customer_id = %request.customer_id, vendor_id = %request.vendor_id))]
	pub async fn checkout(&self, request: CheckoutRequest) -> Result<Order, CoordinatorError> {
		if request.items.is_empty() {
			return Err(CoordinatorError::InvalidRequest(
				"checkout requires at least one item".into(),
			));
		}
		if request.items.iter().any(|i| i.quantity == 0) {
			return Err(CoordinatorError::InvalidRequest(
				"item quantity must be at least 1".into(),
			));
		}

		let address = self
			.store
			.get_address(&request.address_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					CoordinatorError::NotFound(format!("address {}", request.address_id))
				},
				other => other.into(),
			})?;
		if address.customer_id != request.customer_id {
			return Err(CoordinatorError::Unauthorized(format!(
				"address {} does not belong to customer {}",
				request.address_id, request.customer_id
			)));
		}

		let subtotal: Decimal = request
			.items
			.iter()
			.map(|i| i.price * Decimal::from(i.quantity))
			.sum();
		let discount = request.discount.unwrap_or(Decimal::ZERO);
		if discount < Decimal::ZERO || discount > subtotal {
			return Err(CoordinatorError::InvalidRequest(format!(
				"discount {} is outside 0..={}",
				discount, subtotal
			)));
		}

		let now = Utc::now();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			customer_id: request.customer_id.clone(),
			vendor_id: request.vendor_id.clone(),
			address_id: request.address_id.clone(),
			address: AddressSnapshot::from(&address),
			subtotal,
			discount,
			final_amount: subtotal - discount,
			payment_status: PaymentStatus::Pending,
			payment_method: request.payment_method.clone(),
			delivery_status: OrderStatus::Pending,
			alternate_drop: request.alternate_drop,
			ordering_for_other: request.ordering_for_other,
			created_at: now,
			updated_at: now,
		};
		let items: Vec<OrderItem> = request
			.items
			.iter()
			.map(|i| OrderItem {
				id: Uuid::new_v4().to_string(),
				order_id: order.id.clone(),
				product_id: i.product_id.clone(),
				snapshot_name: i.name.clone(),
				snapshot_price: i.price,
				quantity: i.quantity,
			})
			.collect();

		self.store.create_order(&order, &items).await?;
		self.event_bus
			.publish(CoordinatorEvent::Order(OrderEvent::Created {
				order_id: order.id.clone(),
				customer_id: order.customer_id.clone(),
			}));
		tracing::info!(
			order_id = %order.id,
			customer_id = %order.customer_id,
			vendor_id = %order.vendor_id,
			amount = %order.final_amount,
			"Order created"
		);
		Ok(order)
	}

	/// Cancels an order before pickup.
	pub async fn cancel(
		&self,
		customer_id: &str,
		order_id: &str,
	) -> Result<Order, CoordinatorError> {
		let actor = Actor::new(ActorRole::Customer, customer_id);
		let (order, _) = self
			.applier
			.transition(order_id, &actor, Action::Cancel)
			.await?;
		Ok(order)
	}

	/// Deletes a terminal order, cascading its item snapshots.
	pub async fn delete_order(
		&self,
		customer_id: &str,
		order_id: &str,
	) -> Result<(), CoordinatorError> {
		let order = self.store.get_order(order_id).await.map_err(|e| match e {
			StorageError::NotFound => CoordinatorError::NotFound(format!("order {}", order_id)),
			other => other.into(),
		})?;
		if order.customer_id != customer_id {
			return Err(CoordinatorError::Unauthorized(format!(
				"customer {} does not own order {}",
				customer_id, order_id
			)));
		}
		if !deletion_allowed(order.delivery_status) {
			return Err(CoordinatorError::Conflict(format!(
				"order is {} and cannot be deleted until terminal",
				order.delivery_status
			)));
		}

		self.store.delete_order(order_id).await?;
		self.event_bus
			.publish(CoordinatorEvent::Order(OrderEvent::Deleted {
				order_id: order_id.to_string(),
			}));
		Ok(())
	}

	/// Returns the customer's orders, newest first.
	pub async fn orders(&self, customer_id: &str) -> Result<Vec<Order>, CoordinatorError> {
		Ok(self.store.orders_for_customer(customer_id).await?)
	}

	/// Assembles the full observer view of one order.
	pub async fn order_view(&self, order_id: &str) -> Result<OrderView, CoordinatorError> {
		let order = self.store.get_order(order_id).await.map_err(|e| match e {
			StorageError::NotFound => CoordinatorError::NotFound(format!("order {}", order_id)),
			other => other.into(),
		})?;
		let items = self.store.order_items(order_id).await?;
		let request = self.store.get_delivery_request(order_id).await?;
		let last_position = self.store.latest_position(order_id).await?;
		let effective_status = EffectiveStatus::of(&order, request.as_ref());
		Ok(OrderView {
			order,
			items,
			request,
			effective_status,
			last_position,
		})
	}
}
