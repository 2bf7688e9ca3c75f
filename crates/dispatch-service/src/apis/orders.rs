//! Order endpoints: checkout, views, lifecycle transitions and deletion.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use dispatch_core::CoordinatorError;
use dispatch_lifecycle::{Action, TransitionDenied};
use dispatch_types::{
	CheckoutRequest, DeliveryRequest, Order, OrderView, TransitionPayload,
};
use serde::Deserialize;

use crate::apis::ApiError;
use crate::server::AppState;

/// Handles POST /api/orders: customer checkout.
pub async fn create_order(
	State(state): State<AppState>,
	Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let order = state.coordinator.customer().checkout(request).await?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders: the admin feed of every order.
pub async fn list_orders(
	State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state.coordinator.store().all_orders().await.map_err(CoordinatorError::from)?;
	Ok(Json(orders))
}

/// Handles GET /api/orders/{id}: the full observer view of one order.
pub async fn get_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
	let view = state.coordinator.customer().order_view(&id).await?;
	Ok(Json(view))
}

/// Handles POST /api/orders/{id}/transitions: one lifecycle action.
///
/// The payload names the acting role, the identity it acts as and the
/// action by wire name. The response is the fresh view of the order so
/// the client renders actual current state.
pub async fn transition_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(payload): Json<TransitionPayload>,
) -> Result<Json<OrderView>, ApiError> {
	let action: Action = payload
		.action
		.parse()
		.map_err(CoordinatorError::from)?;
	if payload.role != action.required_role() {
		return Err(CoordinatorError::Denied(TransitionDenied::Forbidden {
			role: payload.role,
			action,
		})
		.into());
	}

	let coordinator = &state.coordinator;
	let actor_id = payload.actor_id.as_str();
	match action {
		Action::Approve => {
			coordinator.vendor().approve(actor_id, &id).await?;
		},
		Action::Reject => {
			coordinator.vendor().reject(actor_id, &id).await?;
		},
		Action::Assign => {
			coordinator.assignment().assign(&id).await?;
		},
		Action::Accept => {
			coordinator.partner().accept(actor_id, &id).await?;
		},
		Action::RejectAssignment => {
			coordinator.partner().reject_assignment(actor_id, &id).await?;
		},
		Action::MarkPickedUp => {
			coordinator.partner().mark_picked_up(actor_id, &id).await?;
		},
		Action::MarkOutForDelivery => {
			coordinator
				.partner()
				.mark_out_for_delivery(actor_id, &id)
				.await?;
		},
		Action::MarkDelivered => {
			coordinator.partner().mark_delivered(actor_id, &id).await?;
		},
		Action::Cancel => {
			coordinator.customer().cancel(actor_id, &id).await?;
		},
	}

	let view = coordinator.customer().order_view(&id).await?;
	Ok(Json(view))
}

/// Owner identification for deletion endpoints.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
	#[serde(default)]
	pub customer_id: Option<String>,
	#[serde(default)]
	pub partner_id: Option<String>,
}

/// Handles DELETE /api/orders/{id}: customer deletes a terminal order.
pub async fn delete_order(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Query(owner): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
	let customer_id = owner.customer_id.ok_or_else(|| {
		CoordinatorError::InvalidRequest("customer_id query parameter is required".into())
	})?;
	state
		.coordinator
		.customer()
		.delete_order(&customer_id, &id)
		.await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles DELETE /api/requests/{id}: partner clears a terminal request
/// from their dashboard.
pub async fn delete_request(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Query(owner): Query<OwnerQuery>,
) -> Result<StatusCode, ApiError> {
	let partner_id = owner.partner_id.ok_or_else(|| {
		CoordinatorError::InvalidRequest("partner_id query parameter is required".into())
	})?;
	state
		.coordinator
		.partner()
		.delete_request(&partner_id, &id)
		.await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles GET /api/customers/{id}/orders.
pub async fn customer_orders(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state.coordinator.customer().orders(&id).await?;
	Ok(Json(orders))
}

/// Handles GET /api/vendors/{id}/orders.
pub async fn vendor_orders(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<Order>>, ApiError> {
	let orders = state.coordinator.vendor().orders(&id).await?;
	Ok(Json(orders))
}

/// Handles GET /api/partners/{id}/requests.
pub async fn partner_requests(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<DeliveryRequest>>, ApiError> {
	let requests = state.coordinator.partner().requests(&id).await?;
	Ok(Json(requests))
}
