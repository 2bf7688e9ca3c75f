//! Profile and address-book endpoints.
//!
//! Vendors and partners register their profiles here; partners also use
//! this surface to flip availability and refresh their last known
//! position, which is what moves them in and out of the assignment pool.
//! Customers manage the address book that orders snapshot from at
//! checkout.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use dispatch_core::CoordinatorError;
use dispatch_types::{Address, PartnerProfile, VendorProfile};

use crate::apis::ApiError;
use crate::server::AppState;

/// Handles POST /api/vendors: create or update a vendor profile.
pub async fn upsert_vendor(
	State(state): State<AppState>,
	Json(vendor): Json<VendorProfile>,
) -> Result<StatusCode, ApiError> {
	if vendor.id.is_empty() {
		return Err(CoordinatorError::InvalidRequest("vendor id is required".into()).into());
	}
	state
		.coordinator
		.store()
		.store_vendor(&vendor)
		.await
		.map_err(CoordinatorError::from)?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles POST /api/partners: create or update a partner profile.
pub async fn upsert_partner(
	State(state): State<AppState>,
	Json(partner): Json<PartnerProfile>,
) -> Result<StatusCode, ApiError> {
	if partner.id.is_empty() {
		return Err(CoordinatorError::InvalidRequest("partner id is required".into()).into());
	}
	state.coordinator.partner().update_profile(partner).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles PUT /api/partners/{id}: update a partner profile in place.
pub async fn upsert_partner_by_id(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(mut partner): Json<PartnerProfile>,
) -> Result<StatusCode, ApiError> {
	partner.id = id;
	state.coordinator.partner().update_profile(partner).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles POST /api/addresses: add an address to a customer's book.
pub async fn create_address(
	State(state): State<AppState>,
	Json(address): Json<Address>,
) -> Result<StatusCode, ApiError> {
	if address.id.is_empty() || address.customer_id.is_empty() {
		return Err(CoordinatorError::InvalidRequest(
			"address id and customer_id are required".into(),
		)
		.into());
	}
	state
		.coordinator
		.store()
		.store_address(&address)
		.await
		.map_err(CoordinatorError::from)?;
	Ok(StatusCode::CREATED)
}
