//! Position tracking endpoints.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use dispatch_core::CoordinatorError;
use dispatch_tracking::TrackingError;
use dispatch_types::{CoordinatorEvent, PositionReport, TrackingEvent, TrackingPoint};

use crate::apis::ApiError;
use crate::server::AppState;

fn map_tracking_error(err: TrackingError) -> ApiError {
	match err {
		TrackingError::NoActiveRequest(msg) => CoordinatorError::NotFound(msg).into(),
		TrackingError::WrongPartner(partner, order) => CoordinatorError::Unauthorized(format!(
			"partner {} is not assigned to order {}",
			partner, order
		))
		.into(),
		TrackingError::NotInTransit(order) => {
			CoordinatorError::Conflict(format!("order {} is not out for delivery", order)).into()
		},
		TrackingError::Storage(e) => CoordinatorError::from(e).into(),
	}
}

/// Handles POST /api/orders/{id}/position: a partner device reports its
/// current position while the delivery is in transit.
pub async fn report_position(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(report): Json<PositionReport>,
) -> Result<StatusCode, ApiError> {
	state
		.coordinator
		.tracking()
		.report_position(&report.partner_id, &id, report.lat, report.lon)
		.await
		.map_err(map_tracking_error)?;
	state
		.coordinator
		.event_bus()
		.publish(CoordinatorEvent::Tracking(TrackingEvent::PositionRecorded {
			order_id: id,
			partner_id: report.partner_id,
		}));
	Ok(StatusCode::ACCEPTED)
}

/// Handles GET /api/orders/{id}/tracking: the most recent reported
/// position for an order, when any exists.
pub async fn get_position(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Option<TrackingPoint>>, ApiError> {
	let point = state
		.coordinator
		.tracking()
		.latest_position(&id)
		.await
		.map_err(map_tracking_error)?;
	Ok(Json(point))
}
