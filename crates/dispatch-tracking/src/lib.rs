//! Live delivery tracking for the dispatch coordinator.
//!
//! Delivery partners stream position reports from their device while a
//! delivery is in transit; customers poll the latest point to watch the
//! order approach. Only the most recent point per order is kept, and a
//! report is accepted only from the assigned partner while the request is
//! out for delivery. Tracking is observational: a failed or rejected
//! report never blocks a lifecycle transition.

use std::sync::Arc;

use chrono::Utc;
use dispatch_storage::{StorageError, StoreService};
use dispatch_types::{RequestStatus, TrackingPoint};
use thiserror::Error;

/// Errors that can occur while handling a position report.
#[derive(Debug, Error)]
pub enum TrackingError {
	/// The order has no live delivery request.
	#[error("Order {0} has no live delivery request")]
	NoActiveRequest(String),
	/// The reporter is not the partner assigned to the order.
	#[error("Partner {0} is not assigned to order {1}")]
	WrongPartner(String, String),
	/// The delivery is not in transit, so positions are not being taken.
	#[error("Order {0} is not out for delivery")]
	NotInTransit(String),
	/// The storage layer failed.
	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),
}

/// Service accepting partner position reports and serving the latest
/// point per order.
pub struct TrackingService {
	store: Arc<StoreService>,
}

impl TrackingService {
	/// Creates a new TrackingService backed by the given store.
	pub fn new(store: Arc<StoreService>) -> Self {
		Self { store }
	}

	/// Records a position report from a partner's device.
	///
	/// The report is validated against the order's live request: it must
	/// exist, belong to the reporting partner, and be out for delivery.
	/// Reports that arrive out of order are dropped silently; the stored
	/// point only ever moves forward in time.
	pub async fn report_position(
		&self,
		partner_id: &str,
		order_id: &str,
		latitude: f64,
		longitude: f64,
	) -> Result<(), TrackingError> {
		let request = self
			.store
			.get_delivery_request(order_id)
			.await?
			.ok_or_else(|| TrackingError::NoActiveRequest(order_id.to_string()))?;
		if request.partner_id != partner_id {
			return Err(TrackingError::WrongPartner(
				partner_id.to_string(),
				order_id.to_string(),
			));
		}
		if request.status != RequestStatus::OutForDelivery {
			return Err(TrackingError::NotInTransit(order_id.to_string()));
		}

		let point = TrackingPoint {
			order_id: order_id.to_string(),
			partner_id: partner_id.to_string(),
			latitude,
			longitude,
			recorded_at: Utc::now(),
		};
		self.store.record_position(&point).await?;
		tracing::trace!(order_id = %order_id, partner_id = %partner_id, "Recorded position");
		Ok(())
	}

	/// Returns the most recent position for an order, if any was ever
	/// reported.
	pub async fn latest_position(
		&self,
		order_id: &str,
	) -> Result<Option<TrackingPoint>, TrackingError> {
		Ok(self.store.latest_position(order_id).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use dispatch_storage::implementations::memory::MemoryStorage;
	use dispatch_types::{
		AddressSnapshot, DeliveryRequest, Order, OrderStatus, PaymentStatus,
	};
	use rust_decimal::Decimal;

	fn order(id: &str, status: OrderStatus) -> Order {
		Order {
			id: id.into(),
			customer_id: "customer-1".into(),
			vendor_id: "vendor-1".into(),
			address_id: "addr-1".into(),
			address: AddressSnapshot {
				label: "Home".into(),
				full_address: "12 Main St".into(),
				city: "Bengaluru".into(),
				state: "Karnataka".into(),
				pincode: "560001".into(),
				phone: "900000000".into(),
				coordinates: None,
			},
			subtotal: Decimal::from(250),
			discount: Decimal::ZERO,
			final_amount: Decimal::from(250),
			payment_status: PaymentStatus::Pending,
			payment_method: Some("cod".into()),
			delivery_status: status,
			alternate_drop: None,
			ordering_for_other: false,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn request(status: RequestStatus) -> DeliveryRequest {
		DeliveryRequest {
			id: "req-1".into(),
			order_id: "o1".into(),
			partner_id: "partner-1".into(),
			vendor_id: "vendor-1".into(),
			status,
			picked_up_at: None,
			delivered_at: None,
			created_at: Utc::now(),
		}
	}

	async fn service_with_request(status: RequestStatus) -> TrackingService {
		let store = Arc::new(StoreService::new(Box::new(MemoryStorage::new())));
		store
			.create_order(&order("o1", OrderStatus::OutForDelivery), &[])
			.await
			.unwrap();
		store.create_request(&request(status)).await.unwrap();
		TrackingService::new(store)
	}

	#[tokio::test]
	async fn accepts_reports_while_in_transit() {
		let service = service_with_request(RequestStatus::OutForDelivery).await;
		service
			.report_position("partner-1", "o1", 12.97, 77.59)
			.await
			.unwrap();

		let point = service.latest_position("o1").await.unwrap().unwrap();
		assert_eq!(point.partner_id, "partner-1");
		assert_eq!(point.latitude, 12.97);
	}

	#[tokio::test]
	async fn rejects_reports_before_transit() {
		let service = service_with_request(RequestStatus::Accepted).await;
		let err = service
			.report_position("partner-1", "o1", 12.97, 77.59)
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::NotInTransit(_)));
	}

	#[tokio::test]
	async fn rejects_reports_from_the_wrong_partner() {
		let service = service_with_request(RequestStatus::OutForDelivery).await;
		let err = service
			.report_position("partner-2", "o1", 12.97, 77.59)
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::WrongPartner(_, _)));
	}

	#[tokio::test]
	async fn orders_without_a_request_are_not_tracked() {
		let store = Arc::new(StoreService::new(Box::new(MemoryStorage::new())));
		let service = TrackingService::new(store);
		let err = service
			.report_position("partner-1", "missing", 0.0, 0.0)
			.await
			.unwrap_err();
		assert!(matches!(err, TrackingError::NoActiveRequest(_)));
	}
}
