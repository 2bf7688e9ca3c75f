//! Typed record operations for the fulfillment lifecycle.
//!
//! These are the boundary operations the coordinator consumes: guarded
//! status writes for orders and delivery requests, the append-only partner
//! response audit, profile and address lookups, and last-write-wins
//! position tracking. All status updates go through [`StoreService::swap`]
//! so a record that changed since it was read yields a conflict instead of
//! a skipped state.

use chrono::{DateTime, Utc};
use dispatch_types::{
	Address, DeliveryRequest, Order, OrderItem, OrderStatus, PartnerProfile, PartnerResponse,
	RequestStatus, StorageKey, TrackingPoint, VendorProfile,
};

use crate::{StorageError, StoreService};

/// Timestamp directives attached to a request status update.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestTimestamps {
	/// Set picked_up_at to this instant.
	pub picked_up_at: Option<DateTime<Utc>>,
	/// Set delivered_at to this instant.
	pub delivered_at: Option<DateTime<Utc>>,
}

impl StoreService {
	/// Fetches an order by id.
	pub async fn get_order(&self, order_id: &str) -> Result<Order, StorageError> {
		self.retrieve(StorageKey::Orders.as_str(), order_id).await
	}

	/// Persists a freshly created order together with its item snapshots.
	///
	/// Items are immutable once written; they are only removed again by
	/// cascading order deletion.
	pub async fn create_order(
		&self,
		order: &Order,
		items: &[OrderItem],
	) -> Result<(), StorageError> {
		self.insert(StorageKey::Orders.as_str(), &order.id, order)
			.await?;
		for item in items {
			self.insert(StorageKey::OrderItems.as_str(), &item.id, item)
				.await?;
		}
		Ok(())
	}

	/// Moves an order's delivery status, guarded by the expected prior
	/// status. Returns the updated order, or
	/// [`StorageError::Conflict`] when the record moved on since it was
	/// read.
	pub async fn update_order_status(
		&self,
		order_id: &str,
		expected: OrderStatus,
		new_status: OrderStatus,
	) -> Result<Order, StorageError> {
		let prior = self.get_order(order_id).await?;
		if prior.delivery_status != expected {
			return Err(StorageError::Conflict);
		}
		let mut next = prior.clone();
		next.delivery_status = new_status;
		next.updated_at = Utc::now();
		self.swap(StorageKey::Orders.as_str(), order_id, &prior, &next)
			.await?;
		Ok(next)
	}

	/// Deletes a terminal order, cascading its item snapshots and its
	/// request index entry. The request row itself stays on the
	/// partner's dashboard until they clear it.
	pub async fn delete_order(&self, order_id: &str) -> Result<(), StorageError> {
		let items = self.order_items(order_id).await?;
		for item in items {
			self.remove(StorageKey::OrderItems.as_str(), &item.id).await?;
		}
		self.remove(StorageKey::RequestByOrder.as_str(), order_id)
			.await?;
		self.remove(StorageKey::Orders.as_str(), order_id).await
	}

	/// Returns the item snapshots belonging to an order.
	pub async fn order_items(&self, order_id: &str) -> Result<Vec<OrderItem>, StorageError> {
		let all: Vec<OrderItem> = self.list(StorageKey::OrderItems.as_str()).await?;
		Ok(all.into_iter().filter(|i| i.order_id == order_id).collect())
	}

	/// Returns all orders belonging to a customer, newest first.
	pub async fn orders_for_customer(
		&self,
		customer_id: &str,
	) -> Result<Vec<Order>, StorageError> {
		let mut orders: Vec<Order> = self
			.list::<Order>(StorageKey::Orders.as_str())
			.await?
			.into_iter()
			.filter(|o| o.customer_id == customer_id)
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Returns all orders placed with a vendor, newest first.
	pub async fn orders_for_vendor(&self, vendor_id: &str) -> Result<Vec<Order>, StorageError> {
		let mut orders: Vec<Order> = self
			.list::<Order>(StorageKey::Orders.as_str())
			.await?
			.into_iter()
			.filter(|o| o.vendor_id == vendor_id)
			.collect();
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Returns every order, newest first. Admin dashboards consume this
	/// feed unfiltered.
	pub async fn all_orders(&self) -> Result<Vec<Order>, StorageError> {
		let mut orders: Vec<Order> = self.list(StorageKey::Orders.as_str()).await?;
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Fetches the current delivery request for an order, if one exists.
	///
	/// A rejected or cancelled request drops out of the index, which is
	/// what lets observers distinguish "awaiting partner" from "no
	/// partner available"; a delivered request stays linked.
	pub async fn get_delivery_request(
		&self,
		order_id: &str,
	) -> Result<Option<DeliveryRequest>, StorageError> {
		let request_id: Option<String> = self
			.retrieve_opt(StorageKey::RequestByOrder.as_str(), order_id)
			.await?;
		match request_id {
			Some(id) => self
				.retrieve_opt(StorageKey::DeliveryRequests.as_str(), &id)
				.await,
			None => Ok(None),
		}
	}

	/// Fetches a delivery request by its own id.
	pub async fn get_request(&self, request_id: &str) -> Result<DeliveryRequest, StorageError> {
		self.retrieve(StorageKey::DeliveryRequests.as_str(), request_id)
			.await
	}

	/// Persists a freshly created delivery request.
	///
	/// The request row is written first; the insert-guarded order index
	/// entry is the commit point, which is what enforces "at most one
	/// live request per order": a concurrent second assignment loses
	/// with a conflict instead of creating a duplicate. A crash between
	/// the two writes leaves only an orphan row, so the order stays
	/// assignable. An index entry whose row is gone (for example left
	/// behind by a cleared request) is unlinked and the insert retried,
	/// rather than wedging the order behind a phantom request.
	pub async fn create_request(&self, request: &DeliveryRequest) -> Result<(), StorageError> {
		self.store(StorageKey::DeliveryRequests.as_str(), &request.id, request)
			.await?;
		match self
			.insert(
				StorageKey::RequestByOrder.as_str(),
				&request.order_id,
				&request.id,
			)
			.await
		{
			Err(StorageError::Conflict) => {
				let indexed: Option<String> = self
					.retrieve_opt(StorageKey::RequestByOrder.as_str(), &request.order_id)
					.await?;
				if let Some(id) = indexed {
					let live: Option<DeliveryRequest> = self
						.retrieve_opt(StorageKey::DeliveryRequests.as_str(), &id)
						.await?;
					if live.is_some() {
						return Err(StorageError::Conflict);
					}
				}
				self.remove(StorageKey::RequestByOrder.as_str(), &request.order_id)
					.await?;
				self.insert(
					StorageKey::RequestByOrder.as_str(),
					&request.order_id,
					&request.id,
				)
				.await
			},
			result => result,
		}
	}

	/// Moves a request's status, guarded by the expected prior status,
	/// applying any timestamp directives. A request that ends without
	/// completing the order (rejected or cancelled) is unlinked from
	/// its order so the order becomes re-assignable; a delivered
	/// request stays linked as the order's record of completion.
	pub async fn update_request_status(
		&self,
		request_id: &str,
		expected: RequestStatus,
		new_status: RequestStatus,
		timestamps: RequestTimestamps,
	) -> Result<DeliveryRequest, StorageError> {
		let prior = self.get_request(request_id).await?;
		if prior.status != expected {
			return Err(StorageError::Conflict);
		}
		let mut next = prior.clone();
		next.status = new_status;
		if let Some(at) = timestamps.picked_up_at {
			next.picked_up_at = Some(at);
		}
		if let Some(at) = timestamps.delivered_at {
			next.delivered_at = Some(at);
		}
		self.swap(
			StorageKey::DeliveryRequests.as_str(),
			request_id,
			&prior,
			&next,
		)
		.await?;

		if matches!(
			new_status,
			RequestStatus::RejectedByPartner | RequestStatus::Cancelled
		) {
			self.remove(StorageKey::RequestByOrder.as_str(), &next.order_id)
				.await?;
		}
		Ok(next)
	}

	/// Deletes a terminal request from the partner's dashboard.
	pub async fn delete_request(&self, request_id: &str) -> Result<(), StorageError> {
		self.remove(StorageKey::DeliveryRequests.as_str(), request_id)
			.await
	}

	/// Returns all requests assigned to a partner, newest first.
	pub async fn requests_for_partner(
		&self,
		partner_id: &str,
	) -> Result<Vec<DeliveryRequest>, StorageError> {
		let mut requests: Vec<DeliveryRequest> = self
			.list::<DeliveryRequest>(StorageKey::DeliveryRequests.as_str())
			.await?
			.into_iter()
			.filter(|r| r.partner_id == partner_id)
			.collect();
		requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(requests)
	}

	/// Appends a partner response audit row. Write-once.
	pub async fn record_partner_response(
		&self,
		response: &PartnerResponse,
	) -> Result<(), StorageError> {
		self.insert(
			StorageKey::PartnerResponses.as_str(),
			&response.id,
			response,
		)
		.await
	}

	/// Returns the audit rows recorded against a request, newest first.
	pub async fn partner_responses_for_request(
		&self,
		request_id: &str,
	) -> Result<Vec<PartnerResponse>, StorageError> {
		let mut responses: Vec<PartnerResponse> = self
			.list::<PartnerResponse>(StorageKey::PartnerResponses.as_str())
			.await?
			.into_iter()
			.filter(|r| r.request_id == request_id)
			.collect();
		responses.sort_by(|a, b| b.responded_at.cmp(&a.responded_at));
		Ok(responses)
	}

	/// Records a partner position for an order out for delivery.
	///
	/// Last-write-wins by timestamp: a report older than the stored one
	/// is dropped, satisfying the "no ordering guarantee beyond
	/// timestamp comparison" contract. The write is guarded on the point
	/// it was compared against, so interleaved reports cannot bury a
	/// newer position under an older one.
	pub async fn record_position(&self, point: &TrackingPoint) -> Result<(), StorageError> {
		loop {
			let result = match self.latest_position(&point.order_id).await? {
				Some(current) if current.recorded_at > point.recorded_at => return Ok(()),
				Some(current) => {
					self.swap(StorageKey::Tracking.as_str(), &point.order_id, &current, point)
						.await
				},
				None => {
					self.insert(StorageKey::Tracking.as_str(), &point.order_id, point)
						.await
				},
			};
			match result {
				Err(StorageError::Conflict) => continue,
				other => return other,
			}
		}
	}

	/// Returns the most recent recorded position for an order.
	pub async fn latest_position(
		&self,
		order_id: &str,
	) -> Result<Option<TrackingPoint>, StorageError> {
		self.retrieve_opt(StorageKey::Tracking.as_str(), order_id)
			.await
	}

	/// Fetches a delivery partner profile.
	pub async fn get_partner(&self, partner_id: &str) -> Result<PartnerProfile, StorageError> {
		self.retrieve(StorageKey::Partners.as_str(), partner_id)
			.await
	}

	/// Persists a delivery partner profile.
	pub async fn store_partner(&self, partner: &PartnerProfile) -> Result<(), StorageError> {
		self.store(StorageKey::Partners.as_str(), &partner.id, partner)
			.await
	}

	/// Returns all registered delivery partners.
	pub async fn all_partners(&self) -> Result<Vec<PartnerProfile>, StorageError> {
		self.list(StorageKey::Partners.as_str()).await
	}

	/// Fetches a vendor profile.
	pub async fn get_vendor(&self, vendor_id: &str) -> Result<VendorProfile, StorageError> {
		self.retrieve(StorageKey::Vendors.as_str(), vendor_id).await
	}

	/// Persists a vendor profile.
	pub async fn store_vendor(&self, vendor: &VendorProfile) -> Result<(), StorageError> {
		self.store(StorageKey::Vendors.as_str(), &vendor.id, vendor)
			.await
	}

	/// Fetches an address from a customer's address book.
	pub async fn get_address(&self, address_id: &str) -> Result<Address, StorageError> {
		self.retrieve(StorageKey::Addresses.as_str(), address_id)
			.await
	}

	/// Persists an address.
	pub async fn store_address(&self, address: &Address) -> Result<(), StorageError> {
		self.store(StorageKey::Addresses.as_str(), &address.id, address)
			.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use dispatch_types::AddressSnapshot;
	use rust_decimal::Decimal;

	// Minimal fixtures; snapshot content is irrelevant to the guards
	// under test.
	fn snapshot() -> AddressSnapshot {
		AddressSnapshot {
			label: "Home".into(),
			full_address: "12 Market Lane".into(),
			city: "Pune".into(),
			state: "MH".into(),
			pincode: "411001".into(),
			phone: "9999999999".into(),
			coordinates: None,
		}
	}

	fn order(id: &str, status: OrderStatus) -> Order {
		Order {
			id: id.into(),
			customer_id: "cust-1".into(),
			vendor_id: "vendor-1".into(),
			address_id: "addr-1".into(),
			address: snapshot(),
			subtotal: Decimal::from(250),
			discount: Decimal::ZERO,
			final_amount: Decimal::from(250),
			payment_status: dispatch_types::PaymentStatus::Pending,
			payment_method: Some("cod".into()),
			delivery_status: status,
			alternate_drop: None,
			ordering_for_other: false,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn request(id: &str, order_id: &str, status: RequestStatus) -> DeliveryRequest {
		DeliveryRequest {
			id: id.into(),
			order_id: order_id.into(),
			partner_id: "partner-1".into(),
			vendor_id: "vendor-1".into(),
			status,
			picked_up_at: None,
			delivered_at: None,
			created_at: Utc::now(),
		}
	}

	fn store() -> StoreService {
		StoreService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn order_status_update_is_guarded() {
		let store = store();
		store
			.create_order(&order("o1", OrderStatus::Pending), &[])
			.await
			.unwrap();

		let updated = store
			.update_order_status("o1", OrderStatus::Pending, OrderStatus::Approved)
			.await
			.unwrap();
		assert_eq!(updated.delivery_status, OrderStatus::Approved);

		// A second writer holding the stale expectation loses.
		let err = store
			.update_order_status("o1", OrderStatus::Pending, OrderStatus::RejectedByVendor)
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}

	#[tokio::test]
	async fn at_most_one_live_request_per_order() {
		let store = store();
		store
			.create_request(&request("r1", "o1", RequestStatus::Assigned))
			.await
			.unwrap();

		let err = store
			.create_request(&request("r2", "o1", RequestStatus::Assigned))
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}

	#[tokio::test]
	async fn terminal_request_unlinks_and_allows_reassignment() {
		let store = store();
		store
			.create_request(&request("r1", "o1", RequestStatus::Assigned))
			.await
			.unwrap();

		store
			.update_request_status(
				"r1",
				RequestStatus::Assigned,
				RequestStatus::RejectedByPartner,
				RequestTimestamps::default(),
			)
			.await
			.unwrap();

		assert!(store.get_delivery_request("o1").await.unwrap().is_none());
		// The resolver can now create a fresh request for the order.
		store
			.create_request(&request("r2", "o1", RequestStatus::Assigned))
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn index_entry_without_a_row_does_not_wedge_assignment() {
		let store = store();
		// An entry pointing at a request row that was never written, as a
		// crash between the two creation writes used to leave behind.
		store
			.insert(
				StorageKey::RequestByOrder.as_str(),
				"o1",
				&"ghost".to_string(),
			)
			.await
			.unwrap();
		assert!(store.get_delivery_request("o1").await.unwrap().is_none());

		// The next assignment repairs the entry instead of conflicting.
		store
			.create_request(&request("r1", "o1", RequestStatus::Assigned))
			.await
			.unwrap();
		let live = store.get_delivery_request("o1").await.unwrap().unwrap();
		assert_eq!(live.id, "r1");

		// The guard still holds once a real request is linked.
		let err = store
			.create_request(&request("r2", "o1", RequestStatus::Assigned))
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}

	#[tokio::test]
	async fn losing_request_creation_leaves_no_index_entry() {
		let store = store();
		store
			.create_request(&request("r1", "o1", RequestStatus::Assigned))
			.await
			.unwrap();
		store
			.create_request(&request("r2", "o1", RequestStatus::Assigned))
			.await
			.unwrap_err();

		// The loser's row is an orphan; the index still points at the
		// winner and the order is not stuck behind the failed write.
		let live = store.get_delivery_request("o1").await.unwrap().unwrap();
		assert_eq!(live.id, "r1");
	}

	#[tokio::test]
	async fn request_timestamps_are_applied() {
		let store = store();
		store
			.create_request(&request("r1", "o1", RequestStatus::OutForDelivery))
			.await
			.unwrap();

		let at = Utc::now();
		let updated = store
			.update_request_status(
				"r1",
				RequestStatus::OutForDelivery,
				RequestStatus::Delivered,
				RequestTimestamps {
					delivered_at: Some(at),
					..Default::default()
				},
			)
			.await
			.unwrap();
		assert_eq!(updated.delivered_at, Some(at));
	}

	#[tokio::test]
	async fn stale_position_reports_are_dropped() {
		let store = store();
		let newer = TrackingPoint {
			order_id: "o1".into(),
			partner_id: "p1".into(),
			latitude: 18.52,
			longitude: 73.85,
			recorded_at: Utc::now(),
		};
		let older = TrackingPoint {
			recorded_at: newer.recorded_at - chrono::Duration::seconds(30),
			latitude: 18.50,
			..newer.clone()
		};

		store.record_position(&newer).await.unwrap();
		store.record_position(&older).await.unwrap();

		let latest = store.latest_position("o1").await.unwrap().unwrap();
		assert_eq!(latest.latitude, 18.52);
	}

	#[tokio::test]
	async fn interleaved_position_reports_keep_the_newest() {
		let store = store();
		let newer = TrackingPoint {
			order_id: "o1".into(),
			partner_id: "p1".into(),
			latitude: 18.52,
			longitude: 73.85,
			recorded_at: Utc::now(),
		};
		let older = TrackingPoint {
			recorded_at: newer.recorded_at - chrono::Duration::seconds(30),
			latitude: 18.50,
			..newer.clone()
		};

		// Whichever report lands first, the guarded write means the
		// newer timestamp is what survives.
		let (a, b) = tokio::join!(store.record_position(&older), store.record_position(&newer));
		a.unwrap();
		b.unwrap();

		let latest = store.latest_position("o1").await.unwrap().unwrap();
		assert_eq!(latest.recorded_at, newer.recorded_at);
	}

	#[tokio::test]
	async fn partner_responses_are_write_once() {
		let store = store();
		let response = PartnerResponse {
			id: "resp-1".into(),
			request_id: "r1".into(),
			partner_id: "p1".into(),
			action: dispatch_types::ResponseAction::Accepted,
			responded_at: Utc::now(),
		};
		store.record_partner_response(&response).await.unwrap();
		let err = store.record_partner_response(&response).await.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}
}
