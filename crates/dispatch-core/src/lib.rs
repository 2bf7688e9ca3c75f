//! Core coordinator engine for the dispatch fulfillment system.
//!
//! This crate provides the orchestration layer between the pure lifecycle
//! decision engine and the services around it: handlers that apply actor
//! requests against fresh persisted state, the lockstep writer that keeps
//! the order and its delivery request moving together, the assignment
//! sweep that offers approved orders to partners, and the event bus that
//! tells observing dashboards to refresh.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod state;

pub use builder::{BuilderError, CoordinatorBuilder, CoordinatorFactories};
pub use engine::{event_bus::EventBus, CoordinatorEngine, EngineError};
pub use handlers::{
	AssignmentHandler, CoordinatorError, CustomerHandler, PartnerHandler, VendorHandler,
};
pub use state::TransitionApplier;

#[cfg(test)]
mod tests {
	use super::*;
	use dispatch_assignment::implementations::nearest::NearestPartner;
	use dispatch_assignment::AssignmentService;
	use dispatch_config::Config;
	use dispatch_storage::implementations::memory::MemoryStorage;
	use dispatch_storage::StoreService;
	use dispatch_types::{
		Address, CheckoutItem, CheckoutRequest, Coordinates, EffectiveStatus, Order, OrderStatus,
		PartnerProfile, RequestStatus, ResponseAction, VendorProfile,
	};
	use rust_decimal::Decimal;
	use std::sync::Arc;

	const TEST_CONFIG: &str = r#"
		[coordinator]
		id = "test"

		[storage]
		primary = "memory"
		[storage.implementations.memory]

		[assignment]
		primary = "nearest"
		[assignment.implementations.nearest]
	"#;

	async fn engine() -> CoordinatorEngine {
		let config: Config = TEST_CONFIG.parse().unwrap();
		let store = Arc::new(StoreService::new(Box::new(MemoryStorage::new())));
		let assignment = Arc::new(AssignmentService::new(Box::new(NearestPartner::new(None))));
		let engine = CoordinatorEngine::new(config, store, assignment, EventBus::new(64));

		engine
			.store()
			.store_address(&Address {
				id: "addr-1".into(),
				customer_id: "cust-1".into(),
				label: "Home".into(),
				full_address: "12 Main St".into(),
				city: "Bengaluru".into(),
				state: "Karnataka".into(),
				pincode: "560001".into(),
				phone: "900000000".into(),
				coordinates: Some(Coordinates { lat: 12.95, lon: 77.60 }),
				is_default: true,
			})
			.await
			.unwrap();
		engine
			.store()
			.store_vendor(&VendorProfile {
				id: "vendor-1".into(),
				business_name: "Store".into(),
				coordinates: Some(Coordinates { lat: 12.97, lon: 77.59 }),
			})
			.await
			.unwrap();
		engine
	}

	async fn register_partner(engine: &CoordinatorEngine, id: &str) {
		engine
			.partner()
			.update_profile(PartnerProfile {
				id: id.into(),
				name: id.into(),
				coordinates: Some(Coordinates { lat: 12.96, lon: 77.58 }),
				active: true,
			})
			.await
			.unwrap();
	}

	async fn place_order(engine: &CoordinatorEngine) -> Order {
		engine
			.customer()
			.checkout(CheckoutRequest {
				customer_id: "cust-1".into(),
				vendor_id: "vendor-1".into(),
				address_id: "addr-1".into(),
				items: vec![CheckoutItem {
					product_id: "prod-1".into(),
					name: "Dosa batter".into(),
					price: Decimal::from(120),
					quantity: 2,
				}],
				discount: Some(Decimal::from(40)),
				payment_method: Some("cod".into()),
				alternate_drop: None,
				ordering_for_other: false,
			})
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn full_delivery_lifecycle() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;

		let order = place_order(&engine).await;
		assert_eq!(order.delivery_status, OrderStatus::Pending);
		assert_eq!(order.subtotal, Decimal::from(240));
		assert_eq!(order.final_amount, Decimal::from(200));

		let order = engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::Approved);

		let request = engine.assignment().assign(&order.id).await.unwrap();
		assert_eq!(request.status, RequestStatus::Assigned);
		assert_eq!(request.partner_id, "partner-1");

		let order = engine
			.partner()
			.accept("partner-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::Approved);

		let order = engine
			.partner()
			.mark_picked_up("partner-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::PickedUp);

		let order = engine
			.partner()
			.mark_out_for_delivery("partner-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::OutForDelivery);

		engine
			.tracking()
			.report_position("partner-1", &order.id, 12.96, 77.60)
			.await
			.unwrap();

		let order = engine
			.partner()
			.mark_delivered("partner-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::Delivered);

		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert_eq!(
			view.effective_status,
			EffectiveStatus::Request(RequestStatus::Delivered)
		);
		let request = view.request.unwrap();
		assert!(request.picked_up_at.is_some());
		assert!(request.delivered_at.is_some());
		assert!(view.last_position.is_some());
	}

	#[tokio::test]
	async fn approved_order_waits_until_a_partner_appears() {
		let engine = engine().await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();

		// No partner registered: the order stays approved with no
		// request, which observers see as "no partner available".
		let err = engine.assignment().assign(&order.id).await.unwrap_err();
		assert!(matches!(err, CoordinatorError::NoPartnerAvailable));
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert_eq!(
			view.effective_status,
			EffectiveStatus::Order(OrderStatus::Approved)
		);
		assert!(view.request.is_none());

		register_partner(&engine, "partner-1").await;
		let request = engine.assignment().assign(&order.id).await.unwrap();
		assert_eq!(request.status, RequestStatus::Assigned);

		// "Awaiting partner" is distinguishable: the request now exists.
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert_eq!(
			view.effective_status,
			EffectiveStatus::Request(RequestStatus::Assigned)
		);
	}

	#[tokio::test]
	async fn partner_rejection_frees_the_order_for_reassignment() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		let first = engine.assignment().assign(&order.id).await.unwrap();

		let order = engine
			.partner()
			.reject_assignment("partner-1", &order.id)
			.await
			.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::Approved);

		// The rejection left an audit row against the rejected request.
		let responses = engine
			.store()
			.partner_responses_for_request(&first.id)
			.await
			.unwrap();
		assert_eq!(responses.len(), 1);
		assert_eq!(responses[0].partner_id, "partner-1");
		assert_eq!(responses[0].action, ResponseAction::Rejected);

		let second = engine.assignment().assign(&order.id).await.unwrap();
		assert_ne!(second.id, first.id);
		assert_eq!(second.status, RequestStatus::Assigned);
	}

	#[tokio::test]
	async fn double_assignment_is_rejected() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();

		let err = engine.assignment().assign(&order.id).await.unwrap_err();
		assert!(matches!(err, CoordinatorError::Denied(_)));
	}

	#[tokio::test]
	async fn double_accept_is_rejected() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();

		engine
			.partner()
			.accept("partner-1", &order.id)
			.await
			.unwrap();
		let err = engine
			.partner()
			.accept("partner-1", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Denied(_)));
	}

	#[tokio::test]
	async fn cancellation_is_blocked_after_pickup() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();
		engine
			.partner()
			.accept("partner-1", &order.id)
			.await
			.unwrap();

		// Before pickup the customer may still cancel.
		let cancelled = engine.customer().cancel("cust-1", &order.id).await.unwrap();
		assert_eq!(cancelled.delivery_status, OrderStatus::Cancelled);
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert!(view.request.is_none());

		// After pickup it is denied.
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();
		engine
			.partner()
			.accept("partner-1", &order.id)
			.await
			.unwrap();
		engine
			.partner()
			.mark_picked_up("partner-1", &order.id)
			.await
			.unwrap();
		let err = engine
			.customer()
			.cancel("cust-1", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Denied(_)));
	}

	#[tokio::test]
	async fn vendor_reject_cancels_an_unanswered_offer() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();

		let order = engine.vendor().reject("vendor-1", &order.id).await.unwrap();
		assert_eq!(order.delivery_status, OrderStatus::RejectedByVendor);
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert!(view.request.is_none());
	}

	#[tokio::test]
	async fn actors_cannot_touch_records_they_do_not_own() {
		let engine = engine().await;
		register_partner(&engine, "partner-1").await;
		let order = place_order(&engine).await;

		let err = engine
			.vendor()
			.approve("vendor-2", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Unauthorized(_)));

		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();
		engine.assignment().assign(&order.id).await.unwrap();
		let err = engine
			.partner()
			.accept("partner-2", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Unauthorized(_)));

		let err = engine
			.customer()
			.cancel("cust-2", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Unauthorized(_)));
	}

	#[tokio::test]
	async fn deletion_requires_a_terminal_order() {
		let engine = engine().await;
		let order = place_order(&engine).await;

		let err = engine
			.customer()
			.delete_order("cust-1", &order.id)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Conflict(_)));

		engine.customer().cancel("cust-1", &order.id).await.unwrap();
		engine
			.customer()
			.delete_order("cust-1", &order.id)
			.await
			.unwrap();
		let err = engine.customer().order_view(&order.id).await.unwrap_err();
		assert!(matches!(err, CoordinatorError::NotFound(_)));
	}

	#[tokio::test]
	async fn sweep_assigns_waiting_orders() {
		let engine = engine().await;
		let order = place_order(&engine).await;
		engine
			.vendor()
			.approve("vendor-1", &order.id)
			.await
			.unwrap();

		engine.assignment().sweep().await;
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert!(view.request.is_none());

		register_partner(&engine, "partner-1").await;
		engine.assignment().sweep().await;
		let view = engine.customer().order_view(&order.id).await.unwrap();
		assert_eq!(
			view.effective_status,
			EffectiveStatus::Request(RequestStatus::Assigned)
		);
	}

	#[tokio::test]
	async fn checkout_validates_the_cart() {
		let engine = engine().await;
		let err = engine
			.customer()
			.checkout(CheckoutRequest {
				customer_id: "cust-1".into(),
				vendor_id: "vendor-1".into(),
				address_id: "addr-1".into(),
				items: vec![],
				discount: None,
				payment_method: None,
				alternate_drop: None,
				ordering_for_other: false,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::InvalidRequest(_)));

		let err = engine
			.customer()
			.checkout(CheckoutRequest {
				customer_id: "cust-2".into(),
				vendor_id: "vendor-1".into(),
				address_id: "addr-1".into(),
				items: vec![CheckoutItem {
					product_id: "prod-1".into(),
					name: "Dosa batter".into(),
					price: Decimal::from(120),
					quantity: 1,
				}],
				discount: None,
				payment_method: None,
				alternate_drop: None,
				ordering_for_other: false,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::Unauthorized(_)));
	}
}
