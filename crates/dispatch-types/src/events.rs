//! Event types for change notifications between observers.
//!
//! Every status-changing action emits an event so dependent views (the
//! customer's orders page, the vendor dashboard, the partner dashboard)
//! invalidate their cached state. Delivery is at-least-once and possibly
//! duplicated; consumers must refresh idempotently and keep a polling
//! fallback for missed events.

use serde::{Deserialize, Serialize};

use crate::{OrderStatus, RequestStatus, ResponseAction};

/// Main event type encompassing all coordinator events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoordinatorEvent {
	/// Events about order records.
	Order(OrderEvent),
	/// Events about delivery request records.
	Request(RequestEvent),
	/// Events about position tracking.
	Tracking(TrackingEvent),
}

/// Events about order records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order was created at checkout.
	Created {
		order_id: String,
		customer_id: String,
	},
	/// An order's delivery status changed.
	StatusChanged {
		order_id: String,
		from: OrderStatus,
		to: OrderStatus,
	},
	/// A terminal order was deleted by its owner.
	Deleted { order_id: String },
}

/// Events about delivery request records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequestEvent {
	/// A request was created by the assignment resolver.
	Created {
		request_id: String,
		order_id: String,
		partner_id: String,
	},
	/// A request's status changed.
	StatusChanged {
		request_id: String,
		order_id: String,
		from: RequestStatus,
		to: RequestStatus,
	},
	/// A partner recorded an accept/reject decision.
	PartnerResponded {
		request_id: String,
		partner_id: String,
		action: ResponseAction,
	},
	/// A terminal request was removed from the partner's dashboard.
	Deleted { request_id: String },
}

/// Events about position tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackingEvent {
	/// A partner position was recorded for an order out for delivery.
	PositionRecorded {
		order_id: String,
		partner_id: String,
	},
}
