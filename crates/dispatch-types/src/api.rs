//! API types for HTTP endpoints and request/response structures.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
	ActorRole, Coordinates, DeliveryRequest, Order, OrderItem, OrderStatus, RequestStatus,
	TrackingPoint,
};

/// Standard error body returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable machine-readable error code.
	pub error: String,
	/// Human-readable explanation of which precondition failed.
	pub message: String,
}

/// Checkout payload: one line of the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
	/// Product being purchased.
	pub product_id: String,
	/// Product name at checkout time.
	pub name: String,
	/// Unit price at checkout time.
	pub price: Decimal,
	/// Quantity purchased.
	pub quantity: u32,
}

/// Checkout payload creating a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
	/// Customer placing the order.
	pub customer_id: String,
	/// Vendor the cart belongs to.
	pub vendor_id: String,
	/// Address chosen from the customer's address book.
	pub address_id: String,
	/// Cart lines to snapshot onto the order.
	pub items: Vec<CheckoutItem>,
	/// Discount applied at checkout.
	#[serde(default)]
	pub discount: Option<Decimal>,
	/// Payment method tag.
	#[serde(default)]
	pub payment_method: Option<String>,
	/// Override destination when ordering on someone else's behalf.
	#[serde(default)]
	pub alternate_drop: Option<Coordinates>,
	/// Discriminator for the alternate drop destination.
	#[serde(default)]
	pub ordering_for_other: bool,
}

/// A requested lifecycle transition on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionPayload {
	/// Role the caller acts as.
	pub role: ActorRole,
	/// Identity the caller acts as (customer, vendor or partner id).
	pub actor_id: String,
	/// Requested action, by wire name: approve, reject, accept,
	/// reject_assignment, mark_picked_up, mark_out_for_delivery,
	/// mark_delivered, cancel.
	pub action: String,
}

/// An order with its items and live request as observers see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
	/// The order record.
	pub order: Order,
	/// Immutable item snapshots.
	pub items: Vec<OrderItem>,
	/// The live delivery request, when one exists.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub request: Option<DeliveryRequest>,
	/// The status dashboards should display.
	pub effective_status: EffectiveStatus,
	/// Most recent partner position while out for delivery.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_position: Option<TrackingPoint>,
}

/// The status a dashboard should display for an order.
///
/// The request status shadows the order status once a request exists,
/// which is also what makes "awaiting partner" (request assigned)
/// distinguishable from "no partner available" (request absent).
///
/// On the wire both variants are the bare status string. Wire names
/// shared by the two vocabularies (`picked_up`, `out_for_delivery`,
/// `delivered`, `cancelled`) deserialize as the order variant, so the
/// variant does not survive a round trip; `OrderView::request` is the
/// authoritative discriminator, and readers that care recompute via
/// [`EffectiveStatus::of`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EffectiveStatus {
	/// No live request; the order status stands alone.
	Order(OrderStatus),
	/// A live request exists; its status is what observers track.
	Request(RequestStatus),
}

impl EffectiveStatus {
	/// Computes the display status for an order/request pair.
	pub fn of(order: &Order, request: Option<&DeliveryRequest>) -> Self {
		match request {
			Some(req) => EffectiveStatus::Request(req.status),
			None => EffectiveStatus::Order(order.delivery_status),
		}
	}

	/// Returns the wire string of the displayed status.
	pub fn as_str(&self) -> &'static str {
		match self {
			EffectiveStatus::Order(status) => status.as_str(),
			EffectiveStatus::Request(status) => status.as_str(),
		}
	}
}

/// A partner position report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
	/// Reporting partner.
	pub partner_id: String,
	/// Latitude in decimal degrees.
	pub lat: f64,
	/// Longitude in decimal degrees.
	pub lon: f64,
}
