//! Order types for the dispatch coordinator.
//!
//! This module defines the customer-facing half of the fulfillment lifecycle:
//! the order record, its immutable item snapshots and the delivery status
//! vocabulary used as wire values by every client.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AddressSnapshot, Coordinates};

/// One shopping transaction owned by a customer.
///
/// The order is the shared record all three actors observe and mutate.
/// `delivery_status` is the primary lifecycle field; once it reaches a
/// terminal status the record is immutable except for deletion by the
/// owning customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Identifier of the owning customer.
	pub customer_id: String,
	/// Identifier of the vendor fulfilling this order.
	pub vendor_id: String,
	/// Identifier of the address chosen at checkout.
	pub address_id: String,
	/// Address fields copied at checkout so later edits to the address
	/// book do not rewrite historical delivery details.
	pub address: AddressSnapshot,
	/// Sum of item snapshot prices times quantities.
	pub subtotal: Decimal,
	/// Discount applied at checkout.
	pub discount: Decimal,
	/// Amount charged after discount.
	pub final_amount: Decimal,
	/// Payment state of the order.
	pub payment_status: PaymentStatus,
	/// Payment method tag (e.g. "cod", "upi").
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_method: Option<String>,
	/// Current lifecycle status of the order.
	pub delivery_status: OrderStatus,
	/// Override destination when ordering on someone else's behalf.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub alternate_drop: Option<Coordinates>,
	/// Discriminator for the alternate drop destination.
	#[serde(default)]
	pub ordering_for_other: bool,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this order was last updated.
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Returns true once the order has reached a terminal status.
	pub fn is_terminal(&self) -> bool {
		self.delivery_status.is_terminal()
	}
}

/// Immutable snapshot of a purchased product line.
///
/// Name and price are copied from the live product at checkout so later
/// catalog edits do not rewrite order history. Items are created atomically
/// with the order and deleted only by cascading order deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Unique identifier for this line.
	pub id: String,
	/// Order this line belongs to.
	pub order_id: String,
	/// Reference to the live product (informational only).
	pub product_id: String,
	/// Product name as it read at checkout.
	pub snapshot_name: String,
	/// Unit price as it read at checkout.
	pub snapshot_price: Decimal,
	/// Quantity purchased.
	pub quantity: u32,
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
	/// Payment has not been captured.
	Pending,
	/// Payment has been captured.
	Paid,
}

/// Lifecycle status of an order.
///
/// These variants serialize to the exact snake_case wire vocabulary shared
/// with every client; the strings are persisted and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order has been placed and awaits vendor review.
	Pending,
	/// Vendor accepted the order; a delivery partner may not be found yet.
	Approved,
	/// A delivery request has been created for a nearby partner.
	Assigned,
	/// Partner collected the order from the vendor.
	PickedUp,
	/// Partner is en route to the customer.
	OutForDelivery,
	/// Order reached the customer. Terminal.
	Delivered,
	/// Customer cancelled before pickup. Terminal.
	Cancelled,
	/// Vendor rejected the order before assignment. Terminal.
	RejectedByVendor,
}

impl OrderStatus {
	/// Returns the persisted wire value for this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Approved => "approved",
			OrderStatus::Assigned => "assigned",
			OrderStatus::PickedUp => "picked_up",
			OrderStatus::OutForDelivery => "out_for_delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::RejectedByVendor => "rejected_by_vendor",
		}
	}

	/// Returns true for statuses that permit no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::RejectedByVendor
		)
	}

	/// Returns an iterator over all order statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Approved,
			Self::Assigned,
			Self::PickedUp,
			Self::OutForDelivery,
			Self::Delivered,
			Self::Cancelled,
			Self::RejectedByVendor,
		]
		.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
