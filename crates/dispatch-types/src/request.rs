//! Delivery request types for the dispatch coordinator.
//!
//! A delivery request is the partner-facing half of the same lifecycle as
//! the order. Its status and the order's delivery status must always
//! represent the same logical stage; the lifecycle engine is the only code
//! allowed to move either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The delivery-partner-facing half of an order's lifecycle.
///
/// Created by the assignment resolver when an order is approved and a
/// partner is found; mutated only by the assigned partner afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRequest {
	/// Unique identifier for this request.
	pub id: String,
	/// Order this request fulfills.
	pub order_id: String,
	/// Partner assigned to this request.
	pub partner_id: String,
	/// Vendor the order is collected from (denormalized for display).
	pub vendor_id: String,
	/// Current status of the request.
	pub status: RequestStatus,
	/// Timestamp set when the partner marks the order picked up.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub picked_up_at: Option<DateTime<Utc>>,
	/// Timestamp set when the partner marks the order delivered.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivered_at: Option<DateTime<Utc>>,
	/// Timestamp when this request was created.
	pub created_at: DateTime<Utc>,
}

impl DeliveryRequest {
	/// Returns true once the request has reached a terminal status.
	pub fn is_terminal(&self) -> bool {
		self.status.is_terminal()
	}
}

/// Status of a delivery request.
///
/// Serialized to the exact snake_case wire vocabulary; the strings are
/// persisted and must not change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
	/// Request created and waiting for the partner's decision.
	Assigned,
	/// Partner accepted the assignment.
	Accepted,
	/// Partner declined the assignment. Terminal; the order stays
	/// approved and is eligible for re-assignment.
	RejectedByPartner,
	/// Partner collected the order from the vendor.
	PickedUp,
	/// Partner is en route to the customer.
	OutForDelivery,
	/// Order reached the customer. Terminal.
	Delivered,
	/// Order was cancelled while the request was live. Terminal.
	Cancelled,
}

impl RequestStatus {
	/// Returns the persisted wire value for this status.
	pub fn as_str(&self) -> &'static str {
		match self {
			RequestStatus::Assigned => "assigned",
			RequestStatus::Accepted => "accepted",
			RequestStatus::RejectedByPartner => "rejected_by_partner",
			RequestStatus::PickedUp => "picked_up",
			RequestStatus::OutForDelivery => "out_for_delivery",
			RequestStatus::Delivered => "delivered",
			RequestStatus::Cancelled => "cancelled",
		}
	}

	/// Returns true for statuses that permit no further transitions.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			RequestStatus::RejectedByPartner | RequestStatus::Delivered | RequestStatus::Cancelled
		)
	}

	/// Returns an iterator over all request statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Assigned,
			Self::Accepted,
			Self::RejectedByPartner,
			Self::PickedUp,
			Self::OutForDelivery,
			Self::Delivered,
			Self::Cancelled,
		]
		.into_iter()
	}
}

impl fmt::Display for RequestStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Append-only audit record of a partner's accept/reject decision.
///
/// Write-once; never mutated, never consulted for current-state decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerResponse {
	/// Unique identifier for this audit row.
	pub id: String,
	/// Request the decision was made on.
	pub request_id: String,
	/// Partner who made the decision.
	pub partner_id: String,
	/// The decision taken.
	pub action: ResponseAction,
	/// Timestamp of the decision.
	pub responded_at: DateTime<Utc>,
}

/// A partner's decision on an assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseAction {
	/// Partner accepted the assignment.
	Accepted,
	/// Partner declined the assignment.
	Rejected,
}

impl fmt::Display for ResponseAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResponseAction::Accepted => f.write_str("accepted"),
			ResponseAction::Rejected => f.write_str("rejected"),
		}
	}
}
