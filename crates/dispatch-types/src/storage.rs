//! Storage namespace keys for persisted collections.

use std::str::FromStr;

/// Storage keys for different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing order records
	Orders,
	/// Key for storing order item snapshots
	OrderItems,
	/// Key for storing delivery requests
	DeliveryRequests,
	/// Key for mapping order ids to their live delivery request
	RequestByOrder,
	/// Key for storing append-only partner response audit rows
	PartnerResponses,
	/// Key for storing customer addresses
	Addresses,
	/// Key for storing delivery partner profiles
	Partners,
	/// Key for storing vendor profiles
	Vendors,
	/// Key for storing the latest tracking point per order
	Tracking,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Orders => "orders",
			StorageKey::OrderItems => "order_items",
			StorageKey::DeliveryRequests => "delivery_requests",
			StorageKey::RequestByOrder => "request_by_order",
			StorageKey::PartnerResponses => "partner_responses",
			StorageKey::Addresses => "addresses",
			StorageKey::Partners => "partners",
			StorageKey::Vendors => "vendors",
			StorageKey::Tracking => "tracking",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Orders,
			Self::OrderItems,
			Self::DeliveryRequests,
			Self::RequestByOrder,
			Self::PartnerResponses,
			Self::Addresses,
			Self::Partners,
			Self::Vendors,
			Self::Tracking,
		]
		.into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"order_items" => Ok(Self::OrderItems),
			"delivery_requests" => Ok(Self::DeliveryRequests),
			"request_by_order" => Ok(Self::RequestByOrder),
			"partner_responses" => Ok(Self::PartnerResponses),
			"addresses" => Ok(Self::Addresses),
			"partners" => Ok(Self::Partners),
			"vendors" => Ok(Self::Vendors),
			"tracking" => Ok(Self::Tracking),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
