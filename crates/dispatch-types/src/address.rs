//! Delivery address and coordinate types.

use serde::{Deserialize, Serialize};

/// A geographic coordinate pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
	/// Latitude in decimal degrees.
	pub lat: f64,
	/// Longitude in decimal degrees.
	pub lon: f64,
}

/// A saved delivery destination owned by a customer.
///
/// Addresses live in the customer's address book and may be edited at any
/// time; orders copy the fields they need at checkout (see
/// [`AddressSnapshot`]) so history stays intact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
	/// Unique identifier for this address.
	pub id: String,
	/// Owning customer.
	pub customer_id: String,
	/// Short label ("Home", "Office").
	pub label: String,
	/// Free-form street address.
	pub full_address: String,
	/// City name.
	pub city: String,
	/// State name.
	pub state: String,
	/// Postal code.
	pub pincode: String,
	/// Contact phone for the destination.
	pub phone: String,
	/// Geocoded position, when available.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coordinates: Option<Coordinates>,
	/// Whether this is the customer's default address.
	#[serde(default)]
	pub is_default: bool,
}

/// Point-in-time copy of an address taken at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressSnapshot {
	/// Short label ("Home", "Office").
	pub label: String,
	/// Free-form street address.
	pub full_address: String,
	/// City name.
	pub city: String,
	/// State name.
	pub state: String,
	/// Postal code.
	pub pincode: String,
	/// Contact phone for the destination.
	pub phone: String,
	/// Geocoded position, when available.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coordinates: Option<Coordinates>,
}

impl From<&Address> for AddressSnapshot {
	fn from(address: &Address) -> Self {
		Self {
			label: address.label.clone(),
			full_address: address.full_address.clone(),
			city: address.city.clone(),
			state: address.state.clone(),
			pincode: address.pincode.clone(),
			phone: address.phone.clone(),
			coordinates: address.coordinates,
		}
	}
}
