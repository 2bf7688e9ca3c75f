//! Delivery partner and vendor profile types.

use serde::{Deserialize, Serialize};

use crate::Coordinates;

/// A registered delivery partner.
///
/// Partners publish their current location from their device; the
/// assignment resolver only considers partners that are active and located.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerProfile {
	/// Unique identifier for this partner.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Last reported position, when set.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coordinates: Option<Coordinates>,
	/// Whether the partner is currently taking assignments.
	#[serde(default)]
	pub active: bool,
}

/// A registered vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorProfile {
	/// Unique identifier for this vendor.
	pub id: String,
	/// Business name shown to customers and partners.
	pub business_name: String,
	/// Pickup location, when set. Assignment requires it.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub coordinates: Option<Coordinates>,
}
