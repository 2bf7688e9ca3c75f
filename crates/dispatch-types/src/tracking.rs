//! Position tracking types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded partner position tied to an order out for delivery.
///
/// Consumers only read the most recent point per order; last-write-wins
/// by `recorded_at` with no ordering guarantee beyond the timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingPoint {
	/// Order the position belongs to.
	pub order_id: String,
	/// Partner the position was reported by.
	pub partner_id: String,
	/// Latitude in decimal degrees.
	pub latitude: f64,
	/// Longitude in decimal degrees.
	pub longitude: f64,
	/// Timestamp the position was recorded at.
	pub recorded_at: DateTime<Utc>,
}
