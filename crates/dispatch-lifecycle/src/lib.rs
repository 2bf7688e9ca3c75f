//! Pure lifecycle engine for the dispatch coordinator.
//!
//! Given the current order status, the current request status (if a request
//! exists), the acting role and the requested action, [`decide`] returns
//! either the statuses both records must move to plus the side effects the
//! caller must execute, or a denial naming the precondition that failed.
//!
//! The engine is deliberately free of storage and transport so the full
//! transition table can be tested exhaustively. It never mutates anything:
//! callers apply the returned [`Outcome`] through the record store, whose
//! compare-and-swap updates are what make concurrent actors safe.

use dispatch_types::{ActorRole, DeliveryRequest, Order, OrderStatus, RequestStatus, ResponseAction};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Actions an actor can request on an order's lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
	/// Vendor accepts a pending order.
	Approve,
	/// Vendor rejects an order before a partner accepts it.
	Reject,
	/// Resolver creates a delivery request for an approved order.
	Assign,
	/// Partner accepts their assignment.
	Accept,
	/// Partner declines their assignment.
	RejectAssignment,
	/// Partner collected the order from the vendor.
	MarkPickedUp,
	/// Partner left the vendor towards the customer.
	MarkOutForDelivery,
	/// Partner handed the order to the customer.
	MarkDelivered,
	/// Customer cancels before pickup.
	Cancel,
}

impl Action {
	/// Returns the wire name of this action.
	pub fn as_str(&self) -> &'static str {
		match self {
			Action::Approve => "approve",
			Action::Reject => "reject",
			Action::Assign => "assign",
			Action::Accept => "accept",
			Action::RejectAssignment => "reject_assignment",
			Action::MarkPickedUp => "mark_picked_up",
			Action::MarkOutForDelivery => "mark_out_for_delivery",
			Action::MarkDelivered => "mark_delivered",
			Action::Cancel => "cancel",
		}
	}

	/// The single role permitted to request this action.
	pub fn required_role(&self) -> ActorRole {
		match self {
			Action::Approve | Action::Reject => ActorRole::Vendor,
			Action::Assign => ActorRole::Resolver,
			Action::Accept
			| Action::RejectAssignment
			| Action::MarkPickedUp
			| Action::MarkOutForDelivery
			| Action::MarkDelivered => ActorRole::DeliveryPartner,
			Action::Cancel => ActorRole::Customer,
		}
	}

	/// Returns an iterator over all actions.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Approve,
			Self::Reject,
			Self::Assign,
			Self::Accept,
			Self::RejectAssignment,
			Self::MarkPickedUp,
			Self::MarkOutForDelivery,
			Self::MarkDelivered,
			Self::Cancel,
		]
		.into_iter()
	}
}

impl fmt::Display for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Action {
	type Err = UnknownAction;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"approve" => Ok(Self::Approve),
			"reject" => Ok(Self::Reject),
			"assign" => Ok(Self::Assign),
			"accept" => Ok(Self::Accept),
			"reject_assignment" => Ok(Self::RejectAssignment),
			"mark_picked_up" => Ok(Self::MarkPickedUp),
			"mark_out_for_delivery" => Ok(Self::MarkOutForDelivery),
			"mark_delivered" => Ok(Self::MarkDelivered),
			"cancel" => Ok(Self::Cancel),
			other => Err(UnknownAction(other.to_string())),
		}
	}
}

/// Error returned when parsing an unrecognized action name.
#[derive(Debug, Error)]
#[error("Unknown action: {0}")]
pub struct UnknownAction(pub String);

/// The slice of shared state the engine decides over.
///
/// Callers build this from freshly read records; cached copies must never
/// be trusted for decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleView {
	/// Current delivery status of the order.
	pub order: OrderStatus,
	/// Current status of the live delivery request, if one exists.
	pub request: Option<RequestStatus>,
}

impl LifecycleView {
	pub fn new(order: OrderStatus, request: Option<RequestStatus>) -> Self {
		Self { order, request }
	}

	/// Builds a view from freshly loaded records.
	pub fn of(order: &Order, request: Option<&DeliveryRequest>) -> Self {
		Self {
			order: order.delivery_status,
			request: request.map(|r| r.status),
		}
	}
}

/// Side effects the caller must execute alongside the status writes.
///
/// The engine specifies them but never executes them itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
	/// Create the delivery request row before writing its status.
	CreateRequest,
	/// Append a partner response audit row. Non-gating: a failed audit
	/// write is logged, not surfaced.
	RecordPartnerResponse(ResponseAction),
	/// Stamp the request's picked_up_at with the transition time.
	SetPickedUpAt,
	/// Stamp the request's delivered_at with the transition time.
	SetDeliveredAt,
	/// Emit a change notification so observing dashboards refresh.
	/// Delivery is at-least-once; consumers tolerate duplicates.
	NotifyObservers,
}

/// The result of an allowed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
	/// Status the order must hold after the transition.
	pub next_order: OrderStatus,
	/// Status the request must hold after the transition, when one
	/// exists or is being created. `None` means the request (if any)
	/// is left untouched.
	pub next_request: Option<RequestStatus>,
	/// Side effects the caller must execute in the same logical unit.
	pub effects: Vec<SideEffect>,
}

impl Outcome {
	fn new(next_order: OrderStatus, next_request: Option<RequestStatus>) -> Self {
		Self {
			next_order,
			next_request,
			effects: vec![SideEffect::NotifyObservers],
		}
	}

	fn with(mut self, effect: SideEffect) -> Self {
		self.effects.insert(self.effects.len() - 1, effect);
		self
	}
}

/// A denied transition, naming the precondition that failed.
///
/// Denials are normal control flow: every invalid (state, role, action)
/// triple maps to one of these, never to a panic or silent no-op.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionDenied {
	/// The order is already in a terminal status.
	#[error("order is already {status} and permits no further transitions")]
	Terminal { status: OrderStatus },
	/// The acting role does not hold this action.
	#[error("role {role} is not permitted to {action}")]
	Forbidden { role: ActorRole, action: Action },
	/// The order is not in the status the action requires.
	#[error("cannot {action}: order is {actual}, not {expected}")]
	OrderState {
		action: Action,
		expected: &'static str,
		actual: OrderStatus,
	},
	/// A live delivery request already exists.
	#[error("a delivery request already exists for this order")]
	RequestPresent,
	/// Assign was requested for an order that already has a request.
	#[error("order already assigned to a partner")]
	AlreadyAssigned,
	/// The action requires a delivery request and none exists.
	#[error("cannot {action}: no delivery request exists for this order")]
	NoRequest { action: Action },
	/// The request is not in the status the action requires.
	#[error("cannot {action}: request is {actual}, not {expected}")]
	RequestState {
		action: Action,
		expected: RequestStatus,
		actual: RequestStatus,
	},
	/// Cancellation was requested after pickup.
	#[error("cannot cancel after pickup")]
	CancelAfterPickup,
}

/// Decides whether `role` may apply `action` to the state in `view`.
///
/// Returns the statuses both records must move to plus required side
/// effects, or the denial reason. Pure: same inputs, same answer.
pub fn decide(
	view: &LifecycleView,
	role: ActorRole,
	action: Action,
) -> Result<Outcome, TransitionDenied> {
	// Terminal orders are sinks for every actor and action.
	if view.order.is_terminal() {
		return Err(TransitionDenied::Terminal { status: view.order });
	}

	if role != action.required_role() {
		return Err(TransitionDenied::Forbidden { role, action });
	}

	match action {
		Action::Approve => {
			if view.request.is_some() {
				return Err(TransitionDenied::RequestPresent);
			}
			expect_order(view, action, OrderStatus::Pending, "pending")?;
			Ok(Outcome::new(OrderStatus::Approved, None))
		},
		Action::Reject => {
			if !matches!(
				view.order,
				OrderStatus::Pending | OrderStatus::Approved | OrderStatus::Assigned
			) {
				return Err(TransitionDenied::OrderState {
					action,
					expected: "pending, approved or assigned",
					actual: view.order,
				});
			}
			match view.request {
				// Pre-assignment: only the order moves.
				None => Ok(Outcome::new(OrderStatus::RejectedByVendor, None)),
				// A request exists but the partner has not accepted yet;
				// the request is cancelled in the same unit so the pair
				// cannot diverge.
				Some(RequestStatus::Assigned) => Ok(Outcome::new(
					OrderStatus::RejectedByVendor,
					Some(RequestStatus::Cancelled),
				)),
				Some(actual) => Err(TransitionDenied::RequestState {
					action,
					expected: RequestStatus::Assigned,
					actual,
				}),
			}
		},
		Action::Assign => {
			if view.request.is_some() {
				return Err(TransitionDenied::AlreadyAssigned);
			}
			expect_order(view, action, OrderStatus::Approved, "approved")?;
			Ok(
				Outcome::new(OrderStatus::Assigned, Some(RequestStatus::Assigned))
					.with(SideEffect::CreateRequest),
			)
		},
		Action::Accept => {
			expect_request(view, action, RequestStatus::Assigned)?;
			// The order is explicitly written back to approved even if it
			// drifted; display follows the request from here on.
			Ok(
				Outcome::new(OrderStatus::Approved, Some(RequestStatus::Accepted))
					.with(SideEffect::RecordPartnerResponse(ResponseAction::Accepted)),
			)
		},
		Action::RejectAssignment => {
			expect_request(view, action, RequestStatus::Assigned)?;
			// Order returns to approved and stays eligible for
			// re-assignment by the resolver.
			Ok(Outcome::new(
				OrderStatus::Approved,
				Some(RequestStatus::RejectedByPartner),
			)
			.with(SideEffect::RecordPartnerResponse(ResponseAction::Rejected)))
		},
		Action::MarkPickedUp => {
			expect_request(view, action, RequestStatus::Accepted)?;
			Ok(
				Outcome::new(OrderStatus::PickedUp, Some(RequestStatus::PickedUp))
					.with(SideEffect::SetPickedUpAt),
			)
		},
		Action::MarkOutForDelivery => {
			expect_request(view, action, RequestStatus::PickedUp)?;
			Ok(Outcome::new(
				OrderStatus::OutForDelivery,
				Some(RequestStatus::OutForDelivery),
			))
		},
		Action::MarkDelivered => {
			expect_request(view, action, RequestStatus::OutForDelivery)?;
			Ok(
				Outcome::new(OrderStatus::Delivered, Some(RequestStatus::Delivered))
					.with(SideEffect::SetDeliveredAt),
			)
		},
		Action::Cancel => {
			if matches!(
				view.order,
				OrderStatus::PickedUp | OrderStatus::OutForDelivery
			) || matches!(
				view.request,
				Some(RequestStatus::PickedUp) | Some(RequestStatus::OutForDelivery)
			) {
				return Err(TransitionDenied::CancelAfterPickup);
			}
			// A live request is cancelled in the same unit; a request
			// already terminal (partner rejected) is left as history.
			let next_request = view
				.request
				.filter(|status| !status.is_terminal())
				.map(|_| RequestStatus::Cancelled);
			Ok(Outcome::new(OrderStatus::Cancelled, next_request))
		},
	}
}

/// Whether the owning actor may delete (hide) the order.
///
/// Deletion is only permitted once the order is terminal.
pub fn deletion_allowed(status: OrderStatus) -> bool {
	status.is_terminal()
}

fn expect_order(
	view: &LifecycleView,
	action: Action,
	expected: OrderStatus,
	expected_name: &'static str,
) -> Result<(), TransitionDenied> {
	if view.order != expected {
		return Err(TransitionDenied::OrderState {
			action,
			expected: expected_name,
			actual: view.order,
		});
	}
	Ok(())
}

fn expect_request(
	view: &LifecycleView,
	action: Action,
	expected: RequestStatus,
) -> Result<(), TransitionDenied> {
	match view.request {
		None => Err(TransitionDenied::NoRequest { action }),
		Some(actual) if actual != expected => Err(TransitionDenied::RequestState {
			action,
			expected,
			actual,
		}),
		Some(_) => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn view(order: OrderStatus, request: Option<RequestStatus>) -> LifecycleView {
		LifecycleView::new(order, request)
	}

	#[test]
	fn vendor_approves_pending_order() {
		let outcome = decide(
			&view(OrderStatus::Pending, None),
			ActorRole::Vendor,
			Action::Approve,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::Approved);
		assert_eq!(outcome.next_request, None);
		assert!(outcome.effects.contains(&SideEffect::NotifyObservers));
	}

	#[test]
	fn vendor_rejects_before_assignment() {
		for order in [OrderStatus::Pending, OrderStatus::Approved] {
			let outcome = decide(&view(order, None), ActorRole::Vendor, Action::Reject).unwrap();
			assert_eq!(outcome.next_order, OrderStatus::RejectedByVendor);
			assert_eq!(outcome.next_request, None);
		}
	}

	#[test]
	fn vendor_reject_cancels_unaccepted_request() {
		let outcome = decide(
			&view(OrderStatus::Assigned, Some(RequestStatus::Assigned)),
			ActorRole::Vendor,
			Action::Reject,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::RejectedByVendor);
		assert_eq!(outcome.next_request, Some(RequestStatus::Cancelled));
	}

	#[test]
	fn vendor_cannot_reject_after_acceptance() {
		let err = decide(
			&view(OrderStatus::Approved, Some(RequestStatus::Accepted)),
			ActorRole::Vendor,
			Action::Reject,
		)
		.unwrap_err();
		assert!(matches!(err, TransitionDenied::RequestState { .. }));
	}

	#[test]
	fn resolver_assigns_approved_order() {
		let outcome = decide(
			&view(OrderStatus::Approved, None),
			ActorRole::Resolver,
			Action::Assign,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::Assigned);
		assert_eq!(outcome.next_request, Some(RequestStatus::Assigned));
		assert!(outcome.effects.contains(&SideEffect::CreateRequest));
	}

	#[test]
	fn assign_is_rejected_when_request_exists() {
		// Idempotence: a second assign is an explicit conflict, never a
		// duplicate request.
		for status in RequestStatus::all() {
			let result = decide(
				&view(OrderStatus::Assigned, Some(status)),
				ActorRole::Resolver,
				Action::Assign,
			);
			assert_eq!(result, Err(TransitionDenied::AlreadyAssigned));
		}
	}

	#[test]
	fn partner_accept_resyncs_order_to_approved() {
		let outcome = decide(
			&view(OrderStatus::Assigned, Some(RequestStatus::Assigned)),
			ActorRole::DeliveryPartner,
			Action::Accept,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::Approved);
		assert_eq!(outcome.next_request, Some(RequestStatus::Accepted));
		assert!(outcome
			.effects
			.contains(&SideEffect::RecordPartnerResponse(ResponseAction::Accepted)));
	}

	#[test]
	fn double_accept_is_denied() {
		let err = decide(
			&view(OrderStatus::Approved, Some(RequestStatus::Accepted)),
			ActorRole::DeliveryPartner,
			Action::Accept,
		)
		.unwrap_err();
		assert_eq!(
			err,
			TransitionDenied::RequestState {
				action: Action::Accept,
				expected: RequestStatus::Assigned,
				actual: RequestStatus::Accepted,
			}
		);
	}

	#[test]
	fn partner_reject_keeps_order_reassignable() {
		let outcome = decide(
			&view(OrderStatus::Assigned, Some(RequestStatus::Assigned)),
			ActorRole::DeliveryPartner,
			Action::RejectAssignment,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::Approved);
		assert_eq!(outcome.next_request, Some(RequestStatus::RejectedByPartner));
		assert!(outcome
			.effects
			.contains(&SideEffect::RecordPartnerResponse(ResponseAction::Rejected)));
	}

	#[test]
	fn delivery_progression_stamps_timestamps() {
		let picked = decide(
			&view(OrderStatus::Approved, Some(RequestStatus::Accepted)),
			ActorRole::DeliveryPartner,
			Action::MarkPickedUp,
		)
		.unwrap();
		assert_eq!(picked.next_order, OrderStatus::PickedUp);
		assert!(picked.effects.contains(&SideEffect::SetPickedUpAt));

		let out = decide(
			&view(OrderStatus::PickedUp, Some(RequestStatus::PickedUp)),
			ActorRole::DeliveryPartner,
			Action::MarkOutForDelivery,
		)
		.unwrap();
		assert_eq!(out.next_order, OrderStatus::OutForDelivery);
		assert_eq!(out.next_request, Some(RequestStatus::OutForDelivery));

		let delivered = decide(
			&view(
				OrderStatus::OutForDelivery,
				Some(RequestStatus::OutForDelivery),
			),
			ActorRole::DeliveryPartner,
			Action::MarkDelivered,
		)
		.unwrap();
		assert_eq!(delivered.next_order, OrderStatus::Delivered);
		assert_eq!(delivered.next_request, Some(RequestStatus::Delivered));
		assert!(delivered.effects.contains(&SideEffect::SetDeliveredAt));
	}

	#[test]
	fn customer_cancels_before_pickup() {
		// No request yet.
		let outcome = decide(
			&view(OrderStatus::Pending, None),
			ActorRole::Customer,
			Action::Cancel,
		)
		.unwrap();
		assert_eq!(outcome.next_order, OrderStatus::Cancelled);
		assert_eq!(outcome.next_request, None);

		// Live request is cancelled in the same unit.
		let outcome = decide(
			&view(OrderStatus::Assigned, Some(RequestStatus::Assigned)),
			ActorRole::Customer,
			Action::Cancel,
		)
		.unwrap();
		assert_eq!(outcome.next_request, Some(RequestStatus::Cancelled));

		// A request the partner already rejected stays as history.
		let outcome = decide(
			&view(OrderStatus::Approved, Some(RequestStatus::RejectedByPartner)),
			ActorRole::Customer,
			Action::Cancel,
		)
		.unwrap();
		assert_eq!(outcome.next_request, None);
	}

	#[test]
	fn cancel_after_pickup_is_denied() {
		for (order, request) in [
			(OrderStatus::PickedUp, Some(RequestStatus::PickedUp)),
			(
				OrderStatus::OutForDelivery,
				Some(RequestStatus::OutForDelivery),
			),
		] {
			let err = decide(&view(order, request), ActorRole::Customer, Action::Cancel)
				.unwrap_err();
			assert_eq!(err, TransitionDenied::CancelAfterPickup);
		}
	}

	#[test]
	fn terminal_orders_are_sinks() {
		for order in OrderStatus::all().filter(|s| s.is_terminal()) {
			for role in ActorRole::all() {
				for action in Action::all() {
					let result = decide(&view(order, None), role, action);
					assert_eq!(
						result,
						Err(TransitionDenied::Terminal { status: order }),
						"{role} {action} on {order}"
					);
				}
			}
		}
	}

	#[test]
	fn wrong_role_is_forbidden() {
		let v = view(OrderStatus::Pending, None);
		for role in ActorRole::all() {
			for action in Action::all() {
				if role == action.required_role() {
					continue;
				}
				let err = decide(&v, role, action).unwrap_err();
				assert_eq!(err, TransitionDenied::Forbidden { role, action });
			}
		}
	}

	#[test]
	fn admin_holds_no_transitions() {
		for order in OrderStatus::all() {
			for action in Action::all() {
				assert!(decide(&view(order, None), ActorRole::Admin, action).is_err());
			}
		}
	}

	#[test]
	fn partner_actions_require_a_request() {
		for action in [
			Action::Accept,
			Action::RejectAssignment,
			Action::MarkPickedUp,
			Action::MarkOutForDelivery,
			Action::MarkDelivered,
		] {
			let err = decide(
				&view(OrderStatus::Approved, None),
				ActorRole::DeliveryPartner,
				action,
			)
			.unwrap_err();
			assert_eq!(err, TransitionDenied::NoRequest { action });
		}
	}

	/// Exhaustively sweeps every (order, request, role, action) combination:
	/// the engine always answers with Ok or a named denial, and every
	/// allowed outcome lands on a coherent (order, request) pair.
	#[test]
	fn full_sweep_never_panics_and_outcomes_are_coherent() {
		let request_states: Vec<Option<RequestStatus>> = std::iter::once(None)
			.chain(RequestStatus::all().map(Some))
			.collect();

		for order in OrderStatus::all() {
			for request in &request_states {
				for role in ActorRole::all() {
					for action in Action::all() {
						let v = view(order, *request);
						if let Ok(outcome) = decide(&v, role, action) {
							assert!(
								!v.order.is_terminal(),
								"transition allowed out of terminal order {order}"
							);
							if reachable(&v) {
								assert_coherent(&outcome, &v);
							}
						}
					}
				}
			}
		}
	}

	/// Views that can actually arise from engine-mediated history. The
	/// no-panic property is swept over every combination, but coherence
	/// is only meaningful from a coherent starting point.
	fn reachable(view: &LifecycleView) -> bool {
		matches!(
			(view.order, view.request),
			(OrderStatus::Pending, None)
				| (OrderStatus::Approved, None)
				| (OrderStatus::Approved, Some(RequestStatus::Accepted))
				| (OrderStatus::Approved, Some(RequestStatus::RejectedByPartner))
				| (OrderStatus::Assigned, Some(RequestStatus::Assigned))
				| (OrderStatus::PickedUp, Some(RequestStatus::PickedUp))
				| (OrderStatus::OutForDelivery, Some(RequestStatus::OutForDelivery))
				| (OrderStatus::Delivered, Some(RequestStatus::Delivered))
		)
	}

	/// The pairs an engine-mediated transition may produce. Anything else
	/// would let the two status fields diverge.
	fn assert_coherent(outcome: &Outcome, from: &LifecycleView) {
		let order = outcome.next_order;
		let request = outcome.next_request.or(from.request);
		let ok = match (order, request) {
			(OrderStatus::Approved, None) => true,
			(OrderStatus::RejectedByVendor, None) => true,
			(OrderStatus::RejectedByVendor, Some(RequestStatus::Cancelled)) => true,
			(OrderStatus::Cancelled, None) => true,
			(OrderStatus::Cancelled, Some(RequestStatus::Cancelled)) => true,
			(OrderStatus::Cancelled, Some(RequestStatus::RejectedByPartner)) => true,
			(OrderStatus::Assigned, Some(RequestStatus::Assigned)) => true,
			(OrderStatus::Approved, Some(RequestStatus::Accepted)) => true,
			(OrderStatus::Approved, Some(RequestStatus::RejectedByPartner)) => true,
			(OrderStatus::PickedUp, Some(RequestStatus::PickedUp)) => true,
			(OrderStatus::OutForDelivery, Some(RequestStatus::OutForDelivery)) => true,
			(OrderStatus::Delivered, Some(RequestStatus::Delivered)) => true,
			_ => false,
		};
		assert!(ok, "incoherent outcome: order={order} request={request:?}");
	}
}
