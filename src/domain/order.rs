use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use super::role::Role;

text_enum! {
    /// Kitchen/service status of an order.
    ///
    /// `Served`, `Cancelled` and `Billed` are terminal. `Billed` is written
    /// only by bill generation and can never be requested through a status
    /// update.
    pub enum OrderStatus: "order status" {
        Pending => "pending",
        Preparing => "preparing",
        Ready => "ready",
        Served => "served",
        Cancelled => "cancelled",
        Billed => "billed",
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StatusPolicyError {
    #[error("Chef can only set status to preparing or ready")]
    ChefRestricted,

    #[error("Role {0} does not have permission to update order status")]
    RoleNotPermitted(Role),

    #[error("Orders are marked billed only by generating their bill")]
    BilledReserved,
}

/// Checks whether `role` may move an order to `target`.
///
/// The policy is permissive: waiters and admins may set any
/// status from any status except `billed`, chefs only `preparing` and
/// `ready`. The role is checked first, so a chef asking for `billed` is
/// refused like any other chef request.
pub fn authorize_status_change(role: Role, target: OrderStatus) -> Result<(), StatusPolicyError> {
    match role {
        Role::Chef if matches!(target, OrderStatus::Preparing | OrderStatus::Ready) => Ok(()),
        Role::Chef => Err(StatusPolicyError::ChefRestricted),
        Role::Waiter | Role::Admin if target == OrderStatus::Billed => {
            Err(StatusPolicyError::BilledReserved)
        }
        Role::Waiter | Role::Admin => Ok(()),
        other => Err(StatusPolicyError::RoleNotPermitted(other)),
    }
}

/// `servedAt` value to write alongside a move to `target`. Only `served`
/// stamps it; `None` leaves the stored value untouched.
pub fn served_at_for(target: OrderStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (target == OrderStatus::Served).then_some(now)
}

/// Sum of `price × quantity` over snapshotted order lines.
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, quantity)| price * Decimal::from(quantity))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chef_may_only_prepare_or_ready() {
        assert_eq!(
            authorize_status_change(Role::Chef, OrderStatus::Preparing),
            Ok(())
        );
        assert_eq!(authorize_status_change(Role::Chef, OrderStatus::Ready), Ok(()));
        for target in [
            OrderStatus::Pending,
            OrderStatus::Served,
            OrderStatus::Cancelled,
            OrderStatus::Billed,
        ] {
            assert_eq!(
                authorize_status_change(Role::Chef, target),
                Err(StatusPolicyError::ChefRestricted)
            );
        }
    }

    #[test]
    fn waiter_and_admin_may_jump_anywhere() {
        for role in [Role::Waiter, Role::Admin] {
            for target in [
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Served,
                OrderStatus::Cancelled,
            ] {
                assert_eq!(authorize_status_change(role, target), Ok(()));
            }
        }
    }

    #[test]
    fn cashier_and_customer_cannot_update() {
        assert_eq!(
            authorize_status_change(Role::Cashier, OrderStatus::Served),
            Err(StatusPolicyError::RoleNotPermitted(Role::Cashier))
        );
        assert_eq!(
            authorize_status_change(Role::Customer, OrderStatus::Cancelled),
            Err(StatusPolicyError::RoleNotPermitted(Role::Customer))
        );
    }

    #[test]
    fn billed_is_never_a_requestable_target() {
        for role in [Role::Waiter, Role::Admin] {
            assert_eq!(
                authorize_status_change(role, OrderStatus::Billed),
                Err(StatusPolicyError::BilledReserved)
            );
        }
        assert_eq!(
            authorize_status_change(Role::Chef, OrderStatus::Billed),
            Err(StatusPolicyError::ChefRestricted)
        );
        assert_eq!(
            authorize_status_change(Role::Cashier, OrderStatus::Billed),
            Err(StatusPolicyError::RoleNotPermitted(Role::Cashier))
        );
    }

    #[test]
    fn only_served_stamps_served_at() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 19, 30, 0).unwrap();
        assert_eq!(served_at_for(OrderStatus::Served, now), Some(now));
        assert_eq!(served_at_for(OrderStatus::Ready, now), None);
        assert_eq!(served_at_for(OrderStatus::Cancelled, now), None);
    }

    #[test]
    fn total_is_price_times_quantity() {
        let total = order_total([(Decimal::new(100, 0), 2), (Decimal::new(50, 0), 1)]);
        assert_eq!(total, Decimal::new(250, 0));
    }

    #[test]
    fn total_of_fractional_prices() {
        let total = order_total([(Decimal::new(1999, 2), 3), (Decimal::new(5, 1), 1)]);
        assert_eq!(total, Decimal::new(6047, 2));
        assert_eq!(order_total(Vec::new()), Decimal::ZERO);
    }
}
