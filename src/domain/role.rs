use thiserror::Error;

text_enum! {
    /// The single active role of a user account.
    pub enum Role: "role" {
        Customer => "customer",
        Admin => "admin",
        Waiter => "waiter",
        Chef => "chef",
        Cashier => "cashier",
    }
}

text_enum! {
    /// Operational role held by an employee record.
    pub enum StaffRole: "staff role" {
        Waiter => "waiter",
        Chef => "chef",
        Cashier => "cashier",
    }
}

impl From<StaffRole> for Role {
    fn from(role: StaffRole) -> Self {
        match role {
            StaffRole::Waiter => Role::Waiter,
            StaffRole::Chef => Role::Chef,
            StaffRole::Cashier => Role::Cashier,
        }
    }
}

impl Role {
    /// Restaurant reference a user holding `self` must carry when bound to
    /// `restaurant_id`. Customers are never bound.
    pub fn binding(self, restaurant_id: i32) -> Option<i32> {
        match self {
            Role::Customer => None,
            _ => Some(restaurant_id),
        }
    }

    /// Applies `change` through the role transition table.
    ///
    /// | current      | RegisterRestaurant | Hire(r)  | Dismiss  | Reassign(r) |
    /// |--------------|--------------------|----------|----------|-------------|
    /// | customer     | admin              | r        | customer | r           |
    /// | admin        | AlreadyOwner       | OwnerLocked | OwnerLocked | OwnerLocked |
    /// | staff        | StaffCannotOwn     | r        | customer | r           |
    ///
    /// `Reassign(admin)` is never legal: ownership is only acquired by
    /// registering a restaurant.
    pub fn apply(self, change: RoleChange) -> Result<Role, RoleTransitionError> {
        if change == RoleChange::Reassign(Role::Admin) {
            return Err(RoleTransitionError::AdminNotAssignable);
        }

        match (self, change) {
            (Role::Admin, RoleChange::RegisterRestaurant) => Err(RoleTransitionError::AlreadyOwner),
            (Role::Admin, _) => Err(RoleTransitionError::OwnerLocked),
            (Role::Customer, RoleChange::RegisterRestaurant) => Ok(Role::Admin),
            (_, RoleChange::RegisterRestaurant) => Err(RoleTransitionError::StaffCannotOwn),
            (_, RoleChange::Hire(staff)) => Ok(staff.into()),
            (_, RoleChange::Dismiss) => Ok(Role::Customer),
            (_, RoleChange::Reassign(role)) => Ok(role),
        }
    }
}

/// Every way a user's role may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    /// The user registers (and so owns) a restaurant.
    RegisterRestaurant,
    /// The user is added to, or re-linked into, a restaurant's staff.
    Hire(StaffRole),
    /// The user's employee record is removed.
    Dismiss,
    /// An admin sets the role directly through the role assignment endpoint.
    Reassign(Role),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RoleTransitionError {
    #[error("You have already registered a restaurant.")]
    AlreadyOwner,

    #[error("A restaurant owner's role cannot be changed")]
    OwnerLocked,

    #[error("Staff members must leave their restaurant before registering one")]
    StaffCannotOwn,

    #[error("The admin role can only be obtained by registering a restaurant")]
    AdminNotAssignable,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_becomes_admin_by_registering() {
        assert_eq!(
            Role::Customer.apply(RoleChange::RegisterRestaurant),
            Ok(Role::Admin)
        );
    }

    #[test]
    fn admin_cannot_register_twice_or_be_hired() {
        assert_eq!(
            Role::Admin.apply(RoleChange::RegisterRestaurant),
            Err(RoleTransitionError::AlreadyOwner)
        );
        assert_eq!(
            Role::Admin.apply(RoleChange::Hire(StaffRole::Chef)),
            Err(RoleTransitionError::OwnerLocked)
        );
        assert_eq!(
            Role::Admin.apply(RoleChange::Dismiss),
            Err(RoleTransitionError::OwnerLocked)
        );
    }

    #[test]
    fn staff_roles_move_freely_between_each_other() {
        for current in [Role::Customer, Role::Waiter, Role::Chef, Role::Cashier] {
            for staff in StaffRole::ALL {
                assert_eq!(
                    current.apply(RoleChange::Hire(*staff)),
                    Ok(Role::from(*staff))
                );
            }
        }
    }

    #[test]
    fn dismissal_always_lands_on_customer() {
        for current in [Role::Customer, Role::Waiter, Role::Chef, Role::Cashier] {
            assert_eq!(current.apply(RoleChange::Dismiss), Ok(Role::Customer));
        }
    }

    #[test]
    fn staff_must_leave_before_owning() {
        assert_eq!(
            Role::Waiter.apply(RoleChange::RegisterRestaurant),
            Err(RoleTransitionError::StaffCannotOwn)
        );
    }

    #[test]
    fn admin_is_never_directly_assignable() {
        for current in Role::ALL {
            assert_eq!(
                current.apply(RoleChange::Reassign(Role::Admin)),
                Err(RoleTransitionError::AdminNotAssignable)
            );
        }
        assert_eq!(
            Role::Chef.apply(RoleChange::Reassign(Role::Customer)),
            Ok(Role::Customer)
        );
    }

    #[test]
    fn only_customers_are_unbound() {
        assert_eq!(Role::Customer.binding(7), None);
        assert_eq!(Role::Admin.binding(7), Some(7));
        assert_eq!(Role::Cashier.binding(7), Some(7));
    }

    #[test]
    fn parses_lowercase_tokens() {
        assert_eq!("chef".parse::<Role>(), Ok(Role::Chef));
        assert!("Chef".parse::<Role>().is_err());
        assert!("admin".parse::<StaffRole>().is_err());
        assert_eq!(
            serde_json::to_string(&StaffRole::Cashier).unwrap(),
            "\"cashier\""
        );
    }
}
