use crate::{app_error::AppError, domain::role::Role, models::UserEntity};

/// The caller resolved from a bearer credential, as currently stored.
///
/// Injected into request extensions by [`super::require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
    pub role: Role,
    pub restaurant_id: Option<i32>,
}

impl From<&UserEntity> for CurrentUser {
    fn from(user: &UserEntity) -> Self {
        Self {
            id: user.id,
            role: user.role,
            restaurant_id: user.restaurant_id,
        }
    }
}

impl CurrentUser {
    /// Fails with `Forbidden` unless the caller's role is in `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            return Ok(());
        }

        tracing::warn!(user_id = self.id, role = %self.role, "Role not permitted");
        Err(AppError::Forbidden(format!(
            "Role {} is not authorized to access this resource",
            self.role
        )))
    }

    pub fn is_bound_to(&self, restaurant_id: i32) -> bool {
        self.restaurant_id == Some(restaurant_id)
    }

    /// Fails with `Forbidden` unless the caller works at or owns
    /// `restaurant_id`.
    pub fn require_restaurant(&self, restaurant_id: i32, action: &str) -> Result<(), AppError> {
        if self.is_bound_to(restaurant_id) {
            return Ok(());
        }

        tracing::warn!(
            user_id = self.id,
            restaurant_id,
            "Caller is not bound to restaurant"
        );
        Err(AppError::Forbidden(format!("Not authorized to {action}")))
    }

    /// Restaurant the caller is bound to, for roles that must have one.
    pub fn bound_restaurant(&self) -> Result<i32, AppError> {
        self.restaurant_id
            .ok_or_else(|| AppError::Forbidden("You are not linked to a restaurant".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, restaurant_id: Option<i32>) -> CurrentUser {
        CurrentUser {
            id: 1,
            role,
            restaurant_id,
        }
    }

    #[test]
    fn role_set_membership() {
        let chef = user(Role::Chef, Some(3));
        assert!(chef.require_role(&[Role::Waiter, Role::Chef]).is_ok());
        assert!(matches!(
            chef.require_role(&[Role::Cashier, Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn restaurant_binding() {
        let waiter = user(Role::Waiter, Some(3));
        assert!(waiter.require_restaurant(3, "create orders").is_ok());
        assert!(matches!(
            waiter.require_restaurant(4, "create orders"),
            Err(AppError::Forbidden(_))
        ));

        let customer = user(Role::Customer, None);
        assert!(!customer.is_bound_to(3));
        assert!(customer.bound_restaurant().is_err());
    }
}
