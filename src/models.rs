use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{
    booking::BookingStatus,
    order::OrderStatus,
    role::{Role, StaffRole},
};

// Users

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserEntity {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub profile_picture: String,
    pub role: Role,
    pub restaurant_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// A user as returned over the API. Never carries the credential hash.
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub profile_picture: String,
    pub role: Role,
    pub restaurant_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for PublicUser {
    fn from(user: UserEntity) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            profile_picture: user.profile_picture,
            role: user.role,
            restaurant_id: user.restaurant_id,
            created_at: user.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateUserEntity {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub restaurant_id: Option<i32>,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UpdateProfileEntity {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

impl UpdateProfileEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.profile_picture.is_none()
    }
}

/// Changes cascaded from an employee update onto its linked user.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UpdateLinkedUserEntity {
    pub email: Option<String>,
    pub role: Option<Role>,
    /// Written together with `role` so the binding always matches it.
    pub restaurant_id: Option<Option<i32>>,
    pub password_hash: Option<String>,
}

impl UpdateLinkedUserEntity {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.role.is_none()
            && self.restaurant_id.is_none()
            && self.password_hash.is_none()
    }
}

// Restaurants

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RestaurantEntity {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub tax_id: Option<String>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateRestaurantEntity {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub tax_id: Option<String>,
    pub owner_id: i32,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::restaurants)]
pub struct UpdateRestaurantEntity {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub tax_id: Option<String>,
}

impl UpdateRestaurantEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.phone.is_none() && self.tax_id.is_none()
    }
}

// Menu items

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::menu_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MenuItemEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub photo: String,
    pub review: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::menu_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateMenuItemEntity {
    pub restaurant_id: i32,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub photo: String,
    pub review: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::menu_items)]
pub struct UpdateMenuItemEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub photo: Option<String>,
    pub review: Option<String>,
}

impl UpdateMenuItemEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.photo.is_none()
            && self.review.is_none()
    }
}

// Employees

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::employees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EmployeeEntity {
    pub id: i32,
    pub user_id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub age: Option<i32>,
    pub salary: Option<Decimal>,
    pub bonus: Decimal,
    pub role: StaffRole,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::employees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateEmployeeEntity {
    pub user_id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub age: Option<i32>,
    pub salary: Option<Decimal>,
    pub bonus: Decimal,
    pub role: StaffRole,
    pub image: String,
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::employees)]
pub struct UpdateEmployeeEntity {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub salary: Option<Decimal>,
    pub bonus: Option<Decimal>,
    pub role: Option<StaffRole>,
    pub image: Option<String>,
}

impl UpdateEmployeeEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.salary.is_none()
            && self.bonus.is_none()
            && self.role.is_none()
            && self.image.is_none()
    }
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub table_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub served_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub restaurant_id: i32,
    pub table_number: String,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_by: Option<i32>,
}

/// A `None` `served_at` leaves the stored timestamp untouched.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct OrderStatusChange {
    pub status: OrderStatus,
    pub served_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemEntity {
    pub id: i32,
    pub order_id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderItemEntity {
    pub order_id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

// Bills

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::bills)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BillEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub order_id: Option<i32>,
    pub table_number: String,
    pub customer_name: String,
    pub total_without_tax: Decimal,
    pub gst_percentage: Decimal,
    pub total_amount: Decimal,
    pub generated_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::bills)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateBillEntity {
    pub restaurant_id: i32,
    pub order_id: Option<i32>,
    pub table_number: String,
    pub customer_name: String,
    pub total_without_tax: Decimal,
    pub gst_percentage: Decimal,
    pub total_amount: Decimal,
    pub generated_by: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::bill_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BillItemEntity {
    pub id: i32,
    pub bill_id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::bill_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateBillItemEntity {
    pub bill_id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

// Table bookings

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::table_bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TableBookingEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub customer_id: i32,
    #[serde(rename = "date")]
    pub booking_date: NaiveDate,
    #[serde(rename = "time")]
    pub booking_time: String,
    pub guests: i32,
    pub table_number: Option<String>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::table_bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateTableBookingEntity {
    pub restaurant_id: i32,
    pub customer_id: i32,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub guests: i32,
    pub status: BookingStatus,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::table_bookings)]
pub struct BookingStatusChange {
    pub status: BookingStatus,
    pub table_number: Option<String>,
}

// Payments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: Uuid,
    pub method: String,
    #[schema(value_type = Object)]
    pub details: Value,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Serialize, Deserialize, Debug)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePaymentEntity {
    pub id: Uuid,
    pub method: String,
    pub details: Value,
    pub amount: Decimal,
}
