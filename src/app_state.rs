use std::sync::Arc;

use crate::{auth::JwtService, db::DbPool};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub jwt: Arc<JwtService>,
    /// Restaurant that receives every customer-facing table booking.
    pub booking_restaurant_id: i32,
}

impl AppState {
    pub fn new(db_pool: DbPool, jwt: JwtService, booking_restaurant_id: i32) -> Self {
        Self {
            db_pool,
            jwt: Arc::new(jwt),
            booking_restaurant_id,
        }
    }
}
