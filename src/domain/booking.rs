use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

text_enum! {
    /// Reservation status. Any status may be set from any other.
    pub enum BookingStatus: "booking status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Cancelled => "cancelled",
        Completed => "completed",
    }
}

/// Restaurant-side booking listing filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BookingFilter {
    Upcoming,
    Past,
    All,
}

/// Constraint a filter places on a booking's date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    OnOrAfter(NaiveDate),
    Before(NaiveDate),
}

impl BookingFilter {
    /// Bound relative to `today`. Time of day is never considered, so a
    /// booking dated today is always upcoming.
    pub fn bound(self, today: NaiveDate) -> Option<DateBound> {
        match self {
            BookingFilter::Upcoming => Some(DateBound::OnOrAfter(today)),
            BookingFilter::Past => Some(DateBound::Before(today)),
            BookingFilter::All => None,
        }
    }
}
