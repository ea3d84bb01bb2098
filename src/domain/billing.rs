use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

/// GST applied when a bill is generated without an explicit percentage.
pub const DEFAULT_GST_PERCENTAGE: Decimal = Decimal::from_parts(18, 0, 0, false, 0);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BillingError {
    #[error("GST percentage must be between 0 and 100, got {0}")]
    GstOutOfRange(Decimal),
}

/// Amounts recorded on a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillTotals {
    pub total_without_tax: Decimal,
    pub gst_percentage: Decimal,
    pub total_amount: Decimal,
}

impl BillTotals {
    /// `total_amount = total_without_tax × (1 + gst / 100)`, rounded to cents.
    ///
    /// An explicit `Some(0)` is honoured; only `None` falls back to
    /// [`DEFAULT_GST_PERCENTAGE`].
    pub fn compute(
        total_without_tax: Decimal,
        gst_percentage: Option<Decimal>,
    ) -> Result<Self, BillingError> {
        let gst_percentage = gst_percentage.unwrap_or(DEFAULT_GST_PERCENTAGE);
        if gst_percentage.is_sign_negative() || gst_percentage > Decimal::ONE_HUNDRED {
            return Err(BillingError::GstOutOfRange(gst_percentage));
        }

        let tax = total_without_tax * gst_percentage / Decimal::ONE_HUNDRED;
        let total_amount = (total_without_tax + tax)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        Ok(Self {
            total_without_tax,
            gst_percentage,
            total_amount,
        })
    }
}

/// Time window for the bill history listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
pub enum HistoryFilter {
    #[serde(rename = "last7")]
    Last7,
    #[serde(rename = "last30")]
    Last30,
    #[serde(rename = "last60")]
    Last60,
    #[serde(rename = "thisWeek")]
    ThisWeek,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "all")]
    All,
}

impl HistoryFilter {
    /// Inclusive lower bound on `created_at`, or `None` when unbounded.
    ///
    /// `last*` subtract whole days from `now`; `thisWeek` floors to the most
    /// recent Sunday at midnight; `month` and `year` floor to the first
    /// instant of the current calendar month or year. All in UTC.
    pub fn start(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        match self {
            HistoryFilter::Last7 => now.checked_sub_days(Days::new(7)),
            HistoryFilter::Last30 => now.checked_sub_days(Days::new(30)),
            HistoryFilter::Last60 => now.checked_sub_days(Days::new(60)),
            HistoryFilter::ThisWeek => {
                let back = u64::from(today.weekday().num_days_from_sunday());
                today.checked_sub_days(Days::new(back)).map(midnight)
            }
            HistoryFilter::Month => today.with_day(1).map(midnight),
            HistoryFilter::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).map(midnight),
            HistoryFilter::All => None,
        }
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn default_gst_is_eighteen_percent() {
        let totals = BillTotals::compute(Decimal::new(250, 0), None).unwrap();
        assert_eq!(totals.total_without_tax, Decimal::new(250, 0));
        assert_eq!(totals.gst_percentage, Decimal::new(18, 0));
        assert_eq!(totals.total_amount, Decimal::new(29500, 2));
    }

    #[test]
    fn explicit_zero_gst_is_honoured() {
        let totals = BillTotals::compute(Decimal::new(250, 0), Some(Decimal::ZERO)).unwrap();
        assert_eq!(totals.gst_percentage, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::new(250, 0));
    }

    #[test]
    fn totals_round_to_cents() {
        let totals =
            BillTotals::compute(Decimal::new(1999, 2), Some(Decimal::new(5, 0))).unwrap();
        // 19.99 * 1.05 = 20.9895
        assert_eq!(totals.total_amount, Decimal::new(2099, 2));
    }

    #[test]
    fn gst_outside_percentage_range_is_rejected() {
        assert_eq!(
            BillTotals::compute(Decimal::ONE, Some(Decimal::new(-1, 0))),
            Err(BillingError::GstOutOfRange(Decimal::new(-1, 0)))
        );
        assert!(BillTotals::compute(Decimal::ONE, Some(Decimal::new(101, 0))).is_err());
        assert!(BillTotals::compute(Decimal::ONE, Some(Decimal::ONE_HUNDRED)).is_ok());
    }

    #[test]
    fn rolling_windows_subtract_days() {
        let now = at(2026, 10, 14, 15, 45);
        assert_eq!(HistoryFilter::Last7.start(now), Some(at(2026, 10, 7, 15, 45)));
        assert_eq!(HistoryFilter::Last30.start(now), Some(at(2026, 9, 14, 15, 45)));
        assert_eq!(HistoryFilter::Last60.start(now), Some(at(2026, 8, 15, 15, 45)));
    }

    #[test]
    fn this_week_floors_to_sunday_midnight() {
        // 2026-10-14 is a Wednesday.
        let wednesday = at(2026, 10, 14, 15, 45);
        assert_eq!(
            HistoryFilter::ThisWeek.start(wednesday),
            Some(at(2026, 10, 11, 0, 0))
        );

        let sunday = at(2026, 10, 11, 9, 0);
        assert_eq!(
            HistoryFilter::ThisWeek.start(sunday),
            Some(at(2026, 10, 11, 0, 0))
        );
    }

    #[test]
    fn calendar_windows_floor_to_first_instant() {
        let now = at(2026, 10, 14, 15, 45);
        assert_eq!(HistoryFilter::Month.start(now), Some(at(2026, 10, 1, 0, 0)));
        assert_eq!(HistoryFilter::Year.start(now), Some(at(2026, 1, 1, 0, 0)));
        assert_eq!(HistoryFilter::All.start(now), None);
    }

    #[test]
    fn filter_tokens_match_query_strings() {
        let filter: HistoryFilter = serde_json::from_str("\"thisWeek\"").unwrap();
        assert_eq!(filter, HistoryFilter::ThisWeek);
        assert!(serde_json::from_str::<HistoryFilter>("\"week\"").is_err());
    }
}
