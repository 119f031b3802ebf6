// status.rs
// Effective-status derivation and due-date calendar math.
//
// The stored status field only ever becomes Pending, PartialPaid or Paid
// through mutation. Whether a record is Overdue depends on the moment of the
// read, so every read path derives the displayed status here instead of
// trusting the raw field. Callers must never branch on the stored value for
// "is this overdue".

use bson::DateTime;
use chrono::{Datelike, NaiveDate, Utc};

use crate::models::{BorrowStatus, UdharStatus};

/// Start of today in UTC, date-only. Records due today are not yet overdue.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn due_day(due_date: &DateTime) -> NaiveDate {
    due_date.to_chrono().date_naive()
}

/// Effective status of an udhar record as of `today`.
pub fn effective_udhar_status(
    stored: UdharStatus,
    due_date: &DateTime,
    paid_amount: f64,
    today: NaiveDate,
) -> UdharStatus {
    if stored == UdharStatus::Paid {
        return UdharStatus::Paid;
    }
    if due_day(due_date) < today {
        if paid_amount > 0.0 {
            UdharStatus::PartialPaid
        } else {
            UdharStatus::Overdue
        }
    } else if paid_amount > 0.0 {
        UdharStatus::PartialPaid
    } else {
        UdharStatus::Pending
    }
}

/// Effective status of a borrow record as of `today`.
pub fn effective_borrow_status(
    stored: BorrowStatus,
    due_date: &DateTime,
    today: NaiveDate,
) -> BorrowStatus {
    if stored == BorrowStatus::Paid {
        return BorrowStatus::Paid;
    }
    if due_day(due_date) < today {
        BorrowStatus::Overdue
    } else {
        BorrowStatus::Pending
    }
}

/// Same day-of-month one calendar month later, clamped to the target
/// month's length (Jan 31 -> Feb 28/29). Used for carry-forward due dates.
pub fn advance_one_month(due_date: &DateTime) -> DateTime {
    let current = due_date.to_chrono();
    let date = current.date_naive();
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let day = clamp_day(year, month, date.day());
    let next = NaiveDate::from_ymd_opt(year, month, day)
        .unwrap_or(date)
        .and_time(current.time())
        .and_utc();
    DateTime::from_chrono(next)
}

fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    if NaiveDate::from_ymd_opt(year, month, day).is_some() {
        return day;
    }
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32) -> DateTime {
        DateTime::from_chrono(
            NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                .and_utc(),
        )
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn paid_wins_regardless_of_due_date() {
        let status = effective_udhar_status(
            UdharStatus::Paid,
            &dt(2020, 1, 1),
            0.0,
            day(2024, 6, 1),
        );
        assert_eq!(status, UdharStatus::Paid);
    }

    #[test]
    fn past_due_unpaid_is_overdue() {
        let status = effective_udhar_status(
            UdharStatus::Pending,
            &dt(2024, 5, 31),
            0.0,
            day(2024, 6, 1),
        );
        assert_eq!(status, UdharStatus::Overdue);
    }

    #[test]
    fn past_due_with_payments_is_partial_paid() {
        let status = effective_udhar_status(
            UdharStatus::Pending,
            &dt(2024, 5, 31),
            50.0,
            day(2024, 6, 1),
        );
        assert_eq!(status, UdharStatus::PartialPaid);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let status = effective_udhar_status(
            UdharStatus::Pending,
            &dt(2024, 6, 1),
            0.0,
            day(2024, 6, 1),
        );
        assert_eq!(status, UdharStatus::Pending);

        let borrow = effective_borrow_status(BorrowStatus::Pending, &dt(2024, 6, 1), day(2024, 6, 1));
        assert_eq!(borrow, BorrowStatus::Pending);
    }

    #[test]
    fn borrow_past_due_is_overdue_without_partial() {
        let status = effective_borrow_status(BorrowStatus::Pending, &dt(2024, 5, 31), day(2024, 6, 1));
        assert_eq!(status, BorrowStatus::Overdue);
    }

    #[test]
    fn advance_keeps_day_of_month() {
        assert_eq!(advance_one_month(&dt(2024, 1, 15)).to_chrono().date_naive(), day(2024, 2, 15));
    }

    #[test]
    fn advance_clamps_to_month_end() {
        assert_eq!(advance_one_month(&dt(2024, 1, 31)).to_chrono().date_naive(), day(2024, 2, 29));
        assert_eq!(advance_one_month(&dt(2023, 1, 31)).to_chrono().date_naive(), day(2023, 2, 28));
    }

    #[test]
    fn advance_rolls_over_december() {
        assert_eq!(advance_one_month(&dt(2024, 12, 10)).to_chrono().date_naive(), day(2025, 1, 10));
    }
}
