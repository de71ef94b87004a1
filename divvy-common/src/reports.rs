use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Week,
    Month,
    Year,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalsPeriod {
    Week,
    Month,
}

/// A half-open time range: `start` is inclusive, `end` exclusive. Windows
/// are always aligned to calendar boundaries (Monday for weeks, the first
/// of the month, January 1st for years).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at < self.end
    }
}

impl TrendPeriod {
    pub fn window(self, anchor: NaiveDate) -> Option<DateWindow> {
        match self {
            TrendPeriod::Week => week_window(anchor),
            TrendPeriod::Month => month_window(anchor),
            TrendPeriod::Year => year_window(anchor),
        }
    }
}

impl TotalsPeriod {
    pub fn window(self, anchor: NaiveDate) -> Option<DateWindow> {
        match self {
            TotalsPeriod::Week => week_window(anchor),
            TotalsPeriod::Month => month_window(anchor),
        }
    }
}

/// The ISO week containing `anchor` (Monday through the following Monday).
pub fn week_window(anchor: NaiveDate) -> Option<DateWindow> {
    let monday = anchor.checked_sub_days(Days::new(
        anchor.weekday().num_days_from_monday().into(),
    ))?;

    Some(DateWindow {
        start: monday.and_hms_opt(0, 0, 0)?,
        end: monday.checked_add_days(Days::new(7))?.and_hms_opt(0, 0, 0)?,
    })
}

/// The calendar month containing `anchor`.
pub fn month_window(anchor: NaiveDate) -> Option<DateWindow> {
    let first = NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), 1)?;

    Some(DateWindow {
        start: first.and_hms_opt(0, 0, 0)?,
        end: first
            .checked_add_months(Months::new(1))?
            .and_hms_opt(0, 0, 0)?,
    })
}

/// The calendar year containing `anchor`.
pub fn year_window(anchor: NaiveDate) -> Option<DateWindow> {
    let first = NaiveDate::from_ymd_opt(anchor.year(), 1, 1)?;

    Some(DateWindow {
        start: first.and_hms_opt(0, 0, 0)?,
        end: first
            .checked_add_months(Months::new(12))?
            .and_hms_opt(0, 0, 0)?,
    })
}

/// The calendar window immediately before `window` (same period kind).
pub fn previous_window(window: DateWindow, period: TrendPeriod) -> Option<DateWindow> {
    let last_day_before = window.start.date().checked_sub_days(Days::new(1))?;

    period.window(last_day_before)
}

/// Buckets are daily for week and month windows and monthly for year
/// windows.
pub fn bucket_count(window: DateWindow, period: TrendPeriod) -> usize {
    match period {
        TrendPeriod::Week | TrendPeriod::Month => (window.end.date() - window.start.date())
            .num_days()
            .max(0) as usize,
        TrendPeriod::Year => 12,
    }
}

pub fn bucket_starts(window: DateWindow, period: TrendPeriod) -> Vec<NaiveDateTime> {
    let mut starts = Vec::with_capacity(bucket_count(window, period));
    let mut cursor = window.start;

    while cursor < window.end {
        starts.push(cursor);

        let next = match period {
            TrendPeriod::Week | TrendPeriod::Month => cursor.checked_add_days(Days::new(1)),
            TrendPeriod::Year => cursor.checked_add_months(Months::new(1)),
        };

        let Some(next) = next else { break };
        cursor = next;
    }

    starts
}

pub fn bucket_index(window: DateWindow, period: TrendPeriod, at: NaiveDateTime) -> Option<usize> {
    if !window.contains(at) {
        return None;
    }

    match period {
        TrendPeriod::Week | TrendPeriod::Month => {
            Some((at.date() - window.start.date()).num_days() as usize)
        }
        TrendPeriod::Year => {
            let months = (at.date().year() - window.start.date().year()) * 12
                + at.date().month() as i32
                - window.start.date().month() as i32;

            Some(months as usize)
        }
    }
}

/// Sums `(paid_at, amount)` rows into the window's bucket sequence. Rows
/// outside the window are ignored.
pub fn bucket_amounts(
    window: DateWindow,
    period: TrendPeriod,
    rows: &[(NaiveDateTime, i64)],
) -> Vec<i64> {
    let mut buckets = vec![0i64; bucket_count(window, period)];

    for (at, amount) in rows {
        if let Some(pos) = bucket_index(window, period, *at) {
            buckets[pos] += amount;
        }
    }

    buckets
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Even,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrendChange {
    pub amount_cents: i64,
    pub percent: f64,
    pub direction: TrendDirection,
}

/// Compares a current-window total against the previous-window total.
/// A zero previous total reports +100% when anything was spent and 0%
/// otherwise; direction is decided by exact comparison, so equal totals
/// report `even`.
pub fn change_between(current_total: i64, previous_total: i64) -> TrendChange {
    let amount_cents = current_total - previous_total;

    let direction = match current_total.cmp(&previous_total) {
        Ordering::Greater => TrendDirection::Up,
        Ordering::Less => TrendDirection::Down,
        Ordering::Equal => TrendDirection::Even,
    };

    let percent = if previous_total == 0 {
        if current_total > 0 {
            100.0
        } else {
            0.0
        }
    } else {
        amount_cents as f64 * 100.0 / previous_total as f64
    };

    TrendChange {
        amount_cents,
        percent,
        direction,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct PayerTotal {
    pub user_id: Uuid,
    pub total_cents: i64,
}

/// Sums per-payer purchase rows, largest totals first.
pub fn fold_payer_totals(rows: &[(Uuid, i64)]) -> Vec<PayerTotal> {
    let mut totals: HashMap<Uuid, i64> = HashMap::new();

    for (user_id, amount) in rows {
        *totals.entry(*user_id).or_insert(0) += amount;
    }

    let mut totals: Vec<PayerTotal> = totals
        .into_iter()
        .map(|(user_id, total_cents)| PayerTotal {
            user_id,
            total_cents,
        })
        .collect();

    totals.sort_by_key(|total| (-total.total_cents, total.user_id));

    totals
}

/// One direction of the unsettled-debt ledger: `debtor_id` owes
/// `payer_id` the summed cent amounts of their unsettled shares.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct DebtPair {
    pub debtor_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
}

/// Sums `(debtor, payer, amount)` share rows into ledger pairs, largest
/// debts first.
pub fn fold_debt_pairs(rows: &[(Uuid, Uuid, i64)]) -> Vec<DebtPair> {
    let mut pairs: HashMap<(Uuid, Uuid), i64> = HashMap::new();

    for (debtor_id, payer_id, amount) in rows {
        *pairs.entry((*debtor_id, *payer_id)).or_insert(0) += amount;
    }

    let mut pairs: Vec<DebtPair> = pairs
        .into_iter()
        .map(|((debtor_id, payer_id), amount_cents)| DebtPair {
            debtor_id,
            payer_id,
            amount_cents,
        })
        .collect();

    pairs.sort_by_key(|pair| (-pair.amount_cents, pair.debtor_id, pair.payer_id));

    pairs
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct NetBalance {
    pub debtor_id: Uuid,
    pub payer_id: Uuid,
    pub amount_cents: i64,
}

/// Reduces the ledger between exactly two members to a single direction by
/// offsetting the two mutual sums. A fully offset ledger nets to zero with
/// the lower member id reported as the debtor.
pub fn two_member_net(first: Uuid, second: Uuid, pairs: &[DebtPair]) -> NetBalance {
    let owed_by_first: i64 = pairs
        .iter()
        .filter(|pair| pair.debtor_id == first && pair.payer_id == second)
        .map(|pair| pair.amount_cents)
        .sum();
    let owed_by_second: i64 = pairs
        .iter()
        .filter(|pair| pair.debtor_id == second && pair.payer_id == first)
        .map(|pair| pair.amount_cents)
        .sum();

    match owed_by_first.cmp(&owed_by_second) {
        Ordering::Greater => NetBalance {
            debtor_id: first,
            payer_id: second,
            amount_cents: owed_by_first - owed_by_second,
        },
        Ordering::Less => NetBalance {
            debtor_id: second,
            payer_id: first,
            amount_cents: owed_by_second - owed_by_first,
        },
        Ordering::Equal => NetBalance {
            debtor_id: first.min(second),
            payer_id: first.max(second),
            amount_cents: 0,
        },
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: Uuid,
    pub total_cents: i64,
}

/// Sums `(category, amount)` purchase rows, largest totals first.
pub fn fold_category_totals(rows: &[(Uuid, i64)]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<Uuid, i64> = HashMap::new();

    for (category_id, amount) in rows {
        *totals.entry(*category_id).or_insert(0) += amount;
    }

    let mut totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, total_cents)| CategoryTotal {
            category_id,
            total_cents,
        })
        .collect();

    totals.sort_by_key(|total| (-total.total_cents, total.category_id));

    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn datetime(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
        date(year, month, day).and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_week_window_starts_on_monday() {
        // 2024-01-10 was a Wednesday
        let window = week_window(date(2024, 1, 10)).unwrap();

        assert_eq!(window.start, datetime(2024, 1, 8, 0));
        assert_eq!(window.end, datetime(2024, 1, 15, 0));
        assert_eq!(bucket_count(window, TrendPeriod::Week), 7);
    }

    #[test]
    fn test_week_window_on_monday_is_stable() {
        let window = week_window(date(2024, 1, 8)).unwrap();

        assert_eq!(window.start, datetime(2024, 1, 8, 0));
    }

    #[test]
    fn test_month_window_covers_leap_february() {
        let window = month_window(date(2024, 2, 15)).unwrap();

        assert_eq!(window.start, datetime(2024, 2, 1, 0));
        assert_eq!(window.end, datetime(2024, 3, 1, 0));
        assert_eq!(bucket_count(window, TrendPeriod::Month), 29);
    }

    #[test]
    fn test_year_window_has_twelve_monthly_buckets() {
        let window = year_window(date(2024, 7, 4)).unwrap();
        let starts = bucket_starts(window, TrendPeriod::Year);

        assert_eq!(starts.len(), 12);
        assert_eq!(starts[0], datetime(2024, 1, 1, 0));
        assert_eq!(starts[11], datetime(2024, 12, 1, 0));
    }

    #[test]
    fn test_previous_window_is_the_adjacent_calendar_window() {
        let week = week_window(date(2024, 1, 10)).unwrap();
        let previous_week = previous_window(week, TrendPeriod::Week).unwrap();
        assert_eq!(previous_week.start, datetime(2024, 1, 1, 0));
        assert_eq!(previous_week.end, week.start);

        let month = month_window(date(2024, 3, 20)).unwrap();
        let previous_month = previous_window(month, TrendPeriod::Month).unwrap();
        assert_eq!(previous_month.start, datetime(2024, 2, 1, 0));
        assert_eq!(bucket_count(previous_month, TrendPeriod::Month), 29);

        let year = year_window(date(2024, 3, 20)).unwrap();
        let previous_year = previous_window(year, TrendPeriod::Year).unwrap();
        assert_eq!(previous_year.start, datetime(2023, 1, 1, 0));
    }

    #[test]
    fn test_bucket_index_bounds() {
        let window = week_window(date(2024, 1, 10)).unwrap();

        assert_eq!(
            bucket_index(window, TrendPeriod::Week, window.start),
            Some(0)
        );
        assert_eq!(
            bucket_index(window, TrendPeriod::Week, datetime(2024, 1, 14, 23)),
            Some(6)
        );
        assert_eq!(bucket_index(window, TrendPeriod::Week, window.end), None);
        assert_eq!(
            bucket_index(window, TrendPeriod::Week, datetime(2024, 1, 7, 12)),
            None
        );
    }

    #[test]
    fn test_bucket_amounts_sums_by_day() {
        let window = week_window(date(2024, 1, 10)).unwrap();
        let rows = vec![
            (datetime(2024, 1, 8, 9), 100),
            (datetime(2024, 1, 8, 18), 250),
            (datetime(2024, 1, 12, 12), 75),
            (datetime(2024, 1, 20, 12), 9999),
        ];

        let buckets = bucket_amounts(window, TrendPeriod::Week, &rows);

        assert_eq!(buckets, vec![350, 0, 0, 0, 75, 0, 0]);
    }

    #[test]
    fn test_yearly_bucket_index_uses_months() {
        let window = year_window(date(2024, 1, 1)).unwrap();

        assert_eq!(
            bucket_index(window, TrendPeriod::Year, datetime(2024, 3, 31, 23)),
            Some(2)
        );
        assert_eq!(
            bucket_index(window, TrendPeriod::Year, datetime(2024, 12, 1, 0)),
            Some(11)
        );
    }

    #[test]
    fn test_change_direction_follows_exact_comparison() {
        assert_eq!(change_between(100, 100).direction, TrendDirection::Even);
        assert_eq!(change_between(101, 100).direction, TrendDirection::Up);
        assert_eq!(change_between(99, 100).direction, TrendDirection::Down);
    }

    #[test]
    fn test_change_percent_against_previous_total() {
        let change = change_between(150, 100);
        assert_eq!(change.amount_cents, 50);
        assert!((change.percent - 50.0).abs() < f64::EPSILON);

        let change = change_between(50, 100);
        assert_eq!(change.amount_cents, -50);
        assert!((change.percent + 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_change_with_zero_previous_total() {
        let spent = change_between(10, 0);
        assert!((spent.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(spent.direction, TrendDirection::Up);

        let idle = change_between(0, 0);
        assert!((idle.percent).abs() < f64::EPSILON);
        assert_eq!(idle.direction, TrendDirection::Even);
    }

    #[test]
    fn test_fold_payer_totals_sums_and_sorts_descending() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let rows = vec![(alice, 100), (bob, 400), (alice, 150)];

        let totals = fold_payer_totals(&rows);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].user_id, bob);
        assert_eq!(totals[0].total_cents, 400);
        assert_eq!(totals[1].total_cents, 250);
    }

    #[test]
    fn test_fold_debt_pairs_groups_by_direction() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let rows = vec![(alice, bob, 500), (bob, alice, 300), (alice, bob, 100)];

        let pairs = fold_debt_pairs(&rows);

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].debtor_id, alice);
        assert_eq!(pairs[0].amount_cents, 600);
        assert_eq!(pairs[1].amount_cents, 300);
    }

    #[test]
    fn test_two_member_net_offsets_mutual_debt() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let pairs = vec![
            DebtPair {
                debtor_id: alice,
                payer_id: bob,
                amount_cents: 500,
            },
            DebtPair {
                debtor_id: bob,
                payer_id: alice,
                amount_cents: 300,
            },
        ];

        let net = two_member_net(alice, bob, &pairs);

        assert_eq!(net.debtor_id, alice);
        assert_eq!(net.payer_id, bob);
        assert_eq!(net.amount_cents, 200);
    }

    #[test]
    fn test_two_member_net_zero_when_fully_offset() {
        let alice = Uuid::now_v7();
        let bob = Uuid::now_v7();
        let pairs = vec![
            DebtPair {
                debtor_id: alice,
                payer_id: bob,
                amount_cents: 250,
            },
            DebtPair {
                debtor_id: bob,
                payer_id: alice,
                amount_cents: 250,
            },
        ];

        let net = two_member_net(alice, bob, &pairs);

        assert_eq!(net.amount_cents, 0);
        assert_eq!(net.debtor_id, alice.min(bob));
    }

    #[test]
    fn test_fold_category_totals_sorts_descending() {
        let food = Uuid::now_v7();
        let rent = Uuid::now_v7();
        let rows = vec![(food, 120), (rent, 90_000), (food, 80)];

        let totals = fold_category_totals(&rows);

        assert_eq!(totals[0].category_id, rent);
        assert_eq!(totals[1].total_cents, 200);
    }
}
