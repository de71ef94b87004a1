use chrono::{Days, Months, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceUnit {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrenceUnit {
    pub fn from_i16(value: i16) -> Option<RecurrenceUnit> {
        match value {
            0 => Some(RecurrenceUnit::Daily),
            1 => Some(RecurrenceUnit::Weekly),
            2 => Some(RecurrenceUnit::Monthly),
            3 => Some(RecurrenceUnit::Yearly),
            _ => None,
        }
    }
}

impl From<RecurrenceUnit> for i16 {
    fn from(unit: RecurrenceUnit) -> Self {
        match unit {
            RecurrenceUnit::Daily => 0,
            RecurrenceUnit::Weekly => 1,
            RecurrenceUnit::Monthly => 2,
            RecurrenceUnit::Yearly => 3,
        }
    }
}

/// Computes the occurrence following `from`. A non-positive `interval` is
/// clamped to 1. Monthly and yearly steps clamp to the last day of a short
/// target month (Jan 31 plus one month lands on Feb 28/29). All arithmetic
/// is calendar arithmetic on the stored timestamp; no time zone conversion
/// is applied.
///
/// Returns `None` only if the date arithmetic overflows chrono's range.
pub fn advance(
    from: NaiveDateTime,
    unit: RecurrenceUnit,
    interval: i32,
) -> Option<NaiveDateTime> {
    let interval = interval.max(1) as u32;

    match unit {
        RecurrenceUnit::Daily => from.checked_add_days(Days::new(interval.into())),
        RecurrenceUnit::Weekly => from.checked_add_days(Days::new(u64::from(interval) * 7)),
        RecurrenceUnit::Monthly => from.checked_add_months(Months::new(interval)),
        RecurrenceUnit::Yearly => from.checked_add_months(Months::new(interval.saturating_mul(12))),
    }
}

/// Steps `occurrence` forward until it lies strictly beyond `now`. Looping
/// (rather than stepping once) guarantees a rule that has been overdue for
/// many periods is scheduled into the future rather than refiring on the
/// next invocation.
pub fn advance_past(
    mut occurrence: NaiveDateTime,
    now: NaiveDateTime,
    unit: RecurrenceUnit,
    interval: i32,
) -> Option<NaiveDateTime> {
    while occurrence <= now {
        occurrence = advance(occurrence, unit, interval)?;
    }

    Some(occurrence)
}

/// Schedule fields for a new rule, produced by resolving a recurrence
/// request against the timestamp of the record it accompanies.
#[derive(Clone, Debug)]
pub struct ResolvedRecurrence {
    pub unit: RecurrenceUnit,
    pub interval: i32,
    pub time_zone: String,
    pub start_at: NaiveDateTime,
    pub end_at: Option<NaiveDateTime>,
    pub next_run_at: NaiveDateTime,
}

/// Computes a new rule's first `next_run_at`: the start timestamp itself if
/// it is still in the future, otherwise the first occurrence strictly beyond
/// `now`.
pub fn first_run_at(
    start_at: NaiveDateTime,
    now: NaiveDateTime,
    unit: RecurrenceUnit,
    interval: i32,
) -> Option<NaiveDateTime> {
    if start_at > now {
        Some(start_at)
    } else {
        advance_past(start_at, now, unit, interval)
    }
}
