use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::SharePortion;
use crate::models::budget_member::MemberRole;
use crate::recurrence::{self, RecurrenceUnit, ResolvedRecurrence};
use crate::reports::{TotalsPeriod, TrendPeriod};
use crate::validators::{self, Validity};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub email: String,
    pub password: String,
}

impl CredentialPair {
    pub fn validate_email_address(&self) -> Validity {
        validators::validate_email_address(&self.email)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputUser {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl InputUser {
    pub fn validate(&self) -> Validity {
        let email_validity = validators::validate_email_address(&self.email);
        if !email_validity.is_valid() {
            return email_validity;
        }

        let name_validity = validators::validate_display_name(&self.display_name);
        if !name_validity.is_valid() {
            return name_validity;
        }

        validators::validate_password(&self.password)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputCategory {
    pub name: String,
    pub color: String,
}

impl InputCategory {
    pub fn validate(&self) -> Validity {
        let name_validity = validators::validate_item_name(&self.name);
        if !name_validity.is_valid() {
            return name_validity;
        }

        validators::validate_category_color(&self.color)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputEditCategory {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl InputEditCategory {
    pub fn validate(&self) -> Validity {
        if let Some(name) = &self.name {
            let name_validity = validators::validate_item_name(name);
            if !name_validity.is_valid() {
                return name_validity;
            }
        }

        if let Some(color) = &self.color {
            let color_validity = validators::validate_category_color(color);
            if !color_validity.is_valid() {
                return color_validity;
            }
        }

        Validity::Valid
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputBudget {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<InputCategory>,
}

impl InputBudget {
    pub fn validate(&self) -> Validity {
        let slug_validity = validators::validate_budget_slug(&self.slug);
        if !slug_validity.is_valid() {
            return slug_validity;
        }

        let name_validity = validators::validate_item_name(&self.name);
        if !name_validity.is_valid() {
            return name_validity;
        }

        for category in &self.categories {
            let category_validity = category.validate();
            if !category_validity.is_valid() {
                return category_validity;
            }
        }

        Validity::Valid
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputBudgetInvite {
    pub recipient_email: String,
    pub role: MemberRole,
}

impl InputBudgetInvite {
    pub fn validate_email_address(&self) -> Validity {
        validators::validate_email_address(&self.recipient_email)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputMemberRole {
    pub role: MemberRole,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputRecurrence {
    pub recurrence: RecurrenceUnit,
    pub interval: Option<i32>,
    pub start_at: Option<NaiveDateTime>,
    pub time_zone: Option<String>,
    pub end_at: Option<NaiveDateTime>,
}

impl InputRecurrence {
    /// Resolves the requested schedule into concrete rule fields.
    /// `default_start` anchors the schedule when no explicit start was given
    /// (the paid/received timestamp of the record the rule accompanies).
    pub fn resolve(
        &self,
        default_start: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<ResolvedRecurrence, String> {
        if let Some(interval) = self.interval {
            if interval < 1 {
                return Err(String::from("Recurrence interval must be at least 1."));
            }
        }

        let interval = self.interval.unwrap_or(1);
        let start_at = self.start_at.unwrap_or(default_start);

        if let Some(end_at) = self.end_at {
            if end_at < start_at {
                return Err(String::from("Recurrence cannot end before it starts."));
            }
        }

        let Some(next_run_at) = recurrence::first_run_at(start_at, now, self.recurrence, interval)
        else {
            return Err(String::from("Recurrence start date is out of range."));
        };

        Ok(ResolvedRecurrence {
            unit: self.recurrence,
            interval,
            time_zone: self
                .time_zone
                .clone()
                .unwrap_or_else(|| String::from("UTC")),
            start_at,
            end_at: self.end_at,
            next_run_at,
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputPurchase {
    pub item_name: String,
    pub category_id: Uuid,
    pub amount_cents: i64,
    pub paid_at: Option<NaiveDateTime>,
    pub paid_by: Option<Uuid>,
    #[serde(default)]
    pub shared: bool,
    pub split_percent_for_payer: Option<f64>,
    pub shares_override: Option<Vec<SharePortion>>,
    pub notes: Option<String>,
    pub recurring: Option<InputRecurrence>,
}

impl InputPurchase {
    pub fn validate(&self) -> Validity {
        let name_validity = validators::validate_item_name(&self.item_name);
        if !name_validity.is_valid() {
            return name_validity;
        }

        validators::validate_amount_cents(self.amount_cents)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputIncome {
    pub item_name: String,
    pub amount_cents: i64,
    pub received_at: Option<NaiveDateTime>,
    pub received_by: Option<Uuid>,
    pub notes: Option<String>,
    pub recurring: Option<InputRecurrence>,
}

impl InputIncome {
    pub fn validate(&self) -> Validity {
        let name_validity = validators::validate_item_name(&self.item_name);
        if !name_validity.is_valid() {
            return name_validity;
        }

        validators::validate_amount_cents(self.amount_cents)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputSettle {
    pub settled: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputRuleActive {
    pub active: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputPurchaseFilters {
    pub category: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputBalanceParams {
    pub budget: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputCategoryTotalsParams {
    pub budget: String,
    pub period: TotalsPeriod,
    pub anchor_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputTrendParams {
    pub period: TrendPeriod,
    pub category: Option<String>,
    pub categories: Option<String>,
    pub combine: Option<bool>,
}

/// The category selection of a spending-trend query: one category, the
/// aggregate of the whole budget, or an explicit category set rendered as
/// either one combined series or one series per category.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TrendSelection {
    Total,
    Single(Uuid),
    Set { category_ids: Vec<Uuid>, combine: bool },
}

impl InputTrendParams {
    pub fn selection(&self) -> Result<TrendSelection, String> {
        match (&self.category, &self.categories) {
            (Some(_), Some(_)) => Err(String::from(
                "Provide either a category or a list of categories, not both.",
            )),
            (Some(category), None) => {
                if category == "TOTAL" {
                    return Ok(TrendSelection::Total);
                }

                match Uuid::try_parse(category) {
                    Ok(id) => Ok(TrendSelection::Single(id)),
                    Err(_) => Err(String::from(
                        "Category must be a category ID or the literal \"TOTAL\".",
                    )),
                }
            }
            (None, Some(categories)) => {
                let mut category_ids = Vec::new();

                for part in categories.split(',') {
                    match Uuid::try_parse(part.trim()) {
                        Ok(id) => category_ids.push(id),
                        Err(_) => {
                            return Err(String::from("Category list must contain category IDs."))
                        }
                    }
                }

                if category_ids.is_empty() {
                    return Err(String::from("Category list cannot be empty."));
                }

                Ok(TrendSelection::Set {
                    category_ids,
                    combine: self.combine.unwrap_or(false),
                })
            }
            (None, None) => Ok(TrendSelection::Total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(category: Option<&str>, categories: Option<&str>) -> InputTrendParams {
        InputTrendParams {
            period: TrendPeriod::Week,
            category: category.map(String::from),
            categories: categories.map(String::from),
            combine: None,
        }
    }

    #[test]
    fn test_trend_selection_defaults_to_total() {
        assert_eq!(params(None, None).selection(), Ok(TrendSelection::Total));
        assert_eq!(
            params(Some("TOTAL"), None).selection(),
            Ok(TrendSelection::Total)
        );
    }

    #[test]
    fn test_trend_selection_single_category() {
        let id = Uuid::now_v7();

        assert_eq!(
            params(Some(&id.to_string()), None).selection(),
            Ok(TrendSelection::Single(id))
        );
    }

    #[test]
    fn test_trend_selection_category_set() {
        let first = Uuid::now_v7();
        let second = Uuid::now_v7();
        let list = format!("{first},{second}");

        let mut input = params(None, Some(&list));
        input.combine = Some(true);

        assert_eq!(
            input.selection(),
            Ok(TrendSelection::Set {
                category_ids: vec![first, second],
                combine: true,
            })
        );
    }

    #[test]
    fn test_trend_selection_rejects_malformed_input() {
        assert!(params(Some("not-a-uuid"), None).selection().is_err());
        assert!(params(None, Some("a,b")).selection().is_err());
        assert!(params(Some("TOTAL"), Some("anything")).selection().is_err());
    }

    fn datetime(year: i32, month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_recurrence_resolve_defaults() {
        let input = InputRecurrence {
            recurrence: RecurrenceUnit::Monthly,
            interval: None,
            start_at: None,
            time_zone: None,
            end_at: None,
        };

        let now = datetime(2023, 5, 10);
        let resolved = input.resolve(now, now).unwrap();

        assert_eq!(resolved.interval, 1);
        assert_eq!(resolved.time_zone, "UTC");
        assert_eq!(resolved.start_at, now);
        // A schedule anchored at the current moment first fires one unit later
        assert_eq!(resolved.next_run_at, datetime(2023, 6, 10));
    }

    #[test]
    fn test_recurrence_resolve_keeps_future_start() {
        let input = InputRecurrence {
            recurrence: RecurrenceUnit::Weekly,
            interval: Some(2),
            start_at: Some(datetime(2023, 5, 24)),
            time_zone: Some(String::from("America/New_York")),
            end_at: Some(datetime(2023, 12, 31)),
        };

        let resolved = input
            .resolve(datetime(2023, 5, 10), datetime(2023, 5, 10))
            .unwrap();

        assert_eq!(resolved.start_at, datetime(2023, 5, 24));
        assert_eq!(resolved.next_run_at, datetime(2023, 5, 24));
        assert_eq!(resolved.time_zone, "America/New_York");
        assert_eq!(resolved.end_at, Some(datetime(2023, 12, 31)));
    }

    #[test]
    fn test_recurrence_resolve_rejects_malformed_schedules() {
        let now = datetime(2023, 5, 10);

        let mut input = InputRecurrence {
            recurrence: RecurrenceUnit::Daily,
            interval: Some(0),
            start_at: None,
            time_zone: None,
            end_at: None,
        };

        assert!(input.resolve(now, now).is_err());

        input.interval = Some(1);
        input.end_at = Some(datetime(2023, 5, 9));

        assert!(input.resolve(now, now).is_err());
    }
}
