use chrono::NaiveDateTime;
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::category::Category;
use crate::reports::{self, DateWindow, TrendPeriod};
use crate::request_io::{
    OutputCategoryTotalItem, OutputCategoryTotals, OutputCurrentBalance, OutputSpendingTrend,
    OutputTrendPoint, OutputTrendSeries, TrendSelection,
};

use crate::schema::budget_members as budget_member_fields;
use crate::schema::budget_members::dsl::budget_members;
use crate::schema::categories as category_fields;
use crate::schema::categories::dsl::categories;
use crate::schema::purchase_shares as purchase_share_fields;
use crate::schema::purchase_shares::dsl::purchase_shares;
use crate::schema::purchases as purchase_fields;
use crate::schema::purchases::dsl::purchases;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_current_balance(
        &self,
        budget_id: Uuid,
        date_from: Option<NaiveDateTime>,
        date_to: Option<NaiveDateTime>,
    ) -> Result<OutputCurrentBalance, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (payer_rows, debt_rows, member_ids) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let mut payer_query = purchases
                    .select((purchase_fields::paid_by, purchase_fields::amount_cents))
                    .filter(purchase_fields::budget_id.eq(budget_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .into_boxed();

                if let Some(date_from) = date_from {
                    payer_query = payer_query.filter(purchase_fields::paid_at.ge(date_from));
                }

                if let Some(date_to) = date_to {
                    payer_query = payer_query.filter(purchase_fields::paid_at.lt(date_to));
                }

                let payer_rows = payer_query.load::<(Uuid, i64)>(conn)?;

                // The debt ledger is all-time; the date range restricts the paid
                // totals only. A debt stays owed regardless of the reporting window.
                let debt_rows = purchase_shares
                    .inner_join(purchases)
                    .select((
                        purchase_share_fields::user_id,
                        purchase_fields::paid_by,
                        purchase_share_fields::amount_cents,
                    ))
                    .filter(purchase_fields::budget_id.eq(budget_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(purchase_share_fields::is_settled.eq(false))
                    .filter(purchase_share_fields::percent.gt(0))
                    .filter(purchase_share_fields::user_id.ne(purchase_fields::paid_by))
                    .load::<(Uuid, Uuid, i64)>(conn)?;

                let member_ids = budget_members
                    .select(budget_member_fields::user_id)
                    .filter(budget_member_fields::budget_id.eq(budget_id))
                    .order((
                        budget_member_fields::created_timestamp.asc(),
                        budget_member_fields::user_id.asc(),
                    ))
                    .load::<Uuid>(conn)?;

                Ok((payer_rows, debt_rows, member_ids))
            })?;

        let payer_totals = reports::fold_payer_totals(&payer_rows);
        let pairs = reports::fold_debt_pairs(&debt_rows);

        let net_between_two_users = if member_ids.len() == 2 {
            Some(reports::two_member_net(member_ids[0], member_ids[1], &pairs))
        } else {
            None
        };

        Ok(OutputCurrentBalance {
            payer_totals,
            pairs,
            net_between_two_users,
        })
    }

    pub fn get_category_totals(
        &self,
        budget_id: Uuid,
        window: DateWindow,
    ) -> Result<OutputCategoryTotals, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let (total_rows, budget_categories) = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let total_rows = purchases
                    .select((purchase_fields::category_id, purchase_fields::amount_cents))
                    .filter(purchase_fields::budget_id.eq(budget_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(purchase_fields::paid_at.ge(window.start))
                    .filter(purchase_fields::paid_at.lt(window.end))
                    .load::<(Uuid, i64)>(conn)?;

                let budget_categories = categories
                    .filter(category_fields::budget_id.eq(budget_id))
                    .load::<Category>(conn)?;

                Ok((total_rows, budget_categories))
            })?;

        let totals = reports::fold_category_totals(&total_rows);
        let grand_total_cents = totals.iter().map(|total| total.total_cents).sum();

        let mut items = Vec::with_capacity(totals.len());
        for total in totals {
            let category = budget_categories
                .iter()
                .find(|category| category.id == total.category_id)
                .ok_or(DaoError::CannotRunQuery(
                    "Purchase references a category outside its budget",
                ))?;

            items.push(OutputCategoryTotalItem {
                category_id: total.category_id,
                name: category.name.clone(),
                color: category.color.clone(),
                total_cents: total.total_cents,
            });
        }

        // Equal totals are ordered by category name
        items.sort_by(|a, b| {
            b.total_cents
                .cmp(&a.total_cents)
                .then_with(|| a.name.cmp(&b.name))
        });

        Ok(OutputCategoryTotals {
            items,
            grand_total_cents,
            range: window,
        })
    }

    pub fn get_spending_trend(
        &self,
        budget_id: Uuid,
        period: TrendPeriod,
        selection: &TrendSelection,
        current_window: DateWindow,
        previous_window: DateWindow,
    ) -> Result<OutputSpendingTrend, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let rows = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let mut query = purchases
                    .select((
                        purchase_fields::category_id,
                        purchase_fields::paid_at,
                        purchase_fields::amount_cents,
                    ))
                    .filter(purchase_fields::budget_id.eq(budget_id))
                    .filter(purchase_fields::is_deleted.eq(false))
                    .filter(purchase_fields::paid_at.ge(previous_window.start))
                    .filter(purchase_fields::paid_at.lt(current_window.end))
                    .into_boxed();

                match selection {
                    TrendSelection::Total => (),
                    TrendSelection::Single(category_id) => {
                        query = query.filter(purchase_fields::category_id.eq(*category_id));
                    }
                    TrendSelection::Set { category_ids, .. } => {
                        query = query
                            .filter(purchase_fields::category_id.eq_any(category_ids.clone()));
                    }
                }

                query.load::<(Uuid, NaiveDateTime, i64)>(conn)
            })?;

        let current_total_cents = rows
            .iter()
            .filter(|(_, paid_at, _)| current_window.contains(*paid_at))
            .map(|(_, _, amount_cents)| amount_cents)
            .sum::<i64>();
        let previous_total_cents = rows
            .iter()
            .filter(|(_, paid_at, _)| previous_window.contains(*paid_at))
            .map(|(_, _, amount_cents)| amount_cents)
            .sum::<i64>();

        let change = reports::change_between(current_total_cents, previous_total_cents);

        let (points, series) = match selection {
            TrendSelection::Total | TrendSelection::Single(_) => {
                let point_rows = current_window_rows(&rows, current_window, None);
                (Some(build_points(current_window, period, &point_rows)), None)
            }
            TrendSelection::Set { combine: true, .. } => {
                let point_rows = current_window_rows(&rows, current_window, None);
                (Some(build_points(current_window, period, &point_rows)), None)
            }
            TrendSelection::Set {
                category_ids,
                combine: false,
            } => {
                let mut series = Vec::with_capacity(category_ids.len());
                for category_id in category_ids {
                    let point_rows =
                        current_window_rows(&rows, current_window, Some(*category_id));

                    series.push(OutputTrendSeries {
                        category_id: *category_id,
                        points: build_points(current_window, period, &point_rows),
                    });
                }

                (None, Some(series))
            }
        };

        Ok(OutputSpendingTrend {
            points,
            series,
            current_total_cents,
            previous_total_cents,
            change,
        })
    }
}

fn current_window_rows(
    rows: &[(Uuid, NaiveDateTime, i64)],
    window: DateWindow,
    category_id: Option<Uuid>,
) -> Vec<(NaiveDateTime, i64)> {
    rows.iter()
        .filter(|(row_category_id, paid_at, _)| {
            window.contains(*paid_at)
                && category_id.map_or(true, |wanted| *row_category_id == wanted)
        })
        .map(|(_, paid_at, amount_cents)| (*paid_at, *amount_cents))
        .collect()
}

fn build_points(
    window: DateWindow,
    period: TrendPeriod,
    rows: &[(NaiveDateTime, i64)],
) -> Vec<OutputTrendPoint> {
    let bucket_starts = reports::bucket_starts(window, period);
    let bucket_amounts = reports::bucket_amounts(window, period, rows);

    bucket_starts
        .into_iter()
        .zip(bucket_amounts)
        .map(|(bucket_start, amount_cents)| OutputTrendPoint {
            bucket_start,
            amount_cents,
        })
        .collect()
}
