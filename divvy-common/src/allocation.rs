use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One member's computed portion of a purchase. Percentages across a share
/// set always sum to exactly 100 and cent amounts always sum to exactly the
/// purchase amount.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AllocatedShare {
    pub user_id: Uuid,
    pub percent: i32,
    pub amount_cents: i64,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct SharePortion {
    pub user_id: Uuid,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SplitMode {
    /// The payer carries the full cost.
    Personal,
    /// The payer takes `payer_percent` (rounded) and the first other member
    /// of the roster takes the complement. Falls back to `Personal` when the
    /// roster contains nobody but the payer.
    TwoParty { payer_percent: f64 },
    /// Caller-supplied portions. Percentages are rounded to the nearest
    /// integer; a rounded sum that misses 100 is corrected on the entry with
    /// the largest percentage (the first such entry on ties).
    Manual { portions: Vec<SharePortion> },
    /// Every roster member takes an equal portion, with the remainder spread
    /// one unit at a time over the earliest members.
    EqualSplit,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AllocationError {
    NoEligibleMembers,
    NotAMember(Uuid),
    DuplicateMember(Uuid),
    PercentOutOfRange(i32),
    UncorrectableSum(i32),
    EmptyOverride,
}

impl std::error::Error for AllocationError {}

impl fmt::Display for AllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationError::NoEligibleMembers => {
                write!(f, "AllocationError: No eligible members to allocate to")
            }
            AllocationError::NotAMember(id) => {
                write!(f, "AllocationError: User {id} is not a budget member")
            }
            AllocationError::DuplicateMember(id) => {
                write!(f, "AllocationError: User {id} appears more than once")
            }
            AllocationError::PercentOutOfRange(percent) => {
                write!(f, "AllocationError: Percentage {percent} is outside 0-100")
            }
            AllocationError::UncorrectableSum(sum) => {
                write!(
                    f,
                    "AllocationError: Percentages sum to {sum} and cannot be corrected to 100"
                )
            }
            AllocationError::EmptyOverride => {
                write!(f, "AllocationError: Share override contains no entries")
            }
        }
    }
}

/// Computes the share set for a purchase of `amount_cents` paid by
/// `payer_id`, splitting across `eligible_members` according to `mode`.
///
/// The roster must contain the payer and every user referenced by the mode.
/// The returned shares carry percentages summing to exactly 100 (none
/// negative) and cent amounts summing to exactly `amount_cents`.
pub fn allocate(
    amount_cents: i64,
    payer_id: Uuid,
    eligible_members: &[Uuid],
    mode: &SplitMode,
) -> Result<Vec<AllocatedShare>, AllocationError> {
    if eligible_members.is_empty() {
        return Err(AllocationError::NoEligibleMembers);
    }

    if !eligible_members.contains(&payer_id) {
        return Err(AllocationError::NotAMember(payer_id));
    }

    match mode {
        SplitMode::Personal => Ok(vec![AllocatedShare {
            user_id: payer_id,
            percent: 100,
            amount_cents,
        }]),
        SplitMode::TwoParty { payer_percent } => {
            let payer_percent = round_percent(*payer_percent)?;

            let Some(other_id) = eligible_members.iter().find(|id| **id != payer_id) else {
                return Ok(vec![AllocatedShare {
                    user_id: payer_id,
                    percent: 100,
                    amount_cents,
                }]);
            };

            Ok(amounts_from_percents(
                amount_cents,
                vec![(payer_id, payer_percent), (*other_id, 100 - payer_percent)],
            ))
        }
        SplitMode::Manual { portions } => {
            if portions.is_empty() {
                return Err(AllocationError::EmptyOverride);
            }

            let mut rounded = Vec::with_capacity(portions.len());

            for portion in portions {
                if !eligible_members.contains(&portion.user_id) {
                    return Err(AllocationError::NotAMember(portion.user_id));
                }

                if rounded.iter().any(|(id, _)| *id == portion.user_id) {
                    return Err(AllocationError::DuplicateMember(portion.user_id));
                }

                rounded.push((portion.user_id, round_percent(portion.percent)?));
            }

            let sum: i32 = rounded.iter().map(|(_, percent)| percent).sum();

            if sum != 100 {
                let largest_pos = position_of_largest(&rounded);
                let corrected = rounded[largest_pos].1 + (100 - sum);

                // The corrected entry can never exceed 100 (every other entry
                // is non-negative), but a large over-sum can push it below
                // zero, which would silently invert the share.
                if corrected < 0 {
                    return Err(AllocationError::UncorrectableSum(sum));
                }

                rounded[largest_pos].1 = corrected;
            }

            Ok(amounts_from_percents(amount_cents, rounded))
        }
        SplitMode::EqualSplit => {
            let mut members = Vec::with_capacity(eligible_members.len());

            for id in eligible_members {
                if members.contains(id) {
                    return Err(AllocationError::DuplicateMember(*id));
                }

                members.push(*id);
            }

            Ok(equal_split(amount_cents, &members))
        }
    }
}

fn round_percent(percent: f64) -> Result<i32, AllocationError> {
    let rounded = percent.round() as i32;

    if !(0..=100).contains(&rounded) {
        return Err(AllocationError::PercentOutOfRange(rounded));
    }

    Ok(rounded)
}

fn position_of_largest(portions: &[(Uuid, i32)]) -> usize {
    let mut largest_pos = 0;

    for (pos, (_, percent)) in portions.iter().enumerate().skip(1) {
        if *percent > portions[largest_pos].1 {
            largest_pos = pos;
        }
    }

    largest_pos
}

/// Splits both the 100 percentage points and the cent amount directly,
/// handing the remainder of each one unit at a time to the earliest members.
/// Splitting cents directly (rather than deriving them from the rounded
/// percentages) keeps evenly divisible amounts exact: 90 cents across three
/// members is [30, 30, 30].
fn equal_split(amount_cents: i64, members: &[Uuid]) -> Vec<AllocatedShare> {
    let count = members.len();
    let base_percent = (100 / count) as i32;
    let percent_remainder = (100 % count) as i32;
    let base_cents = amount_cents / count as i64;
    let cents_remainder = amount_cents % count as i64;

    members
        .iter()
        .enumerate()
        .map(|(pos, id)| AllocatedShare {
            user_id: *id,
            percent: if (pos as i32) < percent_remainder {
                base_percent + 1
            } else {
                base_percent
            },
            amount_cents: if (pos as i64) < cents_remainder {
                base_cents + 1
            } else {
                base_cents
            },
        })
        .collect()
}

/// Converts a percentage split (summing to 100) into exact cent amounts.
/// Each entry gets the floor of its proportional amount; leftover cents go
/// one at a time to the entries with the largest percentages (first listed
/// wins ties) so no money is dropped.
fn amounts_from_percents(amount_cents: i64, portions: Vec<(Uuid, i32)>) -> Vec<AllocatedShare> {
    let mut shares: Vec<AllocatedShare> = portions
        .into_iter()
        .map(|(user_id, percent)| AllocatedShare {
            user_id,
            percent,
            amount_cents: amount_cents * percent as i64 / 100,
        })
        .collect();

    let allocated: i64 = shares.iter().map(|share| share.amount_cents).sum();
    let mut leftover = amount_cents - allocated;

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by_key(|pos| (-shares[*pos].percent, *pos));

    for pos in order {
        if leftover == 0 {
            break;
        }

        shares[pos].amount_cents += 1;
        leftover -= 1;
    }

    shares
}
