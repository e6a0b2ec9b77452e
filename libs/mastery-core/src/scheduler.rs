//! Spaced scheduling helpers.
//!
//! Pure functions: bucket classification from a mastery score and the next
//! review date relative to a reference day.

use crate::types::MasteryBucket;
use chrono::{Duration, NaiveDate};

/// Classify a mastery score (0..=100) into its bucket.
pub fn bucket_of(mastery: u8) -> MasteryBucket {
    match mastery {
        80..=u8::MAX => MasteryBucket::Mastered,
        60..=79 => MasteryBucket::Nearly,
        30..=59 => MasteryBucket::Developing,
        _ => MasteryBucket::Weak,
    }
}

/// Days until the next review for a given mastery and bucket.
///
/// Each tier matches on the score threshold first, then on the bucket. The
/// bucket only counts when it agrees with `bucket_of(mastery)`.
pub fn interval_days(mastery: u8, bucket: MasteryBucket) -> i64 {
    let consistent = bucket == bucket_of(mastery);
    let is = |tier: MasteryBucket| consistent && bucket == tier;

    if mastery >= 81 || is(MasteryBucket::Mastered) {
        10
    } else if mastery >= 61 || is(MasteryBucket::Nearly) {
        4
    } else if mastery >= 31 || is(MasteryBucket::Developing) {
        2
    } else {
        1
    }
}

/// Next due date counted from `from`.
pub fn next_due_date(mastery: u8, bucket: MasteryBucket, from: NaiveDate) -> NaiveDate {
    from + Duration::days(interval_days(mastery, bucket))
}
