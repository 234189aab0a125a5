use chrono::NaiveDate;

/// Fraction of an item's active range that has elapsed by `reference` (or `today`).
///
/// Missing dates and inverted ranges count as fully due.
pub fn time_factor(
    item_start: Option<NaiveDate>,
    item_end: Option<NaiveDate>,
    reference: Option<NaiveDate>,
    today: NaiveDate,
) -> f64 {
    let (Some(start), Some(end)) = (item_start, item_end) else {
        return 1.0;
    };
    if end < start {
        return 1.0;
    }

    let reference = reference.unwrap_or(today);
    if reference < start {
        return 0.0;
    }

    let effective = reference.min(end);
    let total_days = (end - start).num_days() + 1;
    let elapsed_days = (effective - start).num_days() + 1;
    if total_days <= 0 {
        return 1.0;
    }

    (elapsed_days as f64 / total_days as f64).clamp(0.0, 1.0)
}
