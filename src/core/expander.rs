use crate::domain::model::{EventTemplate, Occurrence, RecurrencePattern, RecurrenceRule};
use crate::utils::error::{Result, SchedulerError};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

/// Expands a base occurrence and a recurrence rule into concrete occurrences.
///
/// Weekly series step cumulatively from the previous occurrence; monthly
/// series are recomputed from the base each time. Every generated occurrence
/// keeps the base duration. Occurrences come back without a series id; the
/// submitter stamps one when more than one is persisted.
pub fn expand(
    template: &EventTemplate,
    base_start: NaiveDateTime,
    base_end: NaiveDateTime,
    rule: &RecurrenceRule,
) -> Result<Vec<Occurrence>> {
    if base_end <= base_start {
        return Err(SchedulerError::validation(format!(
            "event end {} must be after start {}",
            base_end, base_start
        )));
    }
    validate_rule(rule)?;

    let base = Occurrence {
        series_id: None,
        index: 0,
        start: base_start,
        end: base_end,
    };

    let occurrences = match rule.pattern {
        RecurrencePattern::None => vec![base],
        RecurrencePattern::Weekly => expand_weekly(base, rule)?,
        RecurrencePattern::Monthly => expand_monthly(base, rule)?,
    };

    tracing::debug!(
        "Expanded '{}' into {} occurrence(s) ({:?}, every {})",
        template.title,
        occurrences.len(),
        rule.pattern,
        rule.effective_interval()
    );

    Ok(occurrences)
}

fn validate_rule(rule: &RecurrenceRule) -> Result<()> {
    if let Some(weekday) = rule.weekday {
        if weekday > 6 {
            return Err(SchedulerError::validation(format!(
                "weekday must be between 0 (Sunday) and 6 (Saturday), got {}",
                weekday
            )));
        }
    }
    if let Some(day) = rule.day_of_month {
        if !(1..=31).contains(&day) {
            return Err(SchedulerError::validation(format!(
                "day of month must be between 1 and 31, got {}",
                day
            )));
        }
    }
    Ok(())
}

fn expand_weekly(base: Occurrence, rule: &RecurrenceRule) -> Result<Vec<Occurrence>> {
    let duration = base.duration();
    let step = Duration::days(7 * i64::from(rule.effective_interval()));
    let count = rule.effective_count();

    let mut occurrences = Vec::with_capacity(count as usize);
    let mut previous_start = base.start;
    occurrences.push(base);

    for index in 1..count {
        let mut start = add_days(previous_start, step)?;
        if let Some(weekday) = rule.weekday {
            let current = start.weekday().num_days_from_sunday() as i64;
            let shift = (i64::from(weekday) - current + 7) % 7;
            start = add_days(start, Duration::days(shift))?;
        }
        let end = add_days(start, duration)?;
        occurrences.push(Occurrence {
            series_id: None,
            index,
            start,
            end,
        });
        previous_start = start;
    }

    Ok(occurrences)
}

fn expand_monthly(base: Occurrence, rule: &RecurrenceRule) -> Result<Vec<Occurrence>> {
    let duration = base.duration();
    let interval = rule.effective_interval();
    let count = rule.effective_count();

    let mut occurrences = Vec::with_capacity(count as usize);
    for index in 0..count {
        let start = shift_months(base.start, interval * index, rule.day_of_month)?;
        let end = add_days(start, duration)?;
        occurrences.push(Occurrence {
            series_id: None,
            index,
            start,
            end,
        });
    }

    Ok(occurrences)
}

/// Moves `from` forward by `months`, overriding the day when requested.
/// Days past the end of the target month clamp to its last day.
fn shift_months(from: NaiveDateTime, months: u32, day_override: Option<u8>) -> Result<NaiveDateTime> {
    let month_index = i64::from(from.year()) * 12 + i64::from(from.month0()) + i64::from(months);
    let year = i32::try_from(month_index.div_euclid(12))
        .map_err(|_| SchedulerError::validation("recurrence runs past the supported calendar"))?;
    let month = month_index.rem_euclid(12) as u32 + 1;

    let wanted_day = day_override.map(u32::from).unwrap_or_else(|| from.day());
    let day = wanted_day.min(days_in_month(year, month)?);

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.and_time(from.time()))
        .ok_or_else(|| {
            SchedulerError::validation(format!("invalid date {}-{:02}-{:02}", year, month, day))
        })
}

fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .ok_or_else(|| SchedulerError::validation("recurrence runs past the supported calendar"))
}

fn add_days(at: NaiveDateTime, by: Duration) -> Result<NaiveDateTime> {
    at.checked_add_signed(by)
        .ok_or_else(|| SchedulerError::validation("recurrence runs past the supported calendar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn template() -> EventTemplate {
        EventTemplate {
            title: "Campus clean-up".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_recurrence_returns_base() {
        let start = at(2024, 3, 1, 9, 0);
        let end = at(2024, 3, 1, 11, 0);
        let occurrences = expand(&template(), start, end, &RecurrenceRule::none()).unwrap();

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].index, 0);
        assert_eq!(occurrences[0].start, start);
        assert_eq!(occurrences[0].end, end);
        assert_eq!(occurrences[0].series_id, None);
    }

    #[test]
    fn test_weekly_example_four_fridays() {
        let occurrences = expand(
            &template(),
            at(2024, 3, 1, 9, 0),
            at(2024, 3, 1, 11, 0),
            &RecurrenceRule::weekly(1, 4),
        )
        .unwrap();

        let starts: Vec<NaiveDate> = occurrences.iter().map(|o| o.start.date()).collect();
        assert_eq!(
            starts,
            vec![
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 22).unwrap(),
            ]
        );
        for occurrence in &occurrences {
            assert_eq!(occurrence.duration(), Duration::hours(2));
        }
    }

    #[test]
    fn test_weekly_steps_cumulatively() {
        let base = at(2024, 1, 10, 18, 0);
        let occurrences = expand(
            &template(),
            base,
            at(2024, 1, 10, 20, 0),
            &RecurrenceRule::weekly(2, 3),
        )
        .unwrap();

        let offsets: Vec<i64> = occurrences
            .iter()
            .map(|o| (o.start - base).num_days())
            .collect();
        assert_eq!(offsets, vec![0, 14, 28]);
        let indexes: Vec<u32> = occurrences.iter().map(|o| o.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn test_weekly_weekday_shift_applies_after_each_step() {
        // 2024-03-01 is a Friday; ask for Mondays (1).
        let occurrences = expand(
            &template(),
            at(2024, 3, 1, 9, 0),
            at(2024, 3, 1, 12, 0),
            &RecurrenceRule::weekly(1, 3).on_weekday(1),
        )
        .unwrap();

        assert_eq!(occurrences[0].start, at(2024, 3, 1, 9, 0));
        assert_eq!(occurrences[1].start, at(2024, 3, 11, 9, 0));
        assert_eq!(occurrences[2].start, at(2024, 3, 18, 9, 0));
        assert_eq!(occurrences[1].start.weekday(), Weekday::Mon);
        assert_eq!(occurrences[2].end, at(2024, 3, 18, 12, 0));
    }

    #[test]
    fn test_monthly_is_not_cumulative() {
        let occurrences = expand(
            &template(),
            at(2024, 1, 15, 10, 0),
            at(2024, 1, 15, 12, 0),
            &RecurrenceRule::monthly(1, 3),
        )
        .unwrap();

        let months: Vec<u32> = occurrences.iter().map(|o| o.start.month()).collect();
        assert_eq!(months, vec![1, 2, 3]);
        assert!(occurrences.iter().all(|o| o.start.day() == 15));
    }

    #[test]
    fn test_monthly_interval_crosses_year() {
        let occurrences = expand(
            &template(),
            at(2024, 11, 5, 10, 0),
            at(2024, 11, 5, 12, 0),
            &RecurrenceRule::monthly(2, 3),
        )
        .unwrap();

        assert_eq!(occurrences[1].start, at(2025, 1, 5, 10, 0));
        assert_eq!(occurrences[2].start, at(2025, 3, 5, 10, 0));
    }

    #[test]
    fn test_monthly_day_override_clamps_to_month_end() {
        let occurrences = expand(
            &template(),
            at(2024, 1, 10, 19, 0),
            at(2024, 1, 10, 21, 0),
            &RecurrenceRule::monthly(1, 4).on_day_of_month(31),
        )
        .unwrap();

        let dates: Vec<NaiveDate> = occurrences.iter().map(|o| o.start.date()).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn test_monthly_overnight_event_keeps_duration() {
        let occurrences = expand(
            &template(),
            at(2024, 1, 31, 22, 0),
            at(2024, 2, 1, 2, 0),
            &RecurrenceRule::monthly(1, 3),
        )
        .unwrap();

        assert_eq!(occurrences[1].start, at(2024, 2, 29, 22, 0));
        assert_eq!(occurrences[1].end, at(2024, 3, 1, 2, 0));
        assert!(occurrences.iter().all(|o| o.duration() == Duration::hours(4)));
    }

    #[test]
    fn test_count_is_bounded() {
        let start = at(2024, 3, 1, 9, 0);
        let end = at(2024, 3, 1, 10, 0);
        for count in [0, 1, 5, 24, 25, 1000] {
            for rule in [RecurrenceRule::weekly(1, count), RecurrenceRule::monthly(1, count)] {
                let len = expand(&template(), start, end, &rule).unwrap().len();
                assert!((1..=24).contains(&len), "count {} produced {}", count, len);
            }
        }
        let len = expand(&template(), start, end, &RecurrenceRule::weekly(1, 1000))
            .unwrap()
            .len();
        assert_eq!(len, 24);
    }

    #[test]
    fn test_duration_preserved_for_every_pattern() {
        let start = at(2024, 5, 31, 8, 30);
        let end = at(2024, 6, 2, 17, 45);
        let rules = [
            RecurrenceRule::none(),
            RecurrenceRule::weekly(3, 10).on_weekday(0),
            RecurrenceRule::monthly(1, 12),
            RecurrenceRule::monthly(5, 24).on_day_of_month(30),
        ];
        for rule in &rules {
            for occurrence in expand(&template(), start, end, rule).unwrap() {
                assert_eq!(occurrence.end - occurrence.start, end - start);
            }
        }
    }

    #[test]
    fn test_zero_interval_is_clamped_to_one() {
        let occurrences = expand(
            &template(),
            at(2024, 3, 1, 9, 0),
            at(2024, 3, 1, 10, 0),
            &RecurrenceRule::weekly(0, 2),
        )
        .unwrap();
        assert_eq!(occurrences[1].start, at(2024, 3, 8, 9, 0));
    }

    #[test]
    fn test_rejects_inverted_range() {
        let start = at(2024, 3, 1, 9, 0);
        let result = expand(&template(), start, start, &RecurrenceRule::weekly(1, 3));
        assert!(matches!(result, Err(SchedulerError::Validation { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_rule_fields() {
        let start = at(2024, 3, 1, 9, 0);
        let end = at(2024, 3, 1, 10, 0);
        assert!(expand(&template(), start, end, &RecurrenceRule::weekly(1, 2).on_weekday(7)).is_err());
        assert!(expand(&template(), start, end, &RecurrenceRule::monthly(1, 2).on_day_of_month(0)).is_err());
        assert!(expand(&template(), start, end, &RecurrenceRule::monthly(1, 2).on_day_of_month(32)).is_err());
    }
}
