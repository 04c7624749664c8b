use crate::domain::model::{
    DailyScheduleEntry, EventTemplate, Occurrence, ScheduleDefaults, ScheduleDraft,
};
use crate::utils::error::{Result, SchedulerError};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Number of calendar days an occurrence needs check-in windows for.
pub fn day_count(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let span = end - start;
    let whole = span.num_days();
    if span > Duration::days(whole) {
        whole + 1
    } else {
        whole
    }
}

/// Builds one check-in/check-out entry per calendar day of `[start, end)`.
///
/// A single-day occurrence needs a complete caller entry. Multi-day
/// occurrences fill missing or partial days from the first caller entry, and
/// from `defaults` when nothing was supplied. `time_in < time_out` is not
/// checked here, so overnight windows pass through untouched.
pub fn build(
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: &[ScheduleDraft],
    defaults: &ScheduleDefaults,
) -> Result<Vec<DailyScheduleEntry>> {
    if end <= start {
        return Err(SchedulerError::validation(format!(
            "schedule end {} must be after start {}",
            end, start
        )));
    }

    let days = day_count(start, end);
    let first_day = start.date();

    if days == 1 {
        return single_day(first_day, existing).map(|entry| vec![entry]);
    }

    let fallback_in = existing
        .first()
        .and_then(|draft| draft.time_in)
        .unwrap_or(defaults.time_in);
    let fallback_out = existing
        .first()
        .and_then(|draft| draft.time_out)
        .unwrap_or(defaults.time_out);

    let mut entries = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let date = first_day
            .checked_add_signed(Duration::days(offset))
            .ok_or_else(|| SchedulerError::validation("schedule runs past the supported calendar"))?;
        let matching = existing.iter().find(|draft| draft.date == date);

        let entry = match matching {
            Some(draft) => match (draft.time_in, draft.time_out) {
                (Some(time_in), Some(time_out)) => DailyScheduleEntry {
                    date,
                    time_in,
                    time_out,
                    notes: draft.notes.clone(),
                },
                _ => DailyScheduleEntry {
                    date,
                    time_in: fallback_in,
                    time_out: fallback_out,
                    notes: draft.notes.clone(),
                },
            },
            None => DailyScheduleEntry {
                date,
                time_in: fallback_in,
                time_out: fallback_out,
                notes: String::new(),
            },
        };
        entries.push(entry);
    }

    tracing::debug!(
        "Built {}-day schedule starting {} ({} supplied entries)",
        days,
        first_day,
        existing.len()
    );

    Ok(entries)
}

fn single_day(date: NaiveDate, existing: &[ScheduleDraft]) -> Result<DailyScheduleEntry> {
    let draft = existing
        .iter()
        .find(|draft| draft.date == date)
        .or_else(|| existing.first());

    match draft {
        Some(ScheduleDraft {
            time_in: Some(time_in),
            time_out: Some(time_out),
            notes,
            ..
        }) => Ok(DailyScheduleEntry {
            date,
            time_in: *time_in,
            time_out: *time_out,
            notes: notes.clone(),
        }),
        _ => Err(SchedulerError::IncompleteSchedule { date }),
    }
}

/// Schedule for an occurrence of `template`; empty unless the event takes
/// volunteers.
pub fn schedule_for(
    template: &EventTemplate,
    occurrence: &Occurrence,
    existing: &[ScheduleDraft],
    defaults: &ScheduleDefaults,
) -> Result<Vec<DailyScheduleEntry>> {
    if !template.is_open_for_volunteer {
        return Ok(Vec::new());
    }
    build(occurrence.start, occurrence.end, existing, defaults)
}
