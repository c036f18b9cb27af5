//! Month calendar over application records: which records fall on which
//! day, badge counts, and the detail shown when a day is hovered or clicked.

use anyhow::Result;
use chrono::{Datelike, NaiveDate};

use crate::dates::{days_left, first_of_month, parse_day, shift_month};
use crate::models::{ApplicationRecord, Status};

/// Every day of the month containing `month`, ascending.
pub fn days_in_visible_month(month: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(month);
    first
        .iter_days()
        .take_while(|d| d.month() == first.month())
        .collect()
}

/// Empty cells before the 1st so it lines up with its weekday (Sunday = 0).
pub fn leading_blanks(month: NaiveDate) -> u32 {
    first_of_month(month).weekday().num_days_from_sunday()
}

fn falls_on(raw: Option<&str>, day: NaiveDate) -> bool {
    raw.and_then(parse_day) == Some(day)
}

pub fn apply_deadline_jobs_for_day(
    records: &[ApplicationRecord],
    day: NaiveDate,
) -> Vec<&ApplicationRecord> {
    records
        .iter()
        .filter(|r| r.is_to_apply() && falls_on(r.last_date_to_apply.as_deref(), day))
        .collect()
}

pub fn exam_jobs_for_day(records: &[ApplicationRecord], day: NaiveDate) -> Vec<&ApplicationRecord> {
    records
        .iter()
        .filter(|r| !r.is_to_apply() && falls_on(r.exam_date.as_deref(), day))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Deadline,
    Exam,
    Plain,
}

#[derive(Debug, Clone)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub deadlines: Vec<&'a ApplicationRecord>,
    pub exams: Vec<&'a ApplicationRecord>,
    pub is_today: bool,
}

impl DayCell<'_> {
    pub fn deadline_badge(&self) -> Option<usize> {
        Some(self.deadlines.len()).filter(|n| *n > 0)
    }

    pub fn exam_badge(&self) -> Option<usize> {
        Some(self.exams.len()).filter(|n| *n > 0)
    }

    /// A day with both kinds of entry is drawn as a deadline day.
    pub fn highlight(&self) -> Highlight {
        if !self.deadlines.is_empty() {
            Highlight::Deadline
        } else if !self.exams.is_empty() {
            Highlight::Exam
        } else {
            Highlight::Plain
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonthGrid<'a> {
    pub month: NaiveDate,
    pub leading_blanks: u32,
    pub cells: Vec<DayCell<'a>>,
}

impl MonthGrid<'_> {
    /// Week row and weekday column of a date in this grid.
    pub fn position(&self, day: NaiveDate) -> Option<(usize, usize)> {
        if first_of_month(day) != self.month {
            return None;
        }
        let slot = self.leading_blanks as usize + day.day0() as usize;
        Some((slot / 7, slot % 7))
    }
}

pub fn build_grid(records: &[ApplicationRecord], month: NaiveDate, today: NaiveDate) -> MonthGrid<'_> {
    let month = first_of_month(month);
    let cells = days_in_visible_month(month)
        .into_iter()
        .map(|date| DayCell {
            date,
            deadlines: apply_deadline_jobs_for_day(records, date),
            exams: exam_jobs_for_day(records, date),
            is_today: date == today,
        })
        .collect();
    MonthGrid {
        month,
        leading_blanks: leading_blanks(month),
        cells,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMarker {
    DaysLeft(i64),
    Exam,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailEntry {
    pub record_id: i64,
    pub company_name: String,
    pub marker: DetailMarker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDetail {
    pub day: NaiveDate,
    pub entries: Vec<DetailEntry>,
}

/// Deadline entries first, then exams; `None` when the day is empty.
pub fn day_detail(records: &[ApplicationRecord], day: NaiveDate, today: NaiveDate) -> Option<DayDetail> {
    let deadlines = apply_deadline_jobs_for_day(records, day).into_iter().map(|r| DetailEntry {
        record_id: r.id,
        company_name: r.company_name.clone(),
        marker: DetailMarker::DaysLeft(days_left(day, today)),
    });
    let exams = exam_jobs_for_day(records, day).into_iter().map(|r| DetailEntry {
        record_id: r.id,
        company_name: r.company_name.clone(),
        marker: DetailMarker::Exam,
    });
    let entries: Vec<_> = deadlines.chain(exams).collect();
    if entries.is_empty() {
        None
    } else {
        Some(DayDetail { day, entries })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarEvent {
    NextMonth,
    PrevMonth,
    JumpToday,
    HoverDay(NaiveDate),
    ClickDay(NaiveDate),
    Dismiss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarView {
    visible_month: NaiveDate,
    selected: Option<DayDetail>,
}

impl CalendarView {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            visible_month: first_of_month(today),
            selected: None,
        }
    }

    pub fn visible_month(&self) -> NaiveDate {
        self.visible_month
    }

    pub fn selected(&self) -> Option<&DayDetail> {
        self.selected.as_ref()
    }

    pub fn show_month(&mut self, month: NaiveDate) {
        self.visible_month = first_of_month(month);
    }

    pub fn apply(&mut self, event: CalendarEvent, records: &[ApplicationRecord], today: NaiveDate) {
        match event {
            CalendarEvent::NextMonth => self.visible_month = shift_month(self.visible_month, 1),
            CalendarEvent::PrevMonth => self.visible_month = shift_month(self.visible_month, -1),
            CalendarEvent::JumpToday => self.visible_month = first_of_month(today),
            CalendarEvent::HoverDay(day) | CalendarEvent::ClickDay(day) => {
                self.selected = day_detail(records, day, today);
            }
            CalendarEvent::Dismiss => self.selected = None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Below,
    Above,
}

/// Opens the popover under its cell when it fits inside the container,
/// otherwise above it.
pub fn popover_placement(cell_bottom: u16, container_bottom: u16, height: u16, buffer: u16) -> Placement {
    let space_below = container_bottom.saturating_sub(cell_bottom);
    if space_below >= height.saturating_add(buffer) {
        Placement::Below
    } else {
        Placement::Above
    }
}

/// Receiver for a user re-categorising a record. The calendar never writes
/// to storage itself.
pub trait StatusSink {
    fn on_status_change(&mut self, record_id: i64, status: Status) -> Result<()>;
}

impl<F> StatusSink for F
where
    F: FnMut(i64, Status) -> Result<()>,
{
    fn on_status_change(&mut self, record_id: i64, status: Status) -> Result<()> {
        self(record_id, status)
    }
}

/// Marks a record applied in the local list, then reports the change.
/// Returns false when the id is not in the list.
pub fn mark_applied(
    records: &mut [ApplicationRecord],
    record_id: i64,
    sink: &mut impl StatusSink,
) -> Result<bool> {
    let Some(record) = records.iter_mut().find(|r| r.id == record_id) else {
        return Ok(false);
    };
    record.status = Some(Status::Applied);
    sink.on_status_change(record_id, Status::Applied)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{latest_activity, upcoming_deadlines};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(id: i64, company: &str, status: Option<Status>) -> ApplicationRecord {
        ApplicationRecord {
            id,
            company_name: company.to_string(),
            role: "Intern".to_string(),
            ctc: String::new(),
            requirements: None,
            status,
            last_date_to_apply: None,
            applied_date: None,
            exam_date: None,
            created_at: String::new(),
            user_id: "u1".to_string(),
        }
    }

    fn acme_and_globex() -> Vec<ApplicationRecord> {
        let mut acme = rec(1, "Acme", Some(Status::ToApply));
        acme.last_date_to_apply = Some("2025-03-05".to_string());
        let mut globex = rec(2, "Globex", Some(Status::Applied));
        globex.applied_date = Some("2025-02-20".to_string());
        globex.exam_date = Some("2025-03-05".to_string());
        vec![acme, globex]
    }

    #[test]
    fn test_days_in_month_handles_leap_years() {
        assert_eq!(days_in_visible_month(ymd(2024, 2, 10)).len(), 29);
        assert_eq!(days_in_visible_month(ymd(2025, 2, 10)).len(), 28);
        let march = days_in_visible_month(ymd(2025, 3, 31));
        assert_eq!(march.first(), Some(&ymd(2025, 3, 1)));
        assert_eq!(march.last(), Some(&ymd(2025, 3, 31)));
        assert!(march.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_leading_blanks_follow_weekday_of_first() {
        // 2025-03-01 is a Saturday, 2024-09-01 a Sunday.
        assert_eq!(leading_blanks(ymd(2025, 3, 20)), 6);
        assert_eq!(leading_blanks(ymd(2024, 9, 1)), 0);
    }

    #[test]
    fn test_acme_and_globex_on_march_fifth() {
        let records = acme_and_globex();
        let grid = build_grid(&records, ymd(2025, 3, 1), ymd(2025, 3, 1));
        let fifth = &grid.cells[4];
        assert_eq!(fifth.date, ymd(2025, 3, 5));
        assert_eq!(fifth.deadline_badge(), Some(1));
        assert_eq!(fifth.exam_badge(), Some(1));
        assert_eq!(fifth.deadlines[0].company_name, "Acme");
        assert_eq!(fifth.exams[0].company_name, "Globex");
        assert_eq!(fifth.highlight(), Highlight::Deadline);

        let sixth = &grid.cells[5];
        assert_eq!(sixth.deadline_badge(), None);
        assert_eq!(sixth.highlight(), Highlight::Plain);

        let deadlines: Vec<_> = upcoming_deadlines(&records, 3).iter().map(|r| r.id).collect();
        assert_eq!(deadlines, vec![1]);
        let latest: Vec<_> = latest_activity(&records, 3).iter().map(|r| r.id).collect();
        assert_eq!(latest, vec![2]);
    }

    #[test]
    fn test_exam_only_day_highlights_exam() {
        let mut r = rec(1, "Initech", Some(Status::Waiting));
        r.exam_date = Some("2025-03-10T09:30:00".to_string());
        let records = vec![r];
        let grid = build_grid(&records, ymd(2025, 3, 1), ymd(2025, 3, 1));
        assert_eq!(grid.cells[9].highlight(), Highlight::Exam);
    }

    #[test]
    fn test_buckets_partition_by_status() {
        let day = ymd(2025, 4, 1);
        let records: Vec<_> = [Some(Status::ToApply), Some(Status::Applied), None, Some(Status::Approved)]
            .into_iter()
            .enumerate()
            .map(|(i, status)| {
                let mut r = rec(i as i64, "x", status);
                r.last_date_to_apply = Some("2025-04-01".to_string());
                r.exam_date = Some("2025-04-01".to_string());
                r
            })
            .collect();
        let deadlines = apply_deadline_jobs_for_day(&records, day);
        let exams = exam_jobs_for_day(&records, day);
        assert_eq!(deadlines.len() + exams.len(), records.len());
        assert!(deadlines.iter().all(|d| exams.iter().all(|e| e.id != d.id)));
    }

    #[test]
    fn test_malformed_dates_are_excluded() {
        let mut r = rec(1, "x", Some(Status::ToApply));
        r.last_date_to_apply = Some("next friday".to_string());
        let records = vec![r];
        let grid = build_grid(&records, ymd(2025, 3, 1), ymd(2025, 3, 1));
        assert!(grid.cells.iter().all(|c| c.highlight() == Highlight::Plain));
    }

    #[test]
    fn test_day_detail_counts_down_and_floors_at_zero() {
        let records = acme_and_globex();
        let detail = day_detail(&records, ymd(2025, 3, 5), ymd(2025, 3, 1)).unwrap();
        assert_eq!(detail.entries.len(), 2);
        assert_eq!(detail.entries[0].company_name, "Acme");
        assert_eq!(detail.entries[0].marker, DetailMarker::DaysLeft(4));
        assert_eq!(detail.entries[1].marker, DetailMarker::Exam);

        let overdue = day_detail(&records, ymd(2025, 3, 5), ymd(2025, 3, 6)).unwrap();
        assert_eq!(overdue.entries[0].marker, DetailMarker::DaysLeft(0));

        assert!(day_detail(&records, ymd(2025, 3, 6), ymd(2025, 3, 1)).is_none());
    }

    #[test]
    fn test_view_transitions() {
        let records = acme_and_globex();
        let today = ymd(2025, 3, 18);
        let mut view = CalendarView::new(today);
        assert_eq!(view.visible_month(), ymd(2025, 3, 1));
        assert!(view.selected().is_none());

        view.apply(CalendarEvent::PrevMonth, &records, today);
        view.apply(CalendarEvent::PrevMonth, &records, today);
        view.apply(CalendarEvent::PrevMonth, &records, today);
        assert_eq!(view.visible_month(), ymd(2024, 12, 1));
        view.apply(CalendarEvent::NextMonth, &records, today);
        assert_eq!(view.visible_month(), ymd(2025, 1, 1));
        view.apply(CalendarEvent::JumpToday, &records, today);
        assert_eq!(view.visible_month(), ymd(2025, 3, 1));

        view.apply(CalendarEvent::HoverDay(ymd(2025, 3, 5)), &records, today);
        assert_eq!(view.selected().map(|d| d.entries.len()), Some(2));
        view.apply(CalendarEvent::ClickDay(ymd(2025, 3, 6)), &records, today);
        assert!(view.selected().is_none());
        view.apply(CalendarEvent::ClickDay(ymd(2025, 3, 5)), &records, today);
        view.apply(CalendarEvent::Dismiss, &records, today);
        assert!(view.selected().is_none());
    }

    #[test]
    fn test_grid_positions() {
        let grid = build_grid(&[], ymd(2025, 3, 1), ymd(2025, 3, 1));
        assert_eq!(grid.leading_blanks, 6);
        assert_eq!(grid.position(ymd(2025, 3, 1)), Some((0, 6)));
        assert_eq!(grid.position(ymd(2025, 3, 2)), Some((1, 0)));
        assert_eq!(grid.position(ymd(2025, 4, 1)), None);
    }

    #[test]
    fn test_popover_flips_when_space_runs_out() {
        assert_eq!(popover_placement(10, 30, 8, 1), Placement::Below);
        assert_eq!(popover_placement(25, 30, 8, 1), Placement::Above);
        assert_eq!(popover_placement(40, 30, 8, 1), Placement::Above);
    }

    #[test]
    fn test_mark_applied_updates_list_then_notifies() {
        let mut records = acme_and_globex();
        let mut calls = Vec::new();
        let mut sink = |id: i64, status: Status| -> Result<()> {
            calls.push((id, status));
            Ok(())
        };
        assert!(mark_applied(&mut records, 1, &mut sink).unwrap());
        assert!(!mark_applied(&mut records, 99, &mut sink).unwrap());
        assert_eq!(records[0].status, Some(Status::Applied));
        assert_eq!(calls, vec![(1, Status::Applied)]);
    }
}
