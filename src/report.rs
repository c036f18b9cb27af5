use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt::Write;

use crate::calendar::{DayDetail, DetailMarker, MonthGrid};
use crate::dates::{days_left, parse_day};
use crate::models::{ApplicationRecord, non_blank};
use crate::notes::note_blocks;
use crate::projection::{
    StatusHistogram, latest_activity, status_histogram, top_by_compensation, upcoming_deadlines,
};

const BAR_WIDTH: f64 = 24.0;
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good morning",
        12..=16 => "Good afternoon",
        17..=20 => "Good evening",
        _ => "Good night",
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn or_dash(value: Option<&str>) -> &str {
    non_blank(value).unwrap_or("-")
}

fn relative_days(day: NaiveDate, today: NaiveDate) -> String {
    match (today - day).num_days() {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        n if n > 1 => format!("{} days ago", n),
        -1 => "tomorrow".to_string(),
        n => format!("in {} days", -n),
    }
}

pub fn record_table(records: &[&ApplicationRecord]) -> String {
    if records.is_empty() {
        return "No applications found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<10} {:<22} {:<22} {:<14} {:<11}",
        "ID", "STATUS", "COMPANY", "ROLE", "CTC", "DEADLINE"
    );
    let _ = writeln!(out, "{}", "-".repeat(90));
    for r in records {
        let _ = writeln!(
            out,
            "{:<6} {:<10} {:<22} {:<22} {:<14} {:<11}",
            r.id,
            r.status.map_or("-", |s| s.as_str()),
            truncate(&r.company_name, 20),
            truncate(&r.role, 20),
            truncate(&r.ctc, 12),
            or_dash(r.last_date_to_apply.as_deref()),
        );
    }
    out
}

pub fn record_detail(record: &ApplicationRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Application #{}", record.id);
    let _ = writeln!(out, "Company: {}", record.company_name);
    let _ = writeln!(out, "Role: {}", record.role);
    let _ = writeln!(out, "{}: {}", record.compensation_label(), or_dash(Some(record.ctc.as_str())));
    let _ = writeln!(out, "Status: {}", record.status.map_or("-", |s| s.as_str()));
    if record.is_to_apply() {
        let _ = writeln!(out, "Last date to apply: {}", or_dash(record.last_date_to_apply.as_deref()));
    } else {
        let _ = writeln!(out, "Applied: {}", record.display_applied_date());
        let _ = writeln!(out, "Exam/interview: {}", or_dash(record.exam_date.as_deref()));
    }
    let _ = writeln!(out, "Created: {}", record.created_at);

    if let Some(requirements) = non_blank(record.requirements.as_deref()) {
        let _ = writeln!(out, "\n--- Notes ---");
        for (i, block) in note_blocks(requirements).iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for item in block {
                for (j, line) in textwrap::wrap(item, 70).iter().enumerate() {
                    let bullet = if j == 0 { "  • " } else { "    " };
                    let _ = writeln!(out, "{}{}", bullet, line);
                }
            }
        }
    }
    out
}

/// Everything the overview command shows, in serializable form.
#[derive(Debug, Serialize)]
pub struct Overview<'a> {
    pub total: usize,
    pub status_counts: StatusHistogram,
    pub upcoming_deadlines: Vec<&'a ApplicationRecord>,
    pub top_compensation: Vec<&'a ApplicationRecord>,
    pub latest_activity: Vec<&'a ApplicationRecord>,
}

impl<'a> Overview<'a> {
    pub fn build(records: &'a [ApplicationRecord], limit: usize) -> Self {
        Self {
            total: records.len(),
            status_counts: status_histogram(records),
            upcoming_deadlines: upcoming_deadlines(records, limit),
            top_compensation: top_by_compensation(records, limit),
            latest_activity: latest_activity(records, limit),
        }
    }

    pub fn render(&self, name: &str, hour: u32, today: NaiveDate) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Hello {}! {}.\n", name, greeting(hour));
        if self.total == 0 {
            let _ = writeln!(out, "No job applications yet. Start applying!");
            return out;
        }

        let _ = writeln!(out, "Application status (total {})", self.total);
        for entry in self.status_counts.entries() {
            let width = (self.status_counts.bar_percent(entry.count) / 100.0 * BAR_WIDTH).round();
            let _ = writeln!(
                out,
                "  {:<10} {:<24} {}",
                entry.status.as_str(),
                "#".repeat(width as usize),
                entry.count
            );
        }

        let _ = writeln!(out, "\nUpcoming deadlines");
        if self.upcoming_deadlines.is_empty() {
            let _ = writeln!(out, "  No upcoming deadlines.");
        }
        for r in &self.upcoming_deadlines {
            let due = r.last_date_to_apply.as_deref().and_then(parse_day);
            let _ = writeln!(
                out,
                "  {}  {} at {}{}",
                due.map_or_else(|| "-".to_string(), |d| d.format("%b %-d").to_string()),
                r.role,
                r.company_name,
                due.map_or_else(String::new, |d| format!(" ({}d left)", days_left(d, today))),
            );
        }

        let _ = writeln!(out, "\nTop {} highest packages", self.top_compensation.len());
        for (i, r) in self.top_compensation.iter().enumerate() {
            let _ = writeln!(
                out,
                "  #{} {} at {}  {}: {}",
                i + 1,
                r.role,
                r.company_name,
                r.compensation_label(),
                r.ctc
            );
        }

        let _ = writeln!(out, "\nLatest activity");
        if self.latest_activity.is_empty() {
            let _ = writeln!(out, "  No recent activity.");
        }
        for r in &self.latest_activity {
            let when = r
                .applied_date
                .as_deref()
                .and_then(parse_day)
                .map_or_else(String::new, |d| relative_days(d, today));
            let _ = writeln!(out, "  Applied to {} at {}  ({})", r.role, r.company_name, when);
        }
        out
    }
}

/// Full "all upcoming deadlines" listing with countdowns.
pub fn deadline_list(records: &[ApplicationRecord], today: NaiveDate) -> String {
    let deadlines = upcoming_deadlines(records, usize::MAX);
    if deadlines.is_empty() {
        return "No upcoming deadlines.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<6} {:<11} {:<10} {:<22} {:<22} {}",
        "ID", "DEADLINE", "LEFT", "COMPANY", "ROLE", "CTC"
    );
    let _ = writeln!(out, "{}", "-".repeat(88));
    for r in deadlines {
        let due = r.last_date_to_apply.as_deref().and_then(parse_day);
        let _ = writeln!(
            out,
            "{:<6} {:<11} {:<10} {:<22} {:<22} {}",
            r.id,
            due.map_or_else(|| "-".to_string(), |d| d.to_string()),
            due.map_or_else(|| "-".to_string(), |d| format!("{}d left", days_left(d, today))),
            truncate(&r.company_name, 20),
            truncate(&r.role, 20),
            r.ctc,
        );
    }
    out
}

/// Plain-text month grid. `!n` counts application deadlines, `?n` counts
/// exams/interviews, `>` marks today.
pub fn calendar(grid: &MonthGrid) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", grid.month.format("%B %Y"));
    let header: Vec<String> = WEEKDAYS.iter().map(|d| format!(" {:<8}", d)).collect();
    let _ = writeln!(out, "{}", header.concat().trim_end());

    let mut row = " ".repeat(9 * grid.leading_blanks as usize);
    let mut column = grid.leading_blanks as usize;
    for cell in &grid.cells {
        let marker = if cell.is_today { '>' } else { ' ' };
        let mut badges = String::new();
        if let Some(n) = cell.deadline_badge() {
            let _ = write!(badges, "!{}", n);
        }
        if let Some(n) = cell.exam_badge() {
            let _ = write!(badges, "?{}", n);
        }
        let _ = write!(row, "{}{:>2} {:<5}", marker, cell.date.day(), badges);
        column += 1;
        if column == 7 {
            let _ = writeln!(out, "{}", row.trim_end());
            row.clear();
            column = 0;
        }
    }
    if column > 0 {
        let _ = writeln!(out, "{}", row.trim_end());
    }
    let _ = writeln!(out, "\n!n application deadline   ?n exam/interview   > today");
    out
}

pub fn day_detail(detail: &DayDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", detail.day.format("%A, %B %-d %Y"));
    for entry in &detail.entries {
        match entry.marker {
            DetailMarker::DaysLeft(days) => {
                let _ = writeln!(out, "  #{} {} ({}d left)", entry.record_id, entry.company_name, days);
            }
            DetailMarker::Exam => {
                let _ = writeln!(out, "  #{} {} [exam/interview]", entry.record_id, entry.company_name);
            }
        }
    }
    out
}
