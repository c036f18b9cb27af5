//! Summary values derived from a user's full record list.
//!
//! Everything here is recomputed from scratch whenever the list changes and
//! never fails: blank or malformed fields only drop records from a result.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::dates::parse_timestamp;
use crate::models::{ApplicationRecord, Status, non_blank};

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d[\d,]*(?:\.\d+)?)\s*[-–]\s*\d[\d,]*(?:\.\d+)?").expect("valid range pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: Status,
    pub count: usize,
}

/// Counts per status, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusHistogram {
    entries: Vec<StatusCount>,
}

impl StatusHistogram {
    pub fn entries(&self) -> &[StatusCount] {
        &self.entries
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).max().unwrap_or(0).max(1)
    }

    /// Bar length relative to the largest bucket.
    pub fn bar_percent(&self, count: usize) -> f64 {
        count as f64 / self.max_count() as f64 * 100.0
    }
}

pub fn status_histogram(records: &[ApplicationRecord]) -> StatusHistogram {
    let mut histogram = StatusHistogram::default();
    for status in records.iter().filter_map(|r| r.status) {
        match histogram.entries.iter_mut().find(|e| e.status == status) {
            Some(entry) => entry.count += 1,
            None => histogram.entries.push(StatusCount { status, count: 1 }),
        }
    }
    histogram
}

/// Sortable value of a free-form compensation string such as "10 LPA",
/// "2-3 LPA" or "30000/month". Ranges sort by their lower bound, digit
/// grouping commas included ("10,000-20,000"); anything without digits is 0.
pub fn parse_compensation(text: &str) -> f64 {
    if let Some(low) = RANGE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok())
    {
        return low;
    }

    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    leading_number(&kept)
}

// Longest prefix that reads as a decimal number, so "1.2.3" reads as 1.2.
fn leading_number(s: &str) -> f64 {
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' => end = i + 1,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

pub fn top_by_compensation(records: &[ApplicationRecord], n: usize) -> Vec<&ApplicationRecord> {
    let mut ranked: Vec<(&ApplicationRecord, f64)> = records
        .iter()
        .filter(|r| !r.ctc.trim().is_empty())
        .map(|r| (r, parse_compensation(&r.ctc)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(n).map(|(r, _)| r).collect()
}

pub fn latest_activity(records: &[ApplicationRecord], n: usize) -> Vec<&ApplicationRecord> {
    let mut dated: Vec<_> = records
        .iter()
        .filter_map(|r| {
            let at = parse_timestamp(non_blank(r.applied_date.as_deref())?)?;
            Some((r, at))
        })
        .collect();
    dated.sort_by(|a, b| b.1.cmp(&a.1));
    dated.into_iter().take(n).map(|(r, _)| r).collect()
}

/// `to-apply` records ordered by how soon their application window closes.
pub fn upcoming_deadlines(records: &[ApplicationRecord], n: usize) -> Vec<&ApplicationRecord> {
    let mut dated: Vec<_> = records
        .iter()
        .filter(|r| r.is_to_apply())
        .filter_map(|r| {
            let at = parse_timestamp(non_blank(r.last_date_to_apply.as_deref())?)?;
            Some((r, at))
        })
        .collect();
    dated.sort_by(|a, b| a.1.cmp(&b.1));
    dated.into_iter().take(n).map(|(r, _)| r).collect()
}

pub fn search<'a>(records: &'a [ApplicationRecord], term: &str) -> Vec<&'a ApplicationRecord> {
    let needle = term.trim().to_lowercase();
    records
        .iter()
        .filter(|r| {
            format!("{} {}", r.company_name, r.role)
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}
