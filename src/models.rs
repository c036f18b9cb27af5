use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    ToApply,
    Applied,
    Waiting,
    Rejected,
    Approved,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::ToApply,
        Status::Applied,
        Status::Waiting,
        Status::Rejected,
        Status::Approved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::ToApply => "to-apply",
            Status::Applied => "applied",
            Status::Waiting => "waiting",
            Status::Rejected => "rejected",
            Status::Approved => "approved",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status '{0}' (expected to-apply, applied, waiting, rejected or approved)")]
pub struct ParseStatusError(pub String);

impl FromStr for Status {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Statuses outside the five canonical ones (blank, the legacy "-9", numbers)
/// load as `None` rather than failing the whole record.
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    #[serde(default)]
    pub id: i64,
    pub company_name: String,
    pub role: String,
    #[serde(default)]
    pub ctc: String,
    #[serde(default)]
    pub requirements: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<Status>,
    #[serde(default)]
    pub last_date_to_apply: Option<String>,
    #[serde(default)]
    pub applied_date: Option<String>,
    #[serde(default)]
    pub exam_date: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub user_id: String,
}

impl ApplicationRecord {
    pub fn is_to_apply(&self) -> bool {
        self.status == Some(Status::ToApply)
    }

    /// Date shown for "applied": the applied date, else the creation day.
    pub fn display_applied_date(&self) -> String {
        non_blank(self.applied_date.as_deref())
            .or_else(|| non_blank(Some(self.created_at.as_str())))
            .map(|s| s.get(..10).unwrap_or(s).to_string())
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn compensation_label(&self) -> &'static str {
        if self.ctc.to_lowercase().contains("lpa") {
            "CTC"
        } else {
            "Stipend"
        }
    }
}

/// Field values for an insert or a full-field edit.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationDraft {
    pub company_name: String,
    pub role: String,
    pub ctc: String,
    pub requirements: Option<String>,
    pub status: Option<Status>,
    pub last_date_to_apply: Option<String>,
    pub applied_date: Option<String>,
    pub exam_date: Option<String>,
}

impl ApplicationDraft {
    pub fn new(company_name: &str, role: &str) -> Self {
        Self {
            company_name: company_name.trim().to_string(),
            role: role.trim().to_string(),
            ctc: String::new(),
            requirements: None,
            status: Some(Status::ToApply),
            last_date_to_apply: None,
            applied_date: None,
            exam_date: None,
        }
    }
}

impl From<&ApplicationRecord> for ApplicationDraft {
    fn from(record: &ApplicationRecord) -> Self {
        Self {
            company_name: record.company_name.clone(),
            role: record.role.clone(),
            ctc: record.ctc.clone(),
            requirements: record.requirements.clone(),
            status: record.status,
            last_date_to_apply: record.last_date_to_apply.clone(),
            applied_date: record.applied_date.clone(),
            exam_date: record.exam_date.clone(),
        }
    }
}

pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ApplicationRecord {
        ApplicationRecord {
            id: 1,
            company_name: "Acme".to_string(),
            role: "Intern".to_string(),
            ctc: "10 LPA".to_string(),
            requirements: None,
            status: Some(Status::ToApply),
            last_date_to_apply: None,
            applied_date: None,
            exam_date: None,
            created_at: "2025-02-01T10:00:00.000Z".to_string(),
            user_id: "u1".to_string(),
        }
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in Status::ALL {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("-9".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn test_legacy_status_deserializes_as_none() {
        let json = r#"[
            {"company_name": "A", "role": "r", "status": "-9"},
            {"company_name": "B", "role": "r", "status": -9},
            {"company_name": "C", "role": "r", "status": "waiting"},
            {"company_name": "D", "role": "r"}
        ]"#;
        let records: Vec<ApplicationRecord> = serde_json::from_str(json).unwrap();
        let statuses: Vec<_> = records.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![None, None, Some(Status::Waiting), None]);
    }

    #[test]
    fn test_applied_date_falls_back_to_created_at() {
        let mut r = record();
        assert_eq!(r.display_applied_date(), "2025-02-01");
        r.applied_date = Some("2025-02-20".to_string());
        assert_eq!(r.display_applied_date(), "2025-02-20");
        r.applied_date = None;
        r.created_at = String::new();
        assert_eq!(r.display_applied_date(), "-");
    }

    #[test]
    fn test_compensation_label() {
        let mut r = record();
        assert_eq!(r.compensation_label(), "CTC");
        r.ctc = "30000 /month".to_string();
        assert_eq!(r.compensation_label(), "Stipend");
    }
}
