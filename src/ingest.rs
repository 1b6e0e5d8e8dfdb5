//! Normalization of backend salary payloads into [`SalaryRecord`].
//!
//! Records arrive from several generations of the contribution form: older
//! ones carry `experience` (years), newer ones `experienceLevel`, some both,
//! and stories add narrative fields. Each payload is first classified into a
//! [`Submission`] and then flattened into the one canonical record shape the
//! filter engine understands.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{EmploymentType, ExperienceLevel, SalaryRecord, Story, Years};

const STORY_TYPE: &str = "story";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("salary record has no id")]
    MissingId,
}

/// A salary record exactly as the backend sends it. Everything is optional
/// and loosely typed; numbers may arrive as JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSalary {
    #[serde(rename = "_id")]
    pub mongo_id: Option<String>,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub company_name: Option<String>,
    pub designation: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub industry: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<Value>,
    pub experience_level: Option<String>,
    pub employment_type: Option<String>,
    pub total_monthly: Option<Value>,
    pub which_years_salary: Option<Value>,
    pub minimum_increment: Option<Value>,
    pub created_at: Option<String>,
    pub is_anonymous: Option<bool>,
    #[serde(alias = "userName")]
    pub submitted_by: Option<String>,
    pub story_title: Option<String>,
    pub story_description: Option<String>,
    pub pros: Option<Vec<String>>,
    pub cons: Option<Vec<String>>,
}

/// How a submission described the submitter's experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceInput {
    Unspecified,
    Years(Years),
    Level(ExperienceLevel),
    Both { years: Years, level: ExperienceLevel },
}

impl ExperienceInput {
    fn from_parts(years: Option<Years>, level: Option<ExperienceLevel>) -> Self {
        match (years, level) {
            (Some(years), Some(level)) => Self::Both { years, level },
            (Some(years), None) => Self::Years(years),
            (None, Some(level)) => Self::Level(level),
            (None, None) => Self::Unspecified,
        }
    }

    fn years(self) -> Option<Years> {
        match self {
            Self::Years(years) | Self::Both { years, .. } => Some(years),
            Self::Level(_) | Self::Unspecified => None,
        }
    }

    fn level(self) -> Option<ExperienceLevel> {
        match self {
            Self::Level(level) | Self::Both { level, .. } => Some(level),
            Self::Years(_) | Self::Unspecified => None,
        }
    }
}

/// Fields shared by every submission version, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportFields {
    pub id: String,
    pub company_name: Option<String>,
    pub designation: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub industry: Option<String>,
    pub qualification: Option<String>,
    pub experience: ExperienceInput,
    pub employment_type: Option<EmploymentType>,
    pub total_monthly: Option<u64>,
    pub salary_year: Option<i32>,
    pub minimum_increment: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_anonymous: bool,
    pub submitted_by: Option<String>,
}

/// A classified backend payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// A plain numeric salary report.
    Report(ReportFields),
    /// A report with a narrative attached (`type: "story"`).
    Story { report: ReportFields, story: Story },
}

impl RawSalary {
    /// Classifies the payload. Fields with invalid values are dropped with a
    /// warning; only a missing id rejects the whole record.
    pub fn into_submission(self) -> Result<Submission, IngestError> {
        let id = non_empty(self.mongo_id)
            .or_else(|| non_empty(self.id))
            .ok_or(IngestError::MissingId)?;

        let years = self.experience.as_ref().and_then(|value| {
            let parsed = value_as_number(value)
                .filter(|n| n.fract() == 0.0 && (0.0..=255.0).contains(n))
                .and_then(|n| Years::new(n as u8));
            if parsed.is_none() {
                warn!(record = %id, %value, "dropping out-of-range experience");
            }
            parsed
        });
        let level = non_empty(self.experience_level).and_then(|text| {
            text.parse::<ExperienceLevel>()
                .inspect_err(|e| warn!(record = %id, "dropping experience level: {e}"))
                .ok()
        });
        let employment_type = non_empty(self.employment_type).and_then(|text| {
            text.parse::<EmploymentType>()
                .inspect_err(|e| warn!(record = %id, "dropping employment type: {e}"))
                .ok()
        });
        let total_monthly = self
            .total_monthly
            .as_ref()
            .and_then(|value| non_negative_amount(&id, "totalMonthly", value));
        let minimum_increment = self
            .minimum_increment
            .as_ref()
            .and_then(|value| non_negative_amount(&id, "minimumIncrement", value));
        let salary_year = self
            .which_years_salary
            .as_ref()
            .and_then(value_as_number)
            .filter(|year| year.fract() == 0.0 && (1900.0..=9999.0).contains(year))
            .map(|year| year as i32);
        let created_at = non_empty(self.created_at).and_then(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|ts| ts.with_timezone(&Utc))
                .inspect_err(|e| warn!(record = %id, "dropping createdAt '{text}': {e}"))
                .ok()
        });

        let report = ReportFields {
            company_name: non_empty(self.company_name),
            designation: non_empty(self.designation),
            location: non_empty(self.location),
            department: non_empty(self.department),
            industry: non_empty(self.industry),
            qualification: non_empty(self.qualification),
            experience: ExperienceInput::from_parts(years, level),
            employment_type,
            total_monthly,
            salary_year,
            minimum_increment,
            created_at,
            is_anonymous: self.is_anonymous.unwrap_or(false),
            submitted_by: non_empty(self.submitted_by),
            id,
        };

        if self.kind.as_deref() == Some(STORY_TYPE) {
            let story = Story {
                title: non_empty(self.story_title),
                description: non_empty(self.story_description),
                pros: self.pros.unwrap_or_default(),
                cons: self.cons.unwrap_or_default(),
            };
            Ok(Submission::Story { report, story })
        } else {
            Ok(Submission::Report(report))
        }
    }
}

impl Submission {
    /// Flattens the submission into the canonical record.
    pub fn normalize(self) -> SalaryRecord {
        let (report, story) = match self {
            Self::Report(report) => (report, None),
            Self::Story { report, story } => (report, Some(story)),
        };
        SalaryRecord {
            id: report.id,
            company_name: report.company_name,
            designation: report.designation,
            location: report.location,
            department: report.department,
            industry: report.industry,
            qualification: report.qualification,
            experience: report.experience.years(),
            experience_level: report.experience.level(),
            employment_type: report.employment_type,
            total_monthly: report.total_monthly,
            salary_year: report.salary_year,
            minimum_increment: report.minimum_increment,
            created_at: report.created_at,
            is_anonymous: report.is_anonymous,
            // anonymous submitters are never carried past ingestion
            submitted_by: report.submitted_by.filter(|_| !report.is_anonymous),
            story,
        }
    }
}

/// Decodes the elements of a fetched `data` array one by one. An element
/// that does not fit [`RawSalary`] is skipped with a warning instead of
/// failing the batch.
pub fn decode_batch(values: Vec<Value>) -> Vec<RawSalary> {
    let total = values.len();
    let raws: Vec<RawSalary> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            serde_json::from_value(value)
                .inspect_err(|e| warn!(index, "skipping malformed salary record: {e}"))
                .ok()
        })
        .collect();
    if raws.len() < total {
        debug!(total, decoded = raws.len(), "decoded salary batch");
    }
    raws
}

/// Normalizes a fetched batch. Records without an id and repeated ids are
/// dropped; the first occurrence of an id wins.
pub fn normalize_batch(raws: Vec<RawSalary>) -> Vec<SalaryRecord> {
    let total = raws.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let mut records = Vec::with_capacity(total);

    for raw in raws {
        let submission = match raw.into_submission() {
            Ok(submission) => submission,
            Err(e) => {
                warn!("skipping salary record: {e}");
                continue;
            }
        };
        let record = submission.normalize();
        if !seen.insert(record.id.clone()) {
            warn!(record = %record.id, "skipping duplicate salary record");
            continue;
        }
        records.push(record);
    }

    debug!(total, kept = records.len(), "normalized salary batch");
    records
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn value_as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn non_negative_amount(id: &str, field: &str, value: &Value) -> Option<u64> {
    match value_as_number(value) {
        Some(amount) if amount >= 0.0 => Some(amount.round() as u64),
        _ => {
            if !value.is_null() {
                warn!(record = %id, %value, "dropping invalid {field}");
            }
            None
        }
    }
}
