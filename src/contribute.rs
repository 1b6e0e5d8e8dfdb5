//! Salary story contribution: form input validation and the outbound payload.
//!
//! Validation runs entirely before any network call and reports every failing
//! field at once.

use chrono::Datelike;
use serde::Serialize;
use thiserror::Error;

use crate::models::{EmploymentType, ExperienceLevel, Gender, Years};

/// First year the salary-year selector offers.
pub const FIRST_SALARY_YEAR: i32 = 2020;

/// Raw form values, as typed.
#[derive(Debug, Clone)]
pub struct ContributionForm {
    pub company_name: String,
    pub designation: String,
    pub location: String,
    pub experience_level: String,
    pub experience: String,
    pub total_monthly: String,
    pub which_years_salary: String,
    pub minimum_increment: Option<String>,
    pub gender: String,
    pub employment_type: String,
    pub department: Option<String>,
    pub story_title: Option<String>,
    pub story_description: Option<String>,
    pub is_anonymous: bool,
}

impl Default for ContributionForm {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            designation: String::new(),
            location: String::new(),
            experience_level: String::new(),
            experience: String::new(),
            total_monthly: String::new(),
            which_years_salary: String::new(),
            minimum_increment: None,
            gender: String::new(),
            employment_type: String::new(),
            department: None,
            story_title: None,
            story_description: None,
            is_anonymous: true,
        }
    }
}

/// Body of `POST /admin/create-salary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSalaryStory {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub company_name: String,
    pub designation: String,
    pub location: String,
    pub experience_level: ExperienceLevel,
    pub experience: Years,
    pub total_monthly: u64,
    pub which_years_salary: i32,
    pub minimum_increment: u64,
    pub gender: Gender,
    pub employment_type: EmploymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_description: Option<String>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("submission has {} invalid field(s): {}", .0.len(), summarize(.0))]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == name)
            .map(|e| e.message.as_str())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn required(&mut self, field: &'static str, value: &str, message: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.push(field, message);
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn parsed<T, E: std::fmt::Display>(
        &mut self,
        field: &'static str,
        result: Result<T, E>,
    ) -> Option<T> {
        result.map_err(|e| self.push(field, e.to_string())).ok()
    }
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn amount(text: &str) -> Option<u64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64)
}

impl ContributionForm {
    pub fn validate(&self) -> Result<NewSalaryStory, ValidationErrors> {
        self.validate_for_year(chrono::Local::now().year())
    }

    /// Validates against an explicit current year, which bounds the salary
    /// year selector.
    pub fn validate_for_year(&self, current_year: i32) -> Result<NewSalaryStory, ValidationErrors> {
        let mut errors = Collector::default();

        let company_name =
            errors.required("companyName", &self.company_name, "Company name required");
        let designation = errors.required("designation", &self.designation, "Designation required");
        let location = errors.required("location", &self.location, "Location required");

        let experience_level = errors.parsed(
            "experienceLevel",
            self.experience_level.parse::<ExperienceLevel>(),
        );
        let experience = errors
            .required("experience", &self.experience, "Experience required")
            .and_then(|text| errors.parsed("experience", text.parse::<Years>()));

        let total_monthly = amount(&self.total_monthly);
        if total_monthly.is_none() {
            errors.push("totalMonthly", "Invalid salary");
        }

        let which_years_salary = self
            .which_years_salary
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|year| (FIRST_SALARY_YEAR..=current_year).contains(year));
        if which_years_salary.is_none() {
            errors.push(
                "whichYearsSalary",
                format!("Salary year must be between {FIRST_SALARY_YEAR} and {current_year}"),
            );
        }

        let minimum_increment = match optional(&self.minimum_increment) {
            None => Some(0),
            Some(text) => {
                let parsed = amount(&text);
                if parsed.is_none() {
                    errors.push("minimumIncrement", "Invalid increment");
                }
                parsed
            }
        };

        let gender = errors.parsed("gender", self.gender.parse::<Gender>());
        let employment_type = errors.parsed(
            "employmentType",
            self.employment_type.parse::<EmploymentType>(),
        );

        match (
            company_name,
            designation,
            location,
            experience_level,
            experience,
            total_monthly,
            which_years_salary,
            minimum_increment,
            gender,
            employment_type,
        ) {
            (
                Some(company_name),
                Some(designation),
                Some(location),
                Some(experience_level),
                Some(experience),
                Some(total_monthly),
                Some(which_years_salary),
                Some(minimum_increment),
                Some(gender),
                Some(employment_type),
            ) if errors.0.is_empty() => Ok(NewSalaryStory {
                kind: "story",
                company_name,
                designation,
                location,
                experience_level,
                experience,
                total_monthly,
                which_years_salary,
                minimum_increment,
                gender,
                employment_type,
                department: optional(&self.department),
                story_title: optional(&self.story_title),
                story_description: optional(&self.story_description),
                is_anonymous: self.is_anonymous,
            }),
            _ => Err(ValidationErrors(errors.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filled() -> ContributionForm {
        ContributionForm {
            company_name: "Acme Ltd".to_string(),
            designation: "Software Engineer".to_string(),
            location: "Dhaka".to_string(),
            experience_level: "Mid".to_string(),
            experience: "3".to_string(),
            total_monthly: "85000".to_string(),
            which_years_salary: "2024".to_string(),
            minimum_increment: Some("8".to_string()),
            gender: "Prefer not to say".to_string(),
            employment_type: "Full-time".to_string(),
            department: Some("Engineering & Development".to_string()),
            story_title: None,
            story_description: Some("Good team".to_string()),
            is_anonymous: true,
        }
    }

    #[test]
    fn test_valid_form_builds_payload() {
        let payload = filled().validate_for_year(2025).unwrap();
        let body = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            body,
            json!({
                "type": "story",
                "companyName": "Acme Ltd",
                "designation": "Software Engineer",
                "location": "Dhaka",
                "experienceLevel": "Mid",
                "experience": "3",
                "totalMonthly": 85000,
                "whichYearsSalary": 2024,
                "minimumIncrement": 8,
                "gender": "Prefer not to say",
                "employmentType": "Full-time",
                "department": "Engineering & Development",
                "storyDescription": "Good team",
                "isAnonymous": true
            })
        );
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = ContributionForm::default()
            .validate_for_year(2025)
            .unwrap_err();
        assert_eq!(errors.field("companyName"), Some("Company name required"));
        assert_eq!(errors.field("designation"), Some("Designation required"));
        assert_eq!(errors.field("location"), Some("Location required"));
        assert_eq!(errors.field("experience"), Some("Experience required"));
        assert_eq!(errors.field("totalMonthly"), Some("Invalid salary"));
        assert!(errors.field("experienceLevel").is_some());
        assert!(errors.field("whichYearsSalary").is_some());
        assert!(errors.field("gender").is_some());
        assert!(errors.field("employmentType").is_some());
        assert_eq!(errors.field("minimumIncrement"), None);
        assert_eq!(errors.0.len(), 9);
    }

    #[test]
    fn test_malformed_numbers_are_rejected() {
        let mut form = filled();
        form.total_monthly = "lots".to_string();
        form.experience = "20".to_string();
        form.minimum_increment = Some("-5".to_string());
        form.which_years_salary = "2019".to_string();

        let errors = form.validate_for_year(2025).unwrap_err();
        assert_eq!(errors.field("totalMonthly"), Some("Invalid salary"));
        assert!(errors.field("experience").unwrap().contains("between 0 and 15"));
        assert_eq!(errors.field("minimumIncrement"), Some("Invalid increment"));
        assert_eq!(
            errors.field("whichYearsSalary"),
            Some("Salary year must be between 2020 and 2025")
        );
        assert!(errors.to_string().starts_with("submission has 4 invalid field(s)"));
    }

    #[test]
    fn test_blank_increment_defaults_to_zero() {
        let mut form = filled();
        form.minimum_increment = Some("  ".to_string());
        form.department = Some(String::new());
        let payload = form.validate_for_year(2025).unwrap();
        assert_eq!(payload.minimum_increment, 0);
        assert_eq!(payload.department, None);
    }

    #[test]
    fn test_future_salary_year_rejected() {
        let mut form = filled();
        form.which_years_salary = "2026".to_string();
        assert!(form.validate_for_year(2025).is_err());
        assert!(form.validate_for_year(2026).is_ok());
    }
}
