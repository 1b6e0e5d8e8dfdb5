use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of the experience scale, in years.
pub const MAX_EXPERIENCE_YEARS: u8 = 15;

/// One reported compensation data point, normalized from whatever form
/// version produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalaryRecord {
    pub id: String,
    pub company_name: Option<String>,
    pub designation: Option<String>,
    pub location: Option<String>,
    pub department: Option<String>,
    pub industry: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<Years>,
    pub experience_level: Option<ExperienceLevel>,
    pub employment_type: Option<EmploymentType>,
    pub total_monthly: Option<u64>, // BDT; None means "not disclosed"
    pub salary_year: Option<i32>,
    pub minimum_increment: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
    pub is_anonymous: bool,
    pub submitted_by: Option<String>,
    pub story: Option<Story>,
}

impl SalaryRecord {
    /// Record with only an id set; the rest is filled by ingestion or tests.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            company_name: None,
            designation: None,
            location: None,
            department: None,
            industry: None,
            qualification: None,
            experience: None,
            experience_level: None,
            employment_type: None,
            total_monthly: None,
            salary_year: None,
            minimum_increment: None,
            created_at: None,
            is_anonymous: false,
            submitted_by: None,
            story: None,
        }
    }

    pub fn is_story(&self) -> bool {
        self.story.is_some()
    }

    /// Name that may be shown for the submitter. Anonymous records never
    /// expose `submitted_by`.
    pub fn display_author(&self) -> &str {
        if self.is_anonymous {
            "Anonymous"
        } else {
            self.submitted_by.as_deref().unwrap_or("User")
        }
    }
}

/// Narrative fields carried by a salary story.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Story {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Years of experience, 0 through 15.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "String")]
pub struct Years(u8);

impl Years {
    pub fn new(years: u8) -> Option<Self> {
        (years <= MAX_EXPERIENCE_YEARS).then_some(Self(years))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every valid value, in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=MAX_EXPERIENCE_YEARS).map(Self)
    }
}

impl fmt::Display for Years {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Years> for String {
    fn from(years: Years) -> Self {
        years.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("experience must be a whole number of years between 0 and 15, got '{0}'")]
pub struct InvalidYears(pub String);

impl FromStr for Years {
    type Err = InvalidYears;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| InvalidYears(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Lead,
    Manager,
}

impl ExperienceLevel {
    pub const ALL: [Self; 5] = [
        Self::Entry,
        Self::Mid,
        Self::Senior,
        Self::Lead,
        Self::Manager,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Mid => "Mid",
            Self::Senior => "Senior",
            Self::Lead => "Lead",
            Self::Manager => "Manager",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
}

impl EmploymentType {
    pub const ALL: [Self; 4] = [
        Self::FullTime,
        Self::PartTime,
        Self::Contract,
        Self::Internship,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTime => "Full-time",
            Self::PartTime => "Part-time",
            Self::Contract => "Contract",
            Self::Internship => "Internship",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
    #[serde(rename = "Prefer not to say")]
    PreferNotToSay,
}

impl Gender {
    pub const ALL: [Self; 4] = [Self::Male, Self::Female, Self::Other, Self::PreferNotToSay];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
            Self::PreferNotToSay => "Prefer not to say",
        }
    }
}

/// Raised when a string is not one of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{value}' is not a valid {kind} (expected one of: {expected})")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub expected: String,
}

fn parse_variant<T: Clone>(
    kind: &'static str,
    input: &str,
    all: &[T],
    name: impl Fn(&T) -> &'static str,
) -> Result<T, UnknownVariant> {
    let wanted = input.trim();
    all.iter()
        .find(|v| name(*v).eq_ignore_ascii_case(wanted))
        .cloned()
        .ok_or_else(|| UnknownVariant {
            kind,
            value: input.to_string(),
            expected: all.iter().map(&name).collect::<Vec<_>>().join(", "),
        })
}

impl FromStr for ExperienceLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("experience level", s, &Self::ALL, |v| v.as_str())
    }
}

impl FromStr for EmploymentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("employment type", s, &Self::ALL, |v| v.as_str())
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant("gender", s, &Self::ALL, |v| v.as_str())
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_years_bounds() {
        assert_eq!(Years::new(0).map(Years::get), Some(0));
        assert_eq!(Years::new(15).map(Years::get), Some(15));
        assert!(Years::new(16).is_none());
        assert_eq!(Years::all().count(), 16);
    }

    #[test]
    fn test_years_from_str() {
        assert_eq!("7".parse::<Years>().unwrap().get(), 7);
        assert_eq!(" 3 ".parse::<Years>().unwrap().get(), 3);
        assert!("16".parse::<Years>().is_err());
        assert!("-1".parse::<Years>().is_err());
        assert!("three".parse::<Years>().is_err());
    }

    #[test]
    fn test_employment_type_parsing_is_case_insensitive() {
        assert_eq!(
            "full-time".parse::<EmploymentType>().unwrap(),
            EmploymentType::FullTime
        );
        assert_eq!(
            "Internship".parse::<EmploymentType>().unwrap(),
            EmploymentType::Internship
        );
        let err = "Freelance".parse::<EmploymentType>().unwrap_err();
        assert!(err.to_string().contains("Full-time, Part-time, Contract, Internship"));
    }

    #[test]
    fn test_gender_accepts_multi_word_variant() {
        assert_eq!(
            "prefer not to say".parse::<Gender>().unwrap(),
            Gender::PreferNotToSay
        );
    }

    #[test]
    fn test_display_author_hides_anonymous_submitter() {
        let mut record = SalaryRecord::bare("a1");
        record.submitted_by = Some("Rahim".to_string());
        assert_eq!(record.display_author(), "Rahim");

        record.is_anonymous = true;
        assert_eq!(record.display_author(), "Anonymous");

        let nameless = SalaryRecord::bare("a2");
        assert_eq!(nameless.display_author(), "User");
    }
}
