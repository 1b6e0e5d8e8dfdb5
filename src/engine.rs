//! Client-side salary search, faceting, sorting and pagination.
//!
//! [`SalaryFilterEngine`] holds one fetched batch of records plus the user's
//! query state. Every derived view is recomputed from those two on demand;
//! records themselves are never modified, only filtered and reordered by
//! reference.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::models::SalaryRecord;

/// Synthetic designation option meaning "no designation filter".
pub const ALL_DESIGNATIONS: &str = "ALL";

/// A record field usable as an exact-match filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Experience,
    ExperienceLevel,
    Department,
    Location,
    EmploymentType,
    Industry,
    Qualification,
    CompanyName,
}

impl Facet {
    pub const ALL: [Self; 8] = [
        Self::Experience,
        Self::ExperienceLevel,
        Self::Department,
        Self::Location,
        Self::EmploymentType,
        Self::Industry,
        Self::Qualification,
        Self::CompanyName,
    ];

    /// Field name as used by the backend and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Experience => "experience",
            Self::ExperienceLevel => "experienceLevel",
            Self::Department => "department",
            Self::Location => "location",
            Self::EmploymentType => "employmentType",
            Self::Industry => "industry",
            Self::Qualification => "qualification",
            Self::CompanyName => "companyName",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Experience => "Experience",
            Self::ExperienceLevel => "Level",
            Self::Department => "Department",
            Self::Location => "Location",
            Self::EmploymentType => "Employment",
            Self::Industry => "Industry",
            Self::Qualification => "Qualification",
            Self::CompanyName => "Company",
        }
    }

    pub fn value_of(self, record: &SalaryRecord) -> Option<Cow<'_, str>> {
        match self {
            Self::Experience => record.experience.map(|y| Cow::Owned(y.to_string())),
            Self::ExperienceLevel => record.experience_level.map(|l| Cow::Borrowed(l.as_str())),
            Self::Department => record.department.as_deref().map(Cow::Borrowed),
            Self::Location => record.location.as_deref().map(Cow::Borrowed),
            Self::EmploymentType => record
                .employment_type
                .as_ref()
                .map(|t| Cow::Borrowed(t.as_str())),
            Self::Industry => record.industry.as_deref().map(Cow::Borrowed),
            Self::Qualification => record.qualification.as_deref().map(Cow::Borrowed),
            Self::CompanyName => record.company_name.as_deref().map(Cow::Borrowed),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter field '{0}' (expected one of: experience, experienceLevel, department, location, employmentType, industry, qualification, companyName)")]
pub struct UnknownFacet(pub String);

impl FromStr for Facet {
    type Err = UnknownFacet;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // accept camelCase, kebab-case and snake_case spellings
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        Self::ALL
            .into_iter()
            .find(|facet| facet.name().to_lowercase() == wanted)
            .ok_or_else(|| UnknownFacet(s.to_string()))
    }
}

/// The designation selection: everything, or one exact job title.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DesignationFilter {
    #[default]
    All,
    Exact(String),
}

impl DesignationFilter {
    fn matches(&self, record: &SalaryRecord) -> bool {
        match self {
            Self::All => true,
            Self::Exact(wanted) => record.designation.as_deref() == Some(wanted.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_DESIGNATIONS,
            Self::Exact(designation) => designation,
        }
    }
}

impl From<&str> for DesignationFilter {
    fn from(value: &str) -> Self {
        if value.is_empty() || value == ALL_DESIGNATIONS {
            Self::All
        } else {
            Self::Exact(value.to_string())
        }
    }
}

impl From<String> for DesignationFilter {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    SalaryHigh,
    SalaryLow,
}

impl SortKey {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Oldest, Self::SalaryHigh, Self::SalaryLow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::SalaryHigh => "salary-high",
            Self::SalaryLow => "salary-low",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest First",
            Self::Oldest => "Oldest First",
            Self::SalaryHigh => "Highest Salary",
            Self::SalaryLow => "Lowest Salary",
        }
    }

    /// The key after this one, wrapping around.
    pub fn cycle(self) -> Self {
        match self {
            Self::Newest => Self::Oldest,
            Self::Oldest => Self::SalaryHigh,
            Self::SalaryHigh => Self::SalaryLow,
            Self::SalaryLow => Self::Newest,
        }
    }

    /// Orders two records. Records missing the sort field always come after
    /// records that have it, whichever the direction.
    fn compare(self, a: &SalaryRecord, b: &SalaryRecord) -> Ordering {
        match self {
            Self::Newest => present_first(a.created_at, b.created_at, true),
            Self::Oldest => present_first(a.created_at, b.created_at, false),
            Self::SalaryHigh => present_first(a.total_monthly, b.total_monthly, true),
            Self::SalaryLow => present_first(a.total_monthly, b.total_monthly, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort '{0}' (expected newest, oldest, salary-high or salary-low)")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

fn present_first<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// How the visible slice advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingMode {
    /// Numbered pages of `page_size` records.
    Pages,
    /// A growing window from the top ("see more" / "see less").
    Window,
}

/// Aggregate over the disclosed salaries of the matching records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SalarySummary {
    pub matches: usize,
    pub disclosed: usize,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub average: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SalaryFilterEngine {
    records: Vec<SalaryRecord>,
    designation: DesignationFilter,
    search_term: String,
    keyword: String,
    facet_filters: BTreeMap<Facet, String>,
    sort_key: SortKey,
    mode: PagingMode,
    page_size: usize,
    current_page: usize,
    visible_count: usize,
}

impl SalaryFilterEngine {
    /// Creates an empty engine. A zero page size is treated as one.
    pub fn new(mode: PagingMode, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            records: Vec::new(),
            designation: DesignationFilter::All,
            search_term: String::new(),
            keyword: String::new(),
            facet_filters: BTreeMap::new(),
            sort_key: SortKey::default(),
            mode,
            page_size,
            current_page: 1,
            visible_count: page_size,
        }
    }

    pub fn with_records(mut self, records: Vec<SalaryRecord>) -> Self {
        self.replace_records(records);
        self
    }

    /// Installs a freshly fetched batch. Query state is kept; pagination
    /// starts over.
    pub fn replace_records(&mut self, records: Vec<SalaryRecord>) {
        self.records = records;
        self.reset_pagination();
    }

    pub fn records(&self) -> &[SalaryRecord] {
        &self.records
    }

    // --- Query state ---

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Narrows the designation options; does not filter records.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
        self.reset_pagination();
    }

    pub fn designation(&self) -> &DesignationFilter {
        &self.designation
    }

    pub fn set_designation(&mut self, value: impl Into<DesignationFilter>) {
        self.designation = value.into();
        self.reset_pagination();
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Free-text record filter over designation and company name, as used by
    /// the stories view. Blank clears it.
    pub fn set_keyword(&mut self, keyword: impl Into<String>) {
        self.keyword = keyword.into();
        self.reset_pagination();
    }

    pub fn facet_filter(&self, facet: Facet) -> Option<&str> {
        self.facet_filters.get(&facet).map(String::as_str)
    }

    pub fn facet_filters(&self) -> impl Iterator<Item = (Facet, &str)> {
        self.facet_filters.iter().map(|(f, v)| (*f, v.as_str()))
    }

    /// Sets or clears one facet. An empty value clears.
    pub fn set_facet_filter(&mut self, facet: Facet, value: Option<&str>) {
        match value.filter(|v| !v.is_empty()) {
            Some(value) => {
                self.facet_filters.insert(facet, value.to_string());
            }
            None => {
                self.facet_filters.remove(&facet);
            }
        }
        self.reset_pagination();
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Changes the order only; the current page or window is kept.
    pub fn set_sort(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    // --- Pagination ---

    pub fn mode(&self) -> PagingMode {
        self.mode
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn current_page(&self) -> usize {
        self.current_page.min(self.last_page())
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    pub fn total_pages(&self) -> usize {
        self.total_match_count().div_ceil(self.page_size)
    }

    fn last_page(&self) -> usize {
        self.total_pages().max(1)
    }

    pub fn next_page(&mut self) {
        self.set_page(self.current_page().saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.set_page(self.current_page().saturating_sub(1));
    }

    /// Jumps to page `n`, clamped to the valid range.
    pub fn set_page(&mut self, n: usize) {
        self.current_page = n.clamp(1, self.last_page());
    }

    /// Grows the window by one page, never past the match count and never
    /// below one page.
    pub fn expand_visible_count(&mut self) {
        let total = self.total_match_count();
        self.visible_count = self
            .visible_count
            .saturating_add(self.page_size)
            .min(total)
            .max(self.page_size);
    }

    pub fn collapse_visible_count(&mut self) {
        self.visible_count = self.page_size;
    }

    /// Whether a "next page" / "see more" control applies.
    pub fn has_more(&self) -> bool {
        match self.mode {
            PagingMode::Pages => self.current_page() < self.total_pages(),
            PagingMode::Window => self.visible_count < self.total_match_count(),
        }
    }

    /// Whether a "see less" control applies.
    pub fn can_collapse(&self) -> bool {
        self.mode == PagingMode::Window && self.visible_count > self.page_size
    }

    fn reset_pagination(&mut self) {
        self.current_page = 1;
        self.visible_count = self.page_size;
    }

    // --- Derived views ---

    /// Distinct designations in first-seen order, narrowed by the search
    /// term. With `include_all`, the synthetic [`ALL_DESIGNATIONS`] entry
    /// leads the list and is narrowed like any other option.
    pub fn derived_designation_options(&self, include_all: bool) -> Vec<&str> {
        let needle = self.search_term.trim().to_lowercase();
        let mut seen = HashSet::new();
        let all = include_all.then_some(ALL_DESIGNATIONS);

        all.into_iter()
            .chain(self.records.iter().filter_map(|r| r.designation.as_deref()))
            .filter(|designation| seen.insert(*designation))
            .filter(|designation| {
                needle.is_empty() || designation.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Distinct non-empty values of `facet` over the whole batch, in
    /// first-seen order. Other active filters never narrow this list.
    pub fn derived_facet_options(&self, facet: Facet) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter_map(|record| facet.value_of(record))
            .filter(|value| !value.is_empty())
            .filter(|value| seen.insert(value.to_string()))
            .map(Cow::into_owned)
            .collect()
    }

    fn matches(&self, record: &SalaryRecord) -> bool {
        if !self.designation.matches(record) {
            return false;
        }
        let keyword = self.keyword.trim().to_lowercase();
        if !keyword.is_empty() {
            let hit = |field: &Option<String>| {
                field
                    .as_deref()
                    .is_some_and(|v| v.to_lowercase().contains(&keyword))
            };
            if !hit(&record.designation) && !hit(&record.company_name) {
                return false;
            }
        }
        self.facet_filters
            .iter()
            .all(|(facet, wanted)| facet.value_of(record).as_deref() == Some(wanted.as_str()))
    }

    /// Every matching record, sorted, before pagination.
    pub fn matching_records(&self) -> Vec<&SalaryRecord> {
        let mut matching: Vec<&SalaryRecord> =
            self.records.iter().filter(|r| self.matches(r)).collect();
        // sort_by is stable, so equal keys keep their batch order
        matching.sort_by(|a, b| self.sort_key.compare(a, b));
        matching
    }

    pub fn total_match_count(&self) -> usize {
        self.records.iter().filter(|r| self.matches(r)).count()
    }

    /// The current page or window of matching records.
    pub fn visible_records(&self) -> Vec<&SalaryRecord> {
        let matching = self.matching_records();
        match self.mode {
            PagingMode::Pages => {
                let start = (self.current_page() - 1) * self.page_size;
                matching
                    .into_iter()
                    .skip(start)
                    .take(self.page_size)
                    .collect()
            }
            PagingMode::Window => matching.into_iter().take(self.visible_count).collect(),
        }
    }

    pub fn summary(&self) -> SalarySummary {
        let matching = self.matching_records();
        let disclosed: Vec<u64> = matching.iter().filter_map(|r| r.total_monthly).collect();
        let sum: u128 = disclosed.iter().map(|v| u128::from(*v)).sum();
        let average = (!disclosed.is_empty())
            .then(|| u64::try_from(sum / disclosed.len() as u128).unwrap_or(u64::MAX));
        SalarySummary {
            matches: matching.len(),
            disclosed: disclosed.len(),
            min: disclosed.iter().copied().min(),
            max: disclosed.iter().copied().max(),
            average,
        }
    }
}
