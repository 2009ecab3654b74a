//! Criteria: field / operator / value triples and the rows that group them

use chrono::{DateTime, Duration, NaiveDate, Utc};
use mixtape_core::{MixtapeError, Result, Track};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::{FieldKind, SmartField};

/// Comparison applied by a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    InRange,
    OneOf,
}

impl Operator {
    /// Whether the operator can be used on fields of `kind`
    pub fn applies_to(self, kind: FieldKind) -> bool {
        match self {
            Self::Equals | Self::NotEquals => true,
            Self::Contains | Self::NotContains | Self::StartsWith | Self::EndsWith => {
                kind == FieldKind::Text
            }
            Self::GreaterThan | Self::LessThan | Self::InRange => kind != FieldKind::Text,
            Self::OneOf => kind != FieldKind::Date,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Equals => "is equal to",
            Self::NotEquals => "is not equal to",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::StartsWith => "starts with",
            Self::EndsWith => "ends with",
            Self::GreaterThan => "is greater than",
            Self::LessThan => "is less than",
            Self::InRange => "is between",
            Self::OneOf => "is one of",
        };
        f.write_str(text)
    }
}

/// Largest accepted relative offset, in days either way
pub const MAX_RELATIVE_DAYS: i64 = 100_000;

/// A calendar day, fixed or relative to the evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSpec {
    On(NaiveDate),
    /// `days` from today; negative values look into the past
    Relative { days: i64 },
}

impl DateSpec {
    /// Shorthand for "N days ago"
    pub fn days_ago(days: i64) -> Self {
        Self::Relative { days: -days }
    }

    /// Whether the offset lies within `MAX_RELATIVE_DAYS`
    pub fn is_in_range(self) -> bool {
        match self {
            Self::On(_) => true,
            Self::Relative { days } => (-MAX_RELATIVE_DAYS..=MAX_RELATIVE_DAYS).contains(&days),
        }
    }

    /// Offsets beyond `MAX_RELATIVE_DAYS` are clamped to it
    pub fn resolve(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::On(date) => date,
            Self::Relative { days } => {
                let days = days.clamp(-MAX_RELATIVE_DAYS, MAX_RELATIVE_DAYS);
                now.checked_add_signed(Duration::days(days))
                    .unwrap_or(now)
                    .date_naive()
            }
        }
    }
}

/// Operand of a criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CriterionValue {
    Text(String),
    Number(i64),
    Date(DateSpec),
    TextList(Vec<String>),
    NumberList(Vec<i64>),
    NumberRange { low: i64, high: i64 },
    DateRange { from: DateSpec, to: DateSpec },
}

impl CriterionValue {
    fn shape(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Date(_) => "date",
            Self::TextList(_) => "text list",
            Self::NumberList(_) => "number list",
            Self::NumberRange { .. } => "number range",
            Self::DateRange { .. } => "date range",
        }
    }
}

/// A validated field / operator / value triple
///
/// Built through [`Criterion::new`] (or deserialization, which runs the
/// same checks), so an instance always pairs an operator with a field it
/// applies to and a value of the right shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCriterion", into = "RawCriterion")]
pub struct Criterion {
    field: SmartField,
    operator: Operator,
    value: CriterionValue,
}

#[derive(Serialize, Deserialize)]
struct RawCriterion {
    field: SmartField,
    operator: Operator,
    value: CriterionValue,
}

impl TryFrom<RawCriterion> for Criterion {
    type Error = MixtapeError;

    fn try_from(raw: RawCriterion) -> Result<Self> {
        Self::new(raw.field, raw.operator, raw.value)
    }
}

impl From<Criterion> for RawCriterion {
    fn from(c: Criterion) -> Self {
        Self {
            field: c.field,
            operator: c.operator,
            value: c.value,
        }
    }
}

impl Criterion {
    /// Validate and build a criterion
    ///
    /// # Errors
    /// `Configuration` when the operator does not apply to the field, the
    /// value has the wrong shape for the pair, or a relative date is out of
    /// range
    pub fn new(field: SmartField, operator: Operator, value: CriterionValue) -> Result<Self> {
        let kind = field.kind();
        if !operator.applies_to(kind) {
            return Err(MixtapeError::configuration(format!(
                "operator '{}' cannot be used with field '{}'",
                operator, field
            )));
        }

        let dates_in_range = match &value {
            CriterionValue::Date(spec) => spec.is_in_range(),
            CriterionValue::DateRange { from, to } => from.is_in_range() && to.is_in_range(),
            _ => true,
        };
        if !dates_in_range {
            return Err(MixtapeError::configuration(format!(
                "relative date offset on field '{}' must be within {} days",
                field, MAX_RELATIVE_DAYS
            )));
        }

        let shape_ok = match (kind, operator, &value) {
            (FieldKind::Text, Operator::OneOf, CriterionValue::TextList(items)) => !items.is_empty(),
            (FieldKind::Text, _, CriterionValue::Text(_)) => operator != Operator::OneOf,
            (FieldKind::Numeric, Operator::OneOf, CriterionValue::NumberList(items)) => {
                !items.is_empty()
            }
            (FieldKind::Numeric, Operator::InRange, CriterionValue::NumberRange { low, high }) => {
                low <= high
            }
            (FieldKind::Numeric, _, CriterionValue::Number(_)) => {
                !matches!(operator, Operator::OneOf | Operator::InRange)
            }
            (FieldKind::Date, Operator::InRange, CriterionValue::DateRange { .. }) => true,
            (FieldKind::Date, _, CriterionValue::Date(_)) => operator != Operator::InRange,
            _ => false,
        };

        if !shape_ok {
            return Err(MixtapeError::configuration(format!(
                "'{} {}' does not accept a {} value",
                field,
                operator,
                value.shape()
            )));
        }

        Ok(Self {
            field,
            operator,
            value,
        })
    }

    pub fn field(&self) -> SmartField {
        self.field
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &CriterionValue {
        &self.value
    }

    /// Whether `track` satisfies the criterion
    ///
    /// Unset numeric and date values never match. Text matching ignores case.
    pub fn matches(&self, track: &Track, now: DateTime<Utc>) -> bool {
        match self.field.kind() {
            FieldKind::Text => self
                .field
                .text(track)
                .map(|text| self.matches_text(text))
                .unwrap_or(false),
            FieldKind::Numeric => self
                .field
                .number(track)
                .map(|n| self.matches_number(n))
                .unwrap_or(false),
            FieldKind::Date => self
                .field
                .date(track)
                .map(|d| self.matches_date(d.date_naive(), now))
                .unwrap_or(false),
        }
    }

    fn matches_text(&self, text: &str) -> bool {
        let haystack = text.to_lowercase();
        match (&self.value, self.operator) {
            (CriterionValue::TextList(items), Operator::OneOf) => {
                items.iter().any(|item| item.to_lowercase() == haystack)
            }
            (CriterionValue::Text(needle), op) => {
                let needle = needle.to_lowercase();
                match op {
                    Operator::Equals => haystack == needle,
                    Operator::NotEquals => haystack != needle,
                    Operator::Contains => haystack.contains(&needle),
                    Operator::NotContains => !haystack.contains(&needle),
                    Operator::StartsWith => haystack.starts_with(&needle),
                    Operator::EndsWith => haystack.ends_with(&needle),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn matches_number(&self, n: i64) -> bool {
        match (&self.value, self.operator) {
            (CriterionValue::Number(v), Operator::Equals) => n == *v,
            (CriterionValue::Number(v), Operator::NotEquals) => n != *v,
            (CriterionValue::Number(v), Operator::GreaterThan) => n > *v,
            (CriterionValue::Number(v), Operator::LessThan) => n < *v,
            (CriterionValue::NumberRange { low, high }, Operator::InRange) => (*low..=*high).contains(&n),
            (CriterionValue::NumberList(items), Operator::OneOf) => items.contains(&n),
            _ => false,
        }
    }

    fn matches_date(&self, day: NaiveDate, now: DateTime<Utc>) -> bool {
        match (&self.value, self.operator) {
            (CriterionValue::Date(spec), op) => {
                let target = spec.resolve(now);
                match op {
                    Operator::Equals => day == target,
                    Operator::NotEquals => day != target,
                    Operator::GreaterThan => day > target,
                    Operator::LessThan => day < target,
                    _ => false,
                }
            }
            (CriterionValue::DateRange { from, to }, Operator::InRange) => {
                let (a, b) = (from.resolve(now), to.resolve(now));
                let (start, end) = if a <= b { (a, b) } else { (b, a) };
                (start..=end).contains(&day)
            }
            _ => false,
        }
    }
}

/// How criteria in one row combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// One editor row: criteria joined by the row's conjunction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRow {
    #[serde(default)]
    pub conjunction: Conjunction,
    pub criteria: Vec<Criterion>,
}

impl CriteriaRow {
    /// Row holding a single criterion
    pub fn single(criterion: Criterion) -> Self {
        Self {
            conjunction: Conjunction::And,
            criteria: vec![criterion],
        }
    }

    pub fn new(conjunction: Conjunction, criteria: Vec<Criterion>) -> Self {
        Self {
            conjunction,
            criteria,
        }
    }

    pub fn matches(&self, track: &Track, now: DateTime<Utc>) -> bool {
        match self.conjunction {
            Conjunction::And => self.criteria.iter().all(|c| c.matches(track, now)),
            Conjunction::Or => self.criteria.iter().any(|c| c.matches(track, now)),
        }
    }
}
