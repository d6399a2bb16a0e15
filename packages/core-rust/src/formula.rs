//! Derived-value computation.
//!
//! A derived field names one [`Formula`] from a closed set and a list of
//! parent field ids. [`compute`] evaluates the formula against the current
//! value map. Evaluation never fails: missing parents, parents of the wrong
//! kind, unparseable dates and negative durations all collapse into the
//! formula's [`fallback`](Formula::fallback) value.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

use crate::field::{FieldDefinition, FieldKind};
use crate::types::{FieldValue, FormValueMap};

/// Display value of an empty or invalid duration.
pub const DURATION_FALLBACK: &str = "0 years 0 months";

static MISSING: FieldValue = FieldValue::Null;

/// The closed set of computations a derived field can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Formula {
    /// Whole years and remaining months elapsed since the parent date.
    #[default]
    #[serde(alias = "durationFromDate(field1)", alias = "ageFromDate(field1)")]
    DurationFromDate,
    /// Sum of the parents' numeric values.
    #[serde(alias = "field1 + field2")]
    Sum,
    /// First parent minus every following parent.
    #[serde(alias = "field1 - field2")]
    Difference,
}

impl Formula {
    /// Every formula, in a stable order.
    pub const ALL: [Formula; 3] = [Formula::DurationFromDate, Formula::Sum, Formula::Difference];

    /// Wire name of the formula.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DurationFromDate => "durationFromDate",
            Self::Sum => "sum",
            Self::Difference => "difference",
        }
    }

    /// Kind every parent of this formula must have.
    #[must_use]
    pub fn parent_kind(self) -> FieldKind {
        match self {
            Self::DurationFromDate => FieldKind::Date,
            Self::Sum | Self::Difference => FieldKind::Number,
        }
    }

    /// Whether `count` declared parents is a legal arity for this formula.
    #[must_use]
    pub fn accepts_parent_count(self, count: usize) -> bool {
        match self {
            Self::DurationFromDate => count == 1,
            Self::Sum | Self::Difference => count >= 1,
        }
    }

    /// Human description of the accepted arity, for diagnostics.
    #[must_use]
    pub fn arity_text(self) -> &'static str {
        match self {
            Self::DurationFromDate => "exactly one parent",
            Self::Sum | Self::Difference => "at least one parent",
        }
    }

    /// Value produced when the inputs are missing or unusable.
    #[must_use]
    pub fn fallback(self) -> FieldValue {
        match self {
            Self::DurationFromDate => FieldValue::text(DURATION_FALLBACK),
            Self::Sum | Self::Difference => FieldValue::Number(0.0),
        }
    }

    fn evaluate(self, parents: &[&FieldValue], today: NaiveDate) -> Option<FieldValue> {
        match self {
            Self::DurationFromDate => {
                let [parent] = parents else { return None };
                let since = parse_date(parent.as_text()?)?;
                let elapsed = YearsMonths::between(since, today)?;
                Some(FieldValue::Text(elapsed.to_string()))
            }
            Self::Sum => Some(FieldValue::Number(
                parents.iter().map(|v| v.as_number().unwrap_or(0.0)).sum(),
            )),
            Self::Difference => {
                let mut numbers = parents.iter().map(|v| v.as_number().unwrap_or(0.0));
                let first = numbers.next()?;
                Some(FieldValue::Number(numbers.fold(first, |acc, n| acc - n)))
            }
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for formula names outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown formula: {0}")]
pub struct UnknownFormula(pub String);

impl FromStr for Formula {
    type Err = UnknownFormula;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "durationFromDate" | "durationFromDate(field1)" | "ageFromDate(field1)" => {
                Ok(Self::DurationFromDate)
            }
            "sum" | "field1 + field2" => Ok(Self::Sum),
            "difference" | "field1 - field2" => Ok(Self::Difference),
            other => Err(UnknownFormula(other.to_string())),
        }
    }
}

/// Deserializes an optional formula where an absent, null or empty string
/// means "no formula".
pub(crate) fn deserialize_formula<'de, D>(deserializer: D) -> Result<Option<Formula>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => name.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Calendar-aware elapsed time in whole years and remaining months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearsMonths {
    pub years: u32,
    pub months: u32,
}

impl YearsMonths {
    /// Elapsed time from `since` to `until`, or `None` if `since` is later.
    ///
    /// A month only counts once its day-of-month has been reached; a negative
    /// month offset borrows one year.
    #[must_use]
    pub fn between(since: NaiveDate, until: NaiveDate) -> Option<Self> {
        let mut years = until.year() - since.year();
        let mut months = i64::from(until.month()) - i64::from(since.month());
        if until.day() < since.day() {
            months -= 1;
        }
        if months < 0 {
            years -= 1;
            months += 12;
        }
        Some(Self {
            years: u32::try_from(years).ok()?,
            months: u32::try_from(months).ok()?,
        })
    }
}

impl fmt::Display for YearsMonths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years {} months", self.years, self.months)
    }
}

/// Parses a date value: `YYYY-MM-DD`, or an RFC 3339 timestamp whose calendar
/// date is taken as written.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Computes the value of a derived field from the current value map.
///
/// `fields` is the live schema used to resolve parent ids; a parent that is no
/// longer in it, or whose kind no longer matches the formula, yields the
/// fallback. A derived field without a formula is treated as a duration.
#[must_use]
pub fn compute(
    field: &FieldDefinition,
    fields: &[FieldDefinition],
    values: &FormValueMap,
    today: NaiveDate,
) -> FieldValue {
    let formula = field.formula.unwrap_or_default();
    if !formula.accepts_parent_count(field.parent_fields.len()) {
        return formula.fallback();
    }

    let mut parents = Vec::with_capacity(field.parent_fields.len());
    for parent_id in &field.parent_fields {
        let Some(parent) = fields.iter().find(|f| &f.id == parent_id) else {
            tracing::debug!(field = %field.id, parent = %parent_id, "derived parent missing");
            return formula.fallback();
        };
        if parent.derived || parent.kind != formula.parent_kind() {
            tracing::debug!(field = %field.id, parent = %parent_id, "derived parent not readable");
            return formula.fallback();
        }
        parents.push(values.get(parent_id).unwrap_or(&MISSING));
    }

    formula
        .evaluate(&parents, today)
        .unwrap_or_else(|| formula.fallback())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("test date")
    }

    fn derived(id: &str, formula: Formula, parents: &[&str]) -> FieldDefinition {
        let mut field = FieldDefinition::new(id, FieldKind::Number);
        field.derived = true;
        field.formula = Some(formula);
        field.parent_fields = parents.iter().map(ToString::to_string).collect();
        field
    }

    fn values(pairs: &[(&str, FieldValue)]) -> FormValueMap {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn duration_exact_anniversary() {
        let fields = vec![
            FieldDefinition::new("dob", FieldKind::Date),
            derived("age", Formula::DurationFromDate, &["dob"]),
        ];
        let out = compute(
            &fields[1],
            &fields,
            &values(&[("dob", FieldValue::text("2000-08-10"))]),
            date("2025-08-10"),
        );
        assert_eq!(out, FieldValue::text("25 years 0 months"));
    }

    #[test]
    fn duration_future_date_falls_back() {
        let fields = vec![
            FieldDefinition::new("dob", FieldKind::Date),
            derived("age", Formula::DurationFromDate, &["dob"]),
        ];
        let out = compute(
            &fields[1],
            &fields,
            &values(&[("dob", FieldValue::text("2025-09-01"))]),
            date("2025-08-10"),
        );
        assert_eq!(out, FieldValue::text(DURATION_FALLBACK));
    }

    #[test]
    fn duration_borrows_across_year_boundary() {
        let ym = YearsMonths::between(date("1990-11-20"), date("2025-03-05")).expect("positive");
        assert_eq!(ym, YearsMonths { years: 34, months: 3 });

        let ym = YearsMonths::between(date("2025-08-11"), date("2025-08-10"));
        assert_eq!(ym, None);

        let ym = YearsMonths::between(date("2024-08-11"), date("2025-08-10")).expect("positive");
        assert_eq!(ym, YearsMonths { years: 0, months: 11 });
    }

    #[test]
    fn duration_unparseable_or_missing_falls_back() {
        let fields = vec![
            FieldDefinition::new("dob", FieldKind::Date),
            derived("age", Formula::DurationFromDate, &["dob"]),
        ];
        let today = date("2025-08-10");
        for input in [FieldValue::text("not a date"), FieldValue::text(""), FieldValue::Null] {
            let out = compute(&fields[1], &fields, &values(&[("dob", input)]), today);
            assert_eq!(out, FieldValue::text(DURATION_FALLBACK));
        }
        let out = compute(&fields[1], &fields, &FormValueMap::new(), today);
        assert_eq!(out, FieldValue::text(DURATION_FALLBACK));
    }

    #[test]
    fn duration_accepts_timestamps() {
        assert_eq!(parse_date("2001-02-03T10:00:00Z"), Some(date("2001-02-03")));
        assert_eq!(parse_date("2001-02-30"), None);
    }

    #[test]
    fn sum_coerces_non_numeric_to_zero() {
        let fields = vec![
            FieldDefinition::new("a", FieldKind::Number),
            FieldDefinition::new("b", FieldKind::Number),
            derived("total", Formula::Sum, &["a", "b"]),
        ];
        let out = compute(
            &fields[2],
            &fields,
            &values(&[("a", FieldValue::Number(3.0)), ("b", FieldValue::text("x"))]),
            date("2025-01-01"),
        );
        assert_eq!(out, FieldValue::Number(3.0));
    }

    #[test]
    fn difference_subtracts_left_to_right() {
        let fields = vec![
            FieldDefinition::new("a", FieldKind::Number),
            FieldDefinition::new("b", FieldKind::Number),
            FieldDefinition::new("c", FieldKind::Number),
            derived("net", Formula::Difference, &["a", "b", "c"]),
        ];
        let out = compute(
            &fields[3],
            &fields,
            &values(&[
                ("a", FieldValue::Number(10.0)),
                ("b", FieldValue::text("3")),
                ("c", FieldValue::Number(2.0)),
            ]),
            date("2025-01-01"),
        );
        assert_eq!(out, FieldValue::Number(5.0));
    }

    #[test]
    fn deleted_parent_yields_fallback() {
        let age = derived("age", Formula::DurationFromDate, &["dob"]);
        let fields = vec![age.clone()];
        let out = compute(
            &age,
            &fields,
            &values(&[("dob", FieldValue::text("2000-01-01"))]),
            date("2025-01-01"),
        );
        assert_eq!(out, FieldValue::text(DURATION_FALLBACK));

        let total = derived("total", Formula::Sum, &["gone"]);
        let out = compute(&total, &[total.clone()], &FormValueMap::new(), date("2025-01-01"));
        assert_eq!(out, FieldValue::Number(0.0));
    }

    #[test]
    fn parent_of_wrong_kind_yields_fallback() {
        let fields = vec![
            FieldDefinition::new("dob", FieldKind::Text),
            derived("age", Formula::DurationFromDate, &["dob"]),
        ];
        let out = compute(
            &fields[1],
            &fields,
            &values(&[("dob", FieldValue::text("2000-01-01"))]),
            date("2025-01-01"),
        );
        assert_eq!(out, FieldValue::text(DURATION_FALLBACK));
    }

    #[test]
    fn derived_parent_yields_fallback() {
        let fields = vec![
            FieldDefinition::new("a", FieldKind::Number),
            derived("x", Formula::Sum, &["a"]),
            derived("total", Formula::Sum, &["x"]),
        ];
        let out = compute(
            &fields[2],
            &fields,
            &values(&[("a", FieldValue::Number(5.0)), ("x", FieldValue::Number(5.0))]),
            date("2025-01-01"),
        );
        assert_eq!(out, FieldValue::Number(0.0));
    }

    #[test]
    fn missing_formula_defaults_to_duration() {
        let mut age = derived("age", Formula::DurationFromDate, &["dob"]);
        age.formula = None;
        let fields = vec![FieldDefinition::new("dob", FieldKind::Date), age];
        let out = compute(
            &fields[1],
            &fields,
            &values(&[("dob", FieldValue::text("2020-01-15"))]),
            date("2025-03-20"),
        );
        assert_eq!(out, FieldValue::text("5 years 2 months"));
    }

    #[test]
    fn legacy_formula_names_parse() {
        assert_eq!("ageFromDate(field1)".parse::<Formula>(), Ok(Formula::DurationFromDate));
        assert_eq!("field1 + field2".parse::<Formula>(), Ok(Formula::Sum));
        assert_eq!("field1 - field2".parse::<Formula>(), Ok(Formula::Difference));
        assert!("a * b".parse::<Formula>().is_err());
    }
}
