//! The operator library.
//!
//! Every operator is a plain `fn(Expr, Value) -> Predicate`. The two closed
//! operator sets, [`AdvancedOperator`] (the `operator` key of advanced filter
//! maps) and [`DjangoLookup`] (the `__lookup` suffix of Django-style keys),
//! map each name to its function through a `match`, so dispatch is a table
//! lookup rather than dynamic.
//!
//! None of these functions fail. Malformed `between`/`range` operands yield
//! the always-false predicate.

use std::fmt;
use std::str::FromStr;

use crate::query::expr::{CastType, DatePart, Expr};
use crate::query::predicate::Predicate;
use crate::value::Value;

/// A pure mapping from a field reference and a value to a predicate.
pub type OperatorFn = fn(Expr, Value) -> Predicate;

// ── Common operators ─────────────────────────────────────────────────

/// `field = value`.
pub fn eq(field: Expr, value: Value) -> Predicate {
    field.eq(value)
}

/// `field > value`.
pub fn gt(field: Expr, value: Value) -> Predicate {
    field.gt(value)
}

/// `field >= value`.
pub fn ge(field: Expr, value: Value) -> Predicate {
    field.ge(value)
}

/// `field < value`.
pub fn lt(field: Expr, value: Value) -> Predicate {
    field.lt(value)
}

/// `field <= value`.
pub fn le(field: Expr, value: Value) -> Predicate {
    field.le(value)
}

/// `field IS value`.
pub fn is_(field: Expr, value: Value) -> Predicate {
    field.is_(value)
}

/// `field IS NOT value`.
pub fn is_not(field: Expr, value: Value) -> Predicate {
    field.is_not(value)
}

/// `field BETWEEN a AND b` for a two-element list, always-false otherwise.
pub fn between(field: Expr, value: Value) -> Predicate {
    match value {
        Value::List(bounds) if bounds.len() == 2 => {
            let mut bounds = bounds.into_iter();
            match (bounds.next(), bounds.next()) {
                (Some(low), Some(high)) => field.between(low, high),
                _ => Predicate::always_false(),
            }
        }
        _ => Predicate::always_false(),
    }
}

/// `field IN (values...)`. A scalar is treated as a one-element list.
pub fn in_(field: Expr, value: Value) -> Predicate {
    match value {
        Value::List(items) => field.in_(items),
        scalar => field.in_([scalar]),
    }
}

// ── Django lookups ───────────────────────────────────────────────────

/// `field = value`, or `field IS NULL` for a null value.
pub fn exact(field: Expr, value: Value) -> Predicate {
    if value.is_null() {
        return field.is_(Value::Null);
    }
    field.eq(value)
}

/// Case-insensitive equality: ILIKE without wildcards for strings.
pub fn iexact(field: Expr, value: Value) -> Predicate {
    match value {
        Value::Null => field.is_(Value::Null),
        Value::String(s) => field.ilike(s),
        other => field.eq(other),
    }
}

fn wrap(value: Value, prefix: &str, suffix: &str) -> Value {
    match value {
        Value::String(s) => Value::String(format!("{prefix}{s}{suffix}")),
        other => other,
    }
}

/// `field LIKE '%value%'`.
pub fn contains(field: Expr, value: Value) -> Predicate {
    field.like(wrap(value, "%", "%"))
}

/// `field ILIKE '%value%'`.
pub fn icontains(field: Expr, value: Value) -> Predicate {
    field.ilike(wrap(value, "%", "%"))
}

/// `field LIKE 'value%'`.
pub fn startswith(field: Expr, value: Value) -> Predicate {
    field.like(wrap(value, "", "%"))
}

/// `field ILIKE 'value%'`.
pub fn istartswith(field: Expr, value: Value) -> Predicate {
    field.ilike(wrap(value, "", "%"))
}

/// `field LIKE '%value'`.
pub fn endswith(field: Expr, value: Value) -> Predicate {
    field.like(wrap(value, "%", ""))
}

/// `field ILIKE '%value'`.
pub fn iendswith(field: Expr, value: Value) -> Predicate {
    field.ilike(wrap(value, "%", ""))
}

/// `CAST(field AS DATE) = value`.
pub fn date(field: Expr, value: Value) -> Predicate {
    field.cast(CastType::Date).eq(value)
}

/// `CAST(field AS TIME) = value`.
pub fn time(field: Expr, value: Value) -> Predicate {
    field.cast(CastType::Time).eq(value)
}

fn extract_eq(field: Expr, part: DatePart, value: Value) -> Predicate {
    field.extract(part).eq(value)
}

/// `EXTRACT(year FROM field) = value`.
pub fn year(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Year, value)
}

/// `EXTRACT(isoyear FROM field) = value`.
pub fn iso_year(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::IsoYear, value)
}

/// `EXTRACT(month FROM field) = value`.
pub fn month(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Month, value)
}

/// `EXTRACT(day FROM field) = value`.
pub fn day(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Day, value)
}

/// `EXTRACT(week FROM field) = value`.
pub fn week(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Week, value)
}

/// `EXTRACT(dow FROM field) = value` (0 = Sunday).
pub fn week_day(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::WeekDay, value)
}

/// `EXTRACT(isodow FROM field) = value` (1 = Monday .. 7 = Sunday).
pub fn iso_week_day(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::IsoWeekDay, value)
}

/// `EXTRACT(quarter FROM field) = value`.
pub fn quarter(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Quarter, value)
}

/// `EXTRACT(hour FROM field) = value`.
pub fn hour(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Hour, value)
}

/// `EXTRACT(minute FROM field) = value`.
pub fn minute(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Minute, value)
}

/// `EXTRACT(second FROM field) = value`.
pub fn second(field: Expr, value: Value) -> Predicate {
    extract_eq(field, DatePart::Second, value)
}

/// `field IS NULL` when `value` is truthy, `field IS NOT NULL` otherwise.
pub fn isnull(field: Expr, value: Value) -> Predicate {
    if value.is_truthy() {
        field.is_(Value::Null)
    } else {
        field.is_not(Value::Null)
    }
}

/// Regular-expression match.
pub fn regex(field: Expr, value: Value) -> Predicate {
    field.regexp_match(value)
}

/// Case-insensitive regular-expression match: both sides lower-cased.
pub fn iregex(field: Expr, value: Value) -> Predicate {
    let pattern = match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    };
    field.lower().regexp_match(pattern)
}

// ── Operator sets ────────────────────────────────────────────────────

/// Operators accepted in the `operator` key of an advanced filter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdvancedOperator {
    /// `==`
    Eq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
    /// `between`
    Between,
    /// `contains` (membership, IN)
    Contains,
}

impl AdvancedOperator {
    /// Every advanced operator.
    pub const ALL: [Self; 7] = [
        Self::Eq,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Between,
        Self::Contains,
    ];

    /// The operator's name in filter maps.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Between => "between",
            Self::Contains => "contains",
        }
    }

    /// The operator function.
    pub fn operator(self) -> OperatorFn {
        match self {
            Self::Eq => eq,
            Self::Gt => gt,
            Self::Lt => lt,
            Self::Ge => ge,
            Self::Le => le,
            Self::Between => between,
            Self::Contains => in_,
        }
    }
}

impl fmt::Display for AdvancedOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvancedOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator \"{s}\""))
    }
}

/// Lookups accepted as the `__suffix` of a Django-style key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DjangoLookup {
    Exact,
    IExact,
    Contains,
    IContains,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    Range,
    Date,
    Year,
    IsoYear,
    Month,
    Day,
    Week,
    WeekDay,
    IsoWeekDay,
    Quarter,
    Time,
    Hour,
    Minute,
    Second,
    IsNull,
    Regex,
    IRegex,
}

impl DjangoLookup {
    /// Every lookup, in the order they are listed in error messages.
    pub const ALL: [Self; 30] = [
        Self::Exact,
        Self::IExact,
        Self::Contains,
        Self::IContains,
        Self::In,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::StartsWith,
        Self::IStartsWith,
        Self::EndsWith,
        Self::IEndsWith,
        Self::Range,
        Self::Date,
        Self::Year,
        Self::IsoYear,
        Self::Month,
        Self::Day,
        Self::Week,
        Self::WeekDay,
        Self::IsoWeekDay,
        Self::Quarter,
        Self::Time,
        Self::Hour,
        Self::Minute,
        Self::Second,
        Self::IsNull,
        Self::Regex,
        Self::IRegex,
    ];

    /// The lookup's key suffix.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IExact => "iexact",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::StartsWith => "startswith",
            Self::IStartsWith => "istartswith",
            Self::EndsWith => "endswith",
            Self::IEndsWith => "iendswith",
            Self::Range => "range",
            Self::Date => "date",
            Self::Year => "year",
            Self::IsoYear => "iso_year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Week => "week",
            Self::WeekDay => "week_day",
            Self::IsoWeekDay => "iso_week_day",
            Self::Quarter => "quarter",
            Self::Time => "time",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::IsNull => "isnull",
            Self::Regex => "regex",
            Self::IRegex => "iregex",
        }
    }

    /// The lookup function.
    pub fn operator(self) -> OperatorFn {
        match self {
            Self::Exact => exact,
            Self::IExact => iexact,
            Self::Contains => contains,
            Self::IContains => icontains,
            Self::In => in_,
            Self::Gt => gt,
            Self::Gte => ge,
            Self::Lt => lt,
            Self::Lte => le,
            Self::StartsWith => startswith,
            Self::IStartsWith => istartswith,
            Self::EndsWith => endswith,
            Self::IEndsWith => iendswith,
            Self::Range => between,
            Self::Date => date,
            Self::Year => year,
            Self::IsoYear => iso_year,
            Self::Month => month,
            Self::Day => day,
            Self::Week => week,
            Self::WeekDay => week_day,
            Self::IsoWeekDay => iso_week_day,
            Self::Quarter => quarter,
            Self::Time => time,
            Self::Hour => hour,
            Self::Minute => minute,
            Self::Second => second,
            Self::IsNull => isnull,
            Self::Regex => regex,
            Self::IRegex => iregex,
        }
    }

    /// Renders the lookup names as `['exact', 'iexact', ...]`.
    pub fn names_display() -> String {
        let names: Vec<String> = Self::ALL
            .iter()
            .map(|lookup| format!("'{}'", lookup.as_str()))
            .collect();
        format!("[{}]", names.join(", "))
    }
}

impl fmt::Display for DjangoLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DjangoLookup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|lookup| lookup.as_str() == s)
            .ok_or_else(|| format!("unknown lookup \"{s}\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::CompareOp;

    fn field() -> Expr {
        Expr::column("my_model", "name")
    }

    #[test]
    fn test_between_requires_two_values() {
        assert_eq!(
            between(field(), Value::list([1, 5])),
            field().between(1, 5)
        );
        assert_eq!(between(field(), Value::list([1])), Predicate::always_false());
        assert_eq!(
            between(field(), Value::list([1, 2, 3])),
            Predicate::always_false()
        );
        assert_eq!(between(field(), Value::Int(1)), Predicate::always_false());
    }

    #[test]
    fn test_in_wraps_scalars() {
        assert_eq!(
            in_(field(), Value::list([1, 2])),
            field().in_([Value::Int(1), Value::Int(2)])
        );
        assert_eq!(in_(field(), Value::Int(7)), field().in_([Value::Int(7)]));
    }

    #[test]
    fn test_exact_null_is_is_null() {
        assert_eq!(exact(field(), Value::Null), field().is_(Value::Null));
        assert_eq!(exact(field(), Value::from("x")), field().eq("x"));
        assert_eq!(iexact(field(), Value::Null), field().is_(Value::Null));
    }

    #[test]
    fn test_iexact_string_uses_ilike_without_wildcards() {
        assert_eq!(iexact(field(), Value::from("AbC")), field().ilike("AbC"));
        assert_eq!(iexact(field(), Value::Int(3)), field().eq(3));
    }

    #[test]
    fn test_substring_wildcards() {
        assert_eq!(contains(field(), Value::from("a")), field().like("%a%"));
        assert_eq!(icontains(field(), Value::from("a")), field().ilike("%a%"));
        assert_eq!(startswith(field(), Value::from("a")), field().like("a%"));
        assert_eq!(istartswith(field(), Value::from("a")), field().ilike("a%"));
        assert_eq!(endswith(field(), Value::from("a")), field().like("%a"));
        assert_eq!(iendswith(field(), Value::from("a")), field().ilike("%a"));
    }

    #[test]
    fn test_substring_non_strings_pass_through() {
        assert_eq!(contains(field(), Value::Int(5)), field().like(5));
    }

    #[test]
    fn test_isnull() {
        assert_eq!(isnull(field(), Value::Bool(true)), field().is_(Value::Null));
        assert_eq!(
            isnull(field(), Value::Bool(false)),
            field().is_not(Value::Null)
        );
    }

    #[test]
    fn test_week_day_and_iso_week_day_differ() {
        let dt = Expr::column("my_model", "dt");
        let a = week_day(dt.clone(), Value::Int(1));
        let b = iso_week_day(dt.clone(), Value::Int(1));
        assert_ne!(a, b);
        assert_eq!(
            b,
            Predicate::Compare {
                lhs: dt.extract(DatePart::IsoWeekDay),
                op: CompareOp::Eq,
                rhs: Expr::Value(Value::Int(1)),
            }
        );
    }

    #[test]
    fn test_date_casts() {
        let dt = Expr::column("my_model", "dt");
        assert_eq!(
            date(dt.clone(), Value::from("2024-01-01")),
            dt.cast(CastType::Date).eq("2024-01-01")
        );
    }

    #[test]
    fn test_iregex_lowercases_both_sides() {
        assert_eq!(
            iregex(field(), Value::from("^AB")),
            field().lower().regexp_match("^ab")
        );
    }

    #[test]
    fn test_operator_sets_parse() {
        assert_eq!("==".parse::<AdvancedOperator>(), Ok(AdvancedOperator::Eq));
        assert_eq!(
            "contains".parse::<AdvancedOperator>(),
            Ok(AdvancedOperator::Contains)
        );
        assert!("!=".parse::<AdvancedOperator>().is_err());
        assert!("is".parse::<AdvancedOperator>().is_err());
        assert!("is_not".parse::<AdvancedOperator>().is_err());

        for lookup in DjangoLookup::ALL {
            assert_eq!(lookup.as_str().parse::<DjangoLookup>(), Ok(lookup));
        }
        assert!("ne".parse::<DjangoLookup>().is_err());
    }

    #[test]
    fn test_table_dispatch() {
        let op = DjangoLookup::Gte.operator();
        assert_eq!(op(field(), Value::Int(18)), field().ge(18));
        let op = AdvancedOperator::Contains.operator();
        assert_eq!(
            op(field(), Value::list([1])),
            field().in_([Value::Int(1)])
        );
    }

    #[test]
    fn test_lookup_names_display() {
        let names = DjangoLookup::names_display();
        assert!(names.starts_with("['exact', 'iexact'"));
        assert!(names.ends_with("'iregex']"));
    }
}
