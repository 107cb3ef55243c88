//! Boolean predicates and their combinators.
//!
//! A [`Predicate`] is a condition attachable to a statement's WHERE clause
//! or a join's ON clause. Predicates combine with `&` (AND), `|` (OR) and
//! `!` (NOT); nested conjunctions and disjunctions are flattened and double
//! negation cancels out.
//!
//! # Examples
//!
//! ```
//! use sqlrepo_db::query::expr::Expr;
//! use sqlrepo_db::query::predicate::Predicate;
//!
//! let name = Expr::column("users", "name");
//! let either = name.clone().eq("Alice") | name.eq("Bob");
//! assert!(matches!(either, Predicate::Or(ref children) if children.len() == 2));
//! ```

use std::ops;

use super::expr::Expr;
use crate::value::Value;

/// A binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl CompareOp {
    /// Returns the SQL operator token.
    pub const fn sql_token(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A boolean condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `lhs <op> rhs`.
    Compare {
        /// Left operand.
        lhs: Expr,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        rhs: Expr,
    },
    /// `lhs LIKE pattern` or `lhs ILIKE pattern`.
    Like {
        /// Matched expression.
        lhs: Expr,
        /// Pattern, wildcards already applied.
        pattern: Expr,
        /// ILIKE when `true`.
        case_insensitive: bool,
    },
    /// `lhs IN (values...)`.
    In {
        /// Tested expression.
        lhs: Expr,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// `lhs BETWEEN low AND high`.
    Between {
        /// Tested expression.
        lhs: Expr,
        /// Lower bound.
        low: Expr,
        /// Upper bound.
        high: Expr,
    },
    /// `lhs IS [NOT] rhs`, where `rhs` is NULL or a boolean.
    Is {
        /// Tested expression.
        lhs: Expr,
        /// NULL, TRUE or FALSE.
        rhs: Value,
        /// `IS NOT` when `true`.
        negated: bool,
    },
    /// Regular-expression match.
    Regex {
        /// Matched expression.
        lhs: Expr,
        /// The pattern.
        pattern: Expr,
    },
    /// A caller-supplied SQL fragment with its parameters.
    Raw {
        /// The SQL text, using `?` for each parameter.
        sql: String,
        /// The bound parameters, in order.
        params: Vec<Value>,
    },
    /// A constant condition. `Const(false)` is the always-false predicate.
    Const(bool),
    /// Logical AND.
    And(Vec<Predicate>),
    /// Logical OR.
    Or(Vec<Predicate>),
    /// Logical NOT.
    Not(Box<Predicate>),
}

impl Predicate {
    /// The always-false predicate.
    pub const fn always_false() -> Self {
        Self::Const(false)
    }

    /// A raw SQL predicate. Parameters are bound positionally at `?`.
    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Raw {
            sql: sql.into(),
            params,
        }
    }

    /// ANDs all predicates together.
    ///
    /// A single predicate is returned unwrapped; an empty input yields an
    /// empty `And`, which compiles to an always-true condition.
    pub fn and_all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut items: Vec<Self> = predicates.into_iter().collect();
        if items.len() == 1 {
            return items.remove(0);
        }
        Self::And(items)
    }

    /// ORs all predicates together.
    ///
    /// A single predicate is returned unwrapped; an empty input yields an
    /// empty `Or`, which compiles to an always-false condition.
    pub fn or_all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut items: Vec<Self> = predicates.into_iter().collect();
        if items.len() == 1 {
            return items.remove(0);
        }
        Self::Or(items)
    }

    /// Returns `true` for an empty `And`/`Or`.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::And(children) | Self::Or(children) => children.is_empty(),
            _ => false,
        }
    }
}

impl ops::BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::And(mut left), Self::And(right)) => {
                left.extend(right);
                Self::And(left)
            }
            (Self::And(mut left), other) => {
                left.push(other);
                Self::And(left)
            }
            (other, Self::And(mut right)) => {
                right.insert(0, other);
                Self::And(right)
            }
            (left, right) => Self::And(vec![left, right]),
        }
    }
}

impl ops::BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Or(mut left), Self::Or(right)) => {
                left.extend(right);
                Self::Or(left)
            }
            (Self::Or(mut left), other) => {
                left.push(other);
                Self::Or(left)
            }
            (other, Self::Or(mut right)) => {
                right.insert(0, other);
                Self::Or(right)
            }
            (left, right) => Self::Or(vec![left, right]),
        }
    }
}

impl ops::Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str) -> Expr {
        Expr::column("t", name)
    }

    #[test]
    fn test_and_flattening() {
        let p = (col("a").eq(1) & col("b").eq(2)) & col("c").eq(3);
        match &p {
            Predicate::And(children) => assert_eq!(children.len(), 3),
            _ => panic!("Expected And with 3 children"),
        }
    }

    #[test]
    fn test_or_flattening() {
        let p = col("a").eq(1) | (col("b").eq(2) | col("c").eq(3));
        match &p {
            Predicate::Or(children) => {
                assert_eq!(children.len(), 3);
                assert_eq!(children[0], col("a").eq(1));
            }
            _ => panic!("Expected Or with 3 children"),
        }
    }

    #[test]
    fn test_double_negation() {
        let p = col("active").eq(true);
        assert_eq!(!!p.clone(), p);
    }

    #[test]
    fn test_mixed_combination() {
        let p = (col("a").eq(1) & col("b").gt(2)) | col("c").eq(3);
        match &p {
            Predicate::Or(children) => {
                assert!(matches!(&children[0], Predicate::And(_)));
                assert!(matches!(&children[1], Predicate::Compare { .. }));
            }
            _ => panic!("Expected Or"),
        }
    }

    #[test]
    fn test_and_all_single_unwraps() {
        let p = Predicate::and_all([col("a").eq(1)]);
        assert_eq!(p, col("a").eq(1));
        assert!(Predicate::and_all([]).is_empty());
        assert!(Predicate::or_all([]).is_empty());
    }

    #[test]
    fn test_always_false() {
        assert_eq!(Predicate::always_false(), Predicate::Const(false));
        assert!(!Predicate::always_false().is_empty());
    }

    #[test]
    fn test_sql_tokens() {
        assert_eq!(CompareOp::Ge.sql_token(), ">=");
        assert_eq!(CompareOp::Ne.sql_token(), "!=");
    }
}
