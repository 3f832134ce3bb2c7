//! Domain types and operators understood by the filter engine.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The type of a value, attribute or expression node.
///
/// `Unknown` exists so that a schema can declare fields the engine does not
/// understand; it never appears on a constructed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    String,
    Integer,
    Double,
    Boolean,
    #[serde(alias = "time_stamp", alias = "datetime")]
    TimeStamp,
    Tag,
    Unknown,
}

impl DomainType {
    /// Returns true for Integer and Double.
    pub fn is_numeric(self) -> bool {
        matches!(self, DomainType::Integer | DomainType::Double)
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DomainType::String => "String",
            DomainType::Integer => "Integer",
            DomainType::Double => "Double",
            DomainType::Boolean => "Boolean",
            DomainType::TimeStamp => "TimeStamp",
            DomainType::Tag => "Tag",
            DomainType::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// An operator that combines one or two sub-expressions.
///
/// Tag membership (`Includes`/`DoesNotInclude`) shares its surface tokens with
/// `Equals`/`DoesNotEqual`; the factory picks the membership form when a tag
/// is compared against a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // ==================== Equality ====================
    Equals,
    DoesNotEqual,
    EqualsIgnoreCase,
    DoesNotEqualIgnoreCase,

    // ==================== Ordering ====================
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    LessThanIgnoreCase,
    GreaterThanIgnoreCase,
    LessThanOrEqualIgnoreCase,
    GreaterThanOrEqualIgnoreCase,

    // ==================== Strings ====================
    IsASubstringOf,
    IsASubstringOfIgnoreCase,

    // ==================== Boolean ====================
    And,
    Or,
    Not,

    // ==================== Tags ====================
    Includes,
    DoesNotInclude,
    IncludesIgnoreCase,
    DoesNotIncludeIgnoreCase,
}

/// The three-way-compare outcome an ordering or equality operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparison {
    /// Maps a three-way comparison result onto this comparison.
    pub fn test(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
        }
    }

    /// Returns true for `Eq` and `Ne`.
    pub fn is_equality(self) -> bool {
        matches!(self, Comparison::Eq | Comparison::Ne)
    }
}

impl Operator {
    /// The surface token for this operator in filter text.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Equals | Operator::Includes => "=",
            Operator::DoesNotEqual | Operator::DoesNotInclude => "!=",
            Operator::EqualsIgnoreCase | Operator::IncludesIgnoreCase => "~=",
            Operator::DoesNotEqualIgnoreCase | Operator::DoesNotIncludeIgnoreCase => "~!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThanIgnoreCase => "~<",
            Operator::GreaterThanIgnoreCase => "~>",
            Operator::LessThanOrEqualIgnoreCase => "~<=",
            Operator::GreaterThanOrEqualIgnoreCase => "~>=",
            Operator::IsASubstringOf => "$",
            Operator::IsASubstringOfIgnoreCase => "~$",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
        }
    }

    /// Returns true for the `~` variants.
    pub fn is_case_insensitive(self) -> bool {
        matches!(
            self,
            Operator::EqualsIgnoreCase
                | Operator::DoesNotEqualIgnoreCase
                | Operator::LessThanIgnoreCase
                | Operator::GreaterThanIgnoreCase
                | Operator::LessThanOrEqualIgnoreCase
                | Operator::GreaterThanOrEqualIgnoreCase
                | Operator::IsASubstringOfIgnoreCase
                | Operator::IncludesIgnoreCase
                | Operator::DoesNotIncludeIgnoreCase
        )
    }

    /// Returns the case-insensitive variant, if the operator has one.
    pub fn ignoring_case(self) -> Option<Operator> {
        let op = match self {
            Operator::Equals => Operator::EqualsIgnoreCase,
            Operator::DoesNotEqual => Operator::DoesNotEqualIgnoreCase,
            Operator::LessThan => Operator::LessThanIgnoreCase,
            Operator::GreaterThan => Operator::GreaterThanIgnoreCase,
            Operator::LessThanOrEqual => Operator::LessThanOrEqualIgnoreCase,
            Operator::GreaterThanOrEqual => Operator::GreaterThanOrEqualIgnoreCase,
            Operator::IsASubstringOf => Operator::IsASubstringOfIgnoreCase,
            Operator::Includes => Operator::IncludesIgnoreCase,
            Operator::DoesNotInclude => Operator::DoesNotIncludeIgnoreCase,
            op if op.is_case_insensitive() => op,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the equality/ordering comparison this operator performs.
    ///
    /// `None` for substring, boolean and membership operators.
    pub fn comparison(self) -> Option<Comparison> {
        let cmp = match self {
            Operator::Equals | Operator::EqualsIgnoreCase => Comparison::Eq,
            Operator::DoesNotEqual | Operator::DoesNotEqualIgnoreCase => Comparison::Ne,
            Operator::LessThan | Operator::LessThanIgnoreCase => Comparison::Lt,
            Operator::GreaterThan | Operator::GreaterThanIgnoreCase => Comparison::Gt,
            Operator::LessThanOrEqual | Operator::LessThanOrEqualIgnoreCase => Comparison::Le,
            Operator::GreaterThanOrEqual | Operator::GreaterThanOrEqualIgnoreCase => {
                Comparison::Ge
            }
            _ => return None,
        };
        Some(cmp)
    }

    /// Maps an equality operator onto its tag-membership counterpart.
    pub fn as_membership(self) -> Option<Operator> {
        let op = match self {
            Operator::Equals | Operator::Includes => Operator::Includes,
            Operator::DoesNotEqual | Operator::DoesNotInclude => Operator::DoesNotInclude,
            Operator::EqualsIgnoreCase | Operator::IncludesIgnoreCase => {
                Operator::IncludesIgnoreCase
            }
            Operator::DoesNotEqualIgnoreCase | Operator::DoesNotIncludeIgnoreCase => {
                Operator::DoesNotIncludeIgnoreCase
            }
            _ => return None,
        };
        Some(op)
    }

    /// Returns true for the membership operators.
    pub fn is_membership(self) -> bool {
        matches!(
            self,
            Operator::Includes
                | Operator::DoesNotInclude
                | Operator::IncludesIgnoreCase
                | Operator::DoesNotIncludeIgnoreCase
        )
    }

    /// Returns true for `IsASubstringOf` and its case-insensitive variant.
    pub fn is_substring(self) -> bool {
        matches!(
            self,
            Operator::IsASubstringOf | Operator::IsASubstringOfIgnoreCase
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
