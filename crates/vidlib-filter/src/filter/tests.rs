//! Tests for the filter parser.

use super::*;
use crate::error::{DiagnosticKind, ParseDiagnostic};
use crate::schema::{MapRecord, Schema};
use crate::tags::MemoryTagStore;
use crate::types::{DomainType, Operator};
use crate::value::{TagSet, Value};

fn factory() -> ExprFactory {
    let schema = Schema::new("handle")
        .with_field("handle", DomainType::Integer)
        .with_field("title", DomainType::String)
        .with_field("rating", DomainType::Double)
        .with_field("age", DomainType::Integer)
        .with_field("watched", DomainType::Boolean)
        .with_field("added", DomainType::TimeStamp);
    ExprFactory::new(schema, ["Genre", "Mood"]).unwrap()
}

fn parse(text: &str) -> Expr {
    factory().parse(text).unwrap()
}

fn parse_err(text: &str) -> ParseDiagnostic {
    factory().parse(text).unwrap_err()
}

// ==================== Literals ====================

#[test]
fn test_parse_integer_radixes() {
    let f = factory();
    assert_eq!(
        parse("age = 0x10"),
        f.binary(f.attribute("age").unwrap(), Operator::Equals, f.value(16i64))
            .unwrap()
    );
    assert_eq!(
        parse("age = 010"),
        f.binary(f.attribute("age").unwrap(), Operator::Equals, f.value(8i64))
            .unwrap()
    );
}

#[test]
fn test_parse_integer_round_trip() {
    let f = factory();
    for n in [0i64, 7, -7, 1_000_000, i64::MAX, i64::MIN] {
        let expr = f
            .binary(f.attribute("age").unwrap(), Operator::Equals, f.value(n))
            .unwrap();
        let reparsed = f.parse(&expr.to_string()).unwrap();
        assert_eq!(reparsed.children()[1].literal(), Some(&Value::Integer(n)));
    }
}

#[test]
fn test_parse_strings_stay_strings() {
    let expr = parse("title = \"42\"");
    assert_eq!(expr.children()[1].literal(), Some(&Value::from("42")));
    let expr = parse("title = 'TRUE'");
    assert_eq!(expr.children()[1].domain_type(), DomainType::String);
}

#[test]
fn test_parse_tag_list_literal() {
    let expr = parse("Genre = [Drama, War, War]");
    assert_eq!(
        expr.children()[1].literal(),
        Some(&Value::Tag(TagSet::new(["Drama", "War"])))
    );
    assert_eq!(expr.operator(), Some(Operator::Equals));
}

#[test]
fn test_parse_malformed_tag_list_is_a_literal_error() {
    let diag = parse_err("Genre = [Drama,, War]");
    assert_eq!(diag.kind, DiagnosticKind::Literal);
    assert_eq!(diag.column, 8);
}

#[test]
fn test_parse_timestamp_string_is_coerced() {
    let expr = parse("added >= \"2024-01-01\"");
    assert_eq!(expr.children()[1].domain_type(), DomainType::TimeStamp);

    let diag = parse_err("added >= \"someday\"");
    assert_eq!(diag.kind, DiagnosticKind::Literal);
    assert_eq!(diag.column, 6);
}

#[test]
fn test_parse_timestamp_literal_types_string_comparison() {
    let expr = parse("title < #2024-01-01#");
    assert_eq!(expr.children()[1].domain_type(), DomainType::TimeStamp);
    assert_eq!(expr.to_string(), "title < #2024-01-01T00:00:00Z#");
    assert_eq!(parse("added >= #2024-01-01#"), parse("added >= \"2024-01-01\""));

    let plain = parse("title = \"2024-01-01\"");
    assert_eq!(plain.children()[1].domain_type(), DomainType::String);

    let diag = parse_err("added >= #someday#");
    assert_eq!(diag.kind, DiagnosticKind::Literal);
    assert_eq!(diag.column, 9);
}

// ==================== Operators & Precedence ====================

#[test]
fn test_parse_keywords_case_insensitive() {
    assert_eq!(
        parse("watched and not watched or TRUE"),
        parse("watched AND NOT watched OR true")
    );
}

#[test]
fn test_parse_and_binds_tighter_than_or() {
    let expr = parse("watched OR watched AND FALSE");
    assert_eq!(expr.operator(), Some(Operator::Or));
    assert_eq!(expr.children()[1].operator(), Some(Operator::And));
}

#[test]
fn test_parse_parentheses_override_precedence() {
    let expr = parse("(watched OR watched) AND FALSE");
    assert_eq!(expr.operator(), Some(Operator::And));
    assert_eq!(expr.children()[0].operator(), Some(Operator::Or));
}

#[test]
fn test_parse_not_applies_to_comparison() {
    let expr = parse("NOT age > 3");
    assert_eq!(expr.operator(), Some(Operator::Not));
    assert_eq!(expr.children()[0].operator(), Some(Operator::GreaterThan));
}

#[test]
fn test_parse_substring_reads_as_contains() {
    let expr = parse("title $ \"war\"");
    assert_eq!(expr.operator(), Some(Operator::IsASubstringOf));
    assert_eq!(expr.children()[0].literal(), Some(&Value::from("war")));
    assert_eq!(
        expr.children()[1].attribute().map(|a| a.name()),
        Some("title")
    );
}

#[test]
fn test_parse_tag_equality_against_string_is_membership() {
    assert_eq!(parse("genre = \"Drama\"").operator(), Some(Operator::Includes));
    assert_eq!(
        parse("GENRE ~<> \"Drama\"").operator(),
        Some(Operator::DoesNotIncludeIgnoreCase)
    );
}

#[test]
fn test_parse_constant_expression_folds() {
    let expr = parse("5 < 5.5 AND \"Foo\" ~= \"foo\"");
    assert_eq!(expr.constant_value(), Some(&Value::Boolean(true)));
    let expr = parse("\"concatenate\" $ \"dog\"");
    assert_eq!(expr.constant_value(), Some(&Value::Boolean(false)));
}

// ==================== Diagnostics ====================

#[test]
fn test_parse_truncated_reports_end_of_input() {
    let diag = parse_err("age >");
    assert_eq!(diag.column, 5);
    assert_eq!(diag.kind, DiagnosticKind::Grammar);
    assert_eq!(diag.message, "unexpected end of expression");
    assert_eq!(diag.text, "age >");
}

#[test]
fn test_parse_empty_expression() {
    for text in ["", "   "] {
        let diag = parse_err(text);
        assert_eq!(diag.message, "filter expression is empty");
        assert_eq!(diag.column, 0);
    }
}

#[test]
fn test_parse_unclosed_parenthesis() {
    let diag = parse_err("(watched OR TRUE");
    assert_eq!(diag.message, "missing closing parenthesis");
    assert_eq!(diag.column, 16);

    let diag = parse_err("(watched 5");
    assert_eq!(diag.column, 9);
}

#[test]
fn test_parse_trailing_tokens() {
    let diag = parse_err("watched watched");
    assert_eq!(diag.column, 8);
    assert_eq!(diag.message, "unexpected token 'watched'");

    let diag = parse_err("age < 3 < 4");
    assert_eq!(diag.column, 8);
}

#[test]
fn test_parse_operator_in_operand_position() {
    let diag = parse_err("age = AND");
    assert_eq!(diag.column, 6);
    assert_eq!(diag.message, "unexpected token 'AND'");
}

#[test]
fn test_parse_lexer_error_is_positioned() {
    let diag = parse_err("age > 3 & watched");
    assert_eq!(diag.column, 8);
    assert_eq!(diag.message, "unexpected character '&'");
}

#[test]
fn test_parse_unknown_attribute_points_at_identifier() {
    let diag = parse_err("watched AND ratng > 3");
    assert_eq!(diag.kind, DiagnosticKind::Schema);
    assert_eq!(diag.column, 12);
    assert_eq!(diag.message, "unknown attribute 'ratng' (did you mean 'rating'?)");
    assert_eq!(
        diag.render(),
        "watched AND ratng > 3\n            ^ unknown attribute 'ratng' (did you mean 'rating'?)"
    );
}

#[test]
fn test_parse_type_error_points_at_operator() {
    let diag = parse_err("title = 3");
    assert_eq!(diag.kind, DiagnosticKind::Type);
    assert_eq!(diag.column, 6);

    let diag = parse_err("watched AND age");
    assert_eq!(diag.kind, DiagnosticKind::Type);
    assert_eq!(diag.column, 8);

    let diag = parse_err("NOT age");
    assert_eq!(diag.column, 0);
}

#[test]
fn test_compile_rejects_non_boolean_root() {
    let err = factory().compile("title").unwrap_err();
    assert_eq!(err.to_string(), "filter must be a Boolean expression, found String");
}

#[test]
fn test_compile_wraps_diagnostics() {
    let err = factory().compile("age >").unwrap_err();
    assert!(matches!(err, crate::FilterError::Grammar(_)));
}

// ==================== End to End ====================

#[test]
fn test_parse_and_evaluate_against_record() {
    let f = factory();
    let tags = MemoryTagStore::new(["Genre", "Mood"]);
    tags.assign(3, "Mood", "Tense").unwrap();

    let plan = f
        .compile("(age >= 18 OR watched) AND mood ~= 'tense' AND title <> ''")
        .unwrap();
    let record = MapRecord::new()
        .with("handle", 3i64)
        .with("age", 21i64)
        .with("watched", false)
        .with("title", "Heat");
    assert!(plan.evaluate(&record, Some(&tags)).unwrap());

    let record = record.with("age", 12i64);
    assert!(!plan.evaluate(&record, Some(&tags)).unwrap());
}
