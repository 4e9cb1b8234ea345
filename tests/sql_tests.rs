use std::collections::BTreeMap;

use querymatch::{
    BuilderContext, CompileError, Compiler, DEFAULT_MAX_DEPTH, Keyword, Operator, Scalar,
    SqlQuery, compile, compile_with_depth, parse_filter,
};
use serde_json::{Value, json};

fn sql(filter: Value) -> SqlQuery {
    let ops = parse_filter(&filter).unwrap();
    compile(&ops).unwrap()
}

fn params(pairs: Vec<(&str, Scalar)>) -> BTreeMap<String, Scalar> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn int(n: i64) -> Scalar {
    Scalar::Integer(n)
}

fn string(s: &str) -> Scalar {
    Scalar::String(s.to_string())
}

#[test]
fn test_simple_comparison() {
    let query = sql(json!({"num": {"$gt": 42}}));
    assert_eq!(query.text, "num > :num0");
    assert_eq!(query.params, params(vec![("num0", int(42))]));
}

#[test]
fn test_comparison_operators() {
    let cases = vec![
        (json!({"a": {"$eq": 1}}), "a = :a0"),
        (json!({"a": 1}), "a = :a0"),
        (json!({"a": {"$ne": 1}}), "a <> :a0"),
        (json!({"a": {"$gt": 1}}), "a > :a0"),
        (json!({"a": {"$gte": 1}}), "a >= :a0"),
        (json!({"a": {"$lt": 1}}), "a < :a0"),
        (json!({"a": {"$lte": 1}}), "a <= :a0"),
    ];

    for (filter, expected) in cases {
        let query = sql(filter);
        assert_eq!(query.text, expected);
        assert_eq!(query.params, params(vec![("a0", int(1))]));
    }
}

#[test]
fn test_in_binds_one_parameter_per_element() {
    let query = sql(json!({"tag": {"$in": ["x", "y", "z"]}}));
    assert_eq!(query.text, "tag IN (:tag0, :tag1, :tag2)");
    assert_eq!(
        query.params,
        params(vec![
            ("tag0", string("x")),
            ("tag1", string("y")),
            ("tag2", string("z")),
        ])
    );
}

#[test]
fn test_single_element_list_is_still_parenthesized() {
    assert_eq!(sql(json!({"tag": {"$in": ["x"]}})).text, "tag IN (:tag0)");
}

#[test]
fn test_not_in() {
    let query = sql(json!({"tag": {"$nin": [1, 2]}}));
    assert_eq!(query.text, "tag NOT IN (:tag0, :tag1)");
    assert_eq!(query.params, params(vec![("tag0", int(1)), ("tag1", int(2))]));
}

#[test]
fn test_empty_lists() {
    let query = sql(json!({"tag": {"$in": []}}));
    assert_eq!(query.text, "1 = 0");
    assert!(query.params.is_empty());

    assert_eq!(sql(json!({"tag": {"$nin": []}})).text, "1 = 1");
}

#[test]
fn test_implicit_and_under_field() {
    let query = sql(json!({"num": {"$gt": 1, "$lt": 5}}));
    assert_eq!(query.text, "((num > :num0) AND (num < :num1))");
    assert_eq!(query.params, params(vec![("num0", int(1)), ("num1", int(5))]));
}

#[test]
fn test_multiple_top_level_operators() {
    let query = sql(json!({"a": 1, "b": 2}));
    assert_eq!(query.text, "(a = :a0) AND (b = :b0)");
    assert_eq!(query.params, params(vec![("a0", int(1)), ("b0", int(2))]));
}

#[test]
fn test_or_at_root() {
    let query = sql(json!({"$or": [{"a": 1}, {"b": {"$lt": 3}}]}));
    assert_eq!(query.text, "((a = :a0) OR (b < :b0))");
}

#[test]
fn test_single_child_logical_is_not_double_wrapped() {
    assert_eq!(sql(json!({"$and": [{"a": 1}]})).text, "(a = :a0)");
}

#[test]
fn test_nested_logical_operators() {
    let query = sql(json!({"$and": [{"$or": [{"a": 1}, {"b": 2}]}, {"c": 3}]}));
    assert_eq!(
        query.text,
        "((((a = :a0) OR (b = :b0))) AND (c = :c0))"
    );
}

#[test]
fn test_not_under_field() {
    let query = sql(json!({"num": {"$not": {"$gt": 30}}}));
    assert_eq!(query.text, "not (num > :num0)");
    assert_eq!(query.params, params(vec![("num0", int(30))]));
}

#[test]
fn test_not_with_several_predicates() {
    assert_eq!(
        sql(json!({"$not": {"a": 1, "b": 2}})).text,
        "not ((a = :a0) AND (b = :b0))"
    );
}

#[test]
fn test_nor_is_rendered_as_negated_or() {
    assert_eq!(
        sql(json!({"num": {"$nor": [{"$lt": 10}, {"$gt": 40}]}})).text,
        "not ((num < :num0) OR (num > :num1))"
    );
    assert_eq!(sql(json!({"$nor": [{"a": 1}]})).text, "not (a = :a0)");
}

#[test]
fn test_empty_logical_operators() {
    assert_eq!(sql(json!({"$and": []})).text, "1 = 1");
    assert_eq!(sql(json!({"$or": []})).text, "1 = 0");
    assert_eq!(sql(json!({"$nor": []})).text, "not (1 = 0)");
}

#[test]
fn test_exists() {
    let query = sql(json!({"a": {"$exists": true}}));
    assert_eq!(query.text, "a IS NOT NULL");
    assert!(query.params.is_empty());

    assert_eq!(sql(json!({"a": {"$exists": false}})).text, "a IS NULL");
}

#[test]
fn test_nested_field_is_rejected() {
    let ops = parse_filter(&json!({"user": {"age": {"$gte": 18}}})).unwrap();
    assert_eq!(
        compile(&ops),
        Err(CompileError::NestedField {
            outer: "user".to_string(),
            inner: "age".to_string(),
        })
    );

    let ops = parse_filter(&json!({"a": {"$not": {"b": 1}}})).unwrap();
    assert!(matches!(compile(&ops), Err(CompileError::NestedField { .. })));
}

#[test]
fn test_counters_are_per_field() {
    let query = sql(json!({"$or": [{"a": 1}, {"a": 2}, {"b": 3}]}));
    assert_eq!(query.text, "((a = :a0) OR (a = :a1) OR (b = :b0))");
    assert_eq!(
        query.params,
        params(vec![("a0", int(1)), ("a1", int(2)), ("b0", int(3))])
    );
}

#[test]
fn test_colliding_stems_are_disambiguated() {
    let query = sql(json!({"a.b": 1, "a-b": 2}));
    assert_eq!(query.text, "(a.b = :ab0) AND (a-b = :ab1_0)");
    assert_eq!(query.params, params(vec![("ab0", int(1)), ("ab1_0", int(2))]));
}

#[test]
fn test_unusual_field_names() {
    assert_eq!(sql(json!({"!!": 1})).text, "!! = :p0n0");
    assert_eq!(sql(json!({"1st": 1})).text, "1st = :a1st0");
    assert_eq!(sql(json!({"user_id": 1})).text, "user_id = :userid0");
}

#[test]
fn test_parameter_values_keep_their_kind() {
    let query = sql(json!({"price": {"$lte": 9.5}, "name": "x", "active": true}));
    assert_eq!(
        query.params,
        params(vec![
            ("price0", Scalar::Float(9.5)),
            ("name0", string("x")),
            ("active0", Scalar::Boolean(true)),
        ])
    );
}

#[test]
fn test_value_operator_without_field() {
    assert_eq!(
        compile(&[Operator::Gt(int(1))]),
        Err(CompileError::MissingFieldContext(Keyword::Gt))
    );

    let ops = parse_filter(&json!({"$and": [{"$eq": 1}]})).unwrap();
    assert_eq!(
        compile(&ops),
        Err(CompileError::MissingFieldContext(Keyword::Eq))
    );

    let ops = parse_filter(&json!({"$exists": true})).unwrap();
    assert_eq!(
        compile(&ops),
        Err(CompileError::MissingFieldContext(Keyword::Exists))
    );
}

#[test]
fn test_depth_limit() {
    let mut op = Operator::Eq(int(1));
    for _ in 0..50 {
        op = Operator::negate(op);
    }
    let op = Operator::field("a", op);

    assert_eq!(
        compile_with_depth(std::slice::from_ref(&op), 10),
        Err(CompileError::DepthExceeded { max_depth: 10 })
    );
    assert!(compile_with_depth(std::slice::from_ref(&op), 51).is_ok());
    assert!(compile_with_depth(&[op], 50).is_err());
}

#[test]
fn test_no_operators() {
    let query = compile(&[]).unwrap();
    assert_eq!(query.text, "1 = 1");
    assert!(query.params.is_empty());
}

#[test]
fn test_compilation_is_deterministic() {
    let ops = parse_filter(&json!({
        "$or": [{"a.b": {"$in": [1, 2]}}, {"a-b": {"$not": {"$gt": 3}}}],
        "$and": [{"c": {"$exists": true}}]
    }))
    .unwrap();
    assert_eq!(compile(&ops).unwrap(), compile(&ops).unwrap());
}

#[test]
fn test_context_shared_across_compilations() {
    let ops = parse_filter(&json!({"a": 1})).unwrap();
    let mut ctx = BuilderContext::new();

    let first = Compiler::new(&mut ctx, DEFAULT_MAX_DEPTH).compile(&ops).unwrap();
    let second = Compiler::new(&mut ctx, DEFAULT_MAX_DEPTH).compile(&ops).unwrap();

    assert_eq!(first.text, "a = :a0");
    assert_eq!(second.text, "a = :a1");
}

#[test]
fn test_error_messages() {
    assert_eq!(
        CompileError::MissingFieldContext(Keyword::Gt).to_string(),
        "'$gt' has no field to compare against"
    );
    assert_eq!(
        CompileError::NestedField {
            outer: "a".to_string(),
            inner: "b".to_string(),
        }
        .to_string(),
        "field 'b' is bound inside field 'a'"
    );
}
