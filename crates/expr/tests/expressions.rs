//! Language-level behaviour: parsing plus evaluation through a full
//! context chain.

use std::collections::BTreeMap;

use herald_expr::{
    evaluate, CachingContext, EmptyContext, ErrorKind, EventContext, EventData,
    InMemoryUserAttributes, MetaContext, NativeAttributeContext, NativeAttributes,
    UserAttributeContext, Value,
};
use serde_json::json;

fn eval(src: &str) -> Result<Value, herald_expr::ExprError> {
    evaluate(src, &mut EmptyContext)
}

// ──────────────────────────────────────────────
// Equality and literals
// ──────────────────────────────────────────────

#[test]
fn equality_is_reflexive_for_scalars() {
    for literal in ["nil", "true", "false", "0", "-12.5", r#""""#, r#""text""#] {
        let src = format!("(= {} {})", literal, literal);
        assert_eq!(eval(&src), Ok(Value::Bool(true)), "{}", src);
    }
    assert_eq!(eval("(=)"), Ok(Value::Bool(true)));
}

#[test]
fn equality_between_kinds_is_false() {
    assert_eq!(eval(r#"(= 1 "1")"#), Ok(Value::Bool(false)));
    assert_eq!(eval("(= nil false)"), Ok(Value::Bool(false)));
    assert_eq!(eval(r#"(= "a" ["a"])"#), Ok(Value::Bool(false)));
}

#[test]
fn set_literals_compare_by_members() {
    assert_eq!(eval(r#"(= ["a" "b" "a"] ["b" "a"])"#), Ok(Value::Bool(true)));
}

// ──────────────────────────────────────────────
// Documented examples
// ──────────────────────────────────────────────

#[test]
fn if_examples() {
    assert_eq!(eval("(if true 2 1)"), Ok(Value::Number(2.0)));
    assert_eq!(eval("(if false true false)"), Ok(Value::Bool(false)));
    let err = eval("(if 2 true)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::EvalError);
}

#[test]
fn contains_examples() {
    assert_eq!(
        eval(r#"(contains ["foo"] ["foo" "bar"])"#),
        Ok(Value::Bool(true))
    );
    assert_eq!(eval(r#"(contains ["lorem"] nil)"#), Ok(Value::Bool(false)));
}

#[test]
fn casts_compose() {
    assert_eq!(
        eval(r#"(= (write-to-string (parse-string "42")) "42")"#),
        Ok(Value::Bool(true))
    );
    assert_eq!(eval("(write-to-string nil)"), Ok(Value::Nil));
    assert_eq!(
        eval(r#"(upper ["a" "b"])"#),
        Ok(Value::set(["A", "B"]))
    );
}

#[test]
fn parse_errors_are_reported_as_parse_errors() {
    for src in ["(= 1", "= 1 1", r#"(= "open 1)"#, "(= `x 1)", "", "(= 1) (= 2)"] {
        let err = eval(src).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError, "{:?}", src);
    }
}

// ──────────────────────────────────────────────
// Context chain
// ──────────────────────────────────────────────

#[test]
fn full_chain_resolves_each_namespace() {
    let event = EventData::new("PURCHASE")
        .with_label("cart")
        .with_attribute("total", json!(99.0));
    let native = NativeAttributes {
        platform: Some("android".into()),
        ..Default::default()
    };
    let mut user = InMemoryUserAttributes::new();
    user.set_number("age", 40.0);
    user.add_tag("segments", "vip");

    let chain = MetaContext::new()
        .with(EventContext::new(&event))
        .with(NativeAttributeContext::new(&native))
        .with(UserAttributeContext::new(&user));
    let mut ctx = CachingContext::new(chain);

    let rule = r#"(and
        (= `e.name` "PURCHASE")
        (= `e.label` "cart")
        (> `e.attr['TOTAL']` 50)
        (= `b.platform` "android")
        (>= `c.age` 18)
        (contains "vip" `t.segments`))"#;
    assert_eq!(evaluate(rule, &mut ctx), Ok(Value::Bool(true)));
}

#[test]
fn missing_values_behave_as_nil() {
    let mut vars: BTreeMap<String, Value> = BTreeMap::new();
    assert_eq!(
        evaluate("(contains \"x\" `t.unknown`)", &mut vars),
        Ok(Value::Bool(false))
    );
    assert_eq!(evaluate("(and `c.flag`)", &mut vars), Ok(Value::Bool(false)));
    let err = evaluate("(> `c.age` 18)", &mut vars).unwrap_err();
    assert_eq!(err.kind, ErrorKind::EvalError);
}
