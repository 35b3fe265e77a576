//! Tests for schemas with asynchronous checks.

use formcast::{
    parse, parse_async, FormData, ParseConfig, ParseError, Schema, SchemaArena, SchemaId,
    ValidationConfig, Validator, Value,
};
use serde_json::json;

fn signup(arena: &mut SchemaArena) -> SchemaId {
    let username = arena.add(
        Schema::string()
            .min_length(3)
            .error("Too short")
            .check_async(
                |value| Box::pin(async move { value.as_str() != Some("taken") }),
                "Username is taken",
            ),
    );
    let age = arena.add(Schema::number());
    arena.add(Schema::object([("username", username), ("age", age)]))
}

#[tokio::test]
async fn test_async_check_passes() {
    let mut arena = SchemaArena::new();
    let schema = signup(&mut arena);
    let form: FormData = [("username", "ada"), ("age", "36")].into_iter().collect();

    let submission = parse_async(&arena, &form, &ParseConfig::new(schema)).await.unwrap();
    assert_eq!(
        submission.value().map(Value::to_json),
        Some(json!({ "username": "ada", "age": 36 }))
    );
}

#[tokio::test]
async fn test_async_check_fails() {
    let mut arena = SchemaArena::new();
    let schema = signup(&mut arena);
    let form: FormData = [("username", "taken"), ("age", "x")].into_iter().collect();

    let submission = parse_async(&arena, &form, &ParseConfig::new(schema)).await.unwrap();
    let error = submission.error().unwrap();
    assert_eq!(error["username"], vec!["Username is taken"]);
    assert_eq!(error["age"], vec!["Invalid type: Expected number but received NaN"]);
}

#[tokio::test]
async fn test_async_check_skipped_after_pipe_issue() {
    let mut arena = SchemaArena::new();
    let schema = signup(&mut arena);
    let form: FormData = [("username", "ab"), ("age", "1")].into_iter().collect();

    let config = ParseConfig::new(schema).with_info(ValidationConfig::new().abort_pipe_early(true));
    let submission = parse_async(&arena, &form, &config).await.unwrap();
    assert_eq!(submission.error().unwrap()["username"], vec!["Too short"]);
}

#[tokio::test]
async fn test_abort_early_stops_before_async_checks() {
    let mut arena = SchemaArena::new();
    let schema = signup(&mut arena);
    let form: FormData = [("username", "taken"), ("age", "")].into_iter().collect();

    let config = ParseConfig::new(schema).with_info(ValidationConfig::new().abort_early(true));
    let submission = parse_async(&arena, &form, &config).await.unwrap();
    let error = submission.error().unwrap();
    assert_eq!(error.len(), 1);
    assert!(error.contains_key("age"));
}

#[test]
fn test_sync_parse_rejects_async_schema() {
    let mut arena = SchemaArena::new();
    let schema = signup(&mut arena);

    assert_eq!(
        parse(&arena, &FormData::new(), &ParseConfig::new(schema)),
        Err(ParseError::AsyncSchema)
    );
}

#[test]
fn test_sync_validator_reports_deferred_checks() {
    let mut arena = SchemaArena::new();
    let name = arena.add(
        Schema::string().check_async(|_| Box::pin(async { true }), "unused"),
    );
    let validator = Validator::new(&arena, ValidationConfig::default());

    let issues = validator
        .safe_parse(name, &Value::from("ada"))
        .into_result()
        .unwrap_err();
    assert_eq!(issues.first().code, "async");
}
