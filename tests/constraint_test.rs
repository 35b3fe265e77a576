//! Tests for deriving HTML validation attributes from schemas.

use formcast::{
    constraints_to_json, enable_type_coercion, get_constraints, ConstraintError, Schema,
    SchemaArena, SchemaId,
};
use serde_json::json;

fn signup_form(arena: &mut SchemaArena) -> SchemaId {
    let text = arena.add(
        Schema::string()
            .min_length(10)
            .max_length(100)
            .check(|_| false, "refine"),
    );
    let number = arena.add(
        Schema::number()
            .min_value(1)
            .max_value(10)
            .check(|v| v.as_f64().is_some_and(|n| n % 2.0 == 0.0), "step"),
    );
    let date = arena.add(Schema::date());
    let timestamp = arena.add(Schema::optional(date));
    let boolean = arena.add(Schema::boolean());
    let flag = arena.add(Schema::optional(boolean));
    let option = arena.add(Schema::enumeration(["a", "b", "c"]));
    let options = arena.add(Schema::array(option).min_length(3));
    let key = arena.add(Schema::string().check(|_| false, "refine"));
    let nested = arena.add(Schema::object([("key", key)]).check(|_| false, "refine"));
    let item = arena.add(Schema::object([("key", key)]).check(|_| false, "refine"));
    let list = arena.add(Schema::array(item).max_length(0));
    let blob = arena.add(Schema::blob());
    let files = arena.add(Schema::array(blob).min_length(1));
    let first = arena.add(Schema::string().min_length(3));
    let second = arena.add(Schema::number().max_value(100));
    let second = arena.add(Schema::optional(second));
    let tuple = arena.add(Schema::tuple([first, second]));

    arena.add(
        Schema::object([
            ("text", text),
            ("number", number),
            ("timestamp", timestamp),
            ("flag", flag),
            ("options", options),
            ("nested", nested),
            ("list", list),
            ("files", files),
            ("tuple", tuple),
        ])
        .check(|_| false, "refine"),
    )
}

fn signup_constraints() -> serde_json::Value {
    json!({
        "text": { "required": true, "minLength": 10, "maxLength": 100 },
        "number": { "required": true, "min": 1, "max": 10 },
        "timestamp": { "required": false },
        "flag": { "required": false },
        "options": { "required": true, "multiple": true },
        "options[]": { "required": true, "pattern": "a|b|c" },
        "files": { "required": true, "multiple": true },
        "files[]": { "required": true },
        "nested": { "required": true },
        "nested.key": { "required": true },
        "list": { "required": true, "multiple": true },
        "list[]": { "required": true },
        "list[].key": { "required": true },
        "tuple": { "required": true },
        "tuple[0]": { "required": true, "minLength": 3 },
        "tuple[1]": { "required": false, "max": 100 },
    })
}

#[test]
fn test_object_constraints() {
    let mut arena = SchemaArena::new();
    let form = signup_form(&mut arena);

    let constraints = get_constraints(&arena, form).unwrap();
    assert_eq!(constraints_to_json(&constraints), signup_constraints());
}

#[test]
fn test_coerced_schema_has_same_constraints() {
    let mut arena = SchemaArena::new();
    let form = signup_form(&mut arena);
    let coerced = enable_type_coercion(&mut arena, form);

    let constraints = get_constraints(&arena, coerced).unwrap();
    assert_eq!(constraints_to_json(&constraints), signup_constraints());
}

#[test]
fn test_non_object_roots_are_rejected() {
    let mut arena = SchemaArena::new();
    let string = arena.add(Schema::string());
    let list = arena.add(Schema::array(string));

    assert_eq!(
        get_constraints(&arena, string),
        Err(ConstraintError::UnsupportedSchema { kind: "string" })
    );
    assert_eq!(
        get_constraints(&arena, list),
        Err(ConstraintError::UnsupportedSchema { kind: "array" })
    );
}

#[test]
fn test_intersect_later_option_wins() {
    let mut arena = SchemaArena::new();
    let form = signup_form(&mut arena);
    let text = arena.add(Schema::string());
    let text = arena.add(Schema::optional(text));
    let something = arena.add(Schema::string());
    let extra = arena.add(Schema::object([("text", text), ("something", something)]));
    let both = arena.add(Schema::intersect([form, extra]));

    let mut expected = signup_constraints();
    expected["text"] = json!({ "required": false });
    expected["something"] = json!({ "required": true });

    let constraints = get_constraints(&arena, both).unwrap();
    assert_eq!(constraints_to_json(&constraints), expected);
}

fn alternatives(arena: &mut SchemaArena, variant: bool) -> SchemaId {
    let a = arena.add(Schema::literal("a"));
    let b = arena.add(Schema::literal("b"));
    let foo = arena.add(Schema::string().min_length(1));
    let bar = arena.add(Schema::string().min_length(1));
    let baz = arena.add(Schema::string().min_length(1));
    let qux = arena.add(Schema::string().min_length(1));

    let first = arena.add(Schema::object([("type", a), ("foo", foo), ("baz", baz)]));
    let second = arena.add(Schema::object([("type", b), ("bar", bar), ("baz", baz)]));
    let choice = if variant {
        arena.add(Schema::variant("type", [first, second]))
    } else {
        arena.add(Schema::union([first, second]))
    };
    let rest = arena.add(Schema::object([("qux", qux)]));
    arena.add(Schema::intersect([choice, rest]))
}

fn merged_alternatives() -> serde_json::Value {
    json!({
        "type": { "required": true },
        "foo": { "required": false, "minLength": 1 },
        "bar": { "required": false, "minLength": 1 },
        "baz": { "required": true, "minLength": 1 },
        "qux": { "required": true, "minLength": 1 },
    })
}

#[test]
fn test_union_alternatives_are_merged() {
    let mut arena = SchemaArena::new();
    let form = alternatives(&mut arena, false);

    let constraints = get_constraints(&arena, form).unwrap();
    assert_eq!(constraints_to_json(&constraints), merged_alternatives());
}

#[test]
fn test_variant_alternatives_are_merged() {
    let mut arena = SchemaArena::new();
    let form = alternatives(&mut arena, true);

    let constraints = get_constraints(&arena, form).unwrap();
    assert_eq!(constraints_to_json(&constraints), merged_alternatives());
}

#[test]
fn test_recursive_schema_terminates() {
    let mut arena = SchemaArena::new();
    let category = arena.declare();
    let name = arena.add(Schema::string());
    let subcategories = arena.add(Schema::array(category));
    arena.define(
        category,
        Schema::object([("name", name), ("subcategories", subcategories)]),
    );

    let constraints = get_constraints(&arena, category).unwrap();
    assert_eq!(
        constraints_to_json(&constraints),
        json!({
            "name": { "required": true },
            "subcategories": { "required": true, "multiple": true },
            "subcategories[]": { "required": true },
        })
    );
}
