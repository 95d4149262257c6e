use mp_core::{
    Constructed, Converter, Diagnostic, Error, Field, NullSink, Parser, ParserOptions, Registry,
    Schema, SchemaDoc, Transform, UNPARSED_KEY, UNPARSED_PROPERTIES, transform_value,
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn quiet(schema: impl Into<Schema>) -> Parser {
    Parser::compile(schema, ParserOptions::suppressed())
}

fn collecting(schema: impl Into<Schema>) -> (Parser, Arc<Mutex<Vec<Diagnostic>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let parser = Parser::compile(schema, ParserOptions::default())
        .with_sink(move |d: &Diagnostic| sink.lock().unwrap().push(d.clone()));
    (parser, seen)
}

#[test]
fn nested_schema_and_empty_function_result() {
    let parser = quiet(vec![
        Field::new("context").transform(vec![Field::new("foo")]),
        Field::new("dog").function(|_| Ok(None)),
    ]);
    let out = parser
        .parse(&json!({ "context": { "foo": "bar" }, "dog": "cat" }))
        .unwrap();
    assert_eq!(Value::Object(out), json!({ "context": { "foo": "bar" } }));
}

#[test]
fn empty_payload_skips_every_field() {
    let parser = quiet(vec![Field::new("id").function(|_| {
        panic!("field applied to empty payload");
    })]);
    assert!(parser.parse(&json!("")).unwrap().is_empty());
    assert!(parser.parse_str("").unwrap().is_empty());
}

#[test]
fn string_payload_is_decoded() {
    let parser = quiet(vec![Field::new("@id").name("id").transform(Converter::Number)]);
    let out = parser.parse(&json!("{\"@id\":\"12\"}")).unwrap();
    assert_eq!(out["id"], json!(12));
}

#[test]
fn duplicate_output_key_fails() {
    let parser = quiet(vec![Field::new("id"), Field::new("id")]);
    let err = parser.parse(&json!({ "id": 5 })).unwrap_err();
    assert!(matches!(&err, Error::DuplicateField { name } if name == "id"));

    let parser = quiet(vec![Field::new("a").name("x"), Field::new("b").name("x")]);
    assert!(parser.parse(&json!({})).is_err());
}

#[test]
fn duplicate_key_with_absent_first_entry_fails() {
    let fields = vec![Field::new("a").name("x"), Field::new("b").name("x")];
    let tracked = Parser::compile(fields.clone(), ParserOptions::default()).with_sink(NullSink);
    for parser in [quiet(fields), tracked] {
        for payload in [json!({}), json!({ "b": 1 })] {
            let err = parser.parse(&payload).unwrap_err();
            assert!(matches!(&err, Error::DuplicateField { name } if name == "x"), "{payload}");
        }
    }
}

#[test]
fn missing_field_fails_before_output() {
    let parser = quiet(vec![
        Field::new("ok").function(|_| panic!("ran before validation")),
        Field::new(Vec::<String>::new()),
    ]);
    let err = parser.parse(&json!({ "ok": true, "fail": false })).unwrap_err();
    assert!(matches!(err, Error::MissingField { index: 1 }));
}

#[test]
fn non_object_payload_fails() {
    let parser = quiet(vec![Field::new("id")]);
    let err = parser.parse(&json!(5)).unwrap_err();
    assert!(matches!(err, Error::NotAnObject { found: "number" }));
    assert_eq!(err.kind(), mp_core::ErrorKind::Payload);
    assert!(parser.parse(&Value::Null).is_err());
}

#[test]
fn falsy_values_are_kept() {
    let parser = quiet(vec![
        Field::new("zero"),
        Field::new("no"),
        Field::new("empty"),
        Field::new("nothing"),
        Field::new("absent"),
    ]);
    let out = parser
        .parse(&json!({ "zero": 0, "no": false, "empty": "", "nothing": null }))
        .unwrap();
    assert_eq!(
        Value::Object(out),
        json!({ "zero": 0, "no": false, "empty": "", "nothing": null })
    );
}

#[test]
fn absent_value_skips_converters() {
    let parser = quiet(vec![
        Field::new("@count").name("count").transform(Converter::Number),
        Field::new("date.modified").name("dateModified").transform(Converter::Date),
    ]);
    assert!(parser.parse(&json!({})).unwrap().is_empty());
}

#[test]
fn function_may_default_absent_value() {
    let parser = quiet(vec![
        Field::new("@draft")
            .name("draft")
            .function(|v| Ok(Some(json!(v.is_some())))),
    ]);
    assert_eq!(parser.parse(&json!({})).unwrap()["draft"], json!(false));
}

#[test]
fn conversion_error_propagates() {
    let parser = quiet(vec![Field::new("@id").transform(Converter::Number)]);
    let err = parser.parse(&json!({ "@id": "55-55" })).unwrap_err();
    assert_eq!(err.kind(), mp_core::ErrorKind::Conversion);
}

#[test]
fn is_array_normalizes_cardinality() {
    let parser = quiet(vec![
        Field::new("tag")
            .name("tags")
            .array()
            .transform(vec![Field::new("@value").name("value")]),
        Field::new("missing").array(),
        Field::new("blank").array(),
    ]);
    let one = parser
        .parse(&json!({ "tag": { "@value": "a" }, "blank": "" }))
        .unwrap();
    assert_eq!(
        Value::Object(one),
        json!({ "tags": [{ "value": "a" }], "missing": [], "blank": [] })
    );
    let many = parser
        .parse(&json!({ "tag": [{ "@value": "a" }, { "@value": "b" }] }))
        .unwrap();
    assert_eq!(many["tags"], json!([{ "value": "a" }, { "value": "b" }]));
}

#[test]
fn array_transform_applies_per_element() {
    let value = json!({ "@id": 4 });
    let transform = Transform::from(vec![
        Field::new("@id")
            .name("ids")
            .array()
            .function(|v| Ok(v.and_then(Value::as_i64).map(|n| json!(n + 1)))),
    ]);
    let out = transform_value(Some(&value), &transform).unwrap();
    assert_eq!(out, Some(json!({ "ids": [5] })));
}

#[test]
fn text_node_paths_accept_both_encodings() {
    let parser = quiet(vec![Field::new(["title", "#text"]).name("title")]);
    let plain = parser.parse(&json!({ "title": "Home" })).unwrap();
    let wrapped = parser
        .parse(&json!({ "title": { "#text": "Home", "@lang": "en" } }))
        .unwrap();
    assert_eq!(plain["title"], json!("Home"));
    assert_eq!(wrapped["title"], json!("Home"));
}

#[test]
fn schema_preprocessor_runs_first() {
    let schema = Schema::new(vec![Field::new("context")]).with_preprocessor(|v| {
        Ok(v.get("envelope").cloned().unwrap_or(Value::Null))
    });
    let parser = quiet(schema);
    let out = parser
        .parse(&json!({ "envelope": { "context": "foo" } }))
        .unwrap();
    assert_eq!(out["context"], json!("foo"));
}

#[test]
fn construct_transform_selects_schema_by_discriminator() {
    let polymorphic = Field::new("item").construct_transform(|v| {
        let kind = v.and_then(|v| v.get("@type")).and_then(Value::as_str);
        Ok(match kind {
            Some("file") => Constructed::new(vec![
                Field::new("@type").name("type"),
                Field::new("size").transform(Converter::Number),
            ]),
            Some("page") => Constructed::new(vec![
                Field::new("@type").name("type"),
                Field::new("title"),
            ]),
            _ => Constructed::none(),
        })
    });
    let parser = quiet(vec![polymorphic]);
    let file = parser
        .parse(&json!({ "item": { "@type": "file", "size": "10" } }))
        .unwrap();
    assert_eq!(file["item"], json!({ "type": "file", "size": 10 }));
    let page = parser
        .parse(&json!({ "item": { "@type": "page", "title": "Home" } }))
        .unwrap();
    assert_eq!(page["item"], json!({ "type": "page", "title": "Home" }));
    let other = parser.parse(&json!({ "item": "raw" })).unwrap();
    assert_eq!(other["item"], json!("raw"));
}

#[test]
fn construct_transform_can_replace_value() {
    let parser = quiet(vec![Field::new("body").construct_transform(|v| {
        let unwrapped = v.and_then(|v| v.get("payload")).cloned().unwrap_or(Value::Null);
        Ok(Constructed::new(vec![Field::new("id").transform(Converter::Integer)])
            .with_value(unwrapped))
    })]);
    let out = parser
        .parse(&json!({ "body": { "payload": { "id": "7" } } }))
        .unwrap();
    assert_eq!(out["body"], json!({ "id": 7 }));
}

#[test]
fn unparsed_sibling_is_reported() {
    let (parser, seen) = collecting(vec![Field::new("ok")]);
    let payload = json!({ "ok": true, "fail": false });
    let out = parser.parse(&payload).unwrap();
    assert_eq!(out["ok"], json!(true));
    assert_eq!(out[UNPARSED_KEY], json!({ "fail": false }));

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event, UNPARSED_PROPERTIES);
    assert_eq!(events[0].unparsed, json!({ "fail": false }));
    assert_eq!(events[0].raw, payload);
}

#[test]
fn fully_covered_payload_reports_nothing() {
    let (parser, seen) = collecting(vec![Field::new("ok"), Field::new("fail")]);
    let out = parser.parse(&json!({ "ok": true, "fail": false })).unwrap();
    assert!(!out.contains_key(UNPARSED_KEY));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn unparsed_tracking_follows_nested_schemas() {
    let (parser, seen) = collecting(vec![
        Field::new("result").name("results").array().transform(vec![
            Field::new("id").transform(Converter::Number),
            Field::new("page"),
        ]),
        Field::new("summary").transform(vec![Field::new("@path").name("path")]),
    ]);
    let payload = json!({
        "result": [
            { "id": "1", "page": { "title": "a" }, "rank": "3" },
            { "id": "2", "page": { "title": "b" } }
        ],
        "summary": { "@path": "/", "@count": "2" },
        "@ranking": "adaptive"
    });
    let out = parser.parse(&payload).unwrap();
    assert_eq!(out["results"][1]["id"], json!(2));
    assert_eq!(
        out[UNPARSED_KEY],
        json!({
            "result": { "0": { "rank": "3" } },
            "summary": { "@count": "2" },
            "@ranking": "adaptive"
        })
    );
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn suppressed_parser_adds_no_diagnostics() {
    let parser = quiet(vec![Field::new("ok")]);
    let out = parser.parse(&json!({ "ok": true, "fail": false })).unwrap();
    assert!(!out.contains_key(UNPARSED_KEY));
}

#[test]
fn reserved_key_collision_is_a_schema_error() {
    let parser = Parser::compile(
        vec![Field::new("ok").name(UNPARSED_KEY)],
        ParserOptions::default(),
    )
    .with_sink(NullSink);
    let err = parser.parse(&json!({ "ok": 1, "extra": 2 })).unwrap_err();
    assert!(matches!(err, Error::DuplicateField { .. }));
}

#[test]
fn document_schema_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("search.json");
    std::fs::write(
        &path,
        r#"[
            { "field": "@count", "name": "count", "transform": "number" },
            { "field": "result", "name": "results", "isArray": true, "transform": [
                { "field": "id", "transform": "number" },
                { "field": "date.modified", "name": "dateModified", "transform": "date" },
                { "field": "tag", "name": "tags", "transform": "split-lines" }
            ]},
            { "field": "summary", "transform": {
                "preprocessor": "identity",
                "schema": [ { "field": "@path", "name": "path" } ]
            }}
        ]"#,
    )
    .unwrap();
    let schema = SchemaDoc::from_path(&path)
        .unwrap()
        .compile(&Registry::with_builtins())
        .unwrap();
    let parser = Parser::compile(schema, ParserOptions::default()).with_sink(NullSink);
    let out = parser
        .parse(&json!({
            "@count": "1",
            "result": {
                "id": "9",
                "date.modified": "Mon, 05 Oct 2015 18:44:27 GMT",
                "tag": "a\nb"
            },
            "summary": { "@path": "/docs" }
        }))
        .unwrap();
    assert_eq!(
        Value::Object(out),
        json!({
            "count": 1,
            "results": [{
                "id": 9,
                "dateModified": "2015-10-05T18:44:27+00:00",
                "tags": ["a", "b"]
            }],
            "summary": { "path": "/docs" }
        })
    );
}

#[test]
fn document_with_missing_field_fails_at_parse() {
    let schema = SchemaDoc::from_json(r#"[{ "field": "ok" }, { "feild": "fail" }]"#)
        .unwrap()
        .compile(&Registry::new())
        .unwrap();
    let err = quiet(schema)
        .parse(&json!({ "ok": true, "fail": false }))
        .unwrap_err();
    assert!(matches!(err, Error::MissingField { index: 1 }));
}

#[test]
fn document_nested_schema_without_preprocessor() {
    let schema = SchemaDoc::from_json(
        r#"[{ "field": "ctx", "transform": { "schema": [{ "field": "foo" }] } }]"#,
    )
    .unwrap()
    .compile(&Registry::new())
    .unwrap();
    let (parser, seen) = collecting(schema);
    let out = parser.parse(&json!({ "ctx": { "foo": "bar" } })).unwrap();
    assert_eq!(Value::Object(out), json!({ "ctx": { "foo": "bar" } }));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn document_constructor_by_name() {
    let mut registry = Registry::new();
    registry.register_constructor("by-type", |v| {
        Ok(match v.and_then(|v| v.get("@type")).and_then(Value::as_str) {
            Some("n") => Constructed::new(vec![Field::new("v").transform(Converter::Number)]),
            _ => Constructed::none(),
        })
    });
    let schema = SchemaDoc::from_json(r#"[{ "field": "x", "constructTransform": "by-type" }]"#)
        .unwrap()
        .compile(&registry)
        .unwrap();
    let out = quiet(schema)
        .parse(&json!({ "x": { "@type": "n", "v": "3" } }))
        .unwrap();
    assert_eq!(out["x"], json!({ "v": 3 }));
}

#[test]
fn parser_is_shared_across_threads() {
    let (parser, seen) = collecting(vec![
        Field::new("@id").name("id").transform(Converter::Number),
    ]);
    std::thread::scope(|s| {
        for i in 0..8 {
            let parser = &parser;
            s.spawn(move || {
                let out = parser
                    .parse(&json!({ "@id": i.to_string(), "extra": i }))
                    .unwrap();
                assert_eq!(out["id"], json!(i));
                assert_eq!(out[UNPARSED_KEY], json!({ "extra": i }));
            });
        }
    });
    assert_eq!(seen.lock().unwrap().len(), 8);
}

#[test]
fn validate_walks_nested_schemas() {
    let ok = Schema::new(vec![
        Field::new("a").transform(vec![Field::new("b"), Field::new("c")]),
    ]);
    assert!(ok.validate().is_ok());

    let dup = Schema::new(vec![
        Field::new("a").transform(vec![Field::new("b"), Field::new("c").name("b")]),
    ]);
    assert!(matches!(dup.validate(), Err(Error::DuplicateField { name }) if name == "b"));

    let missing = Schema::new(vec![Field::new("a"), Field::new(Vec::<String>::new())]);
    assert!(matches!(missing.validate(), Err(Error::MissingField { index: 1 })));
}
