use super::*;
use crate::backend::ObjectRepository;
use crate::error::SearchError;
use crate::lucene;
use crate::model::{
    AttributeDefinition, AttributePermission, Capability, Group, ObjectKind, ObjectPosition, User,
};
use crate::predicate::{CmpOp, Operand, Predicate, Value, DATETIME_FORMAT};
use crate::principal::Principal;
use crate::schema::*;
use crate::SortMode;
use chrono::NaiveDateTime;
use rusqlite::types::Value as SqlValue;

/// In-memory lookups backing the compiler tests.
#[derive(Default)]
struct FakeRepository {
    groups: Vec<Group>,
    users: Vec<User>,
    attributes: Vec<AttributeDefinition>,
    /// dhash, owning group, position
    objects: Vec<(String, i64, ObjectPosition)>,
}

impl ObjectRepository for FakeRepository {
    fn group_by_name(&self, name: &str) -> Result<Option<Group>, SearchError> {
        Ok(self.groups.iter().find(|g| g.name == name).cloned())
    }

    fn user_by_login(&self, login: &str) -> Result<Option<User>, SearchError> {
        Ok(self.users.iter().find(|u| u.login == login).cloned())
    }

    fn attribute_definition(&self, key: &str) -> Result<Option<AttributeDefinition>, SearchError> {
        Ok(self.attributes.iter().find(|a| a.key == key).cloned())
    }

    fn object_position(
        &self,
        dhash: &str,
        principal: &Principal,
    ) -> Result<Option<ObjectPosition>, SearchError> {
        Ok(self
            .objects
            .iter()
            .find(|(hash, group, _)| {
                hash == dhash
                    && (principal.has_capability(Capability::AccessAllObjects)
                        || principal.is_member_of(*group))
            })
            .map(|(_, _, position)| *position))
    }
}

fn group(id: i64, name: &str) -> Group {
    Group {
        id,
        name: name.to_string(),
    }
}

fn readable_by(group_id: i64) -> Vec<AttributePermission> {
    vec![AttributePermission {
        group_id,
        can_read: true,
        can_set: false,
    }]
}

fn attribute(key: &str, hidden: bool, permissions: Vec<AttributePermission>) -> AttributeDefinition {
    AttributeDefinition {
        key: key.to_string(),
        label: key.to_string(),
        url_template: None,
        hidden,
        permissions,
    }
}

fn at(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).unwrap()
}

fn repository() -> FakeRepository {
    FakeRepository {
        groups: vec![
            group(1, "public"),
            group(10, "alice"),
            group(11, "analysts"),
            group(20, "bob"),
        ],
        users: vec![
            User {
                id: 1,
                login: "alice".to_string(),
            },
            User {
                id: 2,
                login: "bob".to_string(),
            },
        ],
        attributes: vec![
            attribute("malware_family", false, readable_by(11)),
            attribute("secret_key", false, readable_by(99)),
            attribute("hidden_ref", true, readable_by(11)),
        ],
        objects: vec![(
            "abc".to_string(),
            11,
            ObjectPosition {
                id: 5,
                upload_time: at("2021-01-01 12:00:00"),
            },
        )],
    }
}

fn alice() -> Principal {
    Principal::new(1, "alice")
        .with_group(group(10, "alice"))
        .with_group(group(11, "analysts"))
}

fn admin() -> Principal {
    Principal::new(3, "admin")
        .with_group(group(30, "admin"))
        .with_capability(Capability::ManageUsers)
        .with_capability(Capability::ReadingAllAttributes)
        .with_capability(Capability::AccessAllObjects)
}

/// Compiles only the query condition, without type, access or pivot parts.
fn condition(query: &str, principal: &Principal) -> Result<(Predicate, Binding), SearchError> {
    let repo = repository();
    let tree = lucene::parse(query)?;
    QueryCompiler::new(principal, &repo).compile(&tree, None)
}

fn predicate(query: &str) -> Predicate {
    condition(query, &alice()).unwrap().0
}

fn compile(query: &str, principal: &Principal, options: &SearchOptions) -> Result<QueryPlan, SearchError> {
    compile_query(query, principal, &repository(), options)
}

fn count_params(sql: &str) -> usize {
    sql.matches('?').count()
}

fn tag_is(value: &str) -> Predicate {
    Predicate::exists(&TAGS, OBJECT_ID, Predicate::eq(TAG_VALUE, Value::text(value)))
}

fn alice_access() -> Predicate {
    Predicate::exists(
        &PERMISSIONS,
        OBJECT_ID,
        Predicate::InList {
            operand: Operand::Column(PERMISSION_GROUP),
            values: vec![Value::Integer(10), Value::Integer(11)],
        },
    )
}

// Field resolution

#[test]
fn test_resolve_prefixed_field() {
    let resolved = resolve("file.name", None).unwrap();
    assert_eq!(resolved.kind, ObjectKind::File);
    assert_eq!(
        resolved.field,
        &FieldKind::Direct {
            column: FILE_NAME,
            column_type: ColumnType::Text
        }
    );
    assert!(resolved.residual.is_empty());
}

#[test]
fn test_resolve_is_deterministic() {
    for path in ["file.name", "tag", "static.cfg.urls.main", "meta.family", "blob.size"] {
        assert_eq!(resolve(path, None).unwrap(), resolve(path, None).unwrap());
    }
}

#[test]
fn test_resolve_bare_field_uses_binding() {
    let file = resolve("name", Some(ObjectKind::File)).unwrap();
    assert_eq!(
        file.field,
        &FieldKind::Direct {
            column: FILE_NAME,
            column_type: ColumnType::Text
        }
    );
    let blob = resolve("name", Some(ObjectKind::TextBlob)).unwrap();
    assert_eq!(
        blob.field,
        &FieldKind::Direct {
            column: BLOB_NAME,
            column_type: ColumnType::Text
        }
    );
    assert!(matches!(
        resolve("name", None),
        Err(SearchError::FieldNotQueryable { .. })
    ));
}

#[test]
fn test_resolve_object_fields_inherited() {
    let resolved = resolve("file.tag", None).unwrap();
    assert_eq!(resolved.kind, ObjectKind::File);
    assert!(matches!(resolved.field, FieldKind::List { .. }));

    let entry = lookup(ObjectKind::TextBlob, "upload_time").unwrap();
    assert_eq!(entry.kind, ObjectKind::Object);
}

#[test]
fn test_resolve_json_path() {
    let resolved = resolve("static.cfg.urls.main", None).unwrap();
    assert_eq!(resolved.kind, ObjectKind::Config);
    assert_eq!(resolved.field, &FieldKind::Json { column: CONFIG_CFG });
    assert_eq!(resolved.residual, vec!["urls".to_string(), "main".to_string()]);
}

#[test]
fn test_resolve_attribute_key() {
    let resolved = resolve("meta.malware_family.version", None).unwrap();
    assert_eq!(resolved.kind, ObjectKind::Object);
    assert_eq!(resolved.field, &FieldKind::Attribute);
    assert_eq!(
        resolved.residual,
        vec!["malware_family".to_string(), "version".to_string()]
    );
}

#[test]
fn test_resolve_rejects_subfields_on_plain_field() {
    match resolve("file.name.extra", None) {
        Err(SearchError::FieldNotQueryable { message }) => {
            assert_eq!(message, "Field 'name' doesn't have subfields");
        }
        other => panic!("Expected FieldNotQueryable, got {:?}", other),
    }
}

#[test]
fn test_resolve_rejects_malformed_paths() {
    for path in ["meta", "file", "file..name", "file.unknown", ".tag"] {
        assert!(
            matches!(resolve(path, None), Err(SearchError::FieldNotQueryable { .. })),
            "{} should not resolve",
            path
        );
    }
}

// Binding

#[test]
fn test_bind_generic_is_compatible() {
    assert_eq!(bind(None, ObjectKind::Object).unwrap(), Some(ObjectKind::Object));
    assert_eq!(
        bind(Some(ObjectKind::Object), ObjectKind::File).unwrap(),
        Some(ObjectKind::File)
    );
    assert_eq!(
        bind(Some(ObjectKind::File), ObjectKind::Object).unwrap(),
        Some(ObjectKind::File)
    );
    assert!(matches!(
        bind(Some(ObjectKind::File), ObjectKind::Config),
        Err(SearchError::MultipleObjectsQuery { .. })
    ));
}

#[test]
fn test_conflicting_kinds_rejected() {
    match condition("file.name:a AND static.family:b", &alice()) {
        Err(SearchError::MultipleObjectsQuery { message }) => {
            assert_eq!(message, "Can't search for file and config objects in the same query");
        }
        other => panic!("Expected MultipleObjectsQuery, got {:?}", other),
    }
    assert!(matches!(
        condition("(file.name:a OR blob.name:b)", &alice()),
        Err(SearchError::MultipleObjectsQuery { .. })
    ));
}

#[test]
fn test_generic_fields_mix_with_concrete() {
    let (_, binding) = condition("file.name:a AND tag:x", &alice()).unwrap();
    assert_eq!(binding, Some(ObjectKind::File));
    let (_, binding) = condition("tag:x AND file.name:a", &alice()).unwrap();
    assert_eq!(binding, Some(ObjectKind::File));
    let (_, binding) = condition("tag:x", &alice()).unwrap();
    assert_eq!(binding, Some(ObjectKind::Object));
}

#[test]
fn test_binding_carries_to_unprefixed_fields() {
    let pred = predicate("file.name:a AND size:[1 TO 2]");
    assert_eq!(
        pred,
        Predicate::And(vec![
            Predicate::eq(FILE_NAME, Value::text("a")),
            Predicate::And(vec![
                Predicate::compare(FILE_SIZE, CmpOp::Ge, Value::Integer(1)),
                Predicate::compare(FILE_SIZE, CmpOp::Le, Value::Integer(2)),
            ]),
        ])
    );
}

#[test]
fn test_options_kind_restricts_query() {
    let options = SearchOptions::for_kind(ObjectKind::Config);
    assert!(matches!(
        compile("file.name:a", &alice(), &options),
        Err(SearchError::MultipleObjectsQuery { .. })
    ));
    let plan = compile("family:emotet", &alice(), &options).unwrap();
    assert_eq!(plan.kind, ObjectKind::Config);
}

// Value normalization

#[test]
fn test_sql_wildcards_in_phrase_are_literal() {
    assert_eq!(
        predicate(r#"file.name:"100%_done""#),
        Predicate::eq(FILE_NAME, Value::text("100%_done"))
    );
}

#[test]
fn test_lucene_wildcard_becomes_like() {
    assert_eq!(
        predicate("file.name:report*"),
        Predicate::Like {
            operand: Operand::Column(FILE_NAME),
            pattern: "report%".to_string(),
        }
    );
}

#[test]
fn test_escaped_wildcard_is_exact() {
    assert_eq!(
        predicate(r"file.name:what\?"),
        Predicate::eq(FILE_NAME, Value::text("what?"))
    );
}

#[test]
fn test_list_field_matches_any_row() {
    assert_eq!(predicate("tag:trojan"), tag_is("trojan"));
    assert_eq!(
        predicate("file.alt_name:*.dll"),
        Predicate::exists(
            &ALT_NAMES,
            OBJECT_ID,
            Predicate::Like {
                operand: Operand::Column(ALT_NAME_VALUE),
                pattern: "%.dll".to_string(),
            }
        )
    );
}

#[test]
fn test_field_group_applies_field_to_each_term() {
    assert_eq!(
        predicate("tag:(trojan OR dropper)"),
        Predicate::Or(vec![tag_is("trojan"), tag_is("dropper")])
    );
}

// Boolean structure

#[test]
fn test_not_and_prohibit_are_equivalent() {
    assert_eq!(predicate("NOT tag:x"), predicate("-tag:x"));
    assert_eq!(predicate("!tag:x"), tag_is("x").negate());
}

#[test]
fn test_implicit_and() {
    assert_eq!(
        predicate("tag:a tag:b"),
        Predicate::And(vec![tag_is("a"), tag_is("b")])
    );
}

#[test]
fn test_unsupported_nodes_rejected() {
    for query in [
        "file.name:abc~2",
        "file.name:abc^2",
        "+file.name:abc",
        "file.name:/ab.*/",
        r#"file.name:"a b"~3"#,
    ] {
        match condition(query, &alice()) {
            Err(SearchError::UnsupportedGrammar { message }) => {
                assert!(message.ends_with(" is not supported"), "{}", message);
            }
            other => panic!("{}: expected UnsupportedGrammar, got {:?}", query, other),
        }
    }
}

#[test]
fn test_term_without_field_rejected() {
    match condition("trojan", &alice()) {
        Err(SearchError::FieldNotQueryable { message }) => {
            assert_eq!(message, "You must specify a field");
        }
        other => panic!("Expected FieldNotQueryable, got {:?}", other),
    }
}

// Ranges

#[test]
fn test_integer_range_bounds() {
    assert_eq!(
        predicate("file.size:[100 TO 200}"),
        Predicate::And(vec![
            Predicate::compare(FILE_SIZE, CmpOp::Ge, Value::Integer(100)),
            Predicate::compare(FILE_SIZE, CmpOp::Lt, Value::Integer(200)),
        ])
    );
    assert_eq!(
        predicate("file.size:{100 TO *]"),
        Predicate::compare(FILE_SIZE, CmpOp::Gt, Value::Integer(100))
    );
}

#[test]
fn test_integer_field_rejects_text() {
    assert!(matches!(
        condition("file.size:big", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
}

#[test]
fn test_range_on_text_field_rejected() {
    assert!(matches!(
        condition("file.name:[a TO b]", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
    assert!(matches!(
        condition("tag:[a TO b]", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
}

#[test]
fn test_date_term_expands_to_day() {
    assert_eq!(
        predicate("upload_time:2021-01-01"),
        Predicate::And(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Ge, Value::DateTime(at("2021-01-01 00:00:00"))),
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Lt, Value::DateTime(at("2021-01-02 00:00:00"))),
        ])
    );
}

#[test]
fn test_date_phrase_expands_to_minute() {
    assert_eq!(
        predicate(r#"upload_time:"2021-01-01 10:30""#),
        Predicate::And(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Ge, Value::DateTime(at("2021-01-01 10:30:00"))),
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Lt, Value::DateTime(at("2021-01-01 10:31:00"))),
        ])
    );
}

#[test]
fn test_date_range_covers_upper_day() {
    assert_eq!(
        predicate("upload_time:[2021-01-01 TO 2021-01-31]"),
        Predicate::And(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Ge, Value::DateTime(at("2021-01-01 00:00:00"))),
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Lt, Value::DateTime(at("2021-02-01 00:00:00"))),
        ])
    );
    assert_eq!(
        predicate("blob.last_seen:[* TO 2021-01-31]"),
        Predicate::compare(BLOB_LAST_SEEN, CmpOp::Lt, Value::DateTime(at("2021-02-01 00:00:00")))
    );
}

#[test]
fn test_range_endpoints_are_unescaped() {
    assert_eq!(
        predicate(r"upload_time:[2021-01-01T10\:00 TO 2021-01-01T10\:30]"),
        Predicate::And(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Ge, Value::DateTime(at("2021-01-01 10:00:00"))),
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Lt, Value::DateTime(at("2021-01-01 10:31:00"))),
        ])
    );
    assert_eq!(
        predicate(r"file.size:[\100 TO \200]"),
        Predicate::And(vec![
            Predicate::compare(FILE_SIZE, CmpOp::Ge, Value::Integer(100)),
            Predicate::compare(FILE_SIZE, CmpOp::Le, Value::Integer(200)),
        ])
    );
}

#[test]
fn test_date_exclusive_range_rejected() {
    for query in [
        "upload_time:{2021-01-01 TO 2021-01-31]",
        "upload_time:[2021-01-01 TO 2021-01-31}",
    ] {
        assert!(
            matches!(condition(query, &alice()), Err(SearchError::UnsupportedGrammar { .. })),
            "{} should be rejected",
            query
        );
    }
}

#[test]
fn test_date_wildcard_rejected() {
    assert!(matches!(
        condition("upload_time:2021-01-*", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
}

// JSON documents

#[test]
fn test_json_leaf_comparison() {
    assert_eq!(
        predicate("static.cfg.urls.main:*evil.com*"),
        Predicate::Like {
            operand: Operand::JsonText {
                column: CONFIG_CFG,
                path: r#"$."urls"."main""#.to_string(),
            },
            pattern: "%evil.com%".to_string(),
        }
    );
}

#[test]
fn test_json_range_is_string_ordered_with_or_equality() {
    // Inclusive endpoints become `> OR =`, compared as text, so "8080" lies
    // inside [80 TO 90]. Kept as is; numeric JSON ranges are not supported.
    let operand = Operand::JsonText {
        column: CONFIG_CFG,
        path: r#"$."port""#.to_string(),
    };
    assert_eq!(
        predicate("static.cfg.port:[80 TO 90]"),
        Predicate::And(vec![
            Predicate::Or(vec![
                Predicate::compare(operand.clone(), CmpOp::Gt, Value::text("80")),
                Predicate::eq(operand.clone(), Value::text("80")),
            ]),
            Predicate::Or(vec![
                Predicate::compare(operand.clone(), CmpOp::Lt, Value::text("90")),
                Predicate::eq(operand, Value::text("90")),
            ]),
        ])
    );
}

// Attributes

fn attribute_is(key: &str, value: Predicate) -> Predicate {
    Predicate::exists(
        &ATTRIBUTES,
        OBJECT_ID,
        Predicate::And(vec![Predicate::eq(ATTRIBUTE_KEY, Value::text(key)), value]),
    )
}

#[test]
fn test_readable_attribute() {
    let value = Operand::JsonText {
        column: ATTRIBUTE_VALUE,
        path: "$".to_string(),
    };
    assert_eq!(
        predicate("meta.malware_family:emotet"),
        attribute_is("malware_family", Predicate::eq(value, Value::text("emotet")))
    );
}

#[test]
fn test_attribute_subpath() {
    let value = Operand::JsonText {
        column: ATTRIBUTE_VALUE,
        path: r#"$."version""#.to_string(),
    };
    assert_eq!(
        predicate("attribute.malware_family.version:2"),
        attribute_is("malware_family", Predicate::eq(value, Value::text("2")))
    );
}

#[test]
fn test_unreadable_attribute_looks_missing() {
    let unreadable = condition("meta.secret_key:x", &alice()).unwrap_err();
    let missing = condition("meta.no_such_key:x", &alice()).unwrap_err();
    match (&unreadable, &missing) {
        (
            SearchError::ObjectNotFound { message: a },
            SearchError::ObjectNotFound { message: b },
        ) => {
            assert_eq!(a, "No such attribute: secret_key");
            assert_eq!(b, "No such attribute: no_such_key");
        }
        other => panic!("Expected ObjectNotFound twice, got {:?}", other),
    }
    assert_eq!(unreadable.error_code(), missing.error_code());
}

#[test]
fn test_reading_all_attributes_overrides_permissions() {
    assert!(condition("meta.secret_key:x", &admin()).is_ok());
}

#[test]
fn test_hidden_attribute_rejects_wildcards() {
    assert!(condition("meta.hidden_ref:abc", &alice()).is_ok());
    for principal in [alice(), admin()] {
        match condition("meta.hidden_ref:abc*", &principal) {
            Err(SearchError::FieldNotQueryable { message }) => {
                assert_eq!(message, "Wildcards are not allowed for hidden attributes");
            }
            other => panic!("Expected FieldNotQueryable, got {:?}", other),
        }
    }
}

#[test]
fn test_attribute_range_rejected() {
    assert!(matches!(
        condition("meta.malware_family:[a TO b]", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
}

// Sharing relations

#[test]
fn test_shared_with_own_group() {
    assert_eq!(
        predicate("shared:analysts"),
        Predicate::exists(
            &PERMISSIONS,
            OBJECT_ID,
            Predicate::eq(PERMISSION_GROUP, Value::Integer(11))
        )
    );
}

#[test]
fn test_shared_with_foreign_group_looks_missing() {
    for name in ["bob", "nobody"] {
        match condition(&format!("shared:{}", name), &alice()) {
            Err(SearchError::ObjectNotFound { message }) => {
                assert_eq!(message, format!("No such group: {}", name));
            }
            other => panic!("Expected ObjectNotFound, got {:?}", other),
        }
    }
    assert!(condition("shared:bob", &admin()).is_ok());
}

#[test]
fn test_uploader_self() {
    assert_eq!(
        predicate("uploader:alice"),
        Predicate::exists(
            &PERMISSIONS,
            OBJECT_ID,
            Predicate::And(vec![
                Predicate::eq(PERMISSION_USER, Value::Integer(1)),
                Predicate::eq(PERMISSION_REASON, Value::text("added")),
            ])
        )
    );
}

#[test]
fn test_uploader_requires_manage_users_for_others() {
    match condition("uploader:bob", &alice()) {
        Err(SearchError::ObjectNotFound { message }) => assert_eq!(message, "No such user: bob"),
        other => panic!("Expected ObjectNotFound, got {:?}", other),
    }
    assert!(condition("uploader:bob", &admin()).is_ok());
    assert!(matches!(
        condition("uploader:ghost", &admin()),
        Err(SearchError::ObjectNotFound { .. })
    ));
}

#[test]
fn test_relation_fields_reject_wildcards() {
    assert!(matches!(
        condition("uploader:al*", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
    assert!(matches!(
        condition("shared:ana*", &alice()),
        Err(SearchError::UnsupportedGrammar { .. })
    ));
}

// Plans

#[test]
fn test_plan_for_file_query() {
    let plan = compile("file.type:PE32* AND tag:trojan", &alice(), &SearchOptions::default()).unwrap();
    assert_eq!(plan.kind, ObjectKind::File);
    assert_eq!(plan.limit, DEFAULT_LIMIT);
    assert_eq!(plan.sort_by, SortMode::Newest);
    assert_eq!(
        plan.predicate,
        Predicate::And(vec![
            Predicate::eq(OBJECT_TYPE, Value::text("file")),
            Predicate::And(vec![
                Predicate::Like {
                    operand: Operand::Column(FILE_TYPE),
                    pattern: "PE32%".to_string(),
                },
                tag_is("trojan"),
            ]),
            alice_access(),
        ])
    );
}

#[test]
fn test_plan_for_generic_query_has_no_type_filter() {
    let plan = compile("tag:trojan", &admin(), &SearchOptions::default()).unwrap();
    assert_eq!(plan.kind, ObjectKind::Object);
    assert_eq!(
        plan.predicate,
        Predicate::And(vec![tag_is("trojan"), Predicate::Const(true)])
    );
}

#[test]
fn test_plan_with_older_than_pivot() {
    let options = SearchOptions {
        older_than: Some("abc".to_string()),
        ..SearchOptions::default()
    };
    let plan = compile("tag:x", &alice(), &options).unwrap();
    let time = Value::DateTime(at("2021-01-01 12:00:00"));
    let Predicate::And(parts) = plan.predicate else {
        panic!("Expected AND predicate");
    };
    assert_eq!(
        parts.last(),
        Some(&Predicate::Or(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Lt, time.clone()),
            Predicate::And(vec![
                Predicate::eq(OBJECT_UPLOAD_TIME, time),
                Predicate::compare(OBJECT_ID, CmpOp::Lt, Value::Integer(5)),
            ]),
        ]))
    );
}

#[test]
fn test_oldest_first_pivot_moves_forward() {
    let options = SearchOptions {
        older_than: Some("abc".to_string()),
        sort_by: SortMode::Oldest,
        ..SearchOptions::default()
    };
    let plan = compile("tag:x", &alice(), &options).unwrap();
    let time = Value::DateTime(at("2021-01-01 12:00:00"));
    let Predicate::And(parts) = plan.predicate else {
        panic!("Expected AND predicate");
    };
    assert_eq!(
        parts.last(),
        Some(&Predicate::Or(vec![
            Predicate::compare(OBJECT_UPLOAD_TIME, CmpOp::Gt, time.clone()),
            Predicate::And(vec![
                Predicate::eq(OBJECT_UPLOAD_TIME, time),
                Predicate::compare(OBJECT_ID, CmpOp::Gt, Value::Integer(5)),
            ]),
        ]))
    );
}

#[test]
fn test_older_than_unknown_or_invisible_pivot() {
    let options = SearchOptions {
        older_than: Some("zzz".to_string()),
        ..SearchOptions::default()
    };
    match compile("tag:x", &alice(), &options) {
        Err(SearchError::ObjectNotFound { message }) => assert_eq!(message, "No such object: zzz"),
        other => panic!("Expected ObjectNotFound, got {:?}", other),
    }

    let outsider = Principal::new(9, "eve").with_group(group(90, "eve"));
    let options = SearchOptions {
        older_than: Some("abc".to_string()),
        ..SearchOptions::default()
    };
    assert!(matches!(
        compile("tag:x", &outsider, &options),
        Err(SearchError::ObjectNotFound { .. })
    ));
}

#[test]
fn test_limit_is_clamped() {
    let options = SearchOptions {
        limit: 50_000,
        ..SearchOptions::default()
    };
    assert_eq!(options.effective_limit(), DEFAULT_LIMIT);
    let options = SearchOptions {
        limit: 0,
        ..SearchOptions::default()
    };
    assert_eq!(options.effective_limit(), 1);
}

#[test]
fn test_parse_errors_propagate() {
    assert!(matches!(
        compile("tag:(a OR b", &alice(), &SearchOptions::default()),
        Err(SearchError::Parse { .. })
    ));
}

// SQL rendering

#[test]
fn test_render_like_escape() {
    let mut params = Vec::new();
    let sql = render_predicate(&predicate("file.type:PE32*"), &mut params);
    assert_eq!(sql, "f.file_type LIKE ? ESCAPE '\\'");
    assert_eq!(params, vec![SqlValue::Text("PE32%".to_string())]);
}

#[test]
fn test_render_json_path_is_bound() {
    let mut params = Vec::new();
    let sql = render_predicate(&predicate("static.cfg.urls.main:x"), &mut params);
    assert_eq!(
        sql,
        "CASE json_type(c.cfg, ?) WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
         ELSE CAST(json_extract(c.cfg, ?) AS TEXT) END = ?"
    );
    let path = SqlValue::Text(r#"$."urls"."main""#.to_string());
    assert_eq!(
        params,
        vec![path.clone(), path, SqlValue::Text("x".to_string())]
    );
    assert_eq!(params.len(), sql.matches('?').count());
}

#[test]
fn test_render_exists_and_constants() {
    let mut params = Vec::new();
    let sql = render_predicate(&predicate("NOT tag:x"), &mut params);
    assert_eq!(
        sql,
        "NOT (EXISTS (SELECT 1 FROM object_tag ot JOIN tag t ON t.id = ot.tag_id WHERE ot.object_id = o.id AND t.tag = ?))"
    );
    assert_eq!(params.len(), 1);

    let mut params = Vec::new();
    assert_eq!(render_predicate(&Predicate::Const(true), &mut params), "1 = 1");
    assert_eq!(render_predicate(&Predicate::And(vec![]), &mut params), "1 = 1");
    assert_eq!(render_predicate(&Predicate::Or(vec![]), &mut params), "1 = 0");
    let empty = Predicate::InList {
        operand: Operand::Column(PERMISSION_GROUP),
        values: vec![],
    };
    assert_eq!(render_predicate(&empty, &mut params), "1 = 0");
    assert!(params.is_empty());
}

#[test]
fn test_render_datetime_values() {
    let mut params = Vec::new();
    render_predicate(&predicate("upload_time:2021-01-01"), &mut params);
    assert_eq!(
        params,
        vec![
            SqlValue::Text("2021-01-01 00:00:00".to_string()),
            SqlValue::Text("2021-01-02 00:00:00".to_string()),
        ]
    );
}

#[test]
fn test_build_object_query() {
    let plan = compile("file.name:a", &alice(), &SearchOptions::default()).unwrap();
    let (sql, params) = build_object_query(&plan, false);

    assert!(sql.contains("FROM object o"));
    assert!(sql.contains("LEFT JOIN file f ON f.id = o.id"));
    assert!(sql.contains("o.type = ?"));
    assert!(sql.contains("p.group_id IN (?, ?)"));
    assert!(sql.contains("ORDER BY o.upload_time DESC, o.id DESC"));
    assert!(sql.ends_with("LIMIT ?"));
    assert_eq!(params.len(), count_params(&sql));
    assert_eq!(params.last(), Some(&SqlValue::Integer(DEFAULT_LIMIT as i64)));
}

#[test]
fn test_build_object_query_oldest_first() {
    let options = SearchOptions {
        sort_by: SortMode::Oldest,
        limit: 5,
        ..SearchOptions::default()
    };
    let plan = compile("tag:x", &alice(), &options).unwrap();
    let (sql, params) = build_object_query(&plan, false);
    assert!(sql.contains("ORDER BY o.upload_time ASC, o.id ASC"));
    assert_eq!(params.last(), Some(&SqlValue::Integer(5)));
}

#[test]
fn test_build_count_query() {
    let plan = compile("tag:x", &alice(), &SearchOptions::default()).unwrap();
    let (sql, params) = build_object_query(&plan, true);
    assert!(sql.starts_with("SELECT COUNT(*)"));
    assert!(!sql.contains("LIMIT"));
    assert!(!sql.contains("ORDER BY"));
    assert_eq!(params.len(), count_params(&sql));
}

#[test]
fn test_build_position_query() {
    let (sql, params) = build_position_query("abc", &alice());
    assert!(sql.contains("o.dhash = ?"));
    assert_eq!(params[0], SqlValue::Text("abc".to_string()));
    assert_eq!(params.len(), count_params(&sql));
}
