//! Integration tests for relaxed binding across property sources
//!
//! Binds a small server-style properties type from programmatic pairs,
//! environment variables and files, and checks that every spelling of a key
//! lands on the same field.

use elif_config::{
    bind_properties, BindContext, Bindable, ConfigSchema, ConfigValue, ConfigurationProperties,
    FieldSpec, PlaceholderResolver, PropertyBinder, PropertyNode, PropertySet,
};
use serial_test::serial;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
struct ServerSettings {
    port: u16,
    use_forward_headers: bool,
    context_path: String,
    allowed_hosts: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            use_forward_headers: false,
            context_path: "/".to_string(),
            allowed_hosts: Vec::new(),
        }
    }
}

impl Bindable for ServerSettings {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("port", "u16", "Listen port"),
            FieldSpec::scalar("use-forward-headers", "bool", "Trust X-Forwarded-* headers"),
            FieldSpec::scalar("context-path", "string", "Mount path"),
            FieldSpec::sequence("allowed-hosts", "string", "Accepted Host headers"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "port" => {
                ctx.assign(node, &mut self.port);
            }
            "use-forward-headers" => {
                ctx.assign(node, &mut self.use_forward_headers);
            }
            "context-path" => {
                ctx.assign(node, &mut self.context_path);
            }
            "allowed-hosts" => {
                ctx.assign(node, &mut self.allowed_hosts);
            }
            _ => {}
        }
    }
}

impl ConfigurationProperties for ServerSettings {
    const PREFIX: &'static str = "server";
}

fn bind_strict(properties: &PropertySet) -> ServerSettings {
    let (settings, result) = bind_properties::<ServerSettings>(properties, false);
    assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors());
    settings
}

#[test]
fn every_spelling_binds_the_same_field() {
    let variants = [
        "server.use-forward-headers",
        "server.useForwardHeaders",
        "server.use_forward_headers",
        "SERVER.USE_FORWARD_HEADERS",
    ];

    for key in variants {
        let settings = bind_strict(&PropertySet::new().with(key, "true"));
        assert!(settings.use_forward_headers, "variant {}", key);
    }
}

#[test]
fn comma_and_indexed_lists_are_identical() {
    let comma = bind_strict(&PropertySet::new().with("server.allowed-hosts", "a.example,b.example"));
    let indexed = bind_strict(
        &PropertySet::new()
            .with("server.allowedHosts[0]", "a.example")
            .with("server.allowedHosts[1]", "b.example"),
    );

    assert_eq!(comma.allowed_hosts, vec!["a.example", "b.example"]);
    assert_eq!(comma, indexed);
}

#[test]
fn empty_list_value_binds_empty_sequence() {
    let settings = bind_strict(&PropertySet::new().with("server.allowed-hosts", ""));
    assert!(settings.allowed_hosts.is_empty());
}

#[test]
fn placeholders_resolve_against_other_entries() {
    let properties = PropertySet::new()
        .with("app.base", "/api")
        .with("server.context-path", "${app.base}/v1")
        .with("server.port", "${APP_PORT:9090}");

    let binder = PropertyBinder::new("server")
        .ignore_unknown_fields(false)
        .with_placeholder_resolver(PlaceholderResolver::new().without_environment());
    let mut settings = ServerSettings::default();
    let result = binder.bind(&mut settings, &properties);

    assert!(!result.has_errors());
    assert_eq!(settings.context_path, "/api/v1");
    assert_eq!(settings.port, 9090);
}

#[test]
fn unresolved_placeholder_keeps_raw_text_for_plain_strings() {
    let properties = PropertySet::new().with("server.context-path", "${NOT_DEFINED_ANYWHERE_42}");
    let binder = PropertyBinder::new("server")
        .with_placeholder_resolver(PlaceholderResolver::new().without_environment());
    let mut settings = ServerSettings::default();

    assert!(!binder.bind(&mut settings, &properties).has_errors());
    assert_eq!(settings.context_path, "${NOT_DEFINED_ANYWHERE_42}");
}

#[test]
fn bad_value_does_not_touch_siblings() {
    let properties = PropertySet::new()
        .with("server.port", "eighty")
        .with("server.context-path", "/app")
        .with("server.use-forward-headers", true);

    let (settings, result) = bind_properties::<ServerSettings>(&properties, false);
    assert_eq!(result.error_count(), 1);
    assert!(result.field_error("server.port").unwrap().is_conversion());
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.context_path, "/app");
    assert!(settings.use_forward_headers);
}

#[test]
fn strict_and_lenient_unknown_keys() {
    let properties = PropertySet::new().with("server.unknown-thing", "1");

    let (_, strict) = bind_properties::<ServerSettings>(&properties, false);
    assert!(strict.has_errors());
    assert!(strict.errors()[0].is_unknown_field());

    let (_, lenient) = bind_properties::<ServerSettings>(&properties, true);
    assert!(!lenient.has_errors());
}

#[test]
#[serial]
fn environment_variables_bind_like_dotted_keys() {
    std::env::set_var("ELIFTEST_SERVER_PORT", "7070");
    std::env::set_var("ELIFTEST_SERVER_ALLOWED_HOSTS_0", "env.example");
    std::env::set_var("ELIFTEST_SERVER_USE_FORWARD_HEADERS", "on");

    let properties = PropertySet::from_env("eliftest.server");
    let mut settings = ServerSettings::default();
    let result = PropertyBinder::new("eliftest.server")
        .ignore_unknown_fields(false)
        .bind(&mut settings, &properties);

    std::env::remove_var("ELIFTEST_SERVER_PORT");
    std::env::remove_var("ELIFTEST_SERVER_ALLOWED_HOSTS_0");
    std::env::remove_var("ELIFTEST_SERVER_USE_FORWARD_HEADERS");

    assert!(!result.has_errors(), "{:?}", result.errors());
    assert_eq!(properties.len(), 3);
    assert_eq!(settings.port, 7070);
    assert_eq!(settings.allowed_hosts, vec!["env.example"]);
    assert!(settings.use_forward_headers);
}

#[test]
fn multi_word_environment_names_bind_dashed_fields() {
    let vars = vec![
        ("SERVER_USE_FORWARD_HEADERS".to_string(), "true".to_string()),
        ("SERVER_CONTEXT_PATH".to_string(), "/api".to_string()),
        ("SERVER_ALLOWED_HOSTS_1".to_string(), "b.example".to_string()),
        ("SERVER_ALLOWED_HOSTS_0".to_string(), "a.example".to_string()),
    ];
    let properties = PropertySet::from_env_vars(vars, "server");

    let settings = bind_strict(&properties);
    assert!(settings.use_forward_headers);
    assert_eq!(settings.context_path, "/api");
    assert_eq!(settings.allowed_hosts, vec!["a.example", "b.example"]);
}

#[test]
#[serial]
fn placeholder_falls_back_to_environment() {
    std::env::set_var("ELIF_TEST_CONTEXT", "/from-env");
    let properties = PropertySet::new().with("server.context-path", "${ELIF_TEST_CONTEXT}");
    let settings = bind_strict(&properties);
    std::env::remove_var("ELIF_TEST_CONTEXT");

    assert_eq!(settings.context_path, "/from-env");
}

#[test]
fn yaml_file_source() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "server:\n  port: 9000\n  allowed-hosts:\n    - one.example\n    - two.example"
    )
    .unwrap();

    let properties = PropertySet::from_file(file.path()).unwrap();
    assert!(properties.iter().all(|e| e.source.is_file()));

    let settings = bind_strict(&properties);
    assert_eq!(settings.port, 9000);
    assert_eq!(settings.allowed_hosts, vec!["one.example", "two.example"]);
}

#[test]
fn properties_file_source() {
    let mut file = tempfile::Builder::new().suffix(".properties").tempfile().unwrap();
    writeln!(file, "# server settings\nserver.port=9100\nserver.contextPath=/props").unwrap();

    let settings = bind_strict(&PropertySet::from_file(file.path()).unwrap());
    assert_eq!(settings.port, 9100);
    assert_eq!(settings.context_path, "/props");
}

#[test]
fn unsupported_file_extension() {
    let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
    assert!(PropertySet::from_file(file.path()).is_err());
}

#[test]
fn schema_lists_documented_keys() {
    let schema = ConfigSchema::for_properties::<ServerSettings>();
    let names: Vec<_> = schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "server.port",
            "server.use-forward-headers",
            "server.context-path",
            "server.allowed-hosts"
        ]
    );
    assert_eq!(schema.find("server.allowedHosts[3]").unwrap().field_type, "list<string>");

    let properties = PropertySet::new()
        .with("server.PORT", ConfigValue::Integer(1))
        .with("server.mystery", "x");
    assert_eq!(schema.unknown_keys(&properties), vec!["server.mystery"]);
}
