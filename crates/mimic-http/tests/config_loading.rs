use mimic_http::config::ServerConfig;
use mimic_http::error::ConfigError;
use std::io::Write;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_json_config_and_compile() {
    let file = write_config(
        ".json",
        r#"{
            "listen": {"host": "127.0.0.1", "port": 9100},
            "throw_on_matcher_failure": true,
            "metrics": {"enabled": false},
            "mappings": [
                {
                    "title": "ping",
                    "request": {"methods": ["GET"], "url": "/ping?x=1"},
                    "response": {"statusCode": 200, "body": "pong"}
                },
                {
                    "request": {
                        "params": [{"name": "q", "matchers": [{"name": "RegexMatcher", "pattern": "^[a-z]+$"}]}],
                        "cookies": [{"name": "session", "matchers": [{"name": "NotNullOrEmptyMatcher"}]}]
                    }
                }
            ]
        }"#,
    );

    let config = ServerConfig::from_file(file.path()).unwrap();
    assert_eq!(config.listen.socket_addr().unwrap().to_string(), "127.0.0.1:9100");
    assert!(config.throw_on_matcher_failure);

    let mappings = config.build_mappings().unwrap();
    assert_eq!(mappings.len(), 2);
    assert_eq!(mappings[0].title.as_deref(), Some("ping"));
}

#[test]
fn test_invalid_matcher_fails_compilation() {
    let file = write_config(
        ".yaml",
        r#"
mappings:
  - request:
      headers:
        - name: X-Trace
          matchers:
            - name: RegexMatcher
              pattern: "[unclosed"
"#,
    );

    let config = ServerConfig::from_file(file.path()).unwrap();
    let err = config.build_mappings().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidMapping { .. }));
    assert!(err.to_string().contains("[unclosed"));
}

#[test]
fn test_invalid_mapping_fails_load() {
    let file = write_config(
        ".yaml",
        r#"
mappings:
  - guid: 5f0c2f36-2a51-4d7a-bb0c-0d2d9f4f2a11
    probability: 2.0
"#,
    );

    let err = ServerConfig::from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("probability"));
}
