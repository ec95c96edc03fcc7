use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use claims::*;
use tempfile::NamedTempFile;
use theme_porter::config::{AppConfig, ConfigLoadResult, load_config_from};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn loaded(result: ConfigLoadResult) -> AppConfig {
    match result {
        ConfigLoadResult::Success(config) => *config,
        ConfigLoadResult::LoadError(e) | ConfigLoadResult::DeserializeError(e) => {
            panic!("config failed to load: {e}")
        }
    }
}

#[cfg(test)]
mod config_loading_tests {
    use super::*;

    #[test]
    fn test_file_values_are_applied() {
        let file = write_config(
            r#"
output_dir = "/srv/themes"
scheme_version = 2
fill_defaults = false

[http]
timeout_secs = 30
user_agent = "porter-test"

[marketplace]
page_size = 25

[logging]
level = "debug"
"#,
        );

        let config = loaded(load_config_from(Some(file.path()), Some(HashMap::new())));

        assert_eq!(config.output_dir(), PathBuf::from("/srv/themes"));
        assert_eq!(config.scheme_version(), 2);
        assert!(!config.fill_defaults());
        assert_eq!(config.http().timeout_secs(), 30);
        assert_eq!(config.http().user_agent(), "porter-test");
        assert_eq!(config.http().connect_timeout_secs(), 15);
        assert_eq!(config.marketplace().page_size(), 25);
        assert_eq!(config.logging().level(), "debug");
        assert_none!(config.logging().file());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config("[http]\ntimeout_secs = 30\n");
        let env = HashMap::from([
            (
                "THEME_PORTER__HTTP__TIMEOUT_SECS".to_string(),
                "90".to_string(),
            ),
            (
                "THEME_PORTER__LOGGING__LEVEL".to_string(),
                "warn".to_string(),
            ),
        ]);

        let config = loaded(load_config_from(Some(file.path()), Some(env)));

        assert_eq!(config.http().timeout_secs(), 90);
        assert_eq!(config.logging().level(), "warn");
    }

    #[test]
    fn test_missing_optional_file_uses_defaults() {
        let config = loaded(load_config_from(None, Some(HashMap::new())));

        assert_ok!(config.validate());
        assert_eq!(config.marketplace().page_size(), 10);
    }

    #[test]
    fn test_missing_explicit_file_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = load_config_from(Some(&path), Some(HashMap::new()));

        assert_matches!(result, ConfigLoadResult::LoadError(_));
    }

    #[test]
    fn test_out_of_range_values_fail_validation() {
        let file = write_config("[http]\ntimeout_secs = 0\n\n[marketplace]\npage_size = 1000\n");

        let result = load_config_from(Some(file.path()), Some(HashMap::new()));

        let ConfigLoadResult::DeserializeError(message) = result else {
            panic!("expected a validation failure");
        };
        assert!(message.contains("http.timeout_secs"));
        assert!(message.contains("marketplace.page_size"));
    }

    #[test]
    fn test_wrong_type_is_a_deserialize_error() {
        let file = write_config("scheme_version = \"latest\"\n");

        let result = load_config_from(Some(file.path()), Some(HashMap::new()));

        assert_matches!(result, ConfigLoadResult::DeserializeError(_));
    }
}
