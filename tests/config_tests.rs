use std::{fs, path::PathBuf};

use gradeit::config::Config;
use uuid::Uuid;

fn write_config(contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gradeit-config-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("config.properties");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn parses_key_values_and_skips_comments() {
    let path = write_config(
        "# grading setup\n\
         gitlab_host = gitlab.example.edu\n\
         \n\
         max_grade=100\n",
    );

    let config = Config::load(&path).expect("load config");
    assert_eq!(config.get("gitlab_host"), Some("gitlab.example.edu"));
    assert_eq!(config.get_int("max_grade", 0), 100);
    assert_eq!(config.get("missing"), None);
    assert_eq!(config.get_int("missing", 60), 60);

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn resolves_variable_references_transitively() {
    let path = write_config(
        "base_directory=/srv/grading\n\
         repos=${base_directory}/repos\n\
         output_directory=${repos}/../reports\n",
    );

    let config = Config::load(&path).expect("load config");
    assert_eq!(config.get("repos"), Some("/srv/grading/repos"));
    assert_eq!(config.get("output_directory"), Some("/srv/grading/repos/../reports"));

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn unknown_references_are_left_verbatim() {
    let path = write_config("output=${nowhere}/reports\n");

    let config = Config::load(&path).expect("load config");
    assert_eq!(config.get("output"), Some("${nowhere}/reports"));

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn self_referential_value_terminates() {
    let path = write_config("loop=${loop}\n");

    let config = Config::load(&path).expect("load config");
    assert_eq!(config.get("loop"), Some("${loop}"));

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn mutually_referential_values_terminate() {
    let path = write_config(
        "first=${second}\n\
         second=${first}\n",
    );

    // Resolution stops at the pass bound; whatever the values hold at
    // that point, loading must finish.
    let config = Config::load(&path).expect("load config");
    assert!(config.get("first").is_some());
    assert!(config.get("second").is_some());

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn provider_order_defaults_and_parses_csv() {
    let path = write_config("gitlab_host=example\n");
    let config = Config::load(&path).expect("load config");
    assert_eq!(config.provider_order(), vec!["gemini", "anthropic", "openai"]);
    let _ = fs::remove_dir_all(path.parent().unwrap());

    let path = write_config("ai_provider_order = openai , gemini\n");
    let config = Config::load(&path).expect("load config");
    assert_eq!(config.provider_order(), vec!["openai", "gemini"]);
    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn missing_config_file_errors_with_context() {
    let err = Config::load("/definitely/not/here.properties").expect_err("should fail");
    assert!(err.to_string().contains("Could not read config file"));
}
