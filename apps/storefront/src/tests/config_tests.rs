use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn temp_config(contents: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("storefront_config_test_{suffix}.toml"));
    fs::write(&path, contents).expect("write config");
    path
}

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let path = temp_config(
        r#"
api_url = "https://auction.example.com/api"
selection_policy = "any_closed"
"#,
    );

    let settings = load_settings_with(Some(&path), vars(&[])).expect("settings");
    fs::remove_file(&path).expect("cleanup");

    assert_eq!(settings.api_url, "https://auction.example.com/api");
    assert_eq!(settings.selection_policy, SelectionPolicy::AnyClosed);
    assert_eq!(settings.cdn_url, Settings::default().cdn_url);
    assert_eq!(settings.bidder_tag, "me");
}

#[test]
fn environment_overrides_file() {
    let path = temp_config("bidder_tag = \"file\"\nlog_filter = \"debug\"\n");

    let settings = load_settings_with(
        Some(&path),
        vars(&[
            ("APP__BIDDER_TAG", "env"),
            ("APP__SELECTION_POLICY", "won_lots_only"),
        ]),
    )
    .expect("settings");
    fs::remove_file(&path).expect("cleanup");

    assert_eq!(settings.bidder_tag, "env");
    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.selection_policy, SelectionPolicy::WonLotsOnly);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let path = env::temp_dir().join("storefront_config_test_does_not_exist.toml");
    assert!(load_settings_with(Some(&path), vars(&[])).is_err());
}

#[test]
fn unknown_keys_are_rejected() {
    let path = temp_config("api = \"typo\"\n");

    let result = load_settings_with(Some(&path), vars(&[]));
    fs::remove_file(&path).expect("cleanup");

    let err = result.expect_err("unknown key");
    assert!(format!("{err:#}").contains("failed to parse config file"));
}

#[test]
fn selection_policy_parsing() {
    assert_eq!(
        parse_selection_policy(" Any_Closed ").expect("policy"),
        SelectionPolicy::AnyClosed
    );
    assert_eq!(
        parse_selection_policy("won").expect("policy"),
        SelectionPolicy::WonLotsOnly
    );
    assert!(parse_selection_policy("everything").is_err());

    let path = temp_config("");
    let result = load_settings_with(Some(&path), vars(&[("APP__SELECTION_POLICY", "nope")]));
    fs::remove_file(&path).expect("cleanup");
    assert!(result.is_err());
}
