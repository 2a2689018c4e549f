// tests/config.rs
use aura_intel::config::ai::AiConfig;
use aura_intel::config::AppConfig;
use std::{env, fs};

fn clear_env() {
    for k in [
        "APP_CONFIG_PATH",
        "SNAPSHOT_DIR",
        "SCORE_THRESHOLD",
        "PIPELINE_CONCURRENCY",
        "AI_CONFIG_PATH",
        "GEMINI_API_KEY",
    ] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn app_config_file_then_env_overrides() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // No files → defaults
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.default_threshold, 1);
    assert_eq!(cfg.concurrency, 1);

    // Fallback TOML in ./config/
    fs::create_dir_all("config").unwrap();
    fs::write(
        "config/app.toml",
        "store_dir = \"snap\"\ndefault_threshold = 2\nconcurrency = 0\n",
    )
    .unwrap();
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.store_dir, std::path::PathBuf::from("snap"));
    assert_eq!(cfg.default_threshold, 2);
    assert_eq!(cfg.concurrency, 1, "concurrency is at least 1");

    // Env wins
    env::set_var("SCORE_THRESHOLD", "3");
    env::set_var("PIPELINE_CONCURRENCY", "4");
    env::set_var("SNAPSHOT_DIR", "elsewhere");
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.default_threshold, 3);
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.store_dir, std::path::PathBuf::from("elsewhere"));

    // Explicit path must exist
    env::set_var("APP_CONFIG_PATH", tmp.path().join("missing.toml"));
    assert!(AppConfig::load_default().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn ai_config_resolves_env_key() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // Defaults with no key → unconfigured, not an error
    let cfg = AiConfig::load_default().unwrap();
    assert!(cfg.api_key().is_none());

    env::set_var("GEMINI_API_KEY", "secret");
    let cfg = AiConfig::load_default().unwrap();
    assert_eq!(cfg.api_key(), Some("secret"));

    // Explicit file
    let p = tmp.path().join("ai.json");
    fs::write(&p, r#"{"enabled": true, "provider": "gemini", "api_key": "ENV", "daily_limit": 5}"#)
        .unwrap();
    env::set_var("AI_CONFIG_PATH", &p);
    let cfg = AiConfig::load_default().unwrap();
    assert_eq!(cfg.daily_limit, 5);
    assert_eq!(cfg.api_key(), Some("secret"));

    clear_env();
    env::set_current_dir(&old).unwrap();
}
