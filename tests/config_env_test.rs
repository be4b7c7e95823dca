use std::env;
use texbook::Settings;
use texbook::pipeline::Backpressure;
use tempfile::TempDir;

// Environment variables are process-wide, so everything touching them lives
// in one test.
#[test]
fn test_env_overrides_nested_settings() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &config_path,
        r#"
[pipeline]
queue_capacity = 10
debounce_ms = 250
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nesting levels
        env::set_var("TEXBOOK_PIPELINE__QUEUE_CAPACITY", "42");
        env::set_var("TEXBOOK_PIPELINE__BACKPRESSURE", "block");
        env::set_var("TEXBOOK_RENDER__TIMEOUT_SECS", "5");
    }

    let settings = Settings::load_from(&config_path).unwrap();

    unsafe {
        env::remove_var("TEXBOOK_PIPELINE__QUEUE_CAPACITY");
        env::remove_var("TEXBOOK_PIPELINE__BACKPRESSURE");
        env::remove_var("TEXBOOK_RENDER__TIMEOUT_SECS");
    }

    assert_eq!(settings.pipeline.queue_capacity, 42, "env beats file");
    assert_eq!(settings.pipeline.debounce_ms, 250, "file beats defaults");
    assert_eq!(settings.pipeline.backpressure, Backpressure::Block);
    assert_eq!(settings.render.timeout_secs, 5);
    assert_eq!(settings.render.program, "pdflatex");
}
