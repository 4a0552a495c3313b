use super::*;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = AppConfig::default();
    assert_eq!(config.pandoc.timeout_seconds, 300);
    assert_eq!(config.pandoc.pdf_engine, "pdflatex");
    assert_eq!(config.batch.max_concurrent_jobs, 4);
    assert_eq!(config.batch.default_output_format, OutputFormat::Html);
    assert_eq!(config.batch.max_batch_files, 1000);
    assert_eq!(config.logging.level, "warn");
    assert!(config.validate().is_ok());
}

#[test]
fn test_layered_defaults_extract_unchanged() {
    let config = AppConfig::from_figment(AppConfig::layered(None, None, "PANDOC_BATCH_TEST_UNUSED_")).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_project_file_overrides_global() {
    let dir = TempDir::new().unwrap();
    let global = dir.path().join("config.toml");
    let project = dir.path().join("pandoc-batch.yaml");
    std::fs::write(&global, "[pandoc]\npdf_engine = \"xelatex\"\ntimeout_seconds = 60\n").unwrap();
    std::fs::write(&project, "pandoc:\n  timeout_seconds: 120\nbatch:\n  default_output_format: docx\n").unwrap();

    let config =
        AppConfig::from_figment(AppConfig::layered(Some(global), Some(project), "PANDOC_BATCH_TEST_UNUSED_")).unwrap();
    assert_eq!(config.pandoc.pdf_engine, "xelatex");
    assert_eq!(config.pandoc.timeout_seconds, 120);
    assert_eq!(config.batch.default_output_format, OutputFormat::Docx);
    assert!(config.batch.recursive);
}

#[test]
fn test_environment_overrides_files() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().join("pandoc-batch.json");
    std::fs::write(&project, r#"{"batch": {"max_concurrent_jobs": 2}}"#).unwrap();

    unsafe {
        std::env::set_var("PANDOC_BATCH_TEST_ENV_BATCH__MAX_CONCURRENT_JOBS", "8");
    }
    let config = AppConfig::from_figment(AppConfig::layered(None, Some(project), "PANDOC_BATCH_TEST_ENV_")).unwrap();
    unsafe {
        std::env::remove_var("PANDOC_BATCH_TEST_ENV_BATCH__MAX_CONCURRENT_JOBS");
    }
    assert_eq!(config.batch.max_concurrent_jobs, 8);
}

#[test]
fn test_unknown_extension_is_sniffed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.conf");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config = AppConfig::load_from_file(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_format_tag_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("pandoc-batch.toml");
    std::fs::write(&path, "[batch]\ndefault_output_format = \"wordperfect\"\n").unwrap();
    assert!(AppConfig::load_from_file(&path).is_err());
}

#[test]
fn test_missing_custom_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(AppConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
}

#[test]
fn test_validation_names_the_field() {
    let mut config = AppConfig::default();
    config.pandoc.timeout_seconds = 5;
    assert!(config.validate().unwrap_err().to_string().contains("timeout_seconds"));

    let mut config = AppConfig::default();
    config.batch.max_concurrent_jobs = 17;
    assert!(config.validate().unwrap_err().to_string().contains("max_concurrent_jobs"));

    let mut config = AppConfig::default();
    config.batch.max_batch_files = 0;
    assert!(config.validate().unwrap_err().to_string().contains("max_batch_files"));

    let mut config = AppConfig::default();
    config.batch.max_concurrent_jobs = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_auto_concurrency_stays_in_range() {
    let batch = BatchConfig {
        max_concurrent_jobs: 0,
        ..BatchConfig::default()
    };
    let workers = batch.effective_max_concurrent();
    assert!((1..=16).contains(&workers));
}

#[test]
fn test_log_level_fallback() {
    let mut logging = LoggingConfig::default();
    assert_eq!(logging.filter_level(), "warn");
    logging.level = "DEBUG".to_string();
    assert_eq!(logging.filter_level(), "debug");
    logging.level = "chatty".to_string();
    assert_eq!(logging.filter_level(), "info");
}

#[test]
fn test_save_and_reload_each_format() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.pandoc.pdf_engine = "lualatex".to_string();
    config.batch.default_output_format = OutputFormat::Epub3;

    for name in ["out.toml", "out.json", "nested/out.yaml"] {
        let path = dir.path().join(name);
        config.save_to_file(&path).unwrap();
        assert_eq!(AppConfig::load_from_file(&path).unwrap(), config, "{name}");
    }
}

#[test]
fn test_project_config_found_in_ancestor() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a/b");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(dir.path().join("pandoc-batch.yml"), "batch:\n  recursive: false\n").unwrap();

    assert_eq!(find_config_from(&nested), Some(dir.path().join("pandoc-batch.yml")));
}

#[test]
fn test_runner_options_follow_config() {
    let config = PandocConfig {
        timeout_seconds: 60,
        html_standalone: false,
        ..PandocConfig::default()
    };
    let options = config.runner_options();
    assert_eq!(options.timeout, Duration::from_secs(60));
    assert!(!options.html_standalone);
}
