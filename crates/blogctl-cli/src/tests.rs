use super::*;
use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::anyhow;
use blogctl_migrate::{
    ClassifiedError, ConfigEntry, InstanceLayout, MigrationError, DATABASE_HOST_KEY,
    EXIT_CONFIG_ERROR, EXIT_PROCESS_ERROR, ROLLBACK_SUGGESTION,
};
use clap::error::ErrorKind;
use serde_json::{json, Value};

use crate::dispatch::{parse_config_value, render_config_value, resolve_settings};
use crate::render::{output_style_for, render_failure_lines, render_status_line, OutputStyle};

static TEST_ROOT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_root() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let seq = TEST_ROOT_COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("blogctl-cli-test-{}-{nanos}-{seq}", std::process::id()))
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("blogctl").chain(args.iter().copied()))
        .expect("arguments must parse")
}

fn read_config(root: &std::path::Path) -> Value {
    let raw = fs::read_to_string(root.join("config.production.json")).expect("must read config");
    serde_json::from_str(&raw).expect("must parse config")
}

fn host_error() -> ClassifiedError {
    ClassifiedError::Config {
        message: "Invalid database host".to_string(),
        entries: vec![ConfigEntry {
            key: DATABASE_HOST_KEY.to_string(),
            value: Some(json!("db.internal")),
        }],
        environment: "production".to_string(),
    }
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = parse(&[
        "migrate",
        "--dir",
        "/srv/blog",
        "--environment",
        "staging",
        "--service-user",
        "blog",
        "-v",
    ]);
    assert!(matches!(cli.command, Commands::Migrate));
    assert_eq!(cli.dir, Some(PathBuf::from("/srv/blog")));
    assert_eq!(cli.environment, "staging");
    assert_eq!(cli.service_user.as_deref(), Some("blog"));
    assert!(cli.verbose);
}

#[test]
fn cli_defaults_environment_to_production() {
    let cli = parse(&["update"]);
    assert_eq!(cli.environment, "production");
    assert_eq!(cli.command.name(), "update");
    assert!(cli.dir.is_none());
}

#[test]
fn cli_without_subcommand_shows_help() {
    let err = Cli::try_parse_from(["blogctl"]).expect_err("subcommand is required");
    assert_eq!(err.kind(), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
}

#[test]
fn config_command_parses_optional_value() {
    let cli = parse(&["config", "database.connection.host"]);
    let Commands::Config { key, value } = &cli.command else {
        panic!("expected config command");
    };
    assert_eq!(key, "database.connection.host");
    assert!(value.is_none());
}

#[test]
fn config_values_keep_json_types() {
    assert_eq!(parse_config_value("3306"), json!(3306));
    assert_eq!(parse_config_value("[\"file\"]"), json!(["file"]));
    assert_eq!(parse_config_value("true"), json!(true));
    assert_eq!(parse_config_value("db.internal"), json!("db.internal"));
    assert_eq!(render_config_value(&json!("db.internal")), "db.internal");
    assert_eq!(render_config_value(&json!(["file"])), "[\"file\"]");
}

#[test]
fn resolve_settings_applies_flag_overrides_over_file() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    fs::write(root.join(".blogctl.toml"), "service_user = \"blog\"\nmigrator = \"migrate-db\"\n")
    .expect("must write settings");
    let layout = InstanceLayout::new(&root);

    let cli = parse(&["migrate", "--migrator", "custom-migrate"]);
    let settings = resolve_settings(&cli, &layout).expect("must resolve settings");
    assert_eq!(settings.service_user, "blog");
    assert_eq!(settings.migrator, "custom-migrate");

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn output_style_follows_terminal_detection() {
    assert_eq!(output_style_for(true), OutputStyle::Rich);
    assert_eq!(output_style_for(false), OutputStyle::Plain);
}

#[test]
fn render_status_line_plain_is_unadorned() {
    assert_eq!(
        render_status_line(OutputStyle::Plain, "ok", "database migrations complete"),
        "database migrations complete"
    );
}

#[test]
fn render_status_line_rich_includes_badge() {
    let line = render_status_line(OutputStyle::Rich, "ok", "database migrations complete");
    assert!(line.contains("[OK]"), "line: {line}");
    assert!(line.ends_with(" database migrations complete"), "line: {line}");
}

#[test]
fn render_failure_lines_uses_classified_report() {
    let err = anyhow::Error::from(MigrationError::from(host_error()));
    let lines = render_failure_lines(&err, OutputStyle::Plain);
    assert_eq!(lines[0], "Error detected in the production configuration.");
    assert!(lines.contains(&"Current value: db.internal".to_string()));
    assert_eq!(exit_code_for(&err), EXIT_CONFIG_ERROR as u8);
}

#[test]
fn render_failure_lines_falls_back_to_error_chain() {
    let err = anyhow!("disk full").context("failed saving config key 'url'");
    let lines = render_failure_lines(&err, OutputStyle::Plain);
    assert_eq!(lines, vec!["failed saving config key 'url': disk full"]);
    assert_eq!(exit_code_for(&err), 1);
}

#[test]
fn config_command_sets_and_reads_keys() {
    let root = test_root();
    let root_arg = root.display().to_string();

    run_cli(parse(&["config", "database.connection.port", "3306", "--dir", &root_arg]))
    .expect("must set config key");
    run_cli(parse(&["config", "database.connection.port", "--dir", &root_arg]))
        .expect("must read config key");

    assert_eq!(read_config(&root), json!({"database": {"connection": {"port": 3306}}}));

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn update_with_missing_migrator_reports_rollback_and_restores_config() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    fs::write(
        root.join("config.production.json"),
        r#"{"database":{"client":"mysql"},"logging":{"transports":["stdout"]}}"#,
    )
    .expect("must seed config");
    let root_arg = root.display().to_string();

    let err = run_cli(parse(&[
        "update",
        "--dir",
        &root_arg,
        "--migrator",
        "blogctl-test-missing-migrator",
    ]))
    .expect_err("missing migrator must fail");

    let migration = err
        .downcast_ref::<MigrationError>()
        .expect("must surface a migration error");
    let classified = migration.classified().expect("must be classified");
    assert_eq!(classified.suggestion(), Some(ROLLBACK_SUGGESTION));
    assert_eq!(exit_code_for(&err), EXIT_PROCESS_ERROR as u8);

    let persisted = read_config(&root);
    assert_eq!(persisted["logging"]["transports"], json!(["stdout"]));
    assert_eq!(
        persisted["paths"]["contentPath"],
        json!(root.join("content").display().to_string())
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn migrate_with_missing_migrator_has_no_suggestion() {
    let root = test_root();
    fs::create_dir_all(&root).expect("must create root");
    let root_arg = root.display().to_string();

    let err = run_cli(parse(&[
        "migrate",
        "--dir",
        &root_arg,
        "--migrator",
        "blogctl-test-missing-migrator",
    ]))
    .expect_err("missing migrator must fail");

    let classified = err
        .downcast_ref::<MigrationError>()
        .and_then(MigrationError::classified)
        .expect("must be classified");
    assert_eq!(classified.suggestion(), None);
    assert!(!read_config(&root)["logging"]
        .as_object()
        .expect("logging object")
        .contains_key("transports"));

    let _ = fs::remove_dir_all(&root);
}
