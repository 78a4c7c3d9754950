//! Unit tests for flag parsing and settings overrides.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use clap::Parser;

use crate::{
    cli::Cli,
    config::{LogLevel, Settings},
};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("confsyncd").chain(args.iter().copied())).unwrap()
}

#[test]
fn no_flags_leave_settings_untouched() {
    let mut settings = Settings::from_toml("request_port = 7000\nbootstrap = \"10.0.0.1:5555\"")
        .unwrap();
    let before = settings.clone();

    parse(&[]).apply(&mut settings);

    assert_eq!(settings, before);
}

#[test]
fn short_flags_override_settings() {
    let mut settings = Settings::default();

    parse(&["-b", "10.0.0.1:5555", "-f", "/etc/app.json", "-p", "5556"]).apply(&mut settings);

    assert_eq!(settings.bootstrap.as_deref(), Some("10.0.0.1:5555"));
    assert_eq!(settings.file, PathBuf::from("/etc/app.json"));
    assert_eq!(settings.request_port, 5556);
}

#[test]
fn long_flags_override_settings() {
    let mut settings = Settings::default();

    parse(&[
        "--pub-port",
        "5557",
        "--bind",
        "127.0.0.1",
        "--host",
        "node-a.lan",
        "--local-socket",
        "/run/confsyncd.sock",
        "--transitive-join",
        "--log-dir",
        "/var/log/confsync",
    ])
    .apply(&mut settings);

    assert_eq!(settings.publish_port, 5557);
    assert_eq!(settings.bind_host, "127.0.0.1");
    assert_eq!(settings.advertise_host, "node-a.lan");
    assert_eq!(settings.local_socket, PathBuf::from("/run/confsyncd.sock"));
    assert!(settings.transitive_join);
    assert_eq!(
        settings.general.log_dir,
        Some(PathBuf::from("/var/log/confsync"))
    );
}

#[test]
fn empty_bootstrap_starts_a_new_mesh() {
    let mut settings = Settings::from_toml("bootstrap = \"10.0.0.1:5555\"").unwrap();

    parse(&["--bootstrap", ""]).apply(&mut settings);

    assert_eq!(settings.bootstrap, None);
}

#[test]
fn verbose_flags_raise_the_configured_level() {
    let mut settings = Settings::from_toml("[general]\nlog_level = \"warn\"").unwrap();

    parse(&["-vv"]).apply(&mut settings);

    assert_eq!(settings.general.log_level, LogLevel::Debug);
}

#[test]
fn config_flag_is_parsed_but_not_applied() {
    let cli = parse(&["-c", "/etc/confsyncd.toml"]);
    let mut settings = Settings::default();

    cli.apply(&mut settings);

    assert_eq!(cli.config, Some(PathBuf::from("/etc/confsyncd.toml")));
    assert_eq!(settings, Settings::default());
}

#[test]
fn rejects_out_of_range_port() {
    let result = Cli::try_parse_from(["confsyncd", "-p", "70000"]);

    assert!(result.is_err());
}
