use anyhow::Result;
use clap::Parser;
use glucose_export::{CliArgs, Command, ExportConfig, MissingSourcePolicy, run};
use serial_test::serial;

mod support;

use support::{TestWorkspace, cgm_archive_entries, read_workbook, sheet_names};

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::try_parse_from(std::iter::once("glucose-export").chain(args.iter().copied()))
        .expect("valid arguments")
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn export_writes_named_workbook() -> Result<()> {
    let workspace = TestWorkspace::new();
    let input = workspace.write_archive("clinic_export.zip", &cgm_archive_entries());
    let out_dir = workspace.root().display().to_string();
    let input_arg = input.display().to_string();

    run(parse(&[
        "export",
        &input_arg,
        "--output-dir",
        &out_dir,
        "--base-name",
        "patient-42",
    ]))
    .await?;

    let written = std::fs::read(workspace.path("patient-42.xlsx"))?;
    let book = read_workbook(&written);
    assert_eq!(sheet_names(&book), vec!["Summary", "cgm"]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn export_rejects_missing_output_dir() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_archive("export.zip", &cgm_archive_entries());
    let input_arg = input.display().to_string();
    let missing_dir = workspace.path("nope").display().to_string();

    let result = run(parse(&["export", &input_arg, "--output-dir", &missing_dir])).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("output directory"));
}

#[tokio::test(flavor = "current_thread")]
#[serial]
async fn inspect_fails_on_invalid_archive() {
    let workspace = TestWorkspace::new();
    let path = workspace.path("broken.zip");
    std::fs::write(&path, b"not a zip").expect("write");
    let path_arg = path.display().to_string();

    let err = run(parse(&["inspect", &path_arg])).await.unwrap_err();
    assert!(err.to_string().contains("not a valid export"));
}

#[test]
#[serial]
fn environment_supplies_missing_source_policy() {
    unsafe {
        std::env::set_var("GLUCOSE_EXPORT_MISSING_SOURCES", "skip");
    }
    let cli = parse(&["export", "data.zip"]);
    unsafe {
        std::env::remove_var("GLUCOSE_EXPORT_MISSING_SOURCES");
    }

    let Command::Export(args) = cli.command else {
        panic!("expected export command");
    };
    let config = ExportConfig::from_args(args, None).expect("config");
    assert_eq!(config.options.missing_sources, MissingSourcePolicy::Skip);
}

#[test]
#[serial]
fn config_file_is_global() {
    let workspace = TestWorkspace::new();
    let config_path = workspace.path("export.yaml");
    std::fs::write(&config_path, "base_name: nightly\n").expect("write config");
    let config_arg = config_path.display().to_string();

    let cli = parse(&["export", "data.zip", "--config", &config_arg]);
    let Command::Export(args) = cli.command else {
        panic!("expected export command");
    };
    let config = ExportConfig::from_args(args, cli.config.as_deref()).expect("config");
    assert_eq!(config.base_name, "nightly");
}
