use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_wamas") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("wamas{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_wamas is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn testdata_path(path: &str) -> String {
    repo_root()
        .join("testdata")
        .join(path)
        .to_string_lossy()
        .into_owned()
}

fn run_wamas(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .args(args)
        .output()
        .expect("run wamas")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "expected {what} to succeed; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path should be UTF-8")
}

#[test]
fn picking_order_round_trips_through_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let order = dir.path().join("order.wamas");
    let confirmation = dir.path().join("confirmation.wamas");

    let output = run_wamas(&[
        "ubl2wamas",
        &testdata_path("ubl/picking.xml"),
        "-t",
        "Picking",
        "-o",
        path_str(&order),
    ]);
    assert_success(&output, "ubl2wamas");
    assert!(output.stdout.is_empty());
    let written = fs::read(&order).expect("order should be written");
    assert_eq!(written.split(|b| *b == b'\n').count(), 3);

    let output = run_wamas(&["wamas2wamas", path_str(&order), "-o", path_str(&confirmation)]);
    assert_success(&output, "wamas2wamas");

    let output = run_wamas(&["wamas2ubl", path_str(&confirmation)]);
    assert_success(&output, "wamas2ubl");
    let stdout = String::from_utf8(output.stdout).expect("stdout should be UTF-8");
    assert!(stdout.contains("<cbc:ID>OUT/0042</cbc:ID>"));
    assert!(stdout.contains("<cbc:DespatchAdviceTypeCode>delivery</cbc:DespatchAdviceTypeCode>"));
}

#[test]
fn document_type_is_case_insensitive() {
    let output = run_wamas(&["ubl2wamas", &testdata_path("ubl/return.xml"), "-t", "return"]);
    assert_success(&output, "ubl2wamas");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().next().is_some_and(|line| &line[40..49] == "KRETK0050"));
}

#[test]
fn dict_format_prints_encoded_fields_as_json() {
    let output = run_wamas(&[
        "ubl2wamas",
        &testdata_path("ubl/picking.xml"),
        "--type",
        "Picking",
        "--format",
        "dict",
    ]);
    assert_success(&output, "ubl2wamas --format dict");

    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let lines = json.as_array().expect("a list of lines");
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["record_type"], "AUSK");
    assert_eq!(lines[1]["record_type"], "AUSP");
    assert!(lines[1]["fields"]["Ausp_ArtNr"].as_str().is_some());
}

#[test]
fn confirmation_decodes_to_dict() {
    let dir = tempfile::tempdir().expect("temp dir");
    let order = dir.path().join("order.wamas");
    let confirmation = dir.path().join("confirmation.wamas");
    assert_success(
        &run_wamas(&[
            "ubl2wamas",
            &testdata_path("ubl/reception.xml"),
            "-t",
            "Reception",
            "-o",
            path_str(&order),
        ]),
        "ubl2wamas",
    );
    assert_success(
        &run_wamas(&["wamas2wamas", path_str(&order), "-o", path_str(&confirmation)]),
        "wamas2wamas",
    );

    let output = run_wamas(&["wamas2ubl", path_str(&confirmation), "-f", "dict"]);
    assert_success(&output, "wamas2ubl -f dict");
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(json["WEAKQ"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["WEAPQ"].as_array().map(Vec::len), Some(1));
}

#[test]
fn dict2wamas_encodes_master_data() {
    let output = run_wamas(&[
        "dict2wamas",
        &testdata_path("dict/customer_preferences.json"),
        "-t",
        "CustomerDeliveryPreferences",
    ]);
    assert_success(&output, "dict2wamas");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|line| line[40..].starts_with("KSTAUS")));
}

#[test]
fn config_sets_system_names() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = dir.path().join("wamas.yaml");
    fs::write(&config, "erp_system: SAP\nwamas_system: LAGER\n").expect("config written");

    let output = run_wamas(&[
        "--config",
        path_str(&config),
        "dict2wamas",
        &testdata_path("dict/supplier.json"),
        "-t",
        "Supplier",
    ]);
    assert_success(&output, "dict2wamas with config");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("SAP       LAGER     "));
}

#[test]
fn unknown_document_type_fails_without_output() {
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("out.wamas");

    let output = run_wamas(&[
        "ubl2wamas",
        &testdata_path("ubl/picking.xml"),
        "-t",
        "Invoice",
        "-o",
        path_str(&target),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unsupported document"), "stderr: {stderr}");
    assert!(!target.exists());
}

#[test]
fn missing_input_reports_the_path() {
    let output = run_wamas(&["wamas2ubl", "/path/that/does/not/exist.wamas"]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("reading /path/that/does/not/exist.wamas"), "stderr: {stderr}");
}

#[test]
fn remap_of_master_data_fails() {
    let dir = tempfile::tempdir().expect("temp dir");
    let supplier = dir.path().join("supplier.wamas");
    assert_success(
        &run_wamas(&[
            "dict2wamas",
            &testdata_path("dict/supplier.json"),
            "-t",
            "supplier",
            "-o",
            path_str(&supplier),
        ]),
        "dict2wamas",
    );

    let output = run_wamas(&["wamas2wamas", path_str(&supplier)]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("LST"));
}
