//! CLI tests: spawn the built `catalog` binary against throw-away databases
//! with embeddings disabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn catalog_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("catalog");
    path
}

const PRODUCTS_CSV: &str = "\
Handle,Title,Vendor,Option1 Name,Option1 Value,Variant SKU,Variant Price,SEO Description,Status
shirt,Red Cotton Shirt,Acme,Size,M,SHRT-M,19.99,A red cotton shirt,active
shirt,,,Size,L,SHRT-L,21.99,,
shirt,,,Size,XL,,23.99,,
mug,Draft Mug,Acme,,,MUG-1,N/A,,draft
";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(root.join("products.csv"), PRODUCTS_CSV).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/catalog.sqlite"

[vector]
path = "{root}/data/vectors.sqlite"

[embedding]
provider = "disabled"

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("catalog.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_catalog(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = catalog_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run catalog binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn products_csv(config_path: &Path) -> String {
    // config/catalog.toml -> <root>/products.csv
    let root = config_path.parent().unwrap().parent().unwrap();
    root.join("products.csv").to_str().unwrap().to_string()
}

#[test]
fn test_init_creates_databases() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_catalog(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/catalog.sqlite").exists());
    assert!(tmp.path().join("data/vectors.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_catalog(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_catalog(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_reports_counts() {
    let (_tmp, config_path) = setup_test_env();
    let csv = products_csv(&config_path);

    let (stdout, stderr, success) =
        run_catalog(&config_path, &["ingest", &csv, "--tenant", "acme"]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows read: 4"));
    assert!(stdout.contains("rows filtered (draft/unpublished): 1"));
    assert!(stdout.contains("rows rejected (missing SKU): 1"));
    assert!(stdout.contains("variants processed: 2"));
    assert!(stdout.contains("tenant created"));
    assert!(stdout.contains("vectors pending: 2"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_twice_keeps_one_row_per_sku() {
    let (_tmp, config_path) = setup_test_env();
    let csv = products_csv(&config_path);

    run_catalog(&config_path, &["ingest", &csv, "--tenant", "acme"]);
    let (stdout, _, success) = run_catalog(&config_path, &["ingest", &csv, "--tenant", "acme"]);
    assert!(success);
    assert!(!stdout.contains("tenant created"));

    let (stdout, stderr, success) = run_catalog(&config_path, &["stats", "--tenant", "acme"]);
    assert!(success, "stats failed: stderr={}", stderr);
    let row = stdout
        .lines()
        .find(|l| l.trim_start().starts_with("acme"))
        .unwrap_or_else(|| panic!("no acme row in: {}", stdout));
    let cols: Vec<&str> = row.split_whitespace().collect();
    assert_eq!(cols[1], "Acme");
    assert_eq!(cols[2], "2", "variants column: {}", row);
    assert_eq!(cols[3], "0", "vectors column: {}", row);
}

#[test]
fn test_ingest_missing_required_column_fails() {
    let (tmp, config_path) = setup_test_env();
    let bad = tmp.path().join("bad.csv");
    fs::write(&bad, "Handle,Title\nshirt,Shirt\n").unwrap();

    let (_, stderr, success) = run_catalog(
        &config_path,
        &["ingest", bad.to_str().unwrap(), "--tenant", "acme"],
    );
    assert!(!success);
    assert!(stderr.contains("Variant SKU"), "stderr={}", stderr);

    let (stdout, _, _) = run_catalog(&config_path, &["stats"]);
    assert!(stdout.contains("No tenants."));
}

#[test]
fn test_ingest_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_catalog(
        &config_path,
        &["ingest", "/nonexistent/products.csv", "--tenant", "acme"],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read catalog file"));
}

#[test]
fn test_search_with_embeddings_disabled_fails() {
    let (_tmp, config_path) = setup_test_env();
    let csv = products_csv(&config_path);
    run_catalog(&config_path, &["ingest", &csv, "--tenant", "acme"]);

    let (stdout, stderr, success) =
        run_catalog(&config_path, &["search", "red shirt", "--tenant", "acme"]);
    assert!(!success, "search should fail: stdout={}", stdout);
    assert!(stderr.contains("query embedding failed"), "stderr={}", stderr);
}

#[test]
fn test_reindex_with_embeddings_disabled_fails() {
    let (_tmp, config_path) = setup_test_env();
    let (_, stderr, success) = run_catalog(&config_path, &["reindex", "--tenant", "acme"]);
    assert!(!success);
    assert!(stderr.contains("disabled"));
}

#[test]
fn test_ingest_with_unreachable_catalog_db_is_degraded() {
    let (tmp, config_path) = setup_test_env();
    fs::write(tmp.path().join("blocked"), b"").unwrap();
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("/data/catalog.sqlite", "/blocked/catalog.sqlite");
    fs::write(&config_path, config).unwrap();
    let csv = products_csv(&config_path);

    let (stdout, stderr, success) =
        run_catalog(&config_path, &["ingest", &csv, "--tenant", "acme"]);
    assert!(success, "degraded ingest failed: stderr={}", stderr);
    assert!(stdout.contains("warning: degraded mode"));
    assert!(stdout.contains("relational rows written: 0"));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("provider = \"disabled\"", "provider = \"magic\"");
    fs::write(&config_path, config).unwrap();

    let (_, stderr, success) = run_catalog(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Unknown embedding provider"));
}

#[test]
fn test_completions_need_no_config() {
    let output = Command::new(catalog_binary())
        .args(["--config", "/nonexistent.toml", "completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("catalog"));
}
