//! End-to-end tests of the `ribex` binary on text inputs.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RIB_TEXT: &str = "RELEVE D'IDENTITE BANCAIRE
Titulaire du compte : M. JEAN DUPONT
IBAN : FR76 3000 6000 0112 3456 7890 189
BIC : AGRIFRPP
";

fn ribex(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ribex").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("GEMINI_API_KEY");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.display().to_string()
}

#[test]
fn test_process_text_json() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "rib.txt", RIB_TEXT);

    ribex(&dir)
        .args(["process", &input])
        .assert()
        .success()
        .stdout(predicate::str::contains("FR76 3000 6000 0112 3456 7890 189"))
        .stdout(predicate::str::contains("\"bank_code\": \"30006\""))
        .stdout(predicate::str::contains("AGRIFRPP"));
}

#[test]
fn test_process_empty_text_csv() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "vide.txt", "   \n");

    ribex(&dir)
        .args(["process", &input, "-f", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fichier,Statut,Titulaire du compte"))
        .stdout(predicate::str::contains("vide.txt,ERREUR: OCR vide"))
        .stdout(predicate::str::contains("MANQUANT"));
}

#[test]
fn test_process_missing_file() {
    let dir = TempDir::new().unwrap();

    ribex(&dir)
        .args(["process", "/nonexistent/rib.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "rib.docx", "IBAN");

    ribex(&dir)
        .args(["process", &input])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}

#[test]
fn test_vision_requires_api_key() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "rib.png", "not really a png");

    ribex(&dir)
        .args(["process", &input, "--vision"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GEMINI_API_KEY"));
}

#[test]
fn test_batch_csv_in_input_order() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.txt", RIB_TEXT);
    write(dir.path(), "b.txt", "");
    write(dir.path(), "c.txt", "Code Banque 12345\nCode Guichet 67890\nCompte AB1234567890Z");
    let pattern = format!("{}/*.txt", dir.path().display());
    let out = dir.path().join("out").join("ribs.csv");

    ribex(&dir)
        .args(["batch", &pattern, "-f", "csv", "-j", "3", "--summary", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("2 successful, 1 failed"));

    let csv = fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].starts_with("a.txt,OK,M. JEAN DUPONT"));
    assert!(lines[2].starts_with("b.txt,ERREUR"));
    assert!(lines[3].contains("FR28 1234 5678 9012 3456 7890 Z53"));
}

#[test]
fn test_batch_no_match() {
    let dir = TempDir::new().unwrap();
    let pattern = format!("{}/*.pdf", dir.path().display());

    ribex(&dir)
        .args(["batch", &pattern])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No matching files"));
}

#[test]
fn test_config_roundtrip() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("ribex.json").display().to_string();

    ribex(&dir)
        .args(["config", "init", "-o", &config])
        .assert()
        .success();

    ribex(&dir)
        .args(["-c", &config, "config", "set", "ocr.languages", r#"["fra"]"#])
        .assert()
        .success();

    ribex(&dir)
        .args(["-c", &config, "config", "get", "ocr.languages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"fra\"").and(predicate::str::contains("eng").not()));

    ribex(&dir)
        .args(["-c", &config, "config", "set", "ocr.nope", "1"])
        .assert()
        .failure();
}
