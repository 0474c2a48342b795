use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

fn catalog() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "token, amount, brand_name, campaign_name, payout_target, expires_at").unwrap();
    writeln!(file, "abc123, 50.00, Acme, Summer cashback, UPI ***@okbank, ").unwrap();
    writeln!(file, "old, 5.00, , , , 2000-01-01T00:00:00Z").unwrap();
    writeln!(file, "broken, not_a_number, , , , ").unwrap();
    file
}

fn frames(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

#[test]
fn test_canonicalize_prints_one_token_per_payload() {
    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.args([
        "canonicalize",
        "https://app.example/redeem/abc123?x=1",
        "#abc123",
        "   ",
    ]);

    cmd.assert()
        .success()
        .stdout("abc123\nabc123\nunrecognized\n");
}

#[test]
fn test_redeem_end_to_end() {
    let catalog = catalog();
    let frames = frames(&["-", "~", "#", "https://app.example/scan/abc123"]);

    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.arg("redeem")
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--frames")
        .arg(frames.path());

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading catalog entry"))
        .stdout(predicate::str::contains(r#""view":"success""#))
        .stdout(predicate::str::contains(r#""amount":"50.00""#))
        .stdout(predicate::str::contains(r#""brand_name":"Acme""#));
}

#[test]
fn test_redeem_expired_code_renders_failure() {
    let catalog = catalog();
    let frames = frames(&["/redeem/old"]);

    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.arg("redeem")
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--frames")
        .arg(frames.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""view":"failure""#))
        .stdout(predicate::str::contains("This QR code has expired"));
}

#[test]
fn test_redeem_times_out_without_a_code() {
    let catalog = catalog();
    let frames = frames(&["-", "-"]);

    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.arg("redeem")
        .arg("--catalog")
        .arg(catalog.path())
        .arg("--frames")
        .arg(frames.path())
        .arg("--timeout-ms")
        .arg("200");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No QR code recognised within 200 ms"));
}

#[test]
fn test_payout_prints_every_observed_status() {
    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.args([
        "--poll-interval-ms",
        "10",
        "payout",
        "--statuses",
        "pending,error,processing,completed",
        "--amount",
        "120.5",
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""status":"pending""#))
        .stdout(predicate::str::contains(r#""status":"processing""#))
        .stdout(predicate::str::contains(r#""headline":"Payout completed""#))
        .stdout(predicate::str::contains(r#""amount":"120.50""#))
        .stdout(predicate::str::contains(r#""method":"UPI""#));
}

#[test]
fn test_payout_gives_up_after_error_ceiling() {
    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.args([
        "--poll-interval-ms",
        "10",
        "--max-poll-errors",
        "2",
        "payout",
        "--statuses",
        "pending,error,error,completed",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Status of payout P1"));
}

#[test]
fn test_payout_rejects_unsettled_script() {
    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.args(["payout", "--statuses", "pending,processing"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("status script must end"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut cmd = Command::new(cargo_bin!("scan2redeem"));
    cmd.args(["--frame-rate", "0", "canonicalize", "abc"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("frame rate must be between"));
}
