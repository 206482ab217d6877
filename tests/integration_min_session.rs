// Drives the compiled binary through a pseudo terminal: start on an empty
// data directory, press q, expect a clean exit.
//
// Unix-only and ignored by default. Run with
// `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn fresh_start_quits_on_q() -> Result<(), Box<dyn std::error::Error>> {
    let data = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("rowmark");
    let cmd = format!("{} --data-dir {}", bin.display(), data.path().display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));
    p.send("q")?;
    p.expect(Eof)?;

    assert!(data.path().join("blobs.db").exists());
    Ok(())
}
