// Walks the real binary from the home screen into a session and back out
// through a pseudo terminal (expectrl). Unix only, and ignored by default
// since it needs a PTY:
//   cargo test --test integration_min_session -- --ignored

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn minimal_session_starts_stops_and_exits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let bin = assert_cmd::cargo::cargo_bin("zazen");
    let cmd = format!(
        "env HOME={} {} -m 10 --no-music",
        home.path().display(),
        bin.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));

    // home -> setup -> guide -> meditating
    p.send("\r")?;
    p.send("\r")?;
    p.send("\r")?;
    std::thread::sleep(Duration::from_millis(1_200));

    // stop, then discard the results form
    p.send("s")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?; // ESC
    std::thread::sleep(Duration::from_millis(200));

    p.send("q")?;
    p.expect(Eof)?;
    Ok(())
}
