mod common;

use std::fs;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use log::{Level, LevelFilter, Log, Metadata, Record};

use common::{accept_data, connected, StubServer};
use ftp_session::{FtpError, SessionConfig};

/// Collects warnings; this file holds one test so it owns the logger.
struct Warnings(Mutex<Vec<String>>);

impl Log for Warnings {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.0.lock().unwrap().push(record.args().to_string());
        }
    }

    fn flush(&self) {}
}

static WARNINGS: Warnings = Warnings(Mutex::new(Vec::new()));

#[test]
fn failed_upload_warns_about_truncated_remote_file() {
    log::set_logger(&WARNINGS).unwrap();
    log::set_max_level(LevelFilter::Warn);

    let server = StubServer::start(|stub| {
        stub.login();
        let listener = stub.passive();
        stub.expect("STOR remote.bin");
        stub.reply("150 Ok to send data.");
        let mut data = accept_data(&listener);
        let mut stored = Vec::new();
        data.read_to_end(&mut stored).unwrap();
        stub.reply("451 Requested action aborted: local error in processing.");
        stub.wait_for_close();
    });

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.bin");
    fs::write(&local, vec![3u8; 4096]).unwrap();

    let config = SessionConfig::default()
        .with_default_host("127.0.0.1")
        .with_timeout(Duration::from_secs(5));
    let mut session = connected(&server, config);
    assert!(matches!(
        session.upload_file(&local, "remote.bin"),
        Err(FtpError::TransferFailed(_))
    ));
    assert!(session.is_connected());

    let warnings = WARNINGS.0.lock().unwrap().clone();
    assert!(
        warnings
            .iter()
            .any(|line| line.contains("remote file remote.bin may be truncated")),
        "{:?}",
        warnings
    );

    drop(session);
    server.finish();
}
