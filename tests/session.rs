mod common;

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use common::{config, connected, StubServer};
use ftp_session::{FtpError, Session, SessionState};

#[test]
fn login_records_three_replies() {
    let server = StubServer::start(|stub| {
        stub.reply("220 ok");
        stub.expect("USER doe");
        stub.reply("230 logged in");
        stub.expect("PASS mumble");
        stub.reply("230 logged in");
        stub.wait_for_close();
    });

    let mut session = Session::new(config());
    session
        .connect("127.0.0.1", Some(server.port()), "doe", "mumble")
        .unwrap();
    assert!(session.is_connected());
    assert_eq!(
        session.transcript().lines(),
        vec!["220 ok", "230 logged in", "230 logged in"]
    );

    drop(session);
    server.finish();
}

#[test]
fn rejected_password_leaves_session_disconnected() {
    let server = StubServer::start(|stub| {
        stub.reply("220 ok");
        stub.expect("USER");
        stub.reply("331 password please");
        stub.expect("PASS");
        stub.reply("530 Login incorrect");
        stub.wait_for_close();
    });

    let mut session = Session::new(config());
    let err = session
        .connect("127.0.0.1", Some(server.port()), "doe", "wrong")
        .unwrap_err();
    match err {
        FtpError::AuthenticationRejected(reply) => assert_eq!(reply.code(), 530),
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(session.state(), SessionState::Disconnected);

    let lines = session.transcript().lines();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "530 Login incorrect");
    assert!(lines[3].starts_with("FtpConnect "), "{:?}", lines[3]);

    server.finish();
}

#[test]
fn pass_reply_below_500_logs_in() {
    for code in [200, 230, 331, 421, 499] {
        let server = StubServer::start(move |stub| {
            stub.reply("220 ok");
            stub.expect("USER");
            stub.reply("331 password please");
            stub.expect("PASS");
            stub.reply(&format!("{} whatever", code));
            stub.wait_for_close();
        });
        let session = connected(&server, config());
        assert_eq!(session.state(), SessionState::Connected, "PASS code {}", code);
        drop(session);
        server.finish();
    }

    for code in [500, 503, 599] {
        let server = StubServer::start(move |stub| {
            stub.reply("220 ok");
            stub.expect("USER");
            stub.reply("331 password please");
            stub.expect("PASS");
            stub.reply(&format!("{} nope", code));
            stub.wait_for_close();
        });
        let mut session = Session::new(config());
        let result = session.connect("127.0.0.1", Some(server.port()), "doe", "x");
        assert!(matches!(result, Err(FtpError::AuthenticationRejected(_))), "PASS code {}", code);
        assert_eq!(session.state(), SessionState::Disconnected);
        server.finish();
    }
}

#[test]
fn empty_fields_take_defaults() {
    let server = StubServer::start(|stub| {
        stub.reply("220 ok");
        stub.expect("USER anonymous");
        stub.reply("331 any password");
        stub.expect("PASS");
        stub.reply("230 welcome");
        stub.wait_for_close();
    });

    let mut session = Session::new(config().with_default_port(server.port()));
    session.connect("", None, "", "").unwrap();
    assert!(session.is_connected());

    drop(session);
    server.finish();
}

#[test]
fn operations_need_a_connection() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    std::fs::write(&file, b"a").unwrap();

    let mut session = Session::new(config());
    assert!(matches!(session.list_remote_files(), Err(FtpError::NotConnected)));
    assert!(matches!(session.upload_file(&file, "a.txt"), Err(FtpError::NotConnected)));
    assert!(matches!(session.download_file(dir.path(), "a.txt"), Err(FtpError::NotConnected)));
    assert!(matches!(session.open_data_channel(), Err(FtpError::NotConnected)));
    assert!(matches!(session.noop(), Err(FtpError::NotConnected)));
    assert!(matches!(session.disconnect(), Err(FtpError::NotConnected)));
    assert_eq!(session.state(), SessionState::Disconnected);

    let lines = session.transcript().lines();
    assert_eq!(lines[0], "FtpListFiles not connected");
    assert_eq!(lines[5], "FtpDisconnect not connected");
}

#[test]
fn reply_timeout_during_login_disconnects() {
    let server = StubServer::start(|stub| {
        stub.reply("220 ok");
        stub.expect("USER");
        stub.wait_for_close();
    });

    let mut session = Session::new(config().with_timeout(Duration::from_millis(300)));
    let err = session
        .connect("127.0.0.1", Some(server.port()), "doe", "mumble")
        .unwrap_err();
    assert!(matches!(err, FtpError::OperationTimeout), "{:?}", err);
    assert!(err.is_fatal());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(matches!(session.noop(), Err(FtpError::NotConnected)));

    server.finish();
}

#[test]
fn reply_timeout_while_connected_disconnects() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.expect("NOOP");
        stub.wait_for_close();
    });

    let mut session = connected(&server, config().with_timeout(Duration::from_millis(300)));
    assert!(matches!(session.noop(), Err(FtpError::OperationTimeout)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(matches!(session.list_remote_files(), Err(FtpError::NotConnected)));

    server.finish();
}

#[test]
fn disconnect_sends_quit() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.quit();
        stub.wait_for_close();
    });

    let mut session = connected(&server, config());
    session.disconnect().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.transcript().lines().last().unwrap(), "221 Goodbye.");
    assert!(matches!(session.disconnect(), Err(FtpError::NotConnected)));

    server.finish();
}

#[test]
fn connect_twice_is_refused() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.wait_for_close();
    });

    let mut session = connected(&server, config());
    let err = session
        .connect("127.0.0.1", Some(server.port()), "doe", "mumble")
        .unwrap_err();
    assert!(matches!(
        err,
        FtpError::InvalidTransition {
            state: SessionState::Connected,
            ..
        }
    ));
    assert!(session.is_connected());

    drop(session);
    server.finish();
}

#[test]
fn refused_connection() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut session = Session::new(config());
    let err = session.connect("127.0.0.1", Some(port), "doe", "x").unwrap_err();
    assert!(matches!(err, FtpError::ConnectRefused { .. }), "{:?}", err);
    assert_eq!(session.state(), SessionState::Disconnected);
    let lines = session.transcript().lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("FtpConnect could not connect to 127.0.0.1:"));
}

#[test]
fn multi_line_greeting_is_consumed() {
    let server = StubServer::start(|stub| {
        stub.reply("220-Welcome to the stub");
        stub.reply("   no code on this line");
        stub.reply("220-still greeting");
        stub.reply("220 ready");
        stub.expect("USER");
        stub.reply("331 password please");
        stub.expect("PASS");
        stub.reply("230 ok");
        stub.wait_for_close();
    });

    let session = connected(&server, config());
    let lines = session.transcript().lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[1], "   no code on this line");
    assert_eq!(lines[5], "230 ok");

    drop(session);
    server.finish();
}

#[test]
fn malformed_greeting_is_fatal() {
    let server = StubServer::start(|stub| {
        stub.reply("hello there");
        stub.wait_for_close();
    });

    let mut session = Session::new(config());
    let err = session
        .connect("127.0.0.1", Some(server.port()), "doe", "x")
        .unwrap_err();
    assert!(matches!(err, FtpError::MalformedReply(ref line) if line == "hello there"));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.transcript().lines()[0], "hello there");

    server.finish();
}

#[test]
fn server_hangup_is_fatal() {
    let server = StubServer::start(|stub| {
        stub.reply("220 ok");
        stub.expect("USER");
    });

    let mut session = Session::new(config());
    let err = session
        .connect("127.0.0.1", Some(server.port()), "doe", "x")
        .unwrap_err();
    assert!(
        matches!(err, FtpError::ConnectionClosed | FtpError::Transport(_)),
        "{:?}",
        err
    );
    assert_eq!(session.state(), SessionState::Disconnected);

    server.finish();
}

#[test]
fn directory_commands() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.expect("CWD pub");
        stub.reply("250 Directory successfully changed.");
        stub.expect("PWD");
        stub.reply("257 \"/pub\" is the current directory");
        stub.expect("CWD missing");
        stub.reply("550 Failed to change directory.");
        stub.expect("TYPE I");
        stub.reply("200 Switching to Binary mode.");
        stub.expect("NOOP");
        stub.reply("200 NOOP ok.");
        stub.wait_for_close();
    });

    let mut session = connected(&server, config());
    session.change_directory("pub").unwrap();
    assert_eq!(session.print_working_directory().unwrap(), "/pub");

    let err = session.change_directory("missing").unwrap_err();
    assert_eq!(err.reply_code(), Some(550));
    assert!(!err.is_fatal());
    assert!(session.is_connected());

    session.set_transfer_type(ftp_session::FileType::Binary).unwrap();
    session.noop().unwrap();

    drop(session);
    server.finish();
}

#[test]
fn cancel_while_waiting_on_control_disconnects() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.expect("NOOP");
        stub.wait_for_close();
    });

    let mut session = connected(&server, config());
    let cancel = session.cancel_handle();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        cancel.cancel();
    });

    assert!(matches!(session.noop(), Err(FtpError::Cancelled)));
    assert_eq!(session.state(), SessionState::Disconnected);
    canceller.join().unwrap();

    server.finish();
}

#[test]
fn cancel_between_calls_is_ignored() {
    let server = StubServer::start(|stub| {
        stub.login();
        stub.expect("NOOP");
        stub.reply("200 NOOP ok.");
        stub.wait_for_close();
    });

    let mut session = connected(&server, config());
    let cancel = session.cancel_handle();
    cancel.cancel();
    assert!(!cancel.is_cancelled());

    session.noop().unwrap();
    assert!(session.is_connected());

    drop(session);
    server.finish();
}

#[test]
fn write_timeout_disconnects() {
    let server = StubServer::start(|stub| {
        stub.login();
        // Never read, so the client's writes back up.
        thread::sleep(Duration::from_secs(2));
    });

    let mut session = connected(&server, config().with_timeout(Duration::from_millis(300)));
    let path = "x".repeat(32 << 20);
    let err = session.change_directory(&path).unwrap_err();
    assert!(matches!(err, FtpError::OperationTimeout), "{:?}", err);
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(matches!(session.noop(), Err(FtpError::NotConnected)));

    server.finish();
}
