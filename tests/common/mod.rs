#![allow(dead_code)]

//! Scripted single-connection FTP server for driving a `Session`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::panic;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use ftp_session::{Session, SessionConfig};

const STUB_TIMEOUT: Duration = Duration::from_secs(5);

pub struct StubServer {
    port: u16,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Accepts one control connection and runs `script` against it.
    pub fn start<F>(script: F) -> StubServer
    where
        F: FnOnce(&mut Stub) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut stub = Stub::new(stream);
            script(&mut stub);
        });
        StubServer { port, handle }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the script to end and re-raises its panic, if any.
    pub fn finish(self) {
        if let Err(cause) = self.handle.join() {
            panic::resume_unwind(cause);
        }
    }
}

pub struct Stub {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Stub {
    fn new(stream: TcpStream) -> Stub {
        stream.set_read_timeout(Some(STUB_TIMEOUT)).unwrap();
        let writer = stream.try_clone().unwrap();
        Stub {
            reader: BufReader::new(stream),
            writer,
        }
    }

    pub fn reply(&mut self, line: &str) {
        write!(self.writer, "{}\r\n", line).unwrap();
    }

    /// Reads one command and checks that it starts with `prefix`.
    pub fn expect(&mut self, prefix: &str) -> String {
        let mut line = String::new();
        self.reader.read_line(&mut line).unwrap();
        let line = line.trim_end().to_string();
        assert!(
            line.starts_with(prefix),
            "expected {:?}, client sent {:?}",
            prefix,
            line
        );
        line
    }

    /// Greeting, `USER` and `PASS`, answered the usual way.
    pub fn login(&mut self) {
        self.reply("220 stub ready");
        self.expect("USER");
        self.reply("331 Please specify the password.");
        self.expect("PASS");
        self.reply("230 Login successful.");
    }

    /// Answers `PASV` with a freshly bound data listener.
    pub fn passive(&mut self) -> TcpListener {
        self.expect("PASV");
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        self.reply(&format!(
            "227 Entering Passive Mode (127,0,0,1,{},{}).",
            port >> 8,
            port & 0xff
        ));
        listener
    }

    pub fn quit(&mut self) {
        self.expect("QUIT");
        self.reply("221 Goodbye.");
    }

    /// Blocks until the client closes the control connection.
    pub fn wait_for_close(&mut self) {
        let mut rest = Vec::new();
        let _ = self.reader.read_to_end(&mut rest);
    }
}

pub fn accept_data(listener: &TcpListener) -> TcpStream {
    let (stream, _) = listener.accept().unwrap();
    stream.set_read_timeout(Some(STUB_TIMEOUT)).unwrap();
    stream
}

pub fn config() -> SessionConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    SessionConfig::default()
        .with_default_host("127.0.0.1")
        .with_timeout(STUB_TIMEOUT)
}

/// A session logged in to `server`.
pub fn connected(server: &StubServer, config: SessionConfig) -> Session {
    let mut session = Session::new(config);
    session
        .connect("127.0.0.1", Some(server.port()), "doe", "mumble")
        .unwrap();
    session
}
