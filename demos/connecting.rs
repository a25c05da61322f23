use std::env;
use std::fs;

use ftp_session::{Result, Session, SessionConfig};

fn test_ftp(host: &str, user: &str, pass: &str) -> Result<()> {
    let mut session = Session::new(SessionConfig::default());
    session.connect(host, Some(21), user, pass)?;
    println!("current dir: {}", session.print_working_directory()?);

    for entry in session.list_remote_files()? {
        println!("remote: {}", entry.name);
    }

    let local_dir = env::temp_dir();
    let bytes = session.download_file(&local_dir, "ftpext-charter.txt")?;
    println!("got {} bytes into {}", bytes, local_dir.display());

    let upload = local_dir.join("my_random_file.txt");
    fs::write(&upload, "Some awesome file data man!!").map_err(|source| {
        ftp_session::FtpError::LocalIo {
            path: upload.clone(),
            source,
        }
    })?;
    session.upload_file(&upload, "my_random_file.txt")?;

    session.disconnect()
}

fn main() {
    env_logger::init();

    let mut args = env::args().skip(1);
    let host = args.next().unwrap_or_default();
    let user = args.next().unwrap_or_default();
    let pass = args.next().unwrap_or_default();

    test_ftp(&host, &user, &pass).unwrap_or_else(|err|
        panic!("{}", err)
    );
    println!("test successful")
}
