//! Listing and file transfer over the data connection.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::cancel::CancelHandle;
use super::reply::Reply;
use super::session::Session;
use super::status;
use super::types::{FtpError, RemoteEntry, Result, TransferDirection, TransferRequest};

impl Session {
    /// Runs `LIST` on the current directory and returns one entry per
    /// non-blank line, named after the line's last whitespace separated
    /// token.
    pub fn list_remote_files(&mut self) -> Result<Vec<RemoteEntry>> {
        self.run("FtpListFiles", Session::list)
    }

    /// Stores the file at `local_path` on the server as `remote_name` and
    /// returns the number of bytes sent.
    ///
    /// Fails with [`FtpError::LocalFileNotFound`] before any network I/O
    /// when `local_path` is not a file.
    pub fn upload_file<P: AsRef<Path>>(&mut self, local_path: P, remote_name: &str) -> Result<u64> {
        let request = TransferRequest {
            direction: TransferDirection::Upload,
            local_path: local_path.as_ref().to_path_buf(),
            remote_name: remote_name.to_string(),
        };
        self.run("FtpUploadFile", move |session| session.transfer(&request))
    }

    /// Retrieves `remote_name` into `local_dir` and returns the number of
    /// bytes received. The local file takes the last component of
    /// `remote_name`.
    ///
    /// Fails with [`FtpError::LocalFileNotFound`] before any network I/O
    /// when `local_dir` is not a directory. The file is written next to its
    /// final name with a `.part` suffix and only renamed once the server
    /// confirms the transfer, so a failed download never replaces an
    /// existing file.
    pub fn download_file<P: AsRef<Path>>(
        &mut self,
        local_dir: P,
        remote_name: &str,
    ) -> Result<u64> {
        let request = TransferRequest {
            direction: TransferDirection::Download,
            local_path: local_dir.as_ref().to_path_buf(),
            remote_name: remote_name.to_string(),
        };
        self.run("FtpDownloadFile", move |session| session.transfer(&request))
    }

    fn list(&mut self) -> Result<Vec<RemoteEntry>> {
        self.start_data_command("LIST", FtpError::ListFailed)?;

        let mut entries = Vec::new();
        {
            let data = self.data.as_mut().ok_or(FtpError::NotConnected)?;
            let mut reader = BufReader::new(data);
            let mut line = Vec::new();
            loop {
                line.clear();
                let n = reader
                    .read_until(b'\n', &mut line)
                    .map_err(FtpError::from_data_io)?;
                if n == 0 {
                    break;
                }
                if let Some(entry) = RemoteEntry::from_list_line(&String::from_utf8_lossy(&line)) {
                    entries.push(entry);
                }
            }
        }
        self.cancel.checkpoint()?;

        self.finish_data_command(FtpError::ListFailed)?;
        debug!("listed {} entries", entries.len());
        Ok(entries)
    }

    fn transfer(&mut self, request: &TransferRequest) -> Result<u64> {
        match request.direction {
            TransferDirection::Upload => self.upload(request),
            TransferDirection::Download => self.download(request),
        }
    }

    fn upload(&mut self, request: &TransferRequest) -> Result<u64> {
        let path = &request.local_path;
        if !path.is_file() {
            return Err(FtpError::LocalFileNotFound(path.clone()));
        }
        let mut file = File::open(path).map_err(|source| FtpError::LocalIo {
            path: path.clone(),
            source,
        })?;

        self.start_data_command(&request.command(), FtpError::TransferFailed)?;
        let result = self
            .send_to_data(&mut file, path)
            .and_then(|sent| self.finish_data_command(FtpError::TransferFailed).map(|_| sent));
        match result {
            Ok(sent) => {
                debug!("stored {} ({} bytes)", request.remote_name, sent);
                Ok(sent)
            }
            Err(err) => {
                warn!(
                    "upload of {} failed, remote file {} may be truncated",
                    path.display(),
                    request.remote_name
                );
                Err(err)
            }
        }
    }

    fn download(&mut self, request: &TransferRequest) -> Result<u64> {
        let dir = &request.local_path;
        if !dir.is_dir() {
            return Err(FtpError::LocalFileNotFound(dir.clone()));
        }
        let target = download_target(dir, &request.remote_name)?;
        let partial = partial_path(&target);
        let mut file = File::create(&partial).map_err(|source| FtpError::LocalIo {
            path: partial.clone(),
            source,
        })?;

        let result = self.receive_into(request, &mut file, &partial);
        drop(file);
        match result {
            Ok(received) => {
                fs::rename(&partial, &target).map_err(|source| FtpError::LocalIo {
                    path: target.clone(),
                    source,
                })?;
                debug!("retrieved {} ({} bytes)", request.remote_name, received);
                Ok(received)
            }
            Err(err) => {
                discard_partial(&partial);
                Err(err)
            }
        }
    }

    fn receive_into(
        &mut self,
        request: &TransferRequest,
        file: &mut File,
        partial: &Path,
    ) -> Result<u64> {
        self.start_data_command(&request.command(), FtpError::TransferFailed)?;
        let received = {
            let data = self.data.as_mut().ok_or(FtpError::NotConnected)?;
            copy_chunks(
                data,
                file,
                self.config.buffer_size,
                &self.cancel,
                FtpError::from_data_io,
                |source| FtpError::LocalIo {
                    path: partial.to_path_buf(),
                    source,
                },
            )?
        };
        file.sync_all().map_err(|source| FtpError::LocalIo {
            path: partial.to_path_buf(),
            source,
        })?;
        self.finish_data_command(FtpError::TransferFailed)?;
        Ok(received)
    }

    fn send_to_data(&mut self, file: &mut File, path: &Path) -> Result<u64> {
        let data = self.data.as_mut().ok_or(FtpError::NotConnected)?;
        copy_chunks(
            file,
            data,
            self.config.buffer_size,
            &self.cancel,
            |source| FtpError::LocalIo {
                path: path.to_path_buf(),
                source,
            },
            FtpError::from_data_io,
        )
    }

    /// Opens the data connection, sends `command` and reads the reply that
    /// starts the transfer. After a `1xx` reply the completion reply is
    /// still to come and `completion_pending` is set. A negative reply
    /// closes the data connection and is turned into an error by `failure`.
    fn start_data_command(
        &mut self,
        command: &str,
        failure: fn(Reply) -> FtpError,
    ) -> Result<()> {
        self.ensure_data_channel()?;
        let reply = self.control_mut()?.execute(command)?;
        if status::is_negative(reply.code()) {
            self.close_data();
            return Err(failure(reply));
        }
        self.completion_pending = reply.code() < status::COMMAND_OK;
        Ok(())
    }

    /// Closes the data connection, then reads the completion reply so the
    /// next command's reply is not mistaken for it.
    fn finish_data_command(&mut self, failure: fn(Reply) -> FtpError) -> Result<()> {
        self.close_data();
        if !std::mem::take(&mut self.completion_pending) {
            return Ok(());
        }
        let reply = self.control_mut()?.read_reply()?;
        if status::is_negative(reply.code()) {
            return Err(failure(reply));
        }
        Ok(())
    }

    /// Abandons the open data connection with `ABOR`.
    ///
    /// While the interrupted command's completion reply is outstanding the
    /// server sends two replies: that completion reply (`426`, or `226` if
    /// the transfer ended first) and then the acknowledgement of `ABOR`.
    /// Otherwise only the acknowledgement comes back.
    pub(crate) fn abort_data(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.completion_pending);
        let control = self.control_mut()?;
        let reply = control.execute("ABOR")?;
        if pending {
            let ack = control.read_reply()?;
            debug!("ABOR answered with {} then {}", reply.code(), ack);
        }
        self.close_data();
        Ok(())
    }
}

/// Copies until `reader` is exhausted, then flushes `writer`. A cancel that
/// cut the copy short shows up as `Cancelled` even though the shut down
/// socket looks like an ordinary end of stream.
fn copy_chunks<R, W, RE, WE>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    cancel: &CancelHandle,
    read_err: RE,
    write_err: WE,
) -> Result<u64>
where
    R: Read,
    W: Write,
    RE: Fn(io::Error) -> FtpError,
    WE: Fn(io::Error) -> FtpError,
{
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(read_err(err)),
        };
        writer.write_all(&buf[..n]).map_err(&write_err)?;
        total += n as u64;
    }
    writer.flush().map_err(&write_err)?;
    cancel.checkpoint()?;
    Ok(total)
}

fn download_target(dir: &Path, remote_name: &str) -> Result<PathBuf> {
    match Path::new(remote_name).file_name() {
        Some(name) => Ok(dir.join(name)),
        None => Err(FtpError::LocalIo {
            path: dir.join(remote_name),
            source: io::Error::new(io::ErrorKind::InvalidInput, "remote name has no file name"),
        }),
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn discard_partial(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => debug!("removed partial download {}", partial.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "could not remove {}, it may hold a truncated download: {}",
            partial.display(),
            err
        ),
    }
}
