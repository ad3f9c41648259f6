//! Line sources for the collector: stdin, a TCP client, or a serial port.

use super::config::SourceKind;
use rig_io::{spawn_line_reader, LinkError};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Line(String),
    Timeout,
    Closed,
}

pub enum RecordSource {
    Stdin(Receiver<String>),
    Tcp(LineBuffer<TcpStream>),
    Serial(LineBuffer<Box<dyn SerialPort>>),
}

impl RecordSource {
    pub fn open(kind: &SourceKind, read_timeout: Duration) -> Result<Self, LinkError> {
        Ok(match kind {
            SourceKind::Stdin => Self::Stdin(spawn_line_reader(io::stdin())),
            SourceKind::Tcp { addr } => {
                let stream = TcpStream::connect(addr)?;
                stream.set_read_timeout(Some(read_timeout))?;
                stream.set_nodelay(true)?;
                info!(addr = %addr, "Connected to rig");
                Self::Tcp(LineBuffer::new(stream))
            }
            SourceKind::Serial { path, baud_rate } => {
                let port = serialport::new(path, *baud_rate)
                    .timeout(read_timeout)
                    .open()?;
                info!(path = %path, baud_rate, "Opened serial source");
                Self::Serial(LineBuffer::new(port))
            }
        })
    }

    /// Wait up to `timeout` for the next complete line.
    ///
    /// Only the stdin source uses `timeout` directly; the socket and serial
    /// sources were opened with it as their read timeout.
    pub fn next_line(&mut self, timeout: Duration) -> io::Result<SourceEvent> {
        match self {
            Self::Stdin(rx) => Ok(match rx.recv_timeout(timeout) {
                Ok(line) => SourceEvent::Line(line),
                Err(RecvTimeoutError::Timeout) => SourceEvent::Timeout,
                Err(RecvTimeoutError::Disconnected) => SourceEvent::Closed,
            }),
            Self::Tcp(lines) => lines.next_line(),
            Self::Serial(lines) => lines.next_line(),
        }
    }

    /// Send a speed command back up the link.
    pub fn send_command(&mut self, rpm: u32) -> io::Result<()> {
        match self {
            Self::Stdin(_) => {
                warn!(rpm, "Stdin source has no return path; speed command not sent");
                Ok(())
            }
            Self::Tcp(lines) => lines.write_line(&rpm.to_string()),
            Self::Serial(lines) => lines.write_line(&rpm.to_string()),
        }
    }
}

/// Accumulates bytes across read timeouts so a line split over two reads is
/// not lost.
pub struct LineBuffer<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: io::Read + Write> LineBuffer<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
        }
    }

    pub fn next_line(&mut self) -> io::Result<SourceEvent> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) if self.pending.is_empty() => Ok(SourceEvent::Closed),
            // Either a full line or whatever was left before EOF.
            Ok(_) => Ok(SourceEvent::Line(self.take_line())),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(SourceEvent::Timeout)
            }
            Err(e) => Err(e),
        }
    }

    fn take_line(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.pending.clear();
        line
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let inner = self.reader.get_mut();
        inner.write_all(line.as_bytes())?;
        inner.write_all(b"\n")?;
        inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    /// In-memory stand-in: reads from a fixed script, records writes.
    struct Loopback {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Loopback {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Loopback {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn buffer(script: &str) -> LineBuffer<Loopback> {
        LineBuffer::new(Loopback {
            input: Cursor::new(script.as_bytes().to_vec()),
            output: Vec::new(),
        })
    }

    #[test]
    fn splits_lines_and_strips_crlf() {
        let mut lines = buffer("600,40.00\r\n700,46.67\n");
        assert_eq!(
            lines.next_line().unwrap(),
            SourceEvent::Line("600,40.00".to_string())
        );
        assert_eq!(
            lines.next_line().unwrap(),
            SourceEvent::Line("700,46.67".to_string())
        );
        assert_eq!(lines.next_line().unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn trailing_partial_line_is_flushed_at_eof() {
        let mut lines = buffer("600,40.0");
        assert_eq!(
            lines.next_line().unwrap(),
            SourceEvent::Line("600,40.0".to_string())
        );
        assert_eq!(lines.next_line().unwrap(), SourceEvent::Closed);
    }

    #[test]
    fn commands_are_newline_terminated() {
        let mut lines = buffer("");
        lines.write_line("600").unwrap();
        assert_eq!(lines.reader.get_ref().output, b"600\n");
    }
}
