//! Line links between the rig and the host: stdio, a single-client TCP
//! listener, or a serial port.

use crate::protocol::encode_record;
use rig_core::{Measurement, RecordStream};
use serialport::SerialPort;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
}

/// Read `reader` line by line on a background thread.
///
/// The channel closes when the reader hits EOF or an error.
pub fn spawn_line_reader<R>(reader: R) -> Receiver<String>
where
    R: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Line reader stopped: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Join everything already queued on `rx`; `None` when nothing was waiting.
fn drain_pending(rx: &Receiver<String>) -> Result<Option<String>, TryRecvError> {
    let mut lines = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(line) => lines.push(line),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                if lines.is_empty() {
                    return Err(TryRecvError::Disconnected);
                }
                break;
            }
        }
    }
    Ok((!lines.is_empty()).then(|| lines.join("\n")))
}

/// Commands on stdin, records on stdout.
pub struct StdioLink {
    input: Option<Receiver<String>>,
    stdout: io::Stdout,
}

impl StdioLink {
    pub fn new() -> Self {
        Self {
            input: Some(spawn_line_reader(io::stdin())),
            stdout: io::stdout(),
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut out = self.stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

impl Default for StdioLink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStream for StdioLink {
    fn poll_input(&mut self) -> io::Result<Option<String>> {
        let Some(rx) = self.input.as_ref() else {
            return Ok(None);
        };
        match drain_pending(rx) {
            Ok(pending) => Ok(pending),
            Err(_) => {
                debug!("stdin closed; no further commands");
                self.input = None;
                Ok(None)
            }
        }
    }

    fn emit_record(&mut self, record: &Measurement) -> io::Result<()> {
        self.write_line(&encode_record(record))
    }

    fn emit_notice(&mut self, message: &str) -> io::Result<()> {
        self.write_line(message)
    }
}

struct TcpClient {
    stream: TcpStream,
    input: Receiver<String>,
}

/// Serves the record stream to one TCP client at a time.
///
/// Records emitted while no client is connected are dropped, the same as a
/// serial line with nothing listening.
pub struct TcpLink {
    listener: TcpListener,
    client: Option<TcpClient>,
}

impl TcpLink {
    pub fn bind(addr: &str) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(addr).map_err(|source| LinkError::Bind {
            addr: addr.to_string(),
            source,
        })?;
        listener.set_nonblocking(true)?;
        info!(addr = %addr, "Record link listening");
        Ok(Self {
            listener,
            client: None,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn accept_pending(&mut self) -> io::Result<()> {
        if self.client.is_some() {
            return Ok(());
        }
        match self.listener.accept() {
            Ok((stream, addr)) => {
                info!(client_addr = %addr, "Host connected");
                stream.set_nonblocking(false)?;
                stream.set_nodelay(true)?;
                stream.set_write_timeout(Some(Duration::from_secs(1)))?;
                let input = spawn_line_reader(stream.try_clone()?);
                self.client = Some(TcpClient { stream, input });
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => {
                warn!("Record link accept error: {}", e);
                Ok(())
            }
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let Some(client) = self.client.as_mut() else {
            return Ok(());
        };
        let result = client
            .stream
            .write_all(line.as_bytes())
            .and_then(|_| client.stream.write_all(b"\n"));
        if let Err(e) = result {
            info!("Host disconnected: {}", e);
            self.client = None;
        }
        Ok(())
    }
}

impl RecordStream for TcpLink {
    fn poll_input(&mut self) -> io::Result<Option<String>> {
        self.accept_pending()?;
        let Some(client) = self.client.as_ref() else {
            return Ok(None);
        };
        match drain_pending(&client.input) {
            Ok(pending) => Ok(pending),
            Err(_) => {
                info!("Host closed the connection");
                self.client = None;
                Ok(None)
            }
        }
    }

    fn emit_record(&mut self, record: &Measurement) -> io::Result<()> {
        self.write_line(&encode_record(record))
    }

    fn emit_notice(&mut self, message: &str) -> io::Result<()> {
        self.accept_pending()?;
        self.write_line(message)
    }
}

/// Longest unterminated input kept while waiting for a line end.
const MAX_PENDING_INPUT: usize = 256;

/// Holds serial bytes until a line terminator arrives.
///
/// A serial command trickles in a byte at a time, so a poll can see `"6"`
/// long before the rest of `"600\r\n"` has arrived.
#[derive(Debug, Default)]
struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    /// Append `bytes` and return every complete line received so far,
    /// joined with `\n`. Blank lines and line terminators are dropped.
    fn push(&mut self, bytes: &[u8]) -> Option<String> {
        self.pending.extend_from_slice(bytes);

        let Some(end) = self
            .pending
            .iter()
            .rposition(|b| *b == b'\n' || *b == b'\r')
        else {
            if self.pending.len() > MAX_PENDING_INPUT {
                warn!(
                    bytes = self.pending.len(),
                    "Discarding unterminated serial input"
                );
                self.pending.clear();
            }
            return None;
        };

        let complete: Vec<u8> = self.pending.drain(..=end).collect();
        let text = String::from_utf8_lossy(&complete);
        let lines: Vec<&str> = text
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}

/// Record stream over a serial port.
pub struct SerialLink {
    port: Box<dyn SerialPort>,
    framer: LineFramer,
}

impl SerialLink {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(10))
            .open()?;
        info!(path = %path, baud_rate, "Opened serial link");
        Ok(Self::from_port(port))
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            framer: LineFramer::default(),
        }
    }
}

impl RecordStream for SerialLink {
    fn poll_input(&mut self) -> io::Result<Option<String>> {
        let available = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if available == 0 {
            return Ok(None);
        }
        let mut buf = vec![0u8; available];
        let n = match self.port.read(&mut buf) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => 0,
            Err(e) => return Err(e),
        };
        Ok(self.framer.push(&buf[..n]))
    }

    fn emit_record(&mut self, record: &Measurement) -> io::Result<()> {
        let line = encode_record(record);
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")
    }

    fn emit_notice(&mut self, message: &str) -> io::Result<()> {
        self.port.write_all(message.as_bytes())?;
        self.port.write_all(b"\r\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn drain_joins_queued_lines() {
        let (tx, rx) = mpsc::channel();
        assert_eq!(drain_pending(&rx), Ok(None));
        tx.send("700".to_string()).unwrap();
        tx.send("900".to_string()).unwrap();
        assert_eq!(drain_pending(&rx), Ok(Some("700\n900".to_string())));
        drop(tx);
        assert!(drain_pending(&rx).is_err());
    }

    #[test]
    fn framer_waits_for_line_end() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.push(b"6"), None);
        assert_eq!(framer.push(b"0"), None);
        assert_eq!(framer.push(b"0"), None);
        assert_eq!(framer.push(b"\r"), Some("600".to_string()));
        // The LF half of CRLF arrives on its own and carries nothing.
        assert_eq!(framer.push(b"\n"), None);
    }

    #[test]
    fn framer_keeps_trailing_partial_line() {
        let mut framer = LineFramer::default();
        assert_eq!(
            framer.push(b"700\r\n900\r\n12"),
            Some("700\n900".to_string())
        );
        assert_eq!(framer.push(b"00\n"), Some("1200".to_string()));
    }

    #[test]
    fn framer_drops_runaway_input() {
        let mut framer = LineFramer::default();
        assert_eq!(framer.push(&[b'9'; MAX_PENDING_INPUT + 1]), None);
        assert_eq!(framer.push(b"450\n"), Some("450".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn serial_link_reassembles_byte_by_byte_command() {
        let (mut host, rig_end) = serialport::TTYPort::pair().expect("pty pair");
        host.set_timeout(Duration::from_secs(1)).unwrap();
        let mut link = SerialLink::from_port(Box::new(rig_end));

        let mut polled = Vec::new();
        for chunk in ["6", "0", "0", "\r\n"] {
            host.write_all(chunk.as_bytes()).unwrap();
            host.flush().unwrap();
            thread::sleep(Duration::from_millis(20));
            polled.push(link.poll_input().unwrap());
        }
        // A CR translated to LF by the line discipline may leave one more
        // terminator queued; it frames to nothing.
        thread::sleep(Duration::from_millis(20));
        assert_eq!(link.poll_input().unwrap(), None);

        assert_eq!(polled, vec![None, None, None, Some("600".to_string())]);

        let constants = rig_core::RigConstants::default();
        let io = rig_core::SimulatedRig::instant(&constants);
        let mut rig = rig_core::TestRig::new(io, constants);
        for raw in polled.iter().flatten() {
            rig.apply_input(raw);
        }
        assert_eq!(rig.state().target_rpm(), 600);
    }

    #[cfg(unix)]
    #[test]
    fn serial_link_writes_crlf_records() {
        let (mut host, rig_end) = serialport::TTYPort::pair().expect("pty pair");
        host.set_timeout(Duration::from_secs(1)).unwrap();
        let mut link = SerialLink::from_port(Box::new(rig_end));
        let record = Measurement {
            motor_rpm: 600,
            gearbox_rpm: 40.0,
            ..Measurement::default()
        };
        link.emit_record(&record).unwrap();

        let mut reader = io::BufReader::new(host);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(line.starts_with("600,40.00,0.000,0.000,0.000,0.000,0.000"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn tcp_link_round_trip() {
        let mut link = TcpLink::bind("127.0.0.1:0").unwrap();
        let addr = link.listener.local_addr().unwrap();

        let host = TcpStream::connect(addr).unwrap();
        let mut writer = host.try_clone().unwrap();
        let mut reader = io::BufReader::new(host);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut received = None;
        writeln!(writer, "600").unwrap();
        while received.is_none() && Instant::now() < deadline {
            received = link.poll_input().unwrap();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(link.is_connected());
        assert_eq!(received.as_deref(), Some("600"));

        let record = Measurement {
            motor_rpm: 600,
            gearbox_rpm: 40.0,
            ..Measurement::default()
        };
        link.emit_record(&record).unwrap();

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line.trim_end(), "600,40.00,0.000,0.000,0.000,0.000,0.000");
    }
}
