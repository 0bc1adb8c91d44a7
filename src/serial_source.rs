//! A [LineSource] reading the consoles of testbed nodes attached over
//! serial, one reader thread per port.

use crate::line_source::{LineSource, SourceError, StreamLine};
use log::{debug, warn};
use serial2::SerialPort;
use std::{
    collections::VecDeque,
    io,
    path::{Path, PathBuf},
    str,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{spawn, JoinHandle},
    time::Duration,
};

/// Baud rate the node firmware prints at.
pub const DEFAULT_BAUD: u32 = 115_200;

const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Lists the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<PathBuf>, SourceError> {
    Ok(SerialPort::available_ports()?)
}

/// Splits a byte stream into lines. Bytes are buffered until a newline
/// arrives; lines that are not valid UTF-8 are dropped.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    /// Feeds bytes in, returns every line they complete, without the
    /// trailing line break.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &c in bytes {
            if c != b'\n' {
                self.buf.push(c);
                continue;
            }
            match str::from_utf8(&self.buf) {
                Ok(s) => lines.push(s.trim_end_matches('\r').to_owned()),
                // Often happens at the beginning of transmission when
                // there is still garbage in the hardware buffer
                Err(e) => warn!("Failed to decode utf-8: {:?}", e),
            }
            self.buf.clear();
        }
        lines
    }
}

/// A [LineSource] that simply acts as a thread-safe buffer the port reader
/// threads push into. The stream identifier of every line is the path of the
/// port it was read from.
#[derive(Debug)]
pub struct SerialSource {
    msgs: Arc<Mutex<VecDeque<StreamLine>>>,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl SerialSource {
    /// Opens every port at `baud` and starts reading. Fails without starting
    /// anything if one of the ports cannot be opened.
    pub fn open<P: AsRef<Path>>(ports: &[P], baud: u32) -> Result<Self, SourceError> {
        if ports.is_empty() {
            return Err(SourceError::NoPorts);
        }

        let opened = ports
            .iter()
            .map(|p| {
                let path = p.as_ref().to_path_buf();
                open_port(&path, baud)
                    .map(|port| (path.clone(), port))
                    .map_err(|source| SourceError::Open { port: path, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let msgs = Arc::new(Mutex::new(VecDeque::new()));
        let running = Arc::new(AtomicBool::new(true));

        let handles = opened
            .into_iter()
            .map(|(path, port)| {
                let th_msgs = Arc::clone(&msgs);
                let th_running = Arc::clone(&running);
                spawn(move || read_port(path, port, th_msgs, th_running))
            })
            .collect();

        Ok(SerialSource {
            msgs,
            running,
            handles,
        })
    }

    /// Stops every reader thread and waits for them to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("A serial reader thread panicked");
            }
        }
    }
}

fn open_port(path: &Path, baud: u32) -> io::Result<SerialPort> {
    let mut port = SerialPort::open(path, baud)?;
    port.set_read_timeout(READ_TIMEOUT)?;
    Ok(port)
}

fn read_port(
    path: PathBuf,
    port: SerialPort,
    msgs: Arc<Mutex<VecDeque<StreamLine>>>,
    running: Arc<AtomicBool>,
) {
    let stream = path.to_string_lossy().into_owned();
    let mut buffer = [0; 256];
    let mut assembler = LineAssembler::default();

    while running.load(Ordering::Relaxed) {
        let read_len = match port.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("[{stream}] device disconnected: {e}");
                break;
            }
        };

        let lines = assembler.push_bytes(&buffer[..read_len]);
        if lines.is_empty() {
            continue;
        }
        let Ok(mut queue) = msgs.lock() else {
            break;
        };
        for line in lines {
            debug!("[{stream}] {line}");
            queue.push_back((stream.clone(), line));
        }
    }
}

impl Iterator for SerialSource {
    type Item = StreamLine;

    fn next(&mut self) -> Option<Self::Item> {
        self.msgs.lock().ok()?.pop_front()
    }
}

impl LineSource for SerialSource {
    fn clear(&mut self) {
        if let Ok(mut queue) = self.msgs.lock() {
            queue.clear();
        }
    }
}

impl Drop for SerialSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_lines_across_reads() {
        let mut assembler = LineAssembler::default();
        assert!(assembler.push_bytes(b"TA, 0, ").is_empty());
        assert_eq!(
            assembler.push_bytes(b"215\r\nTW, 206, 3, 17"),
            vec!["TA, 0, 215".to_owned()]
        );
        assert_eq!(
            assembler.push_bytes(b"1.5\n\n"),
            vec!["TW, 206, 3, 171.5".to_owned(), String::new()]
        );
    }

    #[test]
    fn invalid_utf8_lines_are_dropped() {
        let mut assembler = LineAssembler::default();
        let lines = assembler.push_bytes(b"\xff\xfe\nts, 3\n");
        assert_eq!(lines, vec!["ts, 3".to_owned()]);
    }

    #[test]
    fn no_ports_is_an_error() {
        let ports: [&str; 0] = [];
        assert!(matches!(
            SerialSource::open(&ports, DEFAULT_BAUD),
            Err(SourceError::NoPorts)
        ));
    }

    #[test]
    fn missing_port_fails_to_open() {
        let err = SerialSource::open(&["/definitely/not/a/serial/port"], DEFAULT_BAUD)
            .expect_err("opening a missing port should fail");
        assert!(matches!(err, SourceError::Open { .. }));
    }
}
