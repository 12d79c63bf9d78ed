//! Remote terminal listener.
//!
//! Accepts inbound TCP connections and runs one session per client on its
//! own thread. Lines received from the client are fed to the shared
//! [`Processor`]; output, errors and the next prompt are written back.
//! There is no authentication: bind to loopback unless the network is
//! trusted.

use std::io::{self, BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use termcore_terminal::{Processor, Session, Signal};
use termcore_types::config::TerminalConfig;
use termcore_types::error::{Result, TermError};
use termcore_vfs::{HostVfs, MemoryVfs, Vfs};

/// Maximum bytes in a single input line.
const MAX_LINE_LEN: usize = 1024;

/// ANSI clear screen + cursor home, sent for the clear signal.
const CLEAR_SCREEN: &[u8] = b"\x1b[2J\x1b[H";

// ---------------------------------------------------------------------------
// Line reading
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    Line(String),
    /// The line exceeded the limit; its bytes were discarded.
    TooLong,
    Eof,
}

/// Read one `\n`-terminated line of at most `max` bytes.
///
/// An overlong line is consumed up to its newline and reported as
/// [`LineRead::TooLong`] so the connection stays usable.
fn read_line_limited<R: BufRead>(reader: &mut R, max: usize) -> io::Result<LineRead> {
    let mut buf = Vec::new();
    let mut overflow = false;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(match (overflow, buf.is_empty()) {
                (true, _) => LineRead::TooLong,
                (false, true) => LineRead::Eof,
                (false, false) => LineRead::Line(String::from_utf8_lossy(&buf).into_owned()),
            });
        }
        let newline = available.iter().position(|&b| b == b'\n');
        let take = newline.unwrap_or(available.len());
        if !overflow {
            if buf.len() + take > max {
                overflow = true;
                buf.clear();
            } else {
                buf.extend_from_slice(&available[..take]);
            }
        }
        reader.consume(newline.map_or(take, |i| i + 1));
        if newline.is_some() {
            return Ok(if overflow {
                LineRead::TooLong
            } else {
                LineRead::Line(String::from_utf8_lossy(&buf).into_owned())
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Connections
// ---------------------------------------------------------------------------

/// Decrements the active connection count when the session thread ends.
struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

fn short_id(session: &Session) -> String {
    session.id.to_string().chars().take(8).collect()
}

fn write_prompt(out: &mut impl Write, config: &TerminalConfig, session: &Session) -> io::Result<()> {
    let prompt = config.render_prompt(
        session.context.user(),
        &session.context.cwd,
        &short_id(session),
    );
    out.write_all(prompt.as_bytes())?;
    out.flush()
}

/// Run one client's session until it exits, disconnects or idles out.
fn serve_client(
    stream: TcpStream,
    processor: &Processor,
    mut session: Session,
    config: &TerminalConfig,
) -> io::Result<()> {
    let idle = config.listener.idle_timeout_secs;
    if idle > 0 {
        stream.set_read_timeout(Some(Duration::from_secs(idle)))?;
    }
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    writeln!(
        writer,
        "termcore remote terminal (session {})",
        short_id(&session)
    )?;
    write_prompt(&mut writer, config, &session)?;

    loop {
        match read_line_limited(&mut reader, MAX_LINE_LEN) {
            Ok(LineRead::Eof) => return Ok(()),
            Ok(LineRead::TooLong) => writer.write_all(b"error: line too long\n")?,
            Ok(LineRead::Line(line)) => {
                let result = processor.submit(&mut session, &line);
                if !result.output.is_empty() {
                    writer.write_all(result.output.as_bytes())?;
                    writer.write_all(b"\n")?;
                }
                if let Some(msg) = &result.error_message {
                    writeln!(writer, "error: {msg}")?;
                }
                match result.signal {
                    Some(Signal::Exit) => {
                        writer.write_all(b"Goodbye.\n")?;
                        return Ok(());
                    },
                    Some(Signal::Clear) => writer.write_all(CLEAR_SCREEN)?,
                    None => {},
                }
            },
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                writer.write_all(b"\nIdle timeout. Goodbye.\n")?;
                return Ok(());
            },
            Err(e) => return Err(e),
        }
        write_prompt(&mut writer, config, &session)?;
    }
}

// ---------------------------------------------------------------------------
// RemoteListener
// ---------------------------------------------------------------------------

/// TCP front-end serving one independent session per connection.
pub struct RemoteListener {
    listener: TcpListener,
    processor: Processor,
    config: Arc<TerminalConfig>,
    active: Arc<AtomicUsize>,
}

impl RemoteListener {
    /// Bind to `config.listener.bind:port`.
    pub fn bind(config: TerminalConfig, processor: Processor) -> Result<Self> {
        let addr = format!("{}:{}", config.listener.bind, config.listener.port);
        let listener = TcpListener::bind(&addr).map_err(|e| TermError::from_io(&addr, e))?;
        log::info!(
            "Remote terminal listening on {} (max {} connections, {})",
            listener.local_addr()?,
            config.listener.max_connections,
            if config.listener.sandboxed {
                "sandboxed"
            } else {
                "host file system"
            }
        );
        Ok(Self {
            listener,
            processor,
            config: Arc::new(config),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of sessions currently being served.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Accept connections until the listener fails.
    pub fn serve(&self) -> Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => self.accept(stream),
                Err(e) => log::warn!("accept error: {e}"),
            }
        }
        Ok(())
    }

    fn accept(&self, mut stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let active = self.active.load(Ordering::SeqCst);
        if active >= self.config.listener.max_connections {
            log::warn!("Rejecting {peer}: {active} connections active");
            let _ = stream.write_all(b"BUSY\n");
            return;
        }
        let vfs = match self.session_vfs() {
            Ok(vfs) => vfs,
            Err(e) => {
                log::error!("Cannot open file system for {peer}: {e}");
                let _ = writeln!(stream, "error: {e}");
                return;
            },
        };

        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ConnectionGuard(Arc::clone(&self.active));
        let processor = self.processor.clone();
        let config = Arc::clone(&self.config);
        let spawned = thread::Builder::new()
            .name(format!("session-{peer}"))
            .spawn(move || {
                let _guard = guard;
                let session = Session::new(vfs, config.history_size);
                let id = session.id;
                log::info!("{peer}: opened session {id}");
                if let Err(e) = serve_client(stream, &processor, session, &config) {
                    log::debug!("{peer}: connection error: {e}");
                }
                log::info!("{peer}: closed session {id}");
            });
        if let Err(e) = spawned {
            log::error!("Failed to spawn session thread: {e}");
        }
    }

    /// A fresh in-memory tree when sandboxed, else the configured host
    /// root (the file system root by default).
    fn session_vfs(&self) -> Result<Box<dyn Vfs>> {
        if self.config.listener.sandboxed {
            return Ok(Box::new(MemoryVfs::new()));
        }
        let root = self.config.root.clone().unwrap_or_else(|| PathBuf::from("/"));
        Ok(Box::new(HostVfs::new(root)?))
    }
}
