//! Barcode scanner seam.
//!
//! The camera or hardware scanner is owned by the host. Form logic only sees
//! decoded strings through `Scanner`.

use std::io::{self, BufRead};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scanner closed before a code was read")]
    Closed,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("scanner task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub trait Scanner {
    /// Start decoding. Each decoded payload goes to `on_decoded`, failures to `on_error`.
    fn start_scan(
        &mut self,
        on_decoded: &mut dyn FnMut(String),
        on_error: &mut dyn FnMut(ScanError),
    );

    fn stop_scan(&mut self);
}

/// Keyboard-wedge scanner: each non-empty input line is one payload.
/// Stops after the first payload.
pub struct StdinScanner<R> {
    reader: R,
    active: bool,
}

impl StdinScanner<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> StdinScanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            active: false,
        }
    }
}

impl<R: BufRead> Scanner for StdinScanner<R> {
    fn start_scan(
        &mut self,
        on_decoded: &mut dyn FnMut(String),
        on_error: &mut dyn FnMut(ScanError),
    ) {
        self.active = true;
        let mut line = String::new();
        while self.active {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    on_error(ScanError::Closed);
                    self.stop_scan();
                }
                Ok(_) => {
                    let payload = line.trim();
                    if payload.is_empty() {
                        continue;
                    }
                    debug!(len = payload.len(), "Decoded scan payload");
                    on_decoded(payload.to_string());
                    self.stop_scan();
                }
                Err(err) => {
                    on_error(err.into());
                    self.stop_scan();
                }
            }
        }
    }

    fn stop_scan(&mut self) {
        self.active = false;
    }
}

/// Run one scan on a blocking thread. The scanner is built on that thread by `make`.
pub async fn scan_blocking<F, S>(make: F) -> Result<String, ScanError>
where
    F: FnOnce() -> S + Send + 'static,
    S: Scanner,
{
    tokio::task::spawn_blocking(move || scan_once(&mut make())).await?
}

/// Run one scan and return the first decoded payload.
pub fn scan_once(scanner: &mut dyn Scanner) -> Result<String, ScanError> {
    let mut decoded = None;
    let mut failure = None;
    scanner.start_scan(
        &mut |payload| {
            decoded.get_or_insert(payload);
        },
        &mut |err| {
            failure.get_or_insert(err);
        },
    );
    scanner.stop_scan();

    match (decoded, failure) {
        (Some(payload), _) => Ok(payload),
        (None, Some(err)) => Err(err),
        (None, None) => Err(ScanError::Closed),
    }
}
