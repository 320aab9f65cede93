//! Chunked stream copying with progress and cancellation.

use std::io::{self, Read, Write};
use std::time::Instant;

use crate::{CopyOptions, FsError, Path};

/// Chunk size for stream copies.
pub(crate) const BUFFER_SIZE: usize = 8192;

/// Cumulative byte counter that reports to a [`CopyOptions`] progress
/// callback no more often than its interval.
pub(crate) struct Progress<'a> {
    options: &'a CopyOptions,
    total: u64,
    reported: u64,
    last_report: Instant,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(options: &'a CopyOptions) -> Self {
        Self {
            options,
            total: 0,
            reported: 0,
            last_report: Instant::now(),
        }
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.total += bytes;
        if self.last_report.elapsed() >= self.options.progress_interval {
            self.report();
        }
    }

    /// Report whatever has not been reported yet.
    pub(crate) fn finish(&mut self) {
        if self.total != self.reported {
            self.report();
        }
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    fn report(&mut self) {
        self.options.notify(self.total);
        self.reported = self.total;
        self.last_report = Instant::now();
    }
}

/// Copy `reader` into `writer` in [`BUFFER_SIZE`] chunks.
///
/// The interruption flag is checked before every chunk. On interruption the
/// bytes already written stay written. Returns the number of bytes copied.
pub(crate) fn copy_stream(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    target: &Path,
    options: &CopyOptions,
) -> Result<u64, FsError> {
    let mut buffer = vec![0u8; BUFFER_SIZE];
    let mut progress = Progress::new(options);
    loop {
        options.interrupt.check(target)?;
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::io("read", target, e)),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| FsError::io("write", target, e))?;
        progress.advance(read as u64);
    }
    writer.flush().map_err(|e| FsError::io("flush", target, e))?;
    progress.finish();
    Ok(progress.total())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Interrupt;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn copies_all_bytes_and_reports_cumulative_progress() {
        let data: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| i as u8).collect();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = CopyOptions::default().with_progress(Duration::ZERO, move |n| sink.lock().push(n));

        let mut out = Vec::new();
        let copied = copy_stream(&mut data.as_slice(), &mut out, &Path::local("/t"), &options).unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(out, data);
        let seen = seen.lock();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last().copied(), Some(data.len() as u64));
    }

    #[test]
    fn slow_interval_reports_only_final_total() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options =
            CopyOptions::default().with_progress(Duration::from_secs(3600), move |n| sink.lock().push(n));
        let data = vec![7u8; BUFFER_SIZE * 2];
        let mut out = Vec::new();
        copy_stream(&mut data.as_slice(), &mut out, &Path::local("/t"), &options).unwrap();
        assert_eq!(*seen.lock(), vec![data.len() as u64]);
    }

    #[test]
    fn interrupted_copy_stops_before_next_chunk() {
        let interrupt = Interrupt::new();
        interrupt.interrupt();
        let options = CopyOptions::default().with_interrupt(interrupt);
        let data = vec![1u8; 100];
        let mut out = Vec::new();
        let err = copy_stream(&mut data.as_slice(), &mut out, &Path::local("/t"), &options).unwrap_err();
        assert!(matches!(err, FsError::Interrupted { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn empty_source_reports_nothing() {
        let called = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&called);
        let options = CopyOptions::default().with_progress(Duration::ZERO, move |_| *sink.lock() += 1);
        let mut out = Vec::new();
        let copied = copy_stream(&mut io::empty(), &mut out, &Path::local("/t"), &options).unwrap();
        assert_eq!(copied, 0);
        assert_eq!(*called.lock(), 0);
    }
}
