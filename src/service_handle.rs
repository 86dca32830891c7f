use std::{
    fs::File,
    io::{BufRead, BufReader, Read},
    path::Path,
    process::{Child, ExitStatus},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{
    app_types::lock_or_recover, diagnostic_buffer::DiagnosticBuffer, process_control::OutputFiles,
    SERVICE_OUTPUT_TARGET,
};

pub(crate) type SharedBuffer = Arc<Mutex<DiagnosticBuffer>>;

/// The one spawned service process owned by the supervisor.
///
/// The child writes into its own output files; tail threads follow those
/// files into the bounded buffers until the capture is finished.
#[derive(Debug)]
pub(crate) struct ServiceHandle {
    pub(crate) pid: u32,
    pub(crate) generation: u64,
    pub(crate) detached: bool,
    pub(crate) output: OutputFiles,
    child: Child,
    stdout: SharedBuffer,
    stderr: SharedBuffer,
    capture_done: Arc<AtomicBool>,
    tails: Vec<JoinHandle<()>>,
}

impl ServiceHandle {
    /// Takes ownership of a freshly spawned child and starts following its output.
    pub(crate) fn adopt(
        child: Child,
        generation: u64,
        output: OutputFiles,
        buffer_bytes: usize,
        tail_interval: Duration,
    ) -> Self {
        let pid = child.id();
        let stdout: SharedBuffer = Arc::new(Mutex::new(DiagnosticBuffer::with_max_bytes(buffer_bytes)));
        let stderr: SharedBuffer = Arc::new(Mutex::new(DiagnosticBuffer::with_max_bytes(buffer_bytes)));
        let capture_done = Arc::new(AtomicBool::new(false));

        let tails = [
            (&output.stdout, OutputStream::Stdout, &stdout),
            (&output.stderr, OutputStream::Stderr, &stderr),
        ]
        .into_iter()
        .filter_map(|(path, kind, buffer)| {
            spawn_output_tail(
                path,
                kind,
                pid,
                Arc::clone(buffer),
                Arc::clone(&capture_done),
                tail_interval,
            )
        })
        .collect();

        Self {
            pid,
            generation,
            detached: true,
            output,
            child,
            stdout,
            stderr,
            capture_done,
            tails,
        }
    }

    pub(crate) fn try_exit_status(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Drains what the exited process left in its output files and stops the tails.
    pub(crate) fn finish_capture(&mut self) {
        self.capture_done.store(true, Ordering::Release);
        for tail in std::mem::take(&mut self.tails) {
            if tail.join().is_err() {
                tracing::warn!(pid = self.pid, "service output tail panicked");
            }
        }
    }

    pub(crate) fn stdout_snapshot(&self) -> String {
        lock_or_recover(&self.stdout, "service stdout buffer").snapshot()
    }

    pub(crate) fn stderr_snapshot(&self) -> String {
        lock_or_recover(&self.stderr, "service stderr buffer").snapshot()
    }

    /// Bytes currently held and lines dropped, across both streams.
    pub(crate) fn capture_stats(&self) -> (usize, u64) {
        let stdout = lock_or_recover(&self.stdout, "service stdout buffer");
        let stderr = lock_or_recover(&self.stderr, "service stderr buffer");
        (
            stdout.len_bytes() + stderr.len_bytes(),
            stdout.dropped_lines() + stderr.dropped_lines(),
        )
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        // Tails left behind finish their last read and exit on their own.
        self.capture_done.store(true, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

fn spawn_output_tail(
    path: &Path,
    kind: OutputStream,
    pid: u32,
    buffer: SharedBuffer,
    done: Arc<AtomicBool>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!(
                pid,
                stream = kind.as_str(),
                path = %path.display(),
                "cannot follow service output: {error}"
            );
            return None;
        }
    };

    let spawned = thread::Builder::new()
        .name(format!("openbazaard-{}", kind.as_str()))
        .spawn(move || tail_lines(file, kind, pid, &buffer, &done, interval));
    match spawned {
        Ok(tail) => Some(tail),
        Err(error) => {
            tracing::warn!(pid, stream = kind.as_str(), "failed to start output tail: {error}");
            None
        }
    }
}

/// Follows a growing stream line by line until `done` is set and the end is reached.
fn tail_lines<R: Read>(
    stream: R,
    kind: OutputStream,
    pid: u32,
    buffer: &SharedBuffer,
    done: &AtomicBool,
    interval: Duration,
) {
    let mut reader = BufReader::new(stream);
    let mut pending = Vec::new();
    loop {
        // Sampled before the read so the last pass sees everything written before exit.
        let finished = done.load(Ordering::Acquire);
        match reader.read_until(b'\n', &mut pending) {
            Ok(0) if finished => break,
            Ok(0) => thread::sleep(interval),
            Ok(_) => {
                if pending.ends_with(b"\n") {
                    record_line(&pending, kind, pid, buffer);
                    pending.clear();
                }
            }
            Err(error) => {
                tracing::debug!(pid, stream = kind.as_str(), "output tail stopped: {error}");
                break;
            }
        }
    }
    if !pending.is_empty() {
        record_line(&pending, kind, pid, buffer);
    }
}

fn record_line(raw: &[u8], kind: OutputStream, pid: u32, buffer: &SharedBuffer) {
    let text = String::from_utf8_lossy(raw);
    let line = text.trim_end_matches(['\r', '\n']);
    tracing::info!(target: SERVICE_OUTPUT_TARGET, pid, stream = kind.as_str(), "{line}");
    lock_or_recover(buffer, "service output buffer").push_line(line);
}

#[cfg(test)]
mod tests {
    use std::{fs::OpenOptions, io::Write};

    use super::*;

    fn buffer() -> SharedBuffer {
        Arc::new(Mutex::new(DiagnosticBuffer::with_max_bytes(1024)))
    }

    #[test]
    fn tail_lines_splits_and_strips_line_endings() {
        let buffer = buffer();
        let input: &[u8] = b"booting\r\nlistening on 18469\npartial";
        let done = AtomicBool::new(true);
        tail_lines(input, OutputStream::Stdout, 42, &buffer, &done, Duration::from_millis(1));

        let snapshot = lock_or_recover(&buffer, "test buffer").snapshot();
        assert_eq!(snapshot, "booting\nlistening on 18469\npartial\n");
    }

    #[test]
    fn tail_lines_tolerates_invalid_utf8() {
        let buffer = buffer();
        let input: &[u8] = b"bad \xff byte\n";
        let done = AtomicBool::new(true);
        tail_lines(input, OutputStream::Stderr, 7, &buffer, &done, Duration::from_millis(1));

        let snapshot = lock_or_recover(&buffer, "test buffer").snapshot();
        assert_eq!(snapshot, "bad \u{fffd} byte\n");
    }

    #[test]
    fn tail_follows_a_file_that_is_still_being_written() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("openbazaard.stdout.log");
        let mut writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .expect("open output file");

        let buffer = buffer();
        let done = Arc::new(AtomicBool::new(false));
        let tail = spawn_output_tail(
            &path,
            OutputStream::Stdout,
            9,
            Arc::clone(&buffer),
            Arc::clone(&done),
            Duration::from_millis(5),
        )
        .expect("tail thread");

        writer.write_all(b"first\nsec").expect("write");
        thread::sleep(Duration::from_millis(30));
        writer.write_all(b"ond\nthird").expect("write");
        writer.flush().expect("flush");
        thread::sleep(Duration::from_millis(30));

        done.store(true, Ordering::Release);
        tail.join().expect("join tail");

        let snapshot = lock_or_recover(&buffer, "test buffer").snapshot();
        assert_eq!(snapshot, "first\nsecond\nthird\n");
    }
}
