//! Background jobs for Leaf
//!
//! Long-running work (fetching the summarization dictionary, encrypting a
//! large workspace) runs on its own thread and reports back over a channel.
//! The owner polls for progress from its event loop or blocks on `wait`.
//! Jobs cannot be cancelled; they run to completion or fail.

use crate::error::{Error, Result};
use crate::files::temp_path_for;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

/// Bytes read per chunk by [`fetch_resource`].
const CHUNK_SIZE: usize = 64 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Events & Progress
// ─────────────────────────────────────────────────────────────────────────────

/// Messages from a running job, in the order they were sent.
#[derive(Debug)]
pub enum JobEvent<T> {
    /// Units of work done so far, out of `total` when known
    Progress { done: u64, total: Option<u64> },
    /// The job returned; no further events follow
    Finished(Result<T>),
}

/// Handed to the job's closure for reporting progress.
pub struct ProgressReporter {
    send: Box<dyn Fn(u64, Option<u64>) + Send>,
}

impl ProgressReporter {
    pub fn report(&self, done: u64, total: Option<u64>) {
        (self.send)(done, total);
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Job
// ─────────────────────────────────────────────────────────────────────────────

/// A closure running on a background thread.
#[derive(Debug)]
pub struct Job<T> {
    name: String,
    receiver: Receiver<JobEvent<T>>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

impl<T: Send + 'static> Job<T> {
    /// Start `work` on a new thread named `name`.
    pub fn spawn<F>(name: impl Into<String>, work: F) -> Result<Self>
    where
        F: FnOnce(&ProgressReporter) -> Result<T> + Send + 'static,
    {
        let name = name.into();
        let (tx, rx) = channel();

        let progress_tx = tx.clone();
        let reporter = ProgressReporter {
            send: Box::new(move |done, total| {
                let _ = progress_tx.send(JobEvent::Progress { done, total });
            }),
        };

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let result = work(&reporter);
            drop(reporter);
            let _ = tx.send(JobEvent::Finished(result));
        })?;

        debug!("Started job '{}'", name);
        Ok(Self {
            name,
            receiver: rx,
            handle: Some(handle),
            finished: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the job has delivered its `Finished` event.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Collect the events sent since the last poll.
    ///
    /// This is non-blocking. A job whose thread died without finishing is
    /// reported as finished with an error.
    pub fn poll(&mut self) -> Vec<JobEvent<T>> {
        let mut events = Vec::new();
        while !self.finished {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if matches!(event, JobEvent::Finished(_)) {
                        self.finish();
                    }
                    events.push(event);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.finish();
                    events.push(JobEvent::Finished(Err(self.died())));
                }
            }
        }
        events
    }

    /// Block until the job finishes, discarding progress.
    pub fn wait(mut self) -> Result<T> {
        if self.finished {
            return Err(Error::Application(format!(
                "Job '{}' result was already taken",
                self.name
            )));
        }
        loop {
            match self.receiver.recv() {
                Ok(JobEvent::Progress { .. }) => continue,
                Ok(JobEvent::Finished(result)) => {
                    self.finish();
                    return result;
                }
                Err(_) => {
                    self.finish();
                    return Err(self.died());
                }
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Job '{}' panicked", self.name);
            }
        }
    }

    fn died(&self) -> Error {
        Error::Application(format!("Job '{}' stopped without a result", self.name))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource Fetch
// ─────────────────────────────────────────────────────────────────────────────

/// Stream `reader` into `dest` on a background thread.
///
/// Progress is reported in bytes after every chunk. The data lands in a
/// hidden sibling file that replaces `dest` only once the stream has ended,
/// so `dest` is either the complete resource or untouched. The job returns
/// `dest`, which callers store as the dictionary path.
pub fn fetch_resource<R>(reader: R, total: Option<u64>, dest: PathBuf) -> Result<Job<PathBuf>>
where
    R: Read + Send + 'static,
{
    let name = format!(
        "fetch {}",
        dest.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    );
    Job::spawn(name, move |progress| {
        let part = temp_path_for(&dest);
        match stream_to(reader, &part, total, progress) {
            Ok(bytes) => {
                fs::rename(&part, &dest).map_err(|e| {
                    let _ = fs::remove_file(&part);
                    Error::FileWrite {
                        path: dest.clone(),
                        source: e,
                    }
                })?;
                info!("Fetched {} bytes into {}", bytes, dest.display());
                Ok(dest)
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(e)
            }
        }
    })
}

fn stream_to<R: Read>(
    mut reader: R,
    part: &std::path::Path,
    total: Option<u64>,
    progress: &ProgressReporter,
) -> Result<u64> {
    let write_err = |source| Error::FileWrite {
        path: part.to_path_buf(),
        source,
    };
    let mut file = File::create(part).map_err(write_err)?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut done = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        };
        file.write_all(&buf[..n]).map_err(write_err)?;
        done += n as u64;
        progress.report(done, total);
    }
    file.sync_all().map_err(write_err)?;
    Ok(done)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Yields one chunk of data, then fails.
    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "dropped"));
            }
            self.sent = true;
            buf[..4].copy_from_slice(b"part");
            Ok(4)
        }
    }

    fn poll_until_finished<T: Send + 'static>(job: &mut Job<T>) -> Vec<JobEvent<T>> {
        let mut events = Vec::new();
        while !job.is_finished() {
            events.extend(job.poll());
            thread::sleep(Duration::from_millis(5));
        }
        events
    }

    #[test]
    fn test_wait_returns_result() {
        let job = Job::spawn("answer", |progress| {
            progress.report(1, Some(2));
            progress.report(2, Some(2));
            Ok(42)
        })
        .unwrap();
        assert_eq!(job.name(), "answer");
        assert_eq!(job.wait().unwrap(), 42);
    }

    #[test]
    fn test_poll_delivers_progress_then_finished() {
        let mut job = Job::spawn("count", |progress| {
            for i in 1..=3 {
                progress.report(i, Some(3));
            }
            Ok("done")
        })
        .unwrap();

        let events = poll_until_finished(&mut job);
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress { done, .. } => Some(*done),
                JobEvent::Finished(_) => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3]);
        assert!(matches!(events.last(), Some(JobEvent::Finished(Ok("done")))));
        assert!(job.poll().is_empty());
    }

    #[test]
    fn test_job_error_is_delivered() {
        let job: Job<()> = Job::spawn("fails", |_| Err(Error::Application("nope".into()))).unwrap();
        assert!(matches!(job.wait(), Err(Error::Application(msg)) if msg == "nope"));
    }

    #[test]
    fn test_panicking_job_reports_error() {
        let job: Job<()> = Job::spawn("panics", |_| panic!("boom")).unwrap();
        assert!(job.wait().is_err());
    }

    #[test]
    fn test_fetch_resource_streams_into_dest() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("glove.txt");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let total = data.len() as u64;

        let mut job = fetch_resource(Cursor::new(data.clone()), Some(total), dest.clone()).unwrap();
        let events = poll_until_finished(&mut job);

        let mut last = 0;
        for event in &events {
            if let JobEvent::Progress { done, total: t } = event {
                assert!(*done > last);
                assert_eq!(*t, Some(total));
                last = *done;
            }
        }
        assert_eq!(last, total);
        assert!(matches!(events.last(), Some(JobEvent::Finished(Ok(p))) if *p == dest));
        assert_eq!(fs::read(&dest).unwrap(), data);
    }

    #[test]
    fn test_fetch_resource_failure_leaves_nothing() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("glove.txt");

        let job = fetch_resource(BrokenReader { sent: false }, None, dest.clone()).unwrap();
        assert!(matches!(job.wait(), Err(Error::Io(_))));
        assert!(!dest.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
