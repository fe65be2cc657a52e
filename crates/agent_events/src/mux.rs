use tokio::{io::AsyncRead, sync::mpsc, task::JoinHandle};
use tracing::{debug, warn};

use crate::config::LineLimits;
use crate::reader::{AsyncBoundedLineReader, LineRead};

/// One line read from a child process, tagged with the pipe it came from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TaggedLine {
    pub body: Vec<u8>,
    pub from_stderr: bool,
}

impl TaggedLine {
    pub fn stream_name(&self) -> &'static str {
        if self.from_stderr {
            "stderr"
        } else {
            "stdout"
        }
    }
}

/// Fan-in of a process's stdout and stderr into one queue of tagged lines.
///
/// Each source is drained by its own task. Lines from one source keep their
/// relative order; lines from different sources may interleave arbitrarily.
/// The queue closes once both sources have reached end-of-stream or failed.
pub struct LineMux {
    rx: mpsc::Receiver<TaggedLine>,
    readers: Vec<JoinHandle<()>>,
}

impl LineMux {
    pub fn spawn<O, E>(stdout: O, stderr: E, limits: LineLimits) -> Self
    where
        O: AsyncRead + Unpin + Send + 'static,
        E: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(limits.channel_capacity.max(1));
        let readers = vec![
            tokio::spawn(forward_lines(
                stdout,
                false,
                limits.max_line_bytes,
                tx.clone(),
            )),
            tokio::spawn(forward_lines(stderr, true, limits.max_line_bytes, tx)),
        ];
        Self { rx, readers }
    }

    /// Next line from either source; `None` once both are exhausted.
    pub async fn recv(&mut self) -> Option<TaggedLine> {
        self.rx.recv().await
    }

    /// Waits for both reader tasks to finish.
    pub async fn join(self) {
        let Self { rx, readers } = self;
        drop(rx);
        for reader in readers {
            if let Err(err) = reader.await {
                debug!(error = %err, "line reader task ended abnormally");
            }
        }
    }

    /// Stops both reader tasks without waiting for end-of-stream.
    pub fn abort(self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn forward_lines<R>(
    reader: R,
    from_stderr: bool,
    max_line_bytes: usize,
    tx: mpsc::Sender<TaggedLine>,
) where
    R: AsyncRead + Unpin,
{
    let stream = if from_stderr { "stderr" } else { "stdout" };
    let mut lines = AsyncBoundedLineReader::new(reader, max_line_bytes);
    while let Some(next) = lines.next_line().await {
        match next {
            LineRead::Line { bytes, .. } => {
                let line = TaggedLine {
                    body: bytes,
                    from_stderr,
                };
                if tx.send(line).await.is_err() {
                    debug!(stream, "line consumer went away; stopping reader");
                    return;
                }
            }
            LineRead::TooLong {
                number,
                observed,
                limit,
            } => {
                warn!(
                    stream,
                    line_number = number,
                    observed_bytes = observed,
                    max_line_bytes = limit,
                    "skipping oversized output line"
                );
            }
            LineRead::Failed { number, error } => {
                debug!(stream, line_number = number, error = %error, "output pipe read failed");
                return;
            }
        }
    }
}
