use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

const READ_CAPACITY: usize = 8 * 1024;

/// One step of an [`AsyncBoundedLineReader`]. Line numbers start at 1.
#[derive(Debug)]
pub enum LineRead {
    /// A complete line without its `\n`.
    Line { number: usize, bytes: Vec<u8> },
    /// A line longer than the limit. Its bytes were dropped as they arrived.
    TooLong {
        number: usize,
        observed: usize,
        limit: usize,
    },
    /// The source failed; nothing more will be read.
    Failed {
        number: usize,
        error: std::io::Error,
    },
}

/// Newline-delimited reader that holds at most `limit` bytes of any one line.
///
/// An oversized line is reported once as [`LineRead::TooLong`] and reading
/// resumes after its newline.
pub struct AsyncBoundedLineReader<R> {
    source: BufReader<R>,
    limit: usize,
    number: usize,
    finished: bool,
}

impl<R: AsyncRead + Unpin> AsyncBoundedLineReader<R> {
    pub fn new(reader: R, limit: usize) -> Self {
        Self {
            source: BufReader::with_capacity(READ_CAPACITY, reader),
            limit,
            number: 0,
            finished: false,
        }
    }

    /// Returns the next line, or `None` once the source is exhausted or failed.
    pub async fn next_line(&mut self) -> Option<LineRead> {
        if self.finished {
            return None;
        }

        let mut bytes = Vec::new();
        let mut observed = 0usize;
        loop {
            let chunk = match self.source.fill_buf().await {
                Ok(chunk) => chunk,
                Err(error) => {
                    self.finished = true;
                    self.number += 1;
                    return Some(LineRead::Failed {
                        number: self.number,
                        error,
                    });
                }
            };
            if chunk.is_empty() {
                self.finished = true;
                if observed == 0 {
                    return None;
                }
                break;
            }

            let newline = chunk.iter().position(|b| *b == b'\n');
            let segment = newline.unwrap_or(chunk.len());
            observed = observed.saturating_add(segment);
            if observed <= self.limit {
                bytes.extend_from_slice(&chunk[..segment]);
            } else if !bytes.is_empty() {
                bytes = Vec::new();
            }
            self.source.consume(segment + usize::from(newline.is_some()));
            if newline.is_some() {
                break;
            }
        }

        self.number += 1;
        if observed > self.limit {
            return Some(LineRead::TooLong {
                number: self.number,
                observed,
                limit: self.limit,
            });
        }
        Some(LineRead::Line {
            number: self.number,
            bytes,
        })
    }
}
