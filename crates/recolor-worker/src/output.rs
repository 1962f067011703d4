//! Draining of worker stdout/stderr into the log sink and a bounded tail.

use std::collections::VecDeque;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Channel {
    Stdout,
    Stderr,
}

impl Channel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

/// Most recent output lines, bounded by total byte size.
#[derive(Debug)]
pub(crate) struct OutputTail {
    lines: VecDeque<String>,
    bytes: usize,
    limit: usize,
    dropped: usize,
}

impl OutputTail {
    pub(crate) const fn new(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            limit,
            dropped: 0,
        }
    }

    pub(crate) fn push(&mut self, mut line: String) {
        if line.len() > self.limit {
            let mut cut = self.limit;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
        self.bytes += line.len();
        self.lines.push_back(line);
        while self.bytes > self.limit {
            let Some(front) = self.lines.pop_front() else {
                break;
            };
            self.bytes -= front.len();
            self.dropped += 1;
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut rendered = String::new();
        if self.dropped > 0 {
            rendered.push_str(&format!("[{} earlier lines omitted]\n", self.dropped));
        }
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                rendered.push('\n');
            }
            rendered.push_str(line);
        }
        rendered
    }
}

/// Read `reader` to EOF, logging each line and returning the retained tail.
pub(crate) async fn drain<R>(reader: R, channel: Channel, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut tail = OutputTail::new(limit);

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer).trim_end().to_string();
                if line.is_empty() {
                    continue;
                }
                match channel {
                    Channel::Stdout => info!(stream = channel.as_str(), line = %line, "worker output"),
                    Channel::Stderr => warn!(stream = channel.as_str(), line = %line, "worker output"),
                }
                tail.push(line);
            }
            Err(err) => {
                warn!(stream = channel.as_str(), error = %err, "failed to read worker output");
                break;
            }
        }
    }

    tail.render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_keeps_most_recent_lines() {
        let mut tail = OutputTail::new(10);
        tail.push("first".to_string());
        tail.push("second".to_string());
        tail.push("third".to_string());
        assert_eq!(tail.render(), "[2 earlier lines omitted]\nthird");
    }

    #[test]
    fn tail_truncates_oversized_lines_on_char_boundary() {
        let mut tail = OutputTail::new(4);
        tail.push("ééé".to_string());
        assert_eq!(tail.render(), "éé");
    }

    #[tokio::test]
    async fn drain_collects_lines_and_skips_blanks() {
        let input: &[u8] = b"loading model\n\nrender_factor=35\r\npartial";
        let rendered = drain(input, Channel::Stdout, 1024).await;
        assert_eq!(rendered, "loading model\nrender_factor=35\npartial");
    }

    #[tokio::test]
    async fn drain_tolerates_invalid_utf8() {
        let input: &[u8] = b"bad \xff byte\n";
        let rendered = drain(input, Channel::Stderr, 1024).await;
        assert_eq!(rendered, "bad \u{fffd} byte");
    }
}
