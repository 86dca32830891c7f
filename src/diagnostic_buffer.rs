use std::collections::VecDeque;

/// Line buffer for captured child output, capped by total bytes.
#[derive(Debug)]
pub(crate) struct DiagnosticBuffer {
    lines: VecDeque<String>,
    bytes: usize,
    max_bytes: usize,
    dropped_lines: u64,
}

impl DiagnosticBuffer {
    pub(crate) fn with_max_bytes(max_bytes: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            bytes: 0,
            max_bytes: max_bytes.max(1),
            dropped_lines: 0,
        }
    }

    pub(crate) fn push_line(&mut self, line: &str) {
        let line = truncate_to_char_boundary(line, self.max_bytes);
        self.bytes += line.len();
        self.lines.push_back(line.to_string());

        while self.bytes > self.max_bytes {
            let Some(oldest) = self.lines.pop_front() else {
                break;
            };
            self.bytes -= oldest.len();
            self.dropped_lines += 1;
        }
    }

    pub(crate) fn len_bytes(&self) -> usize {
        self.bytes
    }

    pub(crate) fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }

    pub(crate) fn snapshot(&self) -> String {
        let mut out = String::with_capacity(self.bytes + self.lines.len());
        if self.dropped_lines > 0 {
            out.push_str(&format!("[{} earlier lines dropped]\n", self.dropped_lines));
        }
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn truncate_to_char_boundary(line: &str, max_bytes: usize) -> &str {
    if line.len() <= max_bytes {
        return line;
    }
    let mut end = max_bytes;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::DiagnosticBuffer;

    #[test]
    fn keeps_lines_in_arrival_order() {
        let mut buffer = DiagnosticBuffer::with_max_bytes(1024);
        buffer.push_line("first");
        buffer.push_line("second");
        assert_eq!(buffer.snapshot(), "first\nsecond\n");
        assert_eq!(buffer.dropped_lines(), 0);
    }

    #[test]
    fn drops_oldest_lines_once_over_capacity() {
        let mut buffer = DiagnosticBuffer::with_max_bytes(10);
        buffer.push_line("aaaa");
        buffer.push_line("bbbb");
        buffer.push_line("cccc");

        assert!(buffer.len_bytes() <= 10);
        assert_eq!(buffer.dropped_lines(), 1);
        assert_eq!(buffer.snapshot(), "[1 earlier lines dropped]\nbbbb\ncccc\n");
    }

    #[test]
    fn oversized_line_is_truncated_on_a_char_boundary() {
        let mut buffer = DiagnosticBuffer::with_max_bytes(5);
        buffer.push_line("ab\u{00e9}\u{00e9}\u{00e9}");
        assert!(buffer.len_bytes() <= 5);
        assert_eq!(buffer.snapshot(), "ab\u{00e9}\n");
    }
}
