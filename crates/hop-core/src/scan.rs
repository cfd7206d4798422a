const LF: u8 = 0x0A;
const CR: u8 = 0x0D;

/// Outcome of feeding one chunk of inbound bytes to a [`LineScanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    /// No terminator yet; all fed bytes are retained for the next call.
    Incomplete,
    /// A complete line. `content` excludes the LF and a preceding CR;
    /// `consumed` is how many bytes of the input chunk were used, so the
    /// caller keeps `input[consumed..]` for handoff.
    Line { content: Vec<u8>, consumed: usize },
    /// The accumulated line reached the length limit before a terminator.
    /// Terminal; the scanner must not be fed again.
    TooLong,
}

/// Accumulates raw bytes until an LF terminator. Bytes are taken as 0–255
/// values with no multi-byte decoding, and partial lines survive across
/// calls: a request line split over several reads reassembles losslessly.
#[derive(Debug)]
pub struct LineScanner {
    buffer: Vec<u8>,
    max_line_bytes: usize,
}

impl LineScanner {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_bytes,
        }
    }

    pub fn consume(&mut self, input: &[u8]) -> ScanResult {
        for (index, &byte) in input.iter().enumerate() {
            if byte == LF {
                let mut content = std::mem::take(&mut self.buffer);
                if content.last() == Some(&CR) {
                    content.pop();
                }
                return ScanResult::Line {
                    content,
                    consumed: index + 1,
                };
            }
            self.buffer.push(byte);
            if self.buffer.len() >= self.max_line_bytes {
                return ScanResult::TooLong;
            }
        }
        ScanResult::Incomplete
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}
