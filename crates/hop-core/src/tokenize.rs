use crate::error::DispatchError;

const SP: u8 = 0x20;
const HT: u8 = 0x09;
const LF: u8 = 0x0A;
const VT: u8 = 0x0B;
const FF: u8 = 0x0C;
const CR: u8 = 0x0D;

/// One tokenized request line. `version` is empty when the line carries no
/// third token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// Splits a request line into method, target and version under the lenient
/// separator rules of RFC 7230 section 3.5: any of SP, HT, VT, FF or CR
/// delimits a field. A whitespace byte outside that set found while seeking
/// a field start is a malformed line. The trailing version trim accepts the
/// broader whitespace class so stray OWS or CR remnants are tolerated.
pub fn tokenize(line: &[u8]) -> Result<RequestLine, DispatchError> {
    let method_start = find_non_sp_lenient(line, 0)?;
    let method_end = find_sp_lenient(line, method_start);

    let target_start = find_non_sp_lenient(line, method_end)?;
    let target_end = find_sp_lenient(line, target_start);

    let version_start = find_non_sp_lenient(line, target_end)?;
    let version_end = find_end_of_string(line);

    Ok(RequestLine {
        method: token(line, method_start, method_end),
        target: token(line, target_start, target_end),
        version: if version_start < version_end {
            token(line, version_start, version_end)
        } else {
            String::new()
        },
    })
}

fn token(line: &[u8], start: usize, end: usize) -> String {
    line[start..end].iter().map(|&byte| char::from(byte)).collect()
}

fn is_sp_lenient(byte: u8) -> bool {
    matches!(byte, SP | HT | VT | FF | CR)
}

fn is_whitespace(byte: u8) -> bool {
    is_sp_lenient(byte) || byte == LF || (0x1C..=0x1F).contains(&byte)
}

fn find_non_sp_lenient(line: &[u8], offset: usize) -> Result<usize, DispatchError> {
    for index in offset..line.len() {
        let byte = line[index];
        if is_sp_lenient(byte) {
            continue;
        }
        if is_whitespace(byte) {
            return Err(DispatchError::MalformedRequestLine);
        }
        return Ok(index);
    }
    Ok(line.len())
}

fn find_sp_lenient(line: &[u8], offset: usize) -> usize {
    for index in offset..line.len() {
        if is_sp_lenient(line[index]) {
            return index;
        }
    }
    line.len()
}

fn find_end_of_string(line: &[u8]) -> usize {
    let mut index = line.len();
    while index > 1 {
        if !is_whitespace(line[index - 1]) {
            return index;
        }
        index -= 1;
    }
    0
}
