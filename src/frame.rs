// https://redis.io/docs/reference/protocol-spec
//
// Only the subset needed by the server is implemented: requests are arrays of bulk strings,
// replies are one of four single-value types.

use std::fmt;
use std::str;

use thiserror::Error as ThisError;
use tracing::trace;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

/// The designated "absent" bulk string, written for missing keys.
pub static NULL_BULK_STRING: &[u8; 5] = b"$-1\r\n";

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("protocol error; invalid array")]
    InvalidArray,
    #[error("protocol error; unparsed items in array")]
    UnparsedRemainder,
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUtf8,
}

/// A reply sent back to the client. The set of variants is closed: every command produces
/// exactly one of these.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Bulk(String),
    Null,
}

impl Frame {
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => simple(DataType::SimpleString, s),
            Frame::Error(s) => simple(DataType::SimpleError, s),
            // $<length>\r\n<data>\r\n
            Frame::Bulk(data) => {
                let length_str = data.len().to_string();
                let mut bytes =
                    Vec::with_capacity(1 + length_str.len() + CRLF.len() + data.len() + CRLF.len());
                bytes.push(u8::from(DataType::BulkString));
                bytes.extend_from_slice(length_str.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(data.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Null => NULL_BULK_STRING.to_vec(),
        }
    }
}

// The payload is written verbatim; callers never pass strings containing CRLF.
fn simple(data_type: DataType, s: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
    bytes.push(u8::from(data_type));
    bytes.extend_from_slice(s.as_bytes());
    bytes.extend_from_slice(CRLF);
    bytes
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "+{}", s),
            Frame::Error(s) => write!(f, "-{}", s),
            Frame::Bulk(s) => write!(f, "${}", s),
            Frame::Null => write!(f, "$-1"),
        }
    }
}

/// Decodes a client request, `*<count>\r\n` followed by `count` bulk strings, into the command
/// name and its arguments.
///
/// The input must hold exactly one request: a short element count and trailing bytes are both
/// reported as [`Error::UnparsedRemainder`].
pub fn decode_request(data: &[u8]) -> Result<Vec<String>, Error> {
    if data.first() != Some(&u8::from(DataType::Array)) {
        return Err(Error::InvalidArray);
    }

    let sep = find_crlf(data).ok_or(Error::InvalidArray)?;
    let count = parse_length(&data[1..sep]).ok_or(Error::InvalidArray)?;

    let mut parts = Vec::with_capacity(count.min(1024));
    let mut remainder = &data[sep + CRLF.len()..];

    while !remainder.is_empty() && parts.len() < count {
        match parse_bulk_string(remainder)? {
            Some((s, rest)) => {
                trace!("parsed a bulk string: {:?}", s);
                parts.push(s);
                remainder = rest;
            }
            None => {
                trace!("no bulk string parse, remainder: {:?}", remainder);
                break;
            }
        }
    }

    if !remainder.is_empty() || parts.len() != count {
        return Err(Error::UnparsedRemainder);
    }

    Ok(parts)
}

/// Encodes a command the way clients send it: an array of bulk strings.
pub fn encode_request<S: AsRef<str>>(parts: &[S]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.push(u8::from(DataType::Array));
    bytes.extend_from_slice(parts.len().to_string().as_bytes());
    bytes.extend_from_slice(CRLF);
    for part in parts {
        bytes.extend(Frame::Bulk(part.as_ref().to_string()).serialize());
    }
    bytes
}

// $<length>\r\n<data>\r\n
//
// `Ok(None)` means the bytes are not a well formed bulk string; the length field is trusted, so a
// payload shorter than declared is a failed parse and never a truncation.
fn parse_bulk_string(data: &[u8]) -> Result<Option<(String, &[u8])>, Error> {
    if data.first() != Some(&u8::from(DataType::BulkString)) {
        return Ok(None);
    }

    let Some(sep) = find_crlf(data) else {
        return Ok(None);
    };
    let Some(length) = parse_length(&data[1..sep]) else {
        return Ok(None);
    };

    let start = sep + CRLF.len();
    let Some(end) = start.checked_add(length) else {
        return Ok(None);
    };
    let terminator = end.checked_add(CRLF.len()).and_then(|stop| data.get(end..stop));
    if terminator != Some(&CRLF[..]) {
        trace!("incorrect bulk string length");
        return Ok(None);
    }

    let s = str::from_utf8(&data[start..end]).map_err(|_| Error::InvalidUtf8)?;

    Ok(Some((s.to_string(), &data[end + CRLF.len()..])))
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|window| window == CRLF)
}

/// Parses a non-negative decimal length field.
pub(crate) fn parse_length(bytes: &[u8]) -> Option<usize> {
    str::from_utf8(bytes).ok()?.parse::<usize>().ok()
}

#[derive(Debug)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    BulkString,   // '$'
    Array,        // '*'
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
