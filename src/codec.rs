use bytes::{Buf, BufMut, BytesMut};
use std::io::{self, Cursor};
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, decode_request, find_crlf, parse_length, Frame, CRLF};

const DEFAULT_MAX_REQUEST_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error(transparent)]
    Frame(#[from] frame::Error),
    #[error("request size exceeds limit of {limit} bytes")]
    FrameTooLarge { limit: usize },
    #[error("connection closed with {remaining} bytes of an incomplete request")]
    UnexpectedEof { remaining: usize },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Splits the inbound byte stream into requests by following the declared RESP lengths, so a
/// request is handed to [`decode_request`] only once all of its bytes are buffered. Pipelined
/// requests are yielded one at a time.
pub struct RequestCodec {
    max_request_size: usize,
}

impl RequestCodec {
    pub fn new(max_request_size: usize) -> RequestCodec {
        RequestCodec { max_request_size }
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUEST_SIZE)
    }
}

impl Decoder for RequestCodec {
    type Item = Vec<String>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut cursor = Cursor::new(&src[..]);
        let length = match check_request(&mut cursor) {
            Ok(()) => cursor.position() as usize,
            Err(Scan::Incomplete) if src.len() > self.max_request_size => {
                return Err(CodecError::FrameTooLarge {
                    limit: self.max_request_size,
                })
            }
            Err(Scan::Incomplete) => return Ok(None),
            Err(Scan::Invalid(err)) => return Err(err.into()),
        };

        if length > self.max_request_size {
            return Err(CodecError::FrameTooLarge {
                limit: self.max_request_size,
            });
        }

        // Remove the request from the buffer; whatever follows belongs to the next one.
        let request = src.split_to(length);

        Ok(Some(decode_request(&request)?))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if src.is_empty() => Ok(None),
            None => Err(CodecError::UnexpectedEof {
                remaining: src.len(),
            }),
        }
    }
}

impl Encoder<Frame> for RequestCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.put_slice(&frame.serialize());
        Ok(())
    }
}

#[derive(Debug)]
enum Scan {
    Incomplete,
    Invalid(frame::Error),
}

// *<number-of-elements>\r\n$<length>\r\n<data>\r\n...
//
// Advances the cursor past exactly one request without allocating.
fn check_request(src: &mut Cursor<&[u8]>) -> Result<(), Scan> {
    if get_byte(src)? != b'*' {
        return Err(Scan::Invalid(frame::Error::InvalidArray));
    }
    let count = get_length(src).map_err(|e| e.or(frame::Error::InvalidArray))?;

    for _ in 0..count {
        if get_byte(src)? != b'$' {
            return Err(Scan::Invalid(frame::Error::UnparsedRemainder));
        }
        let length = get_length(src).map_err(|e| e.or(frame::Error::UnparsedRemainder))?;
        let payload_end = length
            .checked_add(CRLF.len())
            .ok_or(Scan::Invalid(frame::Error::UnparsedRemainder))?;

        if src.remaining() < payload_end {
            return Err(Scan::Incomplete);
        }
        src.advance(length);
        if &src.chunk()[..CRLF.len()] != CRLF {
            return Err(Scan::Invalid(frame::Error::UnparsedRemainder));
        }
        src.advance(CRLF.len());
    }

    Ok(())
}

impl Scan {
    fn or(self, err: frame::Error) -> Scan {
        match self {
            Scan::Incomplete => Scan::Incomplete,
            Scan::Invalid(_) => Scan::Invalid(err),
        }
    }
}

fn get_length(src: &mut Cursor<&[u8]>) -> Result<usize, Scan> {
    let start = src.position() as usize;
    let line_end = find_crlf(&src.get_ref()[start..])
        .map(|index| start + index)
        .ok_or(Scan::Incomplete)?;

    src.set_position((line_end + CRLF.len()) as u64);

    parse_length(&src.get_ref()[start..line_end])
        .ok_or(Scan::Invalid(frame::Error::UnparsedRemainder))
}

fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Scan> {
    if !src.has_remaining() {
        return Err(Scan::Incomplete);
    }
    Ok(src.get_u8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_request() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n"[..]);

        let request = codec.decode(&mut buf).unwrap();

        assert_eq!(request, Some(vec!["GET".to_string(), "foo".to_string()]));
        assert!(buf.is_empty());
    }

    #[test]
    fn incomplete_request_waits_for_more_bytes() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nGET\r\n$3\r\nfo"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf.len(), 19);

        buf.extend_from_slice(b"o\r\n");

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(vec!["GET".to_string(), "foo".to_string()])
        );
    }

    #[test]
    fn incomplete_length_line() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n$1"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn pipelined_requests() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nPING\r\n$2\r\nhi\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(vec!["PING".to_string()])
        );
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(vec!["PING".to_string(), "hi".to_string()])
        );
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn request_size_multiple_of_read_chunk() {
        let mut codec = RequestCodec::default();
        let value = "v".repeat(4096);
        let request = crate::frame::encode_request(&["SET", "k", value.as_str()]);
        let mut buf = BytesMut::from(&request[..]);

        let request = codec.decode(&mut buf).unwrap().unwrap();

        assert_eq!(request[2], value);
    }

    #[test]
    fn not_an_array() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"PING\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Frame(frame::Error::InvalidArray))
        ));
    }

    #[test]
    fn invalid_count() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*two\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Frame(frame::Error::InvalidArray))
        ));
    }

    #[test]
    fn declared_length_does_not_match_payload() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n$3\r\nhello\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Frame(frame::Error::UnparsedRemainder))
        ));
    }

    #[test]
    fn missing_bulk_marker() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*1\r\n:1\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Frame(frame::Error::UnparsedRemainder))
        ));
    }

    #[test]
    fn request_too_large() {
        let mut codec = RequestCodec::new(16);
        let mut buf = BytesMut::from(&b"*1\r\n$20\r\naaaaaaaaaaaaaaaaaaaa\r\n"[..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::FrameTooLarge { limit: 16 })
        ));
    }

    #[test]
    fn eof_with_partial_request() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::from(&b"*2\r\n$5\r\nhello\r\n"[..]);

        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CodecError::UnexpectedEof { remaining: 15 })
        ));
    }

    #[test]
    fn eof_with_empty_buffer() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::new();

        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn encode_reply() {
        let mut codec = RequestCodec::default();
        let mut buf = BytesMut::new();

        codec.encode(Frame::Simple("OK".to_string()), &mut buf).unwrap();
        codec.encode(Frame::Null, &mut buf).unwrap();

        assert_eq!(&buf[..], b"+OK\r\n$-1\r\n");
    }
}
