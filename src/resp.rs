//! # RESP: Redis Serialization Protocol
//!
//! RESP can serialize different data types including integers, strings, and arrays.
//! It also features an error-specific type. A client sends a request to the Redis server as an
//! array of bulk strings. The array's contents are the command and its arguments that the server
//! should execute. The server's reply type is command-specific.
//!
//! The first byte of data determines its type. The `\r\n` (CRLF) is the protocol's terminator,
//! which **always** separates its parts:
//!
//! - `+<text>\r\n`, a [`Frame::SimpleString`].
//! - `-<text>\r\n`, a [`Frame::Error`].
//! - `:<digits>\r\n`, a [`Frame::Integer`].
//! - `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for a null, a [`Frame::BulkString`].
//! - `*<n>\r\n<frame>...<frame>`, or `*-1\r\n` for a null, a [`Frame::Array`].
//!
//! [Official documentation](https://redis.io/docs/latest/develop/reference/protocol-spec/)
//!
//! This module is deliberately pure: [`decode`] and [`encode`] touch no I/O and hold no state,
//! so [`crate::conn`] can feed them whatever bytes a socket happens to produce, one TCP read at a
//! time.

use crate::errors::RESPError;
use memchr::memmem;

/// A single RESP message.
///
/// Frames are immutable once constructed. [`Frame::Array`] is recursive: its elements are
/// themselves frames of any variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// `+<text>\r\n`. `text` never contains a CR or LF.
    SimpleString(String),
    /// `-<text>\r\n`. Same lexical rules as [`Frame::SimpleString`]; semantically an error.
    Error(String),
    /// `:<digits>\r\n`. A signed 64-bit integer.
    Integer(i64),
    /// `$<len>\r\n<bytes>\r\n`, or `$-1\r\n` for [`None`].
    BulkString(Option<String>),
    /// `*<n>\r\n<frame>...<frame>`, or `*-1\r\n` for [`None`].
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Convenience constructor for an error reply whose message is exactly `msg`.
    pub fn error(msg: impl Into<String>) -> Frame {
        Frame::Error(msg.into())
    }

    /// Convenience constructor for a command array, used by tests and by callers that need to
    /// re-encode a request (e.g. a future AOF writer).
    pub fn array_of_bulk(items: impl IntoIterator<Item = impl Into<String>>) -> Frame {
        Frame::Array(Some(
            items
                .into_iter()
                .map(|s| Frame::BulkString(Some(s.into())))
                .collect(),
        ))
    }
}

/// Decodes a single [`Frame`] from the front of `buf`.
///
/// Returns `(None, 0)` if `buf` does not yet contain a complete frame; the caller should read
/// more bytes and retry. Returns `(Some(frame), n)` if the leading `n` bytes of `buf` constitute
/// exactly one frame; the caller must drop those `n` bytes before decoding again.
///
/// Never consumes bytes it does not understand as a complete frame: on the incomplete path the
/// returned length is always `0`, even deep inside a partially-received array. If any sub-frame
/// of an array is incomplete, the whole array is incomplete and no bytes are consumed.
///
/// # Errors
/// Returns [`RESPError`] when `buf` contains bytes that can never form a valid frame (an unknown
/// type byte, a non-numeric length, or a length less than `-1`). This is a protocol error, and
/// the caller should close the connection rather than retry.
pub fn decode(buf: &[u8]) -> Result<(Option<Frame>, usize), RESPError> {
    if buf.is_empty() {
        return Ok((None, 0));
    }

    match buf[0] {
        b'+' => match read_line(buf)? {
            None => Ok((None, 0)),
            Some((line, n)) => Ok((Some(Frame::SimpleString(line)), n)),
        },
        b'-' => match read_line(buf)? {
            None => Ok((None, 0)),
            Some((line, n)) => Ok((Some(Frame::Error(line)), n)),
        },
        b':' => match read_line(buf)? {
            None => Ok((None, 0)),
            Some((line, n)) => Ok((Some(Frame::Integer(parse_i64(&line)?)), n)),
        },
        b'$' => decode_bulk_string(buf),
        b'*' => decode_array(buf),
        other => Err(RESPError::UnsupportedRESPType(other)),
    }
}

/// Encodes `frame` to its exact RESP byte sequence.
///
/// Round-trips with [`decode`]: `decode(&encode(f)) == Ok((Some(f), encode(f).len()))` for every
/// well-formed `f`.
pub fn encode(frame: &Frame) -> Vec<u8> {
    match frame {
        Frame::SimpleString(s) => format!("+{s}\r\n").into_bytes(),
        Frame::Error(s) => format!("-{s}\r\n").into_bytes(),
        Frame::Integer(n) => format!(":{n}\r\n").into_bytes(),
        Frame::BulkString(None) => b"$-1\r\n".to_vec(),
        Frame::BulkString(Some(s)) => {
            let mut out = format!("${}\r\n", s.len()).into_bytes();
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
            out
        }
        Frame::Array(None) => b"*-1\r\n".to_vec(),
        Frame::Array(Some(elems)) => {
            let mut out = format!("*{}\r\n", elems.len()).into_bytes();
            for elem in elems {
                out.extend(encode(elem));
            }
            out
        }
    }
}

/// Scans `buf` for the line following the leading type byte, up to and including its `\r\n`.
///
/// Returns `None` (incomplete) if no `\r\n` has arrived yet. The returned `usize` is the total
/// number of bytes consumed, i.e. it includes the type byte and the terminator.
fn read_line(buf: &[u8]) -> Result<Option<(String, usize)>, RESPError> {
    match memmem::find(&buf[1..], b"\r\n") {
        None => Ok(None),
        Some(rel_pos) => {
            let end = 1 + rel_pos;
            let text = String::from_utf8(buf[1..end].to_vec()).map_err(RESPError::from)?;
            Ok(Some((text, end + 2)))
        }
    }
}

fn parse_i64(text: &str) -> Result<i64, RESPError> {
    text.parse::<i64>()
        .map_err(|_| RESPError::IntegerParseError(text.to_string()))
}

/// Reads the `<len>` line common to bulk strings and arrays.
///
/// Returns `Ok(None)` if incomplete, `Ok(Some((Some(len), header_len)))` for a normal
/// non-negative length, or `Ok(Some((None, header_len)))` for the special `-1` (null) length.
fn read_len(buf: &[u8]) -> Result<Option<(Option<usize>, usize)>, RESPError> {
    let (line, header_len) = match read_line(buf)? {
        None => return Ok(None),
        Some(v) => v,
    };
    let len = parse_i64(&line)?;
    if len == -1 {
        return Ok(Some((None, header_len)));
    }
    if len < -1 {
        return Err(RESPError::NegativeLength);
    }
    Ok(Some((Some(len as usize), header_len)))
}

fn decode_bulk_string(buf: &[u8]) -> Result<(Option<Frame>, usize), RESPError> {
    let (len, header_len) = match read_len(buf)? {
        None => return Ok((None, 0)),
        Some((None, header_len)) => return Ok((Some(Frame::BulkString(None)), header_len)),
        Some((Some(len), header_len)) => (len, header_len),
    };

    let total = header_len + len + 2;
    if buf.len() < total {
        return Ok((None, 0));
    }
    let payload = &buf[header_len..header_len + len];
    if &buf[header_len + len..total] != b"\r\n" {
        return Err(RESPError::MissingCRLF);
    }
    let text = String::from_utf8(payload.to_vec()).map_err(RESPError::from)?;
    Ok((Some(Frame::BulkString(Some(text))), total))
}

fn decode_array(buf: &[u8]) -> Result<(Option<Frame>, usize), RESPError> {
    let (count, header_len) = match read_len(buf)? {
        None => return Ok((None, 0)),
        Some((None, header_len)) => return Ok((Some(Frame::Array(None)), header_len)),
        Some((Some(count), header_len)) => (count, header_len),
    };

    let mut elems = Vec::with_capacity(count);
    let mut offset = header_len;
    for _ in 0..count {
        match decode(&buf[offset..])? {
            (None, _) => return Ok((None, 0)),
            (Some(frame), n) => {
                elems.push(frame);
                offset += n;
            }
        }
    }
    Ok((Some(Frame::Array(Some(elems))), offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_simple_string() {
        assert_eq!(
            decode(b"+OK\r\n").unwrap(),
            (Some(Frame::SimpleString("OK".into())), 5)
        );
    }

    #[test]
    fn decode_error() {
        assert_eq!(
            decode(b"-ERR oops\r\n").unwrap(),
            (Some(Frame::Error("ERR oops".into())), 11)
        );
    }

    #[test]
    fn decode_integer_positive_and_negative() {
        assert_eq!(decode(b":1000\r\n").unwrap(), (Some(Frame::Integer(1000)), 7));
        assert_eq!(
            decode(b":-1000\r\n").unwrap(),
            (Some(Frame::Integer(-1000)), 8)
        );
        assert_eq!(decode(b":+5\r\n").unwrap(), (Some(Frame::Integer(5)), 5));
    }

    #[test]
    fn decode_bulk_string_hello() {
        assert_eq!(
            decode(b"$5\r\nhello\r\n").unwrap(),
            (Some(Frame::BulkString(Some("hello".into()))), 11)
        );
    }

    #[test]
    fn decode_bulk_string_empty() {
        assert_eq!(
            decode(b"$0\r\n\r\n").unwrap(),
            (Some(Frame::BulkString(Some("".into()))), 6)
        );
    }

    #[test]
    fn decode_bulk_string_null() {
        assert_eq!(
            decode(b"$-1\r\n").unwrap(),
            (Some(Frame::BulkString(None)), 5)
        );
    }

    #[test]
    fn decode_array_null() {
        assert_eq!(decode(b"*-1\r\n").unwrap(), (Some(Frame::Array(None)), 5));
    }

    #[test]
    fn decode_array_ping() {
        let (frame, n) = decode(b"*1\r\n$4\r\nPING\r\n").unwrap();
        assert_eq!(frame, Some(Frame::array_of_bulk(["PING"])));
        assert_eq!(n, 14);
    }

    #[test]
    fn decode_array_nested() {
        let input = b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Hello\r\n-World\r\n";
        let (frame, n) = decode(input).unwrap();
        let expected = Frame::Array(Some(vec![
            Frame::Array(Some(vec![
                Frame::Integer(1),
                Frame::Integer(2),
                Frame::Integer(3),
            ])),
            Frame::Array(Some(vec![
                Frame::SimpleString("Hello".into()),
                Frame::Error("World".into()),
            ])),
        ]));
        assert_eq!(frame, Some(expected));
        assert_eq!(n, input.len());
    }

    #[test]
    fn decode_array_with_null_element() {
        let input = b"*3\r\n$5\r\nhello\r\n$-1\r\n$5\r\nworld\r\n";
        let (frame, n) = decode(input).unwrap();
        assert_eq!(
            frame,
            Some(Frame::Array(Some(vec![
                Frame::BulkString(Some("hello".into())),
                Frame::BulkString(None),
                Frame::BulkString(Some("world".into())),
            ])))
        );
        assert_eq!(n, input.len());
    }

    #[test]
    fn incomplete_simple_string() {
        assert_eq!(decode(b"+OK").unwrap(), (None, 0));
        assert_eq!(decode(b"").unwrap(), (None, 0));
    }

    #[test]
    fn incomplete_bulk_string_header_and_body() {
        assert_eq!(decode(b"$5\r\n").unwrap(), (None, 0));
        assert_eq!(decode(b"$5\r\nhel").unwrap(), (None, 0));
    }

    #[test]
    fn incomplete_array_mid_element_consumes_nothing() {
        // The first element (PING) is complete, the second (ECHO's argument) is not.
        let partial = b"*2\r\n$4\r\nPING\r\n$5\r\nHel";
        assert_eq!(decode(partial).unwrap(), (None, 0));
    }

    #[test]
    fn negative_length_other_than_minus_one_is_a_protocol_error() {
        assert!(matches!(decode(b"$-2\r\n"), Err(RESPError::NegativeLength)));
        assert!(matches!(decode(b"*-5\r\n"), Err(RESPError::NegativeLength)));
    }

    #[test]
    fn unknown_type_byte_is_a_protocol_error() {
        assert!(matches!(
            decode(b"!whatever\r\n"),
            Err(RESPError::UnsupportedRESPType(b'!'))
        ));
    }

    #[test]
    fn round_trip_property_holds_for_every_variant() {
        let frames = vec![
            Frame::SimpleString("PONG".into()),
            Frame::Error("WRONGTYPE bad".into()),
            Frame::Integer(-42),
            Frame::BulkString(Some("hello".into())),
            Frame::BulkString(None),
            Frame::Array(None),
            Frame::array_of_bulk(["SET", "k", "v"]),
            Frame::Array(Some(vec![])),
        ];
        for frame in frames {
            let encoded = encode(&frame);
            let (decoded, n) = decode(&encoded).unwrap();
            assert_eq!(decoded, Some(frame));
            assert_eq!(n, encoded.len());
        }
    }

    #[test]
    fn incremental_property_every_short_prefix_is_incomplete() {
        let frame = Frame::array_of_bulk(["SET", "foo", "bar"]);
        let encoded = encode(&frame);
        let (_, n) = decode(&encoded).unwrap();
        assert_eq!(n, encoded.len());
        for prefix_len in 0..n {
            assert_eq!(decode(&encoded[..prefix_len]).unwrap(), (None, 0));
        }
    }
}
