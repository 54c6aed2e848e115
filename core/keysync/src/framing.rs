//! 32-bit-BE length-prefixed message framing over a generic byte stream.

use std::io::{self, Read, Write};

use crate::error::TransportError;

/// Messages over 2^20 bytes are rejected as `FrameTooLarge` before any
/// allocation happens.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

/// Read one length-prefixed frame from `stream`.
pub fn read_frame<S: Read>(stream: &mut S) -> Result<Vec<u8>, TransportError> {
    let mut len_bytes = [0u8; 4];
    read_exact(stream, &mut len_bytes)?;
    let len = u32::from_be_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len as usize];
    read_exact(stream, &mut payload)?;
    Ok(payload)
}

/// Write one length-prefixed frame to `stream`.
pub fn write_frame<S: Write>(stream: &mut S, payload: &[u8]) -> Result<(), TransportError> {
    let len = u32::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge(u32::MAX))?;
    if len > MAX_FRAME_LEN {
        return Err(TransportError::FrameTooLarge(len));
    }

    stream
        .write_all(&len.to_be_bytes())
        .map_err(io_to_transport)?;
    stream.write_all(payload).map_err(io_to_transport)?;
    stream.flush().map_err(io_to_transport)
}

fn read_exact<S: Read>(stream: &mut S, buf: &mut [u8]) -> Result<(), TransportError> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(TransportError::StreamClosed),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
            Err(TransportError::Timeout)
        }
        Err(e) => Err(io_to_transport(e)),
    }
}

fn io_to_transport(e: io::Error) -> TransportError {
    TransportError::Io(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), b"hello");
    }

    #[test]
    fn empty_frame_round_trips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn oversized_length_prefix_is_rejected_before_allocating() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge(_)));
    }

    #[test]
    fn truncated_stream_is_closed() {
        let mut cursor = Cursor::new(vec![0u8, 0, 0, 5, b'h', b'i']);
        let err = read_frame(&mut cursor).unwrap_err();
        assert!(matches!(err, TransportError::StreamClosed));
    }
}
