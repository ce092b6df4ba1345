//! Fortran unformatted sequential records: a 4-byte length, the payload,
//! then the length again.

use std::io::{self, Read, Write};

use dorade_core::ByteOrder;

pub fn write_record<W: Write>(writer: &mut W, payload: &[u8], order: ByteOrder) -> io::Result<()> {
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "record longer than 4 GiB"))?;
    let marker = order.u32_bytes(len);
    writer.write_all(&marker)?;
    writer.write_all(payload)?;
    writer.write_all(&marker)
}

/// Read one record, keeping at most `max` bytes of its payload.
///
/// The rest of the payload and the trailing length are skipped. Returns
/// `None` at a clean end of file.
pub fn read_record<R: Read>(reader: &mut R, max: usize, order: ByteOrder) -> io::Result<Option<Vec<u8>>> {
    let mut marker = [0u8; 4];
    let mut got = 0;
    while got < marker.len() {
        match reader.read(&mut marker[got..])? {
            0 if got == 0 => return Ok(None),
            0 => return Err(io::ErrorKind::UnexpectedEof.into()),
            n => got += n,
        }
    }
    let len = order.read_u32(marker) as usize;

    let keep = len.min(max);
    let mut payload = vec![0u8; keep];
    reader.read_exact(&mut payload)?;

    // Excess payload plus the trailing length word
    let skip = (len - keep) as u64 + 4;
    let skipped = io::copy(&mut reader.by_ref().take(skip), &mut io::sink())?;
    if skipped < skip {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_record_framing() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"abcdef", ByteOrder::Native).unwrap();
        assert_eq!(buf.len(), 14);
        assert_eq!(&buf[..4], &6u32.to_ne_bytes());
        assert_eq!(&buf[10..], &6u32.to_ne_bytes());
    }

    #[test]
    fn test_read_sequence_then_eof() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"first", ByteOrder::Swapped).unwrap();
        write_record(&mut buf, b"", ByteOrder::Swapped).unwrap();
        write_record(&mut buf, b"third", ByteOrder::Swapped).unwrap();

        let mut r = Cursor::new(buf);
        assert_eq!(read_record(&mut r, 64, ByteOrder::Swapped).unwrap(), Some(b"first".to_vec()));
        assert_eq!(read_record(&mut r, 64, ByteOrder::Swapped).unwrap(), Some(Vec::new()));
        assert_eq!(read_record(&mut r, 64, ByteOrder::Swapped).unwrap(), Some(b"third".to_vec()));
        assert_eq!(read_record(&mut r, 64, ByteOrder::Swapped).unwrap(), None);
    }

    #[test]
    fn test_oversized_record_is_truncated_and_skipped() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"0123456789", ByteOrder::Native).unwrap();
        write_record(&mut buf, b"next", ByteOrder::Native).unwrap();

        let mut r = Cursor::new(buf);
        assert_eq!(read_record(&mut r, 4, ByteOrder::Native).unwrap(), Some(b"0123".to_vec()));
        assert_eq!(read_record(&mut r, 4, ByteOrder::Native).unwrap(), Some(b"next".to_vec()));
    }

    #[test]
    fn test_truncated_record_fails() {
        let mut buf = Vec::new();
        write_record(&mut buf, b"payload", ByteOrder::Native).unwrap();
        buf.truncate(buf.len() - 2);
        let mut r = Cursor::new(buf);
        assert!(read_record(&mut r, 64, ByteOrder::Native).is_err());
    }
}
