//! CRC-64 footers for binary files

use std::io::{self, Write};

use crc::{Crc, CRC_64_GO_ISO};

pub const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Writer that checksums every byte passing through it
pub struct ChecksumWriter<W: Write> {
    inner: W,
    digest: crc::Digest<'static, u64>,
    written: u64,
}

impl<W: Write> ChecksumWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            digest: CRC64.digest(),
            written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Append the checksum of everything written so far (not itself checksummed).
    pub fn finish(mut self) -> io::Result<W> {
        let sum = self.digest.finalize();
        self.inner.write_all(&sum.to_le_bytes())?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.digest.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Split `data` into body and trailing 8-byte checksum, verifying the latter.
pub fn verify_footer(data: &[u8]) -> Result<&[u8], String> {
    if data.len() < 8 {
        return Err(format!("{} bytes is too short for a checksum footer", data.len()));
    }
    let (body, footer) = data.split_at(data.len() - 8);
    let mut stored = [0u8; 8];
    stored.copy_from_slice(footer);
    let stored = u64::from_le_bytes(stored);
    let actual = checksum(body);
    if stored != actual {
        return Err(format!(
            "checksum mismatch: stored 0x{stored:016x}, computed 0x{actual:016x}"
        ));
    }
    Ok(body)
}
