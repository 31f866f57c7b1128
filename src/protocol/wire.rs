//! Byte-stream primitives used by the manifest codec and the dispatch hook.
//!
//! All integers are little-endian. Strings are UTF-8 prefixed with a `u16`
//! byte length. Every read and write either completes or leaves the stream
//! untouched, so a failed read never consumes a partial value.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Error, Result};

const LEN_PREFIX: usize = 2;

/// Reading half of the host stream abstraction.
pub trait WireRead {
    /// Read one byte
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a little-endian `u16`
    fn read_u16(&mut self) -> Result<u16>;

    /// Read a length-prefixed UTF-8 string
    fn read_string(&mut self) -> Result<String>;
}

/// Writing half of the host stream abstraction.
pub trait WireWrite {
    /// Write one byte
    fn write_u8(&mut self, value: u8) -> Result<()>;

    /// Write a little-endian `u16`
    fn write_u16(&mut self, value: u16) -> Result<()>;

    /// Write a length-prefixed UTF-8 string
    fn write_string(&mut self, value: &str) -> Result<()>;
}

fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(Error::UnexpectedEof { needed, remaining });
    }
    Ok(())
}

fn get_u8<B: Buf>(buf: &mut B) -> Result<u8> {
    ensure_remaining(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_u16<B: Buf>(buf: &mut B) -> Result<u16> {
    ensure_remaining(buf, 2)?;
    Ok(buf.get_u16_le())
}

// Only valid for contiguous buffers; both readers below are.
fn get_string<B: Buf>(buf: &mut B) -> Result<String> {
    ensure_remaining(buf, LEN_PREFIX)?;
    let chunk = buf.chunk();
    let len = u16::from_le_bytes([chunk[0], chunk[1]]) as usize;
    ensure_remaining(buf, LEN_PREFIX + len)?;

    let text = std::str::from_utf8(&chunk[LEN_PREFIX..LEN_PREFIX + len])
        .map_err(|_| Error::InvalidUtf8)?
        .to_owned();
    buf.advance(LEN_PREFIX + len);
    Ok(text)
}

fn put_string<B: BufMut>(buf: &mut B, value: &str) -> Result<()> {
    let len = u16::try_from(value.len()).map_err(|_| Error::StringTooLong {
        len: value.len(),
        max: u16::MAX as usize,
    })?;
    buf.put_u16_le(len);
    buf.put_slice(value.as_bytes());
    Ok(())
}

impl WireRead for &[u8] {
    fn read_u8(&mut self) -> Result<u8> {
        get_u8(self)
    }

    fn read_u16(&mut self) -> Result<u16> {
        get_u16(self)
    }

    fn read_string(&mut self) -> Result<String> {
        get_string(self)
    }
}

impl WireRead for Bytes {
    fn read_u8(&mut self) -> Result<u8> {
        get_u8(self)
    }

    fn read_u16(&mut self) -> Result<u16> {
        get_u16(self)
    }

    fn read_string(&mut self) -> Result<String> {
        get_string(self)
    }
}

impl WireWrite for BytesMut {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put_u8(value);
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put_u16_le(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        put_string(self, value)
    }
}

impl WireWrite for Vec<u8> {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.put_u8(value);
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.put_u16_le(value);
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        put_string(self, value)
    }
}
