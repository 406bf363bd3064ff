use std::io;

use crate::error::Result;

/// Reliable byte-stream consumed by the record layer. Blocking from the
/// connection's point of view; integrating with an event loop is the
/// caller's concern.
pub trait Transport: Send {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

impl<T: io::Read + io::Write + Send> Transport for T {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        Ok(io::Read::read_exact(self, buf)?)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        io::Write::write_all(self, buf)?;
        Ok(io::Write::flush(self)?)
    }
}
