//! Cursor over a raw DNS message buffer.
//!
//! DNS names may contain backward references into the message, so name reads
//! that cross a compression pointer save the resume position explicitly and
//! follow the chain with a hop cap and visited-offset tracking. The wire
//! format alone does not rule out pointer loops.

use crate::error::ProtocolError;

/// Compression pointers followed per name before the decoder gives up.
const MAX_POINTER_HOPS: usize = 20;

/// Top two bits of a label length byte marking a compression pointer.
const POINTER_MASK: u8 = 0xC0;

pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reposition to an absolute offset inside the buffer.
    pub fn seek(&mut self, pos: usize) -> Result<(), ProtocolError> {
        if pos > self.buf.len() {
            return Err(ProtocolError::UnexpectedEnd { offset: pos });
        }
        self.pos = pos;
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(ProtocolError::UnexpectedEnd { offset: self.pos })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        self.take(1).map(|bytes| bytes[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.take(2)
            .map(|bytes| u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        self.take(4)
            .map(|bytes| u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        self.take(len)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ProtocolError> {
        self.take(len).map(|_| ())
    }

    /// Read a possibly-compressed domain name starting at the current
    /// position.
    ///
    /// After the call the cursor sits just past the name's in-stream bytes:
    /// past the terminating zero label, or past the first pointer if one was
    /// followed.
    pub fn read_name(&mut self) -> Result<String, ProtocolError> {
        let mut labels: Vec<String> = Vec::new();
        let mut resume: Option<usize> = None;
        let mut visited: Vec<usize> = Vec::new();

        loop {
            let len = self.read_u8()?;
            if len == 0 {
                break;
            }
            if len & POINTER_MASK == POINTER_MASK {
                let low = self.read_u8()?;
                let offset = usize::from(len & !POINTER_MASK) << 8 | usize::from(low);
                if offset >= self.buf.len() {
                    return Err(ProtocolError::BadPointer { offset });
                }
                if visited.len() >= MAX_POINTER_HOPS || visited.contains(&offset) {
                    return Err(ProtocolError::PointerLoop {
                        max: MAX_POINTER_HOPS,
                    });
                }
                visited.push(offset);
                // The stream continues after the first pointer once the
                // referenced name has been read out.
                if resume.is_none() {
                    resume = Some(self.pos);
                }
                self.pos = offset;
                continue;
            }
            if len & POINTER_MASK != 0 {
                // 0b01/0b10 length prefixes are reserved by the wire format
                return Err(ProtocolError::BadLabel {
                    offset: self.pos - 1,
                });
            }
            let bytes = self.take(usize::from(len))?;
            labels.push(String::from_utf8_lossy(bytes).into_owned());
        }

        if let Some(pos) = resume {
            self.pos = pos;
        }
        Ok(labels.join("."))
    }
}
