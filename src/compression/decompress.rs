use super::{CopyOffsets, Format, Operation, StreamReader};
use thiserror::Error;

/// Output limit used when the caller does not know the uncompressed size.
pub const DEFAULT_MAX_SIZE: usize = 0x100_0000;

#[derive(Debug, Clone)]
pub struct Decompressor<'a> {
    reader: StreamReader<'a>,
    format: Format,

    /// used for reporting how much of the source the stream occupied
    start_index: usize,
    capacity: usize,

    dst: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decompressed {
    pub data: Vec<u8>,
    /// length of the stream, including the end marker
    pub bytes_read: usize,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    /// Reserved: every tag byte belongs to an instruction family in the current table.
    #[error("Opcode {0:#04x} does not belong to any instruction family")]
    InvalidOpcode(u8),
    #[error("Operation at {at:#x} reaches outside the destination buffer")]
    BufferOverrun { at: usize },
    #[error("Stream ended unexpectedly at {at:#x}")]
    TruncatedStream { at: usize },
}

impl<'a> Decompressor<'a> {
    pub fn new(src: &'a [u8], offset: usize) -> Self {
        Self {
            reader: StreamReader::new(src, offset),
            format: Format::default(),

            start_index: offset,
            capacity: DEFAULT_MAX_SIZE,

            dst: Vec::new(),
        }
    }

    /// Limit the output to `capacity` bytes, usually the recorded uncompressed size.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self.dst = Vec::with_capacity(capacity.min(DEFAULT_MAX_SIZE));
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn decompress(mut self) -> Result<Decompressed, DecompressError> {
        loop {
            let at = self.reader.position();
            let value = self.reader.read()?;

            let operation = Operation::decode(value, &mut self.reader)?;
            log::trace!("{:#x}: {:?}", at, operation);

            match operation {
                Operation::ShortCopy { count, back } => {
                    let source = self.dst.len().checked_sub(back as usize);
                    self.copy_backread(at, source, count as usize)?;
                }
                Operation::End => break,
                Operation::Literal(count) => self.copy_literal(at, count as usize)?,
                Operation::Fill { count, value } => self.repeat_value(at, count as usize, value)?,
                Operation::MediumCopy { count, offset } => {
                    let source = self.far_source(offset);
                    self.copy_backread(at, source, count as usize)?;
                }
                Operation::LongCopy { count, offset } => {
                    let source = self.far_source(offset);
                    self.copy_backread(at, source, count as usize)?;
                }
            }
        }

        Ok(Decompressed {
            bytes_read: self.reader.position() - self.start_index,
            data: self.dst,
        })
    }

    fn far_source(&self, offset: u16) -> Option<usize> {
        match self.format.copy_offsets {
            CopyOffsets::Absolute => Some(offset as usize),
            CopyOffsets::Relative => self.dst.len().checked_sub(offset as usize),
        }
    }

    fn reserve(&self, at: usize, count: usize) -> Result<(), DecompressError> {
        if self.dst.len() + count > self.capacity {
            return Err(DecompressError::BufferOverrun { at });
        }

        Ok(())
    }

    fn copy_literal(&mut self, at: usize, count: usize) -> Result<(), DecompressError> {
        let bytes = self.reader.read_slice(count)?;
        self.reserve(at, count)?;
        self.dst.extend_from_slice(bytes);

        Ok(())
    }

    fn repeat_value(&mut self, at: usize, count: usize, value: u8) -> Result<(), DecompressError> {
        self.reserve(at, count)?;
        self.dst.resize(self.dst.len() + count, value);

        Ok(())
    }

    /// Source and destination may overlap, so this has to go one byte at a
    /// time in increasing order.
    fn copy_backread(
        &mut self,
        at: usize,
        source: Option<usize>,
        count: usize,
    ) -> Result<(), DecompressError> {
        if count == 0 {
            return Ok(());
        }

        let source = source
            .filter(|&source| source < self.dst.len())
            .ok_or(DecompressError::BufferOverrun { at })?;
        self.reserve(at, count)?;

        for i in 0..count {
            let value = self.dst[source + i];
            self.dst.push(value);
        }

        Ok(())
    }
}

/// Iterator over the operations of a stream, without executing them.
///
/// Yields the stream position of each operation and stops after the end
/// marker or the first error.
#[derive(Debug, Clone)]
pub struct Operations<'a> {
    reader: StreamReader<'a>,
    done: bool,
}

impl<'a> Operations<'a> {
    pub fn new(src: &'a [u8], offset: usize) -> Self {
        Self {
            reader: StreamReader::new(src, offset),
            done: false,
        }
    }

    fn next_operation(&mut self) -> Result<(usize, Operation), DecompressError> {
        let at = self.reader.position();
        let value = self.reader.read()?;
        let operation = Operation::decode(value, &mut self.reader)?;

        match operation {
            Operation::Literal(count) => {
                self.reader.read_slice(count as usize)?;
            }
            Operation::End => self.done = true,
            _ => {}
        }

        Ok((at, operation))
    }
}

impl Iterator for Operations<'_> {
    type Item = Result<(usize, Operation), DecompressError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.next_operation();
        if result.is_err() {
            self.done = true;
        }

        Some(result)
    }
}
