use serde::{Deserialize, Serialize};
use thiserror::Error;

mod compress;
pub use compress::Compressor;

mod decompress;
pub use decompress::{Decompressed, DecompressError, Decompressor, Operations, DEFAULT_MAX_SIZE};

pub const END_MARKER: u8 = 0x80;
pub const FILL: u8 = 0xfe;
pub const LONG_COPY: u8 = 0xff;

pub const MIN_MATCH: usize = 3;
pub const MAX_LITERAL_RUN: u8 = 0x3f;

pub const MAX_SHORT_COPY: usize = 10;
pub const MAX_SHORT_OFFSET: usize = 0x0fff;
// 0xfe and 0xff belong to fill and long copy, so 0xfd is the last medium tag
pub const MAX_MEDIUM_COPY: usize = 0x3d + 3;
pub const MAX_LONG_COPY: usize = 0xffff;

pub const MIN_FILL_RUN: usize = 65;
pub const MAX_FILL_RUN: usize = 0xffff;

/// How medium and long copies store their source position.
///
/// Short copies always store a backward distance from the write cursor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyOffsets {
    /// Index from the start of the destination buffer (the legacy decoder behaviour).
    #[default]
    Absolute,
    /// Backward distance from the write cursor, the same as short copies.
    Relative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Format {
    #[serde(default)]
    pub copy_offsets: CopyOffsets,
}

impl Format {
    pub const fn relative() -> Self {
        Self {
            copy_offsets: CopyOffsets::Relative,
        }
    }
}

/// A single instruction of the opcode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `0ccc oooo`, one offset byte. Copies `count` bytes from `back` bytes behind the cursor.
    ShortCopy { count: u8, back: u16 },
    /// `1000 0000`
    End,
    /// `10cc cccc`, followed by `count` raw bytes.
    Literal(u8),
    /// `1111 1110`, u16 count, value.
    Fill { count: u16, value: u8 },
    /// `11cc cccc`, u16 offset.
    MediumCopy { count: u8, offset: u16 },
    /// `1111 1111`, u16 count, u16 offset.
    LongCopy { count: u16, offset: u16 },
}

impl Operation {
    pub fn decode(op: u8, reader: &mut StreamReader) -> Result<Self, DecompressError> {
        let operation = match op {
            n @ 0x00..0x80 => Self::ShortCopy {
                count: (n >> 4) + 3,
                back: u16::from_be_bytes([n & 0x0f, reader.read()?]),
            },

            END_MARKER => Self::End,
            n @ 0x81..0xc0 => Self::Literal(n & 0x3f),

            n @ 0xc0..FILL => Self::MediumCopy {
                count: (n & 0x3f) + 3,
                offset: reader.read_u16()?,
            },
            FILL => {
                let count = reader.read_u16()?;
                let value = reader.read()?;

                Self::Fill { count, value }
            }
            LONG_COPY => {
                let count = reader.read_u16()?;
                let offset = reader.read_u16()?;

                Self::LongCopy { count, offset }
            }
        };

        Ok(operation)
    }

    /// The tag byte that starts this instruction. Only meaningful for
    /// operations that fit the opcode table.
    pub(crate) fn tag(&self) -> u8 {
        match *self {
            Self::ShortCopy { count, back } => ((count - 3) << 4) | (back >> 8) as u8,
            Self::End => END_MARKER,
            Self::Literal(count) => END_MARKER | count,
            Self::Fill { .. } => FILL,
            Self::MediumCopy { count, .. } => 0xc0 | (count - 3),
            Self::LongCopy { .. } => LONG_COPY,
        }
    }

    /// Append the instruction to `dst`. Literal bytes are not part of the
    /// operation and have to be written by the caller.
    ///
    /// Counts and offsets outside the range of their family would produce a
    /// tag of another family, so they are rejected and `dst` is left as is.
    pub fn encode(&self, dst: &mut Vec<u8>) -> Result<(), EncodeError> {
        if !self.is_encodable() {
            return Err(EncodeError(*self));
        }

        self.write(dst);
        Ok(())
    }

    pub(crate) fn write(&self, dst: &mut Vec<u8>) {
        debug_assert!(self.is_encodable(), "{self:?} does not fit the opcode table");

        dst.push(self.tag());

        match *self {
            Self::ShortCopy { back, .. } => dst.push((back & 0xff) as u8),
            Self::End | Self::Literal(_) => {}
            Self::Fill { count, value } => {
                dst.extend_from_slice(&count.to_le_bytes());
                dst.push(value);
            }
            Self::MediumCopy { offset, .. } => dst.extend_from_slice(&offset.to_le_bytes()),
            Self::LongCopy { count, offset } => {
                dst.extend_from_slice(&count.to_le_bytes());
                dst.extend_from_slice(&offset.to_le_bytes());
            }
        }
    }

    fn is_encodable(&self) -> bool {
        match *self {
            Self::ShortCopy { count, back } => {
                (MIN_MATCH..=MAX_SHORT_COPY).contains(&(count as usize))
                    && back as usize <= MAX_SHORT_OFFSET
            }
            Self::Literal(count) => (1..=MAX_LITERAL_RUN).contains(&count),
            Self::MediumCopy { count, .. } => {
                (MIN_MATCH..=MAX_MEDIUM_COPY).contains(&(count as usize))
            }
            Self::End | Self::Fill { .. } | Self::LongCopy { .. } => true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Operation {0:?} does not fit the opcode table")]
pub struct EncodeError(pub Operation);

/// Forward-only reader over an opcode stream.
#[derive(Debug, Clone)]
pub struct StreamReader<'a> {
    src: &'a [u8],
    read_index: usize,
}

impl<'a> StreamReader<'a> {
    pub fn new(src: &'a [u8], offset: usize) -> Self {
        Self {
            src,
            read_index: offset,
        }
    }

    pub fn position(&self) -> usize {
        self.read_index
    }

    pub fn read(&mut self) -> Result<u8, DecompressError> {
        let value = *self
            .src
            .get(self.read_index)
            .ok_or(DecompressError::TruncatedStream {
                at: self.read_index,
            })?;
        self.read_index += 1;

        Ok(value)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecompressError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_slice(&mut self, count: usize) -> Result<&'a [u8], DecompressError> {
        let end = self.read_index + count;
        let slice = self
            .src
            .get(self.read_index..end)
            .ok_or(DecompressError::TruncatedStream {
                at: self.src.len().min(end),
            })?;
        self.read_index = end;

        Ok(slice)
    }
}

/// Compress `src` using the default (absolute offset) format.
pub fn compress(src: &[u8]) -> Vec<u8> {
    Compressor::new(src).compress()
}

pub fn compress_with(src: &[u8], format: Format) -> Vec<u8> {
    Compressor::new(src).with_format(format).compress()
}

/// Decompress a stream whose uncompressed size is known to be at most `capacity`.
pub fn decompress(src: &[u8], capacity: usize) -> Result<Vec<u8>, DecompressError> {
    decompress_with(src, capacity, Format::default())
}

pub fn decompress_with(
    src: &[u8],
    capacity: usize,
    format: Format,
) -> Result<Vec<u8>, DecompressError> {
    let result = Decompressor::new(src, 0)
        .with_capacity(capacity)
        .with_format(format)
        .decompress()?;

    Ok(result.data)
}

/// Decompress into a caller-owned buffer, returning the number of bytes written.
///
/// The buffer length is the capacity; on error `dst` is left untouched.
pub fn decompress_into(src: &[u8], dst: &mut [u8]) -> Result<usize, DecompressError> {
    decompress_into_with(src, dst, Format::default())
}

pub fn decompress_into_with(
    src: &[u8],
    dst: &mut [u8],
    format: Format,
) -> Result<usize, DecompressError> {
    let result = Decompressor::new(src, 0)
        .with_capacity(dst.len())
        .with_format(format)
        .decompress()?;

    let written = result.data.len();
    dst[..written].copy_from_slice(&result.data);

    Ok(written)
}
