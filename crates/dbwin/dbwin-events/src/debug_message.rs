#![forbid(unsafe_code)]

// Frame layout inside the shared buffer:
//
//   offset 0 .. 4    process id, u32 little-endian
//   offset 4 .. cap  text, NUL-terminated when shorter than the buffer
//
// Writers always terminate the text. A frame that fills the whole buffer
// without a NUL is still accepted: the remainder of the buffer is the message.

use crate::HEADER_SIZE;

/// One string captured from the debug channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct DebugMessage {
    pub process_id: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("frame of {len} bytes is shorter than the 4-byte header")]
    Truncated { len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("buffer of {len} bytes cannot hold a header and a terminator")]
    BufferTooSmall { len: usize },
}

impl DebugMessage {
    pub fn new(process_id: u32, message: impl Into<String>) -> Self {
        Self {
            process_id,
            message: message.into(),
        }
    }

    /// Decodes a frame from the shared buffer.
    ///
    /// The process id is read from the first four bytes. The text runs up to
    /// the first NUL or the end of `region`, whichever comes first, and is
    /// decoded as UTF-8 with invalid sequences replaced by U+FFFD.
    ///
    /// # Errors
    /// `DecodeError::Truncated` if `region` cannot hold the header.
    pub fn decode(region: &[u8]) -> Result<Self, DecodeError> {
        let Some((header, text)) = region.split_first_chunk::<HEADER_SIZE>() else {
            return Err(DecodeError::Truncated { len: region.len() });
        };

        let process_id = u32::from_le_bytes(*header);
        let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());

        Ok(Self {
            process_id,
            message: String::from_utf8_lossy(&text[..end]).into_owned(),
        })
    }

    /// Writes this message into `dst` the way a debug-channel writer does.
    ///
    /// The text is cut at a char boundary so that the header, the text and
    /// the NUL terminator all fit. Returns the number of bytes written,
    /// terminator included.
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize, EncodeError> {
        if dst.len() < HEADER_SIZE + 1 {
            return Err(EncodeError::BufferTooSmall { len: dst.len() });
        }

        let text = truncate_at_char_boundary(&self.message, dst.len() - HEADER_SIZE - 1);
        let end = HEADER_SIZE + text.len();

        dst[..HEADER_SIZE].copy_from_slice(&self.process_id.to_le_bytes());
        dst[HEADER_SIZE..end].copy_from_slice(text.as_bytes());
        dst[end] = 0;

        Ok(end + 1)
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
