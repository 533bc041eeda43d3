//! Newline-Delimited Frame Encoding
//!
//! Provides reliable message boundaries over stream-based IPC (stdin/stdout).
//! JSON never contains a raw newline outside of string escapes, so one line
//! is exactly one message.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Maximum frame size (16 MB) to prevent memory exhaustion
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Errors that can occur during frame encoding/decoding
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Line was not a valid message
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Frame exceeds `MAX_FRAME_SIZE`
    #[error("Frame too large: {size} bytes (max {max} bytes)")]
    FrameTooLarge {
        /// Observed size (lower bound when reading)
        size: usize,
        /// Configured maximum
        max: usize,
    },

    /// Empty or truncated line
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Peer closed the stream
    #[error("End of stream")]
    EndOfStream,
}

impl FrameError {
    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::Io(_) => "IO",
            FrameError::Serialization(_) => "SERIALIZATION",
            FrameError::Deserialization(_) => "DESERIALIZATION",
            FrameError::FrameTooLarge { .. } => "FRAME_TOO_LARGE",
            FrameError::InvalidFrame(_) => "INVALID_FRAME",
            FrameError::EndOfStream => "END_OF_STREAM",
        }
    }
}

/// Write one message as a single JSON line
///
/// Frame format:
/// ```text
/// {"type":"run","id":1,...}\n
/// ```
pub fn write_frame<W, T>(writer: &mut BufWriter<W>, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize,
{
    let mut bytes =
        serde_json::to_vec(message).map_err(|e| FrameError::Serialization(e.to_string()))?;

    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FrameError::FrameTooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    bytes.push(b'\n');
    writer.write_all(&bytes)?;

    // Flush to ensure message is sent
    writer.flush()?;

    Ok(())
}

/// Read one JSON line and decode it
pub fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_FRAME_SIZE as u64 + 1)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Err(FrameError::EndOfStream);
    }

    if line.last() != Some(&b'\n') {
        if line.len() > MAX_FRAME_SIZE {
            return Err(FrameError::FrameTooLarge {
                size: line.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        return Err(FrameError::InvalidFrame("truncated frame".to_string()));
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    if line.is_empty() {
        return Err(FrameError::InvalidFrame("empty frame".to_string()));
    }

    serde_json::from_slice(&line).map_err(|e| FrameError::Deserialization(e.to_string()))
}

/// Frame writer wrapper for convenient message sending
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Create a new frame writer
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
        }
    }

    /// Write a message
    pub fn write<T: Serialize>(&mut self, message: &T) -> Result<(), FrameError> {
        write_frame(&mut self.writer, message)
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<(), FrameError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Get mutable reference to the inner writer
    pub fn inner_mut(&mut self) -> &mut BufWriter<W> {
        &mut self.writer
    }
}

/// Frame reader wrapper for convenient message receiving
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(64 * 1024, reader),
        }
    }

    /// Read a message
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, FrameError> {
        read_frame(&mut self.reader)
    }

    /// Check if the buffer has any data available
    pub fn has_buffered_data(&self) -> bool {
        !self.reader.buffer().is_empty()
    }

    /// Check if the buffer already holds a full line
    pub fn has_complete_frame(&self) -> bool {
        self.reader.buffer().contains(&b'\n')
    }

    /// Get mutable reference to the inner reader
    pub fn inner_mut(&mut self) -> &mut BufReader<R> {
        &mut self.reader
    }
}
