// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Frame reassembly
//!
//! Transports deliver arbitrary slices of the byte stream. A frame that
//! arrives whole while nothing is buffered is copied out directly;
//! anything else goes through the per-interface buffer until the header,
//! and then the declared content, are complete.

use iot_common::constants::{SNAP_HEADER_SIZE, SNAP_MAX_FRAME_SIZE};

use crate::frame::declared_size;

/// Outcome of one [`Reassembler::push`] step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// All offered bytes buffered, frame still incomplete
    Pending,
    /// A complete frame of this length was written to the output buffer
    Frame(usize),
    /// The header declared an oversized frame; the buffer was reset
    Malformed,
}

/// Per-interface partial frame buffer
pub struct Reassembler {
    buf: [u8; SNAP_MAX_FRAME_SIZE],
    filled: usize,
}

impl Reassembler {
    /// Create an empty buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0; SNAP_MAX_FRAME_SIZE],
            filled: 0,
        }
    }

    /// Bytes of the current partial frame
    #[must_use]
    pub const fn filled(&self) -> usize {
        self.filled
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.filled = 0;
    }

    /// Consume bytes from the front of `data`
    ///
    /// Returns how many bytes were used and what they produced. Call again
    /// with the remaining bytes until the input is exhausted.
    pub fn push(&mut self, data: &[u8], out: &mut [u8; SNAP_MAX_FRAME_SIZE]) -> (usize, Feed) {
        if self.filled == 0 {
            if let Some(header) = data.get(..SNAP_HEADER_SIZE) {
                let mut fixed = [0u8; SNAP_HEADER_SIZE];
                fixed.copy_from_slice(header);
                return self.push_direct(data, &fixed, out);
            }
        }

        let mut used = 0;

        // 1. Header
        if self.filled < SNAP_HEADER_SIZE {
            let n = (SNAP_HEADER_SIZE - self.filled).min(data.len());
            self.buf[self.filled..self.filled + n].copy_from_slice(&data[..n]);
            self.filled += n;
            used = n;
            if self.filled < SNAP_HEADER_SIZE {
                return (used, Feed::Pending);
            }
        }

        let mut header = [0u8; SNAP_HEADER_SIZE];
        header.copy_from_slice(&self.buf[..SNAP_HEADER_SIZE]);
        let Some(size) = declared_size(&header) else {
            self.filled = 0;
            return (used, Feed::Malformed);
        };

        // 2. Content
        let n = (size - self.filled).min(data.len() - used);
        self.buf[self.filled..self.filled + n].copy_from_slice(&data[used..used + n]);
        self.filled += n;
        used += n;

        if self.filled < size {
            return (used, Feed::Pending);
        }
        out[..size].copy_from_slice(&self.buf[..size]);
        self.filled = 0;
        (used, Feed::Frame(size))
    }

    fn push_direct(
        &mut self,
        data: &[u8],
        header: &[u8; SNAP_HEADER_SIZE],
        out: &mut [u8; SNAP_MAX_FRAME_SIZE],
    ) -> (usize, Feed) {
        let Some(size) = declared_size(header) else {
            return (SNAP_HEADER_SIZE, Feed::Malformed);
        };
        if let Some(frame) = data.get(..size) {
            out[..size].copy_from_slice(frame);
            return (size, Feed::Frame(size));
        }
        self.buf[..data.len()].copy_from_slice(data);
        self.filled = data.len();
        (data.len(), Feed::Pending)
    }
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{encode, FrameHeader};
    use alloc::vec::Vec;
    use iot_common::{fourcc, MacAddr};

    fn create_test_frame(content: &[u8]) -> ([u8; SNAP_MAX_FRAME_SIZE], usize) {
        let header = FrameHeader::request(
            MacAddr::new([2, 0, 0, 0, 0, 1]),
            MacAddr::BROADCAST,
            fourcc(b"FLDT"),
            fourcc(b"GFTI"),
            9,
        );
        let mut out = [0u8; SNAP_MAX_FRAME_SIZE];
        let len = encode(&header, content, &mut out).unwrap();
        (out, len)
    }

    fn feed_all(r: &mut Reassembler, mut data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let mut out = [0u8; SNAP_MAX_FRAME_SIZE];
        while !data.is_empty() {
            let (used, feed) = r.push(data, &mut out);
            if let Feed::Frame(len) = feed {
                frames.push(out[..len].to_vec());
            }
            data = &data[used..];
        }
        frames
    }

    #[test]
    fn test_whole_frame_direct() {
        let (frame, len) = create_test_frame(b"hello");
        let mut r = Reassembler::new();
        let frames = feed_all(&mut r, &frame[..len]);
        assert_eq!(frames, [frame[..len].to_vec()]);
        assert_eq!(r.filled(), 0);
    }

    #[test]
    fn test_byte_by_byte() {
        let (frame, len) = create_test_frame(b"split me");
        let mut r = Reassembler::new();
        let mut frames = 0;
        for b in &frame[..len] {
            frames += feed_all(&mut r, core::slice::from_ref(b)).len();
        }
        assert_eq!(frames, 1);
        assert_eq!(r.filled(), 0);
    }

    #[test]
    fn test_header_only_frame() {
        let (frame, len) = create_test_frame(b"");
        let mut r = Reassembler::new();
        assert_eq!(feed_all(&mut r, &frame[..10]).len(), 0);
        assert_eq!(feed_all(&mut r, &frame[10..len]).len(), 1);
    }

    #[test]
    fn test_oversized_header_dropped() {
        let (mut frame, len) = create_test_frame(b"x");
        frame[23] = 0x04;
        frame[24] = 0x01;
        let mut r = Reassembler::new();
        let mut out = [0u8; SNAP_MAX_FRAME_SIZE];
        assert_eq!(r.push(&frame[..len], &mut out), (SNAP_HEADER_SIZE, Feed::Malformed));

        // Same header arriving in pieces
        assert_eq!(r.push(&frame[..5], &mut out), (5, Feed::Pending));
        assert_eq!(r.push(&frame[5..len], &mut out), (SNAP_HEADER_SIZE - 5, Feed::Malformed));
        assert_eq!(r.filled(), 0);
    }
}
