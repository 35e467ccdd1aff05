// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SNAP frame codec
//!
//! Header layout (29 bytes, big-endian):
//!
//! ```text
//! [0..2]   Ethertype (0xABCD)
//! [2..8]   Source MAC
//! [8..14]  Destination MAC
//! [14..18] Service id
//! [18..22] Element id
//! [22]     Flags
//! [23..25] Content size
//! [25..29] Transaction id
//! ```

use iot_common::codec::{Reader, Writer};
use iot_common::constants::{SNAP_ETH_TYPE, SNAP_HEADER_SIZE, SNAP_MAX_CONTENT_SIZE};
use iot_common::{Error, MacAddr, Result};

/// Offset of the content size field inside the header
const CONTENT_SIZE_OFFSET: usize = 23;

bitflags::bitflags! {
    /// Frame flags
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct FrameFlags: u8 {
        /// Positive response
        const ACK = 0x01;
        /// Negative response
        const NACK = 0x02;
    }
}

/// Fixed frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Ethertype
    pub eth_type: u16,
    /// Sender
    pub src: MacAddr,
    /// Receiver or broadcast
    pub dest: MacAddr,
    /// Service the frame belongs to
    pub service_id: u32,
    /// Command within the service
    pub element_id: u32,
    /// ACK / NACK bits
    pub flags: FrameFlags,
    /// Content bytes following the header
    pub content_size: u16,
    /// Sender-chosen id used for tracing
    pub transaction_id: u32,
}

impl FrameHeader {
    /// Serialized size
    pub const SIZE: usize = SNAP_HEADER_SIZE;

    /// Request header with no content yet
    #[must_use]
    pub const fn request(src: MacAddr, dest: MacAddr, service_id: u32, element_id: u32, transaction_id: u32) -> Self {
        Self {
            eth_type: SNAP_ETH_TYPE,
            src,
            dest,
            service_id,
            element_id,
            flags: FrameFlags::empty(),
            content_size: 0,
            transaction_id,
        }
    }

    /// Check whether the frame answers a request
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.flags.intersects(FrameFlags::ACK | FrameFlags::NACK)
    }

    /// Decode from a reader
    pub fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            eth_type: r.u16()?,
            src: MacAddr(r.array()?),
            dest: MacAddr(r.array()?),
            service_id: r.u32()?,
            element_id: r.u32()?,
            flags: FrameFlags::from_bits_retain(r.u8()?),
            content_size: r.u16()?,
            transaction_id: r.u32()?,
        })
    }

    /// Encode into a writer
    pub fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u16(self.eth_type)?
            .put(self.src.as_bytes())?
            .put(self.dest.as_bytes())?
            .u32(self.service_id)?
            .u32(self.element_id)?
            .u8(self.flags.bits())?
            .u16(self.content_size)?
            .u32(self.transaction_id)?;
        Ok(())
    }

    /// Serialize to a fixed array
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        // The array is exactly one header long
        let _ = self.write(&mut Writer::new(&mut out));
        out
    }
}

/// Total frame size announced by a complete header
///
/// Returns `None` when the declared content exceeds the frame limit.
#[must_use]
pub fn declared_size(header: &[u8; SNAP_HEADER_SIZE]) -> Option<usize> {
    let size = usize::from(u16::from_be_bytes([
        header[CONTENT_SIZE_OFFSET],
        header[CONTENT_SIZE_OFFSET + 1],
    ]));
    (size <= SNAP_MAX_CONTENT_SIZE).then_some(SNAP_HEADER_SIZE + size)
}

/// Split a complete frame into header and content
pub fn decode(frame: &[u8]) -> Result<(FrameHeader, &[u8])> {
    let mut r = Reader::new(frame);
    let header = FrameHeader::read(&mut r).map_err(|_| Error::MalformedFrame)?;
    if usize::from(header.content_size) > SNAP_MAX_CONTENT_SIZE {
        return Err(Error::MalformedFrame);
    }
    let content = r
        .take(usize::from(header.content_size))
        .map_err(|_| Error::MalformedFrame)?;
    Ok((header, content))
}

/// Write `header` and `content` to `out`, fixing up the content size
pub fn encode(header: &FrameHeader, content: &[u8], out: &mut [u8]) -> Result<usize> {
    if content.len() > SNAP_MAX_CONTENT_SIZE {
        return Err(Error::BufferTooSmall);
    }
    let header = FrameHeader {
        content_size: u16::try_from(content.len()).map_err(|_| Error::BufferTooSmall)?,
        ..*header
    };
    let mut w = Writer::new(out);
    header.write(&mut w)?;
    w.put(content)?;
    Ok(w.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use iot_common::constants::SNAP_MAX_FRAME_SIZE;
    use iot_common::fourcc;

    fn create_test_header() -> FrameHeader {
        FrameHeader::request(
            MacAddr::new([1, 2, 3, 4, 5, 6]),
            MacAddr::BROADCAST,
            fourcc(b"PRVS"),
            fourcc(b"DNID"),
            0x0102_0304,
        )
    }

    #[test]
    fn test_frame_layout() {
        let mut out = [0u8; SNAP_MAX_FRAME_SIZE];
        let len = encode(&create_test_header(), b"abc", &mut out).unwrap();
        assert_eq!(len, SNAP_HEADER_SIZE + 3);
        assert_eq!(&out[..2], &[0xAB, 0xCD]);
        assert_eq!(&out[2..8], &[1, 2, 3, 4, 5, 6]);
        assert_eq!(&out[8..14], &[0xFF; 6]);
        assert_eq!(&out[14..18], b"PRVS");
        assert_eq!(&out[18..22], b"DNID");
        assert_eq!(out[22], 0);
        assert_eq!(&out[23..25], &[0, 3]);
        assert_eq!(&out[25..29], &[1, 2, 3, 4]);

        let (header, content) = decode(&out[..len]).unwrap();
        assert_eq!(header.content_size, 3);
        assert_eq!(header.element_id, fourcc(b"DNID"));
        assert_eq!(content, b"abc");
    }

    #[test]
    fn test_response_flags() {
        let mut header = create_test_header();
        assert!(!header.is_response());
        header.flags = FrameFlags::NACK;
        assert!(header.is_response());
        let bytes = header.to_bytes();
        assert_eq!(bytes[22], 0x02);
    }

    #[test]
    fn test_oversized_content_rejected() {
        let mut header = create_test_header();
        header.content_size = 1025;
        let bytes = header.to_bytes();
        assert_eq!(declared_size(&bytes), None);

        header.content_size = 1024;
        assert_eq!(declared_size(&header.to_bytes()), Some(SNAP_MAX_FRAME_SIZE));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let mut out = [0u8; 64];
        let len = encode(&create_test_header(), b"abcd", &mut out).unwrap();
        assert_eq!(decode(&out[..len - 1]), Err(Error::MalformedFrame));
    }
}
