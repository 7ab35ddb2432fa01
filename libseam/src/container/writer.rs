use std::io::Write;

use tracing::trace;

use super::{
    PacketMuxer, StreamHead, FLAG_BOS, FLAG_CONTINUED, FLAG_EOS, NO_GRANULE, OGG_MAGIC,
    OPUS_HEAD, OPUS_TAGS,
};
use crate::core::{compute_crc32, SeamError, SeamResult, Tags};

/// Serial number used unless another is set, so equal input gives equal bytes
pub const DEFAULT_SERIAL: u32 = 0x5345_414d;

/// most lacing values on one page
const MAX_SEGMENTS: usize = 255;

/// Writes a single Opus stream into Ogg pages
///
/// Every packet is flushed on its own page. A packet longer than one page
/// can describe continues on the next page.
pub struct OggOpusMuxer<W: Write> {
    out: W,
    serial: u32,
    sequence: u32,
    granule: u64,
    header_written: bool,
    closed: bool,
    page: Vec<u8>,
}

impl<W: Write> OggOpusMuxer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            serial: DEFAULT_SERIAL,
            sequence: 0,
            granule: 0,
            header_written: false,
            closed: false,
            page: Vec::new(),
        }
    }

    /// Use another stream serial number
    pub fn with_serial(mut self, serial: u32) -> Self {
        self.serial = serial;
        self
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// pages written so far
    pub fn pages(&self) -> u32 {
        self.sequence
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Give back the sink. Does not finish the stream.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_packet(&mut self, packet: &[u8], granule: u64, flags: u8, eos: bool) -> SeamResult<()> {
        // a packet whose length is a multiple of 255 ends with a zero lacing value
        let lacing_len = packet.len() / 255 + 1;
        let pages = lacing_len.div_ceil(MAX_SEGMENTS);

        let mut offset = 0;
        for p in 0..pages {
            let first_value = p * MAX_SEGMENTS;
            let n_values = (lacing_len - first_value).min(MAX_SEGMENTS);
            let is_last_page = p + 1 == pages;

            let mut lacing = Vec::with_capacity(n_values);
            let mut body_len = 0;
            for v in first_value..first_value + n_values {
                let value = if v + 1 == lacing_len {
                    (packet.len() % 255) as u8
                } else {
                    255
                };
                lacing.push(value);
                body_len += value as usize;
            }

            let mut header_type = if p == 0 { flags } else { FLAG_CONTINUED };
            if eos && is_last_page {
                header_type |= FLAG_EOS;
            }
            let page_granule = if is_last_page { granule } else { NO_GRANULE };

            self.write_page(header_type, page_granule, &lacing, &packet[offset..offset + body_len])?;
            offset += body_len;
        }
        Ok(())
    }

    fn write_page(&mut self, header_type: u8, granule: u64, lacing: &[u8], body: &[u8]) -> SeamResult<()> {
        let page = &mut self.page;
        page.clear();
        page.extend_from_slice(&OGG_MAGIC);
        page.push(0); // stream structure version
        page.push(header_type);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&self.serial.to_le_bytes());
        page.extend_from_slice(&self.sequence.to_le_bytes());
        page.extend_from_slice(&[0; 4]); // crc
        page.push(lacing.len() as u8);
        page.extend_from_slice(lacing);
        page.extend_from_slice(body);

        let crc = compute_crc32(page);
        page[22..26].copy_from_slice(&crc.to_le_bytes());

        trace!(
            sequence = self.sequence,
            granule,
            bytes = page.len(),
            "ogg page"
        );
        self.out.write_all(page)?;
        self.sequence += 1;
        Ok(())
    }
}

impl<W: Write> PacketMuxer for OggOpusMuxer<W> {
    fn write_header(&mut self, head: &StreamHead, vendor: &str, tags: &Tags) -> SeamResult<()> {
        if self.header_written {
            return Err(SeamError::Container("header already written".into()));
        }

        let mut id = Vec::with_capacity(19);
        id.extend_from_slice(&OPUS_HEAD);
        id.push(1); // version
        id.push(head.channels);
        id.extend_from_slice(&head.pre_skip.to_le_bytes());
        id.extend_from_slice(&head.input_rate.to_le_bytes());
        id.extend_from_slice(&0i16.to_le_bytes()); // output gain
        id.push(0); // channel mapping family
        self.write_packet(&id, 0, FLAG_BOS, false)?;

        let mut comments = Vec::new();
        comments.extend_from_slice(&OPUS_TAGS);
        comments.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        comments.extend_from_slice(vendor.as_bytes());
        comments.extend_from_slice(&(tags.len() as u32).to_le_bytes());
        for (key, value) in tags.iter() {
            let len = key.len() + 1 + value.len();
            comments.extend_from_slice(&(len as u32).to_le_bytes());
            comments.extend_from_slice(key.as_bytes());
            comments.push(b'=');
            comments.extend_from_slice(value.as_bytes());
        }
        self.write_packet(&comments, 0, 0, false)?;

        self.header_written = true;
        Ok(())
    }

    fn write_frame(&mut self, last: bool, granule: u64, packet: &[u8]) -> SeamResult<()> {
        if !self.header_written {
            return Err(SeamError::Container("frame written before header".into()));
        }
        if self.closed {
            return Err(SeamError::Container("frame written after end of stream".into()));
        }
        self.write_packet(packet, granule, 0, last)?;
        self.granule = granule;
        if last {
            self.closed = true;
            self.out.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> SeamResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.header_written {
            // empty page carrying only the end of stream flag
            self.write_page(FLAG_EOS, self.granule, &[], &[])?;
        }
        self.out.flush()?;
        Ok(())
    }
}
