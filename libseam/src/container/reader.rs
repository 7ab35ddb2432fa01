use std::io::Read;

use super::{
    StreamHead, FLAG_CONTINUED, FLAG_EOS, NO_GRANULE, OGG_MAGIC, OPUS_HEAD, OPUS_TAGS,
};
use crate::core::{compute_crc32, SeamError, SeamResult, Tags};

/// A compressed packet and the granule of the page it ended on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
    /// `None` when the page carried no granule
    pub granule: Option<u64>,
}

/// Everything stored in one chunk file, audio left compressed
#[derive(Debug, Clone)]
pub struct ChunkStream {
    pub head: StreamHead,
    pub vendor: String,
    pub tags: Tags,
    pub packets: Vec<Packet>,
    /// granule of the last page that carried one
    pub final_granule: u64,
    /// whether the last page had the end of stream flag
    pub eos: bool,
}

impl ChunkStream {
    /// decoded length in 48 kHz samples, pre-skip removed
    pub fn duration_samples(&self) -> u64 {
        self.final_granule.saturating_sub(self.head.pre_skip as u64)
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_samples() as f64 / 48000.0
    }
}

/// Parser for single stream Ogg/Opus files
#[derive(Debug, Default)]
pub struct OggOpusReader;

impl OggOpusReader {
    pub fn new() -> Self {
        OggOpusReader
    }

    /// Read a whole stream from `input`
    pub fn read_from<R: Read>(&self, mut input: R) -> SeamResult<ChunkStream> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        self.read(&data)
    }

    /// Parse pages, verify checksums and decode both headers
    pub fn read(&self, data: &[u8]) -> SeamResult<ChunkStream> {
        let mut cursor = Cursor::new(data);
        let mut serial = None;
        let mut partial: Option<Vec<u8>> = None;
        let mut packets: Vec<Packet> = Vec::new();
        let mut final_granule = 0;
        let mut eos = false;

        while !cursor.is_empty() {
            if eos {
                return Err(malformed("data after end of stream"));
            }
            let page = read_page(&mut cursor)?;

            match serial {
                None => serial = Some(page.serial),
                Some(s) if s != page.serial => {
                    return Err(malformed("more than one logical stream"));
                }
                Some(_) => {}
            }

            let continued = page.header_type & FLAG_CONTINUED != 0;
            if continued != partial.is_some() {
                return Err(malformed("broken packet continuation"));
            }

            let mut offset = 0;
            for &value in page.lacing {
                let len = value as usize;
                let segment = page
                    .body
                    .get(offset..offset + len)
                    .ok_or_else(|| malformed("segment beyond page body"))?;
                offset += len;

                partial.get_or_insert_with(Vec::new).extend_from_slice(segment);
                if value < 255 {
                    if let Some(data) = partial.take() {
                        packets.push(Packet {
                            data,
                            granule: None,
                        });
                    }
                }
            }

            if page.granule != NO_GRANULE {
                final_granule = page.granule;
                if let Some(last) = packets.last_mut() {
                    if last.granule.is_none() && partial.is_none() {
                        last.granule = Some(page.granule);
                    }
                }
            }
            eos = page.header_type & FLAG_EOS != 0;
        }

        if partial.is_some() {
            return Err(malformed("stream ends inside a packet"));
        }

        let mut packets = packets.into_iter();
        let head = packets
            .next()
            .ok_or_else(|| malformed("missing identification header"))
            .and_then(|p| parse_head(&p.data))?;
        let (vendor, tags) = packets
            .next()
            .ok_or_else(|| malformed("missing comment header"))
            .and_then(|p| parse_tags(&p.data))?;

        Ok(ChunkStream {
            head,
            vendor,
            tags,
            packets: packets.collect(),
            final_granule,
            eos,
        })
    }
}

fn malformed(reason: &str) -> SeamError {
    SeamError::Container(reason.to_string())
}

struct Page<'a> {
    header_type: u8,
    granule: u64,
    serial: u32,
    lacing: &'a [u8],
    body: &'a [u8],
}

fn read_page<'a>(cursor: &mut Cursor<'a>) -> SeamResult<Page<'a>> {
    let start = cursor.pos;
    if cursor.read_bytes(4)? != OGG_MAGIC {
        return Err(malformed("bad page magic"));
    }
    if cursor.read_u8()? != 0 {
        return Err(malformed("unknown page version"));
    }
    let header_type = cursor.read_u8()?;
    let granule = cursor.read_u64_le()?;
    let serial = cursor.read_u32_le()?;
    let _sequence = cursor.read_u32_le()?;
    let crc = cursor.read_u32_le()?;
    let n_segments = cursor.read_u8()? as usize;
    let lacing = cursor.read_bytes(n_segments)?;
    let body_len = lacing.iter().map(|&v| v as usize).sum();
    let body = cursor.read_bytes(body_len)?;

    let mut check = cursor.data[start..cursor.pos].to_vec();
    check[22..26].fill(0);
    if compute_crc32(&check) != crc {
        return Err(malformed("page checksum mismatch"));
    }

    Ok(Page {
        header_type,
        granule,
        serial,
        lacing,
        body,
    })
}

fn parse_head(data: &[u8]) -> SeamResult<StreamHead> {
    let mut cursor = Cursor::new(data);
    if cursor.read_bytes(8)? != OPUS_HEAD {
        return Err(malformed("bad identification header magic"));
    }
    let version = cursor.read_u8()?;
    if version & 0xf0 != 0 {
        return Err(malformed("unsupported identification header version"));
    }
    let channels = cursor.read_u8()?;
    let pre_skip = cursor.read_u16_le()?;
    let input_rate = cursor.read_u32_le()?;
    let _gain = cursor.read_u16_le()?;
    if cursor.read_u8()? != 0 {
        return Err(malformed("unsupported channel mapping family"));
    }
    Ok(StreamHead {
        pre_skip,
        channels,
        input_rate,
    })
}

fn parse_tags(data: &[u8]) -> SeamResult<(String, Tags)> {
    let mut cursor = Cursor::new(data);
    if cursor.read_bytes(8)? != OPUS_TAGS {
        return Err(malformed("bad comment header magic"));
    }
    let vendor = cursor.read_string()?;
    let count = cursor.read_u32_le()?;
    let mut tags = Tags::new();
    for _ in 0..count {
        let comment = cursor.read_string()?;
        let (key, value) = comment
            .split_once('=')
            .ok_or_else(|| malformed("comment without '='"))?;
        tags.push(key, value);
    }
    Ok((vendor, tags))
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn read_bytes(&mut self, count: usize) -> SeamResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| malformed("unexpected end of data"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> SeamResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u16_le(&mut self) -> SeamResult<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32_le(&mut self) -> SeamResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64_le(&mut self) -> SeamResult<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    fn read_string(&mut self) -> SeamResult<String> {
        let len = self.read_u32_le()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| malformed("comment is not utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_garbage() {
        let reader = OggOpusReader::new();
        assert!(matches!(reader.read(b"RIFF...."), Err(SeamError::Container(_))));
        assert!(matches!(reader.read(b""), Err(SeamError::Container(_))));
    }

    #[test]
    fn test_truncated_page() {
        let reader = OggOpusReader::new();
        assert!(reader.read(b"OggS\0\0\0\0").is_err());
    }
}
