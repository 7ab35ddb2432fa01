//! pull based sample sources

use std::io::{ErrorKind, Read};

use crate::core::{SampleFormat, SeamResult};

/// Supplies interleaved, normalized samples on request
pub trait SampleSource {
    /// Fill `buf` and return the number of values written. Fewer than
    /// `buf.len()` means the source has ended.
    fn read_samples(&mut self, buf: &mut [f32]) -> SeamResult<usize>;
}

impl<F: FnMut(&mut [f32]) -> usize> SampleSource for F {
    fn read_samples(&mut self, buf: &mut [f32]) -> SeamResult<usize> {
        Ok(self(buf).min(buf.len()))
    }
}

/// In-memory samples
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
    data: &'a [f32],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [f32]) -> Self {
        Self { data, pos: 0 }
    }

    /// values not yet read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl SampleSource for SliceSource<'_> {
    fn read_samples(&mut self, buf: &mut [f32]) -> SeamResult<usize> {
        let n = buf.len().min(self.remaining());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Raw interleaved samples from a byte stream
pub struct ReaderSource<R: Read> {
    reader: R,
    format: SampleFormat,
    bytes: Vec<u8>,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, format: SampleFormat) -> Self {
        Self {
            reader,
            format,
            bytes: Vec::new(),
        }
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> SampleSource for ReaderSource<R> {
    fn read_samples(&mut self, buf: &mut [f32]) -> SeamResult<usize> {
        let width = self.format.bytes();
        self.bytes.resize(buf.len() * width, 0);

        // keep reading until the request is met or the stream ends
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let n = filled / width;
        for (dst, raw) in buf.iter_mut().zip(self.bytes[..n * width].chunks_exact(width)) {
            *dst = self.format.decode(raw);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// hands out at most `step` bytes per read call
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.step).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_reader_source_loops_over_short_reads() {
        let values: Vec<i16> = vec![0, 16384, -16384, -32768, 1];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut source = ReaderSource::new(
            Trickle {
                data: &bytes,
                step: 3,
            },
            SampleFormat::S16Le,
        );

        let mut buf = [9.0f32; 4];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 4);
        assert_eq!(buf, [0.0, 0.5, -0.5, -1.0]);
        assert_eq!(source.read_samples(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 1.0 / 32768.0);
        assert_eq!(source.read_samples(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_reader_source_f32() {
        let bytes: Vec<u8> = [0.25f32, -0.75].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut source = ReaderSource::new(&bytes[..], SampleFormat::F32Le);
        let mut buf = [0.0f32; 3];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0.25, -0.75]);
    }

    #[test]
    fn test_trailing_partial_sample_dropped() {
        let bytes = [0u8, 64, 7];
        let mut source = ReaderSource::new(&bytes[..], SampleFormat::S16Le);
        let mut buf = [0.0f32; 2];
        assert_eq!(source.read_samples(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0.5);
    }

    #[test]
    fn test_slice_and_closure_sources() {
        let data = [1.0f32, 2.0, 3.0];
        let mut slice = SliceSource::new(&data);
        let mut buf = [0.0f32; 2];
        assert_eq!(slice.read_samples(&mut buf).unwrap(), 2);
        assert_eq!(slice.read_samples(&mut buf).unwrap(), 1);
        assert_eq!(slice.remaining(), 0);

        let mut calls = 0;
        let mut closure = |buf: &mut [f32]| {
            calls += 1;
            buf.fill(0.5);
            buf.len() + 10
        };
        assert_eq!(closure.read_samples(&mut buf).unwrap(), 2);
        drop(closure);
        assert_eq!(calls, 1);
    }
}
