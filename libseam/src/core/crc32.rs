//! crc32 as used by ogg pages
//!
//! Polynomial 0x04c11db7, MSB first, initial value 0, no final xor. This is
//! not the reflected zlib variant.

const POLY: u32 = 0x04c1_1db7;

const TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut r = (i as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            r = if r & 0x8000_0000 != 0 {
                (r << 1) ^ POLY
            } else {
                r << 1
            };
            bit += 1;
        }
        table[i] = r;
        i += 1;
    }
    table
}

/// continue a running checksum
#[inline]
pub fn update(crc: u32, data: &[u8]) -> u32 {
    data.iter().fold(crc, |crc, &b| {
        (crc << 8) ^ TABLE[(((crc >> 24) as u8) ^ b) as usize]
    })
}

/// checksum of a whole buffer
pub fn compute(data: &[u8]) -> u32 {
    update(0, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(compute(&[]), 0);
    }

    #[test]
    fn test_known_vector() {
        // CRC-32/POSIX without its final inversion (0x765e7680 ^ 0xffffffff)
        assert_eq!(compute(b"123456789"), 0x89a1_897f);
    }

    #[test]
    fn test_incremental_matches_whole() {
        let data = b"OggS gapless chunk";
        let split = update(update(0, &data[..5]), &data[5..]);
        assert_eq!(split, compute(data));
    }
}
