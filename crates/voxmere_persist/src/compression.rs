use std::io;

use serde::{Deserialize, Serialize};

const ZSTD_LEVEL: i32 = 3;

/// Payload compression, stored as the wire byte after the file magic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    #[default]
    Zstd,
    Lz4,
}

impl Compression {
    pub fn wire_byte(self) -> u8 {
        match self {
            Compression::None => 1,
            Compression::Zstd => 2,
            Compression::Lz4 => 3,
        }
    }

    pub fn from_wire_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Compression::None),
            2 => Some(Compression::Zstd),
            3 => Some(Compression::Lz4),
            _ => None,
        }
    }

    pub fn compress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zstd => compress_zstd(data, ZSTD_LEVEL),
            Compression::Lz4 => Ok(compress_lz4(data)),
        }
    }

    pub fn decompress(self, data: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Zstd => decompress_zstd(data),
            Compression::Lz4 => decompress_lz4(data)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string())),
        }
    }
}

pub fn compress_zstd(data: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(data, level)
}

pub fn decompress_zstd(data: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(data)
}

pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}

pub fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>, lz4_flex::block::DecompressError> {
    lz4_flex::decompress_size_prepended(data)
}

#[cfg(test)]
mod tests {
    use super::Compression;

    #[test]
    fn wire_bytes_are_stable() {
        for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
            assert_eq!(
                Compression::from_wire_byte(compression.wire_byte()),
                Some(compression)
            );
        }
        assert_eq!(Compression::from_wire_byte(0), None);
        assert_eq!(Compression::from_wire_byte(9), None);
    }

    #[test]
    fn every_codec_restores_repetitive_payloads() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i / 64) as u8).collect();
        for compression in [Compression::None, Compression::Zstd, Compression::Lz4] {
            let packed = compression.compress(&data).expect("compress");
            if compression != Compression::None {
                assert!(packed.len() < data.len());
            }
            assert_eq!(compression.decompress(&packed).expect("decompress"), data);
        }
    }

    #[test]
    fn corrupt_lz4_is_invalid_data() {
        let err = Compression::Lz4
            .decompress(&[200, 0, 0, 0, 1])
            .expect_err("truncated lz4 must fail");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
