//! Gzip codec applied to every stored object.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Failed to decompress stored object: {0}")]
pub struct DecodeError(#[from] std::io::Error);

/// Gzip-compress `data`.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .expect("gzip into a Vec cannot fail")
}

/// Inverse of [`compress`]. Fails on input that is not a complete gzip stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_is_a_complete_gzip_member() {
        let samples: [&[u8]; 2] = [b"", b"%PDF-1.5"];
        for sample in samples {
            let out = compress(sample);
            assert_eq!(&out[..2], &[0x1f, 0x8b]);
            // Trailer: CRC32 then the input length, little-endian.
            let len = u32::from_le_bytes(out[out.len() - 4..].try_into().unwrap());
            assert_eq!(len as usize, sample.len());
        }
    }

    #[test]
    fn test_round_trip() {
        let samples: [&[u8]; 4] = [
            b"",
            b"%PDF-1.5 minimal",
            &[0u8, 255, 1, 254, 0, 0, 0],
            &[b'a'; 100_000],
        ];
        for sample in samples {
            assert_eq!(decompress(&compress(sample)).unwrap(), sample);
        }
    }

    #[test]
    fn test_compresses_repetitive_input() {
        let data = vec![b'x'; 64 * 1024];
        assert!(compress(&data).len() < data.len() / 10);
    }

    #[test]
    fn test_malformed_input_is_decode_error() {
        assert!(decompress(b"definitely not gzip").is_err());

        let mut truncated = compress(b"some document body that is long enough");
        truncated.truncate(truncated.len() / 2);
        assert!(decompress(&truncated).is_err());
    }
}
