//! Optional zlib layer between the base45 text and the signed envelope.

use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::error::Error;

// zlib CMF byte for deflate with a 32K window, the only method certificates
// are wrapped with in practice.
const ZLIB_DEFLATE: u8 = 0x78;

/// Inflate `data` if it starts with a zlib header, pass it through untouched
/// otherwise. The decoder validates the Adler-32 trailer.
pub fn decompress(data: Vec<u8>) -> Result<Vec<u8>, Error> {
    if data.first() != Some(&ZLIB_DEFLATE) {
        debug!(len = data.len(), "input is not zlib-wrapped, passing through");
        return Ok(data);
    }

    let mut decoder = ZlibDecoder::new(data.as_slice());
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(Error::Decompress)?;
    debug!(compressed = data.len(), inflated = out.len(), "inflated payload");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::write::ZlibEncoder;
    use flate2::Compression;

    use super::decompress;
    use crate::error::Error;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn passes_through_uncompressed_bytes() {
        let data = vec![0xd2, 0x84, 0x43];
        assert_eq!(decompress(data.clone()).unwrap(), data);
    }

    #[test]
    fn inflates_zlib_wrapped_bytes() {
        let original = b"signed envelope bytes".to_vec();
        let compressed = deflate(&original);
        assert_eq!(compressed[0], 0x78);
        assert_eq!(decompress(compressed).unwrap(), original);
    }

    #[test]
    fn surfaces_corrupt_stream() {
        // 0x06 after the header declares a reserved deflate block type.
        let corrupt = vec![0x78, 0x9c, 0x06];
        assert!(matches!(decompress(corrupt), Err(Error::Decompress(_))));
    }

    #[test]
    fn surfaces_flipped_byte() {
        let mut compressed = deflate(b"some certificate payload, long enough to compress");
        let mid = compressed.len() / 2;
        compressed[mid] ^= 0xff;
        assert!(decompress(compressed).is_err());
    }
}
