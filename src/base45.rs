//! Base45 decoding as used for QR transport (RFC 9285).
//!
//! Three characters encode two bytes: value = c0 + c1*45 + c2*45², emitted
//! high byte first. A trailing pair encodes a single byte.

use crate::error::Error;

const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn char_value(c: u8) -> Result<u16, Error> {
    match ALPHABET.iter().position(|&a| a == c) {
        Some(i) => Ok(i as u16),
        None => Err(Error::Decode(format!(
            "character {:?} is not in the base45 alphabet",
            c as char
        ))),
    }
}

/// Decode a base45 string into raw bytes.
pub fn decode(encoded: &str) -> Result<Vec<u8>, Error> {
    let values = encoded
        .bytes()
        .map(char_value)
        .collect::<Result<Vec<u16>, Error>>()?;

    let mut out = Vec::with_capacity(values.len() / 3 * 2 + 1);
    for group in values.chunks(3) {
        match *group {
            [c0, c1, c2] => {
                let n = c0 as u32 + c1 as u32 * 45 + c2 as u32 * 45 * 45;
                if n > 0xffff {
                    return Err(Error::Decode(format!(
                        "base45 triplet value {} overflows two bytes",
                        n
                    )));
                }
                out.push((n >> 8) as u8);
                out.push((n & 0xff) as u8);
            }
            [c0, c1] => {
                let n = c0 as u32 + c1 as u32 * 45;
                if n > 0xff {
                    return Err(Error::Decode(format!(
                        "trailing base45 pair value {} overflows one byte",
                        n
                    )));
                }
                out.push(n as u8);
            }
            _ => {
                return Err(Error::Decode(
                    "base45 input length 1 mod 3 is invalid".into(),
                ))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::error::Error;

    // Test vectors from RFC 9285 §4.3/§4.4.
    #[test]
    fn rfc_vectors() {
        assert_eq!(decode("BB8").unwrap(), b"AB");
        assert_eq!(decode("%69 VD92EX0").unwrap(), b"Hello!!");
        assert_eq!(decode("UJCLQE7W581").unwrap(), b"base-45");
        assert_eq!(decode("QED8WEX0").unwrap(), b"ietf!");
    }

    #[test]
    fn empty_input() {
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_character_outside_alphabet() {
        assert!(matches!(decode("ab0"), Err(Error::Decode(_))));
    }

    #[test]
    fn rejects_single_trailing_character() {
        assert!(matches!(decode("BB8A"), Err(Error::Decode(_))));
    }

    #[test]
    fn rejects_trailing_pair_above_one_byte() {
        // ':' + ':'*45 = 44 + 44*45 = 2024, far past 255.
        assert!(matches!(decode("::"), Err(Error::Decode(_))));
    }

    #[test]
    fn rejects_triplet_above_two_bytes() {
        // ':::' = 44 + 44*45 + 44*2025 = 91124, past 0xffff.
        assert!(matches!(decode(":::"), Err(Error::Decode(_))));
    }
}
