//! COSE_Sign1 envelope parsing (RFC 9052).
//!
//! The certificate travels as a 4-element array: protected header bytes,
//! unprotected header map, payload bytes, signature bytes. The signature is
//! surfaced together with the signing-key identifier but is not verified
//! here; that needs a key source this crate deliberately has none of.

use crate::cbor::{self, Decoder, Value};
use crate::error::Error;

const COSE_SIGN1_TAG: u64 = 18;

// Header parameter labels, RFC 9052 common parameters.
const ALG: i128 = 1;
const KID: i128 = 4;

#[derive(Debug)]
pub struct Envelope {
    /// Protected header, still CBOR-encoded as signed.
    pub protected: Vec<u8>,
    pub unprotected: Vec<(Value, Value)>,
    /// CBOR-encoded CWT claims.
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl Envelope {
    /// Parse the decompressed certificate bytes, with or without the
    /// COSE_Sign1 tag wrapper.
    pub fn parse(data: &[u8]) -> Result<Envelope, Error> {
        let mut decoder = Decoder::new(data);
        let value = decoder.value().map_err(|e| match e {
            Error::Decode(msg) => Error::Envelope(msg),
            other => other,
        })?;
        if decoder.position() != data.len() {
            return Err(Error::Envelope(format!(
                "{} trailing bytes after envelope",
                data.len() - decoder.position()
            )));
        }

        let value = match value {
            Value::Tag(COSE_SIGN1_TAG, inner) => *inner,
            other => other,
        };
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(Error::Envelope(format!(
                    "expected a COSE_Sign1 array, found {:?}",
                    variant_name(&other)
                )))
            }
        };
        if items.len() != 4 {
            return Err(Error::Envelope(format!(
                "expected 4 envelope elements, found {}",
                items.len()
            )));
        }

        let mut items = items.into_iter();
        let protected = match items.next() {
            Some(Value::Bytes(b)) => b,
            _ => {
                return Err(Error::Envelope(
                    "protected header must be a byte string".into(),
                ))
            }
        };
        let unprotected = match items.next() {
            Some(Value::Map(entries)) => entries,
            _ => return Err(Error::Envelope("unprotected header must be a map".into())),
        };
        let payload = match items.next() {
            Some(Value::Bytes(b)) => b,
            _ => return Err(Error::Envelope("payload must be a byte string".into())),
        };
        let signature = match items.next() {
            Some(Value::Bytes(b)) => b,
            _ => return Err(Error::Envelope("signature must be a byte string".into())),
        };

        Ok(Envelope {
            protected,
            unprotected,
            payload,
            signature,
        })
    }

    /// COSE algorithm identifier, e.g. -7 for ES256.
    pub fn algorithm(&self) -> Option<i128> {
        self.header_param(ALG)?.as_integer()
    }

    /// Signing-key identifier from the protected header, falling back to
    /// the unprotected one.
    pub fn key_id(&self) -> Option<Vec<u8>> {
        self.header_param(KID)?.as_bytes().map(<[u8]>::to_vec)
    }

    fn header_param(&self, label: i128) -> Option<Value> {
        if let Ok(header) = cbor::decode(&self.protected) {
            if let Some(value) = header.get_int(label) {
                return Some(value.clone());
            }
        }
        self.unprotected
            .iter()
            .find(|(k, _)| *k == Value::Integer(label))
            .map(|(_, v)| v.clone())
    }
}

fn variant_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "byte string",
        Value::Text(_) => "text string",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Tag(..) => "tagged value",
        Value::Date(_) => "date",
        Value::Bool(_) => "bool",
        Value::Float(_) => "float",
        Value::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::Envelope;
    use crate::error::Error;

    // tag 18, [h'A10126', {}, h'DEADBEEF', h'00']
    const MINIMAL: &[u8] = &[
        0xd2, 0x84, 0x43, 0xa1, 0x01, 0x26, 0xa0, 0x44, 0xde, 0xad, 0xbe, 0xef,
        0x41, 0x00,
    ];

    #[test]
    fn parses_minimal_envelope() {
        let envelope = Envelope::parse(MINIMAL).unwrap();
        assert_eq!(envelope.protected, vec![0xa1, 0x01, 0x26]);
        assert!(envelope.unprotected.is_empty());
        assert_eq!(envelope.payload, vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(envelope.signature, vec![0x00]);
        assert_eq!(envelope.algorithm(), Some(-7));
        assert_eq!(envelope.key_id(), None);
    }

    #[test]
    fn parses_untagged_envelope() {
        let envelope = Envelope::parse(&MINIMAL[1..]).unwrap();
        assert_eq!(envelope.algorithm(), Some(-7));
    }

    #[test]
    fn extracts_key_id_from_protected_header() {
        // [h'A20126044241 42', {}, h'', h'00'] — protected {1: -7, 4: h'4142'}
        let data = [
            0x84, 0x47, 0xa2, 0x01, 0x26, 0x04, 0x42, 0x41, 0x42, 0xa0, 0x40,
            0x41, 0x00,
        ];
        let envelope = Envelope::parse(&data).unwrap();
        assert_eq!(envelope.key_id(), Some(b"AB".to_vec()));
    }

    #[test]
    fn falls_back_to_unprotected_key_id() {
        // protected is empty bytes, kid lives in the unprotected map
        let data = [
            0x84, 0x40, 0xa1, 0x04, 0x42, 0x41, 0x42, 0x43, 0x01, 0x02, 0x03,
            0x41, 0x00,
        ];
        let envelope = Envelope::parse(&data).unwrap();
        assert_eq!(envelope.key_id(), Some(b"AB".to_vec()));
        assert_eq!(envelope.algorithm(), None);
        assert_eq!(envelope.payload, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_wrong_element_count() {
        // [h'', {}, h'']
        let data = [0x83, 0x40, 0xa0, 0x40];
        assert!(matches!(
            Envelope::parse(&data),
            Err(Error::Envelope(_))
        ));
    }

    #[test]
    fn rejects_wrong_element_type() {
        // [1, {}, h'', h'']
        let data = [0x84, 0x01, 0xa0, 0x40, 0x40];
        assert!(matches!(
            Envelope::parse(&data),
            Err(Error::Envelope(_))
        ));
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            Envelope::parse(&[0x01]),
            Err(Error::Envelope(_))
        ));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut data = MINIMAL.to_vec();
        data.push(0x00);
        assert!(matches!(
            Envelope::parse(&data),
            Err(Error::Envelope(_))
        ));
    }
}
