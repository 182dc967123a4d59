//! Minimal CBOR decoder (RFC 8949) for certificate payloads.
//!
//! Decodes a byte buffer into a [`Value`] tree. The [`Decoder`] keeps track
//! of its position so callers can pull one value out of a larger buffer;
//! [`decode`] additionally insists the value spans the whole buffer.
//!
//! Dates are materialised eagerly: tag 0 (RFC 3339 text) and tag 1 (numeric
//! epoch) come back as [`Value::Date`], every other tag is kept as-is.

use std::convert::TryFrom;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::Error;

// Guard against adversarial nesting; the certificate schema needs 3 levels.
const MAX_DEPTH: usize = 128;

const BREAK: u8 = 0xff;

/// A decoded CBOR data item.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    /// Entries in encoded order; duplicate keys are kept, lookup takes the
    /// first match.
    Map(Vec<(Value, Value)>),
    Tag(u64, Box<Value>),
    Date(DateTime<Utc>),
    Bool(bool),
    Float(f64),
    Null,
}

impl Value {
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a map entry by key; `None` for non-maps and absent keys.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_int(&self, key: i128) -> Option<&Value> {
        self.get(&Value::Integer(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&Value> {
        self.as_map()?
            .iter()
            .find(|(k, _)| k.as_text() == Some(key))
            .map(|(_, v)| v)
    }
}

/// Decode a single data item spanning the whole buffer.
pub fn decode(data: &[u8]) -> Result<Value, Error> {
    let mut decoder = Decoder::new(data);
    let value = decoder.value()?;
    let trailing = data.len() - decoder.position();
    if trailing != 0 {
        return Err(Error::Decode(format!(
            "{} trailing bytes after CBOR value",
            trailing
        )));
    }
    Ok(value)
}

/// Incremental decoder over a borrowed buffer.
pub struct Decoder<'b> {
    buf: &'b [u8],
    pos: usize,
}

impl<'b> Decoder<'b> {
    pub fn new(buf: &'b [u8]) -> Decoder<'b> {
        Decoder { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Decode the next data item, advancing past it.
    pub fn value(&mut self) -> Result<Value, Error> {
        self.value_at(0)
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn byte(&mut self) -> Result<u8, Error> {
        match self.buf.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                Ok(b)
            }
            None => Err(Error::Decode("unexpected end of input".into())),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'b [u8], Error> {
        if self.remaining() < n {
            return Err(Error::Decode(format!(
                "need {} bytes, {} remain",
                n,
                self.remaining()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Argument of a header byte: the additional-info field itself (0..=23)
    /// or the 1/2/4/8 trailing big-endian bytes it announces.
    fn uint(&mut self, info: u8) -> Result<u64, Error> {
        match info {
            0..=23 => Ok(u64::from(info)),
            24 => Ok(u64::from(self.byte()?)),
            25 => {
                let b = self.take(2)?;
                Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            26 => {
                let b = self.take(4)?;
                Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            27 => {
                let b = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                Ok(u64::from_be_bytes(raw))
            }
            _ => Err(Error::Decode(format!(
                "reserved additional-info value {}",
                info
            ))),
        }
    }

    /// Declared string length, rejected up front when it cannot fit in the
    /// remaining input.
    fn length(&mut self, info: u8) -> Result<usize, Error> {
        let n = self.uint(info)?;
        if n > self.remaining() as u64 {
            return Err(Error::Decode(format!(
                "declared length {} exceeds {} remaining bytes",
                n,
                self.remaining()
            )));
        }
        Ok(n as usize)
    }

    /// Declared element/pair count for arrays and maps. Every element takes
    /// at least `width` bytes, so larger counts are truncation.
    fn count(&mut self, info: u8, width: u64) -> Result<usize, Error> {
        let n = self.uint(info)?;
        if n.saturating_mul(width) > self.remaining() as u64 {
            return Err(Error::Decode(format!(
                "declared count {} exceeds remaining input",
                n
            )));
        }
        Ok(n as usize)
    }

    /// Consume a break marker if it is next.
    fn try_break(&mut self) -> Result<bool, Error> {
        match self.buf.get(self.pos) {
            Some(&BREAK) => {
                self.pos += 1;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(Error::Decode(
                "unexpected end of input inside indefinite-length item".into(),
            )),
        }
    }

    /// Definite or indefinite byte/text string body for major type 2 or 3.
    /// Indefinite strings are a sequence of definite chunks of the same
    /// major type up to a break marker.
    fn string(&mut self, major: u8, info: u8) -> Result<Vec<u8>, Error> {
        if info != 31 {
            let len = self.length(info)?;
            return Ok(self.take(len)?.to_vec());
        }
        let mut out = Vec::new();
        loop {
            let head = self.byte()?;
            if head == BREAK {
                return Ok(out);
            }
            if head >> 5 != major {
                return Err(Error::Decode(
                    "indefinite-length string chunk has wrong major type".into(),
                ));
            }
            let info = head & 0x1f;
            if info == 31 {
                return Err(Error::Decode(
                    "nested indefinite-length string chunk".into(),
                ));
            }
            let len = self.length(info)?;
            out.extend_from_slice(self.take(len)?);
        }
    }

    fn value_at(&mut self, depth: usize) -> Result<Value, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::Decode("nesting depth limit exceeded".into()));
        }
        let head = self.byte()?;
        let (major, info) = (head >> 5, head & 0x1f);
        match major {
            0 => Ok(Value::Integer(i128::from(self.uint(info)?))),
            1 => Ok(Value::Integer(-1 - i128::from(self.uint(info)?))),
            2 => Ok(Value::Bytes(self.string(major, info)?)),
            3 => {
                let raw = self.string(major, info)?;
                String::from_utf8(raw)
                    .map(Value::Text)
                    .map_err(|_| Error::Decode("text string is not valid UTF-8".into()))
            }
            4 => {
                let mut items = Vec::new();
                if info == 31 {
                    while !self.try_break()? {
                        items.push(self.value_at(depth + 1)?);
                    }
                } else {
                    let n = self.count(info, 1)?;
                    items.reserve(n);
                    for _ in 0..n {
                        items.push(self.value_at(depth + 1)?);
                    }
                }
                Ok(Value::Array(items))
            }
            5 => {
                let mut entries = Vec::new();
                if info == 31 {
                    while !self.try_break()? {
                        let key = self.value_at(depth + 1)?;
                        let value = self.value_at(depth + 1)?;
                        entries.push((key, value));
                    }
                } else {
                    let n = self.count(info, 2)?;
                    entries.reserve(n);
                    for _ in 0..n {
                        let key = self.value_at(depth + 1)?;
                        let value = self.value_at(depth + 1)?;
                        entries.push((key, value));
                    }
                }
                Ok(Value::Map(entries))
            }
            6 => {
                let tag = self.uint(info)?;
                let inner = self.value_at(depth + 1)?;
                match tag {
                    0 => date_from_text(&inner),
                    1 => date_from_epoch(&inner),
                    _ => Ok(Value::Tag(tag, Box::new(inner))),
                }
            }
            _ => match info {
                20 => Ok(Value::Bool(false)),
                21 => Ok(Value::Bool(true)),
                22 | 23 => Ok(Value::Null),
                25 => {
                    let b = self.take(2)?;
                    Ok(Value::Float(half_to_f64(u16::from_be_bytes([b[0], b[1]]))))
                }
                26 => {
                    let b = self.take(4)?;
                    Ok(Value::Float(f64::from(f32::from_be_bytes([
                        b[0], b[1], b[2], b[3],
                    ]))))
                }
                27 => {
                    let b = self.take(8)?;
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(b);
                    Ok(Value::Float(f64::from_be_bytes(raw)))
                }
                31 => Err(Error::Decode(
                    "break marker outside indefinite-length item".into(),
                )),
                _ => Err(Error::Decode(format!("unsupported simple value {}", info))),
            },
        }
    }
}

fn date_from_text(inner: &Value) -> Result<Value, Error> {
    let text = inner
        .as_text()
        .ok_or_else(|| Error::Decode("tag 0 expects an RFC 3339 text string".into()))?;
    let date = DateTime::parse_from_rfc3339(text)
        .map_err(|e| Error::Decode(format!("tag 0 date {:?}: {}", text, e)))?;
    Ok(Value::Date(date.with_timezone(&Utc)))
}

fn date_from_epoch(inner: &Value) -> Result<Value, Error> {
    let out_of_range = || Error::Decode("tag 1 epoch timestamp out of range".into());
    match inner {
        Value::Integer(n) => {
            let secs = i64::try_from(*n).map_err(|_| out_of_range())?;
            Utc.timestamp_opt(secs, 0)
                .single()
                .map(Value::Date)
                .ok_or_else(out_of_range)
        }
        Value::Float(f) => {
            let secs = f.floor();
            let nanos = ((f - secs) * 1e9) as u32;
            if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
                return Err(out_of_range());
            }
            Utc.timestamp_opt(secs as i64, nanos)
                .single()
                .map(Value::Date)
                .ok_or_else(out_of_range)
        }
        _ => Err(Error::Decode("tag 1 expects a numeric epoch".into())),
    }
}

// Half-precision float expansion, RFC 8949 appendix D.
fn half_to_f64(half: u16) -> f64 {
    let exp = (half >> 10) & 0x1f;
    let mant = f64::from(half & 0x3ff);
    let value = match exp {
        0 => mant * 2f64.powi(-24),
        31 => {
            if mant == 0.0 {
                f64::INFINITY
            } else {
                f64::NAN
            }
        }
        _ => (mant + 1024.0) * 2f64.powi(i32::from(exp) - 25),
    };
    if half & 0x8000 != 0 {
        -value
    } else {
        value
    }
}
