//! CWT claim extraction and DCC field mapping.
//!
//! Keys follow the EU DCC JSON schema
//! (https://ec.europa.eu/health/sites/default/files/ehealth/docs/covid-certificate_json_specification_en.pdf).
//! Short codes (`ma`, `mp`, country codes, ...) are carried verbatim; the
//! value-set tables in [`crate::valuesets`] expand them for display.
//!
//! Only a payload without the hcert claim at all is an error. Every field
//! below that degrades independently: a missing or wrongly-typed entry maps
//! to `None` (or an empty list) without disturbing its neighbours.

use std::convert::TryFrom;

use chrono::{DateTime, TimeZone, Utc};
use serde_derive::Serialize;

use crate::cbor::Value;
use crate::error::Error;

// CWT claim keys (RFC 8392), plus the hcert extension claim.
const ISSUER: i128 = 1;
const EXPIRES_AT: i128 = 4;
const ISSUED_AT: i128 = 6;
const HCERT: i128 = -260;
const EUDCC_V1: i128 = 1;

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct PersonName {
    pub surname: Option<String>,
    pub surname_standardised: Option<String>,
    pub forename: Option<String>,
    pub forename_standardised: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Vaccination {
    pub disease_target: Option<String>,
    pub prophylaxis: Option<String>,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
    pub dose_number: Option<u32>,
    pub doses_required: Option<u32>,
    pub date: Option<String>,
    pub country: Option<String>,
    pub issuer: Option<String>,
    pub certificate_id: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct TestResult {
    pub disease_target: Option<String>,
    pub test_type: Option<String>,
    pub test_name: Option<String>,
    pub device_id: Option<String>,
    pub sample_collected_at: Option<String>,
    pub result: Option<String>,
    pub testing_centre: Option<String>,
    pub country: Option<String>,
    pub issuer: Option<String>,
    pub certificate_id: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Recovery {
    pub disease_target: Option<String>,
    pub first_positive_date: Option<String>,
    pub valid_from: Option<String>,
    pub valid_until: Option<String>,
    pub country: Option<String>,
    pub issuer: Option<String>,
    pub certificate_id: Option<String>,
}

/// The decoded certificate, projected out of the payload value tree.
#[derive(Debug, PartialEq, Serialize)]
pub struct CertificateRecord {
    pub issuer: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub schema_version: Option<String>,
    pub name: PersonName,
    pub date_of_birth: Option<String>,
    pub vaccinations: Vec<Vaccination>,
    pub tests: Vec<TestResult>,
    pub recoveries: Vec<Recovery>,
}

impl CertificateRecord {
    /// Map the decoded CWT payload onto a certificate record.
    pub fn from_payload(payload: &Value) -> Result<CertificateRecord, Error> {
        let dcc = payload
            .get_int(HCERT)
            .and_then(|hcert| hcert.get_int(EUDCC_V1))
            .ok_or_else(|| Error::Schema("payload carries no EU DCC v1 claim".into()))?;

        Ok(CertificateRecord {
            issuer: payload.get_int(ISSUER).and_then(text),
            issued_at: payload.get_int(ISSUED_AT).and_then(epoch),
            expires_at: payload.get_int(EXPIRES_AT).and_then(epoch),
            schema_version: field(dcc, "ver"),
            name: dcc
                .get_str("nam")
                .map(PersonName::from_value)
                .unwrap_or_default(),
            date_of_birth: field(dcc, "dob"),
            vaccinations: entries(dcc, "v", Vaccination::from_value),
            tests: entries(dcc, "t", TestResult::from_value),
            recoveries: entries(dcc, "r", Recovery::from_value),
        })
    }
}

impl PersonName {
    fn from_value(value: &Value) -> PersonName {
        PersonName {
            surname: field(value, "fn"),
            surname_standardised: field(value, "fnt"),
            forename: field(value, "gn"),
            forename_standardised: field(value, "gnt"),
        }
    }
}

impl Vaccination {
    fn from_value(value: &Value) -> Vaccination {
        Vaccination {
            disease_target: field(value, "tg"),
            prophylaxis: field(value, "vp"),
            product: field(value, "mp"),
            manufacturer: field(value, "ma"),
            dose_number: uint_field(value, "dn"),
            doses_required: uint_field(value, "sd"),
            date: field(value, "dt"),
            country: field(value, "co"),
            issuer: field(value, "is"),
            certificate_id: field(value, "ci"),
        }
    }
}

impl TestResult {
    fn from_value(value: &Value) -> TestResult {
        TestResult {
            disease_target: field(value, "tg"),
            test_type: field(value, "tt"),
            test_name: field(value, "nm"),
            device_id: field(value, "ma"),
            sample_collected_at: value.get_str("sc").and_then(date_or_text),
            result: field(value, "tr"),
            testing_centre: field(value, "tc"),
            country: field(value, "co"),
            issuer: field(value, "is"),
            certificate_id: field(value, "ci"),
        }
    }
}

impl Recovery {
    fn from_value(value: &Value) -> Recovery {
        Recovery {
            disease_target: field(value, "tg"),
            first_positive_date: field(value, "fr"),
            valid_from: field(value, "df"),
            valid_until: field(value, "du"),
            country: field(value, "co"),
            issuer: field(value, "is"),
            certificate_id: field(value, "ci"),
        }
    }
}

fn field(map: &Value, key: &str) -> Option<String> {
    map.get_str(key).and_then(text)
}

fn uint_field(map: &Value, key: &str) -> Option<u32> {
    u32::try_from(map.get_str(key)?.as_integer()?).ok()
}

fn entries<T>(dcc: &Value, key: &str, from_value: impl Fn(&Value) -> T) -> Vec<T> {
    dcc.get_str(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(&from_value).collect())
        .unwrap_or_default()
}

fn text(value: &Value) -> Option<String> {
    value.as_text().map(str::to_owned)
}

/// Epoch seconds or an already-materialised tag-1 date.
fn epoch(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Integer(n) => Utc
            .timestamp_opt(i64::try_from(*n).ok()?, 0)
            .single(),
        Value::Date(date) => Some(*date),
        _ => None,
    }
}

/// Sample-collection timestamps arrive either as plain text or tag-0 dates.
fn date_or_text(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Date(date) => Some(date.to_rfc3339()),
        _ => None,
    }
}
