//! Plain-text rendering of a decoded certificate.

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::valuesets::ValueSets;
use crate::Decoded;

const UNKNOWN: &str = "<unknown>";
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Render the certificate as the tab-aligned text report. Missing fields
/// come out as `<unknown>`; rendering itself never fails.
pub fn render(decoded: &Decoded, sets: &ValueSets) -> String {
    let cert = &decoded.certificate;
    let mut out = String::new();

    let _ = writeln!(out, "# Identity Info");
    let _ = writeln!(out, "SURNAME(S):\t{}", opt(&cert.name.surname));
    let _ = writeln!(out, "FORENAME(S):\t{}", opt(&cert.name.forename));
    let _ = writeln!(out, "ID SURNAME(S):\t{}", opt(&cert.name.surname_standardised));
    let _ = writeln!(out, "ID FORENAME(S):\t{}", opt(&cert.name.forename_standardised));
    let _ = writeln!(out, "DOB:\t\t{}", opt(&cert.date_of_birth));

    for vaccination in &cert.vaccinations {
        let _ = writeln!(out, "\n# Vaccine Info");
        let doses = match (vaccination.dose_number, vaccination.doses_required) {
            (Some(received), Some(required)) => format!("{}/{}", received, required),
            _ => UNKNOWN.into(),
        };
        let _ = writeln!(out, "Doses (rcvd/rqrd):\t{}", doses);
        let _ = writeln!(out, "Latest Dose Date:\t{}", opt(&vaccination.date));
        let _ = writeln!(out, "Manufacturer:\t\t{}", lookup(&vaccination.manufacturer, |c| sets.manufacturer(c)));
        let _ = writeln!(out, "Product:\t\t{}", lookup(&vaccination.product, |c| sets.product(c)));
    }

    for test in &cert.tests {
        let _ = writeln!(out, "\n# Test Info");
        let _ = writeln!(out, "Test Type:\t{}", opt(&test.test_type));
        let _ = writeln!(out, "Sample Taken:\t{}", opt(&test.sample_collected_at));
        let _ = writeln!(out, "Result:\t\t{}", opt(&test.result));
        let _ = writeln!(out, "Testing Centre:\t{}", opt(&test.testing_centre));
    }

    for recovery in &cert.recoveries {
        let _ = writeln!(out, "\n# Recovery Info");
        let _ = writeln!(out, "First Positive:\t{}", opt(&recovery.first_positive_date));
        let _ = writeln!(out, "Valid From:\t{}", opt(&recovery.valid_from));
        let _ = writeln!(out, "Valid Until:\t{}", opt(&recovery.valid_until));
    }

    let _ = writeln!(out, "\n# Cert Info");
    let _ = writeln!(out, "Issuer:\t\t{}", opt(&cert.issuer));
    let _ = writeln!(out, "Issue Date:\t{}", date(&cert.issued_at));
    let _ = writeln!(out, "Expire Date:\t{}", date(&cert.expires_at));
    let algorithm = match decoded.envelope.algorithm() {
        Some(alg) => algorithm_name(alg),
        None => UNKNOWN.into(),
    };
    let _ = writeln!(out, "Signed With:\t{}", algorithm);
    let key_id = match decoded.envelope.key_id() {
        Some(kid) => hex::encode(kid),
        None => UNKNOWN.into(),
    };
    let _ = writeln!(out, "Key ID:\t\t{}", key_id);

    out
}

fn opt(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(UNKNOWN)
}

fn date(field: &Option<DateTime<Utc>>) -> String {
    match field {
        Some(ts) => ts.format(DATE_FORMAT).to_string(),
        None => UNKNOWN.into(),
    }
}

fn lookup<'a>(code: &'a Option<String>, table: impl Fn(&str) -> Option<&'a str>) -> &'a str {
    match code.as_deref() {
        Some(code) => table(code).unwrap_or(code),
        None => UNKNOWN,
    }
}

// COSE algorithm registry, the identifiers seen on certificates in the wild.
fn algorithm_name(alg: i128) -> String {
    match alg {
        -7 => "ES256".into(),
        -35 => "ES384".into(),
        -36 => "ES512".into(),
        -37 => "PS256".into(),
        other => format!("COSE algorithm {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::cbor::Value;
    use crate::cose::Envelope;
    use crate::hcert::{CertificateRecord, PersonName, Vaccination};
    use crate::valuesets::ValueSets;
    use crate::Decoded;

    fn decoded_with(certificate: CertificateRecord) -> Decoded {
        Decoded {
            envelope: Envelope {
                protected: vec![0xa1, 0x01, 0x26],
                unprotected: vec![],
                payload: vec![],
                signature: vec![],
            },
            payload: Value::Null,
            certificate,
        }
    }

    fn sample_record() -> CertificateRecord {
        CertificateRecord {
            issuer: Some("GB".into()),
            issued_at: None,
            expires_at: None,
            schema_version: Some("1.3.0".into()),
            name: PersonName {
                surname: Some("Bloggs".into()),
                surname_standardised: Some("BLOGGS".into()),
                forename: Some("Jane".into()),
                forename_standardised: Some("JANE".into()),
            },
            date_of_birth: Some("1988-06-07".into()),
            vaccinations: vec![Vaccination {
                dose_number: Some(1),
                doses_required: Some(2),
                product: Some("EU/1/20/1528".into()),
                ..Vaccination::default()
            }],
            tests: vec![],
            recoveries: vec![],
        }
    }

    #[test]
    fn renders_identity_and_doses() {
        let report = render(&decoded_with(sample_record()), &ValueSets::builtin());
        assert!(report.contains("SURNAME(S):\tBloggs"));
        assert!(report.contains("FORENAME(S):\tJane"));
        assert!(report.contains("DOB:\t\t1988-06-07"));
        assert!(report.contains("Doses (rcvd/rqrd):\t1/2"));
        assert!(report.contains("Product:\t\tComirnaty"));
        assert!(report.contains("Signed With:\tES256"));
    }

    #[test]
    fn unknown_fields_render_placeholders() {
        let mut record = sample_record();
        record.date_of_birth = None;
        record.vaccinations[0].dose_number = None;
        let report = render(&decoded_with(record), &ValueSets::empty());
        assert!(report.contains("DOB:\t\t<unknown>"));
        assert!(report.contains("Doses (rcvd/rqrd):\t<unknown>"));
        // unknown product code falls back to the raw code
        assert!(report.contains("Product:\t\tEU/1/20/1528"));
    }
}
