//! Display names for the short codes carried in certificates.
//!
//! Sourced from the ehn-dcc-schema value sets (vaccine-mah-manf.json and
//! vaccine-medicinal-product.json). Codes absent from the tables are shown
//! raw by the report renderer.

use std::collections::BTreeMap;

/// Immutable code-to-name tables, shared read-only across decodes.
pub struct ValueSets {
    manufacturers: BTreeMap<&'static str, &'static str>,
    products: BTreeMap<&'static str, &'static str>,
}

impl ValueSets {
    /// Tables bundled with the crate.
    pub fn builtin() -> ValueSets {
        let manufacturers = vec![
            ("Bharat-Biotech", "Bharat Biotech"),
            ("Gamaleya-Research-Institute", "Gamaleya Research Institute"),
            ("ORG-100001417", "Janssen-Cilag International"),
            ("ORG-100001699", "AstraZeneca AB"),
            ("ORG-100006270", "Curevac AG"),
            (
                "ORG-100010771",
                "Sinopharm Weiqida Europe Pharmaceutical s.r.o. - Prague location",
            ),
            ("ORG-100013793", "CanSino Biologics"),
            (
                "ORG-100020693",
                "China Sinopharm International Corp. - Beijing location",
            ),
            (
                "ORG-100024420",
                "Sinopharm Zhijun (Shenzhen) Pharmaceutical Co. Ltd. - Shenzhen location",
            ),
            ("ORG-100030215", "Biontech Manufacturing GmbH"),
            ("ORG-100031184", "Moderna Biotech Spain S.L."),
            ("ORG-100032020", "Novavax CZ AS"),
            ("Sinovac-Biotech", "Sinovac Biotech"),
            ("Vector-Institute", "Vector Institute"),
        ];
        let products = vec![
            ("BBIBP-CorV", "BBIBP-CorV"),
            ("CVnCoV", "CVnCoV"),
            ("Convidecia", "Convidecia"),
            ("CoronaVac", "CoronaVac"),
            ("Covaxin", "Covaxin (also known as BBV152 A, B, C)"),
            ("EU/1/20/1507", "COVID-19 Vaccine Moderna"),
            ("EU/1/20/1525", "COVID-19 Vaccine Janssen"),
            ("EU/1/20/1528", "Comirnaty"),
            ("EU/1/21/1529", "Vaxzevria"),
            ("EpiVacCorona", "EpiVacCorona"),
            (
                "Inactivated-SARS-CoV-2-Vero-Cell",
                "Inactivated SARS-CoV-2 (Vero Cell)",
            ),
            ("Sputnik-V", "Sputnik-V"),
        ];
        ValueSets {
            manufacturers: manufacturers.into_iter().collect(),
            products: products.into_iter().collect(),
        }
    }

    /// Empty tables, every lookup misses.
    pub fn empty() -> ValueSets {
        ValueSets {
            manufacturers: BTreeMap::new(),
            products: BTreeMap::new(),
        }
    }

    pub fn manufacturer(&self, code: &str) -> Option<&str> {
        self.manufacturers.get(code).copied()
    }

    pub fn product(&self, code: &str) -> Option<&str> {
        self.products.get(code).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::ValueSets;

    #[test]
    fn known_codes_expand() {
        let sets = ValueSets::builtin();
        assert_eq!(sets.product("EU/1/20/1528"), Some("Comirnaty"));
        assert_eq!(
            sets.manufacturer("ORG-100030215"),
            Some("Biontech Manufacturing GmbH")
        );
    }

    #[test]
    fn unknown_codes_miss() {
        let sets = ValueSets::builtin();
        assert_eq!(sets.product("EU/9/99/9999"), None);
        assert_eq!(ValueSets::empty().product("EU/1/20/1528"), None);
    }
}
