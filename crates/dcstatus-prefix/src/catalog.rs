//! Prefix catalog - reference data for the identify panel
//!
//! Association row `i` lists the prefixes served by node `i + 1`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use dcstatus_core::{DcError, DcResult, NodeId};

/// One dialing prefix
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefixDescriptor {
    /// Digits without the leading `+`
    pub prefix: String,
    pub display_name: String,
    /// ISO 3166-1 alpha-2 country code
    pub locale_iso2: String,
    /// Sample national number, groups separated by spaces
    pub example_number: String,
}

impl PrefixDescriptor {
    pub fn new(prefix: &str, display_name: &str, locale_iso2: &str, example_number: &str) -> Self {
        PrefixDescriptor {
            prefix: prefix.to_owned(),
            display_name: display_name.to_owned(),
            locale_iso2: locale_iso2.to_owned(),
            example_number: example_number.to_owned(),
        }
    }
}

/// Descriptors plus the node association table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixCatalog {
    pub descriptors: Vec<PrefixDescriptor>,
    pub associations: Vec<Vec<String>>,
}

// (prefix, name, iso2, example)
const BUILTIN_DESCRIPTORS: &[(&str, &str, &str, &str)] = &[
    ("1", "United States", "US", "201 555 0123"),
    ("7", "Russia", "RU", "912 345 6789"),
    ("20", "Egypt", "EG", "100 123 4567"),
    ("30", "Greece", "GR", "691 234 5678"),
    ("31", "Netherlands", "NL", "6 12345678"),
    ("32", "Belgium", "BE", "470 12 34 56"),
    ("33", "France", "FR", "6 12 34 56 78"),
    ("34", "Spain", "ES", "612 34 56 78"),
    ("39", "Italy", "IT", "312 345 6789"),
    ("41", "Switzerland", "CH", "78 123 45 67"),
    ("44", "United Kingdom", "GB", "7400 123456"),
    ("48", "Poland", "PL", "512 345 678"),
    ("49", "Germany", "DE", "1512 3456789"),
    ("51", "Peru", "PE", "912 345 678"),
    ("52", "Mexico", "MX", "222 123 4567"),
    ("54", "Argentina", "AR", "911 2345 6789"),
    ("55", "Brazil", "BR", "11 96123 4567"),
    ("57", "Colombia", "CO", "321 1234567"),
    ("60", "Malaysia", "MY", "12 345 6789"),
    ("61", "Australia", "AU", "412 345 678"),
    ("62", "Indonesia", "ID", "812 345 678"),
    ("63", "Philippines", "PH", "905 123 4567"),
    ("65", "Singapore", "SG", "8123 4567"),
    ("66", "Thailand", "TH", "81 234 5678"),
    ("81", "Japan", "JP", "90 1234 5678"),
    ("82", "South Korea", "KR", "10 2000 0000"),
    ("84", "Vietnam", "VN", "91 234 56 78"),
    ("86", "China", "CN", "131 2345 6789"),
    ("90", "Turkey", "TR", "501 234 56 78"),
    ("91", "India", "IN", "81234 56789"),
    ("98", "Iran", "IR", "912 345 6789"),
    ("380", "Ukraine", "UA", "50 123 4567"),
    ("966", "Saudi Arabia", "SA", "51 234 5678"),
    ("971", "United Arab Emirates", "AE", "50 123 4567"),
    ("974", "Qatar", "QA", "3312 3456"),
    ("1787", "Puerto Rico", "PR", "787 234 5678"),
    ("1876", "Jamaica", "JM", "876 210 1234"),
];

const BUILTIN_ASSOCIATIONS: &[&[&str]] = &[
    // DC1
    &["1", "51", "52", "54", "55", "57", "1787", "1876"],
    // DC2
    &[
        "7", "20", "30", "31", "32", "33", "34", "39", "41", "44", "48", "49", "90", "98", "380",
        "966", "971", "974",
    ],
    // DC3
    &["1"],
    // DC4
    &["7", "20", "39", "44", "49", "90", "98", "380", "966"],
    // DC5
    &["60", "61", "62", "63", "65", "66", "81", "82", "84", "86", "91"],
];

impl PrefixCatalog {
    /// Build and validate a catalog
    pub fn new(
        descriptors: Vec<PrefixDescriptor>,
        associations: Vec<Vec<String>>,
    ) -> DcResult<Self> {
        let catalog = PrefixCatalog {
            descriptors,
            associations,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Catalog shipped with the status page
    pub fn builtin() -> Self {
        PrefixCatalog {
            descriptors: BUILTIN_DESCRIPTORS
                .iter()
                .map(|(p, n, iso, ex)| PrefixDescriptor::new(p, n, iso, ex))
                .collect(),
            associations: BUILTIN_ASSOCIATIONS
                .iter()
                .map(|row| row.iter().map(|p| (*p).to_owned()).collect())
                .collect(),
        }
    }

    /// Load from JSON and validate
    pub fn from_json(text: &str) -> DcResult<Self> {
        let catalog: PrefixCatalog =
            serde_json::from_str(text).map_err(|e| DcError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> DcResult<()> {
        let mut seen = HashSet::new();
        for desc in &self.descriptors {
            if desc.prefix.is_empty() || !desc.prefix.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DcError::Catalog(format!(
                    "prefix {:?} is not a digit string",
                    desc.prefix
                )));
            }
            if desc.locale_iso2.len() != 2
                || !desc.locale_iso2.bytes().all(|b| b.is_ascii_alphabetic())
            {
                return Err(DcError::Catalog(format!(
                    "prefix {} has invalid country code {:?}",
                    desc.prefix, desc.locale_iso2
                )));
            }
            if !seen.insert(desc.prefix.as_str()) {
                return Err(DcError::Catalog(format!(
                    "prefix {} listed twice",
                    desc.prefix
                )));
            }
        }
        for (index, row) in self.associations.iter().enumerate() {
            if let Some(unknown) = row.iter().find(|p| !seen.contains(p.as_str())) {
                return Err(DcError::Catalog(format!(
                    "{} serves unknown prefix {unknown}",
                    NodeId::from_index(index)
                )));
            }
        }
        Ok(())
    }

    /// Check the association table against a deployment of `node_count`
    /// nodes
    pub fn validate_for_nodes(&self, node_count: u32) -> DcResult<()> {
        self.validate()?;
        if self.associations.len() > node_count as usize {
            return Err(DcError::Catalog(format!(
                "{} association rows for {node_count} nodes",
                self.associations.len()
            )));
        }
        Ok(())
    }

    /// First descriptor with this exact prefix
    pub fn descriptor(&self, prefix: &str) -> Option<&PrefixDescriptor> {
        self.descriptors.iter().find(|d| d.prefix == prefix)
    }

    /// Nodes serving `prefix`, in table order
    pub fn nodes_serving(&self, prefix: &str) -> Vec<NodeId> {
        self.associations
            .iter()
            .enumerate()
            .filter(|(_, prefixes)| prefixes.iter().any(|p| p == prefix))
            .map(|(index, _)| NodeId::from_index(index))
            .collect()
    }

    /// Whether at least one node serves `prefix`
    pub fn is_served(&self, prefix: &str) -> bool {
        self.associations
            .iter()
            .any(|prefixes| prefixes.iter().any(|p| p == prefix))
    }
}

impl Default for PrefixCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
