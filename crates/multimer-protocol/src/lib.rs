//! JSON contracts shared by the preparation tools and the external
//! assembly pipeline.

use serde::{Deserialize, Serialize};

pub use indexmap::IndexMap;

pub const CHAIN_ID_MAP_FILE_NAME: &str = "chain_id_map.json";
pub const SUBUNITS_FILE_NAME: &str = "subunits.json";

/// Residue numbering of every subunit starts here.
pub const SUBUNIT_START_RES: u32 = 1;

/// Suffix appended to a group's first chain name to form the subunit name.
pub const SUBUNIT_NAME_SUFFIX: &str = "0";

/// One chain entry of a `chain_id_map.json` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub description: String,
    pub sequence: String,
}

impl ChainRecord {
    pub fn new(description: &str, sequence: &str) -> Self {
        Self {
            description: description.to_string(),
            sequence: sequence.to_string(),
        }
    }
}

/// Chain identifier to chain record, in source order. Re-inserting a key
/// replaces its value in place.
pub type ChainIdMap = IndexMap<String, ChainRecord>;

/// One deduplicated sequence and all chains that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubunitRecord {
    pub name: String,
    pub chain_names: Vec<String>,
    pub start_res: u32,
    pub sequence: String,
}

impl SubunitRecord {
    /// Builds the record for a group whose chains are listed in first-seen
    /// order. Returns `None` for an empty group.
    pub fn from_chain_group(chain_names: Vec<String>, sequence: String) -> Option<Self> {
        let name = format!("{}{}", chain_names.first()?, SUBUNIT_NAME_SUFFIX);
        Some(Self {
            name,
            chain_names,
            start_res: SUBUNIT_START_RES,
            sequence,
        })
    }
}

/// Subunit name to subunit record, in first-seen sequence order.
pub type SubunitRegistry = IndexMap<String, SubunitRecord>;

/// Pretty-prints with a four-space indent, the layout the assembly pipeline
/// and existing MSA libraries use.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}
