//! Structural serialization — text round-trip of a whole Catalog.
//!
//! Every model DTO derives serde, so the serialization collaborator is a
//! thin walk over `serde_json`. The representation round-trips every
//! catalog attribute: global id, species, locator/upstream, versions, the
//! Aspectage, and the full contents of every hierarchy.
//!
//! ```text
//! Catalog → to_json() → structural text → from_json() → identical Catalog
//! ```

use std::io::Write;

use crate::Result;
use crate::model::Catalog;

/// Serialize a catalog to its structural text representation.
pub fn to_json(catalog: &Catalog) -> Result<String> {
    Ok(serde_json::to_string_pretty(catalog)?)
}

/// Parse a catalog back from its structural text representation.
pub fn from_json(text: &str) -> Result<Catalog> {
    Ok(serde_json::from_str(text)?)
}

/// Stream the structural representation to a writer.
pub fn write_json(catalog: &Catalog, writer: &mut dyn Write) -> Result<()> {
    let text = to_json(catalog)?;
    writer.write_all(text.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}
