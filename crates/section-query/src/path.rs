//! Field path resolution.
//!
//! A field path is a `:`-delimited chain of field names walking from the root
//! section through relationships to a terminal field, e.g. `project:product:slug`.

use crate::error::Result;
use crate::invalid_fetch;
use crate::metadata::SectionMetadata;

/// Logical field name resolved per section to its declared slug field.
pub const SLUG: &str = "slug";

/// Separator between segments of a field path.
pub const PATH_DELIMITER: char = ':';

/// Separator between requested fields in a fetch fields string.
pub const FIELD_DELIMITER: char = ',';

/// Split a field path into its relationship hops and terminal field.
///
/// `a:b:c` yields `(["a", "b"], "c")`; a path without delimiter has no hops.
#[must_use]
pub fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split(PATH_DELIMITER).collect();
    let field = segments.pop().unwrap_or_default();
    (segments, field)
}

/// Resolve a requested field name against a section.
///
/// The logical `slug` name maps to the section's slug field; any other name is
/// returned as is.
///
/// # Errors
///
/// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
/// when `slug` is requested on a section without a slug field.
pub fn resolve_field<'a>(name: &'a str, section: &'a SectionMetadata) -> Result<&'a str> {
    if name != SLUG {
        return Ok(name);
    }
    section.slug_field().ok_or_else(|| invalid_fetch!("Class doesn't have a slug field"))
}

/// The deduplicated set of field names the graph walker looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFields(Vec<String>);

impl FetchFields {
    /// Builds the fetch set from the requested fields plus the relationship hops
    /// of every filter and order-by path.
    ///
    /// Names keep their first-seen order.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
    /// when no field names remain.
    pub fn resolve<'a>(
        fetch_fields: &str, paths: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self> {
        let requested = fetch_fields.split(FIELD_DELIMITER).map(str::trim);
        let hops = paths.into_iter().flat_map(|path| split_path(path).0);

        let mut fields: Vec<String> = Vec::new();
        for name in requested.chain(hops) {
            if !name.is_empty() && !fields.iter().any(|field| field == name) {
                fields.push(name.to_string());
            }
        }

        if fields.is_empty() {
            return Err(invalid_fetch!("Not selecting any fields"));
        }
        Ok(Self(fields))
    }

    /// Field names, in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns `true` when `name` is part of the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|field| field == name)
    }
}
