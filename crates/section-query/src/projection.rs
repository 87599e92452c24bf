use crate::error::Result;
use crate::filter::Column;
use crate::invalid_fetch;
use crate::structure::ProjectionSpec;

/// Turn walked terminal fields into projections, one per distinct column.
///
/// # Errors
///
/// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
/// when none of the requested fields were found.
pub fn build_projections(terminals: &[Column]) -> Result<Vec<ProjectionSpec>> {
    let mut projections: Vec<ProjectionSpec> = Vec::with_capacity(terminals.len());
    for column in terminals {
        let projection = ProjectionSpec::new(column);
        if !projections.iter().any(|p| p.output_path == projection.output_path) {
            projections.push(projection);
        }
    }

    if projections.is_empty() {
        return Err(invalid_fetch!("Could not find any of the fields"));
    }
    Ok(projections)
}
