//! Compiles [`ReadOptions`] into a [`QueryStructure`].

use crate::error::Result;
use crate::filter::{Column, FilterSpec, Operator};
use crate::invalid_fetch;
use crate::join::{JoinKind, JoinSpec};
use crate::metadata::{
    DEFAULT_CREATED_FIELD, EntityFieldInfo, MetadataProvider, SectionMetadata,
};
use crate::options::{ReadOptions, Scalar};
use crate::path::{FetchFields, SLUG, split_path};
use crate::projection::build_projections;
use crate::structure::{AliasTable, OrderSpec, QueryStructure};
use crate::walker::{Walk, relationship_joins, walk};

const EXISTENCE_SEPARATOR: char = '@';

// Hands out 1-based logical parameter indexes.
#[derive(Default)]
struct ParameterIndex(usize);

impl ParameterIndex {
    const fn next(&mut self) -> usize {
        self.0 += 1;
        self.0
    }
}

/// Compile a read request against the section metadata.
///
/// Parameters are numbered in bind order: existence joins, `id`, `slug`,
/// field filters, `before`, then `after`.
///
/// # Errors
///
/// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
/// when no fields are requested or found, when a slug is requested from a
/// section without one, when a relationship cannot be joined, or when a filter
/// or order path does not resolve to a joined relationship.
pub fn compile<M: MetadataProvider>(metadata: &M, options: &ReadOptions) -> Result<QueryStructure> {
    let root = &options.section;
    let section = metadata.section(root);

    let paths = options
        .field
        .iter()
        .map(|(path, _)| path.as_str())
        .chain(options.order_by.iter().map(|(path, _)| path.as_str()));
    let fetch = FetchFields::resolve(&options.fetch_fields, paths)?;

    let Walk {
        aliases,
        mut joins,
        terminals,
    } = walk(metadata, root, &fetch)?;
    let projections = build_projections(&terminals)?;

    let mut index = ParameterIndex::default();
    for (field, id) in &options.join {
        joins.extend(existence_joins(metadata, &aliases, field, *id, index.next())?);
    }

    let root_alias = aliases.root().alias.as_str();
    let mut filters = Vec::new();

    if let Some(id) = options.id {
        let column = Column::new(root_alias, &aliases.root().primary_key);
        filters.push(FilterSpec::matching(column, index.next(), Scalar::Int(id)));
    }

    if let Some(slug) = &options.slug {
        let Some(slug_field) = section.and_then(SectionMetadata::slug_field) else {
            return Err(invalid_fetch!("Class doesn't have a slug field"));
        };
        let column = Column::new(root_alias, slug_field);
        filters.push(FilterSpec::matching(column, index.next(), Scalar::Text(slug.clone())));
    }

    for (path, value) in &options.field {
        let column = resolve_column(&aliases, path)?;
        filters.push(FilterSpec::matching(column, index.next(), value.clone().null_keyword()));
    }

    let created = section.map_or(DEFAULT_CREATED_FIELD, SectionMetadata::created_field);
    if let Some(before) = options.before {
        let column = Column::new(root_alias, created);
        filters.push(FilterSpec::new(column, Operator::Lt, index.next(), before));
    }
    if let Some(after) = options.after {
        let column = Column::new(root_alias, created);
        filters.push(FilterSpec::new(column, Operator::Gt, index.next(), after));
    }

    let order_by = options
        .order_by
        .iter()
        .map(|(path, direction)| {
            Ok(OrderSpec {
                column: resolve_column(&aliases, path)?,
                direction: *direction,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        section = %root,
        aliases = %aliases,
        joins = joins.len(),
        projections = projections.len(),
        filters = filters.len(),
        "compiled section read"
    );

    Ok(QueryStructure {
        root: root.clone(),
        root_table: section.map_or_else(|| root.simplified(), SectionMetadata::table),
        root_alias: root_alias.to_string(),
        joins,
        projections,
        filters,
        order_by,
        limit: options.limit,
        offset: options.offset,
    })
}

// Resolve a filter or order path `a:b:c` to column `c` on the alias of `a:b`.
fn resolve_column(aliases: &AliasTable, path: &str) -> Result<Column> {
    let (hops, field) = split_path(path);
    let Some(target) = aliases.get(&hops) else {
        return Err(invalid_fetch!("Field path {path} does not resolve to a joined relationship"));
    };

    // slug fields are assumed to be named `<segment>Slug`
    let field = if field == SLUG {
        let segment = hops.last().copied().unwrap_or(&aliases.root().alias);
        format!("{segment}Slug")
    } else {
        field.to_string()
    };

    Ok(Column::new(&target.alias, field))
}

// Inner joins requiring the root relationship `field` to contain the entry `id`.
fn existence_joins<M: MetadataProvider>(
    metadata: &M, aliases: &AliasTable, field: &str, id: i64, index: usize,
) -> Result<Vec<JoinSpec>> {
    let root = aliases.root();
    let Some(info) = metadata
        .section(&root.entity)
        .and_then(|section| section.get(field))
        .and_then(EntityFieldInfo::relationship)
    else {
        return Err(invalid_fetch!("{} has no relationship field {field}", root.entity));
    };
    let Some(target) = metadata.section(&info.target) else {
        return Err(invalid_fetch!("Section {} is not registered", info.target));
    };

    let alias = format!("{}{EXISTENCE_SEPARATOR}{field}", root.alias);
    let Some(mut joins) =
        relationship_joins(metadata, root, field, info, target, &alias, JoinKind::Inner)?
    else {
        return Err(invalid_fetch!(
            "Cannot join {}::{field} from the non-owning side",
            root.entity
        ));
    };

    let column = Column::new(&alias, target.primary_key());
    let restrict = FilterSpec::matching(column, index, Scalar::Int(id));
    if let Some(last) = joins.pop() {
        joins.push(last.with_restrict(restrict));
    }
    Ok(joins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::metadata::{RelationshipInfo, SectionRegistry};
    use crate::structure::PathAlias;

    #[test]
    fn slug_paths_use_segment_names() {
        let mut aliases = AliasTable::new(&"shop::Product".into(), "id");
        aliases.insert(
            vec!["status".to_string()],
            PathAlias {
                alias: "product:status".to_string(),
                entity: "shop::Status".into(),
                primary_key: "id".to_string(),
            },
        );

        assert_eq!(resolve_column(&aliases, "slug").unwrap(), Column::new("product", "productSlug"));
        assert_eq!(
            resolve_column(&aliases, "status:slug").unwrap(),
            Column::new("product:status", "statusSlug")
        );
        assert_eq!(
            resolve_column(&aliases, "status:value").unwrap(),
            Column::new("product:status", "value")
        );

        let err = resolve_column(&aliases, "prices:price").unwrap_err();
        assert!(matches!(err, Error::InvalidFetchFieldsQuery(msg) if msg.contains("prices:price")));
    }

    #[test]
    fn existence_join_needs_a_relationship() {
        let registry = SectionRegistry::new()
            .with(
                SectionMetadata::new("shop::Product")
                    .scalar("name")
                    .relationship("status", RelationshipInfo::many_to_one("shop::Status")),
            )
            .and_then(|registry| registry.with(SectionMetadata::new("shop::Status").scalar("value")))
            .unwrap();

        let options = ReadOptions::new("shop::Product").fetch_fields("name").join("name", 1);
        let err = compile(&registry, &options).unwrap_err();
        assert!(
            matches!(err, Error::InvalidFetchFieldsQuery(msg) if msg == "shop::Product has no relationship field name")
        );

        let options = ReadOptions::new("shop::Product").fetch_fields("name").join("status", 4);
        let structure = compile(&registry, &options).unwrap();
        let join = structure.join("product@status").unwrap();
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.table, "status");
        let restrict = join.restrict.as_ref().unwrap();
        assert_eq!(restrict.column, Column::new("product@status", "id"));
        assert_eq!(restrict.parameter.index, 1);
    }
}
