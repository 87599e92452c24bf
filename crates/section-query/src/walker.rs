//! Breadth-first relationship graph walker.
//!
//! Starting from the root section, every requested relationship field queues a
//! longer [`EntityPath`]. Each dequeued path gets at most one join (two for an
//! owning many-to-many) and contributes its requested scalar fields as terminals.

use std::collections::VecDeque;
use std::fmt;

use crate::error::Result;
use crate::filter::Column;
use crate::invalid_fetch;
use crate::join::{JoinCondition, JoinKind, JoinSpec};
use crate::metadata::{
    DEFAULT_PRIMARY_KEY, EntityType, FieldKind, MetadataProvider, RelationKind, RelationshipInfo,
    SectionMetadata,
};
use crate::path::{FetchFields, PATH_DELIMITER, resolve_field};
use crate::structure::{AliasTable, PathAlias};

/// Maximum number of relationship hops below the root.
pub const MAX_DEPTH: usize = 5;

const LINK_SUFFIX: &str = "@link";

/// One step of an [`EntityPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    /// Field on the previous step's entity. For the root, its simplified name.
    pub field: String,

    /// Entity reached by this step.
    pub entity: EntityType,

    /// The relationship followed; `None` for the root.
    pub relationship: Option<RelationshipInfo>,
}

/// A chain of steps from the root entity to a related entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPath {
    steps: Vec<PathStep>,
}

impl EntityPath {
    /// The path holding only the root entity.
    #[must_use]
    pub fn root(entity: &EntityType) -> Self {
        Self {
            steps: vec![PathStep {
                field: entity.simplified(),
                entity: entity.clone(),
                relationship: None,
            }],
        }
    }

    /// A new path extended with one relationship hop.
    #[must_use]
    pub fn extend(&self, field: &str, relationship: &RelationshipInfo) -> Self {
        let mut steps = self.steps.clone();
        steps.push(PathStep {
            field: field.to_string(),
            entity: relationship.target.clone(),
            relationship: Some(relationship.clone()),
        });
        Self { steps }
    }

    /// Number of relationship hops.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.steps.len() - 1
    }

    /// Field names of the relationship hops.
    #[must_use]
    pub fn hop_fields(&self) -> Vec<String> {
        self.steps.iter().skip(1).map(|step| step.field.clone()).collect()
    }

    /// The last step.
    #[must_use]
    pub fn last(&self) -> &PathStep {
        &self.steps[self.steps.len() - 1]
    }

    /// The step before the last, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&PathStep> {
        self.steps.len().checked_sub(2).map(|index| &self.steps[index])
    }

    /// Returns `true` when a `(field, entity)` step occurs more than once.
    #[must_use]
    pub fn has_repeated_step(&self) -> bool {
        self.steps.iter().enumerate().any(|(index, step)| {
            self.steps[..index]
                .iter()
                .any(|other| other.field == step.field && other.entity == step.entity)
        })
    }
}

impl fmt::Display for EntityPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.steps.iter().map(|step| step.field.as_str()).collect();
        f.write_str(&fields.join(&PATH_DELIMITER.to_string()))
    }
}

/// Output of a graph walk.
#[derive(Debug, Clone)]
pub struct Walk {
    /// Every joined path and its alias.
    pub aliases: AliasTable,

    /// Joins, in discovery order.
    pub joins: Vec<JoinSpec>,

    /// Requested scalar fields found along the walked paths, in discovery order.
    pub terminals: Vec<Column>,
}

/// Walk the relationship graph from `root`, looking for the `fetch` fields.
///
/// Paths longer than [`MAX_DEPTH`] hops, paths revisiting a `(field, entity)`
/// step, and relationships that cannot be joined from the traversed side are
/// abandoned without error.
///
/// # Errors
///
/// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
/// when `slug` is requested on a section without a slug field, or when a
/// non-owning one-to-one or one-to-many relationship has no owning side.
pub fn walk<M: MetadataProvider>(
    metadata: &M, root: &EntityType, fetch: &FetchFields,
) -> Result<Walk> {
    let primary_key =
        metadata.section(root).map_or(DEFAULT_PRIMARY_KEY, SectionMetadata::primary_key);
    let mut aliases = AliasTable::new(root, primary_key);
    let mut joins = Vec::new();
    let mut terminals = Vec::new();

    let mut queue = VecDeque::from([EntityPath::root(root)]);
    while let Some(path) = queue.pop_front() {
        if path.hops() > MAX_DEPTH {
            tracing::debug!(path = %path, max_depth = MAX_DEPTH, "path too deep, skipping");
            continue;
        }
        if path.has_repeated_step() {
            tracing::debug!(path = %path, "path revisits a step, skipping");
            continue;
        }

        let step = path.last();
        let Some(section) = metadata.section(&step.entity) else {
            tracing::debug!(path = %path, section = %step.entity, "no metadata for section");
            continue;
        };

        let alias = if path.hops() == 0 {
            aliases.root().alias.clone()
        } else {
            match join_path(metadata, &path, section, &mut aliases, &mut joins)? {
                Some(alias) => alias,
                None => continue,
            }
        };

        for name in fetch.iter() {
            let field_name = resolve_field(name, section)?;
            let Some(field) = section.get(field_name) else {
                continue;
            };
            match &field.kind {
                FieldKind::Scalar | FieldKind::Slug => {
                    terminals.push(Column::new(&alias, field_name));
                }
                FieldKind::Relationship(info) => queue.push_back(path.extend(field_name, info)),
            }
        }
    }

    Ok(Walk {
        aliases,
        joins,
        terminals,
    })
}

// Join the last hop of `path`, registering its alias. Returns `None` when the
// relationship cannot be joined from this side.
fn join_path<M: MetadataProvider>(
    metadata: &M, path: &EntityPath, section: &SectionMetadata, aliases: &mut AliasTable,
    joins: &mut Vec<JoinSpec>,
) -> Result<Option<String>> {
    let hops = path.hop_fields();
    if let Some(existing) = aliases.get(&hops) {
        return Ok(Some(existing.alias.clone()));
    }

    let step = path.last();
    let (Some(info), Some(parent)) = (&step.relationship, aliases.get(&hops[..hops.len() - 1]))
    else {
        return Ok(None);
    };

    let alias = aliases.alias_for(&hops);
    let Some(new_joins) =
        relationship_joins(metadata, parent, &step.field, info, section, &alias, JoinKind::Left)?
    else {
        tracing::debug!(
            path = %path,
            kind = %info.kind,
            "relationship cannot be joined from the non-owning side, skipping"
        );
        return Ok(None);
    };

    for join in &new_joins {
        tracing::trace!(alias = %join.alias, table = %join.table, parent = %join.condition.parent(), "join");
    }
    joins.extend(new_joins);

    aliases.insert(
        hops,
        PathAlias {
            alias: alias.clone(),
            entity: section.entity().clone(),
            primary_key: section.primary_key().to_string(),
        },
    );
    Ok(Some(alias))
}

/// The joins linking `parent` to `target` through the relationship `field`.
///
/// Returns `None` for relationships only the other side can join: non-owning
/// many-to-one and many-to-many.
///
/// # Errors
///
/// Returns [`InvalidFetchFieldsQuery`](crate::Error::InvalidFetchFieldsQuery)
/// when a non-owning one-to-one or one-to-many relationship has no owning side
/// on `target`.
pub(crate) fn relationship_joins<M: MetadataProvider>(
    metadata: &M, parent: &PathAlias, field: &str, info: &RelationshipInfo,
    target: &SectionMetadata, alias: &str, kind: JoinKind,
) -> Result<Option<Vec<JoinSpec>>> {
    let target_type = Some(target.entity().clone());

    let joins = match (info.owner, info.kind) {
        (true, RelationKind::ManyToMany) => {
            let link = link_table(metadata, parent, field, target);
            let link_alias = format!("{alias}{LINK_SUFFIX}");
            vec![
                JoinSpec::left(
                    &link_alias,
                    None,
                    &link.name,
                    JoinCondition::Inverse {
                        parent: parent.alias.clone(),
                        key: parent.primary_key.clone(),
                        field: link.source_column,
                    },
                )
                .with_kind(kind),
                JoinSpec::left(
                    alias,
                    target_type,
                    target.table(),
                    JoinCondition::Owner {
                        parent: link_alias,
                        field: link.target_column,
                        key: target.primary_key().to_string(),
                    },
                )
                .with_kind(kind),
            ]
        }
        (true, _) => vec![
            JoinSpec::left(
                alias,
                target_type,
                target.table(),
                JoinCondition::Owner {
                    parent: parent.alias.clone(),
                    field: field.to_string(),
                    key: target.primary_key().to_string(),
                },
            )
            .with_kind(kind),
        ],
        (false, RelationKind::OneToMany | RelationKind::OneToOne) => {
            let Some(inverse) = inverse_field(target, &parent.entity) else {
                return Err(invalid_fetch!(
                    "Couldn't find the inverse side of {}::{field} on {}",
                    parent.entity,
                    target.entity()
                ));
            };
            vec![
                JoinSpec::left(
                    alias,
                    target_type,
                    target.table(),
                    JoinCondition::Inverse {
                        parent: parent.alias.clone(),
                        key: parent.primary_key.clone(),
                        field: inverse.to_string(),
                    },
                )
                .with_kind(kind),
            ]
        }
        (false, RelationKind::ManyToOne | RelationKind::ManyToMany) => return Ok(None),
    };

    Ok(Some(joins))
}

// The owning, single-valued field on `section` pointing back at `parent`.
fn inverse_field<'a>(section: &'a SectionMetadata, parent: &EntityType) -> Option<&'a str> {
    section
        .fields()
        .iter()
        .find(|field| {
            field.relationship().is_some_and(|info| {
                &info.target == parent && !info.is_plural() && info.owner
            })
        })
        .map(|field| field.name.as_str())
}

struct LinkTable {
    name: String,
    source_column: String,
    target_column: String,
}

fn link_table<M: MetadataProvider>(
    metadata: &M, parent: &PathAlias, field: &str, target: &SectionMetadata,
) -> LinkTable {
    let declared = metadata
        .section(&parent.entity)
        .and_then(|section| section.get(field))
        .and_then(|field| field.relationship())
        .and_then(|info| info.join_table.as_ref());

    if let Some(table) = declared {
        return LinkTable {
            name: table.name.clone(),
            source_column: table.source_column.clone(),
            target_column: table.target_column.clone(),
        };
    }

    let source = parent.entity.simplified();
    LinkTable {
        name: format!("{source}_{field}"),
        source_column: format!("{source}_id"),
        target_column: format!("{}_id", target.entity().simplified()),
    }
}
