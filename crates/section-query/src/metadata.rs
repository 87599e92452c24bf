//! Section metadata: the typed field information the query compiler walks.
//!
//! Sections are registered once, up front, in a [`SectionRegistry`]. The walker
//! only ever reads from it, so a registry can be shared across concurrent reads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub(crate) const DEFAULT_PRIMARY_KEY: &str = "id";
pub(crate) const DEFAULT_CREATED_FIELD: &str = "created";

/// Stable identifier of a section, e.g. `shop::Product` or `Shop\Product`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    /// Creates a new entity type identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The full identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its namespace.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.rsplit(['\\', ':']).next().unwrap_or(&self.0)
    }

    /// The name with its first letter lowercased, used as root alias and default table.
    #[must_use]
    pub fn simplified(&self) -> String {
        let mut chars = self.name().chars();
        chars
            .next()
            .map_or_else(String::new, |first| first.to_lowercase().chain(chars).collect())
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for EntityType {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Whether a relationship resolves to one or many related entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    Single,
    Many,
}

/// Cardinality of a relationship, seen from the declaring section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl RelationKind {
    /// Default multiplicity for the kind.
    #[must_use]
    pub const fn multiplicity(self) -> Multiplicity {
        match self {
            Self::OneToOne | Self::ManyToOne => Multiplicity::Single,
            Self::OneToMany | Self::ManyToMany => Multiplicity::Many,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::OneToOne => "one-to-one",
            Self::ManyToOne => "many-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany => "many-to-many",
        };
        f.write_str(kind)
    }
}

/// Link table backing an owning many-to-many relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinTable {
    /// Link table name.
    pub name: String,

    /// Column referencing the owning side's primary key.
    pub source_column: String,

    /// Column referencing the related side's primary key.
    pub target_column: String,
}

/// Relationship details of a [`FieldKind::Relationship`] field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInfo {
    /// Section the relationship points at.
    pub target: EntityType,

    /// Single or plural.
    pub multiplicity: Multiplicity,

    /// Relationship cardinality.
    pub kind: RelationKind,

    /// Whether this side holds the foreign key (or the link table).
    pub owner: bool,

    /// Link table override for owning many-to-many relationships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<JoinTable>,
}

impl RelationshipInfo {
    /// Creates a relationship with multiplicity derived from `kind`.
    #[must_use]
    pub fn new(target: impl Into<EntityType>, kind: RelationKind, owner: bool) -> Self {
        Self {
            target: target.into(),
            multiplicity: kind.multiplicity(),
            kind,
            owner,
            join_table: None,
        }
    }

    /// One-to-one relationship.
    #[must_use]
    pub fn one_to_one(target: impl Into<EntityType>, owner: bool) -> Self {
        Self::new(target, RelationKind::OneToOne, owner)
    }

    /// Many-to-one relationship. The declaring side holds the foreign key.
    #[must_use]
    pub fn many_to_one(target: impl Into<EntityType>) -> Self {
        Self::new(target, RelationKind::ManyToOne, true)
    }

    /// One-to-many relationship. The related side holds the foreign key.
    #[must_use]
    pub fn one_to_many(target: impl Into<EntityType>) -> Self {
        Self::new(target, RelationKind::OneToMany, false)
    }

    /// Many-to-many relationship.
    #[must_use]
    pub fn many_to_many(target: impl Into<EntityType>, owner: bool) -> Self {
        Self::new(target, RelationKind::ManyToMany, owner)
    }

    /// Overrides ownership.
    #[must_use]
    pub const fn with_owner(mut self, owner: bool) -> Self {
        self.owner = owner;
        self
    }

    /// Overrides the link table of a many-to-many relationship.
    #[must_use]
    pub fn with_join_table(mut self, join_table: JoinTable) -> Self {
        self.join_table = Some(join_table);
        self
    }

    /// Returns `true` when the relationship resolves to many entries.
    #[must_use]
    pub fn is_plural(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }
}

/// The kind of a section field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "relationship")]
pub enum FieldKind {
    Scalar,
    Slug,
    Relationship(RelationshipInfo),
}

/// A named field on a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFieldInfo {
    /// Field (and column) name.
    pub name: String,

    /// What kind of value the field holds.
    pub kind: FieldKind,
}

impl EntityFieldInfo {
    /// Relationship details, if the field is a relationship.
    #[must_use]
    pub const fn relationship(&self) -> Option<&RelationshipInfo> {
        match &self.kind {
            FieldKind::Relationship(info) => Some(info),
            FieldKind::Scalar | FieldKind::Slug => None,
        }
    }
}

/// Metadata for one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionMetadata {
    entity: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    table: Option<String>,
    #[serde(default = "default_primary_key")]
    primary_key: String,
    #[serde(default = "default_created_field")]
    created_field: String,
    #[serde(default)]
    fields: Vec<EntityFieldInfo>,
}

fn default_primary_key() -> String {
    DEFAULT_PRIMARY_KEY.to_string()
}

fn default_created_field() -> String {
    DEFAULT_CREATED_FIELD.to_string()
}

impl SectionMetadata {
    /// Creates metadata for a section with no fields.
    #[must_use]
    pub fn new(entity: impl Into<EntityType>) -> Self {
        Self {
            entity: entity.into(),
            table: None,
            primary_key: default_primary_key(),
            created_field: default_created_field(),
            fields: Vec::new(),
        }
    }

    /// Overrides the table name (defaults to the simplified entity name).
    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Overrides the primary key column (defaults to `id`).
    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Overrides the field used by `before`/`after` bounds (defaults to `created`).
    #[must_use]
    pub fn with_created_field(mut self, field: impl Into<String>) -> Self {
        self.created_field = field.into();
        self
    }

    /// Adds a plain value field.
    #[must_use]
    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Scalar)
    }

    /// Adds the section's slug field.
    #[must_use]
    pub fn slug(self, name: impl Into<String>) -> Self {
        self.field(name, FieldKind::Slug)
    }

    /// Adds a relationship field.
    #[must_use]
    pub fn relationship(self, name: impl Into<String>, info: RelationshipInfo) -> Self {
        self.field(name, FieldKind::Relationship(info))
    }

    fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(EntityFieldInfo {
            name: name.into(),
            kind,
        });
        self
    }

    /// The section identifier.
    #[must_use]
    pub const fn entity(&self) -> &EntityType {
        &self.entity
    }

    /// The backing table name.
    #[must_use]
    pub fn table(&self) -> String {
        self.table.clone().unwrap_or_else(|| self.entity.simplified())
    }

    /// The primary key column.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The creation timestamp field.
    #[must_use]
    pub fn created_field(&self) -> &str {
        &self.created_field
    }

    /// All fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[EntityFieldInfo] {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityFieldInfo> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Name of the section's slug field, if it declares one.
    #[must_use]
    pub fn slug_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| matches!(field.kind, FieldKind::Slug))
            .map(|field| field.name.as_str())
    }

    fn validate(&self) -> Result<()> {
        let slugs = self.fields.iter().filter(|field| matches!(field.kind, FieldKind::Slug));
        if slugs.count() > 1 {
            return Err(Error::InvalidSection(format!(
                "{} declares more than one slug field",
                self.entity
            )));
        }

        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|other| other.name == field.name) {
                return Err(Error::InvalidSection(format!(
                    "{} declares field {} more than once",
                    self.entity, field.name
                )));
            }
        }

        Ok(())
    }
}

/// Source of section metadata for the query compiler.
pub trait MetadataProvider {
    /// Metadata for `entity`, or `None` when the section is unknown.
    fn section(&self, entity: &EntityType) -> Option<&SectionMetadata>;
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn section(&self, entity: &EntityType) -> Option<&SectionMetadata> {
        (**self).section(entity)
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for Arc<T> {
    fn section(&self, entity: &EntityType) -> Option<&SectionMetadata> {
        (**self).section(entity)
    }
}

/// In-memory registry of section metadata.
#[derive(Debug, Clone, Default)]
pub struct SectionRegistry {
    sections: HashMap<EntityType, SectionMetadata>,
}

impl SectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a section, replacing any previous definition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] when the section declares more than one
    /// slug field or repeats a field name.
    pub fn register(&mut self, section: SectionMetadata) -> Result<&mut Self> {
        section.validate()?;
        tracing::trace!(section = %section.entity, fields = section.fields.len(), "registered section");
        self.sections.insert(section.entity.clone(), section);
        Ok(self)
    }

    /// Consuming variant of [`Self::register`] for chained construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] when the section is invalid.
    pub fn with(mut self, section: SectionMetadata) -> Result<Self> {
        self.register(section)?;
        Ok(self)
    }

    /// Builds a registry from a JSON array of section definitions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] when the JSON is malformed or a section is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let sections: Vec<SectionMetadata> = serde_json::from_str(json)
            .map_err(|e| Error::InvalidSection(format!("malformed section definitions: {e}")))?;
        sections.into_iter().try_fold(Self::new(), Self::with)
    }

    /// Number of registered sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Returns `true` when no sections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl MetadataProvider for SectionRegistry {
    fn section(&self, entity: &EntityType) -> Option<&SectionMetadata> {
        self.sections.get(entity)
    }
}
