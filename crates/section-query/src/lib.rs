//! Field-path query compiler for headless content sections.
//!
//! Turns a declarative read request (fetch fields, filters, ordering, paging)
//! into a single SQL query that eagerly loads only the requested fields of a
//! section and its related sections, then reshapes the flat result rows.
//!
//! # Quick Start
//!
//! ## Register sections
//!
//! ```ignore
//! use section_query::{RelationshipInfo, SectionMetadata, SectionRegistry};
//!
//! let registry = SectionRegistry::new()
//!     .with(
//!         SectionMetadata::new("shop::Product")
//!             .slug("productSlug")
//!             .scalar("name")
//!             .relationship("prices", RelationshipInfo::one_to_many("shop::Price"))
//!             .relationship("status", RelationshipInfo::many_to_one("shop::Status")),
//!     )?
//!     .with(
//!         SectionMetadata::new("shop::Price")
//!             .slug("priceSlug")
//!             .scalar("price")
//!             .scalar("currency")
//!             .relationship("product", RelationshipInfo::many_to_one("shop::Product")),
//!     )?;
//! ```
//!
//! ## Read
//!
//! ```ignore
//! use section_query::{Direction, ReadOptions, SectionReader};
//!
//! let reader = SectionReader::new(&registry, executor);
//!
//! let options = ReadOptions::new("shop::Product")
//!     .fetch_fields("slug,name,price,currency")
//!     .field("status:value", "live")
//!     .order_by("prices:price", Direction::Asc)
//!     .limit(10);
//!
//! // [{"product:productSlug": "..", "product:name": "..", "product:prices:price": ..}]
//! let rows = reader.read(&options)?;
//!
//! // [{"product": {"productSlug": "..", "name": "..", "prices": {"price": ..}}}]
//! let nested = reader.read_nested(&options)?;
//! ```
//!
//! Requested names are matched on every section the walk reaches: `price`
//! above selects the price of each related price entry. `slug` selects each
//! section's declared slug field.
//!
//! ## Inspect the compiled query
//!
//! ```ignore
//! let structure = reader.compile(&options)?;
//! for join in &structure.joins {
//!     println!("{} {}", join.alias, join.table);
//! }
//!
//! // SELECT "product"."productSlug" AS "product:productSlug", ...
//! // FROM "product" AS "product"
//! // LEFT JOIN "price" AS "product:prices" ON "product"."id" = "product:prices"."product"
//! let query = reader.build_query(&options)?;
//! ```
//!
//! ## Write
//!
//! ```ignore
//! use section_query::{Entry, SectionWriter};
//!
//! let writer = SectionWriter::new(&registry, executor);
//! let entry = Entry::new("shop::Product").set("id", 1).set("name", "Ongewokkel");
//!
//! // INSERT ... ON CONFLICT ("id") DO UPDATE SET "name" = "excluded"."name"
//! writer.save(&entry)?;
//! writer.delete(&entry)?;
//! ```

mod assemble;
mod compile;
mod error;
mod executor;
mod filter;
mod join;
mod metadata;
mod options;
mod path;
mod projection;
mod query;
mod reader;
mod shape;
mod structure;
mod types;
mod walker;
mod writer;

pub use assemble::{QueryTarget, SqlTarget, assemble};
pub use compile::compile;
pub use error::{Error, Result};
pub use executor::{Executor, Managers};
pub use filter::{Column, FilterSpec, Operator, Parameter, ParameterValue};
pub use join::{JoinCondition, JoinKind, JoinSpec};
pub use metadata::{
    EntityFieldInfo, EntityType, FieldKind, JoinTable, MetadataProvider, Multiplicity,
    RelationKind, RelationshipInfo, SectionMetadata, SectionRegistry,
};
pub use options::{Direction, FilterValue, ReadOptions, Scalar};
pub use path::{FetchFields, PATH_DELIMITER, SLUG, split_path};
pub use projection::build_projections;
pub use query::{Placeholder, Query, QueryBuilder};
pub use reader::SectionReader;
pub use shape::{into_hierarchy, make_nested};
pub use structure::{AliasTable, OrderSpec, PathAlias, ProjectionSpec, QueryStructure};
pub use types::{DataType, Field, Row};
pub use walker::{EntityPath, MAX_DEPTH, PathStep, Walk, walk};
pub use writer::{Entry, SectionWriter};
