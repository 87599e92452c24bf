//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use section_query::{
    DataType, Executor, Field, Query, RelationshipInfo, Row, SectionMetadata, SectionRegistry,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

pub const PRODUCT: &str = "shop::Product";
pub const PRICE: &str = "shop::Price";
pub const CATEGORY: &str = "shop::ProductCategory";
pub const STATUS: &str = "shop::Status";
pub const SLUGLESS: &str = "shop::Slugless";

/// Log compiled SQL and walker decisions while a test runs.
pub fn init_tracing() {
    let _ = Registry::default().with(EnvFilter::new("trace")).with(fmt::layer()).try_init();
}

/// The shop sections used across tests.
///
/// `Product.prices` is the non-owning side of `Price.product`, `categories` an
/// owning many-to-many and `status` an owning many-to-one. `ProductCategory`
/// sees its products only through the non-owning side.
#[must_use]
pub fn shop() -> SectionRegistry {
    let sections = [
        SectionMetadata::new(PRODUCT)
            .slug("productSlug")
            .scalar("name")
            .relationship("prices", RelationshipInfo::one_to_many(PRICE))
            .relationship("categories", RelationshipInfo::many_to_many(CATEGORY, true))
            .relationship("status", RelationshipInfo::many_to_one(STATUS)),
        SectionMetadata::new(PRICE)
            .slug("priceSlug")
            .scalar("price")
            .scalar("currency")
            .relationship("product", RelationshipInfo::many_to_one(PRODUCT)),
        SectionMetadata::new(CATEGORY)
            .slug("productCategorySlug")
            .scalar("name")
            .relationship("products", RelationshipInfo::many_to_many(PRODUCT, false)),
        SectionMetadata::new(STATUS).slug("statusSlug").scalar("value"),
        SectionMetadata::new(SLUGLESS).scalar("name"),
    ];
    sections.into_iter().try_fold(SectionRegistry::new(), SectionRegistry::with).unwrap()
}

/// Shop sections plus a one-to-one relationship neither side owns.
#[must_use]
pub fn unowned() -> SectionRegistry {
    shop()
        .with(
            SectionMetadata::new("people::Passport")
                .scalar("number")
                .relationship("person", RelationshipInfo::one_to_one("people::Person", false)),
        )
        .and_then(|registry| {
            registry.with(SectionMetadata::new("people::Person").scalar("name").relationship(
                "passport",
                RelationshipInfo::one_to_one("people::Passport", false),
            ))
        })
        .unwrap()
}

/// `chain::Link0 -> chain::Link1 -> ... -> chain::Link{len - 1}`, each link
/// holding a `label` and an owning `next` relationship.
#[must_use]
pub fn chain(len: usize) -> SectionRegistry {
    (0..len)
        .map(|index| {
            let section = SectionMetadata::new(format!("chain::Link{index}")).scalar("label");
            if index + 1 < len {
                section.relationship(
                    "next",
                    RelationshipInfo::many_to_one(format!("chain::Link{}", index + 1)),
                )
            } else {
                section
            }
        })
        .try_fold(SectionRegistry::new(), SectionRegistry::with)
        .unwrap()
}

/// Executor returning canned rows and recording every query it is handed.
#[derive(Debug, Default)]
pub struct MockExecutor {
    rows: Vec<Row>,
    affected: u64,
    seen: Mutex<Vec<Query>>,
}

impl MockExecutor {
    #[must_use]
    pub fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn affecting(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn seen(&self) -> Vec<Query> {
        self.seen.lock().unwrap().clone()
    }
}

impl Executor for MockExecutor {
    fn query(&self, query: &Query) -> anyhow::Result<Vec<Row>> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(self.rows.clone())
    }

    fn exec(&self, query: &Query) -> anyhow::Result<u64> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(self.affected)
    }
}

/// Build a row from `(output path, value)` pairs.
#[must_use]
pub fn row(fields: &[(&str, DataType)]) -> Row {
    Row {
        fields: fields
            .iter()
            .map(|(name, value)| Field {
                name: (*name).to_string(),
                value: value.clone(),
            })
            .collect(),
    }
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonicalize SQL for comparison by removing identifier quotes, then
/// normalizing whitespace. Parentheses are kept. Preserves string literals.
fn canonicalize_sql(sql: &str) -> String {
    let mut cleaned = String::with_capacity(sql.len());
    let mut in_single_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_single_quote = !in_single_quote;
                cleaned.push(ch);
            }
            '"' if !in_single_quote => {}
            _ => cleaned.push(ch),
        }
    }

    normalize_sql(&cleaned)
}

/// Assert that SQL contains all expected fragments in order.
///
/// Both sides are canonicalized, so fragments may be written with or without
/// identifier quotes. Parentheses must match exactly.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_canonical = canonicalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_canonical = canonicalize_sql(fragment);
        if fragment_canonical.is_empty() {
            continue;
        }

        if let Some(pos) = actual_canonical[search_start..].find(&fragment_canonical) {
            search_start += pos + fragment_canonical.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_canonical}` not found in `{actual_canonical}`"
            );
        }
    }
}

/// Assert that canonical SQL does not contain `fragment`.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_lacks(actual: &str, fragment: &str) {
    let actual_canonical = canonicalize_sql(actual);
    let fragment_canonical = canonicalize_sql(fragment);
    assert!(
        !actual_canonical.contains(&fragment_canonical),
        "unexpected SQL fragment `{fragment_canonical}` in `{actual_canonical}`"
    );
}
