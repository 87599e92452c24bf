//! Integration tests for rendering, reading and writing sections.
//!
//! Tests the public API as users would interact with it.

#![allow(missing_docs)]

mod common;

use common::{
    MockExecutor, PRICE, PRODUCT, assert_sql_contains, assert_sql_lacks, init_tracing, row, shop,
};
use section_query::{
    DataType, Direction, Entry, Error, Managers, Placeholder, QueryBuilder, ReadOptions, Scalar,
    SectionReader, SectionWriter, SqlTarget, assemble, into_hierarchy, make_nested,
};
use serde_json::json;

// SELECT tests

#[test]
fn select_one_to_many() {
    init_tracing();
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT)
        .fetch_fields("slug,price,currency,product")
        .order_by("prices:price", Direction::Asc)
        .limit(5);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(
        &query.sql,
        &[
            "SELECT product.productSlug AS product:productSlug",
            "product:prices.priceSlug AS product:prices:priceSlug",
            "product:prices.price AS product:prices:price",
            "product:prices.currency AS product:prices:currency",
            "FROM product AS product",
            "LEFT JOIN price AS product:prices ON product.id = product:prices.product",
            "ORDER BY product:prices.price ASC",
            "LIMIT $1",
        ],
    );
    assert_sql_lacks(&query.sql, "JOIN product AS");
    assert_eq!(query.params, vec![DataType::Uint64(Some(5))]);
}

#[test]
fn select_membership() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT)
        .fetch_fields("name,slug")
        .field("name", vec!["Space Frikandel", "Ongewokkel"]);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(
        &query.sql,
        &[
            "SELECT product.name AS product:name, product.productSlug AS product:productSlug",
            "FROM product AS product",
            "WHERE product.name IN ($1, $2)",
        ],
    );
    assert_sql_lacks(&query.sql, "IN ((");
    assert_sql_lacks(&query.sql, "JOIN");
    assert_eq!(
        query.params,
        vec![
            DataType::Str(Some("Space Frikandel".to_string())),
            DataType::Str(Some("Ongewokkel".to_string())),
        ]
    );
}

#[test]
fn select_null_filters() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT)
        .fetch_fields("name")
        .field("name", vec![Scalar::from("Ongewokkel"), Scalar::Null])
        .field("status:value", Scalar::Null);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(
        &query.sql,
        &[
            "LEFT JOIN status AS product:status ON product:status.id = product.status",
            "WHERE ((product.name IN ($1)) OR (product.name IS NULL))",
            "AND product:status.value IS NULL",
        ],
    );
    assert_eq!(query.params, vec![DataType::Str(Some("Ongewokkel".to_string()))]);
}

#[test]
fn select_by_id_slug_and_bounds() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let after = "2024-01-15T10:30:45Z".parse().unwrap();
    let options = ReadOptions::new(PRODUCT)
        .fetch_fields("name")
        .id(3)
        .slug("ongewokkel")
        .after(after)
        .order_by("name", Direction::Desc)
        .limit(10)
        .offset(20);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(
        &query.sql,
        &[
            "WHERE product.id = $1",
            "AND product.productSlug = $2",
            "AND product.created > $3",
            "ORDER BY product.name DESC",
            "LIMIT $4",
            "OFFSET $5",
        ],
    );
    assert_eq!(query.params.len(), 5);
    assert_eq!(query.params[0], DataType::Int64(Some(3)));
    assert_eq!(query.params[1], DataType::Str(Some("ongewokkel".to_string())));
    assert!(
        matches!(&query.params[2], DataType::Timestamp(Some(s)) if s.starts_with("2024-01-15T10:30:45"))
    );
    assert_eq!(query.params[3], DataType::Uint64(Some(10)));
    assert_eq!(query.params[4], DataType::Uint64(Some(20)));
}

#[test]
fn offset_without_limit() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT).fetch_fields("name").offset(1);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(&query.sql, &["FROM product AS product", "LIMIT $1", "OFFSET $2"]);
    assert_eq!(
        query.params,
        vec![DataType::Uint64(Some(i64::MAX.unsigned_abs())), DataType::Uint64(Some(1))]
    );
}

#[test]
fn select_through_link_table() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT).fetch_fields("name").join("categories", 7);
    let query = reader.build_query(&options).unwrap();

    assert_sql_contains(
        &query.sql,
        &[
            "SELECT product.name AS product:name",
            "INNER JOIN product_categories AS product@categories@link",
            "ON product.id = product@categories@link.product_id",
            "INNER JOIN productCategory AS product@categories",
            "ON (product@categories.id = product@categories@link.productCategory_id)",
            "AND (product@categories.id = $1)",
        ],
    );
    assert_eq!(query.params, vec![DataType::Int64(Some(7))]);
}

#[test]
fn positional_placeholders() {
    let options = ReadOptions::new(PRODUCT).fetch_fields("name").field("name", "x").limit(1);
    let structure = section_query::compile(&shop(), &options).unwrap();

    let mut target = SqlTarget::new(QueryBuilder::new(Placeholder::Positional));
    assemble(&structure, &mut target);
    let query = target.build().unwrap();

    assert_sql_contains(&query.sql, &["WHERE product.name = ?", "LIMIT ?"]);
    assert_eq!(query.params.len(), 2);
}

// Reader tests

#[test]
fn read_flat_and_nested() {
    let registry = shop();
    let executor = MockExecutor::returning(vec![row(&[
        ("product:productSlug", DataType::Str(Some("ongewokkel".to_string()))),
        ("product:prices:price", DataType::Double(Some(2.5))),
        ("product:prices:currency", DataType::Str(None)),
    ])]);
    let reader = SectionReader::new(&registry, &executor);
    let options = ReadOptions::new(PRODUCT).fetch_fields("slug,prices,price,currency");

    let flat = reader.read(&options).unwrap();
    assert_eq!(flat.len(), 1);
    assert_eq!(flat[0]["product:prices:price"], 2.5);
    assert_eq!(flat[0]["product:prices:currency"], serde_json::Value::Null);

    let nested = reader.read_nested(&options).unwrap();
    assert_eq!(
        serde_json::Value::Object(nested[0].clone()),
        json!({
            "product": {
                "productSlug": "ongewokkel",
                "prices": { "price": 2.5, "currency": null }
            }
        })
    );

    let seen = executor.seen();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], seen[1]);
}

#[test]
fn read_no_rows() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let options = ReadOptions::new(PRODUCT)
        .fetch_fields("name,slug")
        .field("name", vec!["Space Frikandel", "Ongewokkel"]);
    let err = reader.read(&options).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(executor.seen().len(), 1);
}

#[test]
fn read_invalid_request_never_executes() {
    let registry = shop();
    let executor = MockExecutor::default();
    let reader = SectionReader::new(&registry, &executor);

    let err = reader.read(&ReadOptions::new(PRODUCT)).unwrap_err();
    assert!(matches!(err, Error::InvalidFetchFieldsQuery(_)));
    assert!(executor.seen().is_empty());
}

#[test]
fn read_uses_section_manager() {
    let registry = shop();
    let shop_rows =
        MockExecutor::returning(vec![row(&[("price:price", DataType::Double(Some(1.0)))])]);
    let fallback = MockExecutor::default();
    let managers = Managers::new().with_default(&fallback).with_manager(["shop::"], &shop_rows);
    let reader = SectionReader::with_managers(&registry, managers);

    let rows = reader.read(&ReadOptions::new(PRICE).fetch_fields("price")).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(shop_rows.seen().len(), 1);
    assert!(fallback.seen().is_empty());

    let unmanaged = SectionReader::with_managers(
        &registry,
        Managers::new().with_manager(["crm::"], &fallback),
    );
    let err = unmanaged.read(&ReadOptions::new(PRICE).fetch_fields("price")).unwrap_err();
    assert!(matches!(err, Error::NoManagerFound(entity) if entity.as_str() == PRICE));
}

// Shaping tests

#[test]
fn output_paths_nest_back_into_trees() {
    let options = ReadOptions::new(PRODUCT).fetch_fields("name,price,value,prices,status");
    let structure = section_query::compile(&shop(), &options).unwrap();

    let flat: serde_json::Map<String, serde_json::Value> =
        structure.output_paths().map(|path| (path.to_string(), json!(path))).collect();
    let nested = make_nested(&flat);

    assert_eq!(
        serde_json::Value::Object(nested),
        json!({
            "product": {
                "name": "product:name",
                "prices": { "price": "product:prices:price" },
                "status": { "value": "product:status:value" }
            }
        })
    );
}

#[test]
fn hierarchy_rows() {
    let rows = vec![
        json!({ "product_name": "Ongewokkel", "product_status_value": "live" }),
        json!({ "product_name": "Space Frikandel" }),
    ];
    let rows: Vec<_> = rows
        .into_iter()
        .filter_map(|row| match row {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })
        .collect();

    let tree = into_hierarchy(&rows);
    assert_eq!(tree.len(), 2);
    assert_eq!(
        serde_json::Value::Object(tree[0].clone()),
        json!({ "product": { "name": "Ongewokkel", "status": { "value": "live" } } })
    );
    assert_eq!(
        serde_json::Value::Object(tree[1].clone()),
        json!({ "product": { "name": "Space Frikandel" } })
    );
}

// Writer tests

#[test]
fn save_entry() {
    let registry = shop();
    let executor = MockExecutor::affecting(1);
    let writer = SectionWriter::new(&registry, &executor);

    let entry = Entry::new(PRODUCT)
        .set("id", 1)
        .set("name", "Ongewokkel")
        .set("productSlug", "ongewokkel")
        .set("status", 2);
    assert_eq!(writer.save(&entry).unwrap(), 1);

    let seen = executor.seen();
    assert_sql_contains(
        &seen[0].sql,
        &[
            "INSERT INTO product (id, name, productSlug, status)",
            "VALUES ($1, $2, $3, $4)",
            "ON CONFLICT (id) DO UPDATE SET",
        ],
    );
    assert_eq!(seen[0].params[3], DataType::Int64(Some(2)));
}

#[test]
fn save_rejects_unknown_columns() {
    let registry = shop();
    let executor = MockExecutor::affecting(1);
    let writer = SectionWriter::new(&registry, &executor);

    let entry = Entry::new(PRODUCT).set("id", 1).set("prices", 4);
    let err = writer.save(&entry).unwrap_err();
    assert!(
        matches!(err, Error::InvalidSection(msg) if msg == "shop::Product has no column prices")
    );

    let err = writer.save(&Entry::new("shop::Missing").set("id", 1)).unwrap_err();
    assert!(matches!(err, Error::InvalidSection(_)));
    assert!(executor.seen().is_empty());
}

#[test]
fn delete_entry() {
    let registry = shop();
    let deleted = MockExecutor::affecting(1);
    let writer = SectionWriter::new(&registry, &deleted);
    assert!(writer.delete(&Entry::new(PRODUCT).set("id", 1)).unwrap());
    assert_sql_contains(&deleted.seen()[0].sql, &["DELETE FROM product WHERE id = $1"]);

    let missing = MockExecutor::affecting(0);
    let writer = SectionWriter::new(&registry, &missing);
    assert!(!writer.delete(&Entry::new(PRODUCT).set("id", 1)).unwrap());

    let err = writer.delete(&Entry::new(PRODUCT).set("name", "Ongewokkel")).unwrap_err();
    assert!(matches!(err, Error::InvalidSection(msg) if msg.contains("has no id value")));
}
