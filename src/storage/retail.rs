//! Retail point-of-sale schema.
//!
//! The table set the server binary bootstraps its store with, plus a small
//! demo catalogue. Extension tables (`employees`, `payroll`, `expenses`,
//! `stock_adjustments`) are optional: a store created from
//! [`core_schema`] alone is still a valid backup source and target.

use super::{InMemoryStore, TableSchema};
use crate::core::{Column, DataType, Result, Value};

fn created_at() -> Column {
    Column::new("created_at", DataType::Timestamp)
}

/// Core tables every deployment has.
pub fn core_schema() -> Vec<TableSchema> {
    vec![
        TableSchema::new(
            "users",
            vec![
                Column::id("id"),
                Column::new("username", DataType::Text).not_null().unique(),
                Column::new("password_hash", DataType::Text),
                Column::new("role", DataType::Text).default_value("cashier"),
                Column::new("is_active", DataType::Boolean).default_value(true),
                created_at(),
            ],
        ),
        TableSchema::new(
            "settings",
            vec![
                Column::id("id"),
                Column::new("key", DataType::Text).not_null().unique(),
                Column::new("value", DataType::Text),
                Column::new("updated_at", DataType::Timestamp),
            ],
        ),
        TableSchema::new(
            "categories",
            vec![
                Column::id("id"),
                Column::new("name", DataType::Text).not_null(),
                Column::new("description", DataType::Text),
                created_at(),
            ],
        ),
        TableSchema::new(
            "suppliers",
            vec![
                Column::id("id"),
                Column::new("name", DataType::Text).not_null(),
                Column::new("phone", DataType::Text),
                Column::new("email", DataType::Text),
                Column::new("address", DataType::Text),
                created_at(),
            ],
        ),
        TableSchema::new(
            "customers",
            vec![
                Column::id("id"),
                Column::new("name", DataType::Text).not_null(),
                Column::new("phone", DataType::Text),
                Column::new("email", DataType::Text),
                Column::new("loyalty_points", DataType::Integer).default_value(0i64),
                created_at(),
            ],
        ),
        TableSchema::new(
            "products",
            vec![
                Column::id("id"),
                Column::new("name", DataType::Text).not_null(),
                Column::new("sku", DataType::Text).unique(),
                Column::new("category_id", DataType::Integer).references("categories", "id"),
                Column::new("supplier_id", DataType::Integer).references("suppliers", "id"),
                Column::new("price", DataType::Float).not_null().default_value(0.0),
                Column::new("cost", DataType::Float).default_value(0.0),
                Column::new("stock", DataType::Integer).default_value(0i64),
                Column::new("is_active", DataType::Boolean).default_value(true),
                created_at(),
            ],
        ),
        TableSchema::new(
            "sales",
            vec![
                Column::id("id"),
                Column::new("customer_id", DataType::Integer).references("customers", "id"),
                Column::new("user_id", DataType::Integer).references("users", "id"),
                Column::new("total", DataType::Float).not_null().default_value(0.0),
                Column::new("tax", DataType::Float).default_value(0.0),
                Column::new("payment_method", DataType::Text).default_value("cash"),
                created_at(),
            ],
        ),
        TableSchema::new(
            "sale_items",
            vec![
                Column::id("id"),
                Column::new("sale_id", DataType::Integer).not_null().references("sales", "id"),
                Column::new("product_id", DataType::Integer).references("products", "id"),
                Column::new("quantity", DataType::Integer).not_null(),
                Column::new("unit_price", DataType::Float).not_null(),
                Column::new("subtotal", DataType::Float),
            ],
        ),
        TableSchema::new(
            "purchases",
            vec![
                Column::id("id"),
                Column::new("supplier_id", DataType::Integer).references("suppliers", "id"),
                Column::new("user_id", DataType::Integer).references("users", "id"),
                Column::new("total", DataType::Float).not_null().default_value(0.0),
                created_at(),
            ],
        ),
        TableSchema::new(
            "purchase_items",
            vec![
                Column::id("id"),
                Column::new("purchase_id", DataType::Integer).not_null().references("purchases", "id"),
                Column::new("product_id", DataType::Integer).references("products", "id"),
                Column::new("quantity", DataType::Integer).not_null(),
                Column::new("unit_cost", DataType::Float).not_null(),
                Column::new("subtotal", DataType::Float),
            ],
        ),
    ]
}

/// Optional tables added by later releases.
pub fn extension_schema() -> Vec<TableSchema> {
    vec![
        TableSchema::new(
            "employees",
            vec![
                Column::id("id"),
                Column::new("name", DataType::Text).not_null(),
                Column::new("position", DataType::Text),
                Column::new("salary", DataType::Float).default_value(0.0),
                Column::new("is_active", DataType::Boolean).default_value(true),
                Column::new("hired_at", DataType::Timestamp),
            ],
        ),
        TableSchema::new(
            "expenses",
            vec![
                Column::id("id"),
                Column::new("description", DataType::Text).not_null(),
                Column::new("amount", DataType::Float).not_null().default_value(0.0),
                Column::new("category", DataType::Text),
                Column::new("incurred_at", DataType::Timestamp),
            ],
        ),
        TableSchema::new(
            "payroll",
            vec![
                Column::id("id"),
                Column::new("employee_id", DataType::Integer).not_null().references("employees", "id"),
                Column::new("gross", DataType::Float).default_value(0.0),
                Column::new("deductions", DataType::Float).default_value(0.0),
                Column::new("net", DataType::Float).default_value(0.0),
                Column::new("paid_at", DataType::Timestamp),
            ],
        ),
        TableSchema::new(
            "stock_adjustments",
            vec![
                Column::id("id"),
                Column::new("product_id", DataType::Integer).not_null().references("products", "id"),
                Column::new("delta", DataType::Integer).not_null(),
                Column::new("reason", DataType::Text),
                created_at(),
            ],
        ),
    ]
}

/// Core plus extension tables.
pub fn full_schema() -> Vec<TableSchema> {
    let mut schema = core_schema();
    schema.extend(extension_schema());
    schema
}

/// Seed the configuration rows a configured install carries.
pub async fn seed_settings(store: &InMemoryStore) -> Result<()> {
    for (key, value) in [
        ("setup_completed", "true"),
        ("business_name", "Corner Shop"),
        ("currency", "USD"),
        ("receipt_footer", "Thank you!"),
    ] {
        store
            .insert_row("settings", vec![("key", key.into()), ("value", value.into())])
            .await?;
    }
    Ok(())
}

/// Seed a small shop: 3 categories, 5 products and 2 sales with 2 line
/// items each.
pub async fn seed_demo(store: &InMemoryStore) -> Result<()> {
    for name in ["Drinks", "Snacks", "Bakery"] {
        store.insert_row("categories", vec![("name", name.into())]).await?;
    }

    let products: [(&str, &str, i64, f64); 5] = [
        ("Green Tea", "DR-001", 1, 2.5),
        ("Cola", "DR-002", 1, 1.75),
        ("Crisps", "SN-001", 2, 1.2),
        ("Peanuts", "SN-002", 2, 0.9),
        ("Sourdough", "BK-001", 3, 4.0),
    ];
    for (name, sku, category_id, price) in products {
        store
            .insert_row(
                "products",
                vec![
                    ("name", name.into()),
                    ("sku", sku.into()),
                    ("category_id", category_id.into()),
                    ("price", price.into()),
                    ("stock", 20i64.into()),
                ],
            )
            .await?;
    }

    let sales: [[(i64, i64, f64); 2]; 2] = [
        [(1, 2, 2.5), (3, 1, 1.2)],
        [(2, 3, 1.75), (5, 1, 4.0)],
    ];
    for items in sales {
        let total: f64 = items.iter().map(|(_, qty, price)| *qty as f64 * price).sum();
        let sale = store
            .insert_row(
                "sales",
                vec![
                    ("total", total.into()),
                    ("payment_method", "card".into()),
                    ("created_at", Value::Timestamp(chrono::Utc::now())),
                ],
            )
            .await?;
        for (product_id, quantity, unit_price) in items {
            store
                .insert_row(
                    "sale_items",
                    vec![
                        ("sale_id", sale[0].clone()),
                        ("product_id", product_id.into()),
                        ("quantity", quantity.into()),
                        ("unit_price", unit_price.into()),
                        ("subtotal", (quantity as f64 * unit_price).into()),
                    ],
                )
                .await?;
        }
    }

    Ok(())
}
