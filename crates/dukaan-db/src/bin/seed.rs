//! # Seed Data Generator
//!
//! Populates a development database with an apparel catalog and a few weeks
//! of online orders, so invoices and reports have something to work with.
//!
//! ## Usage
//! ```bash
//! cargo run -p dukaan-db --bin seed
//! cargo run -p dukaan-db --bin seed -- --db ./data/dukaan.db --days 30
//! ```
//!
//! ## Generated Data
//! - Garments with size/colour variants (stock lives on the variants)
//! - Accessories without variants (stock lives on the product)
//! - Online order lines spread over the last `--days` days
//! - A handful of registered customers

use chrono::{Duration, Utc};
use dukaan_core::customer::NewCustomer;
use dukaan_core::{Product, Variant};
use dukaan_db::{Database, DbConfig};
use std::env;
use uuid::Uuid;

/// (item code prefix, name, list price in rupees, offer price in rupees)
const GARMENTS: &[(&str, &str, i64, Option<i64>)] = &[
    ("KUR", "Cotton Kurta", 1_299, Some(999)),
    ("SAR", "Silk Saree", 4_500, None),
    ("SHR", "Linen Shirt", 1_599, Some(1_399)),
    ("LEH", "Festive Lehenga", 8_999, None),
    ("PAL", "Palazzo Pants", 899, Some(749)),
];

const ACCESSORIES: &[(&str, &str, i64)] = &[
    ("DUP", "Chiffon Dupatta", 499),
    ("BAG", "Embroidered Potli Bag", 699),
    ("BNG", "Glass Bangles Set", 249),
];

/// (name, phone, email)
const CUSTOMERS: &[(&str, &str, Option<&str>)] = &[
    ("Asha Verma", "9876543210", Some("asha.verma@example.in")),
    ("Ravi Kumar", "9811122233", None),
    ("Meera Shah", "9899001122", Some("meera@example.in")),
];

const SIZES: &[&str] = &["S", "M", "L", "XL"];
const COLORS: &[&str] = &["Indigo", "Maroon"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./dukaan_dev.db");
    let mut days: i64 = 14;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--days" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(14);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Dukaan Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./dukaan_dev.db)");
                println!("      --days <N>     Days of online orders to generate (default: 14)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Dukaan Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let catalog = db.catalog();
    let existing = catalog.list_products(false).await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut product_ids = Vec::new();
    let mut variants = 0;

    for (seed, (code, name, price, offer)) in GARMENTS.iter().enumerate() {
        let product = product(code, name, *price, *offer, 0, seed);
        catalog.insert_product(&product).await?;

        for (c, color) in COLORS.iter().enumerate() {
            for (s, size) in SIZES.iter().enumerate() {
                let variant = variant(&product.id, color, size, ((seed + c * 3 + s) % 9) as i64);
                catalog.insert_variant(&variant).await?;
                variants += 1;
            }
        }
        product_ids.push(product.id);
    }

    for (seed, (code, name, price)) in ACCESSORIES.iter().enumerate() {
        let product = product(code, name, *price, None, 10 + (seed as i64 * 7), seed + 100);
        catalog.insert_product(&product).await?;
        product_ids.push(product.id);
    }

    println!(
        "✓ Inserted {} products and {} variants",
        product_ids.len(),
        variants
    );

    let orders = db.orders();
    let now = Utc::now();
    let mut lines = 0;

    for day in 0..days.max(0) {
        let order_id = Uuid::new_v4().to_string();
        let at = now - Duration::days(day) - Duration::hours(day % 7);

        for (n, product_id) in product_ids.iter().enumerate() {
            if (day as usize + n) % 3 != 0 {
                continue;
            }
            let quantity = 1 + ((day as usize + n) % 3) as i64;
            let id = Uuid::new_v4().to_string();
            orders
                .insert_item(&id, &order_id, product_id, quantity, at)
                .await?;
            lines += 1;
        }
    }

    println!("✓ Inserted {} online order lines over {} days", lines, days);

    let customers = db.customers();
    for (name, phone, email) in CUSTOMERS {
        let form = NewCustomer {
            name: name.to_string(),
            phone: Some(phone.to_string()),
            email: email.map(str::to_string),
            address: None,
        };
        let id = Uuid::new_v4().to_string();
        let customer = form.into_customer(id, Utc::now())?;
        customers.insert(&customer).await?;
    }
    println!("✓ Inserted {} customers", CUSTOMERS.len());
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn product(
    code: &str,
    name: &str,
    price_rupees: i64,
    offer_rupees: Option<i64>,
    stock: i64,
    seed: usize,
) -> Product {
    let now = Utc::now();

    Product {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        item_code: Some(format!("{}-{:03}", code, seed + 1)),
        price_paise: price_rupees * 100,
        offer_price_paise: offer_rupees.map(|r| r * 100),
        stock_quantity: stock,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn variant(product_id: &str, color: &str, size: &str, stock: i64) -> Variant {
    let now = Utc::now();

    Variant {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        color: Some(color.to_string()),
        size: Some(size.to_string()),
        price_paise: None,
        stock_quantity: stock,
        created_at: now,
        updated_at: now,
    }
}
