//! # Seed Data Generator
//!
//! Populates the database with a demo restaurant for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./bistro_dev.db
//! cargo run -p bistro-db --bin seed
//!
//! # Specify database path and demo password
//! cargo run -p bistro-db --bin seed -- --db ./data/bistro.db --password secret123
//! ```
//!
//! ## Generated Data
//! - Account `demo` (email `demo@bistro.local`) with profile and settings
//! - Nine menu items across Burgers, Sides, Drinks and Main
//! - Five inventory items, one of them below the low stock threshold
//! - One pending order and one paid invoice

use std::env;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use bistro_core::{AccountScope, LineRequest, Money};
use bistro_db::{Database, DbConfig, NewAccount, NewInventoryItem, NewMenuItem};

const DEMO_USERNAME: &str = "demo";

/// (name, price in cents, category)
const MENU: &[(&str, i64, &str)] = &[
    ("Cheeseburger", 899, "Burgers"),
    ("Chicken Sandwich", 799, "Burgers"),
    ("Caesar Salad", 699, "Sides"),
    ("French Fries", 399, "Sides"),
    ("Onion Rings", 499, "Sides"),
    ("Soda", 199, "Drinks"),
    ("Milkshake", 499, "Drinks"),
    ("Pizza", 1299, "Main"),
    ("Pasta", 1099, "Main"),
];

/// (name, category, quantity, unit)
const INVENTORY: &[(&str, &str, f64, &str)] = &[
    ("Tomatoes", "Vegetables", 50.0, "kg"),
    ("Lettuce", "Vegetables", 30.0, "kg"),
    ("Cheese", "Dairy", 4.0, "kg"),
    ("Chicken Breast", "Meat", 15.0, "kg"),
    ("Buns", "Bread", 80.0, "pcs"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./bistro_dev.db");
    let mut password = String::from("bistro-demo");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--password" | "-p" => {
                if i + 1 < args.len() {
                    password = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bistro Back Office Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>          Database file path (default: ./bistro_dev.db)");
                println!("  -p, --password <SECRET>  Demo account password (default: bistro-demo)");
                println!("  -h, --help               Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bistro Back Office Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.accounts().username_exists(DEMO_USERNAME).await? {
        println!("⚠ Account '{}' already exists", DEMO_USERNAME);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {e}"))?
        .to_string();

    let account = db
        .accounts()
        .register(&NewAccount {
            username: DEMO_USERNAME.to_string(),
            email: "demo@bistro.local".to_string(),
            first_name: "Demo".to_string(),
            last_name: "Owner".to_string(),
            password_hash,
            restaurant_name: Some("Demo Bistro".to_string()),
        })
        .await?;
    let scope = AccountScope::new(account.id);
    println!("✓ Created account '{}' (id {})", account.username, account.id);

    let mut menu_ids = Vec::with_capacity(MENU.len());
    for (name, cents, category) in MENU {
        let item = db
            .menu()
            .insert(
                scope,
                &NewMenuItem {
                    name: name.to_string(),
                    price: Money::from_cents(*cents),
                    category: Some(category.to_string()),
                },
            )
            .await?;
        menu_ids.push(item.id);
    }
    println!("✓ Created {} menu items", menu_ids.len());

    for (name, category, quantity, unit) in INVENTORY {
        db.inventory()
            .insert(
                scope,
                &NewInventoryItem {
                    name: name.to_string(),
                    category: Some(category.to_string()),
                    quantity: *quantity,
                    unit: Some(unit.to_string()),
                },
            )
            .await?;
    }
    println!("✓ Created {} inventory items", INVENTORY.len());

    // Cheeseburger ×2 + French Fries ×1, paid right away.
    let paid = db
        .orders()
        .create(
            scope,
            Some("Alice"),
            &[
                LineRequest {
                    menu_item_id: menu_ids[0],
                    quantity: 2,
                },
                LineRequest {
                    menu_item_id: menu_ids[3],
                    quantity: 1,
                },
            ],
        )
        .await?;
    let invoice = db.orders().pay(scope, paid.id).await?;
    println!(
        "✓ Paid order {} (total {})",
        invoice.order_number,
        invoice.total_amount()
    );

    let pending = db
        .orders()
        .create(
            scope,
            Some("Bob"),
            &[
                LineRequest {
                    menu_item_id: menu_ids[7],
                    quantity: 1,
                },
                LineRequest {
                    menu_item_id: menu_ids[5],
                    quantity: 2,
                },
            ],
        )
        .await?;
    println!(
        "✓ Pending order {} (total {})",
        pending.order_number,
        pending.total()
    );

    let stats = db.reports().dashboard(scope, chrono::Utc::now()).await?;
    println!();
    println!("Dashboard today:");
    println!("  Sales:     {}", stats.total_sales_today);
    println!("  Orders:    {}", stats.total_orders_today);
    println!("  Low stock: {}", stats.low_stock_count);

    println!();
    println!("✓ Seed complete! Log in as '{}'.", DEMO_USERNAME);

    Ok(())
}
