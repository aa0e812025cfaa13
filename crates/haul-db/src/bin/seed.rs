//! # Seed Data Generator
//!
//! Loads the demo moving-supply catalog.
//!
//! ## Usage
//! ```bash
//! cargo run -p haul-db --bin seed
//! cargo run -p haul-db --bin seed -- --db ./data/greenhaul.db
//! ```
//!
//! ## Catalog
//! Leaf supplies (boxes, dollies, tape, blankets, wardrobe boxes) and three
//! bundles built from them. Ids are fixed so storefront fixtures can refer
//! to them.

use std::env;

use haul_core::BundleComponent;
use haul_db::{Database, DbConfig, NewProduct};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// `(id, name, weekly price in centavos, owned units)`
const SUPPLIES: &[(i64, &str, i64, i64)] = &[
    (1, "Caja reutilizable mediana", 2_500, 120),
    (2, "Caja reutilizable grande", 3_500, 80),
    (3, "Diablito de carga", 9_000, 6),
    (4, "Cinta biodegradable", 1_200, 60),
    (5, "Cobija protectora", 1_800, 40),
    (6, "Caja ropero", 6_500, 15),
];

/// `(id, name, price, [(component id, qty per kit)])`
const BUNDLES: &[(i64, &str, i64, &[(i64, i64)])] = &[
    (100, "Kit Depa", 45_000, &[(1, 10), (2, 5), (4, 2)]),
    (101, "Kit Casa", 89_000, &[(1, 20), (2, 10), (3, 1), (4, 4), (5, 6)]),
    (102, "Kit Oficina", 65_000, &[(2, 15), (3, 1), (4, 3)]),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,haul=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./greenhaul_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("GreenHaul Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./greenhaul_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(path = %db_path, "Seeding demo catalog");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let products = db.products();

    let existing = products.count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    for (id, name, price_cents, stock) in SUPPLIES {
        products
            .insert(&NewProduct::standalone(*id, *name, *price_cents, *stock))
            .await?;
    }

    for (id, name, price_cents, components) in BUNDLES {
        products.insert(&NewProduct::bundle(*id, *name, *price_cents)).await?;
        let components: Vec<BundleComponent> = components
            .iter()
            .map(|(component_id, qty)| BundleComponent::new(*component_id, *qty))
            .collect();
        products.set_composition(*id, &components).await?;
    }

    // Round-trip through the loader so a bad composition fails here.
    let catalog = products.load_catalog().await?;
    let bundles = BUNDLES.iter().filter(|(id, ..)| catalog.is_bundle(*id)).count();

    info!(
        supplies = SUPPLIES.len(),
        bundles,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
