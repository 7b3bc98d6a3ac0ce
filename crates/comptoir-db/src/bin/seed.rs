//! # Seed Data Generator
//!
//! Populates a development database with carriers and catalog products.
//!
//! ## Usage
//! ```bash
//! # Seed ./comptoir_dev.db with the default catalog
//! cargo run -p comptoir-db --bin seed
//!
//! # Generate more product variants
//! cargo run -p comptoir-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p comptoir-db --bin seed -- --db ./data/comptoir.db
//! ```
//!
//! ## Generated Data
//! - The four shipping carriers offered at checkout
//! - Products across families (wine, cheese, grocery, tableware), each in
//!   several formats, with prices between €3.50 and €60 and stock 0 - 40

use anyhow::Context;
use comptoir_core::{Carrier, Product};
use comptoir_db::{Database, DbConfig};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, price in cents, delivery estimate, position)
const CARRIERS: &[(&str, i64, &str, i64)] = &[
    ("Colissimo", 690, "48h", 1),
    ("Chronopost", 1290, "24h", 2),
    ("Mondial Relay", 490, "3 à 5 jours", 3),
    ("La Poste Lettre suivie", 350, "3 à 4 jours", 4),
];

/// Product families: (slug prefix, names, base price in cents)
const FAMILIES: &[(&str, &[&str], i64)] = &[
    (
        "vin",
        &[
            "Bordeaux Supérieur",
            "Côtes du Rhône",
            "Chablis",
            "Muscadet",
            "Saint-Émilion",
            "Crémant de Loire",
        ],
        950,
    ),
    (
        "fromage",
        &["Comté 18 mois", "Roquefort", "Tomme de Savoie", "Brie de Meaux", "Ossau-Iraty"],
        650,
    ),
    (
        "epicerie",
        &["Miel de lavande", "Huile d'olive", "Confiture de figues", "Fleur de sel", "Moutarde à l'ancienne"],
        350,
    ),
    (
        "table",
        &["Mug en grès", "Planche à fromage", "Couteau Laguiole", "Carafe à vin"],
        1200,
    ),
];

/// Format variants: (suffix, price multiplier in percent)
const FORMATS: &[(&str, i64)] = &[("", 100), ("Coffret", 240), ("Grand format", 180)];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./comptoir_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Comptoir Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./comptoir_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    info!(path = %db_path, "Connected, migrations applied");

    if db.carriers().list_active().await?.is_empty() {
        for (name, price_cents, delay, position) in CARRIERS {
            let mut carrier = Carrier::new(*name, *price_cents, *position);
            carrier.delivery_time = Some(delay.to_string());
            db.carriers().insert(&carrier).await?;
        }
        info!(count = CARRIERS.len(), "Seeded carriers");
    } else {
        info!("Carriers already present, skipping");
    }

    let existing = db.products().count_active().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping to avoid duplicates");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut generated = 0;

    'outer: for (family_idx, (prefix, names, base_price)) in FAMILIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (format_idx, (format, pct)) in FORMATS.iter().enumerate() {
                if generated >= count {
                    break 'outer;
                }

                let seed = family_idx * 100 + name_idx * 10 + format_idx;
                let product = generate_product(prefix, name, format, base_price * pct / 100, seed);

                if let Err(e) = db.products().insert(&product).await {
                    warn!(slug = %product.slug, error = %e, "Failed to insert product");
                    continue;
                }
                generated += 1;
            }
        }
    }

    info!(generated, elapsed = ?start.elapsed(), "Seed complete");
    db.close().await;

    Ok(())
}

/// Generates one catalog product with stable pseudo-random price and stock.
fn generate_product(prefix: &str, name: &str, format: &str, base_price: i64, seed: usize) -> Product {
    let full_name = if format.is_empty() {
        name.to_string()
    } else {
        format!("{name} - {format}")
    };

    let slug = format!("{prefix}-{}", slugify(&full_name));

    // Round to the nearest 10 cents, then add a little spread.
    let price_cents = (base_price + ((seed * 37) % 900) as i64) / 10 * 10;
    let stock = (seed % 41) as i64;

    let mut product = Product::new(slug, full_name, price_cents, stock);
    product.description = Some(format!("Sélection {prefix}, référence {seed:03}"));
    product
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        let c = match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' | 'É' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
