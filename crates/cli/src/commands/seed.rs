//! Seed the database with sample users and catalog products.
//!
//! Idempotent: rows are keyed on their natural unique columns and re-runs
//! leave existing data untouched.

use super::{CommandError, connect};

struct SeedProduct {
    name: &'static str,
    part_number: &'static str,
    price: &'static str,
    discount: &'static str,
    stock_quantity: i32,
    description: &'static str,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Front Brake Pad Set",
        part_number: "BP-2041",
        price: "1499.00",
        discount: "10",
        stock_quantity: 40,
        description: "Ceramic front brake pads, pair",
    },
    SeedProduct {
        name: "Oil Filter",
        part_number: "OF-1102",
        price: "349.00",
        discount: "0",
        stock_quantity: 120,
        description: "Spin-on oil filter",
    },
    SeedProduct {
        name: "Air Filter",
        part_number: "AF-3307",
        price: "599.00",
        discount: "5",
        stock_quantity: 75,
        description: "Panel air filter element",
    },
    SeedProduct {
        name: "Spark Plug (Iridium)",
        part_number: "SP-7718",
        price: "899.00",
        discount: "0",
        stock_quantity: 200,
        description: "Iridium spark plug, single",
    },
    SeedProduct {
        name: "Wiper Blade 22\"",
        part_number: "WB-5522",
        price: "449.00",
        discount: "15",
        stock_quantity: 60,
        description: "Frameless wiper blade, driver side",
    },
];

/// Insert sample users and products.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    tracing::info!("Connecting to storefront database...");
    let pool = connect().await?;

    tracing::info!("Seeding users...");
    for (name, email, role) in [
        ("Store Admin", "admin@sparehub.test", "admin"),
        ("Test Customer", "customer@sparehub.test", "customer"),
    ] {
        sqlx::query(
            r"
            INSERT INTO users (name, email, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(name)
        .bind(email)
        .bind(role)
        .execute(&pool)
        .await?;
    }

    tracing::info!("Seeding products...");
    for product in PRODUCTS {
        sqlx::query(
            r"
            INSERT INTO products (name, part_number, price, discount,
                                  stock_quantity, description)
            VALUES ($1, $2, $3::numeric, $4::numeric, $5, $6)
            ON CONFLICT (part_number) DO NOTHING
            ",
        )
        .bind(product.name)
        .bind(product.part_number)
        .bind(product.price)
        .bind(product.discount)
        .bind(product.stock_quantity)
        .bind(product.description)
        .execute(&pool)
        .await?;
    }

    tracing::info!("Seed complete!");
    Ok(())
}
