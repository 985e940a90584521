use rust_decimal::Decimal;
use serde_json::json;
use storefront_platform::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    domain::slug::slugify,
};
use uuid::Uuid;

const DEMO_SUBDOMAIN: &str = "demo";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let tenant_id = ensure_tenant(&pool, "Demo Store", DEMO_SUBDOMAIN).await?;
    let apparel = ensure_category(&pool, tenant_id, "Apparel", 1).await?;
    let drinkware = ensure_category(&pool, tenant_id, "Drinkware", 2).await?;
    let brand = ensure_brand(&pool, tenant_id, "Ferris & Co").await?;
    seed_products(&pool, tenant_id, apparel, drinkware, brand).await?;

    println!(
        "Seed completed. Tenant {tenant_id} at {DEMO_SUBDOMAIN}.{}",
        config.platform_domain
    );
    Ok(())
}

async fn ensure_tenant(pool: &sqlx::PgPool, name: &str, subdomain: &str) -> anyhow::Result<Uuid> {
    let settings = json!({
        "currency": "USD",
        "locale": "en",
        "low_stock_threshold": 5,
        "shipping_methods": [
            {
                "id": "standard",
                "name": "Standard",
                "type": "weight_based",
                "base_rate": 4.99,
                "per_kg_rate": 1.5,
                "max_weight": 30
            },
            {
                "id": "flat",
                "name": "Flat rate",
                "type": "flat_rate",
                "base_rate": 9.99,
                "countries": ["US", "CA"]
            },
            {
                "id": "free",
                "name": "Free shipping",
                "type": "free",
                "free_threshold": 75
            }
        ]
    });

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO tenants (id, name, subdomain, settings)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (subdomain) DO UPDATE SET settings = EXCLUDED.settings
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(subdomain)
    .bind(settings)
    .fetch_one(pool)
    .await?;

    println!("Ensured tenant {subdomain}");
    Ok(row.0)
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
    name: &str,
    sort_order: i32,
) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, tenant_id, name, slug, sort_order)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (tenant_id, slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(name)
    .bind(slugify(name))
    .bind(sort_order)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

async fn ensure_brand(pool: &sqlx::PgPool, tenant_id: Uuid, name: &str) -> anyhow::Result<Uuid> {
    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO brands (id, tenant_id, name, slug)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (tenant_id, slug) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(name)
    .bind(slugify(name))
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

async fn seed_products(
    pool: &sqlx::PgPool,
    tenant_id: Uuid,
    apparel: Uuid,
    drinkware: Uuid,
    brand: Uuid,
) -> anyhow::Result<()> {
    let simple = vec![
        ("Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2), 100, drinkware),
        ("Sticker Pack", "Decorate your laptop", Decimal::new(500, 2), 3, apparel),
    ];

    for (title, description, price, stock, category) in simple {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, tenant_id, category_id, brand_id, title, slug, description,
                 product_type, price, inventory_quantity)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'single', $8, $9)
            ON CONFLICT (tenant_id, slug) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(category)
        .bind(brand)
        .bind(title)
        .bind(slugify(title))
        .bind(description)
        .bind(price)
        .bind(stock as i64)
        .execute(pool)
        .await?;
    }

    let hoodie: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO products
            (id, tenant_id, category_id, brand_id, title, slug, description,
             product_type, price, inventory_quantity, is_featured)
        VALUES ($1, $2, $3, $4, 'Crab Hoodie', 'crab-hoodie', 'Warm hoodie for Rustaceans',
                'variable', $5, 0, TRUE)
        ON CONFLICT (tenant_id, slug) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(apparel)
    .bind(brand)
    .bind(Decimal::new(5500, 2))
    .fetch_optional(pool)
    .await?;

    // variants only on first insert
    if let Some((product_id,)) = hoodie {
        for (size, stock) in [("S", 4_i64), ("M", 12), ("L", 0)] {
            sqlx::query(
                r#"
                INSERT INTO product_variants
                    (id, product_id, tenant_id, title, sku, price, inventory_quantity, options)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(tenant_id)
            .bind(format!("Size {size}"))
            .bind(format!("HOODIE-{size}"))
            .bind(Decimal::new(5500, 2))
            .bind(stock)
            .bind(json!({ "size": size }))
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}
