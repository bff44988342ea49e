use bookstore_marketplace_api::{
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    domain::{BookCondition, Role},
    services::{auth_service::hash_password, upgrade_service::default_shop_name},
};
use sea_orm::ActiveEnum;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&orm_from_pool(&pool)).await?;

    let admin_id = ensure_user(&pool, "admin@example.com", "Admin", "admin1234", Role::Admin).await?;
    let buyer_id = ensure_user(&pool, "buyer@example.com", "Bea", "buyer1234", Role::Buyer).await?;
    let seller_id =
        ensure_user(&pool, "seller@example.com", "Sam", "seller1234", Role::Seller).await?;
    let courier_id =
        ensure_user(&pool, "courier@example.com", "Cody", "courier1234", Role::Courier).await?;

    let shop_id = ensure_shop(&pool, seller_id, "Sam").await?;
    seed_listings(&pool, shop_id).await?;

    println!(
        "Seed completed. Admin: {admin_id}, buyer: {buyer_id}, seller: {seller_id}, courier: {courier_id}, shop: {shop_id}"
    );
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, name, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_shop(pool: &sqlx::PgPool, owner_id: Uuid, owner_name: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shops WHERE user_id = $1")
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let (id,): (Uuid,) =
        sqlx::query_as("INSERT INTO shops (id, user_id, name) VALUES ($1, $2, $3) RETURNING id")
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(default_shop_name(owner_name))
            .fetch_one(pool)
            .await?;
    Ok(id)
}

async fn seed_listings(pool: &sqlx::PgPool, shop_id: Uuid) -> anyhow::Result<()> {
    let listings = [
        ("The Left Hand of Darkness", "Ursula K. Le Guin", BookCondition::LikeNew, 1000),
        ("Piranesi", "Susanna Clarke", BookCondition::BrandNew, 1450),
        ("Dune", "Frank Herbert", BookCondition::WellUsed, 500),
        ("The Name of the Rose", "Umberto Eco", BookCondition::Used, 850),
        ("Moby-Dick", "Herman Melville", BookCondition::Tattered, 300),
    ];

    for (title, author, condition, price) in listings {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM book_listings WHERE shop_id = $1 AND title = $2")
                .bind(shop_id)
                .bind(title)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            r#"
            INSERT INTO book_listings (id, shop_id, title, author, condition, price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(shop_id)
        .bind(title)
        .bind(author)
        .bind(condition.to_value())
        .bind(price as i64)
        .execute(pool)
        .await?;
    }

    println!("Seeded listings for shop {shop_id}");
    Ok(())
}
