use sqlx::PgPool;
use uuid::Uuid;

use crate::repositories::user_repository::{self, UserError};

/// Seed the database with starter categories and accounts.
///
/// Idempotent: categories are looked up by name before insertion and
/// duplicate users are skipped.
pub async fn seed_database(pool: &PgPool) -> Result<(), anyhow::Error> {
    println!("[Seeder] Seeding categories...");

    for name in ["Electronics", "Furniture", "Services"] {
        let existing: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await?;

        match existing {
            Some(id) => println!("  - '{}' already present (ID: {})", name, id),
            None => {
                let category = crate::repositories::category_repository::create_category(pool, name)
                    .await?;
                println!("  - Created '{}' (ID: {})", name, category.id);
            }
        }
    }

    println!("[Seeder] Seeding accounts...");

    match user_repository::create_superuser(pool, "admin", "admin@bulletin.local", "admin").await {
        Ok(user) => println!("  - Created staff account 'admin' (ID: {})", user.id),
        Err(UserError::DuplicateUsername) | Err(UserError::DuplicateEmail) => {
            println!("  - Staff account 'admin' already present")
        }
        Err(e) => return Err(e.into()),
    }

    match user_repository::create_user(pool, "demo", "demo@bulletin.local", Some("demo")).await {
        Ok(user) => {
            let token = user_repository::create_api_token(pool, user.id).await?;
            println!("  - Created account 'demo' (ID: {}, token: {})", user.id, token.token);
        }
        Err(UserError::DuplicateUsername) | Err(UserError::DuplicateEmail) => {
            println!("  - Account 'demo' already present")
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
