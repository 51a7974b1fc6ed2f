use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const PERKS_COLLECTION: &str = "perks";
pub const USERS_COLLECTION: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Connection pool otimizado
        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .unwrap_or("PerksService");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for query performance and uniqueness
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let perks = self
            .database()
            .collection::<mongodb::bson::Document>(PERKS_COLLECTION);

        // Chave de negócio: (title, merchant) única. Violações viram 409.
        let unique_perk_index = IndexModel::builder()
            .keys(doc! { "title": 1, "merchant": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match perks.create_index(unique_perk_index).await {
            Ok(_) => log::info!("   ✅ Index created: perks(title, merchant) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index for perks: (createdBy) - listagem por dono
        let owner_index = IndexModel::builder()
            .keys(doc! { "createdBy": 1 })
            .build();

        match perks.create_index(owner_index).await {
            Ok(_) => log::info!("   ✅ Index created: perks(createdBy)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index for perks: (createdAt desc) - ordenação padrão
        let created_at_index = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .build();

        match perks.create_index(created_at_index).await {
            Ok(_) => log::info!("   ✅ Index created: perks(createdAt)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index for users: (email) - resolução de criador por email
        let users = self
            .database()
            .collection::<mongodb::bson::Document>(USERS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_connection_and_indexes() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/PerksServiceTest".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
    }
}
