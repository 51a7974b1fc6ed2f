// ==================== PERKS CRUD ====================
// Operações de store para a collection "perks". Validação sempre
// acontece antes de qualquer escrita (validate-before-write).

use crate::database::{MongoDB, PERKS_COLLECTION};
use crate::models::{CreatedBy, Perk, PerkResponse, PublicPerk};
use crate::services::creator_service;
use crate::utils::error::AppError;
use crate::utils::validation;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};
use serde_json::Value;

/// Escapa metacaracteres de regex para usar input do cliente em `$regex`
pub fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(
            c,
            '\\' | '.' | '^' | '$' | '|' | '?' | '*' | '+' | '(' | ')' | '[' | ']' | '{' | '}'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// createdBy pode estar gravado como ObjectId ou como string; quando o id
// do caller tem forma de ObjectId a query cobre as duas representações.
fn owner_filter(user_id: &str) -> Document {
    match ObjectId::parse_str(user_id) {
        Ok(oid) => doc! {
            "createdBy": { "$in": [Bson::ObjectId(oid), Bson::String(user_id.to_string())] }
        },
        Err(_) => doc! { "createdBy": user_id },
    }
}

fn parse_perk_id(id: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id).map_err(|_| AppError::validation("Invalid perk ID"))
}

async fn collect_perks(
    db: &MongoDB,
    filter: Document,
) -> Result<Vec<Perk>, AppError> {
    let collection = db.collection::<Perk>(PERKS_COLLECTION);

    let mut cursor = collection
        .find(filter)
        .sort(doc! { "createdAt": -1 })
        .await
        .map_err(AppError::from)?;

    let mut perks = Vec::new();
    while let Some(result) = cursor.next().await {
        match result {
            Ok(perk) => perks.push(perk),
            Err(e) => log::error!("❌ Skipping undecodable perk document: {}", e),
        }
    }
    Ok(perks)
}

/// GET /perks?title= - match exato no título, mais recentes primeiro
pub async fn filter_by_title(db: &MongoDB, title: &str) -> Result<Vec<PerkResponse>, AppError> {
    let perks = collect_perks(db, doc! { "title": title }).await?;
    Ok(perks.into_iter().map(PerkResponse::from).collect())
}

/// GET /perks - perks do caller autenticado, projeção plana
pub async fn list_owned(db: &MongoDB, user_id: &str) -> Result<Vec<PerkResponse>, AppError> {
    let perks = collect_perks(db, owner_filter(user_id)).await?;
    Ok(perks.into_iter().map(PerkResponse::from).collect())
}

/// GET /perks/public - busca/filtra e resolve criadores
pub async fn public_list(
    db: &MongoDB,
    search: Option<&str>,
    merchant: Option<&str>,
) -> Result<Vec<PublicPerk>, AppError> {
    let mut filter = doc! {};

    if let Some(search) = search {
        let search = search.trim();
        if !search.is_empty() {
            // substring case-insensitive no título
            filter.insert(
                "title",
                doc! { "$regex": escape_regex(search), "$options": "i" },
            );
        }
    }

    if let Some(merchant) = merchant {
        let merchant = merchant.trim();
        if !merchant.is_empty() {
            filter.insert("merchant", merchant);
        }
    }

    let perks = collect_perks(db, filter).await?;
    creator_service::resolve_creators(db, perks).await
}

/// GET /perks/{id}
pub async fn get_by_id(db: &MongoDB, id: &str) -> Result<PerkResponse, AppError> {
    let object_id = parse_perk_id(id)?;
    let collection = db.collection::<Perk>(PERKS_COLLECTION);

    let perk = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Perk not found".to_string()))?;

    Ok(PerkResponse::from(perk))
}

/// POST /perks - valida (fail-fast) e insere com o dono forçado ao caller
pub async fn create_perk(
    db: &MongoDB,
    user_id: &str,
    payload: &Value,
) -> Result<PerkResponse, AppError> {
    let fields = validation::validate_create(payload)?;

    let perk = Perk {
        id: None,
        title: fields.title,
        description: fields.description,
        category: fields.category,
        discount_percent: fields.discount_percent,
        merchant: fields.merchant,
        created_by: Some(CreatedBy::from_key(user_id)),
        created_at: DateTime::now(),
    };

    let collection = db.collection::<Perk>(PERKS_COLLECTION);
    let result = collection.insert_one(&perk).await.map_err(AppError::from)?;

    let inserted_id = result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Database("Insert did not return an ObjectId".to_string()))?;

    let mut created = perk;
    created.id = Some(inserted_id);

    Ok(PerkResponse::from(created))
}

/// PATCH|PUT /perks/{id} - load, merge, valida (collect-all) e aplica $set.
/// Sem transação: se o documento sumir entre o load e o update, 404.
pub async fn update_perk(db: &MongoDB, id: &str, payload: &Value) -> Result<PerkResponse, AppError> {
    let object_id = parse_perk_id(id)?;
    let collection = db.collection::<Perk>(PERKS_COLLECTION);

    let existing = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Perk not found".to_string()))?;

    let fields = validation::validate_update(&existing, payload)?;

    collection
        .update_one(
            doc! { "_id": object_id },
            doc! { "$set": fields.to_update_doc() },
        )
        .await
        .map_err(AppError::from)?;

    let updated = collection
        .find_one(doc! { "_id": object_id })
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound("Perk not found".to_string()))?;

    Ok(PerkResponse::from(updated))
}

/// DELETE /perks/{id} - idempotente em efeito: segunda chamada também 404
pub async fn delete_perk(db: &MongoDB, id: &str) -> Result<(), AppError> {
    let object_id = parse_perk_id(id)?;
    let collection = db.collection::<Perk>(PERKS_COLLECTION);

    let result = collection
        .delete_one(doc! { "_id": object_id })
        .await
        .map_err(AppError::from)?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Perk not found".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_escape_regex_neutralizes_metacharacters() {
        assert_eq!(escape_regex("Coffee Club"), "Coffee Club");
        assert_eq!(escape_regex("50% (off)"), "50% \\(off\\)");
        assert_eq!(escape_regex(".*"), "\\.\\*");
    }

    #[test]
    fn test_owner_filter_covers_both_representations() {
        let oid = ObjectId::new();
        let filter = owner_filter(&oid.to_hex());
        let in_list = filter
            .get_document("createdBy")
            .unwrap()
            .get_array("$in")
            .unwrap();
        assert_eq!(in_list.len(), 2);

        let legacy = owner_filter("jane@corp.com");
        assert_eq!(legacy.get_str("createdBy").unwrap(), "jane@corp.com");
    }

    #[test]
    fn test_parse_perk_id_maps_to_validation_error() {
        assert!(matches!(
            parse_perk_id("nope"),
            Err(AppError::Validation(_))
        ));
        assert!(parse_perk_id(&ObjectId::new().to_hex()).is_ok());
    }

    // ==================== INTEGRATION (MongoDB) ====================

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/PerksServiceTest".to_string());
        MongoDB::new(&uri).await.expect("MongoDB must be running")
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_create_then_duplicate_conflicts() {
        let db = test_db().await;
        let owner = ObjectId::new().to_hex();
        let payload = json!({
            "title": format!("Integration Perk {}", ObjectId::new().to_hex()),
            "merchant": "Acme",
            "category": "food",
            "discountPercent": 10
        });

        let first = create_perk(&db, &owner, &payload).await.unwrap();
        assert_eq!(first.created_by.as_deref(), Some(owner.as_str()));

        let second = create_perk(&db, &owner, &payload).await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        delete_perk(&db, &first.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_partial_update_preserves_other_fields() {
        let db = test_db().await;
        let owner = ObjectId::new().to_hex();
        let payload = json!({
            "title": format!("Update Perk {}", ObjectId::new().to_hex()),
            "description": "before",
            "category": "tech",
            "discountPercent": 5
        });

        let created = create_perk(&db, &owner, &payload).await.unwrap();
        let updated = update_perk(&db, &created.id, &json!({ "discountPercent": 50 }))
            .await
            .unwrap();

        assert_eq!(updated.discount_percent, 50.0);
        assert_eq!(updated.description, "before");
        assert_eq!(updated.title, created.title);

        delete_perk(&db, &created.id).await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_delete_twice_returns_not_found() {
        let db = test_db().await;
        let owner = ObjectId::new().to_hex();
        let payload = json!({
            "title": format!("Delete Perk {}", ObjectId::new().to_hex())
        });

        let created = create_perk(&db, &owner, &payload).await.unwrap();
        delete_perk(&db, &created.id).await.unwrap();

        let again = delete_perk(&db, &created.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
