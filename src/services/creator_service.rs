// ==================== CREATOR RESOLUTION ====================
// O campo createdBy de perks antigos pode conter uma string livre (nome
// ou email) em vez de um ObjectId. O populate nativo do driver falharia
// nesses documentos, então a resolução é feita à mão e é total: todo
// perk sai com um criador resolvido ou com `null`, nunca com a string
// crua nem com erro.

use crate::database::{MongoDB, USERS_COLLECTION};
use crate::models::{CreatedBy, CreatorInfo, Perk, PublicPerk, User};
use crate::services::perk_service::escape_regex;
use crate::utils::error::AppError;
use futures::stream::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use std::collections::{HashMap, HashSet};

/// Separa os createdBy não-vazios do result set em ObjectIds válidos e
/// chaves legadas de texto livre, sem duplicatas.
fn partition_creators(perks: &[Perk]) -> (Vec<ObjectId>, Vec<String>) {
    let mut ids = HashSet::new();
    let mut legacy_keys = HashSet::new();

    for perk in perks {
        match &perk.created_by {
            Some(CreatedBy::Id(oid)) => {
                ids.insert(*oid);
            }
            Some(CreatedBy::LegacyKey(key)) => {
                if !key.trim().is_empty() {
                    legacy_keys.insert(key.clone());
                }
            }
            None => {}
        }
    }

    (ids.into_iter().collect(), legacy_keys.into_iter().collect())
}

fn hydrate(
    perk: Perk,
    by_id: &HashMap<ObjectId, CreatorInfo>,
    by_key: &HashMap<String, CreatorInfo>,
) -> PublicPerk {
    let creator = match &perk.created_by {
        Some(CreatedBy::Id(oid)) => by_id.get(oid).cloned(),
        Some(CreatedBy::LegacyKey(key)) => by_key
            .get(key)
            .or_else(|| by_key.get(&key.to_lowercase()))
            .cloned(),
        None => None,
    };
    PublicPerk::from_perk(perk, creator)
}

/// Substitui createdBy pelo registro {name, email} do usuário quando
/// encontrado; chaves sem match viram `null`.
pub async fn resolve_creators(db: &MongoDB, perks: Vec<Perk>) -> Result<Vec<PublicPerk>, AppError> {
    let (ids, legacy_keys) = partition_creators(&perks);
    let users = db.collection::<User>(USERS_COLLECTION);

    // 1. Batch-fetch dos ObjectIds válidos
    let mut by_id: HashMap<ObjectId, CreatorInfo> = HashMap::new();
    if !ids.is_empty() {
        let mut cursor = users
            .find(doc! { "_id": { "$in": ids } })
            .projection(doc! { "name": 1, "email": 1 })
            .await
            .map_err(AppError::from)?;

        while let Some(result) = cursor.next().await {
            match result {
                Ok(user) => {
                    by_id.insert(user.id, CreatorInfo::from(user));
                }
                Err(e) => log::error!("❌ Skipping undecodable user document: {}", e),
            }
        }
    }

    // 2. Chaves legadas resolvidas individualmente e em paralelo.
    //    Chave com "@" casa por email (case-insensitive), senão por nome.
    let lookups: Vec<_> = legacy_keys
        .into_iter()
        .map(|key| {
            let users = users.clone();
            async move {
                let filter = if key.contains('@') {
                    doc! {
                        "email": {
                            "$regex": format!("^{}$", escape_regex(&key)),
                            "$options": "i"
                        }
                    }
                } else {
                    doc! { "name": &key }
                };

                let found = match users.find_one(filter).await {
                    Ok(user) => user,
                    Err(e) => {
                        // ausência de match não é erro; falha de lookup também não derruba a listagem
                        log::warn!("⚠️ Creator lookup failed for '{}': {}", key, e);
                        None
                    }
                };
                (key, found)
            }
        })
        .collect();

    let results = futures::future::join_all(lookups).await;

    let mut by_key: HashMap<String, CreatorInfo> = HashMap::new();
    for (key, user) in results {
        if let Some(user) = user {
            let info = CreatorInfo::from(user);
            by_key.insert(key.to_lowercase(), info.clone());
            by_key.insert(key, info);
        }
    }

    Ok(perks
        .into_iter()
        .map(|perk| hydrate(perk, &by_id, &by_key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use mongodb::bson::DateTime;

    fn perk_with_creator(created_by: Option<CreatedBy>) -> Perk {
        Perk {
            id: Some(ObjectId::new()),
            title: "Coffee Club".to_string(),
            description: String::new(),
            category: Category::Food,
            discount_percent: 10.0,
            merchant: Some("Acme".to_string()),
            created_by,
            created_at: DateTime::now(),
        }
    }

    fn creator(name: &str, email: &str) -> CreatorInfo {
        CreatorInfo {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_partition_splits_ids_and_legacy_keys() {
        let oid = ObjectId::new();
        let perks = vec![
            perk_with_creator(Some(CreatedBy::Id(oid))),
            perk_with_creator(Some(CreatedBy::LegacyKey("jane@corp.com".to_string()))),
            perk_with_creator(Some(CreatedBy::LegacyKey("  ".to_string()))),
            perk_with_creator(None),
        ];

        let (ids, keys) = partition_creators(&perks);
        assert_eq!(ids, vec![oid]);
        assert_eq!(keys, vec!["jane@corp.com".to_string()]);
    }

    #[test]
    fn test_partition_deduplicates() {
        let perks = vec![
            perk_with_creator(Some(CreatedBy::LegacyKey("Jane Doe".to_string()))),
            perk_with_creator(Some(CreatedBy::LegacyKey("Jane Doe".to_string()))),
        ];
        let (_, keys) = partition_creators(&perks);
        assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_hydrate_resolves_by_id() {
        let oid = ObjectId::new();
        let mut by_id = HashMap::new();
        by_id.insert(oid, creator("Jane Doe", "jane@corp.com"));

        let result = hydrate(
            perk_with_creator(Some(CreatedBy::Id(oid))),
            &by_id,
            &HashMap::new(),
        );
        assert_eq!(result.created_by, Some(creator("Jane Doe", "jane@corp.com")));
    }

    #[test]
    fn test_hydrate_resolves_legacy_key_case_insensitively() {
        let mut by_key = HashMap::new();
        by_key.insert("jane@corp.com".to_string(), creator("Jane Doe", "jane@corp.com"));

        let result = hydrate(
            perk_with_creator(Some(CreatedBy::LegacyKey("Jane@Corp.COM".to_string()))),
            &HashMap::new(),
            &by_key,
        );
        assert_eq!(result.created_by, Some(creator("Jane Doe", "jane@corp.com")));
    }

    #[test]
    fn test_hydrate_unresolved_yields_none_not_raw_string() {
        let result = hydrate(
            perk_with_creator(Some(CreatedBy::LegacyKey("ghost".to_string()))),
            &HashMap::new(),
            &HashMap::new(),
        );
        assert_eq!(result.created_by, None);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("createdBy").unwrap().is_null());
    }

    // ==================== INTEGRATION (MongoDB) ====================

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_resolve_creators_against_users_collection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/PerksServiceTest".to_string());
        let db = MongoDB::new(&uri).await.expect("MongoDB must be running");

        let users = db.collection::<User>(USERS_COLLECTION);
        let user = User {
            id: ObjectId::new(),
            name: "Jane Doe".to_string(),
            email: "jane.resolution@corp.com".to_string(),
        };
        users.insert_one(&user).await.unwrap();

        let perks = vec![
            perk_with_creator(Some(CreatedBy::Id(user.id))),
            perk_with_creator(Some(CreatedBy::LegacyKey(
                "JANE.RESOLUTION@corp.com".to_string(),
            ))),
            perk_with_creator(Some(CreatedBy::LegacyKey("Unknown Person".to_string()))),
        ];

        let resolved = resolve_creators(&db, perks).await.unwrap();
        assert_eq!(resolved[0].created_by.as_ref().unwrap().name, "Jane Doe");
        assert_eq!(resolved[1].created_by.as_ref().unwrap().name, "Jane Doe");
        assert_eq!(resolved[2].created_by, None);

        users.delete_one(doc! { "_id": user.id }).await.unwrap();
    }
}
