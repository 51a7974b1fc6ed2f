use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::CreatorInfo;

/// Categoria do perk (enum fixo, serializado em lowercase)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Tech,
    Travel,
    Fitness,
    #[default]
    Other,
}

impl Category {
    pub const ALLOWED: [&'static str; 5] = ["food", "tech", "travel", "fitness", "other"];

    pub fn parse(value: &str) -> Option<Category> {
        match value {
            "food" => Some(Category::Food),
            "tech" => Some(Category::Tech),
            "travel" => Some(Category::Travel),
            "fitness" => Some(Category::Fitness),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Tech => "tech",
            Category::Travel => "travel",
            Category::Fitness => "fitness",
            Category::Other => "other",
        }
    }
}

/// Referência ao criador do perk.
///
/// Dados legados guardam o campo `createdBy` como string livre (nome ou
/// email) em vez de ObjectId, então o deserializer aceita os dois formatos
/// e nunca rejeita um documento por causa disso.
#[derive(Debug, Clone, PartialEq)]
pub enum CreatedBy {
    Id(ObjectId),
    LegacyKey(String),
}

impl CreatedBy {
    pub fn from_key(key: &str) -> CreatedBy {
        match ObjectId::parse_str(key) {
            Ok(oid) => CreatedBy::Id(oid),
            Err(_) => CreatedBy::LegacyKey(key.to_string()),
        }
    }

    pub fn as_key(&self) -> String {
        match self {
            CreatedBy::Id(oid) => oid.to_hex(),
            CreatedBy::LegacyKey(key) => key.clone(),
        }
    }
}

impl Serialize for CreatedBy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CreatedBy::Id(oid) => oid.serialize(serializer),
            CreatedBy::LegacyKey(key) => serializer.serialize_str(key),
        }
    }
}

impl<'de> Deserialize<'de> for CreatedBy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bson_value = Bson::deserialize(deserializer)?;
        match bson_value {
            Bson::ObjectId(oid) => Ok(CreatedBy::Id(oid)),
            Bson::String(s) => match ObjectId::parse_str(&s) {
                Ok(oid) => Ok(CreatedBy::Id(oid)),
                Err(_) => Ok(CreatedBy::LegacyKey(s)),
            },
            _ => Err(serde::de::Error::custom("Expected ObjectId or String")),
        }
    }
}

/// Documento da collection "perks"
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Perk {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: Category,

    #[serde(default)]
    pub discount_percent: f64,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub merchant: Option<String>,

    /// ObjectId do usuário dono, ou string legada (ver CreatedBy)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub created_by: Option<CreatedBy>,

    pub created_at: DateTime,
}

/// Response de perk (projeção plana, createdBy como string)
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerkResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub discount_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: i64,
}

impl From<Perk> for PerkResponse {
    fn from(perk: Perk) -> Self {
        PerkResponse {
            id: perk.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: perk.title,
            description: perk.description,
            category: perk.category,
            discount_percent: perk.discount_percent,
            merchant: perk.merchant,
            created_by: perk.created_by.map(|c| c.as_key()),
            created_at: perk.created_at.timestamp_millis(),
        }
    }
}

/// Response do listing público: createdBy resolvido para {name, email}
/// ou `null` quando o criador não pôde ser resolvido.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicPerk {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub discount_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    pub created_by: Option<CreatorInfo>,
    pub created_at: i64,
}

impl PublicPerk {
    pub fn from_perk(perk: Perk, creator: Option<CreatorInfo>) -> Self {
        PublicPerk {
            id: perk.id.map(|id| id.to_hex()).unwrap_or_default(),
            title: perk.title,
            description: perk.description,
            category: perk.category,
            discount_percent: perk.discount_percent,
            merchant: perk.merchant,
            created_by: creator,
            created_at: perk.created_at.timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn test_created_by_from_object_id() {
        let oid = ObjectId::new();
        let document = doc! { "createdBy": oid };
        let value: CreatedBy = mongodb::bson::from_bson(document.get("createdBy").unwrap().clone()).unwrap();
        assert_eq!(value, CreatedBy::Id(oid));
    }

    #[test]
    fn test_created_by_from_hex_string() {
        let oid = ObjectId::new();
        let value: CreatedBy = mongodb::bson::from_bson(Bson::String(oid.to_hex())).unwrap();
        assert_eq!(value, CreatedBy::Id(oid));
    }

    #[test]
    fn test_created_by_from_legacy_string() {
        let value: CreatedBy = mongodb::bson::from_bson(Bson::String("jane@corp.com".to_string())).unwrap();
        assert_eq!(value, CreatedBy::LegacyKey("jane@corp.com".to_string()));
    }

    #[test]
    fn test_created_by_rejects_other_bson_types() {
        let result: Result<CreatedBy, _> = mongodb::bson::from_bson(Bson::Int32(42));
        assert!(result.is_err());
    }

    #[test]
    fn test_category_defaults_to_other() {
        assert_eq!(Category::default(), Category::Other);
        assert_eq!(Category::parse("travel"), Some(Category::Travel));
        assert_eq!(Category::parse("TRAVEL"), None);
        assert_eq!(Category::parse("snacks"), None);
    }

    #[test]
    fn test_perk_deserializes_legacy_document() {
        // Documento antigo: createdBy como string, sem description/category
        let document = doc! {
            "_id": ObjectId::new(),
            "title": "Coffee Club",
            "createdBy": "Jane Doe",
            "createdAt": DateTime::now(),
        };
        let perk: Perk = mongodb::bson::from_document(document).unwrap();
        assert_eq!(perk.category, Category::Other);
        assert_eq!(perk.description, "");
        assert_eq!(perk.discount_percent, 0.0);
        assert_eq!(perk.created_by, Some(CreatedBy::LegacyKey("Jane Doe".to_string())));
    }
}
