use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Documento da collection "users"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
}

/// Projeção pública do criador de um perk
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct CreatorInfo {
    pub name: String,
    pub email: String,
}

impl From<User> for CreatorInfo {
    fn from(user: User) -> Self {
        CreatorInfo {
            name: user.name,
            email: user.email,
        }
    }
}
