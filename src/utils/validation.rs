// ==================== PERK PAYLOAD VALIDATION ====================
// Funções puras, sem estado compartilhado. Dois modos:
// - create: falha no primeiro erro, aplica defaults
// - update: valida o merge existente+payload, coleta todos os erros,
//   descarta campos desconhecidos e coage tipos

use serde_json::{Map, Value};

use crate::models::{Category, Perk};
use crate::utils::error::AppError;

/// Conjunto normalizado de campos de um perk, pronto para persistir.
#[derive(Debug, Clone, PartialEq)]
pub struct PerkFields {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub discount_percent: f64,
    pub merchant: Option<String>,
}

impl PerkFields {
    /// Documento para `$set` em updates parciais
    pub fn to_update_doc(&self) -> mongodb::bson::Document {
        use mongodb::bson::doc;

        let mut update = doc! {
            "title": &self.title,
            "description": &self.description,
            "category": self.category.as_str(),
            "discountPercent": self.discount_percent,
        };
        if let Some(merchant) = &self.merchant {
            update.insert("merchant", merchant);
        }
        update
    }
}

const RECOGNIZED_FIELDS: [&str; 5] = [
    "title",
    "description",
    "category",
    "discountPercent",
    "merchant",
];

/// Validação em modo criação: para no primeiro erro.
pub fn validate_create(payload: &Value) -> Result<PerkFields, AppError> {
    let map = payload
        .as_object()
        .ok_or_else(|| AppError::validation("Request body must be a JSON object"))?;

    if has_value(map, "createdBy") {
        return Err(AppError::validation("createdBy cannot be set directly"));
    }

    let title = check_title(map.get("title")).map_err(AppError::validation)?;
    let description = check_description(map.get("description")).map_err(AppError::validation)?;
    let category = check_category(map.get("category")).map_err(AppError::validation)?;
    let discount_percent = check_discount(map.get("discountPercent")).map_err(AppError::validation)?;
    let merchant = check_merchant(map.get("merchant")).map_err(AppError::validation)?;

    Ok(PerkFields {
        title,
        description,
        category,
        discount_percent,
        merchant,
    })
}

/// Validação em modo update: opera sobre o merge raso do documento
/// existente com o payload parcial, para que campos omitidos sejam
/// revalidados contra o valor atual. Coleta todos os erros.
pub fn validate_update(existing: &Perk, patch: &Value) -> Result<PerkFields, AppError> {
    let patch_map = patch
        .as_object()
        .ok_or_else(|| AppError::validation("Request body must be a JSON object"))?;

    let mut errors = Vec::new();

    if has_value(patch_map, "createdBy") {
        errors.push("createdBy cannot be set directly".to_string());
    }

    let merged = merge_with_existing(existing, patch_map);

    let title = collect(check_title(merged.get("title")), &mut errors).unwrap_or_default();
    let description =
        collect(check_description(merged.get("description")), &mut errors).unwrap_or_default();
    let category = collect(check_category(merged.get("category")), &mut errors).unwrap_or_default();
    let discount_percent =
        collect(check_discount(merged.get("discountPercent")), &mut errors).unwrap_or_default();
    let merchant = collect(check_merchant(merged.get("merchant")), &mut errors).flatten();

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    Ok(PerkFields {
        title,
        description,
        category,
        discount_percent,
        merchant,
    })
}

fn collect<T>(result: Result<T, String>, errors: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(message) => {
            errors.push(message);
            None
        }
    }
}

// `null` no payload conta como ausente
fn has_value(map: &Map<String, Value>, key: &str) -> bool {
    matches!(map.get(key), Some(value) if !value.is_null())
}

/// Merge raso: campos reconhecidos do documento existente, sobrescritos
/// pelos campos reconhecidos do payload. Campos desconhecidos são
/// descartados silenciosamente.
fn merge_with_existing(existing: &Perk, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    merged.insert("title".to_string(), Value::String(existing.title.clone()));
    merged.insert(
        "description".to_string(),
        Value::String(existing.description.clone()),
    );
    merged.insert(
        "category".to_string(),
        Value::String(existing.category.as_str().to_string()),
    );
    merged.insert(
        "discountPercent".to_string(),
        serde_json::json!(existing.discount_percent),
    );
    if let Some(merchant) = &existing.merchant {
        merged.insert("merchant".to_string(), Value::String(merchant.clone()));
    }

    for field in RECOGNIZED_FIELDS {
        if let Some(value) = patch.get(field) {
            if !value.is_null() {
                merged.insert(field.to_string(), value.clone());
            }
        }
    }

    merged
}

fn check_title(value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Err("title is required".to_string()),
        Some(Value::String(title)) => {
            if title.trim().chars().count() < 2 {
                Err("title must be at least 2 characters".to_string())
            } else {
                Ok(title.clone())
            }
        }
        Some(_) => Err("title must be a string".to_string()),
    }
}

fn check_description(value: Option<&Value>) -> Result<String, String> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(description)) => Ok(description.clone()),
        Some(_) => Err("description must be a string".to_string()),
    }
}

fn check_category(value: Option<&Value>) -> Result<Category, String> {
    match value {
        None | Some(Value::Null) => Ok(Category::default()),
        Some(Value::String(category)) => Category::parse(category).ok_or_else(|| {
            format!(
                "category must be one of: {}",
                Category::ALLOWED.join(", ")
            )
        }),
        Some(_) => Err("category must be a string".to_string()),
    }
}

// Aceita número ou string numérica; o valor é limitado a [0,100]
fn check_discount(value: Option<&Value>) -> Result<f64, String> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(discount) if discount.is_finite() => Ok(discount.clamp(0.0, 100.0)),
        _ => Err("discountPercent must be a number".to_string()),
    }
}

fn check_merchant(value: Option<&Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(merchant)) => Ok(Some(merchant.clone())),
        Some(_) => Err("merchant must be a string".to_string()),
    }
}
