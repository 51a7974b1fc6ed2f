use std::fmt;

/// Erros dos handlers de perks, mapeados para status HTTP na camada de API.
#[derive(Debug)]
pub enum AppError {
    /// 400 - uma ou mais violações de validação
    Validation(Vec<String>),
    /// 401 - requisição sem identidade autenticada
    Unauthorized(String),
    /// 404 - recurso inexistente
    NotFound(String),
    /// 409 - violação de chave única no store
    Conflict(String),
    /// 500 - qualquer outra falha do store
    Database(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> AppError {
        AppError::Validation(vec![message.into()])
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => write!(f, "Validation error: {}", errors.join("; ")),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        if is_duplicate_key(&err) {
            AppError::Conflict("A perk with the same title and merchant already exists".to_string())
        } else {
            AppError::Database(err.to_string())
        }
    }
}

/// Detecta violação de índice único (código 11000 do MongoDB)
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = err.kind.as_ref() {
        return write_error.code == 11000;
    }
    err.to_string().contains("E11000")
}
