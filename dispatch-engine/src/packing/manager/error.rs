use super::super::storage::StorageError;
use super::super::traits::PackingError;
use shared::packing::{CommandError, CommandErrorCode};
use thiserror::Error;

/// Manager errors
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session already exists: {0}")]
    SessionAlreadyExists(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("{0}")]
    StaleInput(String),

    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: i32,
        available: i32,
    },

    #[error("Invalid PIN")]
    InvalidPin,

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Version conflict on {order_id}: expected {expected}, actual {actual}")]
    ConcurrencyConflict {
        order_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ManagerError {
    /// Errors the client resolves by refetching the session
    pub fn wants_current_state(&self) -> bool {
        matches!(
            self,
            ManagerError::StaleInput(_) | ManagerError::ConcurrencyConflict { .. }
        )
    }
}

/// Map a storage error to an error code
fn classify_storage_error(e: &StorageError) -> CommandErrorCode {
    match e {
        StorageError::Serialization(_) => return CommandErrorCode::InternalError,
        StorageError::SessionNotFound(_) => return CommandErrorCode::SessionNotFound,
        _ => {}
    }

    // redb errors only expose their message
    let err_str = e.to_string().to_lowercase();

    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return CommandErrorCode::StorageFull;
    }

    if err_str.contains("out of memory") || err_str.contains("cannot allocate") {
        return CommandErrorCode::OutOfMemory;
    }

    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return CommandErrorCode::StorageCorrupted;
    }

    // Database/Transaction/Table/Storage/Commit errors
    CommandErrorCode::SystemBusy
}

impl From<ManagerError> for CommandError {
    fn from(err: ManagerError) -> Self {
        let (code, message) = match err {
            ManagerError::Storage(e) => {
                let code = classify_storage_error(&e);
                let message = e.to_string();
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                (code, message)
            }
            ManagerError::SessionNotFound(id) => (
                CommandErrorCode::SessionNotFound,
                format!("Session not found: {}", id),
            ),
            ManagerError::SessionAlreadyExists(id) => (
                CommandErrorCode::SessionAlreadyExists,
                format!("Session already exists: {}", id),
            ),
            ManagerError::ItemNotFound(id) => (
                CommandErrorCode::ItemNotFound,
                format!("Item not found: {}", id),
            ),
            ManagerError::StaleInput(msg) => (CommandErrorCode::StaleInput, msg),
            e @ ManagerError::InsufficientStock { .. } => {
                (CommandErrorCode::InsufficientStock, e.to_string())
            }
            ManagerError::InvalidPin => (CommandErrorCode::InvalidPin, "Invalid PIN".to_string()),
            ManagerError::InvalidQuantity(msg) => (CommandErrorCode::InvalidQuantity, msg),
            e @ ManagerError::ConcurrencyConflict { .. } => {
                (CommandErrorCode::ConcurrencyConflict, e.to_string())
            }
            ManagerError::InvalidOperation(msg) => (CommandErrorCode::InvalidOperation, msg),
            ManagerError::Internal(msg) => (CommandErrorCode::InternalError, msg),
        };
        CommandError::new(code, message)
    }
}

impl From<PackingError> for ManagerError {
    fn from(err: PackingError) -> Self {
        match err {
            PackingError::SessionNotFound(id) => ManagerError::SessionNotFound(id),
            PackingError::SessionAlreadyExists(id) => ManagerError::SessionAlreadyExists(id),
            PackingError::ItemNotFound(id) => ManagerError::ItemNotFound(id),
            PackingError::StaleInput(msg) => ManagerError::StaleInput(msg),
            PackingError::InsufficientStock {
                product_id,
                requested,
                available,
            } => ManagerError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            PackingError::InvalidPin => ManagerError::InvalidPin,
            PackingError::InvalidQuantity(msg) => ManagerError::InvalidQuantity(msg),
            PackingError::InvalidOperation(msg) => ManagerError::InvalidOperation(msg),
            PackingError::Storage(msg) => ManagerError::Internal(msg),
        }
    }
}

pub type ManagerResult<T> = Result<T, ManagerError>;
