use thiserror::Error;

// Enum for handling various application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError), // Errors related to the generative model.

    #[error("Game error: {0}")]
    Game(#[from] GameError), // Errors specific to game logic or session state.

    #[error("Save error: {0}")]
    Save(#[from] SaveError), // Errors from the durable save store.

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError), // Errors from the underlying blob store.

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error), // Errors related to data serialization.

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error), // Input/output errors.
}

// Enum for game-specific errors.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("No game is currently active")]
    NoActiveGame, // A turn or save was requested before any game started.

    #[error("Invalid combination: {0}")]
    InvalidCombination(String), // A combine intent with fewer than two items.
}

// Errors raised while talking to the generative model. These never escape the
// oracle client: every one of them degrades into the fixed fallback state.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("Timeout occurred")]
    Timeout, // The model did not answer within the allotted time.

    #[error("No message found")]
    NoMessageFound, // The reply carried no content where one was expected.

    #[error("Invalid response: {0}")]
    InvalidResponse(String), // The reply was not a well-formed game state.
}

impl From<serde_json::Error> for OracleError {
    fn from(err: serde_json::Error) -> Self {
        OracleError::InvalidResponse(err.to_string())
    }
}

// Errors from the durable save store.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("No saved game exists")]
    NoSave,

    #[error("Saved game is corrupted: {0}")]
    Corrupt(String), // The stored payload was unreadable; the entry is purged.

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
