use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{program} executable not found in PATH: {source}")]
    ToolNotFound {
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("{step} exited with status {code}{}", stderr_suffix(.stderr))]
    Command {
        step: String,
        code: i32,
        stderr: String,
    },

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Remote object not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
