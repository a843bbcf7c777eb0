use crate::registry::SourceLocation;
use async_trait::async_trait;

/// Shows a source location to the user
#[async_trait]
pub trait SourceOpener: Send + Sync {
    async fn open(&self, location: &SourceLocation) -> std::io::Result<()>;
}

/// Only logs the location
pub struct LoggingOpener;

#[async_trait]
impl SourceOpener for LoggingOpener {
    async fn open(&self, location: &SourceLocation) -> std::io::Result<()> {
        tracing::info!(
            path = ?location.path,
            line = location.position.line,
            column = location.position.column,
            "view source"
        );
        Ok(())
    }
}

/// Launches an external editor: `<program> -g <path>:<line>:<column>`
pub struct CommandOpener {
    program: String,
}

impl CommandOpener {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// `path:line:column` with a 1-based column, as editors expect
pub fn goto_argument(location: &SourceLocation) -> String {
    format!(
        "{}:{}:{}",
        location.path.display(),
        location.position.line,
        location.position.column + 1
    )
}

#[async_trait]
impl SourceOpener for CommandOpener {
    async fn open(&self, location: &SourceLocation) -> std::io::Result<()> {
        tokio::process::Command::new(&self.program)
            .arg("-g")
            .arg(goto_argument(location))
            .spawn()?;
        Ok(())
    }
}
