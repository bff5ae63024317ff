//! Batch execution
//!
//! Replaying scripts goes through a [`BatchExecutor`]; each call receives a
//! single batch with its `GO` separators already removed.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::schema::generator::BATCH_SEPARATOR;

/// Executes one batch of T-SQL
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    async fn execute(&self, batch: &str) -> Result<()>;
}

/// Writes batches, each followed by `GO`, instead of running them
pub struct ScriptWriterExecutor<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> ScriptWriterExecutor<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| Error::Unknown("script writer lock poisoned".to_string()))
    }
}

#[async_trait]
impl<W: Write + Send> BatchExecutor for ScriptWriterExecutor<W> {
    async fn execute(&self, batch: &str) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| Error::Unknown("script writer lock poisoned".to_string()))?;

        write!(writer, "{}\n{}\n\n", batch, BATCH_SEPARATOR)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_writer_appends_separator_after_each_batch() {
        let executor = ScriptWriterExecutor::new(Vec::new());
        executor.execute("SELECT 1").await.unwrap();
        executor.execute("SELECT 2").await.unwrap();

        let written = String::from_utf8(executor.into_inner().unwrap()).unwrap();
        assert_eq!(written, "SELECT 1\nGO\n\nSELECT 2\nGO\n\n");
    }
}
