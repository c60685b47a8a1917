//! Size-bounded bulk request batching
//!
//! Bulk requests are built from complete operations: an action line, plus a
//! source line for index operations, each newline terminated. Operations are
//! never split across requests and keep their input order.

use serde_json::Value;

use crate::config::DEFAULT_MAX_BULK_CHARS;

/// Index (create or replace) operation for one document
pub fn index_operation(id: &str, source: &Value) -> serde_json::Result<String> {
    Ok(format!(
        "{}\n{}\n",
        action_line("index", id)?,
        serde_json::to_string(source)?
    ))
}

/// Delete operation for one document
pub fn delete_operation(id: &str) -> serde_json::Result<String> {
    Ok(format!("{}\n", action_line("delete", id)?))
}

fn action_line(action: &str, id: &str) -> serde_json::Result<String> {
    let mut meta = serde_json::Map::new();
    meta.insert("_id".to_string(), Value::String(id.to_string()));
    let mut line = serde_json::Map::new();
    line.insert(action.to_string(), Value::Object(meta));
    serde_json::to_string(&line)
}

/// Groups operations into request bodies of at most `max_chars` characters
#[derive(Debug, Clone, Copy)]
pub struct BulkBatcher {
    max_chars: usize,
}

impl Default for BulkBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BULK_CHARS)
    }
}

impl BulkBatcher {
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Concatenate `operations` into as few bodies as the budget allows.
    ///
    /// An operation larger than the budget is sent alone.
    pub fn batch<I, S>(&self, operations: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batches = Vec::new();
        let mut current = String::new();

        for operation in operations {
            let operation = operation.as_ref();
            if operation.is_empty() {
                continue;
            }
            if !current.is_empty() && current.len() + operation.len() > self.max_chars {
                batches.push(std::mem::take(&mut current));
            }
            current.push_str(operation);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}
