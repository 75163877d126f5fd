// Test doubles and fixtures for the analytics pipeline.
//
// - ScriptedCompletion (JsonCompletion): canned reply or canned failure
// - record/classified: build records without touching the filesystem
// - write_batch: drop a batch file into a data directory

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use ai_client::{CompletionOptions, JsonCompletion, Message};
use feedlens_common::{Category, PoliticalAlignment, Record};

use crate::classify::ClassifiedRecord;

// ---------------------------------------------------------------------------
// ScriptedCompletion
// ---------------------------------------------------------------------------

/// Returns the same reply (or error) for every call and remembers prompts.
pub struct ScriptedCompletion {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            reply: Ok(content.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonCompletion for ScriptedCompletion {
    async fn complete_json(
        &self,
        messages: Vec<Message>,
        _options: CompletionOptions,
    ) -> Result<String> {
        let prompt = messages
            .into_iter()
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(prompt);
        self.reply.clone().map_err(|e| anyhow!(e))
    }
}

// ---------------------------------------------------------------------------
// Record builders
// ---------------------------------------------------------------------------

pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

pub fn record(topic: &str, emotion: &str, humor: bool, timestamp: NaiveDateTime) -> Record {
    Record {
        topic: topic.to_string(),
        emotion: emotion.to_string(),
        humor,
        political_alignment: PoliticalAlignment::default(),
        timestamp,
    }
}

pub fn political(mut record: Record, label: &str) -> Record {
    record.political_alignment = PoliticalAlignment::Label(label.to_string());
    record
}

pub fn classified(record: Record, category: Category) -> ClassifiedRecord {
    ClassifiedRecord { record, category }
}

// ---------------------------------------------------------------------------
// Filesystem fixtures
// ---------------------------------------------------------------------------

pub fn write_batch(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}
