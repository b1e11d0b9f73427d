//! On-disk LLM response cache, keyed by an md5 of the request.

use std::{fs, path::PathBuf};

use crate::{config::Config, llm::ChatMessage};

#[derive(Debug, Clone)]
pub struct RequestCache {
    length: usize,
    cache_path: PathBuf,
}

impl RequestCache {
    /// `None` unless `LLM_CACHE=true`.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        if !cfg.get_bool("LLM_CACHE") {
            return None;
        }
        let len = cfg.get_usize("CACHE_LENGTH").unwrap_or(100);
        Some(Self::new(cfg.cache_path(), len))
    }

    pub fn new(cache_path: PathBuf, length: usize) -> Self {
        let _ = fs::create_dir_all(&cache_path);
        Self { length, cache_path }
    }

    pub fn key_for(&self, base_url: &str, model: &str, temperature: f32, messages: &[ChatMessage]) -> String {
        let payload = serde_json::json!({
            "base_url": base_url,
            "model": model,
            "temperature": temperature,
            "messages": messages,
        });
        let data = serde_json::to_vec(&payload).unwrap_or_default();
        format!("{:x}", md5::compute(data))
    }

    pub fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.cache_path.join(key)).ok()
    }

    pub fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        fs::write(self.cache_path.join(key), value)?;
        self.prune()
    }

    fn prune(&self) -> std::io::Result<()> {
        let mut entries: Vec<_> = fs::read_dir(&self.cache_path)?.filter_map(|e| e.ok()).collect();
        if entries.len() <= self.length {
            return Ok(());
        }
        entries.sort_by_key(|e| e.metadata().and_then(|m| m.modified()).ok());
        let to_delete = entries.len() - self.length;
        for entry in entries.iter().take(to_delete) {
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }
}
