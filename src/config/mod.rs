use std::{
    collections::HashMap,
    env, fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

pub mod run;

pub use run::{DatasetHandle, RunConfig};

pub const DEFAULT_API_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .vizgenrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                parse_rc(BufReader::new(file), &mut map);
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Defaults overlaid with the given pairs; ignores rc file and environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map, config_path: default_config_path() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).map(PathBuf::from)
    }

    /// First non-empty API key out of `OPENROUTER_API_KEY` and `OPENAI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        ["OPENROUTER_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.trim().is_empty())
    }

    pub fn cache_path(&self) -> PathBuf {
        self.get_path("CACHE_PATH")
            .unwrap_or_else(|| env::temp_dir().join("vizgen").join("cache"))
    }

    /// Comma separated list, blanks dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn parse_rc<R: BufRead>(reader: R, map: &mut HashMap<String, String>) {
    for line in reader.lines().map_while(Result::ok) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            map.insert(k.trim().to_string(), v.trim().to_string());
        }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "MAX_REGENERATION_ATTEMPTS",
        "EXECUTION_TIMEOUT",
        "REQUEST_TIMEOUT",
        "API_BASE_URL",
        "OPENROUTER_API_KEY",
        "OPENAI_API_KEY",
        "AGENT_LANGUAGE",
        "CODE_MODEL",
        "DECISION_MODEL",
        "JUDGE_MODEL",
        "EVALUATION_MODELS",
        "OUTPUT_PATH",
        "STATISTICS_PATH",
        "PYTHON_INTERPRETER",
        "R_INTERPRETER",
        "LLM_CACHE",
        "CACHE_PATH",
        "CACHE_LENGTH",
    ];

    KEYS.contains(&k) || k.starts_with("VIZGEN_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("vizgen").join(".vizgenrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    // Paths
    let temp = env::temp_dir().join("vizgen");
    m.insert("OUTPUT_PATH".into(), "output".into());
    m.insert("STATISTICS_PATH".into(), "statistics".into());
    m.insert(
        "CACHE_PATH".into(),
        temp.join("cache").to_string_lossy().into_owned(),
    );

    // Numbers
    m.insert("MAX_REGENERATION_ATTEMPTS".into(), "3".into());
    m.insert("EXECUTION_TIMEOUT".into(), "300".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("CACHE_LENGTH".into(), "100".into());

    // Strings
    m.insert("API_BASE_URL".into(), DEFAULT_API_BASE_URL.into());
    m.insert("AGENT_LANGUAGE".into(), "de".into());
    m.insert("CODE_MODEL".into(), "gpt-5".into());
    m.insert("DECISION_MODEL".into(), "gpt-4o".into());
    m.insert("JUDGE_MODEL".into(), "gpt-5".into());
    m.insert("EVALUATION_MODELS".into(), "gpt-5".into());
    m.insert("PYTHON_INTERPRETER".into(), "python3".into());
    m.insert("R_INTERPRETER".into(), "Rscript".into());

    // Bools as strings
    m.insert("LLM_CACHE".into(), "false".into());

    m
}
