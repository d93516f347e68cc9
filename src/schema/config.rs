//! Project configuration loaded from TOML.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::schema::{FieldDef, Schema};

pub const DEFAULT_INDEX_SERVER: &str = "127.0.0.1:8383";
pub const DEFAULT_SEARCH_SERVER: &str = "127.0.0.1:8384";

/// Name of the query-log database maintained by the search server.
pub const LOG_DB: &str = "log_db";

/// Schema of the query-log database; fixed on the server side.
const LOG_DB_SCHEMA: &str = r#"
[fields.id]
type = "id"
fid = 1
[fields.pinyin]
fid = 2
[fields.partial]
fid = 3
[fields.total]
type = "numeric"
index = "self"
fid = 4
[fields.lastnum]
type = "numeric"
index = "self"
fid = 5
[fields.currnum]
type = "numeric"
index = "self"
fid = 6
[fields.currtag]
fid = 7
[fields.body]
type = "body"
fid = 8
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub index_server: String,
    pub search_server: String,
    pub fields: BTreeMap<String, FieldDef>,
}

impl Config {
    /// Fill in defaults and expand shorthand server addresses:
    /// `":8383"` gets the default host prepended, a bare port number
    /// becomes `127.0.0.1:<port>`.
    fn normalize(&mut self) {
        if self.index_server.is_empty() {
            self.index_server = DEFAULT_INDEX_SERVER.to_string();
        }
        if self.search_server.is_empty() {
            self.search_server = DEFAULT_SEARCH_SERVER.to_string();
        }
        self.index_server = expand_addr(&self.index_server);
        self.search_server = expand_addr(&self.search_server);
    }
}

fn expand_addr(addr: &str) -> String {
    static PORT_ONLY: OnceLock<Regex> = OnceLock::new();
    if let Some(rest) = addr.strip_prefix(':') {
        return format!("127.0.0.1:{rest}");
    }
    let port_only = PORT_ONLY.get_or_init(|| Regex::new(r"^[1-9]\d{1,4}$").unwrap());
    if port_only.is_match(addr) {
        return format!("127.0.0.1:{addr}");
    }
    addr.to_string()
}

/// Everything the facades need: the parsed config plus the compiled
/// project schema and the built-in log-db schema.
#[derive(Debug, Clone)]
pub struct Setting {
    pub config: Config,
    pub schema: Schema,
    pub log_schema: Schema,
}

impl Setting {
    /// Load a project file; a missing `name` falls back to the file stem.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Setting> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&text)?;
        if config.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                config.name = stem.to_string();
            }
        }
        Setting::from_config(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Setting> {
        Setting::from_config(toml::from_str(text)?)
    }

    pub fn from_config(mut config: Config) -> Result<Setting> {
        if config.name.is_empty() {
            return Err(Error::Config("missing the name of project".to_string()));
        }
        config.normalize();
        let schema = Schema::new(&config.fields)?;
        let log_config: Config = toml::from_str(LOG_DB_SCHEMA)?;
        let log_schema = Schema::new(&log_config.fields)?;
        Ok(Setting {
            config,
            schema,
            log_schema,
        })
    }
}
