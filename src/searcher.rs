//! Facade over the search server: retrieval with streamed result
//! frames, counts, synonyms, query assembly and the suggestion
//! endpoints backed by the query-log database.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::conn::Connection;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::protocol::codes::*;
use crate::protocol::{pack_u16_be, pack_u32_pair, unpack_u32, Command, Unpacker};
use crate::query::assemble_log_entry;
use crate::schema::config::LOG_DB;
use crate::schema::{Schema, Setting, MIXED_VNO};
use crate::tokenizer::{default_tokenizer, Tokenizer, TokenizerRef};

/// Facet counts of one field: value -> number of matching documents.
pub type Facet = HashMap<String, i32>;

/// Hot-query rankings maintained by the server's query log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HotKind {
    #[default]
    Total,
    LastNum,
    CurrNum,
}

impl HotKind {
    fn field(self) -> &'static str {
        match self {
            HotKind::Total => "total",
            HotKind::LastNum => "lastnum",
            HotKind::CurrNum => "currnum",
        }
    }
}

pub struct Searcher {
    conn: Connection,
    setting: Arc<Setting>,
    tokenizer: TokenizerRef,
    facets: HashMap<String, Facet>,
    default_op: u8,
    query_prefix: FxHashMap<String, bool>,
    last_count: u32,
    count: Option<u32>,
    limit: u32,
    offset: u32,
    cur_db: String,
    added_dbs: Vec<String>,
    last_db: String,
    query: String,
    terms: Option<Vec<String>>,
}

impl Searcher {
    /// Connect to the project's search server using a TOML project file.
    pub fn open<P: AsRef<Path>>(conf: P) -> Result<Searcher> {
        Searcher::new(Setting::load(conf)?)
    }

    pub fn new(setting: impl Into<Arc<Setting>>) -> Result<Searcher> {
        let setting = setting.into();
        let conn = Connection::connect(setting.config.search_server.as_str())?;
        conn.set_timeout(0)?;
        let project = Command::use_project(&setting.config.name, "");
        if let Err(err) = conn.exec_ok(&project, CMD_OK_PROJECT) {
            let _ = conn.close();
            return Err(err);
        }
        let mut searcher = Searcher {
            conn,
            setting,
            tokenizer: default_tokenizer(),
            facets: HashMap::new(),
            default_op: QUERY_OP_AND,
            query_prefix: FxHashMap::default(),
            last_count: 0,
            count: None,
            limit: 0,
            offset: 0,
            cur_db: String::new(),
            added_dbs: Vec::new(),
            last_db: String::new(),
            query: String::new(),
            terms: None,
        };
        searcher.init_special_field()?;
        Ok(searcher)
    }

    pub fn set_tokenizer(&mut self, tokenizer: TokenizerRef) {
        self.tokenizer = tokenizer;
    }

    /// Fuzzy mode joins query fragments with OR instead of AND.
    pub fn fuzzy(&mut self, fuzzy: bool) {
        self.default_op = if fuzzy { QUERY_OP_OR } else { QUERY_OP_AND };
    }

    /// Drop matches scoring below `percent` of the best hit or below an
    /// absolute `weight` (0.1 to 25.5). Mostly useful with fuzzy mode.
    pub fn set_cut_off(&mut self, percent: u8, weight: f32) -> Result<()> {
        let percent = percent.min(100);
        let weight = weight.clamp(0.1, 25.5);
        let cmd = Command::with_bufs(CMD_SEARCH_SET_CUTOFF, percent, (weight * 10.0) as u8, "", "");
        self.conn.exec_ok(&cmd, 0)?;
        Ok(())
    }

    /// Ask the server to attach the matched term list to each result
    /// document of subsequent searches.
    pub fn set_require_matched_term(&mut self, required: bool) -> Result<()> {
        let cmd = Command::with_bufs(
            CMD_SEARCH_SET_MISC,
            MISC_MATCHED_TERM,
            required as u8,
            "",
            "",
        );
        self.conn.exec_ok(&cmd, 0)?;
        Ok(())
    }

    /// Pick the ranking scheme: 0 = BM25, 1 = boolean, 2 = traditional.
    pub fn set_weighting_scheme(&mut self, scheme: u8) -> Result<()> {
        if scheme > 2 {
            return Err(Error::InvalidArgument(format!(
                "unknown weighting scheme {scheme}"
            )));
        }
        let cmd = Command::with_bufs(CMD_SEARCH_SET_MISC, MISC_WEIGHT_SCHEME, scheme, "", "");
        self.conn.exec_ok(&cmd, 0)?;
        Ok(())
    }

    /// Toggle automatic multi-word synonym expansion during parsing.
    pub fn set_auto_synonyms(&mut self, auto: bool) -> Result<()> {
        let mut flag = PARSE_FLAG_BOOLEAN | PARSE_FLAG_PHRASE | PARSE_FLAG_LOVEHATE;
        if auto {
            flag |= PARSE_FLAG_AUTO_MULTIWORD_SYNONYMS;
        }
        self.conn
            .exec_ok(&Command::with_arg(CMD_QUERY_PARSEFLAG, flag), 0)?;
        Ok(())
    }

    /// Scale synonym match weights; 0.01 to 2.55, 1 leaves them alone.
    pub fn set_synonym_scale(&mut self, scale: f32) -> Result<()> {
        let scale = scale.clamp(0.01, 2.55);
        let cmd = Command::with_bufs(
            CMD_SEARCH_SET_MISC,
            MISC_SYN_SCALE,
            (scale * 100.0) as u8,
            "",
            "",
        );
        self.conn.exec_ok(&cmd, 0)?;
        Ok(())
    }

    /// All synonym entries of the current database, optionally paged and
    /// including stemmed entries.
    pub fn get_all_synonyms(
        &mut self,
        limit: u32,
        offset: u32,
        stemmed: bool,
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut cmd = Command::new(CMD_SEARCH_GET_SYNONYMS);
        if limit > 0 {
            cmd.buf1 = pack_u32_pair(offset, limit).to_vec();
        }
        if stemmed {
            cmd.arg1 = 1;
        }
        let res = self.conn.exec_ok(&cmd, CMD_OK_RESULT_SYNONYMS)?;
        let mut synonyms = HashMap::new();
        for line in res.buf_str().split('\n') {
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split('\t');
            if let Some(word) = parts.next() {
                synonyms.insert(word.to_string(), parts.map(str::to_string).collect());
            }
        }
        Ok(synonyms)
    }

    /// Synonyms of one word; empty input yields an empty list.
    pub fn get_synonyms(&mut self, word: &str) -> Result<Vec<String>> {
        if word.is_empty() {
            return Ok(Vec::new());
        }
        let cmd = Command::with_bufs(CMD_SEARCH_GET_SYNONYMS, SEARCH_SYNONYMS_WORD, 0, word, "");
        let res = self.conn.exec_ok(&cmd, CMD_OK_RESULT_SYNONYMS)?;
        Ok(res
            .buf_str()
            .split('\n')
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Estimate the match count of `query`. An empty query reuses the
    /// total cached by the last empty-query search when available.
    pub fn count(&mut self, query: &str) -> Result<u32> {
        let query = if query.is_empty() {
            String::new()
        } else {
            self.pre_query_string(query)
        };
        if query.is_empty() {
            if let Some(count) = self.count {
                return Ok(count);
            }
        }
        let cmd = Command::with_bufs(CMD_SEARCH_GET_TOTAL, 0, self.default_op, query.clone(), "");
        let res = self.conn.exec_ok(&cmd, CMD_OK_SEARCH_TOTAL)?;
        let count = unpack_u32(&res.buf)?;
        if query.is_empty() {
            self.count = Some(count);
        }
        Ok(count)
    }

    /// Match total reported by the most recent search.
    pub fn last_count(&self) -> u32 {
        self.last_count
    }

    /// Page size of the next search; resets the offset.
    pub fn limit(&mut self, limit: u32) -> &mut Searcher {
        self.limit_offset(limit, 0)
    }

    pub fn limit_offset(&mut self, limit: u32, offset: u32) -> &mut Searcher {
        self.limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
        self.offset = offset;
        self
    }

    /// Run a search; multiple fragments are joined with `" AND "`.
    /// Paging always resets to the first ten hits afterwards.
    pub fn search<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<Vec<Document>> {
        let query = queries
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(" AND ");
        let query = if query.is_empty() {
            query
        } else {
            self.pre_query_string(&query)
        };
        if self.limit == 0 {
            self.limit = DEFAULT_LIMIT;
        }
        let page = pack_u32_pair(self.offset, self.limit);
        let cmd = Command::with_bufs(
            CMD_SEARCH_GET_RESULT,
            0,
            self.default_op,
            query.clone(),
            page.to_vec(),
        );
        let res = self.conn.exec_ok(&cmd, CMD_OK_RESULT_BEGIN)?;
        let count = unpack_u32(&res.buf)?;
        self.last_count = count;
        self.limit = DEFAULT_LIMIT;
        self.offset = 0;

        let in_log_db = self.cur_db == LOG_DB;
        let setting = self.setting.clone();
        let schema = if in_log_db {
            &setting.log_schema
        } else {
            &setting.schema
        };
        let mut result = vec![Document::new(); count as usize];
        {
            let conn = &self.conn;
            let facets = &mut self.facets;
            let mut doc_idx = 0usize;
            loop {
                let frame = conn.stream_reply()?;
                match frame.cmd {
                    CMD_SEARCH_RESULT_FACETS => accumulate_facets(facets, schema, &frame.buf)?,
                    CMD_SEARCH_RESULT_DOC => {
                        if doc_idx >= result.len() {
                            return Err(unexpected(&frame));
                        }
                        result[doc_idx].apply_meta(&frame.buf)?;
                        doc_idx += 1;
                    }
                    CMD_SEARCH_RESULT_FIELD => {
                        if doc_idx > 0 {
                            let name = schema
                                .by_vno(frame.arg() as u8)
                                .map(str::to_string)
                                .unwrap_or_else(|| frame.arg().to_string());
                            result[doc_idx - 1].fields.insert(name, frame.buf_str());
                        }
                    }
                    CMD_SEARCH_RESULT_MATCHED => {
                        if doc_idx > 0 {
                            result[doc_idx - 1].matched = frame
                                .buf_str()
                                .split(' ')
                                .filter(|term| !term.is_empty())
                                .map(str::to_string)
                                .collect();
                        }
                    }
                    CMD_OK if frame.arg() == CMD_OK_RESULT_END => break,
                    _ => return Err(unexpected(&frame)),
                }
            }
        }
        debug!(count, query = %query, "search finished");
        if query.is_empty() && !in_log_db {
            self.count = Some(count);
            self.log_query();
        }
        Ok(result)
    }

    /// Store the default query used by argument-less `count`, `search`
    /// and `terms`; returns the normalized form.
    pub fn set_query(&mut self, query: &str) -> Result<String> {
        if query.is_empty() {
            return Ok(String::new());
        }
        self.clear_query()?;
        self.query = query.to_string();
        self.add_query_string(query, QUERY_OP_AND, 1.0)
    }

    /// Feed a query string into the server-side parse tree and return
    /// the normalized form. `scale` stretches the fragment's weight.
    pub fn add_query_string(&mut self, query: &str, add_op: u8, scale: f32) -> Result<String> {
        let query = self.pre_query_string(query);
        let cmd = Command::with_bufs(
            CMD_QUERY_PARSE,
            add_op,
            self.default_op,
            query.clone(),
            pack_scale(scale),
        );
        self.conn.exec_ok(&cmd, 0)?;
        Ok(query)
    }

    /// Feed raw terms into the parse tree, bypassing the parser. An
    /// empty or body-typed field targets the mixed index area.
    pub fn add_query_term<S: AsRef<str>>(
        &mut self,
        field: &str,
        add_op: u8,
        scale: f32,
        terms: &[S],
    ) -> Result<()> {
        if terms.is_empty() {
            return Ok(());
        }
        let vno = if field.is_empty() {
            MIXED_VNO
        } else {
            self.setting
                .schema
                .field(field)
                .map(|meta| meta.vno)
                .unwrap_or(MIXED_VNO)
        };
        let code = if terms.len() > 1 {
            CMD_QUERY_TERMS
        } else {
            CMD_QUERY_TERM
        };
        let joined = terms
            .iter()
            .map(|term| term.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join("\t");
        let cmd = Command::with_bufs(code, add_op, vno, joined, pack_scale(scale));
        self.conn.exec_ok(&cmd, 0)?;
        Ok(())
    }

    /// Reset the server-side parse tree and the cached query state.
    pub fn clear_query(&mut self) -> Result<()> {
        self.conn.exec_ok(&Command::new(CMD_QUERY_INIT), 0)?;
        self.query.clear();
        self.count = None;
        self.terms = None;
        Ok(())
    }

    /// The server's description of how it parsed `query`.
    pub fn get_query(&mut self, query: &str) -> Result<String> {
        let query = if query.is_empty() {
            String::new()
        } else {
            self.pre_query_string(query)
        };
        let cmd = Command::with_bufs(CMD_QUERY_GET_STRING, 0, self.default_op, query, "");
        let res = self.conn.exec_ok(&cmd, CMD_OK_QUERY_STRING)?;
        Ok(res.buf_str())
    }

    /// Switch the database searched by this connection.
    pub fn set_db(&mut self, db: &str) -> Result<()> {
        let cmd = Command::with_buf(CMD_SEARCH_SET_DB, 0, db);
        self.conn.exec_ok(&cmd, CMD_OK_DB_CHANGED)?;
        self.last_db = std::mem::replace(&mut self.cur_db, db.to_string());
        Ok(())
    }

    /// Search an additional database alongside the current one.
    pub fn add_db(&mut self, db: &str) -> Result<()> {
        let cmd = Command::with_buf(CMD_SEARCH_ADD_DB, 0, db);
        self.conn.exec_ok(&cmd, CMD_OK_DB_CHANGED)?;
        if !self.added_dbs.iter().any(|name| name == db) {
            self.added_dbs.push(db.to_string());
        }
        Ok(())
    }

    /// Number of documents in the current database.
    pub fn get_db_total(&mut self) -> Result<u32> {
        let res = self
            .conn
            .exec_ok(&Command::new(CMD_SEARCH_DB_TOTAL), CMD_OK_DB_TOTAL)?;
        unpack_u32(&res.buf)
    }

    /// Highlightable terms of `query`; fielded terms are dropped. The
    /// result is cached and reused by argument-less calls.
    pub fn terms(&mut self, query: &str) -> Result<Vec<String>> {
        let query = if query.is_empty() {
            String::new()
        } else {
            self.pre_query_string(query)
        };
        if query.is_empty() {
            if let Some(ref terms) = self.terms {
                return Ok(terms.clone());
            }
        }
        let cmd = Command::with_bufs(CMD_QUERY_GET_TERMS, 0, self.default_op, query, "");
        let res = self.conn.exec_ok(&cmd, CMD_OK_QUERY_TERMS)?;
        let terms: Vec<String> = res
            .buf_str()
            .split(' ')
            .filter(|term| !term.is_empty() && !term.find(':').is_some_and(|pos| pos > 0))
            .map(str::to_string)
            .collect();
        self.terms = Some(terms.clone());
        Ok(terms)
    }

    /// Spelling suggestions. With an empty query the stored default
    /// query is used, but only when the last result set was small
    /// relative to the database (under roughly 0.1 %).
    pub fn get_corrected_query(&mut self, query: &str) -> Result<Vec<String>> {
        let mut query = query.to_string();
        if query.is_empty() {
            let skip = match self.count {
                None => true,
                Some(count) => {
                    count > 0
                        && (count as f64) > (0.001 * self.get_db_total()? as f64).ceil()
                }
            };
            if skip {
                return Ok(Vec::new());
            }
            query = self.clean_field_query(&self.query.clone());
        }
        if query.is_empty() || query.contains(':') {
            return Ok(Vec::new());
        }
        let cmd = Command::with_buf(CMD_QUERY_GET_CORRECTED, 0, query);
        let res = self.conn.exec_ok(&cmd, CMD_OK_QUERY_CORRECTED)?;
        Ok(res
            .buf_str()
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Expand a prefix (pinyin, latin or CJK) into known search terms.
    pub fn get_expanded_query(&mut self, query: &str, limit: u32) -> Result<Vec<String>> {
        let limit = max_limit(limit);
        let cmd = Command::with_bufs(CMD_QUERY_GET_EXPANDED, limit as u8, 0, query, "");
        self.conn.exec_ok(&cmd, CMD_OK_RESULT_BEGIN)?;
        let mut expanded = Vec::new();
        loop {
            let frame = self.conn.stream_reply()?;
            match frame.cmd {
                CMD_SEARCH_RESULT_FIELD => expanded.push(frame.buf_str()),
                CMD_OK if frame.arg() == CMD_OK_RESULT_END => break,
                _ => return Err(unexpected(&frame)),
            }
        }
        Ok(expanded)
    }

    /// Popular queries from the log database: surface form mapped to
    /// its hit count.
    pub fn get_hot_query(&mut self, kind: HotKind, limit: u32) -> Result<HashMap<String, u32>> {
        let limit = max_limit(limit);
        let field = kind.field();
        self.with_log_db(|searcher| {
            searcher.limit(limit);
            let docs = searcher.search(&[format!("{field}:1")])?;
            let mut hot = HashMap::new();
            for doc in docs {
                let body = match doc.get("body") {
                    Some(body) => body.to_string(),
                    None => continue,
                };
                if let Some(value) = doc.get(field) {
                    hot.insert(body, value.parse().unwrap_or(0));
                }
            }
            Ok(hot)
        })
    }

    /// Related queries from the log database. An empty query falls back
    /// to the cleaned stored default query.
    pub fn get_related_query(&mut self, query: &str, limit: u32) -> Result<Vec<String>> {
        let limit = max_limit(limit);
        let query = if query.is_empty() {
            self.clean_field_query(&self.query.clone())
        } else {
            query.to_string()
        };
        if query.is_empty() || query.contains(':') {
            return Ok(Vec::new());
        }
        let op = self.default_op;
        let related = self.with_log_db(|searcher| {
            searcher.limit(limit + 1);
            searcher.fuzzy(true);
            let docs = searcher.search(&[query.as_str()])?;
            let mut related = Vec::new();
            for doc in docs {
                let body = doc.get("body").unwrap_or("");
                if body == query {
                    continue;
                }
                related.push(body.to_string());
                if related.len() == limit as usize {
                    break;
                }
            }
            Ok(related)
        });
        self.default_op = op;
        related
    }

    /// Facet counts accumulated by previous searches.
    pub fn facet(&self, name: &str) -> Option<&Facet> {
        self.facets.get(name)
    }

    pub fn close(&mut self) -> Result<()> {
        self.conn.close()
    }

    // accessors shared with the query-preparation code

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn schema(&self) -> &Schema {
        &self.setting.schema
    }

    pub(crate) fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub(crate) fn query_prefix_cached(&self, name: &str) -> bool {
        self.query_prefix.contains_key(name)
    }

    pub(crate) fn cache_query_prefix(&mut self, name: &str, registered: bool) {
        self.query_prefix.insert(name.to_string(), registered);
    }

    /// Run `body` against the query-log database, restoring the
    /// previous database selection afterwards whatever happens.
    fn with_log_db<T>(&mut self, body: impl FnOnce(&mut Searcher) -> Result<T>) -> Result<T> {
        self.set_db(LOG_DB)?;
        let result = body(self);
        self.restore_db();
        result
    }

    fn restore_db(&mut self) {
        let db = std::mem::take(&mut self.last_db);
        let _ = self.set_db(&db);
        let added = self.added_dbs.clone();
        for db in added {
            let _ = self.add_db(&db);
        }
    }

    /// Record the stored query in the server's search log, best effort.
    fn log_query(&mut self) {
        if self.query.is_empty() {
            return;
        }
        let query = self.query.clone();
        if self.last_count == 0
            || (self.default_op == QUERY_OP_OR && query.contains(' '))
            || query.contains(" OR ")
            || query.contains(" NOT ")
            || query.contains(" XOR ")
        {
            return;
        }
        let terms = match self.terms("") {
            Ok(terms) => terms,
            Err(_) => return,
        };
        if let Some(entry) = assemble_log_entry(&query, &terms) {
            let cmd = Command::with_buf(CMD_SEARCH_ADD_LOG, 0, entry);
            let _ = self.conn.exec_ok(&cmd, CMD_OK_LOGGED);
        }
    }
}

impl Drop for Searcher {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Percent scales ride in a big-endian u16 of `scale * 100`; the
/// neutral scale is sent as an empty payload.
fn pack_scale(scale: f32) -> Vec<u8> {
    if scale > 0.0 && scale != 1.0 && scale < 655.35 {
        pack_u16_be((scale * 100.0) as u16).to_vec()
    } else {
        Vec::new()
    }
}

fn unexpected(frame: &Command) -> Error {
    Error::UnexpectedReply {
        expected_cmd: CMD_OK,
        expected_arg: CMD_OK_RESULT_END,
        cmd: frame.cmd,
        arg: frame.arg(),
    }
}

/// Parse a run of 6-byte facet micro-records followed by their values.
fn accumulate_facets(
    facets: &mut HashMap<String, Facet>,
    schema: &Schema,
    buf: &[u8],
) -> Result<()> {
    let mut off = 0usize;
    while off + 6 < buf.len() {
        let mut r = Unpacker::new(&buf[off..off + 6]);
        let vno = r.u8()?;
        let vlen = r.u8()? as usize;
        let num = r.i32_le()?;
        if let Some(name) = schema.by_vno(vno) {
            if off + 6 + vlen <= buf.len() {
                let value = String::from_utf8_lossy(&buf[off + 6..off + 6 + vlen]).into_owned();
                facets.entry(name.to_string()).or_default().insert(value, num);
            }
        }
        off += 6 + vlen;
    }
    Ok(())
}
