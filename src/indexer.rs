//! Facade over the index server: document ingestion, synonym
//! maintenance, buffered bulk submission and the rebuild lifecycle.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::conn::Connection;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::protocol::codes::*;
use crate::protocol::Command;
use crate::schema::{FieldMeta, Schema, Setting, MAX_WDF, MIXED_VNO};
use crate::tokenizer::{default_tokenizer, TokenizerRef};

/// Terms longer than this many bytes are skipped, not truncated.
const MAX_TERM_BYTES: usize = 200;

/// Upper bound of the submission buffer, in megabytes.
const MAX_BUFFER_MB: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RebuildState {
    Idle,
    Rebuilding,
}

pub struct Indexer {
    conn: Connection,
    setting: Arc<Setting>,
    tokenizer: TokenizerRef,
    buffer: Option<Vec<u8>>,
    buffer_cap: usize,
    rebuild: RebuildState,
}

impl Indexer {
    /// Connect to the project's index server using a TOML project file.
    pub fn open<P: AsRef<Path>>(conf: P) -> Result<Indexer> {
        Indexer::new(Setting::load(conf)?)
    }

    pub fn new(setting: impl Into<Arc<Setting>>) -> Result<Indexer> {
        let setting = setting.into();
        let conn = Connection::connect(setting.config.index_server.as_str())?;
        conn.set_timeout(0)?;
        let project = Command::use_project(&setting.config.name, "");
        if let Err(err) = conn.exec_ok(&project, CMD_OK_PROJECT) {
            let _ = conn.close();
            return Err(err);
        }
        Ok(Indexer {
            conn,
            setting,
            tokenizer: default_tokenizer(),
            buffer: None,
            buffer_cap: 0,
            rebuild: RebuildState::Idle,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.setting.schema
    }

    pub fn set_tokenizer(&mut self, tokenizer: TokenizerRef) {
        self.tokenizer = tokenizer;
    }

    /// Switch the index database of the current project.
    pub fn set_db(&mut self, db: &str) -> Result<()> {
        let cmd = Command::with_buf(CMD_INDEX_SET_DB, 0, db);
        self.conn.exec_ok(&cmd, CMD_OK_DB_CHANGED)?;
        Ok(())
    }

    /// Force the server to flush the project's search log.
    pub fn flush_logging(&mut self) -> Result<()> {
        self.conn
            .exec_ok(&Command::new(CMD_FLUSH_LOGGING), CMD_OK_LOG_FLUSHED)?;
        Ok(())
    }

    /// Force the server to commit pending index changes.
    pub fn flush_index(&mut self) -> Result<()> {
        self.conn
            .exec_ok(&Command::new(CMD_INDEX_COMMIT), CMD_OK_DB_COMMITED)?;
        Ok(())
    }

    pub fn add(&mut self, doc: &Document) -> Result<()> {
        self.submit_doc(doc, true)
    }

    pub fn update(&mut self, doc: &Document) -> Result<()> {
        self.submit_doc(doc, false)
    }

    /// Delete documents by their primary key.
    pub fn del<S: AsRef<str>>(&mut self, terms: &[S]) -> Result<()> {
        self.del_by_field("", terms)
    }

    /// Delete every document carrying one of `terms` in `field`; an
    /// empty field name targets the primary key.
    pub fn del_by_field<S: AsRef<str>>(&mut self, field: &str, terms: &[S]) -> Result<()> {
        let field = if field.is_empty() {
            self.setting.schema.id_name()
        } else {
            field
        };
        let meta = self
            .setting
            .schema
            .field(field)
            .ok_or_else(|| Error::FieldNotFound(field.to_string()))?;
        let cmd = match terms {
            [] => return Ok(()),
            [term] => Command::with_bufs(
                CMD_INDEX_REMOVE,
                0,
                meta.vno,
                term.as_ref().to_lowercase(),
                "",
            ),
            terms => {
                let mut buf = Vec::new();
                for term in terms {
                    let remove = Command::with_bufs(
                        CMD_INDEX_REMOVE,
                        0,
                        meta.vno,
                        term.as_ref().to_lowercase(),
                        "",
                    );
                    buf.extend_from_slice(&remove.encode(false));
                }
                Command::with_buf(CMD_INDEX_EXDATA, 0, buf)
            }
        };
        self.buffer_exec(&cmd, CMD_OK_RQST_FINISHED)
    }

    pub fn add_synonym<S: AsRef<str>>(&mut self, word: &str, synonyms: &[S]) -> Result<()> {
        if word.is_empty() || synonyms.is_empty() {
            return Ok(());
        }
        for synonym in synonyms {
            let synonym = synonym.as_ref();
            if synonym.is_empty() {
                continue;
            }
            let cmd = Command::with_bufs(
                CMD_INDEX_SYNONYMS,
                INDEX_SYNONYMS_ADD,
                0,
                word,
                synonym,
            );
            self.buffer_exec(&cmd, CMD_OK_RQST_FINISHED)?;
        }
        Ok(())
    }

    /// Delete synonyms of `word`; with no synonyms given, all of them.
    pub fn del_synonym<S: AsRef<str>>(&mut self, word: &str, synonyms: &[S]) -> Result<()> {
        if word.is_empty() {
            return Ok(());
        }
        if synonyms.is_empty() {
            let cmd = Command::with_bufs(CMD_INDEX_SYNONYMS, INDEX_SYNONYMS_DEL, 0, word, "");
            return self.buffer_exec(&cmd, CMD_OK_RQST_FINISHED);
        }
        for synonym in synonyms {
            let synonym = synonym.as_ref();
            if synonym.is_empty() {
                continue;
            }
            let cmd = Command::with_bufs(
                CMD_INDEX_SYNONYMS,
                INDEX_SYNONYMS_DEL,
                0,
                word,
                synonym,
            );
            self.buffer_exec(&cmd, CMD_OK_RQST_FINISHED)?;
        }
        Ok(())
    }

    /// Open a submission buffer of `size` megabytes (capped at 32).
    /// While a buffer is open, mutating commands are batched locally and
    /// shipped as single bulk frames. A size of zero flushes and closes
    /// the buffer.
    pub fn open_buffer(&mut self, size: u32) -> Result<()> {
        let size = size.min(MAX_BUFFER_MB);
        let cap = (size as usize) << 20;
        if self.buffer.is_some() {
            if let Err(err) = self.flush_buffer() {
                self.buffer = None;
                self.buffer_cap = 0;
                return Err(err);
            }
            if self.buffer_cap == cap {
                return Ok(());
            }
        }
        if size > 0 {
            self.buffer_cap = cap;
            self.buffer = Some(Vec::with_capacity(cap));
        } else {
            self.buffer_cap = 0;
            self.buffer = None;
        }
        Ok(())
    }

    /// Flush and close an open submission buffer.
    pub fn submit(&mut self) -> Result<()> {
        self.open_buffer(0)
    }

    /// Wipe the current index database. Refused by the server while a
    /// rebuild is in progress.
    pub fn clean(&mut self) -> Result<()> {
        self.conn
            .exec_ok(&Command::new(CMD_INDEX_CLEAN_DB), CMD_OK_DB_CLEAN)?;
        Ok(())
    }

    /// Start rebuilding: subsequent updates go to a temporary database
    /// while the old one keeps serving searches until `end_rebuild`.
    pub fn begin_rebuild(&mut self) -> Result<()> {
        if self.rebuild == RebuildState::Rebuilding {
            return Err(Error::Rebuild("rebuild already in progress".to_string()));
        }
        let cmd = Command::with_bufs(CMD_INDEX_REBUILD, REBUILD_BEGIN, 0, "", "");
        self.conn.exec_ok(&cmd, CMD_OK_DB_REBUILD)?;
        self.rebuild = RebuildState::Rebuilding;
        debug!("rebuild started");
        Ok(())
    }

    /// Swap the rebuilt database in for the old one.
    pub fn end_rebuild(&mut self) -> Result<()> {
        if self.rebuild == RebuildState::Idle {
            return Err(Error::Rebuild("no rebuild in progress".to_string()));
        }
        let cmd = Command::with_bufs(CMD_INDEX_REBUILD, REBUILD_COMMIT, 0, "", "");
        self.conn.exec_ok(&cmd, CMD_OK_DB_REBUILD)?;
        self.rebuild = RebuildState::Idle;
        debug!("rebuild committed");
        Ok(())
    }

    /// Discard the temporary rebuild database. Also usable to recover
    /// after an interrupted rebuild, so a server complaint about no
    /// rebuild being active is not an error.
    pub fn stop_rebuild(&mut self) -> Result<()> {
        let cmd = Command::with_bufs(CMD_INDEX_REBUILD, REBUILD_DISCARD, 0, "", "");
        match self.conn.exec_ok(&cmd, CMD_OK_DB_REBUILD) {
            Ok(_) => {}
            Err(Error::Server { code, .. }) if code == CMD_ERR_WRONG_USE => {}
            Err(err) => return Err(err),
        }
        self.rebuild = RebuildState::Idle;
        debug!("rebuild discarded");
        Ok(())
    }

    pub fn rebuilding(&self) -> bool {
        self.rebuild == RebuildState::Rebuilding
    }

    /// Upload a custom dictionary used by the server-side analyzer.
    pub fn set_user_dict(&mut self, content: &str) -> Result<()> {
        let cmd = Command::with_bufs(CMD_INDEX_USER_DICT, 1, 0, content, "");
        self.conn.exec_ok(&cmd, CMD_NONE as u16)?;
        Ok(())
    }

    /// Flush any open buffer and close the connection.
    pub fn close(&mut self) -> Result<()> {
        if self.buffer.is_some() {
            self.flush_buffer()?;
        }
        self.conn.close()
    }

    fn submit_doc(&mut self, doc: &Document, add: bool) -> Result<()> {
        let id = self.setting.schema.id_field();
        let key = match doc.get(&id.name) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(Error::MissingPrimaryKey),
        };

        let mut cmds = Vec::new();
        let request = if add {
            Command::with_bufs(CMD_INDEX_REQUEST, INDEX_REQUEST_ADD, 0, "", "")
        } else {
            Command::with_bufs(CMD_INDEX_REQUEST, INDEX_REQUEST_UPDATE, id.vno, key, "")
        };
        cmds.push(request);

        let id = id.clone();
        self.build_field_cmds(&id, doc, &mut cmds);
        let others: Vec<FieldMeta> = self
            .setting
            .schema
            .fields()
            .filter(|meta| meta.name != id.name)
            .cloned()
            .collect();
        for meta in &others {
            self.build_field_cmds(meta, doc, &mut cmds);
        }
        cmds.push(Command::new(CMD_INDEX_SUBMIT));

        if self.buffer.is_some() {
            for cmd in &cmds {
                self.buffer_exec(cmd, CMD_OK_RQST_FINISHED)?;
            }
            return Ok(());
        }
        let (submit, fields) = match cmds.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        for cmd in fields {
            self.conn.exec_ok(cmd, CMD_NONE as u16)?;
        }
        self.conn.exec_ok(submit, CMD_OK_RQST_FINISHED)?;
        Ok(())
    }

    fn build_field_cmds(&self, meta: &FieldMeta, doc: &Document, cmds: &mut Vec<Command>) {
        if let Some(value) = doc.get(&meta.name) {
            if !value.is_empty() {
                let varg = if meta.is_numeric() {
                    VALUE_FLAG_NUMERIC
                } else {
                    0
                };
                if meta.has_index() {
                    let terms = self.tokenizer.tokens(value);
                    if !terms.is_empty() && meta.has_index_self() {
                        let wdf = if meta.is_bool_index() {
                            1
                        } else {
                            (meta.weight as u8) | INDEX_FLAG_CHECKSTEM
                        };
                        for term in &terms {
                            if term.len() > MAX_TERM_BYTES {
                                continue;
                            }
                            cmds.push(Command::with_bufs(
                                CMD_DOC_TERM,
                                wdf,
                                meta.vno,
                                term.to_lowercase(),
                                "",
                            ));
                        }
                    }
                    if !terms.is_empty() && meta.has_index_mixed() {
                        cmds.push(Command::with_bufs(
                            CMD_DOC_INDEX,
                            meta.weight as u8,
                            MIXED_VNO,
                            terms.join(" "),
                            "",
                        ));
                    }
                }
                cmds.push(Command::with_bufs(CMD_DOC_VALUE, varg, meta.vno, value, ""));
            }
        }
        // extra terms and index texts attached to the document directly
        if meta.has_index() {
            if let Some(terms) = doc.terms(&meta.name) {
                for (term, weight) in terms {
                    if term.len() > MAX_TERM_BYTES {
                        continue;
                    }
                    let wdf = if meta.is_bool_index() {
                        1
                    } else {
                        (*weight).min(MAX_WDF as u8) | INDEX_FLAG_CHECKSTEM
                    };
                    cmds.push(Command::with_bufs(
                        CMD_DOC_TERM,
                        wdf,
                        meta.vno,
                        term.to_lowercase(),
                        "",
                    ));
                }
            }
            if let Some(text) = doc.index_text(&meta.name) {
                for line in text.split('\n') {
                    if line.is_empty() {
                        continue;
                    }
                    cmds.push(Command::with_bufs(
                        CMD_DOC_INDEX,
                        meta.weight as u8,
                        meta.vno,
                        line,
                        "",
                    ));
                }
            }
        }
    }

    /// Route a mutating command through the open submission buffer, or
    /// execute it directly when no buffer is open.
    fn buffer_exec(&mut self, cmd: &Command, expect_arg: u16) -> Result<()> {
        if let Some(buffer) = self.buffer.as_mut() {
            let data = cmd.encode(false);
            if buffer.len() + data.len() > self.buffer_cap {
                self.flush_buffer()?;
            }
            if let Some(buffer) = self.buffer.as_mut() {
                buffer.extend_from_slice(&data);
            }
            return Ok(());
        }
        self.conn.exec_ok(cmd, expect_arg)?;
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        let data = match self.buffer.as_mut() {
            Some(buffer) if !buffer.is_empty() => std::mem::take(buffer),
            _ => return Ok(()),
        };
        debug!(bytes = data.len(), "flushing submission buffer");
        let cmd = Command::with_buf(CMD_INDEX_EXDATA, 0, data);
        self.conn.exec_ok(&cmd, CMD_OK_RQST_FINISHED)?;
        Ok(())
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{handshake, ok, MockServer};

    fn test_setting(addr: &str) -> Setting {
        let toml = format!(
            r#"
name = "demo"
index_server = "{addr}"

[fields.id]
type = "id"

[fields.message]
type = "body"
"#
        );
        Setting::from_toml_str(&toml).unwrap()
    }

    fn index_responder(frame: &Command) -> Vec<Command> {
        if let Some(replies) = handshake(frame) {
            return replies;
        }
        match frame.cmd {
            CMD_INDEX_SUBMIT | CMD_INDEX_REMOVE | CMD_INDEX_EXDATA => {
                vec![ok(CMD_OK_RQST_FINISHED)]
            }
            CMD_INDEX_REBUILD => vec![ok(CMD_OK_DB_REBUILD)],
            CMD_INDEX_CLEAN_DB => vec![ok(CMD_OK_DB_CLEAN)],
            CMD_INDEX_SET_DB => vec![ok(CMD_OK_DB_CHANGED)],
            CMD_FLUSH_LOGGING => vec![ok(CMD_OK_LOG_FLUSHED)],
            CMD_INDEX_COMMIT => vec![ok(CMD_OK_DB_COMMITED)],
            _ => vec![],
        }
    }

    #[test]
    fn test_add_frame_sequence() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        let doc: Document = [("id", "1018"), ("message", "中国 日本 厉害")]
            .into_iter()
            .collect();
        indexer.add(&doc).unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        assert_eq!(frames[0].cmd, CMD_TIMEOUT);
        assert_eq!(frames[1].cmd, CMD_USE);
        assert_eq!(frames[1].buf, b"demo");
        assert_eq!(frames[2].cmd, CMD_INDEX_REQUEST);
        assert_eq!(frames[2].arg1, INDEX_REQUEST_ADD);
        // id: bool-indexed term plus the stored value
        assert_eq!(frames[3].cmd, CMD_DOC_TERM);
        assert_eq!(frames[3].arg1, 1);
        assert_eq!(frames[3].arg2, 0);
        assert_eq!(frames[3].buf, "1018".as_bytes());
        assert_eq!(frames[4].cmd, CMD_DOC_VALUE);
        assert_eq!(frames[4].buf, "1018".as_bytes());
        // body: one self-index term per token, then the value
        let terms: Vec<&[u8]> = frames[5..8].iter().map(|f| f.buf.as_slice()).collect();
        assert_eq!(
            terms,
            vec!["中国".as_bytes(), "日本".as_bytes(), "厉害".as_bytes()]
        );
        for frame in &frames[5..8] {
            assert_eq!(frame.cmd, CMD_DOC_TERM);
            assert_eq!(frame.arg1, 1 | INDEX_FLAG_CHECKSTEM);
            assert_eq!(frame.arg2, MIXED_VNO);
        }
        assert_eq!(frames[8].cmd, CMD_DOC_VALUE);
        assert_eq!(frames[8].arg2, MIXED_VNO);
        assert_eq!(frames[9].cmd, CMD_INDEX_SUBMIT);
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn test_update_carries_key() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        let doc: Document = [("id", "1018")].into_iter().collect();
        indexer.update(&doc).unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        assert_eq!(frames[2].cmd, CMD_INDEX_REQUEST);
        assert_eq!(frames[2].arg1, INDEX_REQUEST_UPDATE);
        assert_eq!(frames[2].arg2, 0);
        assert_eq!(frames[2].buf, b"1018");
    }

    #[test]
    fn test_add_missing_primary_key() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        let doc: Document = [("message", "hello")].into_iter().collect();
        let err = indexer.add(&doc).unwrap_err();
        assert!(matches!(err, Error::MissingPrimaryKey));
        indexer.close().unwrap();
        assert_eq!(server.frames().len(), 2);
    }

    #[test]
    fn test_del_multiple_terms() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        indexer.del(&["Alpha", "BETA"]).unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        let exdata = &frames[2];
        assert_eq!(exdata.cmd, CMD_INDEX_EXDATA);
        let first = Command::decode(&exdata.buf, false).unwrap();
        assert_eq!(first.cmd, CMD_INDEX_REMOVE);
        assert_eq!(first.buf, b"alpha");
        let first_len = first.encode(false).len();
        let second = Command::decode(&exdata.buf[first_len..], false).unwrap();
        assert_eq!(second.buf, b"beta");
    }

    #[test]
    fn test_del_unknown_field() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        let err = indexer.del_by_field("nope", &["x"]).unwrap_err();
        assert!(matches!(err, Error::FieldNotFound(_)));
        indexer.close().unwrap();
        server.frames();
    }

    #[test]
    fn test_buffered_synonyms() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        indexer.open_buffer(1).unwrap();
        indexer.add_synonym("hello", &["hi", "hey"]).unwrap();
        indexer.del_synonym::<&str>("bye", &[]).unwrap();
        indexer.submit().unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        // handshake plus exactly one bulk frame
        assert_eq!(frames.len(), 3);
        let exdata = &frames[2];
        assert_eq!(exdata.cmd, CMD_INDEX_EXDATA);
        let mut offset = 0;
        let mut nested = Vec::new();
        while offset < exdata.buf.len() {
            let cmd = Command::decode(&exdata.buf[offset..], false).unwrap();
            offset += cmd.encode(false).len();
            nested.push(cmd);
        }
        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].arg1, INDEX_SYNONYMS_ADD);
        assert_eq!(nested[0].buf, b"hello");
        assert_eq!(nested[0].buf1, b"hi");
        assert_eq!(nested[1].buf1, b"hey");
        assert_eq!(nested[2].arg1, INDEX_SYNONYMS_DEL);
        assert_eq!(nested[2].buf, b"bye");
    }

    #[test]
    fn test_buffered_add_is_batched() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        indexer.open_buffer(1).unwrap();
        let doc: Document = [("id", "1")].into_iter().collect();
        indexer.add(&doc).unwrap();
        indexer.submit().unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].cmd, CMD_INDEX_EXDATA);
        let first = Command::decode(&frames[2].buf, false).unwrap();
        assert_eq!(first.cmd, CMD_INDEX_REQUEST);
    }

    #[test]
    fn test_buffer_flushes_on_overflow() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        indexer.open_buffer(1).unwrap();
        // each synonym frame is ~600 KB; the second one would push the
        // 1 MB buffer past capacity and must force an early flush
        let word = "x".repeat(600 << 10);
        indexer.add_synonym(&word, &["hi", "hey"]).unwrap();
        indexer.submit().unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        let bulks: Vec<&Command> = frames
            .iter()
            .filter(|frame| frame.cmd == CMD_INDEX_EXDATA)
            .collect();
        assert_eq!(bulks.len(), 2);
        let first = Command::decode(&bulks[0].buf, false).unwrap();
        assert_eq!(first.buf.len(), word.len());
        assert_eq!(first.buf1, b"hi");
        assert_eq!(bulks[0].buf.len(), first.encode(false).len());
        let second = Command::decode(&bulks[1].buf, false).unwrap();
        assert_eq!(second.buf1, b"hey");
        assert_eq!(bulks[1].buf.len(), second.encode(false).len());
    }

    #[test]
    fn test_oversize_term_skipped_not_truncated() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        let long = "y".repeat(MAX_TERM_BYTES + 50);
        let value = format!("{long} ok");
        let doc: Document = [("id", "1"), ("message", value.as_str())]
            .into_iter()
            .collect();
        indexer.add(&doc).unwrap();
        indexer.close().unwrap();

        let frames = server.frames();
        let body_terms: Vec<&Command> = frames
            .iter()
            .filter(|frame| frame.cmd == CMD_DOC_TERM && frame.arg2 == MIXED_VNO)
            .collect();
        assert_eq!(body_terms.len(), 1);
        assert_eq!(body_terms[0].buf, b"ok");
        // the stored value keeps the over-long token untouched
        let body_value = frames
            .iter()
            .find(|frame| frame.cmd == CMD_DOC_VALUE && frame.arg2 == MIXED_VNO)
            .unwrap();
        assert_eq!(body_value.buf, value.as_bytes());
    }

    #[test]
    fn test_rebuild_lifecycle() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        assert!(!indexer.rebuilding());
        indexer.begin_rebuild().unwrap();
        assert!(indexer.rebuilding());
        let err = indexer.begin_rebuild().unwrap_err();
        assert!(matches!(err, Error::Rebuild(_)));
        indexer.end_rebuild().unwrap();
        assert!(!indexer.rebuilding());
        let err = indexer.end_rebuild().unwrap_err();
        assert!(matches!(err, Error::Rebuild(_)));
        indexer.close().unwrap();

        let frames = server.frames();
        let rebuilds: Vec<u8> = frames
            .iter()
            .filter(|frame| frame.cmd == CMD_INDEX_REBUILD)
            .map(|frame| frame.arg1)
            .collect();
        assert_eq!(rebuilds, vec![REBUILD_BEGIN, REBUILD_COMMIT]);
    }

    #[test]
    fn test_thin_ops() {
        let mut server = MockServer::start(index_responder);
        let setting = test_setting(&server.addr);
        let mut indexer = Indexer::new(setting).unwrap();
        indexer.set_db("db_a").unwrap();
        indexer.clean().unwrap();
        indexer.flush_logging().unwrap();
        indexer.flush_index().unwrap();
        indexer.close().unwrap();

        let cmds: Vec<u8> = server.frames().iter().map(|frame| frame.cmd).collect();
        assert_eq!(
            cmds[2..],
            [
                CMD_INDEX_SET_DB,
                CMD_INDEX_CLEAN_DB,
                CMD_FLUSH_LOGGING,
                CMD_INDEX_COMMIT
            ]
        );
    }
}
