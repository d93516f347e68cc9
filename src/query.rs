//! Query-side text preparation: normalization of raw query strings,
//! field prefix registration and cleanup of fielded queries.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::protocol::codes::*;
use crate::protocol::Command;
use crate::schema::{FieldMeta, MIXED_VNO};
use crate::searcher::Searcher;

impl Searcher {
    /// Normalize a raw query: trim, collapse whitespace, rewrite
    /// `field:value` fragments through the tokenizer (registering the
    /// field prefix with the server on first sight) and parenthesize
    /// loved/hated multi-byte terms.
    pub(crate) fn pre_query_string(&mut self, query: &str) -> String {
        let query = query.trim_matches(|c: char| matches!(c, ' ' | '\n' | '\t' | '\r'));
        let query = query.replace(['\t', '\n', '\r'], " ");
        let mut parts: Vec<String> = Vec::new();
        for part in query.split(' ') {
            if part.is_empty() {
                continue;
            }
            if let Some(pos) = part.find(':') {
                if pos > 0 && self.rewrite_field_part(part, pos, &mut parts) {
                    continue;
                }
            }
            let bytes = part.as_bytes();
            if bytes.len() > 1
                && (bytes[0] == b'+' || bytes[0] == b'-')
                && bytes[1] != b'('
                && bytes.iter().any(|b| (0x81..=0xfe).contains(b))
            {
                parts.push(format!("{}({})", &part[..1], &part[1..]));
                continue;
            }
            parts.push(part.to_string());
        }
        parts.join(" ")
    }

    /// Rewrite one `field:value` fragment; returns false when the name
    /// is not a known self-area field and the fragment should pass
    /// through untouched.
    fn rewrite_field_part(&mut self, part: &str, pos: usize, parts: &mut Vec<String>) -> bool {
        let prefix_end = part[..pos]
            .bytes()
            .take_while(|b| matches!(b, b'+' | b'-' | b'~' | b'('))
            .count();
        let name = &part[prefix_end..pos];
        match self.schema().field(name) {
            Some(meta) if meta.vno != MIXED_VNO => {}
            _ => return false,
        }
        self.reg_query_prefix(name);
        let (value, suffix) = if part.ends_with(')') {
            (&part[pos + 1..part.len() - 1], ")")
        } else {
            (&part[pos + 1..], "")
        };
        let terms: Vec<String> = self
            .tokenizer()
            .tokens(value)
            .iter()
            .map(|term| term.to_lowercase())
            .collect();
        let joined = terms.join(&format!(" {name}:"));
        parts.push(format!("{}{}:{}{}", &part[..prefix_end], name, joined, suffix));
        true
    }

    /// Tell the server about a field prefix once per connection; the
    /// outcome is cached either way so failures are not retried.
    fn reg_query_prefix(&mut self, name: &str) {
        if self.query_prefix_cached(name) {
            return;
        }
        let meta = match self.schema().field(name) {
            Some(meta) if meta.vno != MIXED_VNO => meta.clone(),
            _ => return,
        };
        let kind = if meta.is_bool_index() {
            PREFIX_BOOLEAN
        } else {
            PREFIX_NORMAL
        };
        let cmd = Command::with_bufs(CMD_QUERY_PREFIX, kind, meta.vno, name, "");
        let registered = self.conn().exec_ok(&cmd, 0).is_ok();
        self.cache_query_prefix(name, registered);
    }

    /// Announce cut lengths and numeric fields right after connecting.
    /// All commands are deferred and ride along with the next exchange.
    pub(crate) fn init_special_field(&mut self) -> crate::error::Result<()> {
        let metas: Vec<FieldMeta> = self.schema().fields().cloned().collect();
        for meta in metas {
            if meta.cutlen > 0 {
                let cut = meta.cutlen.div_ceil(10).min(127) as u8;
                let cmd = Command::with_bufs(CMD_SEARCH_SET_CUT, cut, meta.vno, "", "");
                self.conn().exec_ok(&cmd, 0)?;
            }
            if meta.is_numeric() {
                let cmd = Command::with_bufs(CMD_SEARCH_SET_NUMERIC, 0, meta.vno, "", "");
                self.conn().exec_ok(&cmd, 0)?;
            }
        }
        Ok(())
    }

    /// Strip boolean operators and field qualifiers from a query so the
    /// remaining plain terms can feed the suggestion endpoints.
    pub(crate) fn clean_field_query(&self, query: &str) -> String {
        static FIELD_RE: OnceLock<Regex> = OnceLock::new();
        let query = query.replace(" AND ", " ").replace(" OR ", " ");
        let re = FIELD_RE
            .get_or_init(|| Regex::new(r"(^|\s)([0-9A-Za-z_.-]+):(\S+)").unwrap());
        re.replace_all(&query, |caps: &Captures| {
            let name = &caps[2];
            match self.schema().field(name) {
                None => caps[0].to_string(),
                Some(meta) if meta.is_bool_index() => String::new(),
                Some(_) => {
                    let value = &caps[3];
                    if value.starts_with('(') && value.ends_with(')') {
                        format!(
                            "{}{}",
                            &caps[1],
                            value.trim_matches(|c| c == '(' || c == ')')
                        )
                    } else {
                        caps[1].to_string()
                    }
                }
            }
        })
        .into_owned()
    }
}

/// Reassemble the surface form of a just-executed query from its parsed
/// terms, for the server-side search log. Terms are located in the
/// original byte string in order; a term that overlaps the previous one
/// loses its first three bytes, a term further right opens a gap. The
/// walk aborts after three gaps or 42 assembled bytes.
pub(crate) fn assemble_log_entry(query: &str, terms: &[String]) -> Option<String> {
    let haystack = query.as_bytes();
    let mut out: Vec<u8> = Vec::new();
    let mut pos = 0usize;
    let mut gaps = 0u32;
    for term in terms {
        let needle = term.as_bytes();
        if needle.is_empty() {
            continue;
        }
        // scan up to three bytes back so a term sharing one multi-byte
        // character with its predecessor is still found
        let start = if pos > 3 && needle.len() == 6 {
            pos - 3
        } else {
            pos
        };
        if start > haystack.len() {
            continue;
        }
        let found = match find_bytes(&haystack[start..], needle) {
            Some(rel) => start + rel,
            None => continue,
        };
        if found == pos {
            out.extend_from_slice(needle);
        } else if found < pos {
            if needle.len() > 3 {
                out.extend_from_slice(&needle[3..]);
            }
        } else {
            gaps += 1;
            if gaps > 3 || out.len() > 42 {
                break;
            }
            out.push(b' ');
            out.extend_from_slice(needle);
        }
        pos = found + needle.len();
    }
    while out.first() == Some(&b' ') {
        out.remove(0);
    }
    while out.last() == Some(&b' ') {
        out.pop();
    }
    if out.len() < 2 || (out.len() == 3 && out[0] > 0x80) {
        return None;
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
