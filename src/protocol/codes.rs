//! Numeric vocabulary of the wire protocol.
//!
//! The values form a fixed table shared with the servers; commands with
//! bit 7 set receive no reply and are coalesced by the connection layer.

// Session commands
pub const CMD_NONE: u8 = 0;
pub const CMD_USE: u8 = 1;
pub const CMD_DEBUG: u8 = 2;
pub const CMD_TIMEOUT: u8 = 3;
pub const CMD_QUIT: u8 = 4;

// Index server commands
pub const CMD_INDEX_SET_DB: u8 = 32;
pub const CMD_INDEX_GET_DB: u8 = 33;
pub const CMD_INDEX_SUBMIT: u8 = 34;
pub const CMD_INDEX_REMOVE: u8 = 35;
pub const CMD_INDEX_EXDATA: u8 = 36;
pub const CMD_INDEX_CLEAN_DB: u8 = 37;
pub const CMD_DELETE_PROJECT: u8 = 38;
pub const CMD_INDEX_COMMIT: u8 = 39;
pub const CMD_INDEX_REBUILD: u8 = 40;
pub const CMD_FLUSH_LOGGING: u8 = 41;
pub const CMD_INDEX_SYNONYMS: u8 = 42;
pub const CMD_INDEX_USER_DICT: u8 = 43;

// Search server commands
pub const CMD_SEARCH_DB_TOTAL: u8 = 64;
pub const CMD_SEARCH_GET_TOTAL: u8 = 65;
pub const CMD_SEARCH_GET_RESULT: u8 = 66;
pub const CMD_SEARCH_SET_DB: u8 = 67;
pub const CMD_SEARCH_ADD_DB: u8 = 68;
pub const CMD_SEARCH_GET_SYNONYMS: u8 = 70;
pub const CMD_SEARCH_ADD_LOG: u8 = 71;

// Query commands
pub const CMD_QUERY_GET_STRING: u8 = 96;
pub const CMD_QUERY_GET_TERMS: u8 = 97;
pub const CMD_QUERY_GET_CORRECTED: u8 = 98;
pub const CMD_QUERY_GET_EXPANDED: u8 = 99;

// Deferred commands (bit 7 set, no reply)
pub const CMD_QUERY_INIT: u8 = 150;
pub const CMD_QUERY_PARSE: u8 = 151;
pub const CMD_QUERY_TERM: u8 = 152;
pub const CMD_QUERY_TERMS: u8 = 153;
pub const CMD_QUERY_PREFIX: u8 = 154;
pub const CMD_QUERY_PARSEFLAG: u8 = 155;

pub const CMD_DOC_TERM: u8 = 160;
pub const CMD_DOC_VALUE: u8 = 161;
pub const CMD_DOC_INDEX: u8 = 162;
pub const CMD_INDEX_REQUEST: u8 = 163;

pub const CMD_SEARCH_SET_SORT: u8 = 170;
pub const CMD_SEARCH_SET_CUT: u8 = 171;
pub const CMD_SEARCH_SET_NUMERIC: u8 = 172;
pub const CMD_SEARCH_SET_COLLAPSE: u8 = 173;
pub const CMD_SEARCH_SET_FACETS: u8 = 174;
pub const CMD_SEARCH_SET_CUTOFF: u8 = 175;
pub const CMD_SEARCH_SET_MISC: u8 = 176;
pub const CMD_SEARCH_KEEPALIVE: u8 = 177;

// Server replies
pub const CMD_OK: u8 = 128;
pub const CMD_ERR: u8 = 129;

// Result stream sub-frames
pub const CMD_SEARCH_RESULT_DOC: u8 = 140;
pub const CMD_SEARCH_RESULT_FIELD: u8 = 141;
pub const CMD_SEARCH_RESULT_FACETS: u8 = 142;
pub const CMD_SEARCH_RESULT_MATCHED: u8 = 143;

// Arguments carried by CMD_OK replies
pub const CMD_OK_INFO: u16 = 200;
pub const CMD_OK_PROJECT: u16 = 201;
pub const CMD_OK_QUERY_STRING: u16 = 202;
pub const CMD_OK_DB_TOTAL: u16 = 203;
pub const CMD_OK_QUERY_TERMS: u16 = 204;
pub const CMD_OK_QUERY_CORRECTED: u16 = 205;
pub const CMD_OK_SEARCH_TOTAL: u16 = 206;
pub const CMD_OK_RESULT_BEGIN: u16 = 207;
pub const CMD_OK_RESULT_END: u16 = 208;
pub const CMD_OK_TIMEOUT_SET: u16 = 209;
pub const CMD_OK_FINISHED: u16 = 210;
pub const CMD_OK_LOGGED: u16 = 211;
pub const CMD_OK_RQST_FINISHED: u16 = 212;
pub const CMD_OK_DB_CHANGED: u16 = 213;
pub const CMD_OK_DB_CLEAN: u16 = 214;
pub const CMD_OK_DB_COMMITED: u16 = 215;
pub const CMD_OK_DB_REBUILD: u16 = 216;
pub const CMD_OK_LOG_FLUSHED: u16 = 217;
pub const CMD_OK_RESULT_SYNONYMS: u16 = 218;

// Server error codes
pub const CMD_ERR_WRONG_USE: u16 = 601;

// Query operators
pub const QUERY_OP_AND: u8 = 0;
pub const QUERY_OP_OR: u8 = 1;
pub const QUERY_OP_AND_NOT: u8 = 2;
pub const QUERY_OP_XOR: u8 = 3;
pub const QUERY_OP_AND_MAYBE: u8 = 4;
pub const QUERY_OP_FILTER: u8 = 5;

// Query parse flags
pub const PARSE_FLAG_BOOLEAN: u16 = 1;
pub const PARSE_FLAG_PHRASE: u16 = 2;
pub const PARSE_FLAG_LOVEHATE: u16 = 4;
pub const PARSE_FLAG_AUTO_MULTIWORD_SYNONYMS: u16 = 1536;

// Field prefix kinds
pub const PREFIX_NORMAL: u8 = 0;
pub const PREFIX_BOOLEAN: u8 = 1;

// Flags carried in arg1 of per-field frames
pub const VALUE_FLAG_NUMERIC: u8 = 0x80;
pub const INDEX_FLAG_CHECKSTEM: u8 = 0x80;

// arg1 of CMD_INDEX_REQUEST
pub const INDEX_REQUEST_ADD: u8 = 0;
pub const INDEX_REQUEST_UPDATE: u8 = 1;

// arg1 of CMD_INDEX_SYNONYMS
pub const INDEX_SYNONYMS_ADD: u8 = 1;
pub const INDEX_SYNONYMS_DEL: u8 = 2;

// arg1 of CMD_SEARCH_GET_SYNONYMS
pub const SEARCH_SYNONYMS_WORD: u8 = 2;

// arg1 of CMD_INDEX_REBUILD
pub const REBUILD_BEGIN: u8 = 0;
pub const REBUILD_COMMIT: u8 = 1;
pub const REBUILD_DISCARD: u8 = 2;

// arg1 of CMD_SEARCH_SET_MISC
pub const MISC_SYN_SCALE: u8 = 1;
pub const MISC_MATCHED_TERM: u8 = 2;
pub const MISC_WEIGHT_SCHEME: u8 = 3;

/// Page-size limits accepted by the search server.
pub const DEFAULT_LIMIT: u32 = 10;
pub const HARD_LIMIT: u32 = 20;

/// Clamp a caller-supplied page size to what the server accepts.
pub fn max_limit(limit: u32) -> u32 {
    if limit == 0 {
        DEFAULT_LIMIT
    } else if limit > HARD_LIMIT {
        HARD_LIMIT
    } else {
        limit
    }
}
