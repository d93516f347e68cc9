//! Wire frame codec.
//!
//! Every frame starts with an 8-byte header: `cmd`, `arg1`, `arg2`, the
//! length of the auxiliary payload `buf1` as a single byte, then the
//! length of the main payload `buf` as a 32-bit integer whose byte order
//! follows the connection's endianness flag. The header a server sends
//! always carries the 32-bit length little-endian.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::protocol::codes::{CMD_USE, CMD_NONE};

pub const HEAD_SIZE: usize = 8;

/// `buf1` is length-prefixed by a single byte and cannot exceed this.
pub const MAX_BUF1: usize = 0xff;

/// One protocol frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    pub cmd: u8,
    pub arg1: u8,
    pub arg2: u8,
    pub buf: Vec<u8>,
    pub buf1: Vec<u8>,
}

impl Command {
    pub fn new(cmd: u8) -> Self {
        Command {
            cmd,
            ..Default::default()
        }
    }

    pub fn with_arg(cmd: u8, arg: u16) -> Self {
        let mut command = Command::new(cmd);
        command.set_arg(arg);
        command
    }

    pub fn with_buf(cmd: u8, arg: u16, buf: impl Into<Vec<u8>>) -> Self {
        let mut command = Command::with_arg(cmd, arg);
        command.buf = buf.into();
        command
    }

    pub fn with_bufs(
        cmd: u8,
        arg1: u8,
        arg2: u8,
        buf: impl Into<Vec<u8>>,
        buf1: impl Into<Vec<u8>>,
    ) -> Self {
        Command {
            cmd,
            arg1,
            arg2,
            buf: buf.into(),
            buf1: buf1.into(),
        }
    }

    /// Session opener: select a project, optionally with its home directory.
    pub fn use_project(project: &str, home: &str) -> Self {
        let mut command = Command::new(CMD_USE);
        command.buf = project.as_bytes().to_vec();
        if !home.is_empty() {
            command.buf1 = home.as_bytes().to_vec();
        }
        command
    }

    /// The 16-bit argument split across `arg1` (high byte) and `arg2`.
    pub fn arg(&self) -> u16 {
        (u16::from(self.arg1) << 8) | u16::from(self.arg2)
    }

    pub fn set_arg(&mut self, arg: u16) {
        self.arg1 = (arg >> 8) as u8;
        self.arg2 = (arg & 0xff) as u8;
    }

    /// Commands with bit 7 set receive no reply from the server.
    pub fn is_deferred(&self) -> bool {
        self.cmd & 0x80 != 0
    }

    pub fn encode(&self, big_endian: bool) -> Vec<u8> {
        let buf1_len = self.buf1.len().min(MAX_BUF1);
        let mut out = Vec::with_capacity(HEAD_SIZE + self.buf.len() + buf1_len);
        out.push(self.cmd);
        out.push(self.arg1);
        out.push(self.arg2);
        out.push(buf1_len as u8);
        let mut len = [0u8; 4];
        if big_endian {
            BigEndian::write_u32(&mut len, self.buf.len() as u32);
        } else {
            LittleEndian::write_u32(&mut len, self.buf.len() as u32);
        }
        out.extend_from_slice(&len);
        out.extend_from_slice(&self.buf);
        out.extend_from_slice(&self.buf1[..buf1_len]);
        out
    }

    pub fn decode(data: &[u8], big_endian: bool) -> Result<Command> {
        if data.len() < HEAD_SIZE {
            return Err(Error::TruncatedFrame {
                need: HEAD_SIZE,
                have: data.len(),
            });
        }
        let buf1_len = data[3] as usize;
        let buf_len = if big_endian {
            BigEndian::read_u32(&data[4..8])
        } else {
            LittleEndian::read_u32(&data[4..8])
        } as usize;
        let need = HEAD_SIZE + buf_len + buf1_len;
        if data.len() < need {
            return Err(Error::TruncatedFrame {
                need,
                have: data.len(),
            });
        }
        Ok(Command {
            cmd: data[0],
            arg1: data[1],
            arg2: data[2],
            buf: data[HEAD_SIZE..HEAD_SIZE + buf_len].to_vec(),
            buf1: data[HEAD_SIZE + buf_len..need].to_vec(),
        })
    }

    /// Decode only the payload lengths from a server header. Server headers
    /// always carry the 32-bit length little-endian.
    pub fn decode_head(data: &[u8]) -> Result<(usize, usize)> {
        if data.len() < HEAD_SIZE {
            return Err(Error::TruncatedFrame {
                need: HEAD_SIZE,
                have: data.len(),
            });
        }
        let buf1_len = data[3] as usize;
        let buf_len = LittleEndian::read_u32(&data[4..8]) as usize;
        Ok((buf_len, buf1_len))
    }

    pub fn buf_str(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }

    /// True for the empty placeholder the connection returns for
    /// deferred commands.
    pub fn is_none(&self) -> bool {
        self.cmd == CMD_NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codes::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let cmd = Command::with_bufs(CMD_SEARCH_GET_RESULT, 0, 5, "hello world", "page");
        let data = cmd.encode(false);
        assert_eq!(data.len(), HEAD_SIZE + 11 + 4);
        let back = Command::decode(&data, false).unwrap();
        assert_eq!(back, cmd);
    }

    #[test]
    fn test_encode_big_endian_length() {
        let cmd = Command::with_buf(CMD_USE, 0, "demo");
        let le = cmd.encode(false);
        let be = cmd.encode(true);
        assert_eq!(&le[4..8], &[4, 0, 0, 0]);
        assert_eq!(&be[4..8], &[0, 0, 0, 4]);
        let back = Command::decode(&be, true).unwrap();
        assert_eq!(back.buf, b"demo");
    }

    #[test]
    fn test_buf1_truncated_to_255() {
        let mut cmd = Command::new(CMD_INDEX_REMOVE);
        cmd.buf1 = vec![b'x'; 300];
        let data = cmd.encode(false);
        assert_eq!(data[3], 255);
        assert_eq!(data.len(), HEAD_SIZE + 255);
        let back = Command::decode(&data, false).unwrap();
        assert_eq!(back.buf1.len(), 255);
    }

    #[test]
    fn test_decode_short_input() {
        assert!(Command::decode(&[1, 2, 3], false).is_err());
        // header declares more payload than is present
        let mut cmd = Command::with_buf(CMD_USE, 0, "payload");
        cmd.buf1 = b"aux".to_vec();
        let data = cmd.encode(false);
        assert!(Command::decode(&data[..data.len() - 1], false).is_err());
        assert!(Command::decode(&data[..HEAD_SIZE], false).is_err());
    }

    #[test]
    fn test_arg_bijection() {
        for arg in [0u16, 1, 0xff, 0x100, 0x1234, 201, 0xffff] {
            let mut cmd = Command::new(CMD_NONE);
            cmd.set_arg(arg);
            assert_eq!(cmd.arg(), arg);
        }
        let mut cmd = Command::new(CMD_NONE);
        cmd.set_arg(65535);
        assert_eq!(cmd.arg1, 0xff);
        assert_eq!(cmd.arg2, 0xff);
    }

    #[test]
    fn test_decode_head() {
        let mut cmd = Command::with_buf(CMD_OK, CMD_OK_RESULT_BEGIN, "abcdef");
        cmd.buf1 = b"xy".to_vec();
        let data = cmd.encode(false);
        let (buf_len, buf1_len) = Command::decode_head(&data[..HEAD_SIZE]).unwrap();
        assert_eq!(buf_len, 6);
        assert_eq!(buf1_len, 2);
        assert!(Command::decode_head(&data[..4]).is_err());
    }

    #[test]
    fn test_use_project() {
        let cmd = Command::use_project("demo", "");
        assert_eq!(cmd.cmd, CMD_USE);
        assert_eq!(cmd.buf, b"demo");
        assert!(cmd.buf1.is_empty());
        let cmd = Command::use_project("demo", "/var/lib/scout");
        assert_eq!(cmd.buf1, b"/var/lib/scout");
    }
}
