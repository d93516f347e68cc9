//! Blocking connection to an index or search server.
//!
//! A connection owns one TCP stream plus a coalescing write buffer.
//! Deferred commands (bit 7 set) are only appended to the buffer; the
//! whole buffer is written in one piece when the next reply-requiring
//! command executes. A mutex serializes exchanges so a shared connection
//! never has more than one request in flight.

use std::io::{BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::codes::*;
use crate::protocol::{Command, HEAD_SIZE};

pub struct Connection {
    inner: Mutex<Inner>,
}

struct Inner {
    stream: Option<BufReader<TcpStream>>,
    wbuf: Vec<u8>,
    big_endian: bool,
}

impl Connection {
    pub fn connect<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> Result<Connection> {
        let stream = TcpStream::connect(&addr)?;
        stream.set_nodelay(true)?;
        debug!(?addr, "connected");
        Ok(Connection {
            inner: Mutex::new(Inner {
                stream: Some(BufReader::new(stream)),
                wbuf: Vec::new(),
                big_endian: false,
            }),
        })
    }

    /// Use big-endian 32-bit payload lengths on outgoing headers.
    pub fn set_big_endian(&self, big_endian: bool) {
        self.inner.lock().big_endian = big_endian;
    }

    /// Execute one command. Deferred commands are buffered and an empty
    /// placeholder reply is returned immediately; everything else flushes
    /// the buffer and reads exactly one validated reply.
    ///
    /// `expect_cmd` / `expect_arg` of zero skip the respective check.
    pub fn exec(&self, cmd: &Command, expect_cmd: u8, expect_arg: u16) -> Result<Command> {
        self.inner.lock().exec(cmd, expect_cmd, expect_arg)
    }

    /// `exec` expecting an `OK` reply with the given argument.
    pub fn exec_ok(&self, cmd: &Command, expect_arg: u16) -> Result<Command> {
        self.exec(cmd, CMD_OK, expect_arg)
    }

    /// Read one frame without sending anything. Used to drain the result
    /// stream after a `RESULT_BEGIN` acknowledgement.
    pub fn stream_reply(&self) -> Result<Command> {
        let mut inner = self.inner.lock();
        let stream = inner.stream.as_mut().ok_or(Error::Closed)?;
        read_frame(stream)
    }

    /// Ask the server to keep the session alive for `secs` seconds of
    /// inactivity; zero disables the server-side timeout.
    pub fn set_timeout(&self, secs: u16) -> Result<()> {
        self.exec_ok(&Command::with_arg(CMD_TIMEOUT, secs), CMD_OK_TIMEOUT_SET)?;
        Ok(())
    }

    /// Close the connection, announcing the quit to the server on a best
    /// effort basis. Safe to call more than once.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(reader) = inner.stream.take() {
            let mut sock: &TcpStream = reader.get_ref();
            let _ = sock.write_all(&Command::new(CMD_QUIT).encode(inner.big_endian));
            let _ = sock.shutdown(Shutdown::Both);
            debug!("connection closed");
        }
        inner.wbuf.clear();
        Ok(())
    }
}

impl Inner {
    fn exec(&mut self, cmd: &Command, expect_cmd: u8, expect_arg: u16) -> Result<Command> {
        if self.stream.is_none() {
            return Err(Error::Closed);
        }
        self.wbuf.extend_from_slice(&cmd.encode(self.big_endian));
        if cmd.is_deferred() {
            return Ok(Command::default());
        }
        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Err(Error::Closed),
        };
        {
            let mut sock: &TcpStream = stream.get_ref();
            sock.write_all(&self.wbuf)?;
        }
        self.wbuf.clear();
        let reply = read_frame(stream)?;
        if reply.cmd == CMD_ERR {
            return Err(Error::Server {
                code: reply.arg(),
                message: reply.buf_str(),
            });
        }
        if (expect_cmd != CMD_NONE && reply.cmd != expect_cmd)
            || (expect_arg != 0 && reply.arg() != expect_arg)
        {
            return Err(Error::UnexpectedReply {
                expected_cmd: expect_cmd,
                expected_arg: expect_arg,
                cmd: reply.cmd,
                arg: reply.arg(),
            });
        }
        Ok(reply)
    }
}

/// Read one server frame: 8-byte head, then both payloads to completion.
fn read_frame(stream: &mut BufReader<TcpStream>) -> Result<Command> {
    let mut head = [0u8; HEAD_SIZE];
    stream.read_exact(&mut head)?;
    let (buf_len, buf1_len) = Command::decode_head(&head)?;
    let mut buf = vec![0u8; buf_len];
    stream.read_exact(&mut buf)?;
    let mut buf1 = vec![0u8; buf1_len];
    stream.read_exact(&mut buf1)?;
    Ok(Command {
        cmd: head[0],
        arg1: head[1],
        arg2: head[2],
        buf,
        buf1,
    })
}
