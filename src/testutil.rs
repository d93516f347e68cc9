//! In-process scripted server for exchange tests.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::protocol::codes::*;
use crate::protocol::{Command, HEAD_SIZE};

/// A single-connection TCP server that records every frame it receives
/// and answers with whatever the responder closure returns.
pub(crate) struct MockServer {
    pub addr: String,
    frames: Arc<Mutex<Vec<Command>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockServer {
    pub fn start<F>(mut responder: F) -> MockServer
    where
        F: FnMut(&Command) -> Vec<Command> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let frames: Arc<Mutex<Vec<Command>>> = Arc::new(Mutex::new(Vec::new()));
        let recorded = frames.clone();
        let handle = thread::spawn(move || {
            let (mut stream, _) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(_) => return,
            };
            loop {
                let frame = match read_frame(&mut stream) {
                    Ok(frame) => frame,
                    Err(_) => break,
                };
                if frame.cmd == CMD_QUIT {
                    break;
                }
                let replies = responder(&frame);
                recorded.lock().push(frame);
                for reply in replies {
                    if stream.write_all(&reply.encode(false)).is_err() {
                        return;
                    }
                }
            }
        });
        MockServer {
            addr,
            frames,
            handle: Some(handle),
        }
    }

    /// Join the server thread and return everything it received
    /// (the closing QUIT excluded). Call after the client disconnected.
    pub fn frames(&mut self) -> Vec<Command> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.frames.lock().clone()
    }
}

pub(crate) fn read_frame(stream: &mut TcpStream) -> std::io::Result<Command> {
    let mut head = [0u8; HEAD_SIZE];
    stream.read_exact(&mut head)?;
    let (buf_len, buf1_len) = Command::decode_head(&head)
        .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidData))?;
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

pub(crate) fn ok(arg: u16) -> Command {
    Command::with_arg(CMD_OK, arg)
}

pub(crate) fn ok_buf(arg: u16, buf: impl Into<Vec<u8>>) -> Command {
    Command::with_buf(CMD_OK, arg, buf)
}

/// Replies that cover the connect handshake shared by both facades.
pub(crate) fn handshake(frame: &Command) -> Option<Vec<Command>> {
    match frame.cmd {
        CMD_TIMEOUT => Some(vec![ok(CMD_OK_TIMEOUT_SET)]),
        CMD_USE => Some(vec![ok(CMD_OK_PROJECT)]),
        _ => None,
    }
}
