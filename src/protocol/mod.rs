//! Wire protocol: frame codec, payload packing and the command vocabulary.

pub mod codes;
pub mod command;
pub mod pack;

pub use command::{Command, HEAD_SIZE, MAX_BUF1};
pub use pack::{pack_u16_be, pack_u32_pair, unpack_u32, Unpacker};
