#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `strand-stream` 把一段字符串呈现为普通字节流：可按块拉取、可增量写入，并以显式的结束信号收尾。
//!
//! # 使用概览（How）
//! - [`ReadableStringStream`]：内容固定，逐块读取；
//! - [`WritableStringStream`]：增量写入，随时以 `content()` 取回拼接结果；
//! - [`DuplexStringStream`]：回环流，写入的字节可被同一实例读出；
//! - [`pipe`]：把可读流的全部可用数据转写到可写流，源结束时一并结束目标。
//!
//! ```rust
//! use strand_stream::{DuplexStringStream, ReadStream, StringStream, WriteStream};
//!
//! let mut stream = DuplexStringStream::new();
//! stream.write("Hello ").expect("写入");
//! stream.end("World!").expect("结束");
//! let mut text = String::new();
//! while let Some(chunk) = stream.read_next() {
//!     text.push_str(&chunk);
//! }
//! assert_eq!(text, "Hello World!");
//! assert_eq!(stream.content(), "Hello World!");
//! ```
//!
//! # 合约说明（What）
//! - 每个实例在构造时绑定一种编码，写入的文本按该编码转为字节，读取与渲染按该编码还原；
//! - 读取按字节切块，多字节字符可能跨块，需要逐块正确时请按字符边界选择读取长度；
//! - 实例只面向单一调用线程，不提供内部同步。

mod duplex;
mod pipe;
mod readable;
mod writable;

pub use duplex::DuplexStringStream;
pub use pipe::{PipeError, PipeOutcome, pipe};
pub use readable::ReadableStringStream;
pub use writable::WritableStringStream;

pub use strand_core::{
    Encoding, ReadState, ReadStream, Result, StreamError, StreamOptions, StringStream,
    WriteInput, WriteState, WriteStream,
};
