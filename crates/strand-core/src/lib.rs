#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `strand-core`：把字符串当作字节流读写时所依赖的核心契约。
//!
//! # 模块定位（Why）
//! - 字符串流的三种适配器（只读、只写、双工）共享同一套错误域、编码表与配置入口，
//!   集中定义在本 crate，`strand-buffer` 与 `strand-stream` 只负责落地实现；
//! - 宿主流基座（分块拉取、推送完成回调、结束信号）在这里以最小同步形态给出，
//!   使适配器只需实现 [`flow::Pullable`] / [`flow::Pushable`] 两个能力接口。
//!
//! # 结构概览（How）
//! - [`error`]：`StreamError` 与稳定错误码；
//! - [`encoding`]：封闭的编码枚举及别名解析、文本与字节的互转；
//! - [`options`]：构造参数、Builder 与 TOML 装载；
//! - [`flow`]：读队列、读写两半的宿主逻辑以及能力 trait；
//! - [`stream`]：面向调用方的公共 trait（内容检视、读取、写入）。
//!
//! # 契约说明（What）
//! - 所有操作同步执行，单一实例不支持跨线程并发访问；
//! - 错误一律经由返回值或推送完成句柄上报，不在内部重试。

pub mod encoding;
pub mod error;
pub mod flow;
pub mod options;
pub mod stream;

pub use encoding::Encoding;
pub use error::{Result, StreamError};
pub use flow::{
    Completion, PullOutcome, Pullable, Pushable, ReadHalf, ReadQueue, ReadState, WriteChunk,
    WriteHalf, WriteInput, WriteState,
};
pub use options::{DEFAULT_HIGH_WATER_MARK, MAX_BUFFER_LENGTH, StreamOptions, StreamOptionsBuilder};
pub use stream::{DEFAULT_READ_SIZE, ReadStream, StringStream, WriteStream};
