//! `strand-buffer` 为 `strand-core` 的读写契约提供具体的存储实现。
//!
//! # 模块定位（Why）
//! - 可写流（双工、只写）共享同一块可增长缓冲，可读流（双工、只读）共享同一套读游标协议；
//! - 这两部分是字符串流中唯一带不变量与失败路径的代码，单独成 crate 便于集中测试。
//!
//! # 设计概要（How）
//! - `growable` 模块实现 [`GrowableBuffer`]：固定容量区域、倍增扩容、追加填充，
//!   并实现 [`Pushable`](strand_core::Pushable) 作为写入汇；
//! - `cursor` 模块实现 [`ReadCursor`]：按请求长度切片、交付、推进并在耗尽时发出结束标记；
//!   [`FixedContent`] 是内容固定的只读特化。
//!
//! # 不变量（What）
//! - `0 <= read_index <= write_index <= capacity` 在任何一次推送或拉取之后成立；
//! - 两个游标单调不减，缓冲只增不缩。

mod cursor;
mod growable;

pub use cursor::{FixedContent, ReadCursor};
pub use growable::{GrowableBuffer, Growth};
