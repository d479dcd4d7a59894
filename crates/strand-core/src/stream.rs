//! 面向调用方的流契约。
//!
//! - [`StringStream`]：内容检视与按需重新渲染；
//! - [`ReadStream`]：按块读取；
//! - [`WriteStream`]：写入与结束。

use bytes::Bytes;

use crate::encoding::Encoding;
use crate::error::Result;
use crate::flow::{ReadState, WriteInput, WriteState};

/// 未指定长度时的默认读取字节数。
pub const DEFAULT_READ_SIZE: usize = 1;

/// 所有字符串流共享的检视接口。
pub trait StringStream {
    /// 类型标签，出现在错误与日志中。
    const TAG: &'static str;

    /// 构造时确定的默认编码。
    fn encoding(&self) -> Encoding;

    /// 以指定编码重新渲染全部已存储内容，不修改内部状态。
    fn to_string_with(&self, encoding: Encoding) -> String;

    /// 已存储字节数。
    fn byte_len(&self) -> usize;

    /// 以默认编码渲染的全部内容。
    fn content(&self) -> String {
        self.to_string_with(self.encoding())
    }

    /// `content()` 的字符数。
    fn len(&self) -> usize {
        self.content().chars().count()
    }

    /// 是否没有任何已存储字节。
    fn is_empty(&self) -> bool {
        self.byte_len() == 0
    }
}

/// 可读流。
pub trait ReadStream: StringStream {
    /// 读取至多 `count` 字节的原始分块。
    ///
    /// `None` 表示暂无数据（[`ReadState::Drained`]）或已结束（[`ReadState::Ended`]）。
    fn read_bytes(&mut self, count: usize) -> Option<Bytes>;

    /// 读侧状态。
    fn read_state(&self) -> ReadState;

    /// 读侧高水位，亦是管道转发时的分块大小。
    fn read_high_water_mark(&self) -> usize;

    /// 读取至多 `count` 字节并以默认编码渲染。
    ///
    /// 分块按字节切分，多字节字符可能被拆开；需要逐字符正确时，请按字符边界选择
    /// `count` 或一次读取全部内容。
    fn read(&mut self, count: usize) -> Option<String> {
        let chunk = self.read_bytes(count)?;
        Some(self.encoding().to_text(&chunk))
    }

    /// 以 [`DEFAULT_READ_SIZE`] 读取。
    fn read_next(&mut self) -> Option<String> {
        self.read(DEFAULT_READ_SIZE)
    }
}

/// 可写流。
pub trait WriteStream: StringStream {
    /// 写入一个分块，文本按默认编码转为字节。
    fn write(&mut self, input: impl Into<WriteInput>) -> Result<()>;

    /// 写入最后一个分块并结束写侧。
    fn end(&mut self, input: impl Into<WriteInput>) -> Result<()>;

    /// 不携带数据地结束写侧。
    fn finish(&mut self) -> Result<()>;

    /// 写侧状态。
    fn write_state(&self) -> WriteState;
}
