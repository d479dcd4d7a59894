//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 字符串流只有少数确定性的失败路径：扩容越过上限、收到未解码的文本块、构造参数非法、
//!   结束后继续写入、编码转换失败，以及写入汇未发出完成信号；
//! - 这些路径都不存在“瞬时失败”，因此不携带重试建议，只给出稳定错误码与可读描述。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，与 `std::error::Error` 生态兼容；
//! - 每个变体对应 [`codes`] 中的一个稳定码值，日志与断言以码值为准而非消息文本。

use std::borrow::Cow;

use thiserror::Error;

use crate::encoding::Encoding;

/// 稳定错误码表，遵循 `<域>.<语义>` 命名约定。
pub mod codes {
    /// 扩容请求超过允许的最大缓冲长度。
    pub const BUFFER_OVERFLOW: &str = "stream.buffer_overflow";
    /// 写入侧收到了未经解码的文本块。
    pub const NOT_IMPLEMENTED: &str = "stream.not_implemented";
    /// 构造参数或编码名称非法。
    pub const INVALID_CONFIGURATION: &str = "stream.invalid_configuration";
    /// 写入侧已结束后仍有写入请求。
    pub const WRITE_AFTER_END: &str = "stream.write_after_end";
    /// 文本与字节之间的转换失败。
    pub const TRANSCODE_FAILED: &str = "stream.transcode_failed";
    /// 写入汇返回前没有发出完成信号。
    pub const COMPLETION_MISSING: &str = "stream.completion_missing";
}

/// 字符串流错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把缓冲、编码与宿主三处的失败收敛为同一枚举，调用方用 `?` 即可传播；
/// - **契约 (What)**：
///   - 所有变体 `Send + Sync + 'static`，可安全跨线程移动；
///   - 失败的写入不会修改已有内容，调用方仍可通过 `content()` 观察之前的数据；
/// - **执行逻辑 (How)**：[`StreamError::code`] 将变体映射为 [`codes`] 中的稳定码值。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum StreamError {
    /// 扩容时倍增得到的容量超出上限。
    ///
    /// - `attempted`：倍增过程中第一次越界的候选容量；
    /// - `max`：允许的最大缓冲长度。
    #[error("the requested buffer size of {attempted} exceeds maximum buffer size of {max}")]
    Overflow {
        /// 越界的候选容量。
        attempted: usize,
        /// 允许的最大缓冲长度。
        max: usize,
    },

    /// 写入侧收到文本块而非字节块。
    ///
    /// 只有在关闭 `decode_strings` 时才会出现，适配器要求宿主先把文本编码为字节。
    #[error("{operation} has not been implemented yet")]
    NotImplemented {
        /// 触发错误的操作描述。
        operation: Cow<'static, str>,
    },

    /// 构造参数非法：未知编码名、零高水位、上限小于高水位或配置文本无法解析。
    #[error("invalid stream configuration `{field}`: {detail}")]
    Configuration {
        /// 出错的配置项名称。
        field: &'static str,
        /// 人类可读的原因。
        detail: String,
    },

    /// 写入侧已经结束，拒绝后续写入。
    #[error("{stream}: write after end")]
    WriteAfterEnd {
        /// 流的类型标签。
        stream: &'static str,
    },

    /// 写入汇返回前既未上报成功也未上报失败，写入结果未知。
    #[error("{stream}: push returned without signalling completion")]
    CompletionMissing {
        /// 流的类型标签。
        stream: &'static str,
    },

    /// 文本转字节失败。
    #[error("failed to transcode text as {encoding}: {detail}")]
    Transcode {
        /// 使用的编码。
        encoding: Encoding,
        /// 底层编解码器给出的描述。
        detail: String,
    },
}

impl StreamError {
    /// 构造配置错误的便捷入口。
    pub fn configuration(field: &'static str, detail: impl Into<String>) -> Self {
        StreamError::Configuration {
            field,
            detail: detail.into(),
        }
    }

    /// 返回变体对应的稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::Overflow { .. } => codes::BUFFER_OVERFLOW,
            StreamError::NotImplemented { .. } => codes::NOT_IMPLEMENTED,
            StreamError::Configuration { .. } => codes::INVALID_CONFIGURATION,
            StreamError::WriteAfterEnd { .. } => codes::WRITE_AFTER_END,
            StreamError::Transcode { .. } => codes::TRANSCODE_FAILED,
            StreamError::CompletionMissing { .. } => codes::COMPLETION_MISSING,
        }
    }
}

/// 本 crate 统一的结果别名。
pub type Result<T, E = StreamError> = core::result::Result<T, E>;
