//! 构造参数：高水位、默认编码、文本解码开关与缓冲上限。
//!
//! # 设计概要（How）
//! - [`StreamOptions`] 只能经 [`StreamOptionsBuilder::build`] 或 [`StreamOptions::from_toml_str`]
//!   得到，两条路径共享同一套校验，非法参数不会产出可用实例；
//! - 编码名称在构建时解析一次，之后不再重复查表。

use serde::Deserialize;

use crate::encoding::Encoding;
use crate::error::{Result, StreamError};

/// 默认高水位：1 KiB。
pub const DEFAULT_HIGH_WATER_MARK: usize = 1024;

/// 平台允许的最大单次分配长度。
pub const MAX_BUFFER_LENGTH: usize = isize::MAX as usize;

/// 流实例的构造参数。
///
/// # 契约说明（What）
/// - `high_water_mark`：初始分配容量，同时作为读侧背压阈值，必须为正；
/// - `encoding`：实例默认编码，生命周期内不可变；
/// - `decode_strings`：写入文本时是否先按编码转为字节，关闭后文本写入会得到
///   [`StreamError::NotImplemented`]；
/// - `max_capacity`：扩容上限，不得小于 `high_water_mark`。
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StreamOptions {
    high_water_mark: usize,
    encoding: Encoding,
    decode_strings: bool,
    max_capacity: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            encoding: Encoding::Utf8,
            decode_strings: true,
            max_capacity: MAX_BUFFER_LENGTH,
        }
    }
}

impl StreamOptions {
    /// 创建 Builder，初始值与 [`Default`] 一致。
    pub fn builder() -> StreamOptionsBuilder {
        StreamOptionsBuilder::default()
    }

    /// 从 TOML 文本装载参数，未出现的字段取默认值，未知字段视为错误。
    ///
    /// ```rust
    /// use strand_core::{Encoding, StreamOptions};
    ///
    /// let options = StreamOptions::from_toml_str("high_water_mark = 16\nencoding = \"ucs2\"")
    ///     .expect("合法配置");
    /// assert_eq!(options.high_water_mark(), 16);
    /// assert_eq!(options.encoding(), Encoding::Utf16Le);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawOptions = toml::from_str(source)
            .map_err(|err| StreamError::configuration("toml", err.message().to_owned()))?;
        let mut builder = StreamOptions::builder()
            .high_water_mark(raw.high_water_mark)
            .decode_strings(raw.decode_strings)
            .max_capacity(raw.max_capacity);
        if let Some(name) = raw.encoding {
            builder = builder.encoding_name(&name)?;
        }
        builder.build()
    }

    /// 替换默认编码；编码不参与校验，因此无需重新构建。
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// 高水位。
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// 默认编码。
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// 写入文本时是否先转为字节。
    pub fn decode_strings(&self) -> bool {
        self.decode_strings
    }

    /// 扩容上限。
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }
}

/// [`StreamOptions`] 的流式构建器。
#[derive(Clone, Debug, Default)]
pub struct StreamOptionsBuilder {
    options: StreamOptions,
}

impl StreamOptionsBuilder {
    /// 设置高水位。
    pub fn high_water_mark(mut self, high_water_mark: usize) -> Self {
        self.options.high_water_mark = high_water_mark;
        self
    }

    /// 设置默认编码。
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.options.encoding = encoding;
        self
    }

    /// 按名称设置默认编码，别名在此解析。
    pub fn encoding_name(self, name: &str) -> Result<Self> {
        Ok(self.encoding(Encoding::from_name(name)?))
    }

    /// 设置文本解码开关。
    pub fn decode_strings(mut self, decode_strings: bool) -> Self {
        self.options.decode_strings = decode_strings;
        self
    }

    /// 设置扩容上限。
    pub fn max_capacity(mut self, max_capacity: usize) -> Self {
        self.options.max_capacity = max_capacity;
        self
    }

    /// 校验并产出参数。
    ///
    /// # 错误
    /// - `high_water_mark == 0`；
    /// - `max_capacity > MAX_BUFFER_LENGTH`；
    /// - `max_capacity < high_water_mark`。
    pub fn build(self) -> Result<StreamOptions> {
        let options = self.options;
        if options.high_water_mark == 0 {
            return Err(StreamError::configuration(
                "high_water_mark",
                "must be a positive integer",
            ));
        }
        if options.max_capacity > MAX_BUFFER_LENGTH {
            return Err(StreamError::configuration(
                "max_capacity",
                format!(
                    "{} exceeds the largest allocation {MAX_BUFFER_LENGTH}",
                    options.max_capacity
                ),
            ));
        }
        if options.max_capacity < options.high_water_mark {
            return Err(StreamError::configuration(
                "max_capacity",
                format!(
                    "{} is below the high water mark {}",
                    options.max_capacity, options.high_water_mark
                ),
            ));
        }
        Ok(options)
    }
}

#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawOptions {
    high_water_mark: usize,
    encoding: Option<String>,
    decode_strings: bool,
    max_capacity: usize,
}

impl Default for RawOptions {
    fn default() -> Self {
        let defaults = StreamOptions::default();
        Self {
            high_water_mark: defaults.high_water_mark,
            encoding: None,
            decode_strings: defaults.decode_strings,
            max_capacity: defaults.max_capacity,
        }
    }
}
