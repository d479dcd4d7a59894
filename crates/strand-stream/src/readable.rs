use core::fmt;

use bytes::Bytes;
use strand_buffer::FixedContent;
use strand_core::{
    Encoding, ReadHalf, ReadState, ReadStream, Result, StreamOptions, StringStream,
};
use tracing::debug;

/// 只读字符串流。
///
/// # 设计说明
/// - 内容在构造时一次性按编码转为字节，之后不再变化，因此写游标恒等于内容长度，
///   读取直接对共享 `Bytes` 零拷贝切片；
/// - 原始文本另行保存，以默认编码渲染时原样返回，只有换用其他编码时才从字节重新渲染；
/// - 高水位默认取内容字节数（至少为 1）。
pub struct ReadableStringStream {
    text: String,
    encoding: Encoding,
    source: FixedContent,
    reader: ReadHalf,
}

impl ReadableStringStream {
    /// 以 UTF-8 创建只读流。
    pub fn new(content: impl Into<String>) -> Result<Self> {
        Self::with_encoding(content, Encoding::Utf8)
    }

    /// 以指定编码创建只读流，高水位取内容字节数。
    pub fn with_encoding(content: impl Into<String>, encoding: Encoding) -> Result<Self> {
        let text = content.into();
        let bytes = encoding.to_bytes(&text)?;
        let options = StreamOptions::builder()
            .encoding(encoding)
            .high_water_mark(bytes.len().max(1))
            .build()?;
        Ok(Self::assemble(text, bytes, &options))
    }

    /// 以完整参数创建只读流。
    pub fn with_options(content: impl Into<String>, options: StreamOptions) -> Result<Self> {
        let text = content.into();
        let bytes = options.encoding().to_bytes(&text)?;
        Ok(Self::assemble(text, bytes, &options))
    }

    fn assemble(text: String, bytes: Bytes, options: &StreamOptions) -> Self {
        debug!(
            stream = Self::TAG,
            len = bytes.len(),
            encoding = %options.encoding(),
            "readable stream created"
        );
        Self {
            text,
            encoding: options.encoding(),
            source: FixedContent::new(bytes),
            reader: ReadHalf::new(options.high_water_mark()),
        }
    }

    /// 已交付字节的上界。
    pub fn read_index(&self) -> usize {
        self.source.cursor().read_index()
    }
}

impl StringStream for ReadableStringStream {
    const TAG: &'static str = "ReadableStringStream";

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn to_string_with(&self, encoding: Encoding) -> String {
        if encoding == self.encoding {
            self.text.clone()
        } else {
            encoding.to_text(self.source.content())
        }
    }

    fn byte_len(&self) -> usize {
        self.source.content().len()
    }
}

impl ReadStream for ReadableStringStream {
    fn read_bytes(&mut self, count: usize) -> Option<Bytes> {
        self.reader.read(count, &mut self.source)
    }

    fn read_state(&self) -> ReadState {
        if !self.reader.queue().is_empty() || self.source.pending() > 0 {
            ReadState::HasData
        } else {
            ReadState::Ended
        }
    }

    fn read_high_water_mark(&self) -> usize {
        self.reader.queue().high_water_mark()
    }
}

impl fmt::Display for ReadableStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl fmt::Debug for ReadableStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(Self::TAG)
            .field("encoding", &self.encoding)
            .field("read_index", &self.read_index())
            .field("len", &self.byte_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_water_mark_defaults_to_content_length() {
        let stream = ReadableStringStream::new("Hello World!").unwrap();
        assert_eq!(stream.read_high_water_mark(), 12);
        let empty = ReadableStringStream::new("").unwrap();
        assert_eq!(empty.read_high_water_mark(), 1);
    }

    #[test]
    fn same_encoding_returns_original_text() {
        // hex 解码会小写化，原文本应原样保留。
        let stream = ReadableStringStream::with_encoding("4A4b", Encoding::Hex).unwrap();
        assert_eq!(stream.content(), "4A4b");
        assert_eq!(stream.to_string_with(Encoding::Utf8), "JK");
        assert_eq!(stream.to_string_with(Encoding::Hex), "4A4b");
    }
}
