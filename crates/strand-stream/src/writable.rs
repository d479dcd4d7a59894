use core::fmt;

use strand_buffer::GrowableBuffer;
use strand_core::{
    Encoding, Result, StreamOptions, StringStream, WriteHalf, WriteInput, WriteState, WriteStream,
};

/// 只写字符串流：把每次写入追加到可增长缓冲，随时可整体渲染。
pub struct WritableStringStream {
    buffer: GrowableBuffer,
    writer: WriteHalf,
    encoding: Encoding,
}

impl WritableStringStream {
    /// 默认参数：UTF-8，1 KiB 初始容量。
    pub fn new() -> Self {
        Self::with_encoding(Encoding::Utf8)
    }

    /// 以指定编码创建，其余参数取默认值。
    pub fn with_encoding(encoding: Encoding) -> Self {
        let options = StreamOptions::default().with_encoding(encoding);
        Self::assemble(GrowableBuffer::default(), &options)
    }

    /// 以完整参数创建，初始容量取高水位。
    ///
    /// # 错误
    /// - 初始区域无法分配时返回 [`StreamError::Overflow`](strand_core::StreamError::Overflow)。
    pub fn with_options(options: StreamOptions) -> Result<Self> {
        Ok(Self::assemble(GrowableBuffer::new(&options)?, &options))
    }

    fn assemble(buffer: GrowableBuffer, options: &StreamOptions) -> Self {
        Self {
            buffer,
            writer: WriteHalf::new(Self::TAG, options),
            encoding: options.encoding(),
        }
    }

    /// 当前缓冲容量。
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// 累计重新分配次数。
    pub fn reallocations(&self) -> usize {
        self.buffer.reallocations()
    }

    /// 写游标。
    pub fn write_index(&self) -> usize {
        self.buffer.write_index()
    }
}

impl Default for WritableStringStream {
    fn default() -> Self {
        Self::new()
    }
}

impl StringStream for WritableStringStream {
    const TAG: &'static str = "WritableStringStream";

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn to_string_with(&self, encoding: Encoding) -> String {
        encoding.to_text(self.buffer.as_slice())
    }

    fn byte_len(&self) -> usize {
        self.buffer.write_index()
    }
}

impl WriteStream for WritableStringStream {
    fn write(&mut self, input: impl Into<WriteInput>) -> Result<()> {
        self.writer.write(input.into(), &mut self.buffer)
    }

    fn end(&mut self, input: impl Into<WriteInput>) -> Result<()> {
        self.writer.end(Some(input.into()), &mut self.buffer)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.end(None, &mut self.buffer)
    }

    fn write_state(&self) -> WriteState {
        self.writer.state()
    }
}

impl fmt::Display for WritableStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content())
    }
}

impl fmt::Debug for WritableStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(Self::TAG)
            .field("encoding", &self.encoding)
            .field("state", &self.writer.state())
            .field("buffer", &self.buffer)
            .finish()
    }
}
