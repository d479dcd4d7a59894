use core::fmt;

use bytes::Bytes;
use strand_buffer::{GrowableBuffer, ReadCursor};
use strand_core::{
    Completion, Encoding, PullOutcome, Pullable, Pushable, ReadHalf, ReadQueue, ReadState,
    ReadStream, Result, StreamOptions, StringStream, WriteChunk, WriteHalf, WriteInput,
    WriteState, WriteStream,
};
use tracing::debug;

/// 双工内核：一块缓冲、两个游标。
///
/// 写入经 [`GrowableBuffer`] 追加并推进写游标，读取经 [`ReadCursor`] 切片并推进读游标；
/// 写游标始终不小于读游标。
struct DuplexCore {
    buffer: GrowableBuffer,
    cursor: ReadCursor,
    write_closed: bool,
}

impl DuplexCore {
    fn check_invariants(&self) {
        debug_assert!(self.cursor.read_index() <= self.buffer.write_index());
        debug_assert!(self.buffer.write_index() <= self.buffer.capacity());
    }
}

impl Pullable for DuplexCore {
    fn pull(&mut self, requested: usize, queue: &mut ReadQueue) -> PullOutcome {
        let outcome = self
            .cursor
            .pull(self.buffer.as_slice(), self.write_closed, requested, queue);
        self.check_invariants();
        outcome
    }
}

impl Pushable for DuplexCore {
    fn push(&mut self, chunk: WriteChunk, encoding: Encoding, completion: Completion<'_>) {
        self.buffer.push(chunk, encoding, completion);
        self.check_invariants();
    }

    fn finish(&mut self) {
        self.write_closed = true;
    }
}

/// 双工字符串流，本质上是回环：写入的字节可按顺序读出。
///
/// # 状态机
/// - 写侧 `Open -> Ended`，由 `end`/`finish` 触发；
/// - 读侧 `HasData <-> Drained -> Ended`：读尽但写侧仍开放时为 `Drained`，
///   只有写侧结束且读游标追上写游标时才发出结束标记；
/// - 写侧结束不会丢弃尚未读取的数据（半开放）。
pub struct DuplexStringStream {
    core: DuplexCore,
    reader: ReadHalf,
    writer: WriteHalf,
    encoding: Encoding,
}

impl DuplexStringStream {
    /// 空内容、默认参数。
    pub fn new() -> Self {
        let options = StreamOptions::default();
        Self::assemble(GrowableBuffer::default(), &options)
    }

    /// 以 UTF-8 初始内容创建。
    pub fn with_content(content: &str) -> Result<Self> {
        Self::with_options(content, StreamOptions::default())
    }

    /// 以初始内容与完整参数创建。
    ///
    /// 初始内容按编码转为字节后写入缓冲，容量从高水位倍增到足以容纳为止。
    pub fn with_options(content: &str, options: StreamOptions) -> Result<Self> {
        let seed = options.encoding().to_bytes(content)?;
        let buffer = GrowableBuffer::with_seed(&seed, &options)?;
        Ok(Self::assemble(buffer, &options))
    }

    fn assemble(buffer: GrowableBuffer, options: &StreamOptions) -> Self {
        debug!(
            stream = Self::TAG,
            capacity = buffer.capacity(),
            seeded = buffer.write_index(),
            encoding = %options.encoding(),
            "duplex stream created"
        );
        Self {
            core: DuplexCore {
                buffer,
                cursor: ReadCursor::new(),
                write_closed: false,
            },
            reader: ReadHalf::new(options.high_water_mark()),
            writer: WriteHalf::new(Self::TAG, options),
            encoding: options.encoding(),
        }
    }

    /// 当前缓冲容量。
    pub fn capacity(&self) -> usize {
        self.core.buffer.capacity()
    }

    /// 累计重新分配次数。
    pub fn reallocations(&self) -> usize {
        self.core.buffer.reallocations()
    }

    /// 读游标。
    pub fn read_index(&self) -> usize {
        self.core.cursor.read_index()
    }

    /// 写游标。
    pub fn write_index(&self) -> usize {
        self.core.buffer.write_index()
    }
}

impl Default for DuplexStringStream {
    fn default() -> Self {
        Self::new()
    }
}

impl StringStream for DuplexStringStream {
    const TAG: &'static str = "DuplexStringStream";

    fn encoding(&self) -> Encoding {
        self.encoding
    }

    fn to_string_with(&self, encoding: Encoding) -> String {
        encoding.to_text(self.core.buffer.as_slice())
    }

    fn byte_len(&self) -> usize {
        self.core.buffer.write_index()
    }
}

impl ReadStream for DuplexStringStream {
    fn read_bytes(&mut self, count: usize) -> Option<Bytes> {
        self.reader.read(count, &mut self.core)
    }

    fn read_state(&self) -> ReadState {
        let pending = self.core.cursor.pending(self.core.buffer.write_index());
        if !self.reader.queue().is_empty() || pending > 0 {
            ReadState::HasData
        } else if self.core.write_closed {
            ReadState::Ended
        } else {
            ReadState::Drained
        }
    }

    fn read_high_water_mark(&self) -> usize {
        self.reader.queue().high_water_mark()
    }
}

impl WriteStream for DuplexStringStream {
    fn write(&mut self, input: impl Into<WriteInput>) -> Result<()> {
        self.writer.write(input.into(), &mut self.core)
    }

    fn end(&mut self, input: impl Into<WriteInput>) -> Result<()> {
        self.writer.end(Some(input.into()), &mut self.core)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.end(None, &mut self.core)
    }

    fn write_state(&self) -> WriteState {
        self.writer.state()
    }
}

impl fmt::Display for DuplexStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content())
    }
}

impl fmt::Debug for DuplexStringStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(Self::TAG)
            .field("encoding", &self.encoding)
            .field("read_index", &self.read_index())
            .field("write_state", &self.writer.state())
            .field("buffer", &self.core.buffer)
            .finish()
    }
}
