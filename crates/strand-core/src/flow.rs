//! 宿主流基座的最小同步实现。
//!
//! # 模块定位（Why）
//! - 适配器只关心“按需拉取”和“推送一个字节块”两件事，分块缓冲、结束信号、写后拒绝等
//!   通用机制集中在此，由 [`ReadHalf`] 与 [`WriteHalf`] 承担；
//! - 读写两侧通过 [`Pullable`] / [`Pushable`] 与适配器解耦，双工流只需让同一个内核同时实现两者。
//!
//! # 契约说明（What）
//! - 所有调用同步完成，不存在挂起点；一次拉取或推送期间缓冲状态不会被其它调用观察到中间态；
//! - 结束信号幂等：读侧一旦收到结束标记，后续读取恒返回 `None` 且不再拉取。

use std::borrow::Cow;
use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::encoding::Encoding;
use crate::error::{Result, StreamError};
use crate::options::StreamOptions;

/// 读侧状态。
///
/// - `HasData`：存在尚未交付的字节；
/// - `Drained`：已交付全部字节，但写侧仍可能追加；
/// - `Ended`：不会再有新数据。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReadState {
    /// 存在待交付数据。
    HasData,
    /// 暂无数据，写侧仍开放。
    Drained,
    /// 已结束。
    Ended,
}

/// 写侧状态。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteState {
    /// 可继续写入。
    Open,
    /// 已收到结束信号，拒绝后续写入。
    Ended,
}

/// 单次拉取的结果。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PullOutcome {
    /// 交付了指定字节数（交付后若已耗尽，结束标记随之发出）。
    Delivered(usize),
    /// 没有待交付数据，写侧仍开放。
    Drained,
    /// 没有待交付数据且不会再有，已发出结束标记。
    Ended,
}

/// 读侧的分块队列，即宿主的 `push` 原语。
///
/// # 契约说明（What）
/// - `push` 追加一个字节块，空块被忽略；结束后追加的块被丢弃；
/// - `push_end` 幂等；
/// - `needs_pull` 在未结束且缓冲量低于高水位时为真，[`ReadHalf`] 据此决定是否继续拉取。
#[derive(Debug)]
pub struct ReadQueue {
    chunks: VecDeque<Bytes>,
    buffered: usize,
    high_water_mark: usize,
    ended: bool,
}

impl ReadQueue {
    /// 以给定高水位创建空队列。
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            buffered: 0,
            high_water_mark,
            ended: false,
        }
    }

    /// 追加一个字节块。
    pub fn push(&mut self, chunk: Bytes) {
        if self.ended {
            warn!(len = chunk.len(), "read queue received a chunk after end-of-data");
            return;
        }
        if !chunk.is_empty() {
            self.buffered += chunk.len();
            self.chunks.push_back(chunk);
        }
    }

    /// 发出结束标记。
    pub fn push_end(&mut self) {
        if !self.ended {
            self.ended = true;
            debug!(buffered = self.buffered, "end-of-data signalled");
        }
    }

    /// 取出至多 `count` 字节；超出部分留在队首。
    pub fn take(&mut self, count: usize) -> Option<Bytes> {
        if count == 0 {
            return None;
        }
        let front = self.chunks.front_mut()?;
        let chunk = if front.len() > count {
            front.split_to(count)
        } else {
            self.chunks.pop_front()?
        };
        self.buffered -= chunk.len();
        Some(chunk)
    }

    /// 是否已收到结束标记。
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// 是否没有缓冲数据。
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// 当前缓冲的字节数。
    pub fn buffered(&self) -> usize {
        self.buffered
    }

    /// 高水位。
    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// 未结束且缓冲量低于高水位。
    pub fn needs_pull(&self) -> bool {
        !self.ended && self.buffered < self.high_water_mark
    }
}

/// 可被拉取的内容源。
pub trait Pullable {
    /// 最多交付 `requested` 字节到 `queue`，并在耗尽时发出结束标记。
    fn pull(&mut self, requested: usize, queue: &mut ReadQueue) -> PullOutcome;
}

/// 推送完成句柄。
///
/// `complete` 消耗自身，保证每次推送至多一次完成信号。
pub struct Completion<'a> {
    slot: &'a mut Option<Result<()>>,
}

impl<'a> Completion<'a> {
    /// 绑定结果槽位。
    pub fn new(slot: &'a mut Option<Result<()>>) -> Self {
        Self { slot }
    }

    /// 上报推送结果。
    pub fn complete(self, result: Result<()>) {
        *self.slot = Some(result);
    }

    /// 上报成功。
    pub fn succeed(self) {
        self.complete(Ok(()));
    }

    /// 上报失败。
    pub fn fail(self, err: StreamError) {
        self.complete(Err(err));
    }
}

/// 到达写入侧的分块。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteChunk {
    /// 已编码的字节。
    Bytes(Bytes),
    /// 未经转换的文本，仅在关闭 `decode_strings` 时出现。
    Text(String),
}

impl WriteChunk {
    /// 分块长度（字节或 UTF-8 字节数）。
    pub fn len(&self) -> usize {
        match self {
            WriteChunk::Bytes(bytes) => bytes.len(),
            WriteChunk::Text(text) => text.len(),
        }
    }

    /// 是否为空块。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 接收写入分块的内容汇。
pub trait Pushable {
    /// 接收一个分块，并通过 `completion` 恰好上报一次结果。
    fn push(&mut self, chunk: WriteChunk, encoding: Encoding, completion: Completion<'_>);

    /// 写入侧结束时调用一次。
    fn finish(&mut self) {}
}

/// 调用方写入的数据：文本或字节。
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WriteInput {
    /// 文本，按流的默认编码转为字节。
    Text(String),
    /// 原始字节，原样写入。
    Bytes(Bytes),
}

impl From<&str> for WriteInput {
    fn from(value: &str) -> Self {
        WriteInput::Text(value.to_owned())
    }
}

impl From<String> for WriteInput {
    fn from(value: String) -> Self {
        WriteInput::Text(value)
    }
}

impl From<Bytes> for WriteInput {
    fn from(value: Bytes) -> Self {
        WriteInput::Bytes(value)
    }
}

impl From<Vec<u8>> for WriteInput {
    fn from(value: Vec<u8>) -> Self {
        WriteInput::Bytes(Bytes::from(value))
    }
}

impl From<&[u8]> for WriteInput {
    fn from(value: &[u8]) -> Self {
        WriteInput::Bytes(Bytes::copy_from_slice(value))
    }
}

/// 宿主读侧：在队列为空时向内容源拉取，再按请求长度交付。
#[derive(Debug)]
pub struct ReadHalf {
    queue: ReadQueue,
}

impl ReadHalf {
    /// 以给定高水位创建读侧。
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            queue: ReadQueue::new(high_water_mark),
        }
    }

    /// 读取至多 `count` 字节。
    ///
    /// - 队列为空且未结束时先向 `source` 拉取 `count` 字节，之后只要队列仍低于高水位
    ///   就继续拉取差额，直到内容源暂时读尽或结束；
    /// - 返回 `None` 表示暂无数据或已结束，可结合 [`ReadHalf::is_ended`] 区分；
    /// - `count == 0` 直接返回 `None`，不触发拉取。
    pub fn read(&mut self, count: usize, source: &mut dyn Pullable) -> Option<Bytes> {
        if count == 0 {
            return None;
        }
        if self.queue.is_empty() && !self.queue.is_ended() {
            self.fill(count, source);
        }
        self.queue.take(count)
    }

    fn fill(&mut self, count: usize, source: &mut dyn Pullable) {
        let mut requested = count;
        while let PullOutcome::Delivered(delivered) = source.pull(requested, &mut self.queue) {
            if delivered == 0 || !self.queue.needs_pull() {
                break;
            }
            requested = self.queue.high_water_mark() - self.queue.buffered();
        }
    }

    /// 是否已收到结束标记。
    pub fn is_ended(&self) -> bool {
        self.queue.is_ended()
    }

    /// 只读访问内部队列。
    pub fn queue(&self) -> &ReadQueue {
        &self.queue
    }
}

/// 宿主写侧：结束状态、文本转字节以及完成信号的收集。
#[derive(Debug)]
pub struct WriteHalf {
    tag: &'static str,
    encoding: Encoding,
    decode_strings: bool,
    state: WriteState,
}

impl WriteHalf {
    /// 依据构造参数创建写侧，`tag` 用于错误与日志。
    pub fn new(tag: &'static str, options: &StreamOptions) -> Self {
        Self {
            tag,
            encoding: options.encoding(),
            decode_strings: options.decode_strings(),
            state: WriteState::Open,
        }
    }

    /// 当前写侧状态。
    pub fn state(&self) -> WriteState {
        self.state
    }

    /// 写入一个分块。
    ///
    /// # 错误
    /// - 写侧已结束：[`StreamError::WriteAfterEnd`]；
    /// - 内容汇未发出完成信号：[`StreamError::CompletionMissing`]；
    /// - 内容汇上报的任何错误原样返回。
    pub fn write(&mut self, input: WriteInput, sink: &mut dyn Pushable) -> Result<()> {
        if self.state == WriteState::Ended {
            return Err(StreamError::WriteAfterEnd { stream: self.tag });
        }
        self.dispatch(input, sink)
    }

    /// 可选地写入最后一个分块，然后结束写侧。
    ///
    /// 最后一块写入失败时写侧保持开放；已结束时 `end(None)` 为空操作。
    pub fn end(&mut self, input: Option<WriteInput>, sink: &mut dyn Pushable) -> Result<()> {
        match (self.state, input) {
            (WriteState::Ended, Some(_)) => Err(StreamError::WriteAfterEnd { stream: self.tag }),
            (WriteState::Ended, None) => Ok(()),
            (WriteState::Open, input) => {
                if let Some(input) = input {
                    self.dispatch(input, sink)?;
                }
                self.state = WriteState::Ended;
                sink.finish();
                debug!(stream = self.tag, "write side ended");
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, input: WriteInput, sink: &mut dyn Pushable) -> Result<()> {
        let chunk = match input {
            WriteInput::Bytes(bytes) => WriteChunk::Bytes(bytes),
            WriteInput::Text(text) if self.decode_strings => {
                WriteChunk::Bytes(self.encoding.to_bytes(&text)?)
            }
            WriteInput::Text(text) => WriteChunk::Text(text),
        };
        let mut slot = None;
        sink.push(chunk, self.encoding, Completion::new(&mut slot));
        slot.unwrap_or_else(|| {
            warn!(stream = self.tag, "push returned without signalling completion");
            Err(StreamError::CompletionMissing { stream: self.tag })
        })
    }
}

/// 构造“文本分块未实现”错误。
pub fn text_chunk_unsupported(encoding: Encoding) -> StreamError {
    StreamError::NotImplemented {
        operation: Cow::Owned(format!("push(chunk: text, encoding = {encoding})")),
    }
}
