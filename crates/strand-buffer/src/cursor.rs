use core::ops::Range;

use bytes::Bytes;
use strand_core::{PullOutcome, Pullable, ReadQueue};
use tracing::trace;

/// 读游标：拉取侧协议的共享实现。
///
/// # 教案式说明
/// - **意图 (Why)**：只读流与双工流对“按请求长度切片并交付”的处理完全一致，差别只在上界
///   是否会继续增长，因此抽出为独立游标，由调用方提供已写入区域与写侧是否关闭；
/// - **执行 (How)**：
///   1. `read_index >= write_index`：写侧关闭则发出结束标记，否则报告 `Drained`；
///   2. 否则把请求长度截到待读字节数，切片 `[read_index, read_index + n)` 交付到队列并推进游标；
///   3. 推进后恰好耗尽且写侧已关闭，立即补发结束标记，调用方无需再拉取一次才能发现结束；
/// - **契约 (What)**：游标从不越过写游标；请求长度为零时不交付也不推进。
/// - **已知限制 (Trade-offs)**：切片以字节为单位，多字节字符可能被拆到相邻两块。
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReadCursor {
    read_index: usize,
}

enum Claim {
    Exhausted,
    Empty,
    Range(Range<usize>),
}

impl ReadCursor {
    /// 创建位于起点的游标。
    pub fn new() -> Self {
        Self::default()
    }

    /// 已交付字节的开区间上界。
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// 相对写游标的待读字节数。
    pub fn pending(&self, write_index: usize) -> usize {
        write_index.saturating_sub(self.read_index)
    }

    /// 从 `written`（即 `[0, write_index)`）拉取，分块以拷贝方式交付。
    pub fn pull(
        &mut self,
        written: &[u8],
        write_closed: bool,
        requested: usize,
        queue: &mut ReadQueue,
    ) -> PullOutcome {
        let write_index = written.len();
        let outcome = match self.claim(write_index, requested) {
            Claim::Exhausted => return Self::exhausted(write_closed, queue),
            Claim::Empty => PullOutcome::Delivered(0),
            Claim::Range(range) => {
                let len = range.len();
                queue.push(Bytes::copy_from_slice(&written[range]));
                PullOutcome::Delivered(len)
            }
        };
        self.finish_pull(write_index, write_closed, requested, queue, outcome)
    }

    /// 从共享的 `Bytes` 拉取，分块以零拷贝切片交付。
    pub fn pull_shared(
        &mut self,
        content: &Bytes,
        write_closed: bool,
        requested: usize,
        queue: &mut ReadQueue,
    ) -> PullOutcome {
        let write_index = content.len();
        let outcome = match self.claim(write_index, requested) {
            Claim::Exhausted => return Self::exhausted(write_closed, queue),
            Claim::Empty => PullOutcome::Delivered(0),
            Claim::Range(range) => {
                let len = range.len();
                queue.push(content.slice(range));
                PullOutcome::Delivered(len)
            }
        };
        self.finish_pull(write_index, write_closed, requested, queue, outcome)
    }

    fn claim(&mut self, write_index: usize, requested: usize) -> Claim {
        if self.read_index >= write_index {
            return Claim::Exhausted;
        }
        if requested == 0 {
            return Claim::Empty;
        }
        let count = requested.min(write_index - self.read_index);
        let range = self.read_index..self.read_index + count;
        self.read_index += count;
        Claim::Range(range)
    }

    fn exhausted(write_closed: bool, queue: &mut ReadQueue) -> PullOutcome {
        if write_closed {
            queue.push_end();
            PullOutcome::Ended
        } else {
            PullOutcome::Drained
        }
    }

    fn finish_pull(
        &self,
        write_index: usize,
        write_closed: bool,
        requested: usize,
        queue: &mut ReadQueue,
        outcome: PullOutcome,
    ) -> PullOutcome {
        if self.read_index == write_index && write_closed {
            queue.push_end();
        }
        trace!(
            requested,
            read_index = self.read_index,
            write_index,
            ?outcome,
            "pull served"
        );
        outcome
    }
}

/// 内容固定的只读源：写游标恒为内容长度，且视为已关闭。
#[derive(Clone, Debug)]
pub struct FixedContent {
    content: Bytes,
    cursor: ReadCursor,
}

impl FixedContent {
    /// 以完整内容创建只读源。
    pub fn new(content: Bytes) -> Self {
        Self {
            content,
            cursor: ReadCursor::new(),
        }
    }

    /// 全部内容。
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// 读游标。
    pub fn cursor(&self) -> ReadCursor {
        self.cursor
    }

    /// 尚未交付的字节数。
    pub fn pending(&self) -> usize {
        self.cursor.pending(self.content.len())
    }
}

impl Pullable for FixedContent {
    fn pull(&mut self, requested: usize, queue: &mut ReadQueue) -> PullOutcome {
        self.cursor.pull_shared(&self.content, true, requested, queue)
    }
}
