use bytes::{Bytes, BytesMut};
use strand_core::flow::text_chunk_unsupported;
use strand_core::{
    Completion, DEFAULT_HIGH_WATER_MARK, Encoding, MAX_BUFFER_LENGTH, Pushable, Result,
    StreamError, StreamOptions, WriteChunk,
};
use tracing::{debug, trace, warn};

/// 一次容量检查的结果。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Growth {
    /// 剩余空间足够，未重新分配。
    Unchanged,
    /// 重新分配了更大的区域。
    Reallocated {
        /// 原容量。
        from: usize,
        /// 新容量。
        to: usize,
    },
}

/// `GrowableBuffer` 持有一块连续字节区域与写游标，保证每次被接受的写入都能放下。
///
/// # 设计动机（Why）
/// - 可写字符串流需要把零散写入拼接为一段连续内容，随后整体渲染或按游标切片读取；
/// - 扩容显式化：逻辑容量固定，只有 [`ensure_capacity`](Self::ensure_capacity) 会重新分配并拷贝，
///   不依赖 `BytesMut` 的隐式增长，从而使“恰好一次重新分配”与“倍增到最小可容纳值”可被观测。
///
/// # 结构设计（How）
/// - `region`：预留了 `capacity` 字节的 `BytesMut`，长度即写游标；
/// - `capacity`：逻辑容量，倍增规则只作用于该值；
/// - `max_capacity`：倍增上限，越界时返回 [`StreamError::Overflow`]；
/// - `reallocations`：累计重新分配次数，供测试与诊断观察。
///
/// # 契约说明（What）
/// - `0 <= write_index <= capacity` 恒成立；
/// - 只追加：`fill` 从不覆盖 `write_index` 之前的字节；
/// - 没有收缩路径，容量单调不减；
/// - 分配走可失败路径，失败以 [`StreamError::Overflow`] 上报，进程不会因此中止；
/// - 扩容失败时缓冲保持原样。
///
/// # 风险与取舍（Trade-offs）
/// - 扩容时整段拷贝 `[0, write_index)`，以一次 `memcpy` 换取内容始终连续。
pub struct GrowableBuffer {
    region: BytesMut,
    capacity: usize,
    max_capacity: usize,
    reallocations: usize,
}

impl GrowableBuffer {
    /// 以高水位为初始容量创建空缓冲。
    ///
    /// # 错误
    /// - 区域无法分配时返回 [`StreamError::Overflow`]。
    pub fn new(options: &StreamOptions) -> Result<Self> {
        let capacity = options.high_water_mark();
        Ok(Self {
            region: allocate(capacity, options.max_capacity())?,
            capacity,
            max_capacity: options.max_capacity(),
            reallocations: 0,
        })
    }

    /// 以初始内容创建缓冲，容量按 [`initial_capacity`](Self::initial_capacity) 取整。
    ///
    /// # 错误
    /// - 初始内容超出 `max_capacity` 可容纳的倍增结果，或区域无法分配时返回 [`StreamError::Overflow`]。
    pub fn with_seed(seed: &[u8], options: &StreamOptions) -> Result<Self> {
        let capacity = Self::initial_capacity(
            seed.len(),
            options.high_water_mark(),
            options.max_capacity(),
        )?;
        let mut region = allocate(capacity, options.max_capacity())?;
        region.extend_from_slice(seed);
        Ok(Self {
            region,
            capacity,
            max_capacity: options.max_capacity(),
            reallocations: 0,
        })
    }

    /// 计算初始容量。
    ///
    /// - 内容长度不超过高水位时取高水位；
    /// - 否则从高水位开始倍增，直到不小于内容长度，规则与运行期扩容一致。
    pub fn initial_capacity(
        seed_len: usize,
        high_water_mark: usize,
        max_capacity: usize,
    ) -> Result<usize> {
        if seed_len <= high_water_mark {
            return Ok(high_water_mark);
        }
        doubled_to_fit(high_water_mark, seed_len, max_capacity)
    }

    /// 当前容量。
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 写游标，即已写入字节数。
    pub fn write_index(&self) -> usize {
        self.region.len()
    }

    /// 是否尚未写入任何字节。
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// 无需扩容即可写入的字节数。
    pub fn remaining_mut(&self) -> usize {
        self.capacity - self.region.len()
    }

    /// 扩容上限。
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// 累计重新分配次数。
    pub fn reallocations(&self) -> usize {
        self.reallocations
    }

    /// 已写入区域 `[0, write_index)`。
    pub fn as_slice(&self) -> &[u8] {
        &self.region
    }

    /// 确保还能追加 `additional` 字节。
    ///
    /// # 执行步骤（How）
    /// 1. `write_index + additional <= capacity` 时直接返回 [`Growth::Unchanged`]；
    /// 2. 否则从当前容量开始倍增，直到不小于所需长度；
    /// 3. 任何一次倍增越过 `max_capacity` 即返回 [`StreamError::Overflow`]，不做部分扩容；
    /// 4. 新区域经可失败路径分配，失败同样返回 [`StreamError::Overflow`]；
    /// 5. 成功时拷贝 `[0, write_index)` 并替换旧区域。
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<Growth> {
        let capacity = self.capacity;
        let write_index = self.write_index();
        let required = write_index
            .checked_add(additional)
            .ok_or(StreamError::Overflow {
                attempted: usize::MAX,
                max: self.max_capacity,
            })?;
        if required <= capacity {
            return Ok(Growth::Unchanged);
        }
        let (target, mut region) = doubled_to_fit(capacity, required, self.max_capacity)
            .and_then(|target| Ok((target, allocate(target, self.max_capacity)?)))
            .inspect_err(|err| {
                warn!(
                    capacity,
                    required,
                    max = self.max_capacity,
                    error = %err,
                    "buffer growth refused"
                );
            })?;

        region.extend_from_slice(&self.region);
        self.region = region;
        self.capacity = target;
        self.reallocations += 1;
        debug!(from = capacity, to = target, write_index, "buffer reallocated");
        Ok(Growth::Reallocated {
            from: capacity,
            to: target,
        })
    }

    /// 把 `chunk` 追加到 `[write_index, write_index + chunk.len())` 并推进写游标。
    ///
    /// 调用前应先 [`ensure_capacity`](Self::ensure_capacity)；空间不足时返回
    /// [`StreamError::Overflow`]（`max` 为当前容量）且不写入任何字节。
    pub fn fill(&mut self, chunk: &[u8]) -> Result<()> {
        let end = self.write_index() + chunk.len();
        if end > self.capacity {
            return Err(StreamError::Overflow {
                attempted: end,
                max: self.capacity,
            });
        }
        self.region.extend_from_slice(chunk);
        Ok(())
    }
}

impl Default for GrowableBuffer {
    /// 默认高水位（1 KiB）的空缓冲，按普通小块分配处理。
    fn default() -> Self {
        Self {
            region: BytesMut::with_capacity(DEFAULT_HIGH_WATER_MARK),
            capacity: DEFAULT_HIGH_WATER_MARK,
            max_capacity: MAX_BUFFER_LENGTH,
            reallocations: 0,
        }
    }
}

/// 以可失败路径预留 `capacity` 字节，失败映射为 [`StreamError::Overflow`]。
fn allocate(capacity: usize, max_capacity: usize) -> Result<BytesMut> {
    let mut storage: Vec<u8> = Vec::new();
    storage
        .try_reserve_exact(capacity)
        .map_err(|err| {
            warn!(capacity, error = %err, "buffer allocation failed");
            StreamError::Overflow {
                attempted: capacity,
                max: max_capacity,
            }
        })?;
    // 独占的 Vec 转换为 BytesMut 时保留已预留的容量，不发生拷贝。
    Ok(BytesMut::from(Bytes::from(storage)))
}

/// 从 `capacity` 开始倍增，返回第一个不小于 `required` 的值。
fn doubled_to_fit(capacity: usize, required: usize, max_capacity: usize) -> Result<usize> {
    let mut candidate = capacity;
    while candidate < required {
        candidate = match candidate.checked_mul(2) {
            Some(next) if next <= max_capacity => next,
            Some(next) => {
                return Err(StreamError::Overflow {
                    attempted: next,
                    max: max_capacity,
                });
            }
            None => {
                return Err(StreamError::Overflow {
                    attempted: usize::MAX,
                    max: max_capacity,
                });
            }
        };
    }
    Ok(candidate)
}

impl Pushable for GrowableBuffer {
    /// 写入汇协议：拒绝文本块，扩容后填充，恰好一次完成信号。
    fn push(&mut self, chunk: WriteChunk, encoding: Encoding, completion: Completion<'_>) {
        let bytes = match chunk {
            WriteChunk::Bytes(bytes) => bytes,
            WriteChunk::Text(text) => {
                warn!(len = text.len(), %encoding, "text chunk rejected, bytes required");
                completion.fail(text_chunk_unsupported(encoding));
                return;
            }
        };
        if let Err(err) = self.ensure_capacity(bytes.len()) {
            completion.fail(err);
            return;
        }
        match self.fill(&bytes) {
            Ok(()) => {
                trace!(
                    len = bytes.len(),
                    write_index = self.write_index(),
                    "chunk accepted"
                );
                completion.succeed();
            }
            Err(err) => completion.fail(err),
        }
    }
}

impl core::fmt::Debug for GrowableBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GrowableBuffer")
            .field("write_index", &self.write_index())
            .field("capacity", &self.capacity)
            .field("max_capacity", &self.max_capacity)
            .field("reallocations", &self.reallocations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use strand_core::error::codes;
    use tracing_test::traced_test;

    fn options(high_water_mark: usize, max_capacity: usize) -> StreamOptions {
        StreamOptions::builder()
            .high_water_mark(high_water_mark)
            .max_capacity(max_capacity)
            .build()
            .expect("测试参数应合法")
    }

    fn push(buffer: &mut GrowableBuffer, chunk: WriteChunk) -> Result<()> {
        let mut slot = None;
        buffer.push(chunk, Encoding::Utf8, Completion::new(&mut slot));
        slot.expect("写入汇必须发出完成信号")
    }

    #[test]
    fn initial_capacity_rounds_seed_up_by_doubling() {
        assert_eq!(GrowableBuffer::initial_capacity(3, 8, 1024).unwrap(), 8);
        assert_eq!(GrowableBuffer::initial_capacity(8, 8, 1024).unwrap(), 8);
        assert_eq!(GrowableBuffer::initial_capacity(9, 8, 1024).unwrap(), 16);
        assert_eq!(GrowableBuffer::initial_capacity(33, 8, 1024).unwrap(), 64);
        assert_eq!(GrowableBuffer::initial_capacity(12, 5, 1024).unwrap(), 20);
    }

    #[test]
    fn seed_larger_than_limit_overflows() {
        let err = GrowableBuffer::with_seed(&[0; 40], &options(8, 32)).expect_err("超出上限");
        assert_eq!(
            err,
            StreamError::Overflow {
                attempted: 64,
                max: 32
            }
        );
    }

    #[test]
    fn fast_path_does_not_reallocate() {
        let mut buffer = GrowableBuffer::new(&options(8, 64)).unwrap();
        assert_eq!(buffer.ensure_capacity(8).unwrap(), Growth::Unchanged);
        assert_eq!(buffer.reallocations(), 0);
    }

    #[test]
    fn growth_picks_smallest_doubling_and_preserves_prefix() {
        let mut buffer = GrowableBuffer::new(&options(4, 1024)).unwrap();
        buffer.fill(b"abc").unwrap();
        assert_eq!(
            buffer.ensure_capacity(10).unwrap(),
            Growth::Reallocated { from: 4, to: 16 }
        );
        assert_eq!(buffer.as_slice(), b"abc");
        assert_eq!(buffer.reallocations(), 1);
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn fill_without_room_is_rejected_untouched() {
        let mut buffer = GrowableBuffer::new(&options(2, 8)).unwrap();
        let err = buffer.fill(b"abc").expect_err("空间不足");
        assert_eq!(err.code(), codes::BUFFER_OVERFLOW);
        assert!(buffer.is_empty());
    }

    #[test]
    fn sink_rejects_text_chunks() {
        let mut buffer = GrowableBuffer::new(&options(8, 64)).unwrap();
        let err = push(&mut buffer, WriteChunk::Text("hi".into())).expect_err("文本块不被支持");
        assert_eq!(err.code(), codes::NOT_IMPLEMENTED);
        assert!(buffer.is_empty());
    }

    #[traced_test]
    #[test]
    fn sink_propagates_overflow_and_keeps_content() {
        let mut buffer = GrowableBuffer::new(&options(4, 8)).unwrap();
        push(&mut buffer, WriteChunk::Bytes(Bytes::from_static(b"abcd"))).unwrap();
        let err = push(&mut buffer, WriteChunk::Bytes(Bytes::from_static(b"efghi")))
            .expect_err("需要 16 字节，超过上限 8");
        assert_eq!(
            err,
            StreamError::Overflow {
                attempted: 16,
                max: 8
            }
        );
        assert_eq!(buffer.as_slice(), b"abcd");
        assert_eq!(buffer.capacity(), 4);
        assert!(logs_contain("buffer growth refused"));
    }

    #[test]
    fn unallocatable_high_water_mark_fails_construction() {
        let err = GrowableBuffer::new(&options(MAX_BUFFER_LENGTH, MAX_BUFFER_LENGTH))
            .expect_err("无法分配的区域应以错误返回");
        assert_eq!(
            err,
            StreamError::Overflow {
                attempted: MAX_BUFFER_LENGTH,
                max: MAX_BUFFER_LENGTH
            }
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[traced_test]
    #[test]
    fn unallocatable_growth_keeps_content() {
        let mut buffer = GrowableBuffer::new(&options(1, MAX_BUFFER_LENGTH)).unwrap();
        buffer.fill(b"a").unwrap();
        let err = buffer
            .ensure_capacity(1 << 61)
            .expect_err("2^62 字节无法分配");
        assert_eq!(
            err,
            StreamError::Overflow {
                attempted: 1 << 62,
                max: MAX_BUFFER_LENGTH
            }
        );
        assert_eq!(buffer.as_slice(), b"a");
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.reallocations(), 0);
        assert!(logs_contain("buffer allocation failed"));
    }

    #[test]
    fn default_buffer_uses_default_high_water_mark() {
        let buffer = GrowableBuffer::default();
        assert_eq!(buffer.capacity(), DEFAULT_HIGH_WATER_MARK);
        assert!(buffer.is_empty());
    }
}
