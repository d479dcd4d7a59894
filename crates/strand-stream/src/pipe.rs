use bytes::Bytes;
use strand_core::{ReadState, ReadStream, StreamError, WriteStream};
use thiserror::Error;
use tracing::{debug, warn};

/// 一次管道转发的结果。
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PipeOutcome {
    /// 源已结束，目标随之结束。
    Finished {
        /// 转发的字节数。
        transferred: usize,
    },
    /// 源暂无数据但尚未结束，目标保持开放，可稍后再次调用。
    Pending {
        /// 转发的字节数。
        transferred: usize,
    },
}

impl PipeOutcome {
    /// 本次转发的字节数。
    pub fn transferred(&self) -> usize {
        match *self {
            PipeOutcome::Finished { transferred } | PipeOutcome::Pending { transferred } => {
                transferred
            }
        }
    }
}

/// 目标拒绝写入时的管道错误。
///
/// # 契约说明（What）
/// - `pending` 是已从源读出、但目标未接受的分块；源的读游标已越过它，
///   调用方需自行重新投递或另作处理，管道不会丢弃这部分字节；
/// - `transferred` 是出错前已被目标接受的字节数；
/// - `source` 是目标返回的原始错误。
#[derive(Debug, Error)]
#[error("pipe stopped after {transferred} bytes with {} bytes pending: {source}", .pending.len())]
pub struct PipeError {
    transferred: usize,
    pending: Bytes,
    #[source]
    source: StreamError,
}

impl PipeError {
    /// 出错前已转发的字节数。
    pub fn transferred(&self) -> usize {
        self.transferred
    }

    /// 未被目标接受的分块。
    pub fn pending(&self) -> &Bytes {
        &self.pending
    }

    /// 目标返回的错误。
    pub fn error(&self) -> &StreamError {
        &self.source
    }

    /// 稳定错误码，取自目标返回的错误。
    pub fn code(&self) -> &'static str {
        self.source.code()
    }

    /// 拆出未转发分块与原始错误。
    pub fn into_parts(self) -> (Bytes, StreamError) {
        (self.pending, self.source)
    }
}

/// 把 `source` 当前可读的全部数据转写到 `destination`。
///
/// - 分块大小取源的读侧高水位，字节原样转发，不经过文本转换；
/// - 源进入 [`ReadState::Ended`] 时调用目标的 `finish`，返回 [`PipeOutcome::Finished`]；
/// - 源仅是暂时读尽时返回 [`PipeOutcome::Pending`]；
/// - 目标写入失败时立即返回 [`PipeError`]，已转发的分块保留在目标中，失败的分块随错误返回。
pub fn pipe<R, W>(source: &mut R, destination: &mut W) -> Result<PipeOutcome, PipeError>
where
    R: ReadStream,
    W: WriteStream,
{
    let chunk_size = source.read_high_water_mark();
    let mut transferred = 0;
    while let Some(chunk) = source.read_bytes(chunk_size) {
        let len = chunk.len();
        if let Err(err) = destination.write(chunk.clone()) {
            warn!(
                from = R::TAG,
                to = W::TAG,
                transferred,
                pending = len,
                error = %err,
                "pipe stopped by destination"
            );
            return Err(PipeError {
                transferred,
                pending: chunk,
                source: err,
            });
        }
        transferred += len;
    }
    let outcome = if source.read_state() == ReadState::Ended {
        destination.finish().map_err(|err| PipeError {
            transferred,
            pending: Bytes::new(),
            source: err,
        })?;
        PipeOutcome::Finished { transferred }
    } else {
        PipeOutcome::Pending { transferred }
    };
    debug!(
        from = R::TAG,
        to = W::TAG,
        transferred,
        ?outcome,
        "pipe pass complete"
    );
    Ok(outcome)
}
