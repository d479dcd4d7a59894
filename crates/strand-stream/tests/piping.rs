//! 管道转发：只读到只写、双工的半开放转发。

use strand_core::error::codes;
use strand_stream::{
    DuplexStringStream, Encoding, PipeOutcome, ReadStream, ReadableStringStream, StreamOptions,
    StringStream, WritableStringStream, WriteState, WriteStream, pipe,
};

#[test]
fn readable_into_writable_preserves_content() {
    let mut source = ReadableStringStream::new("Hello World!").unwrap();
    let mut sink = WritableStringStream::new();
    let outcome = pipe(&mut source, &mut sink).unwrap();
    assert_eq!(outcome, PipeOutcome::Finished { transferred: 12 });
    assert_eq!(sink.content(), source.content());
    assert_eq!(sink.write_state(), WriteState::Ended);
}

#[test]
fn small_high_water_mark_still_transfers_everything() {
    let options = StreamOptions::builder().high_water_mark(3).build().unwrap();
    let mut source = ReadableStringStream::with_options("Hello World!", options).unwrap();
    let mut sink = WritableStringStream::new();
    pipe(&mut source, &mut sink).unwrap();
    assert_eq!(sink.content(), "Hello World!");
}

#[test]
fn bytes_pass_through_across_encodings() {
    let mut source = ReadableStringStream::with_encoding("4869", Encoding::Hex).unwrap();
    let mut sink = WritableStringStream::new();
    pipe(&mut source, &mut sink).unwrap();
    assert_eq!(sink.content(), "Hi");
}

#[test]
fn open_duplex_source_leaves_destination_open() {
    let mut source = DuplexStringStream::new();
    let mut sink = WritableStringStream::new();
    source.write("part one, ").unwrap();
    let first = pipe(&mut source, &mut sink).unwrap();
    assert_eq!(first, PipeOutcome::Pending { transferred: 10 });
    assert_eq!(sink.write_state(), WriteState::Open);

    source.end("part two").unwrap();
    let second = pipe(&mut source, &mut sink).unwrap();
    assert_eq!(second.transferred(), 8);
    assert!(matches!(second, PipeOutcome::Finished { .. }));
    assert_eq!(sink.content(), "part one, part two");
    assert_eq!(source.read_next(), None);
}

#[test]
fn destination_failure_stops_the_pipe() {
    let mut source = ReadableStringStream::new("too long").unwrap();
    let mut sink = WritableStringStream::new();
    sink.end("closed").unwrap();
    let err = pipe(&mut source, &mut sink).unwrap_err();
    assert_eq!(err.code(), codes::WRITE_AFTER_END);
    assert_eq!(err.transferred(), 0);
    assert_eq!(err.pending().as_ref(), b"too long");
    assert_eq!(sink.content(), "closed");
}

#[test]
fn overflowing_destination_hands_back_the_rejected_chunk() {
    let source_options = StreamOptions::builder().high_water_mark(3).build().unwrap();
    let mut source = ReadableStringStream::with_options("abcdef", source_options).unwrap();
    let sink_options = StreamOptions::builder()
        .high_water_mark(2)
        .max_capacity(4)
        .build()
        .unwrap();
    let mut sink = WritableStringStream::with_options(sink_options).unwrap();

    let err = pipe(&mut source, &mut sink).unwrap_err();
    assert_eq!(err.code(), codes::BUFFER_OVERFLOW);
    assert_eq!(err.transferred(), 3);
    assert_eq!(sink.content(), "abc");
    assert_eq!(sink.write_state(), WriteState::Open);

    // 已转发部分与随错误返回的分块合起来就是完整内容。
    let (pending, _) = err.into_parts();
    assert_eq!(pending.as_ref(), b"def");
    let mut overflow = WritableStringStream::new();
    overflow.write(pending).unwrap();
    assert_eq!(
        pipe(&mut source, &mut overflow).unwrap(),
        PipeOutcome::Finished { transferred: 0 }
    );
    assert_eq!(format!("{}{}", sink.content(), overflow.content()), "abcdef");
}
