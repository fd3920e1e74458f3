use std::io::Cursor;

use super::*;
use crate::media::mp4_fixture::{FixtureSpec, build_avc_mp4};
use crate::media::stub_decoder::{StubBehavior, StubDecoder};

fn reader(bytes: Vec<u8>) -> Box<dyn Read + Send> {
    Box::new(Cursor::new(bytes))
}

fn small_reads() -> DecodeOptions {
    DecodeOptions {
        read_chunk_size: 97,
        ..DecodeOptions::default()
    }
}

#[test]
fn decodes_every_sample_into_the_store() {
    let (dec, log) = StubDecoder::working();
    let store = decode(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        small_reads(),
    )
    .unwrap();

    assert_eq!(store.len(), 30);
    assert_eq!(store.duration(), Some(1.0));
    assert_eq!(store.frame_rate(), Some(30.0));
    for i in 0..30 {
        assert_eq!(store.get(i).unwrap().pixels()[0], i as u8);
    }

    let log = log.lock();
    assert_eq!(log.configured.as_ref().unwrap().codec, "avc1.64001f");
    assert_eq!(log.configured.as_ref().unwrap().coded_width, 64);
    assert!(log.flushed);
    assert!(log.closed);
    let indices: Vec<_> = log.chunks.iter().map(|c| c.2).collect();
    assert_eq!(indices, (0..30).map(Some).collect::<Vec<_>>());
    assert_eq!(log.chunks[0].0, ChunkKind::Key);
    assert_eq!(log.chunks[1].0, ChunkKind::Delta);
    assert_eq!(log.chunks[10].0, ChunkKind::Key);
    assert_eq!(log.chunks[1].1, 33_333);
}

#[test]
fn handles_moov_after_mdat() {
    let spec = FixtureSpec {
        moov_first: false,
        ..FixtureSpec::default()
    };
    let (dec, _) = StubDecoder::working();
    let store = decode(reader(build_avc_mp4(&spec)), Box::new(dec), small_reads()).unwrap();
    assert_eq!(store.len(), 30);
}

#[test]
fn keeps_decode_queue_bounded() {
    let (dec, log) = StubDecoder::working();
    let opts = DecodeOptions {
        max_decode_queue: 3,
        read_chunk_size: 1 << 20,
        ..DecodeOptions::default()
    };
    let store = decode(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        opts,
    )
    .unwrap();
    assert_eq!(store.len(), 30);
    assert!(log.lock().max_queue <= 3);
}

#[test]
fn configure_failure_is_a_decoder_error() {
    let (dec, log) = StubDecoder::new(StubBehavior {
        fail_configure: true,
        ..StubBehavior::default()
    });
    let err = decode(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        DecodeOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ScrollyError::DecoderRuntime(_)));
    assert!(err.requires_reload());
    assert!(log.lock().closed);
}

#[test]
fn mid_stream_failure_releases_captured_frames() {
    let (dec, log) = StubDecoder::new(StubBehavior {
        fail_at_chunk: Some(12),
        ..StubBehavior::default()
    });
    let ledger = FrameLedger::new();
    let mut pipeline = DecodePipeline::new(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        ledger.clone(),
        small_reads(),
        CancelToken::new(),
    );
    let err = loop {
        match pipeline.step(false) {
            Ok(DecodeStep::Pending) => {}
            Ok(DecodeStep::Complete(_)) => panic!("decode should fail"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err, ScrollyError::DecoderRuntime(_)));
    assert_eq!(ledger.live(), 0);
    assert_eq!(pipeline.frames_decoded(), 0);
    assert!(log.lock().closed);
    assert!(pipeline.step(false).is_err());
}

#[test]
fn no_output_is_an_empty_result() {
    let (dec, _) = StubDecoder::new(StubBehavior {
        emit_nothing: true,
        ..StubBehavior::default()
    });
    let err = decode(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        DecodeOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ScrollyError::EmptyResult));
    assert!(!err.requires_reload());
}

#[test]
fn completes_after_grace_when_decoder_never_signals_finished() {
    let (dec, _) = StubDecoder::new(StubBehavior {
        silent_after_flush: true,
        ..StubBehavior::default()
    });
    let opts = DecodeOptions {
        drain_grace_ms: 30,
        ..DecodeOptions::default()
    };
    let store = decode(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        opts,
    )
    .unwrap();
    assert_eq!(store.len(), 30);
}

#[test]
fn rejects_non_mp4_bytes() {
    let (dec, log) = StubDecoder::working();
    let err = decode(
        reader(b"hello world, definitely not a movie".to_vec()),
        Box::new(dec),
        DecodeOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ScrollyError::UnsupportedContainer(_)));
    assert!(log.lock().configured.is_none());
}

#[test]
fn truncated_file_is_unsupported() {
    let mut bytes = build_avc_mp4(&FixtureSpec {
        moov_first: false,
        ..FixtureSpec::default()
    });
    bytes.truncate(bytes.len() / 2);
    let (dec, _) = StubDecoder::working();
    let err = decode(reader(bytes), Box::new(dec), DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, ScrollyError::UnsupportedContainer(_)));
}

#[test]
fn cancellation_stops_the_session() {
    let (dec, log) = StubDecoder::working();
    let ledger = FrameLedger::new();
    let cancel = CancelToken::new();
    let mut pipeline = DecodePipeline::new(
        reader(build_avc_mp4(&FixtureSpec::default())),
        Box::new(dec),
        ledger.clone(),
        small_reads(),
        cancel.clone(),
    );
    for _ in 0..5 {
        assert!(matches!(pipeline.step(false).unwrap(), DecodeStep::Pending));
    }
    cancel.cancel();
    assert!(matches!(pipeline.step(false), Err(ScrollyError::Cancelled)));
    assert_eq!(ledger.live(), 0);
    assert!(log.lock().closed);
}
