use super::*;
use crate::media::mp4_fixture::{FixtureSpec, build_avc_mp4, sample_payload};

fn demux_all(bytes: &[u8], chunk: usize) -> (Mp4Demuxer, Vec<Mp4Sample>) {
    let mut d = Mp4Demuxer::new();
    let mut out = Vec::new();
    for piece in bytes.chunks(chunk) {
        d.append(piece).unwrap();
        while let Some(s) = d.next_sample() {
            out.push(s);
        }
    }
    d.finish().unwrap();
    (d, out)
}

#[test]
fn reads_track_metadata() {
    let spec = FixtureSpec::default();
    let (d, _) = demux_all(&build_avc_mp4(&spec), usize::MAX);
    let t = d.track().unwrap();
    assert_eq!(t.track_id, 1);
    assert_eq!((t.width, t.height), (64, 48));
    assert_eq!(t.timescale, 30_000);
    assert_eq!(t.duration, Some(1.0));
    assert_eq!(t.codec(), "avc1.64001f");
    assert_eq!(t.avcc.sps, vec![vec![0x67, 0x64, 0x00, 0x1f]]);
    assert_eq!(t.samples.len(), 30);
}

#[test]
fn samples_come_out_in_decode_order_with_bytes() {
    let spec = FixtureSpec::default();
    let (_, samples) = demux_all(&build_avc_mp4(&spec), 7);
    assert_eq!(samples.len(), 30);
    for (i, s) in samples.iter().enumerate() {
        assert_eq!(s.index, i);
        assert_eq!(s.is_sync, i % 10 == 0);
        assert_eq!(s.data, sample_payload(i, i % 10 == 0));
        assert_eq!(s.duration_us, 33_333);
    }
    assert_eq!(samples[3].timestamp_us, 100_000);
}

#[test]
fn moov_at_end_is_supported() {
    let spec = FixtureSpec {
        moov_first: false,
        samples_per_chunk: 1,
        ..FixtureSpec::default()
    };
    let bytes = build_avc_mp4(&spec);
    let mut d = Mp4Demuxer::new();
    let half = bytes.len() / 2;
    assert!(!d.append(&bytes[..half]).unwrap());
    assert!(d.next_sample().is_none());
    assert!(d.append(&bytes[half..]).unwrap());
    assert_eq!(d.remaining(), 30);
    let mut n = 0;
    while d.next_sample().is_some() {
        n += 1;
    }
    assert_eq!(n, 30);
}

#[test]
fn track_becomes_ready_once() {
    let bytes = build_avc_mp4(&FixtureSpec::default());
    let mut d = Mp4Demuxer::new();
    let ready: Vec<bool> = bytes.chunks(64).map(|c| d.append(c).unwrap()).collect();
    assert_eq!(ready.iter().filter(|r| **r).count(), 1);
}

#[test]
fn missing_stss_means_all_sync_and_ctts_shifts_pts() {
    let spec = FixtureSpec {
        keyframe_interval: 0,
        with_ctts: true,
        ..FixtureSpec::default()
    };
    let (_, samples) = demux_all(&build_avc_mp4(&spec), 1024);
    assert!(samples.iter().all(|s| s.is_sync));
    assert_eq!(samples[0].timestamp_us, 33_333);
}

#[test]
fn rejects_non_mp4_input() {
    let mut d = Mp4Demuxer::new();
    let err = d.append(b"GIF89a-not-a-movie-at-all").unwrap_err();
    assert!(matches!(err, ScrollyError::UnsupportedContainer(_)));
}

#[test]
fn rejects_unsupported_codec_and_missing_avcc() {
    for spec in [
        FixtureSpec {
            codec: *b"hvc1",
            ..FixtureSpec::default()
        },
        FixtureSpec {
            with_avcc: false,
            ..FixtureSpec::default()
        },
    ] {
        let mut d = Mp4Demuxer::new();
        let err = d.append(&build_avc_mp4(&spec)).unwrap_err();
        assert!(matches!(err, ScrollyError::UnsupportedContainer(_)), "{err}");
    }
}

#[test]
fn truncated_input_fails_on_finish() {
    let bytes = build_avc_mp4(&FixtureSpec::default());
    let mut d = Mp4Demuxer::new();
    d.append(&bytes[..bytes.len() - 10]).unwrap();
    while d.next_sample().is_some() {}
    assert!(matches!(d.finish(), Err(ScrollyError::UnsupportedContainer(_))));

    let mut d = Mp4Demuxer::new();
    d.append(&bytes[..40]).unwrap();
    assert!(matches!(d.finish(), Err(ScrollyError::UnsupportedContainer(_))));
}

/// Header position of the box at `path` (outermost first) plus the positions of its parents.
fn locate(bytes: &[u8], path: &[&[u8; 4]]) -> (Vec<usize>, usize) {
    let (mut pos, mut end) = (0, bytes.len());
    let mut parents = Vec::new();
    for (depth, kind) in path.iter().enumerate() {
        loop {
            assert!(pos + 8 <= end, "box {} not found", String::from_utf8_lossy(*kind));
            if &bytes[pos + 4..pos + 8] == *kind {
                break;
            }
            pos += box_size(bytes, pos);
        }
        if depth + 1 < path.len() {
            parents.push(pos);
            end = pos + box_size(bytes, pos);
            pos += 8;
        }
    }
    (parents, pos)
}

fn box_size(bytes: &[u8], pos: usize) -> usize {
    u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize
}

/// Overwrite the big-endian u32 `at` bytes into the box at `path`.
fn patch_u32(bytes: &mut [u8], path: &[&[u8; 4]], at: usize, value: u32) {
    let (_, pos) = locate(bytes, path);
    bytes[pos + at..pos + at + 4].copy_from_slice(&value.to_be_bytes());
}

/// Swap the box at `path` for `replacement`, resizing its parents.
fn replace_box(bytes: &[u8], path: &[&[u8; 4]], replacement: &[u8]) -> Vec<u8> {
    let (parents, pos) = locate(bytes, path);
    let old = box_size(bytes, pos);
    let mut out = [&bytes[..pos], replacement, &bytes[pos + old..]].concat();
    for p in parents {
        let size = box_size(&out, p) + replacement.len() - old;
        out[p..p + 4].copy_from_slice(&(size as u32).to_be_bytes());
    }
    out
}

fn stbl_path(leaf: &'static [u8; 4]) -> [&'static [u8; 4]; 6] {
    [b"moov", b"trak", b"mdia", b"minf", b"stbl", leaf]
}

fn assert_rejected(bytes: &[u8]) {
    let mut d = Mp4Demuxer::new();
    match d.append(bytes) {
        Err(ScrollyError::UnsupportedContainer(_)) => {}
        other => panic!("expected UnsupportedContainer, got {other:?}"),
    }
    assert!(!d.is_ready());
}

// Offsets into a full box: size, type, version/flags, then the first field.
const FIELD_0: usize = 12;
const FIELD_1: usize = 16;

#[test]
fn rejects_sample_counts_the_tables_cannot_hold() {
    let base = build_avc_mp4(&FixtureSpec::default());

    // uniform sizes with a count far past any real file
    let mut bytes = base.clone();
    patch_u32(&mut bytes, &stbl_path(b"stsz"), FIELD_0, 1);
    patch_u32(&mut bytes, &stbl_path(b"stsz"), FIELD_1, u32::MAX);
    assert_rejected(&bytes);

    // uniform sizes with one more sample than the chunks carry
    let mut bytes = base.clone();
    patch_u32(&mut bytes, &stbl_path(b"stsz"), FIELD_0, 7);
    patch_u32(&mut bytes, &stbl_path(b"stsz"), FIELD_1, 31);
    assert_rejected(&bytes);

    // listed sizes with more entries than the box holds
    let mut bytes = base.clone();
    patch_u32(&mut bytes, &stbl_path(b"stsz"), FIELD_1, u32::MAX);
    assert_rejected(&bytes);
}

#[test]
fn rejects_entry_counts_past_the_end_of_their_box() {
    let base = build_avc_mp4(&FixtureSpec::default());
    for leaf in [b"stts", b"stsc", b"stco", b"stss"] {
        let mut bytes = base.clone();
        patch_u32(&mut bytes, &stbl_path(leaf), FIELD_0, u32::MAX);
        assert_rejected(&bytes);
    }
}

#[test]
fn oversized_time_to_sample_run_is_capped_at_the_sample_count() {
    let mut bytes = build_avc_mp4(&FixtureSpec::default());
    patch_u32(&mut bytes, &stbl_path(b"stts"), FIELD_1, u32::MAX);
    let (d, samples) = demux_all(&bytes, 4096);
    assert_eq!(d.track().unwrap().samples.len(), 30);
    assert_eq!(samples.len(), 30);
    assert!(samples.iter().all(|s| s.duration_us == 33_333));
}

#[test]
fn rejects_chunk_offsets_that_overflow() {
    let base = build_avc_mp4(&FixtureSpec::default());
    let mut co64 = vec![0u8; 4];
    co64.extend_from_slice(&8u32.to_be_bytes());
    co64.extend_from_slice(&0xFFFF_FFFF_FFFF_FFF0u64.to_be_bytes());
    for c in 1..8u64 {
        co64.extend_from_slice(&(c * 28).to_be_bytes());
    }
    let mut boxed = ((co64.len() + 8) as u32).to_be_bytes().to_vec();
    boxed.extend_from_slice(b"co64");
    boxed.extend_from_slice(&co64);

    let bytes = replace_box(&base, &stbl_path(b"stco"), &boxed);
    assert_rejected(&bytes);
}
