use super::*;

const SPS: [u8; 4] = [0x67, 0x64, 0x00, 0x1f];
const PPS: [u8; 3] = [0x68, 0xeb, 0xe3];

fn sample_config() -> AvcDecoderConfig {
    AvcDecoderConfig {
        version: 1,
        profile: 0x64,
        profile_compat: 0x00,
        level: 0x1f,
        length_size_minus_one: 3,
        sps: vec![SPS.to_vec()],
        pps: vec![PPS.to_vec()],
    }
}

#[test]
fn description_has_exact_layout() {
    let d = sample_config().to_description();
    assert_eq!(
        d,
        vec![
            1, 0x64, 0x00, 0x1f, 0xff, 0xe1, 0x00, 0x04, 0x67, 0x64, 0x00, 0x1f, 0x01, 0x00,
            0x03, 0x68, 0xeb, 0xe3
        ]
    );
}

#[test]
fn parse_reads_what_encoders_write() {
    let cfg = sample_config();
    let parsed = AvcDecoderConfig::parse(&cfg.to_description()).unwrap();
    assert_eq!(parsed, cfg);
    assert_eq!(parsed.nal_length_size(), 4);
}

#[test]
fn parse_rejects_garbage() {
    assert!(matches!(
        AvcDecoderConfig::parse(&[1, 2]),
        Err(ScrollyError::UnsupportedContainer(_))
    ));
    assert!(matches!(
        AvcDecoderConfig::parse(&[0, 0x64, 0, 0x1f, 0xff, 0xe0, 0]),
        Err(ScrollyError::UnsupportedContainer(_))
    ));
    assert!(matches!(
        AvcDecoderConfig::parse(&[1, 0x64, 0, 0x1f, 0xff, 0xe0, 0]),
        Err(ScrollyError::UnsupportedContainer(_))
    ));
}

#[test]
fn codec_string_is_hex_triplet() {
    assert_eq!(sample_config().codec_string("avc1"), "avc1.64001f");
}

#[test]
fn annex_b_prepends_parameter_sets_on_keyframes() {
    let cfg = sample_config();
    let sample = [0, 0, 0, 2, 0x65, 0xaa, 0, 0, 0, 1, 0x06];
    let key = cfg.to_annex_b(&sample, true).unwrap();
    let mut expected = vec![0, 0, 0, 1];
    expected.extend_from_slice(&SPS);
    expected.extend_from_slice(&[0, 0, 0, 1]);
    expected.extend_from_slice(&PPS);
    expected.extend_from_slice(&[0, 0, 0, 1, 0x65, 0xaa, 0, 0, 0, 1, 0x06]);
    assert_eq!(key, expected);

    let delta = cfg.to_annex_b(&[0, 0, 0, 1, 0x41], false).unwrap();
    assert_eq!(delta, vec![0, 0, 0, 1, 0x41]);
}

#[test]
fn annex_b_rejects_overruns() {
    let cfg = sample_config();
    assert!(matches!(
        cfg.to_annex_b(&[0, 0, 0, 9, 0x41], false),
        Err(ScrollyError::DecoderRuntime(_))
    ));
    assert!(matches!(
        cfg.to_annex_b(&[0, 0], false),
        Err(ScrollyError::DecoderRuntime(_))
    ));
}
