use super::*;
use crate::media::mp4_fixture::{FixtureSpec, avcc_payload, build_avc_mp4};
use crate::media::mp4::Mp4Demuxer;

#[test]
fn codec_config_comes_from_the_track() {
    let mut d = Mp4Demuxer::new();
    d.append(&build_avc_mp4(&FixtureSpec::default())).unwrap();
    let cfg = CodecConfig::from_track(d.track().unwrap());
    assert_eq!(cfg.codec, "avc1.64001f");
    assert_eq!(cfg.description, avcc_payload());
    assert_eq!((cfg.coded_width, cfg.coded_height), (64, 48));
}

#[test]
fn description_serializes_as_hex() {
    let cfg = CodecConfig {
        codec: "avc1.42e01e".into(),
        description: vec![0x01, 0xab],
        coded_width: 2,
        coded_height: 2,
    };
    let v = serde_json::to_value(&cfg).unwrap();
    assert_eq!(v["description"], "01ab");
    let back: CodecConfig = serde_json::from_value(v).unwrap();
    assert_eq!(back, cfg);
    assert!(serde_json::from_str::<CodecConfig>(
        r#"{"codec":"x","description":"abc","coded_width":1,"coded_height":1}"#
    )
    .is_err());
}
