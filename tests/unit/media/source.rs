use super::*;

#[test]
fn memory_source_streams_registered_bytes() {
    let src = MemorySource::new().with("clip.mp4", vec![1u8, 2, 3]);
    let mut out = Vec::new();
    src.open("clip.mp4").unwrap().read_to_end(&mut out).unwrap();
    assert_eq!(out, vec![1, 2, 3]);
    assert!(matches!(src.open("other.mp4"), Err(ScrollyError::Fetch(_))));
}

#[test]
fn file_source_accepts_paths_and_file_uris() {
    let dir = std::env::temp_dir().join(format!("scrolly-src-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("a.bin"), b"abc").unwrap();

    let plain = FileSource::new();
    let mut out = String::new();
    plain
        .open(&format!("file://{}", dir.join("a.bin").display()))
        .unwrap()
        .read_to_string(&mut out)
        .unwrap();
    assert_eq!(out, "abc");

    let rooted = FileSource::with_root(&dir);
    assert!(rooted.open("a.bin").is_ok());
    assert!(matches!(rooted.open("missing.bin"), Err(ScrollyError::Fetch(_))));

    std::fs::remove_dir_all(&dir).ok();
}
