use super::*;
use std::io::Write;

#[test]
fn span_bounds_are_checked() {
    let src = MemorySource::from_vec(vec![1, 2, 3, 4]);

    assert_eq!(src.span(0, 4).unwrap(), &[1, 2, 3, 4]);
    assert_eq!(src.span(1, 2).unwrap(), &[2, 3]);
    assert_eq!(src.span(4, 0).unwrap(), &[] as &[u8]);

    assert!(src.span(0, 5).is_err());
    assert!(src.span(5, 0).is_err());
    assert!(src.span(usize::MAX, 2).is_err());
}

#[test]
fn mapped_file_round_trips() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"hello index").unwrap();
    tmp.flush().unwrap();

    let src = MemorySource::map(tmp.path()).unwrap();
    assert_eq!(src.as_slice(), b"hello index");
    assert_eq!(src.span(6, 5).unwrap(), b"index");
}

#[test]
fn map_missing_file_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    assert!(MemorySource::map(&dir.path().join("absent")).is_err());
}
