use super::*;

fn build(entries: &[&str], sorted: bool) -> MemorySource {
    let mut buf = Vec::new();
    write_payload_vector(&mut buf, entries.iter().map(|s| s.as_bytes()), sorted).unwrap();
    MemorySource::from_vec(buf)
}

#[test]
fn get_and_find_sorted() {
    let src = build(&["alpha", "beta", "delta", "gamma"], true);
    let vec = PayloadVector::parse(&src).unwrap();

    assert_eq!(vec.len(), 4);
    assert_eq!(vec.get(0).unwrap(), b"alpha");
    assert_eq!(vec.get(3).unwrap(), b"gamma");
    assert!(vec.get(4).is_none());

    assert_eq!(vec.find(b"alpha"), Some(0));
    assert_eq!(vec.find(b"delta"), Some(2));
    assert_eq!(vec.find(b"gamma"), Some(3));
    assert_eq!(vec.find(b"epsilon"), None);
    assert_eq!(vec.find(b""), None);
}

#[test]
fn find_unsorted_falls_back_to_scan() {
    let src = build(&["zeta", "alpha", "mu"], false);
    let vec = PayloadVector::parse(&src).unwrap();

    assert_eq!(vec.find(b"zeta"), Some(0));
    assert_eq!(vec.find(b"mu"), Some(2));
    assert_eq!(vec.find(b"nu"), None);
}

#[test]
fn empty_vector() {
    let src = build(&[], true);
    let vec = PayloadVector::parse(&src).unwrap();
    assert!(vec.is_empty());
    assert_eq!(vec.find(b"anything"), None);
}

#[test]
fn bad_magic_rejected() {
    let mut buf = Vec::new();
    write_payload_vector(&mut buf, [b"x".as_slice()], true).unwrap();
    buf[0] = 0xFF;
    let src = MemorySource::from_vec(buf);
    assert!(PayloadVector::parse(&src).is_err());
}

#[test]
fn nonzero_reserved_rejected() {
    let mut buf = Vec::new();
    write_payload_vector(&mut buf, [b"x".as_slice()], true).unwrap();
    buf[5] = 1;
    let src = MemorySource::from_vec(buf);
    assert!(PayloadVector::parse(&src).is_err());
}

#[test]
fn truncated_offsets_rejected() {
    let mut buf = Vec::new();
    write_payload_vector(&mut buf, [b"abc".as_slice(), b"defg"], true).unwrap();
    buf.truncate(18);
    let src = MemorySource::from_vec(buf);
    assert!(PayloadVector::parse(&src).is_err());
}

#[test]
fn lexicon_round_trips_through_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("terms.termlex");

    let mut terms = vec!["giraffe", "ant", "zebra", "bee"];
    terms.sort_unstable();
    write_lexicon(&path, &terms).unwrap();

    let lex = Lexicon::open(&path).unwrap();
    assert_eq!(lex.len(), 4);
    assert_eq!(lex.get(0), Some("ant"));
    assert_eq!(lex.find("zebra"), Some(3));
    assert_eq!(lex.find("wasp"), None);
}
