use postsmith_engine::{ensure_state_dir, AtomicFileWriter, PersistError};
use pretty_assertions::assert_eq;

#[test]
fn writer_creates_and_replaces_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let writer = AtomicFileWriter::new(dir.path().to_path_buf());

    let path = writer.write("state.ron", "first").expect("first write");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first");

    let path = writer.write("state.ron", "second").expect("second write");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn ensure_state_dir_creates_missing_directories() {
    let dir = tempfile::tempdir().expect("tempdir");
    let nested = dir.path().join("a/b");

    ensure_state_dir(&nested).expect("create nested");
    assert!(nested.is_dir());
}

#[test]
fn ensure_state_dir_rejects_regular_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("not_a_dir");
    std::fs::write(&file, "x").expect("write file");

    let err = ensure_state_dir(&file).unwrap_err();
    assert!(matches!(err, PersistError::StateDir(_)));
}
