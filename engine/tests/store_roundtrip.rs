use std::fs;

use tempfile::tempdir;

use credvault::crypto::kdf::SALT_LEN;
use credvault::{CredentialRecord, CredentialStore, PersistentSalt, SessionKey};

fn session_key() -> SessionKey {
    SessionKey::install("roundtrip-master", &PersistentSalt::from_bytes([0x11; SALT_LEN]))
}

fn store_in(dir: &std::path::Path) -> CredentialStore {
    CredentialStore::new(dir.join("credentials.dat"), dir.join("credentials_backup.dat"))
}

#[test]
fn example_mail_secret_survives_reload() {
    // 单条记录：保存、重新加载后解密得到原密码
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let record = CredentialRecord::new("ExampleMail", "alice", &key.encrypt("p@ss").expect("encrypt"))
        .expect("valid record");
    store.persist(&key, &[record]).expect("persist");

    let loaded = store.load(&key).expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].service, "ExampleMail");
    assert_eq!(loaded[0].username, "alice");
    assert_eq!(key.decrypt(&loaded[0].encrypted_secret).expect("decrypt").as_str(), "p@ss");
}

#[test]
fn empty_single_and_many_records_roundtrip() {
    let key = session_key();

    let many: Vec<CredentialRecord> = (0..12)
        .map(|i| {
            CredentialRecord::new(
                &format!("Service {i}"),
                &format!("user{i}@example.com"),
                &key.encrypt(&format!("secret-{i}")).expect("encrypt"),
            )
            .expect("valid record")
        })
        .collect();

    for records in [Vec::new(), many[..1].to_vec(), many.clone()] {
        let temp_dir = tempdir().expect("create temp dir");
        let store = store_in(temp_dir.path());

        store.persist(&key, &records).expect("persist");
        assert_eq!(store.load(&key).expect("load"), records);
    }
}

#[test]
fn maximum_field_lengths_roundtrip() {
    // 64 字符明文 → 124 字符信封，落在 128 的上限内
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let envelope = key.encrypt(&"s".repeat(64)).expect("encrypt");
    assert!(envelope.len() <= 128);

    let record = CredentialRecord::new(&"S".repeat(50), &"u".repeat(50), &envelope).expect("valid record");
    store.persist(&key, std::slice::from_ref(&record)).expect("persist");

    assert_eq!(store.load(&key).expect("load"), vec![record]);
}

#[test]
fn tampered_line_is_skipped_others_survive() {
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let records: Vec<_> = ["Alpha", "Beta", "Gamma"]
        .iter()
        .map(|s| CredentialRecord::new(s, "bob", &key.encrypt("pw").expect("encrypt")).expect("valid"))
        .collect();
    store.persist(&key, &records).expect("persist");

    let content = fs::read_to_string(store.path()).expect("read store");
    let mut lines: Vec<String> = content.lines().map(str::to_owned).collect();
    // 翻转第二行中间的一个 base64 字符
    let mid = lines[1].len() / 2;
    let flipped = if &lines[1][mid..mid + 1] == "A" { "B" } else { "A" };
    lines[1].replace_range(mid..mid + 1, flipped);
    fs::write(store.path(), lines.join("\n") + "\n").expect("write tampered store");

    let loaded = store.load(&key).expect("load");
    let services: Vec<_> = loaded.iter().map(|r| r.service.as_str()).collect();
    assert_eq!(services, ["Alpha", "Gamma"]);
}

#[test]
fn store_file_is_line_per_record_and_opaque() {
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let records: Vec<_> = ["Alpha", "Beta"]
        .iter()
        .map(|s| CredentialRecord::new(s, "bob", &key.encrypt("pw").expect("encrypt")).expect("valid"))
        .collect();
    store.persist(&key, &records).expect("persist");

    let content = fs::read_to_string(store.path()).expect("read store");
    assert_eq!(content.lines().count(), 2);
    assert!(!content.contains("Alpha"));
    assert!(!content.contains("bob"));
}

#[test]
fn non_utf8_line_is_skipped_others_survive() {
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let records: Vec<_> = ["Alpha", "Beta", "Gamma"]
        .iter()
        .map(|s| CredentialRecord::new(s, "bob", &key.encrypt("pw").expect("encrypt")).expect("valid"))
        .collect();
    store.persist(&key, &records).expect("persist");

    // 第一行第 4 个字节改成孤立的 UTF-8 前导字节
    let mut bytes = fs::read(store.path()).expect("read store");
    bytes[3] = 0xC3;
    fs::write(store.path(), &bytes).expect("write corrupted store");

    let loaded = store.load(&key).expect("load must not abort");
    let services: Vec<_> = loaded.iter().map(|r| r.service.as_str()).collect();
    assert_eq!(services, ["Beta", "Gamma"]);
}

#[test]
fn crlf_line_endings_are_accepted() {
    let temp_dir = tempdir().expect("create temp dir");
    let key = session_key();
    let store = store_in(temp_dir.path());

    let records: Vec<_> = ["Alpha", "Beta"]
        .iter()
        .map(|s| CredentialRecord::new(s, "bob", &key.encrypt("pw").expect("encrypt")).expect("valid"))
        .collect();
    store.persist(&key, &records).expect("persist");

    let content = fs::read_to_string(store.path()).expect("read store");
    fs::write(store.path(), content.replace('\n', "\r\n")).expect("rewrite with CRLF");

    assert_eq!(store.load(&key).expect("load"), records);
}
