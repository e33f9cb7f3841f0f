use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;
use vpack::builder::{build, build_with_options, BuildOptions};
use vpack::entry::{DirEntry, EntryKind, DIR_ENTRY_SIZE};
use vpack::{ErrorKind, Header, VpArchive, VpError};

fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (rel, data) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }
}

fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn table(archive: &Path) -> Vec<DirEntry> {
    let bytes = fs::read(archive).unwrap();
    let header = Header::read(&bytes[..]).unwrap();
    (0..header.dir_count as usize)
        .map(|i| {
            let start = header.dir_offset as usize + i * DIR_ENTRY_SIZE as usize;
            DirEntry::read(&bytes[start..start + DIR_ENTRY_SIZE as usize]).unwrap()
        })
        .collect()
}

const TREE: &[(&str, &[u8])] = &[
    ("readme.txt", b"top level"),
    ("models/ship.obj", b"v 0 0 0\nv 1 0 0\n"),
    ("models/parts/wing.obj", b"v 2 2 2\n"),
    ("tables/ships.tbl", b"#Ship Classes\n$Name: GTF Ulysses\n#End\n"),
    ("Zeta/upper.bin", &[0, 1, 2, 3, 255]),
];

#[test]
fn test_build_extract_roundtrip() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);

    let archive_path = out.path().join("mod.vp");
    let summary = build(src.path(), &archive_path).unwrap();
    assert_eq!(summary.files, TREE.len());
    assert_eq!(summary.directories, 4);

    let dest = out.path().join("extracted");
    let mut ar = VpArchive::open(&archive_path).unwrap();
    assert_eq!(ar.len(), TREE.len());
    assert_eq!(ar.extract_all(&dest).unwrap(), TREE.len());

    assert_eq!(read_tree(&dest.join("mod")), read_tree(src.path()));
}

#[test]
fn test_table_is_sorted_preorder() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);
    let archive_path = out.path().join("order.vp");
    build(src.path(), &archive_path).unwrap();

    let names: Vec<String> = table(&archive_path).into_iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec![
            "Zeta", "upper.bin", "..",
            "models", "parts", "wing.obj", "..", "ship.obj", "..",
            "readme.txt",
            "tables", "ships.tbl", "..",
        ]
    );
}

#[test]
fn test_payload_offsets_follow_table_order() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);
    let archive_path = out.path().join("offsets.vp");
    build(src.path(), &archive_path).unwrap();

    let mut next = 16;
    for record in table(&archive_path) {
        match record.kind() {
            EntryKind::File => {
                assert_eq!(record.offset, next, "{}", record.name);
                next += record.size;
            }
            _ => assert_eq!(record.offset, 0),
        }
    }
    let bytes = fs::read(&archive_path).unwrap();
    assert_eq!(Header::read(&bytes[..]).unwrap().dir_offset as i32, next);
}

#[test]
fn test_build_is_deterministic() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);

    let a = out.path().join("a.vp");
    let b = out.path().join("b.vp");
    build(src.path(), &a).unwrap();
    build(src.path(), &b).unwrap();
    assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
}

#[test]
fn test_data_child_becomes_root() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), &[
        ("data/tables/weapons.tbl", b"#Primary Weapons"),
        ("data/mission.fs2", b"#Mission Info"),
        ("notes.txt", b"not packaged"),
    ]);

    let archive_path = out.path().join("campaign.vp");
    build(src.path(), &archive_path).unwrap();

    let ar = VpArchive::open(&archive_path).unwrap();
    let paths: Vec<&str> = ar.entries().map(|(p, _)| p).collect();
    assert_eq!(paths, vec!["mission.fs2", "tables/weapons.tbl"]);
}

#[test]
fn test_data_detection_can_be_disabled() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), &[("data/a.txt", b"a"), ("b.txt", b"b")]);

    let archive_path = out.path().join("all.vp");
    let opts = BuildOptions { detect_data_root: false, preserve_timestamps: false };
    build_with_options(src.path(), &archive_path, &opts).unwrap();

    let ar = VpArchive::open(&archive_path).unwrap();
    assert!(ar.get("data/a.txt").is_some());
    assert!(ar.get("b.txt").is_some());
    assert!(ar.entries().all(|(_, e)| e.timestamp == 0));
}

#[test]
fn test_empty_files_are_skipped() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), &[("keep.txt", b"x"), ("empty.txt", b"")]);

    let archive_path = out.path().join("skip.vp");
    let summary = build(src.path(), &archive_path).unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.skipped, vec![src.path().join("empty.txt")]);

    let ar = VpArchive::open(&archive_path).unwrap();
    assert_eq!(ar.entries().map(|(p, _)| p).collect::<Vec<_>>(), vec!["keep.txt"]);
}

#[test]
fn test_overlong_source_name_aborts_build() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let long = format!("{}.txt", "n".repeat(40));
    write_tree(src.path(), &[(long.as_str(), b"x")]);

    let err = build(src.path(), out.path().join("bad.vp")).unwrap_err();
    assert!(matches!(err, VpError::NameTooLong { .. }));
}

#[test]
fn test_build_missing_source() {
    let out = TempDir::new().unwrap();
    let err = build(out.path().join("nope"), out.path().join("x.vp")).unwrap_err();
    assert!(matches!(err, VpError::NotFound(_)));
}

#[test]
fn test_unwritable_destination_aborts_build() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);

    let err = build(src.path(), out.path().join("no/such/dir/x.vp")).unwrap_err();
    assert!(matches!(err, VpError::Io(_)));
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[cfg(unix)]
#[test]
fn test_unreadable_source_file_aborts_build() {
    use std::os::unix::fs::PermissionsExt;

    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), &[("a.txt", b"readable"), ("b.txt", b"locked")]);
    let locked = src.path().join("b.txt");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::File::open(&locked).is_ok() {
        // Privileged users bypass file modes.
        return;
    }

    let archive_path = out.path().join("locked.vp");
    let err = build(src.path(), &archive_path).unwrap_err();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(err.kind(), ErrorKind::Io);
    // The header is never patched, so what was written does not open.
    assert!(VpArchive::open(&archive_path).is_err());
}

#[test]
fn test_extract_single_entry() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);
    let archive_path = out.path().join("one.vp");
    build(src.path(), &archive_path).unwrap();

    let mut ar = VpArchive::open(&archive_path).unwrap();
    let dest = out.path().join("dest");
    let written = ar.extract("models/parts/wing.obj", &dest).unwrap();
    assert_eq!(written, dest.join("one").join("models").join("parts").join("wing.obj"));
    assert_eq!(fs::read(&written).unwrap(), b"v 2 2 2\n");

    // Existing files are overwritten.
    fs::write(&written, b"stale").unwrap();
    ar.extract("models/parts/wing.obj", &dest).unwrap();
    assert_eq!(fs::read(&written).unwrap(), b"v 2 2 2\n");
}

#[test]
fn test_read_payload_and_digest() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), TREE);
    let archive_path = out.path().join("read.vp");
    build(src.path(), &archive_path).unwrap();

    let mut ar = VpArchive::open(&archive_path).unwrap();
    assert_eq!(ar.read_payload("readme.txt").unwrap(), b"top level");
    assert_eq!(ar.digest("readme.txt").unwrap(), *blake3::hash(b"top level").as_bytes());
    assert!(matches!(ar.read_payload("models"), Err(VpError::EntryNotFound(_))));
    assert!(matches!(ar.read_payload("missing.txt"), Err(VpError::EntryNotFound(_))));
    ar.close();
}

#[test]
fn test_open_missing_archive() {
    let dir = TempDir::new().unwrap();
    let err = VpArchive::open(dir.path().join("absent.vp")).unwrap_err();
    assert!(matches!(err, VpError::NotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_extract_restores_mtime() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    write_tree(src.path(), &[("t.txt", b"time")]);
    let mtime = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
    fs::File::options()
        .write(true)
        .open(src.path().join("t.txt"))
        .unwrap()
        .set_modified(mtime)
        .unwrap();

    let archive_path = out.path().join("time.vp");
    build(src.path(), &archive_path).unwrap();
    let mut ar = VpArchive::open(&archive_path).unwrap();
    assert_eq!(ar.get("t.txt").unwrap().timestamp, 1_000_000_000);

    let written = ar.extract("t.txt", out.path()).unwrap();
    assert_eq!(fs::metadata(written).unwrap().modified().unwrap(), mtime);
}
