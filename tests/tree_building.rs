//! Integration tests for building directory trees from archives.

mod common;

use std::io::Cursor;

use zipcull::{EntryPath, NodeId, NodeKind, Timestamp, TreeBuilder};

use common::{create_zip, raw_stored_zip, shift_jis};

#[test]
fn test_intermediate_directories_exist() {
    let bytes = create_zip(&[
        ("a/b/c.txt", b"c"),
        ("a/d.txt", b"d"),
        ("e.txt", b"e"),
    ]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();

    let a = tree.find(&EntryPath::from("a/")).unwrap();
    let ab = tree.find(&EntryPath::from("a/b/")).unwrap();
    let c = tree.find(&EntryPath::from("a/b/c.txt")).unwrap();
    let e = tree.find(&EntryPath::from("e.txt")).unwrap();

    assert!(tree.node(a).is_dir());
    assert!(tree.node(ab).is_dir());
    assert_eq!(tree.node(c).parent(), Some(ab));
    assert_eq!(tree.node(ab).parent(), Some(a));
    assert_eq!(tree.node(e).parent(), Some(NodeId::ROOT));

    assert_eq!(tree.root().children(), &[a]);
    assert_eq!(tree.node(a).files().len(), 1);
    assert_eq!(tree.node(ab).files(), &[c]);
}

#[test]
fn test_files_are_not_children() {
    let bytes = create_zip(&[("dir/file.txt", b"x")]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();
    let dir = tree.find(&EntryPath::from("dir/")).unwrap();
    assert!(tree.node(dir).children().is_empty());
    assert_eq!(tree.node(dir).files().len(), 1);
}

#[test]
fn test_directory_before_and_after_its_files() {
    let bytes = create_zip(&[("x/1.txt", b"1"), ("x/", b""), ("x/2.txt", b"2")]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();
    assert_eq!(tree.dir_count(), 1);
    let x = tree.find(&EntryPath::from("x/")).unwrap();
    assert_eq!(tree.node(x).files().len(), 2);
}

#[test]
fn test_shift_jis_names() {
    let bytes = raw_stored_zip(&[
        (&shift_jis("資料/"), b""),
        (&shift_jis("資料/会議メモ.txt"), b"memo"),
        (&shift_jis("写真/旅行/空.jpg"), b"jpeg"),
    ]);
    let tree = TreeBuilder::new()
        .build("sjis.zip", Cursor::new(bytes))
        .unwrap();

    assert!(tree.find(&EntryPath::from("資料/")).is_some());
    assert!(tree.find(&EntryPath::from("資料/会議メモ.txt")).is_some());
    assert!(tree.find(&EntryPath::from("写真/旅行/")).is_some());
    let sky = tree.find(&EntryPath::from("写真/旅行/空.jpg")).unwrap();
    assert_eq!(tree.node(sky).name(), "空.jpg");
}

#[test]
fn test_trail_byte_5c_is_not_a_separator() {
    // 表 is 0x95 0x5C and ソ is 0x83 0x5C in Shift-JIS
    let bytes = raw_stored_zip(&[(&shift_jis("表/ソフト.txt"), b"x")]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();

    assert_eq!(tree.dir_count(), 1);
    let file = tree.find(&EntryPath::from("表/ソフト.txt")).unwrap();
    assert_eq!(tree.node(file).name(), "ソフト.txt");
}

#[test]
fn test_same_name_in_two_archives_decodes_identically() {
    let name = shift_jis("報告書/第一四半期.xlsx");
    let first = raw_stored_zip(&[(&name, b"a")]);
    let second = raw_stored_zip(&[(b"readme.txt", b"r"), (&name, b"bbbb")]);

    let a = TreeBuilder::new().build("1.zip", Cursor::new(first)).unwrap();
    let b = TreeBuilder::new().build("2.zip", Cursor::new(second)).unwrap();
    let path = EntryPath::from("報告書/第一四半期.xlsx");
    assert!(a.find(&path).is_some());
    assert!(b.find(&path).is_some());
}

#[test]
fn test_raw_entry_metadata() {
    let bytes = raw_stored_zip(&[(b"data.bin", b"0123456789")]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();
    let id = tree.find(&EntryPath::from("data.bin")).unwrap();
    let node = tree.node(id);
    assert_eq!(node.size(), Some(10));
    assert_eq!(node.modified(), Some(Timestamp::new(2020, 2, 3, 4, 5, 6)));
    assert!(matches!(node.kind(), NodeKind::File { compressed_size: 10, .. }));
}

#[test]
fn test_walk_is_pre_order() {
    let bytes = create_zip(&[
        ("top.txt", b""),
        ("a/a1.txt", b""),
        ("a/b/b1.txt", b""),
        ("c/c1.txt", b""),
    ]);
    let tree = TreeBuilder::new()
        .build("t.zip", Cursor::new(bytes))
        .unwrap();
    let order: Vec<_> = tree
        .walk(NodeId::ROOT)
        .map(|(_, n)| n.path().as_str().to_string())
        .collect();
    assert_eq!(
        order,
        vec!["", "top.txt", "a/", "a/a1.txt", "a/b/", "a/b/b1.txt", "c/", "c/c1.txt"]
    );
}

#[test]
fn test_empty_archive() {
    let tree = TreeBuilder::new()
        .build("empty.zip", Cursor::new(create_zip(&[])))
        .unwrap();
    assert!(tree.is_empty());
    assert_eq!(tree.file_count(), 0);
}

#[test]
fn test_truncated_archive_is_open_error() {
    let mut bytes = create_zip(&[("a.txt", b"hello")]);
    bytes.truncate(bytes.len() - 10);
    let err = TreeBuilder::new()
        .build("cut.zip", Cursor::new(bytes))
        .unwrap_err();
    assert!(err.is_archive_open());
}
