//! Integration tests for ShareOperations.
//!
//! Focus areas:
//! - Sidecars stay aligned with file content and identity
//! - Index notifications happen in unindex-then-index order
//! - Nothing ever touches files outside the share root
//! - Error kinds match the documented failure table

mod common;

use std::fs;
use std::io::Read;

use common::{DeletionWitness, FailingIndex, IndexEvent, RecordingIndex, ShareBuilder, init_tracing};
use sharebox_core::checksum::digest_bytes;
use sharebox_core::{DeleteStats, EntryKind, IndexFailurePolicy, ShareErrorKind};

// ==================== Upload ====================

#[test]
fn test_upload_checksum_matches_content() {
    init_tracing();
    let share = ShareBuilder::new().add_directory("docs").build();

    let content = b"The quick brown fox jumps over the lazy dog";
    let digest = share
        .ops
        .upload(Some("docs"), Some("fox.txt"), &content[..], false, None)
        .unwrap();

    assert_eq!(digest.to_hex(), "9e107d9d372bb6826bd81d3542a419d6");
    let raw = fs::read_to_string(share.sidecar_of("docs/fox.txt")).unwrap();
    assert_eq!(raw, "9e107d9d372bb6826bd81d3542a419d6\n");
}

#[test]
fn test_upload_collision_leaves_existing_file_untouched() {
    let share = ShareBuilder::new()
        .add_described_file("report.pdf", b"original".to_vec(), "keep me")
        .build();

    let err = share
        .ops
        .upload(None, Some("report.pdf"), &b"replacement"[..], true, Some("new"))
        .unwrap_err();

    assert_eq!(err.kind(), ShareErrorKind::AlreadyExists);
    assert_eq!(fs::read(share.path("report.pdf")).unwrap(), b"original");
    assert_eq!(share.ops.get_comment(None, "report.pdf").unwrap(), "keep me");
}

#[test]
fn test_upload_indexes_when_requested() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new().with_index(index.clone()).build();

    share
        .ops
        .upload(None, Some("annual_report-2024.pdf"), &b"data"[..], true, Some("finance"))
        .unwrap();

    let events = index.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        IndexEvent::Indexed {
            url_token,
            phrase,
            comment,
            checksum,
        } => {
            let hex = digest_bytes(b"data").to_hex();
            assert_eq!(url_token, &format!("share://test-peer/annual_report-2024.pdf?md5={hex}"));
            assert_eq!(phrase, "annual report 2024 pdf");
            assert_eq!(comment, "finance");
            assert_eq!(checksum.as_slice(), digest_bytes(b"data").as_bytes());
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn test_upload_without_index_flag_is_silent() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new().with_index(index.clone()).build();

    share.ops.upload(None, Some("a.txt"), &b"a"[..], false, None).unwrap();
    assert!(index.events().is_empty());
}

#[test]
fn test_upload_into_missing_directory() {
    let share = ShareBuilder::new().build();
    let err = share
        .ops
        .upload(Some("nowhere"), Some("a.txt"), &b"a"[..], false, None)
        .unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::NotFound);
}

// ==================== Containment ====================

#[test]
fn test_traversal_never_touches_outside_files() {
    let share = ShareBuilder::new()
        .add_directory("docs")
        .add_outside_file("secret.txt", b"top secret".to_vec())
        .build();
    let secret = share.outside().join("secret.txt");

    for dir in ["..", "../", "docs/../..", "//", "/../share/.."] {
        let err = share.ops.list(Some(dir)).unwrap_err();
        assert_eq!(err.kind(), ShareErrorKind::TraversalDenied, "dir: {dir}");

        let err = share.ops.delete(Some(dir), "secret.txt").unwrap_err();
        assert_eq!(err.kind(), ShareErrorKind::TraversalDenied, "dir: {dir}");
    }

    for name in ["../secret.txt", "..\\secret.txt", "docs/../../secret.txt"] {
        let err = share.ops.delete(None, name).unwrap_err();
        assert_eq!(err.kind(), ShareErrorKind::IllegalName, "name: {name}");
    }

    assert_eq!(fs::read(&secret).unwrap(), b"top secret");
}

#[test]
fn test_root_cannot_be_deleted_or_renamed() {
    let share = ShareBuilder::new().add_file("a.txt", b"a".to_vec()).build();

    for name in [".", ".."] {
        assert!(share.ops.delete(None, name).is_err(), "name: {name}");
    }
    let err = share.ops.delete(None, ".").unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::ForbiddenTarget);

    let err = share.ops.rename(None, ".", "moved", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::ForbiddenTarget);

    assert!(share.root().is_dir());
    assert!(share.path("a.txt").is_file());
}

#[test]
fn test_subdirectory_cannot_delete_itself() {
    let share = ShareBuilder::new().add_file("docs/a.txt", b"a".to_vec()).build();
    let err = share.ops.delete(Some("docs"), ".").unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::ForbiddenTarget);
    assert!(share.path("docs/a.txt").is_file());
}

#[cfg(unix)]
#[test]
fn test_symlink_escape_is_denied_for_every_operation() {
    use std::os::unix::fs::symlink;

    let share = ShareBuilder::new()
        .add_outside_file("secret.txt", b"top secret".to_vec())
        .build();
    symlink(share.outside().join("secret.txt"), share.path("link.txt")).unwrap();
    symlink(share.outside(), share.path("up")).unwrap();

    let ops = &share.ops;
    assert_eq!(ops.download(None, "link.txt").unwrap_err().kind(), ShareErrorKind::TraversalDenied);
    assert_eq!(ops.get_comment(None, "link.txt").unwrap_err().kind(), ShareErrorKind::TraversalDenied);
    assert_eq!(
        ops.set_comment(None, "link.txt", "x", false).unwrap_err().kind(),
        ShareErrorKind::TraversalDenied
    );
    assert_eq!(ops.delete(None, "link.txt").unwrap_err().kind(), ShareErrorKind::TraversalDenied);
    assert_eq!(ops.list(Some("up")).unwrap_err().kind(), ShareErrorKind::TraversalDenied);

    assert_eq!(fs::read(share.outside().join("secret.txt")).unwrap(), b"top secret");
    assert!(!share.outside().join("secret.txt.md5").exists());
}

#[test]
fn test_path_too_long() {
    let probe = ShareBuilder::new().build();
    let root_len = probe.root().as_os_str().len();
    drop(probe);

    let share = ShareBuilder::new().with_max_path_length(root_len + 100).build();
    let long_name = "n".repeat(200);
    let err = share
        .ops
        .upload(None, Some(&long_name), &b"x"[..], false, None)
        .unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::PathTooLong);
    assert!(!share.path(&long_name).exists());
}

// ==================== Listing ====================

#[test]
fn test_listing_hides_sidecars() {
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"alpha".to_vec(), "first")
        .add_file("b.bin", b"beta".to_vec())
        .add_directory("sub")
        .build();

    let listing = share.ops.list(None).unwrap();
    assert_eq!(listing.relative, "/");
    let names: Vec<_> = listing.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["a.txt", "b.bin", "sub"]);

    let a = listing.get("a.txt").unwrap();
    assert_eq!(a.comment, "first");
    assert_eq!(a.checksum, digest_bytes(b"alpha").to_hex());
    assert_eq!(listing.get("sub").unwrap().kind, EntryKind::Directory);

    let sub = share.ops.list(Some("/sub")).unwrap();
    assert_eq!(sub.relative, "sub/");
    assert!(sub.entries.is_empty());
}

// ==================== Metadata reads ====================

#[test]
fn test_metadata_reads_require_regular_file() {
    let share = ShareBuilder::new().add_directory("docs").build();

    assert_eq!(share.ops.get_comment(None, "docs").unwrap_err().kind(), ShareErrorKind::NotAFile);
    assert_eq!(share.ops.get_checksum(None, "missing").unwrap_err().kind(), ShareErrorKind::NotFound);
    assert_eq!(share.ops.download(None, "docs").unwrap_err().kind(), ShareErrorKind::NotAFile);
}

#[test]
fn test_file_without_sidecar_reads_empty() {
    let share = ShareBuilder::new().add_file("plain.txt", b"plain".to_vec()).build();
    assert_eq!(share.ops.get_comment(None, "plain.txt").unwrap(), "");
    assert_eq!(share.ops.get_checksum(None, "plain.txt").unwrap(), "");
    assert_eq!(share.ops.download(None, "plain.txt").unwrap().checksum(), "");
}

#[test]
fn test_stale_sidecar_is_served_as_is() {
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"before".to_vec(), "note")
        .build();
    fs::write(share.path("a.txt"), b"after").unwrap();

    let mut download = share.ops.download(None, "a.txt").unwrap();
    assert_eq!(download.checksum(), digest_bytes(b"before").to_hex());
    let mut content = String::new();
    download.read_to_string(&mut content).unwrap();
    assert_eq!(content, "after");
}

// ==================== Rename & move ====================

#[test]
fn test_rename_carries_comment_and_recomputes_checksum() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("draft.txt", b"content".to_vec(), "my notes")
        .with_index(index.clone())
        .build();

    share.ops.rename(None, "draft.txt", "final.txt", true).unwrap();

    assert!(!share.path("draft.txt").exists());
    assert!(!share.sidecar_of("draft.txt").exists());
    assert_eq!(fs::read(share.path("final.txt")).unwrap(), b"content");
    assert_eq!(share.ops.get_comment(None, "final.txt").unwrap(), "my notes");
    assert_eq!(
        share.ops.get_checksum(None, "final.txt").unwrap(),
        digest_bytes(b"content").to_hex()
    );

    let events = index.events();
    assert_eq!(events.len(), 2);
    assert!(!events[0].is_indexed());
    assert!(events[0].url_token().contains("/draft.txt?"));
    assert!(events[1].is_indexed());
    assert!(events[1].url_token().contains("/final.txt?"));
}

#[test]
fn test_rename_errors() {
    let share = ShareBuilder::new()
        .add_file("a.txt", b"a".to_vec())
        .add_file("b.txt", b"b".to_vec())
        .add_directory("dir")
        .build();

    assert_eq!(
        share.ops.rename(None, "a.txt", "b.txt", false).unwrap_err().kind(),
        ShareErrorKind::AlreadyExists
    );
    assert_eq!(
        share.ops.rename(None, "missing", "c.txt", false).unwrap_err().kind(),
        ShareErrorKind::NotFound
    );
    assert_eq!(
        share.ops.rename(None, "dir", "dir2", false).unwrap_err().kind(),
        ShareErrorKind::NotAFile
    );
    assert_eq!(
        share.ops.rename(None, "a.txt", "x/y", false).unwrap_err().kind(),
        ShareErrorKind::IllegalName
    );
    assert_eq!(fs::read(share.path("b.txt")).unwrap(), b"b");
}

#[test]
fn test_move_between_directories() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("inbox/a.txt", b"payload".to_vec(), "moved note")
        .add_directory("archive/2024")
        .with_index(index.clone())
        .build();

    share.ops.move_file(Some("inbox"), Some("archive/2024"), "a.txt", false).unwrap();

    assert!(!share.path("inbox/a.txt").exists());
    assert!(!share.sidecar_of("inbox/a.txt").exists());
    assert_eq!(share.ops.get_comment(Some("archive/2024"), "a.txt").unwrap(), "moved note");

    // Unindexing is unconditional; reindexing follows the flag.
    let events = index.events();
    assert_eq!(events.len(), 1);
    assert!(!events[0].is_indexed());
}

#[test]
fn test_move_onto_existing_file() {
    let share = ShareBuilder::new()
        .add_file("a/x.txt", b"from a".to_vec())
        .add_file("b/x.txt", b"from b".to_vec())
        .build();

    let err = share.ops.move_file(Some("a"), Some("b"), "x.txt", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::AlreadyExists);
    assert_eq!(fs::read(share.path("a/x.txt")).unwrap(), b"from a");
    assert_eq!(fs::read(share.path("b/x.txt")).unwrap(), b"from b");

    let err = share.ops.move_file(Some("a"), Some("missing"), "x.txt", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::NotFound);
}

#[test]
fn test_sidecars_cannot_be_moved_or_renamed() {
    let share = ShareBuilder::new()
        .add_described_file("src/a.txt", b"AAA".to_vec(), "from src")
        .add_described_file("dst/a.txt", b"BBB".to_vec(), "from dst")
        .build();

    let err = share.ops.rename(Some("dst"), "a.txt.md5", "junk", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::IllegalName);
    let err = share.ops.move_file(Some("src"), Some("dst"), "a.txt.md5", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::IllegalName);
    let err = share.ops.rename(Some("src"), "a.txt", "b.txt.md5", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::IllegalName);

    // Both records still describe their own file.
    assert_eq!(
        share.ops.get_checksum(Some("dst"), "a.txt").unwrap(),
        digest_bytes(b"BBB").to_hex()
    );
    assert_eq!(share.ops.get_comment(Some("dst"), "a.txt").unwrap(), "from dst");
    assert_eq!(
        share.ops.get_checksum(Some("src"), "a.txt").unwrap(),
        digest_bytes(b"AAA").to_hex()
    );
    assert!(!share.path("dst/junk").exists());
}

#[test]
fn test_sidecars_are_not_addressable_as_files() {
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"abc".to_vec(), "note")
        .build();
    let sidecar = "a.txt.md5";
    let ops = &share.ops;

    assert_eq!(ops.set_comment(None, sidecar, "x", false).unwrap_err().kind(), ShareErrorKind::IllegalName);
    assert_eq!(ops.get_comment(None, sidecar).unwrap_err().kind(), ShareErrorKind::IllegalName);
    assert_eq!(ops.get_checksum(None, sidecar).unwrap_err().kind(), ShareErrorKind::IllegalName);
    assert_eq!(ops.download(None, sidecar).unwrap_err().kind(), ShareErrorKind::IllegalName);
    assert_eq!(ops.delete(None, sidecar).unwrap_err().kind(), ShareErrorKind::IllegalName);
    assert_eq!(
        ops.create_directory(None, "folder.md5").unwrap_err().kind(),
        ShareErrorKind::IllegalName
    );

    assert!(!share.path("a.txt.md5.md5").exists());
    assert!(!share.path("folder.md5").exists());
    assert_eq!(ops.get_comment(None, "a.txt").unwrap(), "note");
}

// ==================== Comments ====================

#[test]
fn test_set_comment_round_trip() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"abc".to_vec(), "old")
        .with_index(index.clone())
        .build();

    share.ops.set_comment(None, "a.txt", "line one\nline two", true).unwrap();

    assert_eq!(share.ops.get_comment(None, "a.txt").unwrap(), "line one\nline two");
    assert_eq!(share.ops.get_checksum(None, "a.txt").unwrap(), "900150983cd24fb0d6963f7d28e17f72");

    let events = index.events();
    assert!(matches!(&events[0], IndexEvent::Unindexed { comment, .. } if comment == "old"));
    assert!(matches!(&events[1], IndexEvent::Indexed { comment, .. } if comment == "line one\nline two"));
}

#[test]
fn test_set_comment_on_directory() {
    let share = ShareBuilder::new().add_directory("docs").build();
    let err = share.ops.set_comment(None, "docs", "nope", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::NotAFile);
    assert!(!share.sidecar_of("docs").exists());
}

// ==================== Delete ====================

#[test]
fn test_delete_file_removes_sidecar() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"a".to_vec(), "c")
        .with_index(index.clone())
        .build();

    let stats = share.ops.delete(None, "a.txt").unwrap();
    assert_eq!(
        stats,
        DeleteStats {
            files_deleted: 1,
            directories_deleted: 0
        }
    );
    assert!(!share.path("a.txt").exists());
    assert!(!share.sidecar_of("a.txt").exists());

    let events = index.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].url_token().ends_with(&digest_bytes(b"a").to_hex()));
}

#[test]
fn test_delete_is_idempotent() {
    let share = ShareBuilder::new().add_file("a.txt", b"a".to_vec()).build();
    share.ops.delete(None, "a.txt").unwrap();
    assert_eq!(share.ops.delete(None, "a.txt").unwrap(), DeleteStats::default());
}

#[test]
fn test_recursive_delete_children_first() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("proj/a.txt", b"a".to_vec(), "top")
        .add_described_file("proj/src/b.rs", b"b".to_vec(), "nested")
        .add_file("proj/src/deep/c.md", b"c".to_vec())
        .add_directory("proj/empty")
        .add_file("keep.txt", b"keep".to_vec())
        .with_index(index.clone())
        .build();

    let stats = share.ops.delete(None, "proj").unwrap();
    assert_eq!(
        stats,
        DeleteStats {
            files_deleted: 3,
            directories_deleted: 4
        }
    );
    assert!(!share.path("proj").exists());
    assert!(share.path("keep.txt").exists());

    // Every file is unindexed with the metadata it had before deletion.
    let events = index.events();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| !e.is_indexed()));
    assert!(events.iter().any(|e| matches!(e, IndexEvent::Unindexed { comment, .. } if comment == "nested")));
}

#[test]
fn test_recursive_delete_unindexes_before_removing() {
    let witness = DeletionWitness::new();
    let share = ShareBuilder::new()
        .add_described_file("proj/a.txt", b"a".to_vec(), "top")
        .add_described_file("proj/src/b.rs", b"b".to_vec(), "nested")
        .add_described_file("proj/src/deep/c.md", b"c".to_vec(), "deepest")
        .add_directory("proj/src/deep/empty")
        .with_index(witness.clone())
        .build();
    for file in ["proj/a.txt", "proj/src/b.rs", "proj/src/deep/c.md"] {
        witness.track(share.path(file));
    }

    let stats = share.ops.delete(None, "proj").unwrap();
    assert_eq!(
        stats,
        DeleteStats {
            files_deleted: 3,
            directories_deleted: 4
        }
    );

    // Name order within a directory, contents before the directory itself.
    assert_eq!(witness.removed(), vec!["a.txt", "b.rs", "c.md"]);
    assert!(!share.path("proj").exists());
}

#[test]
fn test_recursive_delete_drops_orphaned_sidecars_silently() {
    let index = RecordingIndex::new();
    let share = ShareBuilder::new()
        .add_described_file("junk/real.txt", b"real".to_vec(), "")
        .add_file("junk/stray.bin.md5", b"0123\norphan".to_vec())
        .with_index(index.clone())
        .build();

    let stats = share.ops.delete(None, "junk").unwrap();
    assert_eq!(stats.files_deleted, 1);
    assert_eq!(stats.directories_deleted, 1);
    assert!(!share.path("junk").exists());
    assert_eq!(index.events().len(), 1);
    assert!(index.events()[0].url_token().starts_with("share://test-peer/real.txt?md5="));
}

#[test]
fn test_delete_empty_name_is_illegal() {
    let share = ShareBuilder::new().build();
    assert_eq!(share.ops.delete(None, "").unwrap_err().kind(), ShareErrorKind::IllegalName);
}

#[cfg(unix)]
#[test]
fn test_delete_without_write_access() {
    use std::os::unix::fs::PermissionsExt;

    if common::running_as_root() {
        return;
    }

    let share = ShareBuilder::new().add_file("locked/a.txt", b"a".to_vec()).build();
    let locked = share.path("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

    let err = share.ops.delete(None, "locked").unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::AccessDenied);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_recursive_delete_stops_at_read_only_file() {
    use std::os::unix::fs::PermissionsExt;

    if common::running_as_root() {
        return;
    }

    let share = ShareBuilder::new()
        .add_described_file("proj/inner/frozen.txt", b"f".to_vec(), "")
        .build();
    let frozen = share.path("proj/inner/frozen.txt");
    fs::set_permissions(&frozen, fs::Permissions::from_mode(0o444)).unwrap();

    let err = share.ops.delete(None, "proj").unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::AccessDenied);
    assert!(frozen.is_file());
    assert!(share.sidecar_of("proj/inner/frozen.txt").is_file());

    fs::set_permissions(&frozen, fs::Permissions::from_mode(0o644)).unwrap();
    share.ops.delete(None, "proj").unwrap();
    assert!(!share.path("proj").exists());
}

// ==================== Index failures ====================

#[test]
fn test_index_failure_is_fatal_by_default() {
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"a".to_vec(), "c")
        .with_index(std::sync::Arc::new(FailingIndex))
        .build();

    let err = share.ops.set_comment(None, "a.txt", "new", false).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::IndexingFailed);
    // Unindexing happens first, so nothing else changed.
    assert_eq!(share.ops.get_comment(None, "a.txt").unwrap(), "c");

    let err = share.ops.upload(None, Some("b.txt"), &b"b"[..], true, None).unwrap_err();
    assert_eq!(err.kind(), ShareErrorKind::IndexingFailed);
}

#[test]
fn test_index_failure_downgraded_to_warning() {
    let share = ShareBuilder::new()
        .add_described_file("a.txt", b"a".to_vec(), "c")
        .with_index(std::sync::Arc::new(FailingIndex))
        .with_index_failures(IndexFailurePolicy::Warn)
        .build();

    share.ops.rename(None, "a.txt", "b.txt", true).unwrap();
    assert_eq!(share.ops.get_comment(None, "b.txt").unwrap(), "c");
    share.ops.delete(None, "b.txt").unwrap();
    assert!(!share.path("b.txt").exists());
}
