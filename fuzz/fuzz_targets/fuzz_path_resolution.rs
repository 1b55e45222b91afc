//! Fuzz target for sandboxed path resolution
//!
//! Feeds arbitrary directory strings and leaf names through the two-stage
//! resolver over a small fixed tree. Any successful resolution must stay
//! below the share root; errors are fine, panics are not.

#![no_main]

use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sharebox_core::PathSandbox;
use tempfile::TempDir;

#[derive(Debug, Arbitrary)]
struct Input {
    dir: Option<String>,
    name: String,
}

struct Fixture {
    _temp: TempDir,
    sandbox: PathSandbox,
    root: PathBuf,
}

fn fixture() -> &'static Fixture {
    static FIXTURE: OnceLock<Fixture> = OnceLock::new();
    FIXTURE.get_or_init(|| {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("share");
        fs::create_dir_all(root.join("docs/nested")).unwrap();
        fs::write(root.join("docs/a.txt"), b"a").unwrap();
        fs::write(temp.path().join("outside.txt"), b"secret").unwrap();

        let sandbox = PathSandbox::new(&root, 4096).unwrap();
        let root = sandbox.root().to_path_buf();
        Fixture {
            _temp: temp,
            sandbox,
            root,
        }
    })
}

fuzz_target!(|input: Input| {
    let fixture = fixture();

    let Ok(dir) = fixture.sandbox.resolve_directory(input.dir.as_deref()) else {
        return;
    };
    assert!(dir.path().starts_with(&fixture.root), "directory escaped: {:?}", dir.path());

    if let Ok(leaf) = fixture.sandbox.resolve_file(&dir, &input.name) {
        assert!(leaf.canonical().starts_with(dir.path()), "leaf escaped: {:?}", leaf.canonical());
        assert_ne!(leaf.canonical(), fixture.root.as_path(), "leaf resolved to the root");
    }
});
