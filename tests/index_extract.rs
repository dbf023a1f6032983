mod common;

use codenav::config::Config;
use codenav::error::ErrorKind;
use codenav::indexer::{SourceIndexer, scan::ScanOptions};
use codenav::model::SymbolKind;
use common::write;

#[test]
fn indexes_add_and_calculator() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "calc.py",
        "def add(a, b): return a + b\nclass Calculator: pass\n",
    );

    let index = SourceIndexer::new(&Config::default())
        .index(dir.path())
        .unwrap();
    assert_eq!(index.files_indexed, 1);
    assert_eq!(index.total_symbol_count, 2);
    let records: Vec<_> = index
        .symbols
        .iter()
        .map(|s| (s.name.as_str(), s.kind, s.file_path.as_str(), s.line))
        .collect();
    assert_eq!(
        records,
        vec![
            ("add", SymbolKind::Function, "calc.py", 1),
            ("Calculator", SymbolKind::Class, "calc.py", 2),
        ]
    );
}

#[test]
fn repeated_index_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "b.py", "def beta():\n    pass\n");
    write(root, "a.py", "class Alpha:\n    def run(self):\n        pass\n");
    write(root, "pkg/__init__.py", "");
    write(root, "pkg/tools.py", "async def fetch():\n    pass\n");

    let indexer = SourceIndexer::new(&Config::default());
    let first = indexer.index(root).unwrap();
    let second = indexer.index(root).unwrap();
    assert_eq!(first.symbols, second.symbols);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let order: Vec<_> = first
        .symbols
        .iter()
        .map(|s| format!("{}:{}", s.file_path, s.name))
        .collect();
    assert_eq!(
        order,
        vec!["a.py:Alpha", "a.py:run", "b.py:beta", "pkg/tools.py:fetch"]
    );
    // Empty modules parse and count even without symbols.
    assert_eq!(first.files_indexed, 4);
}

#[test]
fn invalid_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "good_one.py", "def one():\n    return 1\n");
    write(root, "broken.py", "def broken(:\n    return\n");
    write(root, "good_two.py", "class Two:\n    pass\n");

    let index = SourceIndexer::new(&Config::default()).index(root).unwrap();
    assert_eq!(index.files_indexed, 2);
    let names: Vec<_> = index.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["one", "Two"]);
    assert!(index.symbols.iter().all(|s| s.file_path != "broken.py"));
}

#[test]
fn virtualenvs_and_other_languages_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "app.py", "def main():\n    pass\n");
    write(root, "venv/lib/site.py", "def vendored():\n    pass\n");
    write(root, ".venv/lib/site.py", "def vendored():\n    pass\n");
    write(root, "web/index.js", "function main() {}\n");

    let index = SourceIndexer::new(&Config::default()).index(root).unwrap();
    assert_eq!(index.files_indexed, 1);
    assert_eq!(index.symbols.len(), 1);
    assert_eq!(index.symbols[0].name, "main");
}

#[test]
fn gitignored_sources_are_indexed_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, ".gitignore", "build/\n");
    write(root, "app.py", "def main():\n    pass\n");
    write(root, "build/gen.py", "def generated():\n    pass\n");

    let index = SourceIndexer::new(&Config::default()).index(root).unwrap();
    assert_eq!(index.files_indexed, 2);
    let names: Vec<_> = index.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["main", "generated"]);

    let index = SourceIndexer::new(&Config::default())
        .with_scan_options(ScanOptions::new(false))
        .index(root)
        .unwrap();
    assert_eq!(index.files_indexed, 1);
    assert_eq!(index.symbols[0].name, "main");
}

#[test]
fn empty_directory_yields_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let index = SourceIndexer::new(&Config::default())
        .index(dir.path())
        .unwrap();
    assert_eq!(index.files_indexed, 0);
    assert_eq!(index.total_symbol_count, 0);
    assert!(index.symbols.is_empty());
}

#[test]
fn missing_directory_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = SourceIndexer::new(&Config::default())
        .index(&dir.path().join("absent"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn preview_caps_symbols_but_keeps_counts() {
    let dir = tempfile::tempdir().unwrap();
    let source: String = (0..150).map(|i| format!("def f{i}():\n    pass\n")).collect();
    write(dir.path(), "many.py", &source);

    let index = SourceIndexer::new(&Config::default())
        .index(dir.path())
        .unwrap();
    assert_eq!(index.total_symbol_count, 150);
    let preview = index.preview(100);
    assert_eq!(preview.symbols.len(), 100);
    assert_eq!(preview.total_symbol_count, 150);
    assert_eq!(preview.files_indexed, 1);
    assert_eq!(preview.symbols[99].name, "f99");
}
