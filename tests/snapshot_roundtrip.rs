//! End-to-end snapshot tests: build an index from a directory of books,
//! export it through the repository and verify the reloaded index answers
//! queries identically.

use ahash::AHashMap;
use assert2::check;
use sift::search::{IdfWeight, TfIdfRanker, TfWeight};
use sift::{
    Analyzer, AnalyzerKind, IndexId, IndexRepository, NamedIndex, Settings, load_directory,
};
use std::path::Path;

const BOOKS: &[(&str, &str)] = &[
    (
        "mystery.txt",
        "The detective studied the crime scene for hours. A detective of his \
         caliber had seen many a crime, but this one was peculiar.",
    ),
    (
        "romance.txt",
        "Their meeting was not a crime, though her father called it one. \
         Letters crossed the sea for years.",
    ),
    (
        "manual.txt",
        "Attach the bracket to the frame. Tighten every bolt before use. \
         Improper assembly voids the warranty.",
    ),
    (
        "noir.txt",
        "A detective walks into the rain. The city keeps its crimes hidden \
         behind neon and smoke.",
    ),
];

fn write_books(dir: &Path) {
    for (name, text) in BOOKS {
        std::fs::write(dir.join(name), text).unwrap();
    }
}

fn book_analyzer() -> Analyzer {
    let settings = Settings::new(["the"], AHashMap::new(), "").unwrap();
    Analyzer::new(AnalyzerKind::Simple, settings)
}

#[test]
fn reloaded_index_ranks_identically() {
    let books_dir = tempfile::tempdir().unwrap();
    write_books(books_dir.path());

    let index = load_directory(books_dir.path(), book_analyzer()).unwrap();
    check!(index.length() == BOOKS.len());

    let data_dir = tempfile::tempdir().unwrap();
    let repo = IndexRepository::with_data_dir(data_dir.path().to_path_buf());
    repo.create(NamedIndex::new(IndexId::new("books").unwrap(), index))
        .unwrap();
    repo.export_dirty().unwrap();
    check!(data_dir.path().join("books.out").is_file());

    let reloaded = IndexRepository::with_data_dir(data_dir.path().to_path_buf());
    check!(reloaded.import_snapshots().unwrap() == 1);

    let original = repo.get("books").unwrap();
    let restored = reloaded.get("books").unwrap();
    check!(restored.index().length() == original.index().length());

    let ranker = TfIdfRanker::new(TfWeight::Default, IdfWeight::Default);
    let expected = original.index().search("crime detective", None, Some(ranker));
    let actual = restored.index().search("crime detective", None, Some(ranker));

    // Only the top results are compared; the tail all scores zero and its
    // order is unspecified.
    check!(expected.len() == actual.len());
    for (want, got) in expected.iter().zip(&actual).take(3) {
        check!(want.document.id() == got.document.id());
        check!(want.score == got.score);
    }
}

#[test]
fn export_only_writes_snapshot_files_inside_the_data_dir() {
    let data_dir = tempfile::tempdir().unwrap();
    let repo = IndexRepository::with_data_dir(data_dir.path().join("snapshots"));

    repo.create(NamedIndex::new(
        IndexId::new("books").unwrap(),
        sift::Index::new(book_analyzer()),
    ))
    .unwrap();
    repo.export_dirty().unwrap();

    let entries: Vec<String> = std::fs::read_dir(data_dir.path().join("snapshots"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    check!(entries == vec!["books.out".to_string()]);

    // The parent directory holds nothing but the snapshot directory.
    let parents: Vec<String> = std::fs::read_dir(data_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    check!(parents == vec!["snapshots".to_string()]);
}

#[test]
fn traversal_ids_cannot_reach_the_repository() {
    check!(IndexId::new("../evil").is_err());
    check!(IndexId::new("..\\evil").is_err());
    check!(IndexId::new("nested/escape").is_err());
}
