/// Tests for source materialization and descriptor discovery.
use std::fs;

use tempfile::tempdir;

use stackbuild::source::{collect, discover, Scratch};

#[test]
fn test_local_source_copy_skips_hidden_entries() {
    let origin = tempdir().unwrap();
    fs::create_dir_all(origin.path().join("Dockerfiles/base")).unwrap();
    fs::write(
        origin.path().join("Dockerfiles/base/Dockerfile"),
        "FROM alpine:3.19\n",
    )
    .unwrap();
    fs::create_dir_all(origin.path().join(".git")).unwrap();
    fs::write(origin.path().join(".git/config"), "[core]\n").unwrap();
    fs::write(origin.path().join(".hidden"), "x\n").unwrap();

    let mut scratch = Scratch::new().unwrap();
    let specs = vec![origin.path().display().to_string()];
    let trees = collect(&specs, &mut scratch).unwrap();

    assert_eq!(trees.len(), 1);
    assert!(trees[0].root.join("Dockerfiles/base/Dockerfile").is_file());
    assert!(!trees[0].root.join(".git").exists());
    assert!(!trees[0].root.join(".hidden").exists());
}

#[test]
fn test_source_without_marker_directory_is_dropped() {
    let origin = tempdir().unwrap();
    fs::write(origin.path().join("README"), "nothing to build\n").unwrap();

    let mut scratch = Scratch::new().unwrap();
    let specs = vec![origin.path().display().to_string()];
    let trees = collect(&specs, &mut scratch).unwrap();

    assert!(trees.is_empty());
    // the materialized copy was removed again
    assert!(!scratch.path().join("0").exists());
}

#[test]
fn test_discovered_names_replace_separators() {
    let origin = tempdir().unwrap();
    for subpath in ["base", "py/builder", "py/numpy-lib"] {
        let dir = origin.path().join("Dockerfiles").join(subpath);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Dockerfile"), "FROM alpine:3.19\n").unwrap();
    }

    let mut scratch = Scratch::new().unwrap();
    let specs = vec![origin.path().display().to_string()];
    let trees = collect(&specs, &mut scratch).unwrap();
    let found = discover(&trees[0]).unwrap();

    let names: Vec<&str> = found.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["base", "py-builder", "py-numpy-lib"]);
}

#[test]
fn test_directories_without_descriptor_are_not_candidates() {
    let origin = tempdir().unwrap();
    fs::create_dir_all(origin.path().join("Dockerfiles/docs")).unwrap();
    fs::write(origin.path().join("Dockerfiles/docs/notes.txt"), "n\n").unwrap();
    let dir = origin.path().join("Dockerfiles/base");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Dockerfile"), "FROM alpine:3.19\n").unwrap();

    let mut scratch = Scratch::new().unwrap();
    let specs = vec![origin.path().display().to_string()];
    let trees = collect(&specs, &mut scratch).unwrap();
    let found = discover(&trees[0]).unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "base");
}

#[test]
fn test_scratch_numbered_directories_increment() {
    let mut scratch = Scratch::new().unwrap();
    let first = scratch.next_dir().unwrap();
    let second = scratch.next_dir().unwrap();
    assert_ne!(first, second);
    assert!(first.ends_with("0"));
    assert!(second.ends_with("1"));
}
