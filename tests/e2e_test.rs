/// End-to-end dry runs over real source trees: materialize, resolve, order.
use std::fs;
use std::path::Path;

use tempfile::tempdir;

use stackbuild::config::Config;
use stackbuild::pipeline::{run_build, BuildOptions};

fn write_descriptor(root: &Path, subpath: &str, content: &str) {
    let dir = root.join("Dockerfiles").join(subpath);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Dockerfile"), content).unwrap();
}

fn empty_config() -> Config {
    Config {
        registry: String::new(),
        namespace: String::new(),
        tag: String::new(),
    }
}

#[tokio::test]
async fn test_dry_run_over_local_source() {
    let origin = tempdir().unwrap();
    write_descriptor(origin.path(), "base", "FROM alpine:3.19\n");
    write_descriptor(origin.path(), "app", "FROM base\nCOPY . /app\n");

    let options = BuildOptions {
        sources: vec![origin.path().display().to_string()],
        final_name: "-".to_string(),
        dry_run: true,
        ..BuildOptions::default()
    };

    run_build(&options, &empty_config()).await.unwrap();
}

#[tokio::test]
async fn test_dry_run_with_core_images_and_final_bundle() {
    let origin = tempdir().unwrap();
    write_descriptor(origin.path(), "base/builder", "FROM alpine:3.19\n");
    write_descriptor(origin.path(), "py/builder", "FROM alpine:3.19\n");

    let options = BuildOptions {
        sources: vec![origin.path().display().to_string()],
        final_name: "everything".to_string(),
        core_images: true,
        dry_run: true,
        ..BuildOptions::default()
    };

    run_build(&options, &empty_config()).await.unwrap();
}

#[tokio::test]
async fn test_dry_run_cycle_is_fatal() {
    let origin = tempdir().unwrap();
    write_descriptor(origin.path(), "a", "FROM b\n");
    write_descriptor(origin.path(), "b", "FROM a\n");

    let options = BuildOptions {
        sources: vec![origin.path().display().to_string()],
        final_name: "-".to_string(),
        dry_run: true,
        ..BuildOptions::default()
    };

    let err = run_build(&options, &empty_config()).await.unwrap_err();
    assert!(err.to_string().contains("dependency loop"));
}
