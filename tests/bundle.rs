use bundler::{
    BundleConfig, BundlerError, IgnoreRules, NoIgnore, ProcessedFile, bundle_directory,
    bundle_file, bundle_stream,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, name: &str, contents: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn create_site() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(
        root,
        "index.html",
        "<html>\n<!--#include(partials/head.html)-->\n<body></body>\n</html>\n",
    );
    write(
        root,
        "partials/head.html",
        "<head><!--#include(../css/site.css)--></head>",
    );
    write(root, "css/site.css", "body{}");
    write(root, "vendor/lib.js", "<!--#include(gone.js)-->");
    temp_dir
}

fn config() -> BundleConfig {
    BundleConfig::with_delimiters("<!--#include(", ")-->")
}

#[test]
fn test_bundle_site_file() {
    let site = create_site();
    let processed = bundle_file(&site.path().join("index.html"), Some("index.min.html"), &config()).unwrap();
    assert_eq!(
        fs::read_to_string(processed.new_path).unwrap(),
        "<html>\n<head>body{}</head>\n<body></body>\n</html>\n"
    );
}

#[test]
fn test_bundle_site_directory() {
    let site = create_site();
    let rules = IgnoreRules::new(site.path()).with_globs(["vendor"]).unwrap();

    let files = bundle_directory(site.path(), Some("dist"), &config(), &rules).unwrap();
    let outputs: Vec<_> = files
        .iter()
        .map(|f| f.new_path.strip_prefix(site.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        outputs,
        vec![
            Path::new("css/site-dist.css"),
            Path::new("index-dist.html"),
            Path::new("partials/head-dist.html"),
        ]
    );

    let json = serde_json::to_string(&files).unwrap();
    let parsed: Vec<ProcessedFile> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, files);
}

#[test]
fn test_bundle_site_directory_without_ignore_fails() {
    let site = create_site();
    let err = bundle_directory(site.path(), Some("dist"), &config(), &NoIgnore).unwrap_err();
    assert!(matches!(err, BundlerError::MissingIncludedFile { .. }));
    assert!(!site.path().join("index-dist.html").exists());
}

#[test]
fn test_bundle_site_stream_keeping_delimiters() {
    let site = create_site();
    let mut config = config();
    config.keep_delims = true;

    let mut out = Vec::new();
    bundle_stream(
        &b"<!--#include(css/site.css)-->"[..],
        &mut out,
        site.path(),
        &config,
    )
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "<!--#include(body{})-->");
}
