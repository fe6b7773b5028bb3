//! Resource loader integration tests
//!
//! Serves module resources from a temporary directory.

use serde_json::json;
use spacey_amd::{
    Config, Export, FetchCause, FileTransport, Globals, Injector, InjectorError, ResourceLoader,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config.json", r#"{"debug": true}"#);
    write(dir.path(), "tpl/row.html", "<tr></tr>");
    write(
        dir.path(),
        "app.js",
        r#"{"deps": ["config.json", "tpl/row.html"], "value": "app", "statics": {"version": "2"}}"#,
    );
    write(dir.path(), "vendor/jquery.js", "");
    write(dir.path(), "style.css", "body {}");
    dir
}

fn file_injector(dir: &TempDir) -> Injector {
    Injector::new(ResourceLoader::new(FileTransport::new(dir.path())))
}

#[tokio::test]
async fn test_script_with_data_and_text_dependencies() {
    let dir = fixture();
    let injector = file_injector(&dir);

    let resolution = injector.require(["app"]).await.unwrap();
    assert_eq!(resolution.locators, vec!["config.json", "tpl/row.html", "app"]);

    let app = &resolution.exports[0];
    assert_eq!(
        app.as_callable().unwrap().static_value("version"),
        Some(&json!("2"))
    );
    assert_eq!(
        app.resolve().unwrap(),
        Export::Data(json!({ "value": "app", "deps": [{ "debug": true }, "<tr></tr>"] }))
    );
}

#[tokio::test]
async fn test_data_and_text_resources() {
    let dir = fixture();
    let injector = file_injector(&dir);

    let resolution = injector.require(["config.json", "tpl/row.html"]).await.unwrap();
    assert_eq!(
        resolution.exports,
        vec![
            Export::Data(json!({ "debug": true })),
            Export::Text("<tr></tr>".to_string())
        ]
    );
}

#[tokio::test]
async fn test_named_pair_reads_the_global_context() {
    let dir = fixture();
    let globals = Arc::new(Globals::new());
    globals.set("jq", json!("jQuery"));

    let injector = Injector::new(
        ResourceLoader::new(FileTransport::new(dir.path())).with_globals(globals.clone()),
    );

    let resolution = injector.require([("jq", "vendor/jquery")]).await.unwrap();
    assert_eq!(resolution.exports, vec![Export::Data(json!("jQuery"))]);
    assert_eq!(resolution.locators, vec!["vendor/jquery"]);
}

#[tokio::test]
async fn test_named_pair_without_global_fails() {
    let dir = fixture();
    let injector = file_injector(&dir);

    let err = injector.require([("jq", "vendor/jquery")]).await.unwrap_err();
    match err {
        InjectorError::Unresolvable(fetch) => {
            assert_eq!(fetch.name.as_str(), "jq");
            assert_eq!(fetch.cause, FetchCause::MissingGlobal("jq".to_string()));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unsupported_and_missing_resources() {
    let dir = fixture();
    let injector = file_injector(&dir);

    let err = injector.require(["style.css"]).await.unwrap_err();
    assert!(matches!(
        err,
        InjectorError::Unresolvable(ref fetch) if matches!(fetch.cause, FetchCause::Unsupported(_))
    ));

    let err = injector.require(["nowhere"]).await.unwrap_err();
    assert!(matches!(
        err,
        InjectorError::Unresolvable(ref fetch) if matches!(fetch.cause, FetchCause::Io(_))
    ));
    assert!(injector.registry().is_empty());
}

#[tokio::test]
async fn test_injector_from_config() {
    let dir = fixture();
    write(dir.path(), "lib/util.mjs", r#"{"value": 7}"#);

    let mut config = Config::default();
    config.merge_str(&format!("root={}\ndefault-extension=mjs\n", dir.path().display()));

    // `.mjs` is not a known kind, so the extension window keeps it but
    // dispatch rejects it
    let injector = Injector::from_config(&config).unwrap();
    let err = injector.require(["lib/util"]).await.unwrap_err();
    assert!(matches!(
        err,
        InjectorError::Unresolvable(ref fetch) if matches!(fetch.cause, FetchCause::Unsupported(_))
    ));

    config.set("default-extension", "js");
    let injector = Injector::from_config(&config).unwrap();
    let resolution = injector.require(["config.json"]).await.unwrap();
    assert_eq!(resolution.exports, vec![Export::Data(json!({ "debug": true }))]);
}
