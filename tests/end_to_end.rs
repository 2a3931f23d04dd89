//! Loads whole configurations through the public API.

use std::path::{Path, PathBuf};

use changelog_sync::config::{self, Project};
use changelog_sync::models::ProviderKind;
use changelog_sync::pipeline::Loader;
use changelog_sync::providers::SyncContext;
use changelog_sync::storage::ContentStore;
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn project(dir: &TempDir, toml: &str) -> Project {
    let path = dir.path().join("changelogs.toml");
    std::fs::write(&path, toml).unwrap();
    config::load_all(&path).unwrap()
}

fn loader(project: &Project) -> Loader {
    let ctx = SyncContext::in_memory(Client::new()).with_root(&project.root);
    Loader::new(project.loader.clone(), ctx)
        .with_config_file(config::loader_config_path(&project.settings.cache_dir))
}

async fn stored_ids(loader: &Loader) -> Vec<String> {
    loader
        .context()
        .store()
        .lock()
        .await
        .keys()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn markdown_changelog_yields_versions_in_document_order() {
    let dir = TempDir::new().unwrap();
    let project = project(
        &dir,
        &format!(
            "[[changelogs]]\nprovider = \"changeset\"\nbase = \"/docs/\"\nchangelog = \"{}\"\n",
            fixture("CHANGELOG.md").display()
        ),
    );
    let loader = loader(&project);

    let summary = loader.run().await.unwrap();

    assert_eq!(summary.inserted(), 2);
    assert_eq!(
        stored_ids(&loader).await,
        vec!["docs/version/2-0-0", "docs/version/1-0-0"]
    );

    let store = loader.context().store().lock().await;
    let latest = store.get("docs/version/2-0-0").unwrap();
    assert_eq!(latest.data.title, "2.0.0");
    assert!(!latest.data.body.contains("## 2.0.0"));
    assert!(latest.rendered.html.contains("<h3>Major Changes</h3>"));
}

#[tokio::test]
async fn mixed_providers_resync_incrementally() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .and(header("if-none-match", "\"releases-v1\""))
        .respond_with(ResponseTemplate::new(304))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/releases"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([
                    { "tag_name": "v2.0.0-beta.1", "name": "v2.0.0-beta.1", "draft": false, "prerelease": true },
                    { "tag_name": "v1.5.0", "name": null, "body": "Notes", "draft": false, "prerelease": false },
                    { "tag_name": "v1.6.0", "name": "v1.6.0", "draft": true, "prerelease": false },
                ]))
                .insert_header("etag", "\"releases-v1\""),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let project = project(
        &dir,
        &format!(
            r#"
[settings]
cache_dir = "cache"

[[changelogs]]
provider = "keep-a-changelog"
base = "kac"
changelog = "{changelog}"

[[changelogs]]
provider = "github"
base = "gh"
owner = "o"
repo = "r"
token = "do-not-persist"
api = "{api}/"

[[changelogs]]
provider = "gitea"
base = "tea"
owner = "gitea"
repo = "tea"
api = "http://127.0.0.1:9"
enabled = false
"#,
            changelog = fixture("keep-a-changelog.md").display(),
            api = server.uri(),
        ),
    );
    let loader = loader(&project);

    let first = loader.run().await.unwrap();
    assert_eq!(first.skipped, 1);
    assert_eq!(
        stored_ids(&loader).await,
        vec!["kac/version/1-1-0", "kac/version/1-0-0", "gh/version/v1-5-0"]
    );

    let persisted = config::read_loader_config(&config::loader_config_path(
        &project.settings.cache_dir,
    ))
    .await
    .unwrap();
    let kinds: Vec<_> = persisted.iter().map(|c| c.provider).collect();
    assert_eq!(
        kinds,
        vec![ProviderKind::KeepAChangelog, ProviderKind::Github, ProviderKind::Gitea]
    );
    let raw = std::fs::read_to_string(dir.path().join("cache/changelogs.json")).unwrap();
    assert!(!raw.contains("do-not-persist"));

    let second = loader.run().await.unwrap();
    assert!(!second.has_changes());
    assert!(second.reports[1].not_modified);
    assert_eq!(second.reports[0].unchanged, 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
