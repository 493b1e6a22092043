//! Shared fixtures: synthetic `.gem` archives served from a mock registry.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use flate2::Compression;
use flate2::write::GzEncoder;
use gdx_gem::{GemFetcher, GemLibrary};
use gdx_registry::RegistryClient;
use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::json;

pub const BETA_GEMSPEC: &str = r#"--- !ruby/object:Gem::Specification
name: beta
version: !ruby/object:Gem::Version
  version: 2.0.0
platform: ruby
authors:
- Jane Doe
dependencies:
- !ruby/object:Gem::Dependency
  name: rack
  requirement: !ruby/object:Gem::Requirement
    requirements:
    - - "~>"
      - !ruby/object:Gem::Version
        version: '3.0'
  type: :runtime
  prerelease: false
description: A widget toolkit.
email: jane@example.com
files:
- CHANGELOG.md
- README.md
- docs/usage.md
- guides/upgrading.md
- lib/beta.rb
- lib/beta/util.rb
- lib/beta/widget.rb
- sig/beta.rbs
homepage: https://example.com/beta
licenses:
- MIT
metadata: {}
require_paths:
- lib
required_ruby_version: !ruby/object:Gem::Requirement
  requirements:
  - - ">="
    - !ruby/object:Gem::Version
      version: 3.1.0
summary: Widgets
"#;

pub const BETA_FILES: &[(&str, &str)] = &[
    ("CHANGELOG.md", "## 2.0.0\n"),
    (
        "README.md",
        "<h1>Beta</h1>\n<p>Build <b>widgets</b>.</p><script>track()</script>\n",
    ),
    ("docs/usage.md", "Call <code>Beta::Widget.create</code>.\n"),
    ("guides/upgrading.md", "Upgrade.\n"),
    ("lib/beta.rb", "module Beta; end\n"),
    ("lib/beta/util.rb", "module Beta::Util; end\n"),
    (
        "lib/beta/widget.rb",
        "class Beta::Widget\n  def build; end\n  def self.create; end\nend\n",
    ),
    ("sig/beta.rbs", "module Beta\nend\n"),
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("gdx_gem=debug"))
        .with_test_writer()
        .try_init();
}

fn tar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, body) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *body).unwrap();
    }
    builder.into_inner().unwrap()
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// A `.gem`: outer tar of `metadata.gz` and `data.tar.gz`.
pub fn gem_archive(gemspec: &str, files: &[(&str, &str)]) -> Vec<u8> {
    let payload: Vec<(&str, &[u8])> = files.iter().map(|(p, b)| (*p, b.as_bytes())).collect();
    let data = gzip(&tar_bytes(&payload));
    let metadata = gzip(gemspec.as_bytes());
    tar_bytes(&[("metadata.gz", &metadata), ("data.tar.gz", &data)])
}

pub fn beta_archive() -> Vec<u8> {
    gem_archive(BETA_GEMSPEC, BETA_FILES)
}

pub fn download_path(name: &str, version: &str) -> String {
    format!("/gems/{name}-{version}.gem")
}

/// Registers `latest.json` and the v2 version endpoint for `name`/`version`.
pub async fn mock_registry(server: &MockServer, name: &str, version: &str) {
    let latest = json!({ "version": version });
    let info = json!({
        "name": name,
        "version": version,
        "summary": "Widgets",
        "description": "A widget toolkit.",
        "version_created_at": "2024-03-09T23:30:00.000Z",
        "downloads": 42,
        "gem_uri": server.url(download_path(name, version)),
    });

    let latest_path = format!("/api/v1/versions/{name}/latest.json");
    server
        .mock_async(|when, then| {
            when.method(GET).path(latest_path);
            then.status(200).json_body(latest);
        })
        .await;

    let info_path = format!("/api/v2/rubygems/{name}/versions/{version}.json");
    server
        .mock_async(|when, then| {
            when.method(GET).path(info_path);
            then.status(200).json_body(info);
        })
        .await;
}

/// Serves `archive` as the download for `name`/`version`.
pub async fn mock_download<'a>(
    server: &'a MockServer,
    name: &str,
    version: &str,
    status: u16,
    archive: Vec<u8>,
) -> Mock<'a> {
    let path = download_path(name, version);
    server
        .mock_async(|when, then| {
            when.method(GET).path(path);
            then.status(status).body(archive);
        })
        .await
}

pub fn library(server: &MockServer, root: &Path) -> GemLibrary<RegistryClient> {
    GemLibrary::new(
        RegistryClient::new(server.base_url(), Duration::from_secs(5), "gemdex-test"),
        root,
    )
    .with_fetcher(GemFetcher::new(Duration::from_secs(5), "gemdex-test"))
    .with_lock_wait(Duration::from_secs(10))
}
