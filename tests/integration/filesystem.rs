//! Templates read from a directory tree.

use anyhow::Result;
use serde_json::json;
use std::collections::BTreeSet;
use std::io;
use template_compose::config::RuntimeConfig;
use template_compose::templating::{CacheMode, OutputKind, Runtime};
use template_compose::test_utils::TemplateDir;

fn site() -> io::Result<TemplateDir> {
    TemplateDir::with_templates(&[
        ("layouts/base.html", r#"<main>{{ template "content" . }}</main>"#),
        ("partials/greeting.html", r#"{{ define "@partials/greeting.html" }}Hello, {{ name }}{{ end }}"#),
        (
            "index.html",
            r#"{{ layout "@layouts/base.html" }}{{ define "content" }}{{ template "@partials/greeting.html" . }}{{ end }}"#,
        ),
        ("docs/index.html", r#"{{ layout "@./layouts//base.html" }}{{ define "content" }}docs{{ end }}"#),
    ])
}

#[test]
fn test_renders_from_disk() -> Result<()> {
    let dir = site()?;
    let runtime = dir.runtime(CacheMode::Enabled);
    let out = runtime.render_to_string(OutputKind::Html, "index.html", &json!({"name": "Ada"}))?;
    assert_eq!(out, "<main>Hello, Ada</main>");
    Ok(())
}

#[test]
fn test_directory_names_read_their_index() -> Result<()> {
    let dir = site()?;
    let runtime = dir.runtime(CacheMode::Disabled);
    assert_eq!(
        runtime.render_to_string(OutputKind::Text, "/", &json!({"name": "root"}))?,
        "<main>Hello, root</main>"
    );
    Ok(())
}

#[test]
fn test_references_are_normalized_against_the_root() -> Result<()> {
    let dir = site()?;
    let runtime = dir.runtime(CacheMode::Enabled);
    assert_eq!(runtime.render_to_string(OutputKind::Text, "docs/index.html", &())?, "<main>docs</main>");
    assert_eq!(runtime.cache(OutputKind::Text).names(), vec!["docs/index.html", "layouts/base.html"]);
    Ok(())
}

#[test]
fn test_parent_references_cannot_leave_the_root() -> Result<()> {
    let dir = site()?;
    dir.write("docs/escape.html", r#"{{ layout "@../layouts/base.html" }}"#)?;
    let runtime = dir.runtime(CacheMode::Disabled);
    let err = runtime.render_to_string(OutputKind::Text, "docs/escape.html", &()).unwrap_err();
    assert_eq!(err.io_error().map(io::Error::kind), Some(io::ErrorKind::PermissionDenied));
    assert!(err.to_string().contains("`@../layouts/base.html` of `docs/escape.html`"), "{err}");
    Ok(())
}

#[test]
fn test_names_escaping_the_root_are_refused() -> Result<()> {
    let dir = site()?;
    let runtime = Runtime::builder().root(dir.path().join("docs")).build();
    let err = runtime.render_to_string(OutputKind::Text, "../index.html", &()).unwrap_err();
    assert_eq!(err.io_error().map(io::Error::kind), Some(io::ErrorKind::PermissionDenied));
    Ok(())
}

#[test]
fn test_missing_file_surfaces_not_found() -> Result<()> {
    let dir = site()?;
    let runtime = dir.runtime(CacheMode::Enabled);
    let err = runtime.render_to_string(OutputKind::Text, "nope.html", &()).unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[test]
fn test_runtime_from_config_file() -> Result<()> {
    let dir = site()?;
    let config_path = dir.write("tcompose.toml", "root = \".\"\ncache = \"enabled\"\n")?;
    let config = RuntimeConfig::load(&config_path)?;

    let runtime = Runtime::from_config(&config);
    runtime.render_to_string(OutputKind::Text, "index.html", &json!({"name": "cfg"}))?;
    assert!(runtime.cache(OutputKind::Text).contains("index.html"));
    Ok(())
}

#[test]
fn test_rooted_and_relative_names_share_one_cache_slot() -> Result<()> {
    let dir = site()?;
    dir.write("page.html", "v1")?;
    let runtime = dir.runtime(CacheMode::Enabled);

    assert_eq!(runtime.render_to_string(OutputKind::Text, "page.html", &())?, "v1");
    assert_eq!(runtime.render_to_string(OutputKind::Text, "/page.html", &())?, "v1");
    assert_eq!(runtime.cache(OutputKind::Text).names(), vec!["page.html"]);

    dir.write("page.html", "v2")?;
    assert!(runtime.remove_cache(OutputKind::Text, "page.html"));
    assert_eq!(runtime.render_to_string(OutputKind::Text, "/page.html", &())?, "v2");
    Ok(())
}

#[test]
fn test_rooted_references_share_one_cache_slot() -> Result<()> {
    let dir = site()?;
    dir.write("a.html", r#"{{ layout "@/layouts/base.html" }}{{ define "content" }}a{{ end }}"#)?;
    let runtime = dir.runtime(CacheMode::Enabled);
    let data = json!({"name": "Ada"});

    assert_eq!(runtime.render_to_string(OutputKind::Text, "a.html", &data)?, "<main>a</main>");
    assert_eq!(runtime.render_to_string(OutputKind::Text, "index.html", &data)?, "<main>Hello, Ada</main>");
    let cache = runtime.cache(OutputKind::Text);
    assert_eq!(
        cache.parents("layouts/base.html"),
        BTreeSet::from(["a.html".to_string(), "index.html".to_string()])
    );
    assert!(!cache.names().iter().any(|name| name.starts_with('/')), "{:?}", cache.names());

    dir.write("layouts/base.html", r#"[{{ template "content" . }}]"#)?;
    assert!(runtime.remove_cache(OutputKind::Text, "/layouts/base.html"));
    assert_eq!(runtime.render_to_string(OutputKind::Text, "a.html", &data)?, "[a]");
    assert_eq!(runtime.render_to_string(OutputKind::Text, "index.html", &data)?, "[Hello, Ada]");
    Ok(())
}
