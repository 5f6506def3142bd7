//! Cache eviction and re-resolution.

use anyhow::Result;
use std::collections::BTreeSet;
use template_compose::templating::{CacheMode, OutputKind};
use template_compose::test_utils::memory_runtime;

fn chain_templates() -> [(&'static str, &'static str); 3] {
    [
        ("A", r#"A{{ template "@B" . }}"#),
        ("B", r#"{{ define "@B" }}B{{ template "@C" . }}{{ end }}"#),
        ("C", r#"{{ define "@C" }}C1{{ end }}"#),
    ]
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[test]
fn test_removing_leaf_evicts_every_dependent() -> Result<()> {
    let (_, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    runtime.render_to_string(OutputKind::Text, "A", &())?;
    assert_eq!(runtime.cache(OutputKind::Text).names(), names(&["A", "B", "C"]));

    assert!(runtime.remove_cache(OutputKind::Text, "C"));
    assert!(runtime.cache(OutputKind::Text).is_empty());
    Ok(())
}

#[test]
fn test_removing_middle_keeps_its_dependencies() -> Result<()> {
    let (_, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    runtime.render_to_string(OutputKind::Text, "A", &())?;

    assert!(runtime.remove_cache_text("B"));
    let cache = runtime.cache(OutputKind::Text);
    assert_eq!(cache.names(), names(&["C"]));
    assert!(cache.parents("C").is_empty(), "stale parent edge left on C");
    Ok(())
}

#[test]
fn test_removal_is_idempotent_and_reports_absence() -> Result<()> {
    let (_, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    assert!(!runtime.remove_cache(OutputKind::Text, "A"));

    runtime.render_to_string(OutputKind::Text, "A", &())?;
    assert!(runtime.remove_cache(OutputKind::Text, "A"));
    assert!(!runtime.remove_cache(OutputKind::Text, "A"));
    assert_eq!(runtime.cache(OutputKind::Text).names(), names(&["B", "C"]));
    Ok(())
}

#[test]
fn test_render_is_stable_across_eviction() -> Result<()> {
    let (_, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    let first = runtime.render_to_string(OutputKind::Html, "A", &())?;
    runtime.remove_cache_html("C");
    let second = runtime.render_to_string(OutputKind::Html, "A", &())?;
    assert_eq!(first, "ABC1");
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_changed_source_is_seen_only_after_eviction() -> Result<()> {
    let (reader, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "ABC1");

    reader.insert("C", r#"{{ define "@C" }}C2{{ end }}"#);
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "ABC1");

    runtime.remove_cache(OutputKind::Text, "C");
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "ABC2");
    Ok(())
}

#[test]
fn test_evicting_layout_evicts_pages_using_it() -> Result<()> {
    let (reader, runtime) = memory_runtime(
        &[
            ("page", r#"{{ layout "@base" }}{{ define "content" }}p{{ end }}"#),
            ("other", r#"{{ layout "@base" }}{{ define "content" }}o{{ end }}"#),
            ("base", r#"<{{ template "content" . }}>"#),
        ],
        CacheMode::Enabled,
    );
    runtime.render_to_string(OutputKind::Text, "page", &())?;
    runtime.render_to_string(OutputKind::Text, "other", &())?;
    assert_eq!(
        runtime.cache(OutputKind::Text).parents("base"),
        BTreeSet::from(["other".to_string(), "page".to_string()])
    );

    reader.insert("base", r#"[{{ template "content" . }}]"#);
    assert!(runtime.remove_cache(OutputKind::Text, "base"));
    assert!(runtime.cache(OutputKind::Text).is_empty());
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &())?, "[p]");
    Ok(())
}

#[test]
fn test_text_and_html_caches_are_separate() -> Result<()> {
    let (_, runtime) = memory_runtime(&chain_templates(), CacheMode::Enabled);
    runtime.render_to_string(OutputKind::Text, "A", &())?;
    runtime.render_to_string(OutputKind::Html, "A", &())?;

    assert!(runtime.remove_cache_html("C"));
    assert!(runtime.cache(OutputKind::Html).is_empty());
    assert_eq!(runtime.cache(OutputKind::Text).len(), 3);
    Ok(())
}

#[test]
fn test_disabled_cache_always_rereads() -> Result<()> {
    let (reader, runtime) = memory_runtime(&chain_templates(), CacheMode::Disabled);
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "ABC1");

    reader.insert("C", r#"{{ define "@C" }}C2{{ end }}"#);
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "ABC2");
    assert!(runtime.cache(OutputKind::Text).is_empty());
    assert!(!runtime.remove_cache(OutputKind::Text, "C"));
    Ok(())
}
