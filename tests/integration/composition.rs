//! Layouts, includes and the errors composition can raise.

use anyhow::Result;
use serde_json::json;
use template_compose::templating::{CacheMode, ComposeError, DirectiveKind, OutputKind};
use template_compose::test_utils::{init_test_logging, memory_runtime};

const BASE: (&str, &str) = ("base", r#"head|{{ template "content" . }}|tail"#);

#[test]
fn test_layout_wraps_content_definitions() -> Result<()> {
    init_test_logging(None);
    let (_, runtime) = memory_runtime(
        &[
            ("with_layout", r#"{{ layout "@base" }}{{ define "content" }}body{{ end }}"#),
            BASE,
        ],
        CacheMode::Enabled,
    );

    let out = runtime.render_to_string(OutputKind::Text, "with_layout", &json!({}))?;
    assert_eq!(out, "head|body|tail");
    assert!(!out.contains("layout"), "layout directive leaked into output: {out}");
    Ok(())
}

#[test]
fn test_layout_with_nested_partial_and_data() -> Result<()> {
    init_test_logging(None);
    let (_, runtime) = memory_runtime(
        &[
            (
                "layouts/base.html",
                r#"<html>{{ template "@partials/nav.html" . }}{{ template "content" . }}</html>"#,
            ),
            ("partials/nav.html", r#"{{ define "@partials/nav.html" }}<nav>{{ title }}</nav>{{ end }}"#),
            (
                "index.html",
                "{{ layout \"@layouts/base.html\" }}\n{{ define \"content\" }}<p>{{ user }}</p>{{ end }}\n",
            ),
        ],
        CacheMode::Enabled,
    );

    let data = json!({"title": "Home", "user": "<ada>"});
    let html = runtime.render_to_string(OutputKind::Html, "index.html", &data)?;
    assert_eq!(html, "<html><nav>Home</nav><p>&lt;ada&gt;</p></html>");

    let text = runtime.render_to_string(OutputKind::Text, "./index.html", &data)?;
    assert_eq!(text, "<html><nav>Home</nav><p><ada></p></html>");
    Ok(())
}

#[test]
fn test_content_can_include_partials_inside_layout_slots() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[
            ("page", r#"{{ layout "@base" }}{{ define "content" }}<{{ template "@widget" . }}>{{ end }}"#),
            ("widget", r#"{{ define "@widget" }}W{{ end }}"#),
            BASE,
        ],
        CacheMode::Enabled,
    );
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &())?, "head|<W>|tail");
    Ok(())
}

#[test]
fn test_layouts_chain() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[
            ("page", r#"{{ layout "@section" }}{{ define "inner" }}x{{ end }}"#),
            ("section", r#"{{ layout "@base" }}{{ define "content" }}[{{ template "inner" . }}]{{ end }}"#),
            BASE,
        ],
        CacheMode::Enabled,
    );
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &())?, "head|[x]|tail");

    let cache = runtime.cache(OutputKind::Text);
    assert!(cache.parents("base").contains("section"));
    assert!(cache.parents("section").contains("page"));
    Ok(())
}

#[test]
fn test_nested_includes_render_transitively() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[
            ("A", r#"a({{ template "@B" . }})"#),
            ("B", r#"{{ define "@B" }}b({{ template "@C" . }}){{ end }}"#),
            ("C", r#"{{ define "@C" }}c{{ end }}"#),
        ],
        CacheMode::Enabled,
    );
    assert_eq!(runtime.render_to_string(OutputKind::Text, "A", &())?, "a(b(c))");
    assert_eq!(runtime.prepare(OutputKind::Text, "A")?, vec!["B"]);
    Ok(())
}

#[test]
fn test_engine_template_actions_are_not_directives() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[("page", r#"{{ template "local" . }}{{ define "local" }}L{{ end }}"#)],
        CacheMode::Enabled,
    );
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &())?, "L");
    assert!(runtime.prepare(OutputKind::Text, "page")?.is_empty());
    Ok(())
}

#[test]
fn test_missing_include_names_reference_and_parent() {
    let (_, runtime) = memory_runtime(&[("A", r#"{{ template "@B" . }}"#)], CacheMode::Enabled);

    let err = runtime.render_to_string(OutputKind::Text, "A", &()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("@B"), "message does not name the reference: {message}");
    assert!(message.contains("`A`"), "message does not name the parent: {message}");
    assert!(err.is_not_found(), "cause is not the reader's NotFound: {err:?}");
    assert!(matches!(
        err,
        ComposeError::Directive {
            kind: DirectiveKind::Include,
            ..
        }
    ));
    assert!(!runtime.cache(OutputKind::Text).contains("A"));
}

#[test]
fn test_failed_sibling_keeps_completed_branches_cached() {
    let (_, runtime) = memory_runtime(
        &[
            ("page", r#"{{ template "@ok" . }}{{ template "@missing" . }}"#),
            ("ok", r#"{{ define "@ok" }}ok{{ end }}"#),
        ],
        CacheMode::Enabled,
    );

    assert!(runtime.render_to_string(OutputKind::Text, "page", &()).is_err());
    let cache = runtime.cache(OutputKind::Text);
    assert!(cache.contains("ok"));
    assert!(!cache.contains("page"));
    assert!(cache.parents("ok").is_empty());
}

#[test]
fn test_self_inclusion_is_a_cycle() {
    let (_, runtime) = memory_runtime(&[("loop", r#"x{{ template "@loop" . }}"#)], CacheMode::Enabled);
    let err = runtime.render_to_string(OutputKind::Text, "loop", &()).unwrap_err();
    assert!(err.is_recursive(), "expected a cycle error, got {err}");
    assert!(runtime.cache(OutputKind::Text).is_empty());
}

#[test]
fn test_transitive_cycle_through_layout_and_include() {
    let (_, runtime) = memory_runtime(
        &[
            ("a", r#"{{ layout "@b" }}"#),
            ("b", r#"{{ template "@c" . }}"#),
            ("c", r#"{{ define "@c" }}{{ template "@a" . }}{{ end }}"#),
        ],
        CacheMode::Enabled,
    );
    let err = runtime.render_to_string(OutputKind::Html, "a", &()).unwrap_err();
    assert!(err.is_recursive());
    assert_eq!(err.chain(), vec!["a", "b", "c", "a"]);
    assert_eq!(
        err.to_string(),
        "could not resolve directive `layout` `@b` of `a`: \
         could not resolve directive `include` `@c` of `b`: \
         could not resolve directive `include` `@a` of `c`: \
         cannot resolve `a` recursively"
    );
}

#[test]
fn test_two_layouts_fail_whether_or_not_they_exist() {
    for templates in [
        vec![("page", r#"{{ layout "@x" }}{{ layout "@y" }}"#)],
        vec![
            ("page", r#"{{ layout "@base" }}{{ layout "@base" }}"#),
            BASE,
        ],
    ] {
        let (_, runtime) = memory_runtime(&templates, CacheMode::Enabled);
        let err = runtime.render_to_string(OutputKind::Text, "page", &()).unwrap_err();
        assert!(
            matches!(err, ComposeError::DuplicateLayout { ref name } if name == "page"),
            "unexpected error: {err:?}"
        );
        assert!(!runtime.cache(OutputKind::Text).contains("page"));
    }
}

#[test]
fn test_include_without_matching_definition_is_a_merge_error() {
    let (_, runtime) = memory_runtime(
        &[
            ("page", r#"{{ template "@nav" . }}"#),
            ("nav", r#"{{ define "navigation" }}n{{ end }}"#),
        ],
        CacheMode::Disabled,
    );
    let err = runtime.render_to_string(OutputKind::Text, "page", &()).unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ComposeError::Merge { .. }), "unexpected error: {err:?}");
    assert!(message.contains("@nav") && message.contains("`nav`"), "{message}");
}

#[test]
fn test_html_escapes_and_text_does_not() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[
            ("page", r#"{{ template "@quote" . }}"#),
            ("quote", r#"{{ define "@quote" }}<q>{{ said }}</q>{{ end }}"#),
        ],
        CacheMode::Enabled,
    );
    let data = json!({"said": "a < b & c"});
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &data)?, "<q>a < b & c</q>");
    assert_eq!(
        runtime.render_to_string(OutputKind::Html, "page", &data)?,
        "<q>a &lt; b &amp; c</q>"
    );
    Ok(())
}

#[test]
fn test_builtin_helpers_are_available() -> Result<()> {
    let (_, runtime) = memory_runtime(
        &[(
            "page",
            r#"{{ items | length | sub }}:{{ tags | keys | join(sep=",") }}:{% if path is defined and path | has_prefix(prefix="/docs") %}docs{% endif %}"#,
        )],
        CacheMode::Disabled,
    );
    let data = json!({"items": [1, 2, 3], "tags": {"b": 1, "a": 2}, "path": "/docs/intro"});
    assert_eq!(runtime.render_to_string(OutputKind::Text, "page", &data)?, "2:a,b:docs");
    Ok(())
}
