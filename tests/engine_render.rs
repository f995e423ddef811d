//! End-to-end engine tests against a toy tree renderer.
//!
//! The renderer mimics what the engine expects from a host: it escapes
//! values it embeds in markup, assigns structural identifiers from the
//! context counter, and recurses through the engine for nested components.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde_json::json;

use ssr_cache::{
    CacheEngine, CacheError, CachingConfig, ComponentPolicy, CustomKeyFn, EngineConfig,
    PropsMap, PropsValue, RenderContext, Renderer, Strategy, escape_html,
};

struct TestRenderer {
    engine: Arc<CacheEngine>,
    renders: AtomicUsize,
    clock: AtomicU64,
}

impl TestRenderer {
    fn new(engine: Arc<CacheEngine>) -> Self {
        Self {
            engine,
            renders: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
        }
    }

    fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

fn text(value: Option<&PropsValue>) -> String {
    match value {
        Some(PropsValue::String(s)) => s.clone(),
        Some(PropsValue::Number(n)) => n.to_string(),
        Some(PropsValue::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn id_attr(ctx: &mut RenderContext) -> String {
    if ctx.static_markup {
        String::new()
    } else {
        let id = ctx.id_counter;
        ctx.id_counter += 1;
        format!(" data-ssrid=\"{id}\"")
    }
}

impl Renderer for TestRenderer {
    fn render(&self, name: &str, props: &PropsValue, ctx: &mut RenderContext) -> String {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let map = props.as_object().cloned().unwrap_or_default();
        match name {
            "Hello" => {
                let outer = id_attr(ctx);
                let inner = id_attr(ctx);
                format!(
                    "<div{outer}>Hello <span{inner}>{}</span>, {}</div>",
                    escape_html(&text(map.get("name"))),
                    escape_html(&text(map.get("message"))),
                )
            }
            "Counter" => {
                let outer = id_attr(ctx);
                format!(
                    "<div{outer}><b>{}</b> {}</div>",
                    escape_html(&text(map.get("count"))),
                    escape_html(&text(map.get("label"))),
                )
            }
            "Link" => {
                let outer = id_attr(ctx);
                format!(
                    "<a{outer} href=\"{}\">{}</a>",
                    escape_html(&text(map.get("url"))),
                    escape_html(&text(map.get("label"))),
                )
            }
            "Card" => {
                let outer = id_attr(ctx);
                let mut child = PropsMap::new();
                child.insert(
                    "name".to_string(),
                    PropsValue::String(text(map.get("title"))),
                );
                child.insert(
                    "message".to_string(),
                    PropsValue::String("welcome".to_string()),
                );
                let inner = self
                    .engine
                    .render_cached("Hello", &PropsValue::Object(child), self, ctx)
                    .expect("nested render");
                format!("<section{outer}>{inner}</section>")
            }
            "Clock" => {
                // Reads ambient state the props traversal cannot see.
                let tick = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
                let outer = id_attr(ctx);
                format!(
                    "<div{outer}>tick {tick}, {}</div>",
                    escape_html(&text(map.get("label"))),
                )
            }
            other => panic!("unknown test component {other}"),
        }
    }
}

/// Surface engine warn/debug logs when the suite runs with `RUST_LOG` set.
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup(config_json: &str) -> (Arc<CacheEngine>, TestRenderer) {
    init_logging();
    let engine = Arc::new(CacheEngine::new(EngineConfig {
        verify_renders: false,
        ..Default::default()
    }));
    engine.set_caching_config(serde_json::from_str(config_json).expect("caching config"));
    engine.enable_caching(true);
    engine.set_hash_keys(false, None);
    let renderer = TestRenderer::new(Arc::clone(&engine));
    (engine, renderer)
}

fn props(value: serde_json::Value) -> PropsValue {
    PropsValue::from(value)
}

#[test]
fn simple_strategy_reuses_output_byte_for_byte() {
    let (engine, renderer) = setup("{}");
    let mut components = HashMap::new();
    components.insert(
        "Hello".to_string(),
        ComponentPolicy {
            enable: true,
            strategy: Strategy::Simple,
            custom_key_fn: Some(CustomKeyFn::new(|_| "k".to_string())),
            ..Default::default()
        },
    );
    engine.set_caching_config(CachingConfig { components });

    let p = props(json!({"name": "test", "message": "good morning"}));

    let mut ctx = RenderContext::new();
    let first = engine.render_cached("Hello", &p, &renderer, &mut ctx).unwrap();
    assert_eq!(engine.cache_hit_report().get("Hello-k"), Some(&0));
    assert_eq!(renderer.render_count(), 1);

    let mut ctx = RenderContext::new();
    let second = engine.render_cached("Hello", &p, &renderer, &mut ctx).unwrap();
    assert_eq!(first, second, "hit returns the stored output unchanged");
    assert_eq!(engine.cache_hit_report().get("Hello-k"), Some(&1));
    assert_eq!(renderer.render_count(), 1, "hit does not invoke the renderer");
}

#[test]
fn template_strategy_reinjects_per_render_values() {
    let (engine, renderer) = setup(
        r#"{"components": {"Counter": {
            "strategy": "template",
            "enable": true,
            "whitelist_non_string_keys": ["count"]
        }}}"#,
    );

    let mut ctx = RenderContext::new();
    let first = engine
        .render_cached("Counter", &props(json!({"count": 3, "label": "A"})), &renderer, &mut ctx)
        .unwrap();
    assert_eq!(first, "<div data-ssrid=\"1\"><b>3</b> A</div>");

    let mut ctx = RenderContext::new();
    let second = engine
        .render_cached("Counter", &props(json!({"count": 7, "label": "B"})), &renderer, &mut ctx)
        .unwrap();
    assert_eq!(second, "<div data-ssrid=\"1\"><b>7</b> B</div>");

    assert_eq!(engine.cache_entry_count(), 1, "both renders share one entry");
    assert_eq!(renderer.render_count(), 1, "second render came from cache");
}

#[test]
fn hit_matches_uncached_render_with_same_counter() {
    let (engine, renderer) = setup(
        r#"{"components": {"Hello": {"strategy": "template", "enable": true}}}"#,
    );

    let mut ctx = RenderContext::new();
    engine
        .render_cached("Hello", &props(json!({"name": "a", "message": "m"})), &renderer, &mut ctx)
        .unwrap();

    // Second render is a hit; it must equal what an uncached render
    // starting from the same identifier counter would produce.
    let second_props = props(json!({"name": "b & c", "message": "<hi>"}));
    let mut plain_ctx = ctx.clone();
    let expected = renderer.render("Hello", &second_props, &mut plain_ctx);

    let actual = engine
        .render_cached("Hello", &second_props, &renderer, &mut ctx)
        .unwrap();
    assert_eq!(actual, expected);
    assert_eq!(ctx.id_counter, plain_ctx.id_counter);
}

#[test]
fn url_protocol_variants_share_an_entry_but_keep_their_protocol() {
    let (engine, renderer) = setup(
        r#"{"components": {"Link": {"strategy": "template", "enable": true}}}"#,
    );

    let mut ctx = RenderContext::new();
    let http = engine
        .render_cached(
            "Link",
            &props(json!({"url": "http://x.com/a", "label": "x & y"})),
            &renderer,
            &mut ctx,
        )
        .unwrap();
    assert_eq!(
        http,
        "<a data-ssrid=\"1\" href=\"http://x.com/a\">x &amp; y</a>"
    );

    let mut ctx = RenderContext::new();
    let https = engine
        .render_cached(
            "Link",
            &props(json!({"url": "https://x.com/a", "label": "x & y"})),
            &renderer,
            &mut ctx,
        )
        .unwrap();
    assert_eq!(
        https,
        "<a data-ssrid=\"1\" href=\"https://x.com/a\">x &amp; y</a>",
        "each caller gets its exact original protocol back"
    );

    assert_eq!(engine.cache_entry_count(), 1);
    assert_eq!(renderer.render_count(), 1);
}

#[test]
fn nested_components_are_cached_by_parent() {
    let (engine, renderer) = setup(
        r#"{"components": {
            "Card": {"strategy": "template", "enable": true},
            "Hello": {"strategy": "template", "enable": true}
        }}"#,
    );
    engine.enable_debug(true);

    let mut ctx = RenderContext::new();
    let first = engine
        .render_cached("Card", &props(json!({"title": "Hi"})), &renderer, &mut ctx)
        .unwrap();
    assert!(first.contains("cacheType cache"), "outer render missed: {first}");
    assert!(
        first.contains("component Hello cacheType byParent"),
        "nested render is suppressed: {first}"
    );

    let report = engine.cache_hit_report();
    assert_eq!(report.len(), 1, "only the parent is stored: {report:?}");
    assert!(report.keys().all(|k| k.starts_with("Card-")));

    let mut ctx = RenderContext::new();
    let second = engine
        .render_cached("Card", &props(json!({"title": "Yo"})), &renderer, &mut ctx)
        .unwrap();
    assert!(second.contains("cacheType HIT"));
    assert!(second.contains("Yo"), "hit carries the caller's value: {second}");
}

#[test]
fn empty_or_externally_filled_props_are_not_cached() {
    let (engine, renderer) = setup(
        r#"{"components": {"Hello": {"strategy": "template", "enable": true}}}"#,
    );
    engine.enable_debug(true);

    let mut ctx = RenderContext::new();
    let empty = engine
        .render_cached("Hello", &props(json!({})), &renderer, &mut ctx)
        .unwrap();
    assert!(empty.contains("cacheType NONE"));

    let mut ctx = RenderContext::new();
    let with_children = engine
        .render_cached(
            "Hello",
            &props(json!({"name": "x", "children": {"nested": true}})),
            &renderer,
            &mut ctx,
        )
        .unwrap();
    assert!(with_children.contains("cacheType NONE"));

    assert_eq!(engine.cache_entry_count(), 0);
}

#[test]
fn unknown_strategy_is_a_fatal_configuration_error() {
    let (engine, renderer) = setup(
        r#"{"components": {"Hello": {"strategy": "magic", "enable": true}}}"#,
    );

    let mut ctx = RenderContext::new();
    let err = engine
        .render_cached("Hello", &props(json!({"name": "x"})), &renderer, &mut ctx)
        .unwrap_err();
    assert!(matches!(err, CacheError::UnknownStrategy { .. }));
    assert_eq!(
        err.to_string(),
        "unknown caching strategy `magic` for component `Hello`"
    );
}

#[test]
fn missing_strategy_is_a_fatal_configuration_error() {
    let (engine, renderer) = setup(r#"{"components": {"Hello": {"enable": true}}}"#);

    let mut ctx = RenderContext::new();
    let err = engine
        .render_cached("Hello", &props(json!({"name": "x"})), &renderer, &mut ctx)
        .unwrap_err();
    assert!(matches!(err, CacheError::UnknownStrategy { .. }));
}

#[test]
fn verification_mismatch_reports_a_plain_uncached_decision() {
    init_logging();
    let engine = Arc::new(CacheEngine::new(EngineConfig::default()));
    engine.set_caching_config(
        serde_json::from_str(
            r#"{"components": {"Clock": {"strategy": "template", "enable": true}}}"#,
        )
        .expect("caching config"),
    );
    engine.enable_caching(true);
    engine.enable_debug(true);
    engine.set_hash_keys(false, None);
    let renderer = TestRenderer::new(Arc::clone(&engine));

    let mut ctx = RenderContext::new();
    let html = engine
        .render_cached("Clock", &props(json!({"label": "x"})), &renderer, &mut ctx)
        .unwrap();
    // The uncached fallback is wrapped like any other NONE render: no key.
    assert!(
        html.starts_with("<!-- component Clock cacheType NONE - -->"),
        "unexpected debug wrap: {html}"
    );
    assert!(engine.is_blacklisted("Clock"));
}

#[test]
fn inconsistent_template_render_blacklists_the_component() {
    init_logging();
    let engine = Arc::new(CacheEngine::new(EngineConfig::default()));
    engine.set_caching_config(
        serde_json::from_str(
            r#"{"components": {"Clock": {"strategy": "template", "enable": true}}}"#,
        )
        .expect("caching config"),
    );
    engine.enable_caching(true);
    engine.set_hash_keys(false, None);
    let renderer = TestRenderer::new(Arc::clone(&engine));

    let mut ctx = RenderContext::new();
    let first = engine
        .render_cached("Clock", &props(json!({"label": "x"})), &renderer, &mut ctx)
        .unwrap();

    // The templated render saw tick 1, the verification render tick 2:
    // the stored entry cannot reproduce a fresh render.
    assert_eq!(first, "<div data-ssrid=\"1\">tick 2, x</div>");
    assert!(engine.is_blacklisted("Clock"));
    assert_eq!(engine.cache_entry_count(), 0, "inconsistent entry dropped");

    let mut ctx = RenderContext::new();
    engine
        .render_cached("Clock", &props(json!({"label": "x"})), &renderer, &mut ctx)
        .unwrap();
    assert_eq!(engine.cache_entry_count(), 0, "blacklisted renders skip caching");

    engine.clear_blacklist();
    assert!(!engine.is_blacklisted("Clock"));
}

#[test]
fn caching_disabled_renders_directly() {
    let (engine, renderer) = setup(
        r#"{"components": {"Hello": {"strategy": "template", "enable": true}}}"#,
    );
    engine.enable_caching(false);
    engine.enable_debug(true);

    let mut ctx = RenderContext::new();
    let html = engine
        .render_cached("Hello", &props(json!({"name": "x", "message": "y"})), &renderer, &mut ctx)
        .unwrap();
    assert!(!html.contains("<!--"), "no debug wrap while caching is off");
    assert_eq!(engine.cache_entry_count(), 0);
    assert_eq!(renderer.render_count(), 1);
}

#[test]
fn static_markup_skips_identifier_renumbering() {
    let (engine, renderer) = setup(
        r#"{"components": {"Hello": {"strategy": "template", "enable": true}}}"#,
    );

    let mut ctx = RenderContext::static_markup();
    let first = engine
        .render_cached("Hello", &props(json!({"name": "a", "message": "m"})), &renderer, &mut ctx)
        .unwrap();
    assert_eq!(first, "<div>Hello <span>a</span>, m</div>");

    let mut ctx = RenderContext::static_markup();
    let second = engine
        .render_cached("Hello", &props(json!({"name": "b", "message": "m"})), &renderer, &mut ctx)
        .unwrap();
    assert_eq!(second, "<div>Hello <span>b</span>, m</div>");
    assert_eq!(renderer.render_count(), 1);
}

#[test]
fn debug_comment_names_component_decision_and_key() {
    let (engine, renderer) = setup("{}");
    engine.enable_debug(true);

    let mut ctx = RenderContext::new();
    let html = engine
        .render_cached("Hello", &props(json!({"name": "x", "message": "y"})), &renderer, &mut ctx)
        .unwrap();
    assert!(
        html.starts_with("<!-- component Hello cacheType NONE - -->"),
        "unexpected debug wrap: {html}"
    );
}
