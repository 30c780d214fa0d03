use std::sync::Arc;

use markpane::application::host::HostServices;
use markpane::application::i18n::Catalog;
use markpane::application::markdown::MarkdownRenderer;
use markpane::application::render::{
    ComrakRenderService, RenderContext, RenderOptions, RenderPipelineConfig, ThemeMode,
};
use markpane::cache::CacheConfig;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

/// `(name, layer, value)` for every counter recorded.
fn counters(recorder: &DebuggingRecorder) -> Vec<(String, String, u64)> {
    recorder
        .snapshotter()
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| {
            let DebugValue::Counter(count) = value else {
                return None;
            };
            let key = composite_key.key();
            let layer = key
                .labels()
                .find(|label| label.key() == "layer")
                .map(|label| label.value().to_string())
                .unwrap_or_default();
            Some((key.name().to_string(), layer, count))
        })
        .collect()
}

fn counter(snapshot: &[(String, String, u64)], name: &str, layer: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(n, l, _)| n == name && l == layer)
        .map(|(_, _, value)| *value)
        .sum()
}

fn renderer(cache: CacheConfig) -> MarkdownRenderer {
    let service = ComrakRenderService::new(&RenderPipelineConfig {
        cache: cache.clone(),
        ..RenderPipelineConfig::default()
    });
    MarkdownRenderer::new(Arc::new(service), &cache, HostServices::default())
}

#[test]
fn document_layer_counts_hits_misses_and_evictions() {
    let recorder = DebuggingRecorder::new();

    metrics::with_local_recorder(&recorder, || {
        let renderer = renderer(CacheConfig {
            document_limit: 1,
            ..CacheConfig::default()
        });
        let catalog = Catalog::default();
        let ctx = RenderContext::new(ThemeMode::Light, &catalog);
        let options = RenderOptions::default();

        renderer.render("alpha", &options, &ctx);
        renderer.render("alpha", &options, &ctx);
        renderer.render("beta", &options, &ctx);
        renderer.render("alpha", &options, &ctx);
    });

    let snapshot = counters(&recorder);
    assert_eq!(counter(&snapshot, "markpane_cache_hit_total", "document"), 1);
    assert_eq!(counter(&snapshot, "markpane_cache_miss_total", "document"), 3);
    assert_eq!(counter(&snapshot, "markpane_cache_evict_total", "document"), 2);
    assert_eq!(counter(&snapshot, "markpane_cache_miss_total", "highlight"), 0);
}

#[test]
fn highlight_layer_is_shared_across_documents() {
    let recorder = DebuggingRecorder::new();

    metrics::with_local_recorder(&recorder, || {
        let renderer = renderer(CacheConfig::default());
        let catalog = Catalog::default();
        let ctx = RenderContext::new(ThemeMode::Dark, &catalog);
        let options = RenderOptions::default();
        let block = "```rust\nfn main() {}\n```\n";

        renderer.render(block, &options, &ctx);
        renderer.render(&format!("Intro\n\n{block}"), &options, &ctx);
        renderer.render(block, &options, &RenderContext::new(ThemeMode::Light, &catalog));
    });

    let snapshot = counters(&recorder);
    assert_eq!(counter(&snapshot, "markpane_cache_miss_total", "highlight"), 2);
    assert_eq!(counter(&snapshot, "markpane_cache_hit_total", "highlight"), 1);
    assert_eq!(counter(&snapshot, "markpane_cache_miss_total", "document"), 3);
}

#[test]
fn disabled_cache_records_nothing() {
    let recorder = DebuggingRecorder::new();

    metrics::with_local_recorder(&recorder, || {
        let renderer = renderer(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        let catalog = Catalog::default();
        let ctx = RenderContext::new(ThemeMode::Dark, &catalog);

        let first = renderer.render("same", &RenderOptions::default(), &ctx);
        let second = renderer.render("same", &RenderOptions::default(), &ctx);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.html, second.html);
    });

    assert!(counters(&recorder).is_empty());
}
