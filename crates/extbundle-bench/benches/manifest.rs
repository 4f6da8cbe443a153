use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use extbundle_core::manifest::{transform_manifest, Manifest, TransformOptions};
use extbundle_core::reload::CLIENT_ASSET;
use extbundle_core::Vendor;
use serde_json::{json, Value};
use std::path::Path;

/// A manifest with `n` content scripts, each carrying per-vendor overrides.
fn manifest_source(n: usize) -> String {
    let scripts: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "matches": [format!("https://site{i}.example/*")],
                "js": [format!("content/{i}.js")],
                "__firefox__run_at": "document_idle",
                "__chrome|edge__run_at": "document_start"
            })
        })
        .collect();

    json!({
        "manifest_version": 3,
        "name": "Bench",
        "version": "1.2.3",
        "permissions": ["storage", "tabs"],
        "__chrome__background": {"service_worker": "sw.js"},
        "__firefox__background": {"scripts": ["bg.js"]},
        "content_scripts": scripts
    })
    .to_string()
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_manifest");
    let defaults = Manifest::new();

    for n in [1, 16, 256] {
        let source = manifest_source(n);
        for vendor in [Vendor::Chrome, Vendor::Firefox] {
            let options = TransformOptions {
                vendor,
                defaults: &defaults,
                skip_validation: false,
                inject_client: Some(CLIENT_ASSET),
            };
            group.bench_with_input(
                BenchmarkId::new(vendor.as_str(), n),
                &source,
                |b, source| {
                    b.iter(|| {
                        transform_manifest(Path::new("manifest.json"), black_box(source), &options)
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_transform);
criterion_main!(benches);
