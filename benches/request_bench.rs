// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use httpsession::{Cookie, CookieStore, Method, MultipartPart, RequestConfig, Request};
use url::Url;

fn form_encoding_benchmark(c: &mut Criterion) {
    let params: Vec<(String, String)> = (0..32)
        .map(|i| (format!("field{}", i), format!("value {} & more", i)))
        .collect();

    c.bench_function("configure_form_post", |b| {
        b.iter(|| {
            let config = RequestConfig::new()
                .method(Method::POST)
                .params(params.clone());
            black_box(Request::configure("https://example.test/post", config).ok())
        })
    });
}

fn multipart_encoding_benchmark(c: &mut Criterion) {
    let payload = vec![b'x'; 64 * 1024];

    c.bench_function("configure_multipart_upload", |b| {
        b.iter(|| {
            let config = RequestConfig::new()
                .method(Method::POST)
                .param("title", "report")
                .part(MultipartPart::file(
                    "file",
                    "report.bin",
                    "application/octet-stream",
                    payload.clone(),
                ));
            black_box(Request::configure("https://example.test/upload", config).ok())
        })
    });
}

fn cookie_lookup_benchmark(c: &mut Criterion) {
    let store = CookieStore::new();
    for i in 0..64 {
        store.add(
            Cookie::new(format!("c{}", i), "v")
                .domain("example.test")
                .path(if i % 2 == 0 { "/" } else { "/api" }),
        );
    }
    let url = Url::parse("https://example.test/api/items").unwrap();

    c.bench_function("cookie_header_lookup", |b| {
        b.iter(|| black_box(store.cookie_header(&url)))
    });
}

criterion_group!(
    benches,
    form_encoding_benchmark,
    multipart_encoding_benchmark,
    cookie_lookup_benchmark
);
criterion_main!(benches);
