use std::sync::Arc;

use quadload_core::statement::GEO_WKT_LITERAL;
use quadload_core::{
    GeoMode, Loader, LoaderConfig, MemoryStore, Object, RetryPolicy, Serializer,
    SerializerOptions, Statement, StatementHandler,
};

fn synthetic_statements(n: usize) -> Vec<Statement> {
    (0..n)
        .map(|i| {
            Statement::new(
                format!("http://example.org/resource/{i}"),
                "http://example.org/ontology#label",
                Object::string(format!("Label for resource {i}")),
            )
        })
        .collect()
}

#[divan::bench(args = [false, true])]
fn serialize_plain(bencher: divan::Bencher, hashed_fields: bool) {
    let statements = synthetic_statements(8192);
    let serializer = Serializer::new(SerializerOptions {
        hashed_fields,
        geo: GeoMode::Off,
    });
    bencher.bench(|| {
        for st in &statements {
            divan::black_box(serializer.serialize(st).unwrap());
        }
    });
}

#[divan::bench]
fn serialize_polygon(bencher: divan::Bencher) {
    let st = Statement::new(
        "http://example.org/feature/1",
        "http://www.opengis.net/ont/geosparql#asWKT",
        Object::literal(
            "POLYGON ((-77.1 38.8, -76.9 38.8, -76.9 39.0, -77.1 39.0, -77.1 38.8))",
            GEO_WKT_LITERAL,
        ),
    );
    let serializer = Serializer::default();
    bencher.bench(|| serializer.serialize(divan::black_box(&st)).unwrap());
}

#[divan::bench(args = [1, 2, 4])]
fn load_memory(bencher: divan::Bencher, workers: usize) {
    let statements = synthetic_statements(20_000);
    let config = LoaderConfig {
        batch_size: 2_000,
        workers,
        retry: RetryPolicy::NONE,
        ..Default::default()
    };
    bencher.bench(|| {
        let mut loader = Loader::new(Arc::new(MemoryStore::new()), &config).unwrap();
        loader.on_start();
        for st in statements.iter().cloned() {
            loader.handle(st);
        }
        loader.finish()
    });
}

fn main() {
    divan::main();
}
