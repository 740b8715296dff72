use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;
use transmem::{TmConfig, TmStore};

const WORDS: &[&str] = &[
    "open", "close", "save", "file", "document", "window", "print", "page", "error", "reading",
    "writing", "cannot", "found", "invalid", "settings", "catalog", "translation", "language",
    "project", "update",
];

/// Builds a store of `n` synthetic UI strings in a temp directory.
/// The TempDir must outlive the store, so both are returned.
fn bench_store(n: usize) -> (TempDir, TmStore) {
    let dir = tempfile::tempdir().unwrap();
    let mut tm = TmStore::open(dir.path(), TmConfig::default()).unwrap();
    for i in 0..n {
        let a = WORDS[i % WORDS.len()];
        let b = WORDS[(i / WORDS.len() + i) % WORDS.len()];
        let c = WORDS[(i * 7 + 3) % WORDS.len()];
        let source = format!("Cannot {a} the {b} {c} #{i}");
        tm.store(&source, &format!("translation {i}")).unwrap();
    }
    (dir, tm)
}

static QUERIES: &[(&str, &str)] = &[
    ("exact_tokens", "cannot open the file reading"),
    ("fuzzy", "cannot open that file quickly"),
    ("miss", "completely unrelated sentence here"),
];

fn bench_lookup(c: &mut Criterion) {
    for &size in &[100usize, 1000] {
        let (_dir, tm) = bench_store(size);
        let mut group = c.benchmark_group(format!("lookup/{size}"));
        for &(label, query) in QUERIES {
            group.bench_with_input(BenchmarkId::new(label, query.len()), &query, |b, &query| {
                b.iter(|| tm.lookup(query, 2, 2));
            });
        }
        group.finish();
    }
}

fn bench_store_op(c: &mut Criterion) {
    c.bench_function("store/append", |b| {
        let (_dir, mut tm) = bench_store(100);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            tm.store(&format!("new sentence number {i}"), "translation")
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_lookup, bench_store_op);
criterion_main!(benches);
