#![allow(missing_docs)]
//! Benchmarks for union catalog runs.
//!
//! Catalogs are generated in memory: each source holds the same pool of works
//! with per-library title variants, so strong and fuzzy matching both find
//! work to do.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use unicat::diagnostics::Diagnostics;
use unicat::matching::fuzzy::{fuzzy_edges, ScoringMode};
use unicat::normalize::normalize_all;
use unicat::source::load;
use unicat::{Field, Leader, MarcWriter, Pipeline, Record, RunConfig, RunOptions, SourceInput};

const WORDS: &[&str] = &[
    "history", "river", "night", "garden", "letters", "city", "winter", "songs", "voyage",
    "house", "stone", "memory", "empire", "sea", "mountain", "light",
];
const AUTHORS: &[&str] = &["Garcia, Ana", "Smith, John", "Puig, Marta", "Dupont, Claire"];

fn isbn13(n: usize) -> String {
    let body = format!("978{:09}", n % 1_000_000_000);
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    format!("{body}{}", (10 - sum % 10) % 10)
}

fn work(n: usize, library: usize) -> Record {
    let mut record = Record::new(Leader::default());
    record.add_control_field_str("001", &format!("L{library}-{n}"));

    // Every third work carries an ISBN in all libraries
    if n % 3 == 0 {
        let mut isbn = Field::new("020".to_string(), ' ', ' ');
        isbn.add_subfield_str('a', &isbn13(n));
        record.add_field(isbn);
    }

    let mut author = Field::new("100".to_string(), '1', ' ');
    author.add_subfield_str('a', AUTHORS[n % AUTHORS.len()]);
    record.add_field(author);

    let mut words: Vec<&str> = (0..3).map(|k| WORDS[(n * 7 + k * 5) % WORDS.len()]).collect();
    if library % 2 == 1 {
        words.reverse();
    }
    let mut title = Field::new("245".to_string(), '1', '0');
    title.add_subfield_str('a', &format!("The {} {n}", words.join(" ")));
    record.add_field(title);

    let mut imprint = Field::new("264".to_string(), ' ', '1');
    imprint.add_subfield_str('c', &(1950 + n % 70).to_string());
    record.add_field(imprint);

    record
}

fn catalog_bytes(library: usize, works: usize) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut writer = MarcWriter::new(&mut buffer);
        for n in 0..works {
            writer.write_record(&work(n, library)).expect("encode");
        }
        writer.finish().expect("flush");
    }
    buffer
}

fn sources(libraries: usize, works: usize) -> Vec<SourceInput> {
    (0..libraries)
        .map(|l| SourceInput::from_bytes(format!("LIB{}", l + 1), catalog_bytes(l, works)))
        .collect()
}

fn config(toml: &str) -> RunConfig {
    RunOptions::from_toml_str(toml)
        .and_then(|options| options.validate())
        .expect("valid options")
}

fn benchmark_load(c: &mut Criterion) {
    let bytes = catalog_bytes(0, 10_000);
    c.bench_function("load_10k_records", |b| {
        b.iter(|| {
            let mut diagnostics = Diagnostics::new();
            load(0, "LIB1", black_box(&bytes), &mut diagnostics).expect("load")
        });
    });
}

fn benchmark_fuzzy(c: &mut Criterion) {
    let mut records = Vec::new();
    for (index, library) in (0..3).enumerate() {
        let mut diagnostics = Diagnostics::new();
        let bytes = catalog_bytes(library, 2_000);
        records.extend(load(index, "LIB", &bytes, &mut diagnostics).expect("load"));
    }
    let keys = normalize_all(&records, &RunConfig::default());

    let mut group = c.benchmark_group("fuzzy_edges_6k");
    for (name, mode) in [("full", ScoringMode::Full), ("fast", ScoringMode::Fast)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &mode, |b, &mode| {
            b.iter(|| {
                let mut diagnostics = Diagnostics::new();
                fuzzy_edges(black_box(&keys), 90, mode, &mut diagnostics)
            });
        });
    }
    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let inputs = sources(3, 2_000);

    let mut group = c.benchmark_group("pipeline_3x2k");
    group.sample_size(10);
    for (name, options) in [
        ("strong_only", "strong-only = true"),
        ("threshold_90", "weak-threshold = 90"),
        ("final_pipeline", "final-pipeline = true"),
    ] {
        let pipeline = Pipeline::new(config(options));
        group.bench_function(name, |b| {
            b.iter(|| {
                let output = pipeline.run(black_box(&inputs)).expect("run");
                output.artifacts().expect("artifacts")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_load, benchmark_fuzzy, benchmark_pipeline);
criterion_main!(benches);
