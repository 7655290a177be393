use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use survey_curator::models::Field;
use survey_curator::{CurationPipeline, DatasetConfig, RawRecord, RawValue};

const TAXA: &[&str] = &[
    "Araneus diadematus",
    "Lycosa sp1",
    "Lycosa sp2",
    "Pardosa cf. amentata",
    "Amphiura (Acrocnida) brachiata",
    "Carabidae",
    "Bufo bufo",
    "Rana temporaria agg.",
];

fn bench_config() -> DatasetConfig {
    DatasetConfig::default()
        .with_study_id("BENCH")
        .with_column(Field::Abundance, "Count")
        .with_column(Field::Taxon, "Taxon")
        .with_column(Field::Latitude, "Lat")
        .with_column(Field::Longitude, "Long")
        .with_column(Field::Plot, "Site")
        .with_column(Field::Month, "Month")
        .with_column(Field::Year, "Year")
}

/// Synthetic survey rows with repeated events so aggregation has work to do
fn synthetic_rows(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|i| {
            RawRecord::new(i + 1)
                .with_field("Count", RawValue::Int((i % 7) as i64))
                .with_field("Taxon", RawValue::Text(TAXA[i % TAXA.len()].to_string()))
                .with_field("Lat", RawValue::Float(50.0 + (i % 13) as f64 * 0.1))
                .with_field("Long", RawValue::Float(1.0 + (i % 11) as f64 * 0.1))
                .with_field("Site", RawValue::Text(format!("S{}", i % 5)))
                .with_field("Month", RawValue::Int((i % 12) as i64 + 1))
                .with_field("Year", RawValue::Int(2000 + (i % 4) as i64))
        })
        .collect()
}

fn bench_run_records(c: &mut Criterion) {
    let pipeline = CurationPipeline::new(bench_config()).expect("bench config");
    let mut group = c.benchmark_group("run_records");

    for size in [1_000, 10_000] {
        let rows = synthetic_rows(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                let output = pipeline
                    .run_records(black_box(rows.clone()))
                    .expect("curation");
                black_box(output.records.len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_run_records);
criterion_main!(benches);
