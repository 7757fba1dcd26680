//! Benchmarks for token-budgeted chunking.

use std::sync::Arc;

use condense::{BpeTokenizer, Chunker, Encoding, LinePacker, TokenWindow, Tokenizer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn sample_text(size: usize) -> String {
    // Realistic line-oriented text: a log of short sentences
    let lines = [
        "The quick brown fox jumps over the lazy dog.\n",
        "Pack my box with five dozen liquor jugs.\n",
        "How vexingly quick daft zebras jump!\n",
        "\n",
        "The five boxing wizards jump quickly.\n",
        "Sphinx of black quartz, judge my vow.\n",
    ];
    let mut text = String::with_capacity(size);
    let mut i = 0;
    while text.len() < size {
        text.push_str(lines[i % lines.len()]);
        i += 1;
    }
    text.truncate(size);
    text
}

fn tokenizer() -> Arc<dyn Tokenizer> {
    Arc::new(BpeTokenizer::new(Encoding::Cl100kBase).unwrap())
}

fn bench_token_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_window");
    let tokenizer = tokenizer();

    for size in [1_000, 10_000, 100_000] {
        let text = sample_text(size);
        let chunker = TokenWindow::new(Arc::clone(&tokenizer), 256, 32).unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("window", size), &text, |b, text| {
            b.iter(|| chunker.chunk(black_box(text)))
        });
    }

    group.finish();
}

fn bench_line_packer(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_packer");
    let tokenizer = tokenizer();

    for size in [1_000, 10_000, 100_000] {
        let text = sample_text(size);
        let chunker = LinePacker::for_template(
            Arc::clone(&tokenizer),
            "Summarize:\n\n{{{chunk}}}\n\nSummary:",
            1768,
            1024,
        )
        .unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("pack", size), &text, |b, text| {
            b.iter(|| chunker.chunk(black_box(text)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_token_window, bench_line_packer);
criterion_main!(benches);
