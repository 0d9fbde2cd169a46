//! Navigation benchmarks: cached line lookup vs. a cold scan, and the
//! column round-trip on a mixed-width line.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use edit_buffer::{EditBuffer, LineCache, column};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn build_doc(lines: usize) -> EditBuffer {
    let mut text = String::with_capacity(lines * 20);
    for i in 0..lines {
        text.push_str(&format!("line {i} with some text\n"));
    }
    EditBuffer::from_str(&text)
}

fn bench_line_lookup(c: &mut Criterion) {
    let buf = build_doc(50_000);
    let mut rng = StdRng::seed_from_u64(7);
    let queries: Vec<usize> = (0..256).map(|_| rng.gen_range(0..50_000)).collect();

    c.bench_function("line_lookup_cached_random", |b| {
        let mut cache = LineCache::new();
        b.iter(|| {
            for &q in &queries {
                black_box(cache.offset_for_line(&buf, q));
            }
        })
    });

    c.bench_function("line_lookup_sequential_scroll", |b| {
        let mut cache = LineCache::new();
        b.iter(|| {
            for q in 20_000..20_256 {
                black_box(cache.offset_for_line(&buf, q));
            }
        })
    });
}

fn bench_column_round_trip(c: &mut Criterion) {
    let buf = EditBuffer::from_str("\tfn main() { println!(\"\u{4e16}\u{754c}\"); }\t// end\n");
    c.bench_function("column_round_trip", |b| {
        b.iter(|| {
            let eol = buf.get_eol(0);
            let mut p = 0;
            while p < eol {
                let col = column::column_at(&buf, 0, p, 8);
                black_box(column::offset_at_column(&buf, 0, col, 8));
                let (_, len) = buf.get_utf(p);
                p += len;
            }
        })
    });
}

criterion_group!(benches, bench_line_lookup, bench_column_round_trip);
criterion_main!(benches);
