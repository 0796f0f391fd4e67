//! Throughput of the streaming tokenizer and record parser.

use criterion::{
    criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use zonescan::{Options, Parser, ScannedRecord, TokenCode};

/// Synthesizes a zone of `lines` address records with comments and the
/// occasional multi-line TXT record thrown in.
fn synthesize(lines: usize) -> String {
    let mut zone = String::with_capacity(lines * 40);
    zone.push_str("$TTL 3600\n");
    for i in 0..lines {
        match i % 16 {
            0 => zone.push_str(&format!(
                "host{i} IN TXT ( \"line one\"\n \"line two\" )\n"
            )),
            1 => zone.push_str(&format!(
                "host{i} IN MX 10 mail ; preference 10\n"
            )),
            _ => zone.push_str(&format!(
                "host{i} 300 IN A 10.{}.{}.{}\n",
                i >> 16 & 0xff,
                i >> 8 & 0xff,
                i & 0xff
            )),
        }
    }
    zone
}

fn options() -> Options {
    Options {
        origin: "bench.example.".into(),
        ..Default::default()
    }
}

fn bench_lex(c: &mut Criterion) {
    let mut group = c.benchmark_group("lex");
    for lines in [1_000usize, 100_000] {
        let zone = synthesize(lines);
        group.throughput(Throughput::Bytes(zone.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(lines),
            &zone,
            |b, zone| {
                b.iter(|| {
                    let mut parser =
                        Parser::open_string(&options(), zone).unwrap();
                    let mut count = 0usize;
                    loop {
                        let token = parser.lex().unwrap();
                        if token.code == TokenCode::EndOfFile {
                            break;
                        }
                        count += 1;
                    }
                    count
                })
            },
        );
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for lines in [1_000usize, 100_000] {
        let zone = synthesize(lines);
        group.throughput(Throughput::Bytes(zone.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(lines),
            &zone,
            |b, zone| {
                b.iter(|| {
                    let mut count = 0usize;
                    let mut sink =
                        |_: &ScannedRecord<'_>| -> Result<(), i32> {
                            count += 1;
                            Ok(())
                        };
                    Parser::parse_string(&options(), zone, &mut sink)
                        .unwrap();
                    count
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_lex, bench_parse);
criterion_main!(benches);
