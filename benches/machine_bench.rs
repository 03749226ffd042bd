// Criterion benchmark suite for the NFA machine.
//
// Run: cargo bench
// Specific group: cargo bench -- pathological
// HTML report: target/criterion/report/index.html

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use linre::api::Regex;
use linre::compile::{compile, Expr};
use linre::input::{Utf16Input, Utf8Input};
use linre::machine::{Anchor, Machine, MatchKind};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn word() -> Expr {
    Expr::plus(Expr::class(&[('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')]))
}

fn machine(expr: &Expr, kind: MatchKind, ncap: usize) -> Machine {
    let prog = compile(expr).expect("compile failed");
    let mut m = Machine::new(Arc::new(prog), kind);
    m.init(ncap);
    m
}

// ---------------------------------------------------------------------------
// 1. compile -- measure compilation time
// ---------------------------------------------------------------------------

fn bench_compile(c: &mut Criterion) {
    let patterns: Vec<(&str, Expr)> = vec![
        ("literal", Expr::str("hello world")),
        ("dot_star", Expr::cat(vec![Expr::str("foo"), Expr::star(Expr::AnyCharNotNl), Expr::str("bar")])),
        (
            "alternation",
            Expr::alt(vec![Expr::str("alpha"), Expr::str("beta"), Expr::str("gamma"), Expr::str("delta")]),
        ),
        ("char_class", word()),
        ("repeat", Expr::repeat(Expr::lit('a'), 2, Some(50))),
        ("group", Expr::cat(vec![Expr::plus(Expr::group(1, Expr::str("abc"))), Expr::star(Expr::group(2, Expr::str("def")))])),
    ];

    let mut group = c.benchmark_group("compile");
    for (name, expr) in &patterns {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            b.iter(|| {
                let prog = compile(black_box(expr)).unwrap();
                black_box(&prog);
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. literal -- substring fast path vs prefix skip vs plain machine
// ---------------------------------------------------------------------------

fn bench_literal(c: &mut Criterion) {
    let mut text = "The quick brown fox jumps over the lazy dog ".repeat(200);
    text.push_str("near the riverbank");

    let mut group = c.benchmark_group("literal");
    group.throughput(Throughput::Bytes(text.len() as u64));

    let complete = Regex::new(&Expr::str("riverbank")).unwrap();
    group.bench_function("complete_prefix", |b| {
        b.iter(|| black_box(complete.find(black_box(&text))));
    });

    // riverbank\b has the prefix but needs the machine for the tail.
    let partial = Regex::new(&Expr::cat(vec![Expr::str("riverbank"), Expr::word_boundary()])).unwrap();
    group.bench_function("prefix_skip", |b| {
        b.iter(|| black_box(partial.find(black_box(&text))));
    });

    // [r]iverbank defeats the prefix.
    let none = Regex::new(&Expr::cat(vec![Expr::class(&[('q', 'r')]), Expr::str("iverbank")])).unwrap();
    group.bench_function("no_prefix", |b| {
        b.iter(|| black_box(none.find(black_box(&text))));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 3. pathological -- (a?){n}a{n} against a^n stays linear
// ---------------------------------------------------------------------------

fn bench_pathological(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathological");
    for n in [8u32, 16, 32, 64] {
        let expr = Expr::cat(vec![
            Expr::repeat(Expr::quest(Expr::lit('a')), n, Some(n)),
            Expr::repeat(Expr::lit('a'), n, Some(n)),
        ]);
        let mut m = machine(&expr, MatchKind::LeftmostFirst, 2);
        let text = "a".repeat(n as usize);
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            let input = Utf8Input::from(text.as_str());
            b.iter(|| black_box(m.match_input(&input, 0, Anchor::AnchorBoth)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 4. captures -- slot count cost
// ---------------------------------------------------------------------------

fn bench_captures(c: &mut Criterion) {
    // (\w+)@(\w+)\.com
    let expr = Expr::cat(vec![
        Expr::group(1, word()),
        Expr::lit('@'),
        Expr::group(2, word()),
        Expr::str(".com"),
    ]);
    let text = format!("{} contact: someone@example.com", "filler text ".repeat(50));

    let mut group = c.benchmark_group("captures");
    for ncap in [0usize, 2, 6] {
        let mut m = machine(&expr, MatchKind::LeftmostFirst, ncap);
        group.bench_with_input(BenchmarkId::new("ncap", ncap), &text, |b, text| {
            let input = Utf8Input::from(text.as_str());
            b.iter(|| black_box(m.match_input(&input, 0, Anchor::Unanchored)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 5. match_kind -- leftmost-first vs leftmost-longest
// ---------------------------------------------------------------------------

fn bench_match_kind(c: &mut Criterion) {
    let expr = Expr::plus(Expr::alt(vec![Expr::lit('a'), Expr::str("ab"), Expr::str("abc")]));
    let text = "abc".repeat(300);

    let mut group = c.benchmark_group("match_kind");
    for (name, kind) in [("first", MatchKind::LeftmostFirst), ("longest", MatchKind::LeftmostLongest)] {
        let mut m = machine(&expr, kind, 2);
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            let input = Utf8Input::from(text.as_str());
            b.iter(|| black_box(m.match_input(&input, 0, Anchor::Unanchored)));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 6. encodings -- UTF-8 vs UTF-16 over the same text
// ---------------------------------------------------------------------------

fn bench_encodings(c: &mut Criterion) {
    let expr = Expr::cat(vec![Expr::plus(Expr::class(&[('ぁ', 'ゖ')])), Expr::lit('!')]);
    let text = "ひらがなのぶんしょう、".repeat(100) + "おわり!";
    let units: Vec<u16> = text.encode_utf16().collect();

    let mut group = c.benchmark_group("encodings");
    let mut m = machine(&expr, MatchKind::LeftmostFirst, 2);
    group.bench_function("utf8", |b| {
        let input = Utf8Input::from(text.as_str());
        b.iter(|| black_box(m.match_input(&input, 0, Anchor::Unanchored)));
    });
    let mut m = machine(&expr, MatchKind::LeftmostFirst, 2);
    group.bench_function("utf16", |b| {
        let input = Utf16Input::new(&units);
        b.iter(|| black_box(m.match_input(&input, 0, Anchor::Unanchored)));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// 7. find_iter -- all matches over a large text
// ---------------------------------------------------------------------------

fn bench_find_iter(c: &mut Criterion) {
    let re = Regex::new(&word()).unwrap();
    let text = "lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(100);

    let mut group = c.benchmark_group("find_iter");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.bench_function("words", |b| {
        b.iter(|| black_box(re.find_iter(black_box(&text)).count()));
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_compile,
    bench_literal,
    bench_pathological,
    bench_captures,
    bench_match_kind,
    bench_encodings,
    bench_find_iter,
);
criterion_main!(benches);
