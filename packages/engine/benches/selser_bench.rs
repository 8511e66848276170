use criterion::{black_box, criterion_group, criterion_main, Criterion};
use selser_dom::SelserConfig;
use selser_engine::{DomDiffer, NormalizeOptions, Normalizer, SelectiveSerializer};
use selser_markup::{parse, MarkupSerializer};

fn page(sections: usize) -> String {
    let mut source = String::new();
    for i in 0..sections {
        source.push_str(&format!(
            "<h2>Section {i}</h2>\n<p>Text with a [http://example.org/{i}|link] and {{{{tpl|{i}}}}}.</p>\n<ul>\n<li>one</li>\n<li>two &amp; three</li>\n</ul>\n"
        ));
    }
    source
}

fn diff_unchanged_page(c: &mut Criterion) {
    let source = page(50);
    let old = parse(&source).unwrap();
    let new = old.clone();
    let config = SelserConfig::default();

    c.bench_function("diff_unchanged_page", |b| {
        b.iter(|| DomDiffer::new(&config).diff(black_box(&old), black_box(&new)))
    });
}

fn selser_single_edit(c: &mut Criterion) {
    let source = page(50);
    let old = parse(&source).unwrap();
    let mut new = old.clone();
    let target = new
        .descendants(new.root())
        .filter(|&id| new.text(id) == Some("one"))
        .nth(25)
        .unwrap();
    new.set_text(target, "uno");

    let config = SelserConfig::default();
    let serializer = MarkupSerializer::default();

    c.bench_function("selser_single_edit", |b| {
        b.iter(|| {
            let result = DomDiffer::new(&config).diff(black_box(&old), black_box(&new));
            SelectiveSerializer::new(&serializer, &config).serialize(&new, &result, &source)
        })
    });
}

fn normalize_page(c: &mut Criterion) {
    let source = page(50);
    let tree = parse(&source).unwrap();
    let config = SelserConfig::default();
    let normalizer = Normalizer::new(&config, NormalizeOptions::default()).unwrap();

    c.bench_function("normalize_page", |b| {
        b.iter(|| normalizer.normalize(black_box(&tree), tree.root()))
    });
}

criterion_group!(benches, diff_unchanged_page, selser_single_edit, normalize_page);
criterion_main!(benches);
