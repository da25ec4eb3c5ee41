use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use indexmap::IndexMap;
use num_bigint::BigInt;
use twine::bridge::{Target, to_obj, to_value};
use twine::object::{Key, Value};
use twine::script::Obj;

struct Corpus {
    name: &'static str,
    value: Value,
}

fn build_word_list(len: usize) -> Value {
    Value::list(
        (0..len)
            .map(|i| {
                if i % 7 == 0 {
                    Value::from(format!("word {i}"))
                } else {
                    Value::from(format!("w{i}"))
                }
            })
            .collect(),
    )
}

fn build_nested_dict(len: usize) -> Value {
    let mut map = IndexMap::with_capacity(len);
    for i in 0..len {
        let inner = Value::list(vec![Value::from(i as i64), Value::from(i as f64 / 4.0)]);
        map.insert(Key::Str(format!("key_{i}").into()), inner);
    }
    Value::dict(map)
}

fn build_big_ints(len: usize) -> Value {
    let base = BigInt::from(3).pow(200);
    Value::list((0..len).map(|i| Value::Int(&base + i)).collect())
}

fn build_corpora() -> Vec<Corpus> {
    vec![
        Corpus {
            name: "word_list_10k",
            value: build_word_list(10_000),
        },
        Corpus {
            name: "nested_dict_2k",
            value: build_nested_dict(2_000),
        },
        Corpus {
            name: "big_ints_1k",
            value: build_big_ints(1_000),
        },
    ]
}

fn bench_to_obj(c: &mut Criterion) {
    let corpora = build_corpora();
    let mut group = c.benchmark_group("convert/to_obj");

    for corpus in &corpora {
        group.bench_with_input(
            BenchmarkId::from_parameter(corpus.name),
            &corpus.value,
            |b, value| {
                b.iter(|| {
                    let obj = to_obj(black_box(value)).unwrap();
                    black_box(obj);
                });
            },
        );
    }

    group.finish();
}

fn bench_to_value(c: &mut Criterion) {
    let corpora = build_corpora();
    let mut group = c.benchmark_group("convert/to_value");

    for corpus in &corpora {
        let text = to_obj(&corpus.value).unwrap().to_string();
        group.throughput(Throughput::Bytes(text.len() as u64));
        let target = if corpus.name.starts_with("nested_dict") {
            Target::Dict
        } else {
            Target::List
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(corpus.name),
            &text,
            |b, text| {
                b.iter(|| {
                    // A fresh object each round so the list parse is measured.
                    let obj = Obj::new(black_box(text.as_str()));
                    black_box(to_value(&obj, target).unwrap());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_to_obj, bench_to_value);
criterion_main!(benches);
