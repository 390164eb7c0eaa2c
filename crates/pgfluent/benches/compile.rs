use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgfluent::compile::{compile_insert, number_markers};
use pgfluent::memory::MemoryDriver;
use pgfluent::{Arg, Db, QueryState, SessionConfig, TableDesc, field_value};
use std::sync::OnceLock;

fn wide_table(n: usize) -> &'static TableDesc {
    static NAMES: OnceLock<Vec<&'static str>> = OnceLock::new();
    let names = NAMES.get_or_init(|| {
        (0..128)
            .map(|i| &*Box::leak(format!("col{i}").into_boxed_str()))
            .collect()
    });
    let mut builder = TableDesc::builder("t").column("id", "id", true);
    for name in names.iter().take(n) {
        builder = builder.column(name, name, false);
    }
    Box::leak(Box::new(builder.build()))
}

fn bench_expand_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/expand_list");

    for n in [5, 20, 100, 500] {
        let values: Vec<i64> = (0..n).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| {
                let args = vec![Arg::value("en"), Arg::list(values.iter().copied())];
                black_box(
                    pgfluent::args::expand_markers("lang = ? AND id IN (?)", args)
                        .expect("marker count matches"),
                );
            });
        });
    }

    group.finish();
}

fn bench_number_markers(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/number_markers");

    for n in [1, 10, 100] {
        let sql = format!(
            "SELECT * FROM t WHERE note <> 'why?' AND {}",
            vec!["c = ?"; n].join(" AND ")
        );
        group.bench_with_input(BenchmarkId::from_parameter(n), &sql, |b, sql| {
            b.iter(|| black_box(number_markers(sql)));
        });
    }

    group.finish();
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/insert");
    let state = QueryState::<()>::new();

    for n in [1, 10, 50] {
        let desc = wide_table(n);
        let mut values = vec![field_value(&0_i64)];
        values.extend((0..n).map(|i| field_value(&(i as i64 + 1))));
        group.bench_with_input(BenchmarkId::from_parameter(n), &values, |b, values| {
            b.iter(|| black_box(compile_insert(&state, desc, values).expect("non-blank record")));
        });
    }

    group.finish();
}

fn bench_session_scan(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let driver = MemoryDriver::new();

    c.bench_function("session/scan_empty", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut db = Db::with_config(&driver, SessionConfig::new().log_statements(false));
                let mut ids: Vec<i64> = Vec::new();
                db.table("users")
                    .where_sql(
                        "counter IN (?) AND lang = ?",
                        pgfluent::args![vec![1_i64, 2, 3], "en"],
                    )
                    .order("counter desc")
                    .limit(10)
                    .pluck("counter", &mut ids)
                    .await
                    .expect("scan");
                black_box(ids);
            });
            driver.reset_log();
        });
    });
}

criterion_group!(
    benches,
    bench_expand_list,
    bench_number_markers,
    bench_insert,
    bench_session_scan
);
criterion_main!(benches);
