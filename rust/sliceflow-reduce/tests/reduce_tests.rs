use std::sync::Arc;

use itertools::Itertools;
use sliceflow_common::error::{Error, ErrorKind};
use sliceflow_frame::{Frame, Schema, Sorter};
use sliceflow_reduce::{
    Context, ReduceConfig, Reducer, SliceRef, reduce, reduce_fn, reduce_with_config,
};
use sliceflow_testkit::{
    LocalExecutor, MemorySlice,
    data_gen::{fold_by_key, random_pairs, random_words},
};

fn sum() -> Arc<dyn Reducer> {
    reduce_fn(|a: i64, b: i64| a + b)
}

/// Checks the per-shard invariants and returns all rows, sorted by key.
fn check_shards<K, V>(shards: &[Frame]) -> Vec<(K, V)>
where
    K: sliceflow_frame::KeyValue + Ord,
    V: sliceflow_frame::ColumnValue,
{
    let mut all = Vec::new();
    for frame in shards {
        let sorter = Sorter::for_schema(frame.schema(), 0).unwrap();
        assert!(sorter.is_sorted(frame));
        let pairs = frame.to_pairs::<K, V>();
        assert!(pairs.iter().tuple_windows().all(|(a, b)| a.0 < b.0));
        all.extend(pairs);
    }
    all.sort_by(|a, b| a.0.cmp(&b.0));
    assert!(all.iter().tuple_windows().all(|(a, b)| a.0 != b.0));
    all
}

#[test]
fn test_reduce_example() {
    let source = MemorySlice::new(vec![
        Frame::from_pairs(vec![(1i64, 3i64), (2, 1), (1, 4), (1, 2)]),
        Frame::from_pairs(vec![(1i64, 5i64), (3, 7)]),
    ])
    .unwrap();
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let shards = LocalExecutor::new().run(&Context::new(), &reduced).unwrap();
    assert_eq!(shards.len(), 2);
    assert_eq!(check_shards::<i64, i64>(&shards), vec![(1, 14), (2, 1), (3, 7)]);
}

#[test]
fn test_reduce_matches_reference() {
    let pairs = random_pairs(11, 20_000, 500);
    let expected = fold_by_key(pairs.clone(), |a, b| a + b);
    for num_shards in [1, 4, 7] {
        let source = MemorySlice::from_pairs(num_shards, pairs.clone());
        let reduced = reduce(Arc::new(source), sum()).unwrap();
        let shards = LocalExecutor::new().run(&Context::new(), &reduced).unwrap();
        assert_eq!(shards.len(), num_shards);
        assert_eq!(check_shards::<i64, i64>(&shards), expected);
    }
}

#[test]
fn test_reduce_word_count() {
    let words = random_words(5, 10_000, 300);
    let expected = fold_by_key(words.clone(), |a, b| a + b);
    let source = MemorySlice::from_pairs(5, words);
    let reduced = reduce(Arc::new(source), reduce_fn(|a: u64, b: u64| a + b)).unwrap();
    let shards = LocalExecutor::new().run(&Context::new(), &reduced).unwrap();
    assert_eq!(check_shards::<String, u64>(&shards), expected);
}

#[test]
fn test_reduce_min_max() {
    let pairs = random_pairs(23, 5_000, 64);
    let cases = [
        (reduce_fn(|a: i64, b: i64| a.min(b)), i64::min as fn(i64, i64) -> i64),
        (reduce_fn(|a: i64, b: i64| a.max(b)), i64::max as fn(i64, i64) -> i64),
    ];
    for (reducer, f) in cases {
        let source = MemorySlice::from_pairs(3, pairs.clone());
        let reduced = reduce(Arc::new(source), reducer).unwrap();
        let all = LocalExecutor::new()
            .collect(&Context::new(), &reduced)
            .unwrap()
            .to_pairs::<i64, i64>()
            .into_iter()
            .sorted()
            .collect_vec();
        assert_eq!(all, fold_by_key(pairs.clone(), f));
    }
}

#[test]
fn test_streaming_batch_sizes() {
    let pairs = random_pairs(3, 3_000, 200);
    let expected = fold_by_key(pairs.clone(), |a, b| a + b);
    for (chunk_size, read_limit, batch) in [(1, 1, 1), (128, 7, 128), (3, 1000, 5000)] {
        let source = MemorySlice::from_pairs(4, pairs.clone()).with_read_limit(read_limit);
        let config = ReduceConfig::default().with_chunk_size(chunk_size);
        let reduced = reduce_with_config(Arc::new(source), sum(), config).unwrap();
        let shards = LocalExecutor::new()
            .with_chunk_size(batch)
            .with_read_limit(read_limit)
            .run(&Context::new(), &reduced)
            .unwrap();
        assert_eq!(
            check_shards::<i64, i64>(&shards),
            expected,
            "chunk {chunk_size} limit {read_limit} batch {batch}"
        );
    }
}

#[test]
fn test_empty_input() {
    let source = MemorySlice::from_pairs(3, Vec::<(i64, i64)>::new());
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let shards = LocalExecutor::new().run(&Context::new(), &reduced).unwrap();
    assert_eq!(shards.len(), 3);
    assert!(shards.iter().all(Frame::is_empty));
}

#[test]
fn test_upstream_error_propagates() {
    let failure = Error::upstream("source", std::io::Error::other("disk on fire"));
    let source = MemorySlice::from_pairs(3, random_pairs(1, 300, 20))
        .with_failure(1, failure.clone());
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let err = LocalExecutor::new()
        .run(&Context::new(), &reduced)
        .unwrap_err();
    assert!(err.is_same(&failure));
}

#[test]
fn test_cancelled_context() {
    let source = MemorySlice::from_pairs(2, random_pairs(1, 300, 20));
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let ctx = Context::new();
    ctx.cancel();
    let err = LocalExecutor::new().run(&ctx, &reduced).unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn test_cancelled_mid_stream() {
    let source = MemorySlice::from_pairs(2, random_pairs(1, 300, 20))
        .with_read_limit(10)
        .with_cancel_after(1, 3);
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let ctx = Context::new();
    let err = LocalExecutor::new().run(&ctx, &reduced).unwrap_err();
    assert!(err.is_cancelled());
    assert!(ctx.is_cancelled());

    // The same graph evaluates fully once nothing cancels it.
    let source = MemorySlice::from_pairs(2, random_pairs(1, 300, 20)).with_read_limit(10);
    let reduced = reduce(Arc::new(source), sum()).unwrap();
    let shards = LocalExecutor::new().run(&Context::new(), &reduced).unwrap();
    assert_eq!(
        check_shards::<i64, i64>(&shards),
        fold_by_key(random_pairs(1, 300, 20), |a, b| a + b)
    );
}

#[test]
fn test_combiner_key_limit() {
    let source = MemorySlice::from_pairs(1, (0..100i64).map(|k| (k, 1i64)).collect());
    let config = ReduceConfig::default().with_max_combined_keys(10);
    let reduced = reduce_with_config(Arc::new(source), sum(), config).unwrap();
    let err = LocalExecutor::new()
        .run(&Context::new(), &reduced)
        .unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::ResourceExhausted { limit: 10, .. }
    ));
}

#[test]
fn test_construction_errors() {
    let pairs: SliceRef = Arc::new(MemorySlice::from_pairs(1, vec![(1i64, 1i64)]));
    let err = reduce(pairs, reduce_fn(|a: f64, b: f64| a + b)).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Type { .. }));

    let triple: SliceRef = Arc::new(
        MemorySlice::new(vec![Frame::new(vec![
            Box::new(sliceflow_frame::TypedColumn::from_vec(vec![1i64])),
            Box::new(sliceflow_frame::TypedColumn::from_vec(vec![1i64])),
            Box::new(sliceflow_frame::TypedColumn::from_vec(vec![1i64])),
        ])])
        .unwrap(),
    );
    assert_eq!(triple.schema().len(), 3);
    let err = reduce(triple, sum()).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Type { .. }));

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }
    let points: SliceRef = Arc::new(MemorySlice::from_pairs(
        1,
        vec![(Point { x: 1, y: 2 }, 1i64)],
    ));
    assert_eq!(points.schema(), &Schema::pair::<Point, i64>());
    let err = reduce(points, sum()).err().unwrap();
    assert!(matches!(err.kind(), ErrorKind::Type { .. }));
}
