use rand::{rngs::StdRng, SeedableRng};
use serde_json::json;
use vecload_harness::generator::{generate_batch, generate_vector, generate_vector_with, plan_batches, BatchPlan};

#[test]
fn test_plan_batches_last_batch_is_partial() {
    // 250 vectors in batches of 100 → 100, 100, 50
    let plans = plan_batches(250, 100);
    assert_eq!(
        plans,
        vec![
            BatchPlan { start_id: 0, count: 100 },
            BatchPlan { start_id: 100, count: 100 },
            BatchPlan { start_id: 200, count: 50 },
        ]
    );
}

#[test]
fn test_plan_batches_exact_multiple_and_edges() {
    let plans = plan_batches(10_000, 100);
    assert_eq!(plans.len(), 100);
    assert!(plans.iter().all(|p| p.count == 100));
    assert_eq!(plans.iter().map(|p| p.count as u64).sum::<u64>(), 10_000);

    assert!(plan_batches(0, 100).is_empty());
    assert!(plan_batches(10, 0).is_empty());
    assert_eq!(plan_batches(1, 100), vec![BatchPlan { start_id: 0, count: 1 }]);
}

#[test]
fn test_generate_vector_dimension_and_range() {
    let v = generate_vector(1024);
    assert_eq!(v.len(), 1024);
    assert!(v.iter().all(|x| (-1.0..1.0).contains(x)), "value outside [-1, 1)");

    assert!(generate_vector(0).is_empty());
}

#[test]
fn test_generate_vector_with_seed_is_deterministic_and_varied() {
    let a = generate_vector_with(&mut StdRng::seed_from_u64(7), 64);
    let b = generate_vector_with(&mut StdRng::seed_from_u64(7), 64);
    assert_eq!(a, b);

    // Two successive draws from one RNG must differ.
    let mut rng = StdRng::seed_from_u64(7);
    let first = generate_vector_with(&mut rng, 64);
    let second = generate_vector_with(&mut rng, 64);
    assert_ne!(first, second);
}

#[test]
fn test_generate_batch_ids_and_metadata() {
    let batch = generate_batch(200, 50, 8, 100);
    assert_eq!(batch.len(), 50);
    assert_eq!(batch[0].id, "vec-200");
    assert_eq!(batch[49].id, "vec-249");
    for v in &batch {
        assert_eq!(v.values.len(), 8);
        assert_eq!(v.metadata.get("batch_id"), Some(&json!(2)));
    }
}

#[test]
fn test_materialize_matches_plan() {
    let plan = BatchPlan { start_id: 300, count: 3 };
    let vectors = plan.materialize(4, 100);
    let ids: Vec<&str> = vectors.iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, ["vec-300", "vec-301", "vec-302"]);
    assert!(vectors.iter().all(|v| v.values.len() == 4));
}
