use rand::Rng;
use serde_json::json;
use vecload_common::Vector;

/// One unit of write work: `count` vectors with ids starting at `start_id`.
///
/// Plans are cheap to hold; the vectors themselves are materialised by
/// [`BatchPlan::materialize`] right before the upsert call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub start_id: u64,
    pub count: usize,
}

impl BatchPlan {
    pub fn materialize(&self, dimension: usize, batch_size: usize) -> Vec<Vector> {
        generate_batch(self.start_id, self.count, dimension, batch_size)
    }
}

/// Split `num_vectors` into `ceil(num_vectors / batch_size)` consecutive batches.
/// Every batch is full except possibly the last.
pub fn plan_batches(num_vectors: u64, batch_size: usize) -> Vec<BatchPlan> {
    if batch_size == 0 {
        return Vec::new();
    }
    let size = batch_size as u64;
    let total_batches = num_vectors.div_ceil(size);
    (0..total_batches)
        .map(|batch_num| {
            let start_id = batch_num * size;
            let count = size.min(num_vectors - start_id) as usize;
            BatchPlan { start_id, count }
        })
        .collect()
}

/// `dimension` values drawn uniformly from `[-1, 1)` using the calling thread's RNG.
pub fn generate_vector(dimension: usize) -> Vec<f32> {
    generate_vector_with(&mut rand::thread_rng(), dimension)
}

/// Same as [`generate_vector`] with a caller-supplied RNG. Exposed for deterministic testing.
pub fn generate_vector_with(rng: &mut impl Rng, dimension: usize) -> Vec<f32> {
    (0..dimension).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// `count` vectors with ids `vec-{start_id + i}`, each tagged with
/// `batch_id = start_id / batch_size`.
pub fn generate_batch(start_id: u64, count: usize, dimension: usize, batch_size: usize) -> Vec<Vector> {
    let batch_id = start_id / batch_size.max(1) as u64;
    let mut rng = rand::thread_rng();
    (0..count as u64)
        .map(|i| {
            let mut metadata = serde_json::Map::new();
            metadata.insert("batch_id".to_string(), json!(batch_id));
            Vector {
                id: format!("vec-{}", start_id + i),
                values: generate_vector_with(&mut rng, dimension),
                metadata,
            }
        })
        .collect()
}
