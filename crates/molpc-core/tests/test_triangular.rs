//! Round-trip and cardinality checks for the triangular codec.

use molpc_core::backend::{init_cpu_device, CpuBackend};
use molpc_core::tensor_ops::{from_host_f32, to_host_f32};
use molpc_core::TriangularMask;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

type TestBackend = CpuBackend;

/// Random symmetric label matrices with a zero diagonal, row-major.
fn random_symmetric(rng: &mut ChaCha8Rng, batch: usize, n: usize, k: u32) -> Vec<f32> {
    let mut data = vec![0.0f32; batch * n * n];
    for b in 0..batch {
        for i in 0..n {
            for j in 0..i {
                let value = rng.gen_range(0..k) as f32;
                data[b * n * n + i * n + j] = value;
                data[b * n * n + j * n + i] = value;
            }
        }
    }
    data
}

#[test]
fn test_roundtrip_random_symmetric_matrices() {
    let device = init_cpu_device();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for n in 1..8 {
        let mask = TriangularMask::new(n);
        let batch = 5;
        let data = random_symmetric(&mut rng, batch, n, 4);
        let a = from_host_f32::<TestBackend, 3>(data.clone(), [batch, n, n], &device);

        let l = mask.flatten(a).unwrap();
        assert_eq!(l.dims(), [batch, n * (n - 1) / 2]);

        let back = mask.unflatten(l, 0.0).unwrap();
        assert_eq!(to_host_f32(back).unwrap(), data, "round trip failed for n = {n}");
    }
}

#[test]
fn test_unflatten_is_symmetric_with_pad_diagonal() {
    let device = init_cpu_device();
    let n = 5;
    let mask = TriangularMask::new(n);
    let l: Vec<f32> = (0..mask.len()).map(|e| (e % 3 + 1) as f32).collect();
    let tensor = from_host_f32::<TestBackend, 2>(l, [1, mask.len()], &device);

    let a = to_host_f32(mask.unflatten(tensor, 0.0).unwrap()).unwrap();
    for i in 0..n {
        assert_eq!(a[i * n + i], 0.0);
        for j in 0..n {
            assert_eq!(a[i * n + j], a[j * n + i]);
        }
    }
}

#[test]
fn test_flatten_vectors_matches_scalar_flatten() {
    let device = init_cpu_device();
    let n = 4;
    let k = 3;
    let mask = TriangularMask::new(n);
    let data: Vec<f32> = (0..n * n * k).map(|v| v as f32).collect();
    let a = from_host_f32::<TestBackend, 3>(data.clone(), [1, n * n, k], &device)
        .reshape([1, n, n, k]);

    let flat = to_host_f32(mask.flatten_vectors(a).unwrap()).unwrap();
    for (e, &(i, j)) in mask.positions().iter().enumerate() {
        for d in 0..k {
            assert_eq!(flat[e * k + d], data[(i * n + j) * k + d]);
        }
    }
}
