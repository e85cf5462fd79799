//! Contract tests for the factorized circuit engine.

use burn::tensor::{Bool, Tensor};
use molpc_circuits::{CircuitArgs, CircuitEngine, Evidence, FactorizedCircuit};
use molpc_core::backend::{init_cpu_device, CpuBackend};
use molpc_core::tensor_ops::{from_host_f32, to_host_f32};
use molpc_core::{CircuitStructure, LeafFamily, RngKey};

type TestBackend = CpuBackend;

const NUM_VAR: usize = 4;
const NUM_CLASSES: usize = 3;

fn engine(family: LeafFamily, num_dims: usize) -> FactorizedCircuit<TestBackend> {
    let args = CircuitArgs::new(
        NUM_VAR,
        num_dims,
        NUM_CLASSES,
        family,
        CircuitStructure::default().with_seed(11),
    );
    FactorizedCircuit::new(args, &init_cpu_device()).unwrap()
}

fn mask(values: Vec<bool>, batch: usize) -> Tensor<TestBackend, 2, Bool> {
    Tensor::from_data(
        burn::tensor::TensorData::new(values, [batch, NUM_VAR]),
        &init_cpu_device(),
    )
}

fn discrete_values(labels: &[f32], batch: usize) -> Tensor<TestBackend, 3> {
    from_host_f32(labels.to_vec(), [batch, NUM_VAR, 1], &init_cpu_device())
}

fn families() -> Vec<(LeafFamily, usize)> {
    vec![
        (LeafFamily::Categorical { categories: 3 }, 1),
        (LeafFamily::Binomial { trials: 2 }, 1),
        (
            LeafFamily::Normal {
                min_var: 1e-3,
                max_var: 1e-1,
            },
            3,
        ),
    ]
}

#[test]
fn test_all_marginalized_scores_zero() {
    let device = init_cpu_device();
    for (family, dims) in families() {
        let circuit = engine(family, dims);
        let values = Tensor::<TestBackend, 3>::random(
            [5, NUM_VAR, dims],
            burn::tensor::Distribution::Uniform(0.0, 2.0),
            &device,
        )
        .round();
        let ll = circuit
            .log_likelihood(values, mask(vec![true; 5 * NUM_VAR], 5))
            .unwrap();
        assert_eq!(ll.dims(), [5, NUM_CLASSES]);
        for v in to_host_f32(ll).unwrap() {
            assert_eq!(v, 0.0, "{family:?}");
        }
    }
}

#[test]
fn test_full_evidence_matches_leaf_sum() {
    let circuit = engine(LeafFamily::Categorical { categories: 3 }, 1);
    let labels = [0.0, 2.0, 1.0, 1.0, 2.0, 2.0, 0.0, 1.0];
    let ll = circuit
        .log_likelihood(discrete_values(&labels, 2), mask(vec![false; 2 * NUM_VAR], 2))
        .unwrap();
    let ll = to_host_f32(ll).unwrap();

    // table is [C, V, K] row-major
    let table = to_host_f32(circuit.log_prob_table().unwrap()).unwrap();
    for b in 0..2 {
        for c in 0..NUM_CLASSES {
            let expected: f32 = (0..NUM_VAR)
                .map(|v| {
                    let k = labels[b * NUM_VAR + v] as usize;
                    table[(c * NUM_VAR + v) * 3 + k]
                })
                .sum();
            assert!((ll[b * NUM_CLASSES + c] - expected).abs() < 1e-5);
        }
    }
}

#[test]
fn test_partial_marginal_drops_terms() {
    let circuit = engine(LeafFamily::Binomial { trials: 2 }, 1);
    let labels = [0.0, 2.0, 1.0, 1.0];
    let marginalized = vec![false, true, false, true];
    let ll = to_host_f32(
        circuit
            .log_likelihood(discrete_values(&labels, 1), mask(marginalized, 1))
            .unwrap(),
    )
    .unwrap();

    let table = to_host_f32(circuit.log_prob_table().unwrap()).unwrap();
    for c in 0..NUM_CLASSES {
        let expected = table[(c * NUM_VAR) * 3] + table[(c * NUM_VAR + 2) * 3 + 1];
        assert!((ll[c] - expected).abs() < 1e-5);
    }
}

#[test]
fn test_normal_score_matches_direct_density() {
    let circuit = engine(
        LeafFamily::Normal {
            min_var: 1e-3,
            max_var: 1e-1,
        },
        3,
    );
    let device = init_cpu_device();
    let x: Vec<f32> = (0..NUM_VAR * 3).map(|i| (i % 4) as f32 * 0.3).collect();
    let values = from_host_f32::<TestBackend, 3>(x.clone(), [1, NUM_VAR, 3], &device);
    let ll = to_host_f32(
        circuit
            .log_likelihood(values, mask(vec![false; NUM_VAR], 1))
            .unwrap(),
    )
    .unwrap();

    let (mean, var) = circuit.normal_params().unwrap();
    let (mean, var) = (to_host_f32(mean).unwrap(), to_host_f32(var).unwrap());
    for c in 0..NUM_CLASSES {
        let expected: f32 = (0..NUM_VAR * 3)
            .map(|i| {
                let (m, s) = (mean[c * NUM_VAR * 3 + i], var[c * NUM_VAR * 3 + i]);
                -0.5 * ((x[i] - m).powi(2) / s + (2.0 * std::f32::consts::PI * s).ln())
            })
            .sum();
        assert!(
            (ll[c] - expected).abs() < 1e-2 * expected.abs().max(1.0),
            "component {c}: {} vs {expected}",
            ll[c]
        );
    }
}

#[test]
fn test_score_selects_requested_components() {
    let circuit = engine(LeafFamily::Categorical { categories: 3 }, 1);
    let labels = [0.0, 1.0, 2.0, 0.0];
    let all = to_host_f32(
        circuit
            .log_likelihood(discrete_values(&labels, 1), mask(vec![false; NUM_VAR], 1))
            .unwrap(),
    )
    .unwrap();
    let picked = to_host_f32(
        circuit
            .score(discrete_values(&labels, 1), &[2, 0], mask(vec![false; NUM_VAR], 1))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(picked, vec![all[2], all[0]]);
    assert!(circuit
        .score(discrete_values(&labels, 1), &[3], mask(vec![false; NUM_VAR], 1))
        .is_err());
}

#[test]
fn test_wrong_shapes_rejected() {
    let circuit = engine(LeafFamily::Categorical { categories: 3 }, 1);
    let device = init_cpu_device();
    let values = Tensor::<TestBackend, 3>::zeros([2, NUM_VAR + 1, 1], &device);
    let marginalized = Tensor::<TestBackend, 2>::zeros([2, NUM_VAR + 1], &device).greater_elem(0.5);
    assert!(circuit.log_likelihood(values, marginalized).is_err());
}

#[test]
fn test_sample_copies_evidence_through() {
    for (family, dims) in families() {
        let circuit = engine(family, dims);
        let device = init_cpu_device();
        let batch = 6;
        let values = Tensor::<TestBackend, 3>::ones([batch, NUM_VAR, dims], &device);
        // observe variables 0 and 3 only
        let marginalized = mask(
            (0..batch * NUM_VAR).map(|i| matches!(i % NUM_VAR, 1 | 2)).collect(),
            batch,
        );
        let evidence = Evidence::new(values, marginalized);
        let mut rng = RngKey::new(4).into_rng();
        let samples = circuit
            .sample(&[0, 1, 2, 0, 1, 2], Some(&evidence), &mut rng)
            .unwrap();
        assert_eq!(samples.dims(), [batch, NUM_VAR, dims]);

        let samples = to_host_f32(samples).unwrap();
        for b in 0..batch {
            for v in [0, 3] {
                for d in 0..dims {
                    assert_eq!(samples[(b * NUM_VAR + v) * dims + d], 1.0, "{family:?}");
                }
            }
        }
    }
}

#[test]
fn test_discrete_samples_in_support() {
    let circuit = engine(LeafFamily::Binomial { trials: 2 }, 1);
    let mut rng = RngKey::new(8).into_rng();
    let components: Vec<usize> = (0..200).map(|i| i % NUM_CLASSES).collect();
    let samples = to_host_f32(circuit.sample(&components, None, &mut rng).unwrap()).unwrap();
    assert!(samples.iter().all(|&s| s == 0.0 || s == 1.0 || s == 2.0));
}

#[test]
fn test_peaked_logits_sample_deterministically() {
    let device = init_cpu_device();
    let args = CircuitArgs::new(
        NUM_VAR,
        1,
        2,
        LeafFamily::Categorical { categories: 3 },
        CircuitStructure::default(),
    );
    // component 0 puts all mass on category 2, component 1 on category 0
    let mut logits = vec![0.0f32; 2 * NUM_VAR * 3];
    for v in 0..NUM_VAR {
        logits[v * 3 + 2] = 50.0;
        logits[(NUM_VAR + v) * 3] = 50.0;
    }
    let logits = from_host_f32::<TestBackend, 3>(logits, [2, NUM_VAR, 3], &device);
    let circuit = FactorizedCircuit::from_categorical_logits(args, logits).unwrap();

    let mut rng = RngKey::new(0).into_rng();
    let samples = to_host_f32(circuit.sample(&[0, 1], None, &mut rng).unwrap()).unwrap();
    assert_eq!(samples, vec![2.0, 2.0, 2.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_invalid_component_rejected() {
    let circuit = engine(LeafFamily::Categorical { categories: 3 }, 1);
    let mut rng = RngKey::new(0).into_rng();
    assert!(circuit.sample(&[0, NUM_CLASSES], None, &mut rng).is_err());
}

#[test]
fn test_zero_variables_score_zero() {
    let device = init_cpu_device();
    let args = CircuitArgs::new(
        0,
        1,
        NUM_CLASSES,
        LeafFamily::Categorical { categories: 3 },
        CircuitStructure::default(),
    );
    let circuit = FactorizedCircuit::<TestBackend>::new(args, &device).unwrap();
    let values = Tensor::<TestBackend, 3>::zeros([2, 0, 1], &device);
    let marginalized = Tensor::<TestBackend, 2>::zeros([2, 0], &device).greater_elem(0.5);
    let ll = to_host_f32(circuit.log_likelihood(values, marginalized).unwrap()).unwrap();
    assert_eq!(ll, vec![0.0; 2 * NUM_CLASSES]);

    let mut rng = RngKey::new(0).into_rng();
    assert_eq!(circuit.sample(&[0, 1], None, &mut rng).unwrap().dims(), [2, 0, 1]);
}
