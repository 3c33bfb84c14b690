use ndarray::{array, Array2, Array4, ArrayD, ArrayViewD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::builders::{ConvBuilder, DenseBuilder};
use crate::network::{GraphBuilder, QGraph};

const EPS: f32 = 1e-3;

/// Compares `backward` against central differences of `sum(predict(states) * upstream)`.
fn check_gradients<G: QGraph>(graph: &mut G, states: ArrayViewD<f32>, upstream: &Array2<f32>) {
    graph.forward(states.clone()).unwrap();
    let analytic = graph.backward(upstream.view()).unwrap();
    let base = graph.param_set();
    assert_eq!(analytic.len(), base.len());

    let objective = |g: &G| (g.predict(states.clone()).unwrap() * upstream).sum();

    for (p, array) in base.iter().enumerate() {
        assert_eq!(analytic[p].shape(), array.shape());
        for (k, &expected) in analytic[p].iter().enumerate() {
            let mut plus = base.clone().into_inner();
            *plus[p].iter_mut().nth(k).unwrap() += EPS;
            graph.load_params(&plus.into()).unwrap();
            let up = objective(&*graph);

            let mut minus = base.clone().into_inner();
            *minus[p].iter_mut().nth(k).unwrap() -= EPS;
            graph.load_params(&minus.into()).unwrap();
            let down = objective(&*graph);

            let numeric = (up - down) / (2.0 * EPS);
            assert!(
                (numeric - expected).abs() < 1e-2 * (1.0 + expected.abs()),
                "param {} element {}: numeric {} vs analytic {}",
                p,
                k,
                numeric,
                expected
            );
        }
    }
    graph.load_params(&base).unwrap();
}

#[test]
fn test_dense_graph_gradients() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut graph = DenseBuilder::new(3, 1, 2).build(2, 2, &mut rng).unwrap();
    // Keeps every hidden pre-activation well away from the rectifier's kink.
    graph.hidden.as_mut().unwrap().weights = array![[0.5, -0.4], [0.3, 0.2], [-0.2, -0.6]];

    let states = array![[1.0f32, 0.5, 0.25], [0.2, 1.0, 0.8]].into_dyn();
    let upstream = array![[1.0f32, -0.5], [0.25, 2.0]];
    check_gradients(&mut graph, states.view(), &upstream);
}

#[test]
fn test_dense_graph_without_hidden_layers() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut graph = DenseBuilder::new(4, 0, 16).build(3, 2, &mut rng).unwrap();
    assert!(graph.hidden.is_none());
    assert_eq!(graph.param_set().shapes(), vec![vec![4, 3], vec![3]]);

    let states = array![[1.0f32, 0.0, -1.0, 0.5], [0.0, 2.0, 0.0, -0.5]].into_dyn();
    let upstream = array![[1.0f32, 0.0, -1.0], [0.5, 0.5, 0.5]];
    check_gradients(&mut graph, states.view(), &upstream);
}

#[test]
fn test_conv_graph_gradients() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut graph = ConvBuilder::new((2, 3), 2).build(2, 2, &mut rng).unwrap();
    graph.conv.kernels = Array4::from_shape_vec((2, 1, 1, 1), vec![0.8, -0.6]).unwrap();

    // Inputs in [0.5, 1] keep filter 0 positive and filter 1 negative.
    let values: Vec<f32> = (0..12).map(|i| 0.5 + 0.04 * i as f32).collect();
    let states = ArrayD::from_shape_vec(IxDyn(&[2, 1, 2, 3]), values).unwrap();
    let upstream = array![[0.5f32, -1.0], [1.5, 0.25]];
    check_gradients(&mut graph, states.view(), &upstream);
}

#[test]
fn test_backward_without_forward_fails() {
    let mut rng = StdRng::seed_from_u64(6);
    let mut graph = DenseBuilder::new(3, 1, 2).build(2, 2, &mut rng).unwrap();
    let upstream = Array2::<f32>::ones((2, 2));
    assert!(graph.backward(upstream.view()).is_err());
}
