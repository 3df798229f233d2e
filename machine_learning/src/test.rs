#![cfg(test)]

use ndarray::{Array1, ArrayD, array};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    arch::{
        DigitClassifier, Model, Sequential,
        layers::Layer,
        loss::CrossEntropy,
    },
    optimization::{Adam, GradientDescent, Optimizer},
};

fn fit<M: Model, O: Optimizer>(
    model: &mut M,
    params: &mut [f32],
    optimizer: &mut O,
    x: &ArrayD<f32>,
    y: &Array1<i64>,
    steps: usize,
) -> (f32, f32) {
    let mut grad = vec![0.0; model.size()];
    let mut first = None;
    let mut last = 0.0;

    for _ in 0..steps {
        let stats = model
            .train_step(params, &mut grad, &CrossEntropy, optimizer, x.clone(), y.view())
            .unwrap();
        first.get_or_insert(stats.loss());
        last = stats.loss();
    }

    (first.unwrap_or(last), last)
}

#[test]
fn test_ml_and2_gate_convergence() {
    let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn();
    let y = array![0, 0, 0, 1];

    // AND is linearly separable, so a single affine layer has no dead units to get stuck on.
    let mut model = Sequential::new([Layer::dense((2, 2))]);
    let mut params = vec![0.0; model.size()];
    let mut optimizer = Adam::with_defaults(model.size(), 0.1);

    let (first, last) = fit(&mut model, &mut params, &mut optimizer, &x, &y, 300);
    assert!(last < first, "loss went from {first} to {last}");

    model.set_training(false);
    let logits = model.forward(&params, x).unwrap();
    assert_eq!(crate::metrics::accuracy(logits.view(), y.view()), 1.0);
}

#[test]
fn test_relu_network_reduces_loss() {
    let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]].into_dyn();
    let y = array![0, 0, 0, 1];

    let mut model = Sequential::new([Layer::dense((2, 4)), Layer::relu(), Layer::dense((4, 2))]);
    let mut params = model.init_params(&mut StdRng::seed_from_u64(42)).unwrap();
    let mut optimizer = Adam::with_defaults(model.size(), 0.05);

    let (first, last) = fit(&mut model, &mut params, &mut optimizer, &x, &y, 300);
    assert!(last < first, "loss went from {first} to {last}");
}

#[test]
fn test_gradient_descent_reduces_loss() {
    let x = array![[1.0, -1.0], [-1.0, 1.0]].into_dyn();
    let y = array![0, 1];

    let mut model = Sequential::new([Layer::dense((2, 2))]);
    let mut params = vec![0.0; model.size()];
    let mut optimizer = GradientDescent::new(0.5);

    let (first, last) = fit(&mut model, &mut params, &mut optimizer, &x, &y, 50);
    assert!(last < first * 0.5, "loss went from {first} to {last}");
}

#[test]
fn test_classifier_overfits_tiny_batch() {
    let x = ArrayD::from_shape_fn(vec![2, 1, 28, 28], |ix| {
        if ix[0] == 0 { (ix[2] as f32 / 27.0) - 0.5 } else { (ix[3] as f32 / 27.0) - 0.5 }
    });
    let y = array![3, 7];

    let mut model = DigitClassifier::new(0);
    let mut params = model.init_params(&mut StdRng::seed_from_u64(1)).unwrap();
    let mut optimizer = Adam::with_defaults(model.size(), 1e-3);

    // Dropout off so the loss trajectory depends only on the parameters.
    model.set_training(false);
    let (first, last) = fit(&mut model, &mut params, &mut optimizer, &x, &y, 10);
    assert!(last < first, "loss went from {first} to {last}");
}
