//! Gradient-descent optimizers with per-parameter state keyed by name.

use std::collections::HashMap;

use ndarray::{Array, Dimension};

use crate::config::OptimizerKind;

/// SGD with optional momentum and weight decay.
pub struct Sgd {
    lr: f32,
    momentum: f32,
    weight_decay: f32,
    velocity: HashMap<String, Vec<f32>>,
}

impl Sgd {
    pub fn new(lr: f32, momentum: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            momentum,
            weight_decay,
            velocity: HashMap::new(),
        }
    }

    /// Applies one update to `param` in place.
    ///
    /// # Arguments
    ///
    /// * `name` - Key identifying the parameter's momentum buffer
    /// * `param` - Parameter tensor to update
    /// * `grad` - Gradient of the loss with respect to `param`
    pub fn step<D: Dimension>(
        &mut self,
        name: &str,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
    ) {
        let params = param.as_slice_mut().expect("contiguous");
        let grads = grad.as_slice().expect("contiguous");
        let velocity = self
            .velocity
            .entry(name.to_string())
            .or_insert_with(|| vec![0.0; params.len()]);
        debug_assert_eq!(params.len(), grads.len());

        for ((p, &g), v) in params.iter_mut().zip(grads.iter()).zip(velocity.iter_mut()) {
            let g = g + self.weight_decay * *p;
            *v = self.momentum * *v + g;
            *p -= self.lr * *v;
        }
    }
}

/// Adam with the usual bias-corrected moment estimates.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    state: HashMap<String, AdamState>,
}

struct AdamState {
    m: Vec<f32>,
    v: Vec<f32>,
    t: i32,
}

impl Adam {
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            state: HashMap::new(),
        }
    }

    pub fn step<D: Dimension>(
        &mut self,
        name: &str,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
    ) {
        let params = param.as_slice_mut().expect("contiguous");
        let grads = grad.as_slice().expect("contiguous");
        let state = self.state.entry(name.to_string()).or_insert_with(|| AdamState {
            m: vec![0.0; params.len()],
            v: vec![0.0; params.len()],
            t: 0,
        });
        debug_assert_eq!(params.len(), grads.len());

        state.t += 1;
        let bias1 = 1.0 - self.beta1.powi(state.t);
        let bias2 = 1.0 - self.beta2.powi(state.t);

        for (i, (p, &g)) in params.iter_mut().zip(grads.iter()).enumerate() {
            state.m[i] = self.beta1 * state.m[i] + (1.0 - self.beta1) * g;
            state.v[i] = self.beta2 * state.v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = state.m[i] / bias1;
            let v_hat = state.v[i] / bias2;
            *p -= self.lr * m_hat / (v_hat.sqrt() + self.eps);
        }
    }
}

/// Optimizer selected by configuration.
pub enum Optimizer {
    Sgd(Sgd),
    Adam(Adam),
}

impl Optimizer {
    pub fn new(kind: OptimizerKind, lr: f32) -> Self {
        match kind {
            OptimizerKind::Sgd => Optimizer::Sgd(Sgd::new(lr, 0.0, 0.0)),
            OptimizerKind::Adam => Optimizer::Adam(Adam::new(lr)),
        }
    }

    pub fn step<D: Dimension>(
        &mut self,
        name: &str,
        param: &mut Array<f32, D>,
        grad: &Array<f32, D>,
    ) {
        match self {
            Optimizer::Sgd(opt) => opt.step(name, param, grad),
            Optimizer::Adam(opt) => opt.step(name, param, grad),
        }
    }
}
