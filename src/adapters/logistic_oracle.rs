//! Logistic-regression direction classifier.
//!
//! Each sample is a trailing window of bars summarised into five features:
//!
//! | feature        | definition                                   |
//! |----------------|----------------------------------------------|
//! | `return_mean`  | mean of close-to-close returns               |
//! | `return_std`   | population std of those returns              |
//! | `volume_change`| mean relative volume change                  |
//! | `sma_gap`      | last close / window mean close - 1           |
//! | `rsi`          | RSI over all price changes in the window     |
//!
//! Labels come from the forward `horizon` return: above `label_threshold`
//! is Buy, below its negative is Sell, anything in between is neutral and
//! left out of the fit. Samples are stacked into a feature matrix and split
//! 80/20 in time order; the model is fitted on the first part by batch
//! gradient descent from zero weights and scored on the second. No randomness is involved, so training is
//! reproducible.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, array, s};
use tracing::debug;

use crate::domain::error::AitraderError;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::ohlcv::Bar;
use crate::domain::oracle::{ClassCounts, TrainingSummary};
use crate::domain::signal::Signal;
use crate::ports::oracle_port::SignalOracle;

const FEATURES: usize = 5;
const MIN_SAMPLES: usize = 10;
/// Probabilities within this distance of 0.5 vote Hold.
const HOLD_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticParams {
    pub window: usize,
    pub horizon: usize,
    pub label_threshold: f64,
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            window: 11,
            horizon: 5,
            label_threshold: 0.01,
            epochs: 200,
            learning_rate: 0.1,
        }
    }
}

/// Feature rows in time order with their Buy / Sell labels.
struct Samples {
    features: Array2<f64>,
    labels: Vec<Signal>,
}

#[derive(Debug, Clone)]
struct Model {
    mean: Array1<f64>,
    std: Array1<f64>,
    weights: Array1<f64>,
    bias: f64,
}

impl Model {
    fn probability(&self, features: ArrayView1<f64>) -> f64 {
        let z = (&features - &self.mean) / &self.std;
        sigmoid(z.dot(&self.weights) + self.bias)
    }

    fn classify(&self, features: ArrayView1<f64>) -> Signal {
        let p = self.probability(features);
        if p >= 0.5 + HOLD_BAND {
            Signal::Buy
        } else if p <= 0.5 - HOLD_BAND {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn accuracy(&self, features: ArrayView2<f64>, labels: &[Signal]) -> f64 {
        let correct = features
            .rows()
            .into_iter()
            .zip(labels)
            .filter(|(row, label)| self.classify(*row) == **label)
            .count();
        correct as f64 / labels.len().max(1) as f64
    }
}

pub struct LogisticOracle {
    params: LogisticParams,
    model: Option<Model>,
}

impl LogisticOracle {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    fn samples(&self, history: &[Bar]) -> (Samples, ClassCounts) {
        let LogisticParams {
            window,
            horizon,
            label_threshold,
            ..
        } = self.params;
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        let mut counts = ClassCounts::default();
        if window >= 2 && history.len() >= window + horizon {
            for end in (window - 1)..(history.len() - horizon) {
                let forward = history[end + horizon].close / history[end].close - 1.0;
                let label = if forward > label_threshold {
                    Signal::Buy
                } else if forward < -label_threshold {
                    Signal::Sell
                } else {
                    Signal::Hold
                };
                counts.record(label);
                if label == Signal::Hold {
                    continue;
                }
                if let Some(features) = window_features(&history[end + 1 - window..=end]) {
                    rows.push(features);
                    labels.push(label);
                }
            }
        }
        let features = Array2::from_shape_fn((rows.len(), FEATURES), |(i, k)| rows[i][k]);
        (Samples { features, labels }, counts)
    }

    fn fit(&self, x: ArrayView2<f64>, labels: &[Signal]) -> Result<Model, AitraderError> {
        let mean = x.mean_axis(Axis(0)).ok_or_else(|| AitraderError::Oracle {
            reason: "no training rows".into(),
        })?;
        // constant features stay centred but unscaled
        let std = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let z = (&x - &mean) / &std;
        let y: Array1<f64> = labels
            .iter()
            .map(|l| if *l == Signal::Buy { 1.0 } else { 0.0 })
            .collect();

        let n = z.nrows() as f64;
        let step = self.params.learning_rate / n;
        let mut weights = Array1::<f64>::zeros(FEATURES);
        let mut bias = 0.0;
        for _ in 0..self.params.epochs {
            let p = (z.dot(&weights) + bias).mapv(sigmoid);
            let err = &p - &y;
            weights = weights - z.t().dot(&err) * step;
            bias -= step * err.sum();
        }

        Ok(Model {
            mean,
            std,
            weights,
            bias,
        })
    }
}

impl SignalOracle for LogisticOracle {
    fn name(&self) -> &str {
        "logistic"
    }

    fn train(&mut self, history: &[Bar]) -> Result<TrainingSummary, AitraderError> {
        let (samples, class_counts) = self.samples(history);
        let total = samples.labels.len();
        if total < MIN_SAMPLES {
            return Err(AitraderError::Oracle {
                reason: format!(
                    "{} labelled samples from {} bars, need at least {}",
                    total,
                    history.len(),
                    MIN_SAMPLES
                ),
            });
        }

        let split = total * 4 / 5;
        let train_x = samples.features.slice(s![..split, ..]);
        let test_x = samples.features.slice(s![split.., ..]);
        let (train_y, test_y) = samples.labels.split_at(split);
        let model = self.fit(train_x, train_y)?;
        let accuracy = if test_y.is_empty() {
            model.accuracy(train_x, train_y)
        } else {
            model.accuracy(test_x, test_y)
        };

        debug!(
            train = train_y.len(),
            test = test_y.len(),
            bias = model.bias,
            "logistic oracle fitted"
        );
        self.model = Some(model);
        Ok(TrainingSummary {
            accuracy,
            sample_count: total,
            class_counts,
        })
    }

    fn predict(&self, window: &[Bar]) -> Result<Signal, AitraderError> {
        let model = self.model.as_ref().ok_or_else(|| AitraderError::Oracle {
            reason: "logistic oracle is not trained".into(),
        })?;
        let features = window_features(window).ok_or_else(|| AitraderError::Oracle {
            reason: format!("window of {} bars is too short", window.len()),
        })?;
        Ok(model.classify(features.view()))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn window_features(window: &[Bar]) -> Option<Array1<f64>> {
    if window.len() < 2 {
        return None;
    }
    let closes: Array1<f64> = window.iter().map(|b| b.close).collect();
    let returns = &closes.slice(s![1..]) / &closes.slice(s![..-1]) - 1.0;
    let return_mean = returns.mean()?;
    let return_std = returns.std(0.0);

    let volume_change = window
        .windows(2)
        .map(|w| {
            if w[0].volume > 0.0 {
                w[1].volume / w[0].volume - 1.0
            } else {
                0.0
            }
        })
        .sum::<f64>()
        / returns.len() as f64;

    let sma_gap = closes[closes.len() - 1] / closes.mean()? - 1.0;
    let rsi = calculate_rsi(closes.as_slice()?, closes.len() - 1).pop().flatten()?;

    Some(array![return_mean, return_std, volume_change, sma_gap, rsi])
}
