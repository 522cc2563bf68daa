//! Classes shared by the integration tests
//!
//! - `Pair`: one build option, one learnt nosave option
//! - `Node`: object-valued options, parent links, cycles
//! - `Learner`: abstract base with remote methods
//! - `Linear`: derives from `Learner`, covers every option kind

#![allow(dead_code)]

use plearn_core::prelude::*;
use plearn_core::remote::{function1, function2, method0, method1, method2, register_function};
use std::collections::BTreeMap;
use std::sync::Once;

// ============================================================================
// Pair
// ============================================================================

#[derive(Debug, Default)]
pub struct Pair {
    pub first: i32,
    pub second: f64,
    pub builds: usize,
}

impl Declare for Pair {
    fn declare_options(ol: &mut OptionList) {
        declare_option!(ol, Pair, first, OptionFlags::BUILD, "First element");
        declare_option!(
            ol,
            Pair,
            second,
            OptionFlags::LEARNT | OptionFlags::NOSAVE,
            "Second element, recomputed on demand"
        );
    }

    fn build_(&mut self) -> PResult<()> {
        self.builds += 1;
        Ok(())
    }
}

declare_object! {
    class Pair,
    "A pair of numbers",
    "The first element is saved, the second is not."
}

// ============================================================================
// Node
// ============================================================================

#[derive(Debug, Default)]
pub struct Node {
    pub name: String,
    pub next: Option<ObjRef>,
    pub children: Vec<ObjRef>,
    pub peer: Option<ObjRef>,
    pub parent: Option<WeakObjRef>,
}

impl Declare for Node {
    fn declare_options(ol: &mut OptionList) {
        declare_option!(ol, Node, name, OptionFlags::BUILD, "Label");
        declare_option!(ol, Node, next, OptionFlags::BUILD, "Following node");
        declare_option!(ol, Node, children, OptionFlags::BUILD, "Owned nodes");
        declare_option!(
            ol,
            Node,
            peer,
            OptionFlags::BUILD | OptionFlags::NONPARENTABLE | OptionFlags::NONTRAVERSABLE,
            "Node known but not owned"
        );
    }

    fn on_parent(&mut self, parent: &WeakObjRef) {
        self.parent = Some(parent.clone());
    }
}

declare_object! {
    class Node,
    "Graph node",
    ""
}

impl Node {
    pub fn parent_name(&self) -> Option<String> {
        let parent = self.parent.as_ref()?.upgrade()?;
        parent.with(|node: &Node| node.name.clone()).ok()
    }
}

// ============================================================================
// Learner (abstract)
// ============================================================================

#[derive(Debug, Default)]
pub struct Learner {
    pub seed: i64,
    pub verbosity: i32,
    pub stage: i32,
    pub trained: bool,
}

impl Declare for Learner {
    fn declare_options(ol: &mut OptionList) {
        declare_option!(ol, Learner, seed, OptionFlags::BUILD, "Random seed", default_value = "0");
        declare_option!(
            ol,
            Learner,
            verbosity,
            OptionFlags::TUNING,
            "Logging verbosity",
            level = OptionLevel::Advanced
        );
        declare_option!(ol, Learner, stage, OptionFlags::LEARNT, "Training stages done");
        declare_option!(ol, Learner, trained, OptionFlags::LEARNT, "Whether train() ran");
    }

    fn declare_methods(rmm: &mut RemoteMethodMap) {
        rmm.insert(
            "train",
            method0(Learner::train, RemoteMethodDoc::new("Run one training stage")),
        );
        rmm.insert(
            "getStage",
            method0(
                Learner::get_stage,
                RemoteMethodDoc::new("Training stages done").returns("Stage count"),
            ),
        );
    }
}

declare_abstract_object! {
    class Learner,
    "Base of trainable models",
    "Holds the training state shared by every learner."
}

impl Learner {
    fn train(&mut self) -> PResult<()> {
        self.stage += 1;
        self.trained = true;
        Ok(())
    }

    fn get_stage(&mut self) -> PResult<i32> {
        Ok(self.stage)
    }
}

// ============================================================================
// Linear
// ============================================================================

#[derive(Debug, Default)]
pub struct Linear {
    pub base: Learner,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub scale: f64,
    pub norm: f64,
    pub sub: Option<ObjRef>,
    pub table: BTreeMap<String, f64>,
    pub legacy: i32,
    pub cache: Vec<f64>,
}

impl Declare for Linear {
    fn declare_options(ol: &mut OptionList) {
        declare_option!(ol, Linear, weights, OptionFlags::BUILD, "Input weights");
        declare_option!(ol, Linear, bias, OptionFlags::BUILD, "Constant term", default_value = "0");
        declare_option!(
            ol,
            Linear,
            scale,
            OptionFlags::TUNING,
            "Output multiplier",
            level = OptionLevel::Expert
        );
        declare_option!(ol, Linear, norm, OptionFlags::LEARNT, "Squared norm of the weights");
        declare_option!(ol, Linear, sub, OptionFlags::BUILD, "Optional nested model");
        declare_option!(ol, Linear, table, OptionFlags::BUILD, "Named constants");
        declare_option!(
            ol,
            Linear,
            legacy,
            OptionFlags::NOSAVE,
            "Accepted from old files, ignored",
            level = OptionLevel::Deprecated
        );
        declare_option!(
            ol,
            Linear,
            cache,
            OptionFlags::LEARNT | OptionFlags::NOSAVE | OptionFlags::REMOTE_TRANSMIT,
            "Scaled weights"
        );
        Learner::declare_options(ol);
    }

    fn declare_methods(rmm: &mut RemoteMethodMap) {
        rmm.insert(
            "predict",
            method1(
                Linear::predict,
                RemoteMethodDoc::new("Output for one input")
                    .arg("input", "Input vector")
                    .returns("Weighted sum plus bias"),
            ),
        );
        rmm.insert(
            "predict",
            method2(
                Linear::predict_scaled,
                RemoteMethodDoc::new("Output for one input, multiplied")
                    .arg("input", "Input vector")
                    .arg("factor", "Multiplier")
                    .returns("Scaled prediction"),
            ),
        );
        rmm.insert(
            "train",
            method0(Linear::train, RemoteMethodDoc::new("Fit the weights")),
        );
        rmm.insert(
            "describe",
            method0(
                Linear::describe,
                RemoteMethodDoc::new("Summary of the model").returns("Class name and input size"),
            ),
        );
        rmm.insert(
            "getSub",
            method0(Linear::get_sub, RemoteMethodDoc::new("The nested model").returns("Model or null")),
        );
    }

    fn build_(&mut self) -> PResult<()> {
        if self.scale == 0.0 {
            self.scale = 1.0;
        }
        self.norm = self.weights.iter().map(|w| w * w).sum();
        self.cache = self.weights.iter().map(|w| w * self.scale).collect();
        Ok(())
    }
}

declare_object! {
    class Linear: Learner => base,
    "Linear model",
    "Computes a weighted sum of its inputs plus a bias.\nThe scale multiplies the output."
}

impl Linear {
    fn predict(&mut self, input: Vec<f64>) -> PResult<f64> {
        if input.len() != self.weights.len() {
            return Err(PLearnError::runtime(format!(
                "Expected {} inputs, got {}",
                self.weights.len(),
                input.len()
            )));
        }
        let dot: f64 = self.cache.iter().zip(&input).map(|(w, x)| w * x).sum();
        Ok(dot + self.bias)
    }

    fn predict_scaled(&mut self, input: Vec<f64>, factor: f64) -> PResult<f64> {
        Ok(self.predict(input)? * factor)
    }

    fn train(&mut self) -> PResult<()> {
        self.base.stage += 10;
        self.base.trained = true;
        Ok(())
    }

    fn describe(&mut self) -> PResult<(String, usize)> {
        Ok(("Linear".to_string(), self.weights.len()))
    }

    fn get_sub(&mut self) -> PResult<Option<ObjRef>> {
        Ok(self.sub.clone())
    }
}

// ============================================================================
// Registration
// ============================================================================

fn add(a: i32, b: i32) -> PResult<i32> {
    Ok(a + b)
}

fn shout(s: String) -> PResult<String> {
    Ok(s.to_uppercase())
}

/// Register the test classes and functions once per test binary
pub fn register_all() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        factory::register_class::<Pair>();
        factory::register_class::<Node>();
        factory::register_class::<Learner>();
        factory::register_class::<Linear>();
        register_function("add", function2(add, RemoteMethodDoc::new("Sum of two integers")));
        register_function("shout", function1(shout, RemoteMethodDoc::new("Upper-case a string")));
    });
}
