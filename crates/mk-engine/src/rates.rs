//! The rate evaluator: dy/dt from the process graph.

use mk_ode::OdeSystem;

use crate::graph::ProcessGraph;

/// Pure derivative evaluation over a frozen process graph.
///
/// This is the innermost loop of the engine: no side effects, no
/// allocation, read-only access to the graph.
pub struct RateEvaluator<'a> {
    graph: &'a ProcessGraph,
}

impl<'a> RateEvaluator<'a> {
    pub fn new(graph: &'a ProcessGraph) -> Self {
        Self { graph }
    }
}

impl OdeSystem for RateEvaluator<'_> {
    fn n_dim(&self) -> usize {
        self.graph.n_slots()
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        for (slot, out) in dydt.iter_mut().enumerate() {
            let mut sum = 0.0;
            for p in self.graph.procs_of(slot) {
                let mut rate = p.upd as f64 * p.ccst;
                for dep in self.graph.deps_of(p) {
                    let v = y[dep.slot as usize];
                    // first order dominates; branch instead of powi
                    rate *= if dep.order == 1 {
                        v
                    } else {
                        v.powi(dep.order as i32)
                    };
                }
                sum += rate;
            }
            *out = sum;
        }
    }
}
