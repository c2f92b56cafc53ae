//! Fixpoint computation engine with widening and narrowing.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};

use crate::config::AnalysisConfig;
use crate::domain::Lattice;
use crate::error::{AnalysisError, Result};
use crate::ir::{BlockId, Procedure};
use crate::state::AbstractState;
use crate::transfer::TransferFunction;

/// Fixpoint computation engine.
///
/// Computes the in-state of every block of a procedure: a worklist iteration
/// in reverse post-order, widening at loop heads, followed by a bounded
/// number of descending (narrowing) rounds.
#[derive(Debug, Clone)]
pub struct FixpointEngine<T: TransferFunction> {
    pub transfer: T,
    /// Updates a loop head absorbs by join before widening is applied.
    pub widening_threshold: usize,
    pub narrowing_iterations: usize,
    /// Maximal number of block visits in the ascending phase.
    pub max_iterations: usize,
}

/// Result of a fixpoint computation: one in-state per block.
#[derive(Debug, Clone)]
pub struct Fixpoint {
    states: Vec<AbstractState>,
    /// Block visits of the ascending phase.
    pub iterations: usize,
    /// Widening applications.
    pub widenings: usize,
    /// Narrowing rounds that changed some state.
    pub narrowings: usize,
}

impl Fixpoint {
    pub fn state_at(&self, block: BlockId) -> &AbstractState {
        &self.states[block.index()]
    }

    pub fn states(&self) -> &[AbstractState] {
        &self.states
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        !self.states[block.index()].is_bottom()
    }

    /// Whether the states are a post-fixpoint: the entry state covers the
    /// parameters and no edge carries a state not already covered by its
    /// target.
    pub fn is_stable<T: TransferFunction>(&self, procedure: &Procedure, transfer: &T) -> bool {
        if !AbstractState::top_for(procedure).le(self.state_at(procedure.entry())) {
            return false;
        }
        procedure.blocks().iter().all(|block| {
            let out = transfer.run_block(self.state_at(block.id), block).state;
            transfer
                .successors(&out, &block.exit)
                .iter()
                .all(|(succ, edge)| edge.le(self.state_at(*succ)))
        })
    }
}

impl<T: TransferFunction> FixpointEngine<T> {
    pub fn new(transfer: T) -> Self {
        Self {
            transfer,
            widening_threshold: 1,
            narrowing_iterations: 2,
            max_iterations: 1000,
        }
    }

    /// Engine tuned by `config`, with the iteration cap scaled to `procedure`.
    pub fn with_config(transfer: T, config: &AnalysisConfig, procedure: &Procedure) -> Self {
        Self {
            transfer,
            widening_threshold: config.widening_threshold,
            narrowing_iterations: config.narrowing_iterations,
            max_iterations: config.iteration_cap(procedure.blocks().len(), procedure.statement_count()),
        }
    }

    /// Solve from the procedure's entry, seeded with `⊤` for every parameter.
    pub fn solve(&self, procedure: &Procedure) -> Result<Fixpoint> {
        let mut seeds = vec![AbstractState::bottom(); procedure.blocks().len()];
        seeds[procedure.entry().index()] = AbstractState::top_for(procedure);
        self.solve_from(procedure, seeds)
    }

    /// Solve starting from the given in-states, one per block.
    pub fn solve_from(&self, procedure: &Procedure, seeds: Vec<AbstractState>) -> Result<Fixpoint> {
        if seeds.len() != procedure.blocks().len() {
            return Err(AnalysisError::MalformedIr {
                procedure: procedure.name().to_string(),
                reason: format!("{} seed states for {} blocks", seeds.len(), procedure.blocks().len()),
            });
        }

        let rpo = procedure.reverse_postorder();
        let positions: BTreeMap<BlockId, usize> = rpo.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();
        let loop_heads = procedure.loop_heads();

        let mut states = seeds.clone();
        let mut updates = vec![0usize; states.len()];
        let mut worklist: BTreeSet<usize> = rpo
            .iter()
            .enumerate()
            .filter(|(_, id)| !states[id.index()].is_bottom())
            .map(|(pos, _)| pos)
            .collect();

        let mut iterations = 0;
        let mut widenings = 0;

        while let Some(pos) = worklist.pop_first() {
            iterations += 1;
            if iterations > self.max_iterations {
                warn!(
                    "Fixpoint computation for `{}` did not converge after {} iterations",
                    procedure.name(),
                    self.max_iterations
                );
                return Err(AnalysisError::DivergentWidening {
                    procedure: procedure.name().to_string(),
                    iterations: self.max_iterations,
                });
            }

            let block = procedure.block(rpo[pos]);
            let out = self.transfer.run_block(&states[block.id.index()], block).state;

            for (succ, edge) in self.transfer.successors(&out, &block.exit) {
                if edge.is_bottom() {
                    continue;
                }
                let old = &states[succ.index()];
                let joined = old.join(&edge);
                if joined.le(old) {
                    continue;
                }
                let next = if loop_heads.contains(&succ) && updates[succ.index()] >= self.widening_threshold {
                    widenings += 1;
                    debug!("Widening at {} in `{}`", succ, procedure.name());
                    old.widen(&joined)
                } else {
                    joined
                };
                updates[succ.index()] += 1;
                states[succ.index()] = next;
                if let Some(&succ_pos) = positions.get(&succ) {
                    worklist.insert(succ_pos);
                }
            }
        }

        debug!(
            "Fixpoint for `{}` converged after {} iterations ({} widenings)",
            procedure.name(),
            iterations,
            widenings
        );

        let narrowings = self.narrow(procedure, &seeds, &mut states);

        Ok(Fixpoint {
            states,
            iterations,
            widenings,
            narrowings,
        })
    }

    /// Narrowing phase to refine the over-approximation. Every round
    /// recomputes all in-states from the previous round.
    fn narrow(&self, procedure: &Procedure, seeds: &[AbstractState], states: &mut Vec<AbstractState>) -> usize {
        let mut rounds = 0;
        for round in 0..self.narrowing_iterations {
            let mut edges: Vec<Vec<AbstractState>> = seeds.iter().map(|seed| vec![seed.clone()]).collect();
            for block in procedure.blocks() {
                let out = self.transfer.run_block(&states[block.id.index()], block).state;
                for (succ, edge) in self.transfer.successors(&out, &block.exit) {
                    edges[succ.index()].push(edge);
                }
            }
            let incoming: Vec<AbstractState> = edges.into_iter().map(AbstractState::join_many).collect();

            let next: Vec<AbstractState> = states.iter().zip(&incoming).map(|(old, new)| old.narrow(new)).collect();
            if next.iter().zip(states.iter()).all(|(new, old)| new.equiv(old)) {
                debug!("Narrowing converged after {} rounds", round);
                break;
            }
            *states = next;
            rounds += 1;
        }
        rounds
    }
}
