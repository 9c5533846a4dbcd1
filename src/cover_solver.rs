/*!
Weighted 0-1 covering problems: choose a subset of variables with minimum total weight so that every constraint contains at least one chosen variable.
The exact feedback arc set is expressed as one of these, with one variable per edge and one constraint per cycle.
*/

use log::trace;

use crate::error::{OlcError, OlcResult};

/// A minimization problem over binary variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoverProblem {
    /// Cost of setting each variable to 1
    pub weights: Vec<u64>,
    /// Each constraint lists variable indices, at least one of which must be set
    pub constraints: Vec<Vec<usize>>
}

impl CoverProblem {
    pub fn new(weights: Vec<u64>) -> CoverProblem {
        CoverProblem {
            weights,
            constraints: vec![]
        }
    }

    /// Adds a covering constraint over the given variables
    pub fn add_constraint(&mut self, variables: Vec<usize>) {
        self.constraints.push(variables);
    }

    /// Returns true if every constraint contains one of the chosen variables
    pub fn is_satisfied(&self, chosen: &[usize]) -> bool {
        self.constraints.iter()
            .all(|c| c.iter().any(|v| chosen.contains(v)))
    }

    pub fn num_variables(&self) -> usize {
        self.weights.len()
    }
}

/// Anything that can solve a [`CoverProblem`] to optimality
pub trait CoverSolver {
    /// Returns the sorted indices of the variables set to 1 in a minimum weight solution.
    /// # Errors
    /// * `InfeasibleExactBreak` if the problem cannot be solved within the solver limits
    fn minimize(&self, problem: &CoverProblem) -> OlcResult<Vec<usize>>;
}

/// Depth-first branch and bound.
/// Branches on the unsatisfied constraint with the fewest remaining options, and prunes with the largest minimum weight over the unsatisfied constraints.
#[derive(Clone, Debug)]
pub struct BranchAndBound {
    /// Maximum number of search nodes before giving up
    max_search_nodes: u64
}

impl BranchAndBound {
    pub fn new(max_search_nodes: u64) -> BranchAndBound {
        BranchAndBound { max_search_nodes }
    }
}

impl CoverSolver for BranchAndBound {
    fn minimize(&self, problem: &CoverProblem) -> OlcResult<Vec<usize>> {
        for constraint in problem.constraints.iter() {
            if constraint.is_empty() {
                return Err(OlcError::InfeasibleExactBreak("empty covering constraint".to_string()));
            }
            if let Some(&v) = constraint.iter().find(|&&v| v >= problem.num_variables()) {
                return Err(OlcError::InfeasibleExactBreak(format!("unknown variable {v} in constraint")));
            }
        }

        let mut search = Search {
            problem,
            chosen: vec![false; problem.num_variables()],
            banned: vec![false; problem.num_variables()],
            cost: 0,
            best_cost: u64::MAX,
            best: None,
            nodes: 0,
            max_nodes: self.max_search_nodes
        };
        search.explore()?;
        trace!("Branch and bound explored {} nodes, best cost {}", search.nodes, search.best_cost);

        match search.best {
            Some(best) => Ok(best),
            None => Err(OlcError::InfeasibleExactBreak("no feasible cover".to_string()))
        }
    }
}

/// Mutable state of one branch and bound run
struct Search<'a> {
    problem: &'a CoverProblem,
    chosen: Vec<bool>,
    banned: Vec<bool>,
    cost: u64,
    best_cost: u64,
    best: Option<Vec<usize>>,
    nodes: u64,
    max_nodes: u64
}

impl<'a> Search<'a> {
    fn explore(&mut self) -> OlcResult<()> {
        self.nodes += 1;
        if self.nodes > self.max_nodes {
            return Err(OlcError::InfeasibleExactBreak(format!(
                "search exceeded {} branch and bound nodes", self.max_nodes
            )));
        }

        // find the most constrained open constraint and a lower bound on the remaining cost
        let mut branch: Option<Vec<usize>> = None;
        let mut bound: u64 = 0;
        for constraint in self.problem.constraints.iter() {
            if constraint.iter().any(|&v| self.chosen[v]) {
                continue;
            }
            let options: Vec<usize> = constraint.iter()
                .copied()
                .filter(|&v| !self.banned[v])
                .collect();
            let Some(min_weight) = options.iter().map(|&v| self.problem.weights[v]).min() else {
                // everything in this constraint was ruled out
                return Ok(());
            };
            bound = bound.max(min_weight);
            if branch.as_ref().map_or(true, |b| options.len() < b.len()) {
                branch = Some(options);
            }
        }

        let Some(mut options) = branch else {
            if self.cost < self.best_cost {
                self.best_cost = self.cost;
                self.best = Some((0..self.chosen.len()).filter(|&v| self.chosen[v]).collect());
            }
            return Ok(());
        };
        if self.cost.saturating_add(bound) >= self.best_cost {
            return Ok(());
        }

        options.sort_by_key(|&v| (self.problem.weights[v], v));
        options.dedup();
        let mut newly_banned = vec![];
        for &v in options.iter() {
            self.chosen[v] = true;
            self.cost += self.problem.weights[v];
            let result = self.explore();
            self.chosen[v] = false;
            self.cost -= self.problem.weights[v];
            result?;

            // later branches must not pick this variable again
            self.banned[v] = true;
            newly_banned.push(v);
        }
        for v in newly_banned.into_iter() {
            self.banned[v] = false;
        }
        Ok(())
    }
}
