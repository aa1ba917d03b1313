//! Time-window constrained route scheduler
//!
//! Exhaustive depth-first search over visiting orders of all tasks, pruned by
//! a single-hop admissibility check. Every task has a hard deadline on
//! arrival-plus-waiting; the cost of an order is the total elapsed time
//! (travel + wait + service). The cheapest complete order wins, ties going
//! to the first order generated (tasks are tried in input order at every
//! level).
//!
//! The admissibility check only looks at the direct edge from the current
//! node to each unvisited task. A task that is late directly but on time via
//! a faster detour still prunes the branch.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{SchedulingError, ValidationError};
use crate::services::routing::TravelTimeMatrix;
use crate::types::{RouteSchedule, Task, Termination};

/// Hard ceiling on tasks per search: `remaining` is a `u64` bitset
pub const MAX_SEARCH_TASKS: usize = 64;

/// Deadline and cancellation are polled once per this many generated nodes
const LIMIT_CHECK_INTERVAL: u32 = 1024;

/// Optional bounds on a single search
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    /// Maximum number of search nodes (root included)
    pub node_budget: Option<u64>,
    /// Wall-clock instant after which the search stops
    pub deadline: Option<Instant>,
    /// Cooperative cancellation from the caller
    pub cancel: Option<CancellationToken>,
}

impl SearchLimits {
    #[cfg(test)]
    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// Result of a search: the schedule plus how the search ended
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub schedule: RouteSchedule,
    pub termination: Termination,
    pub nodes_explored: u64,
    pub candidates: u64,
}

/// One leg of a route: travel to a task, wait for its window, serve it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Leg {
    pub travel: f64,
    pub wait: f64,
    pub service: f64,
}

impl Leg {
    /// Leg to `task` departing at `clock` with `travel` minutes on the road
    pub fn compute(task: &Task, travel: f64, clock: f64) -> Self {
        Self {
            travel,
            wait: task.wait_at(clock + travel),
            service: task.duration_minutes,
        }
    }

    pub fn cost(&self) -> f64 {
        self.travel + self.wait + self.service
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    /// Matrix index: 0 = origin, i + 1 = task i
    node: usize,
    clock: f64,
    cost: f64,
    remaining: u64,
    depth: usize,
    /// Next task index to try as a child
    cursor: usize,
}

/// Route scheduler over one request's tasks and travel-time matrix
pub struct RouteScheduler<'a> {
    tasks: &'a [Task],
    matrix: &'a TravelTimeMatrix,
    current_minute: f64,
}

impl<'a> RouteScheduler<'a> {
    /// `matrix` must be `(tasks.len() + 1)` square, index 0 the origin and
    /// index `i + 1` the task at `tasks[i]`.
    pub fn new(
        tasks: &'a [Task],
        matrix: &'a TravelTimeMatrix,
        current_minute: f64,
    ) -> Result<Self, SchedulingError> {
        if tasks.len() > MAX_SEARCH_TASKS {
            return Err(ValidationError::TooManyTasks {
                count: tasks.len(),
                max: MAX_SEARCH_TASKS,
            }
            .into());
        }
        if matrix.size() != tasks.len() + 1 {
            return Err(SchedulingError::Internal(format!(
                "travel-time matrix is {}x{}, expected {}x{}",
                matrix.size(),
                matrix.size(),
                tasks.len() + 1,
                tasks.len() + 1
            )));
        }

        Ok(Self {
            tasks,
            matrix,
            current_minute,
        })
    }

    /// Run the search without limits
    #[cfg(test)]
    pub fn schedule(&self) -> RouteSchedule {
        self.search(&SearchLimits::unbounded()).schedule
    }

    /// Every unvisited task reachable by its deadline straight from `node`
    fn admissible(&self, node: usize, clock: f64, remaining: u64) -> bool {
        (0..self.tasks.len())
            .filter(|&j| remaining & (1u64 << j) != 0)
            .all(|j| self.tasks[j].reachable_at(clock + self.matrix.minutes(node, j + 1)))
    }

    fn limit_hit(&self, limits: &SearchLimits) -> Option<Termination> {
        if limits.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Some(Termination::Cancelled);
        }
        if limits.deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(Termination::Deadline);
        }
        None
    }

    /// Search for the cheapest feasible order of all tasks
    pub fn search(&self, limits: &SearchLimits) -> SearchOutcome {
        let n = self.tasks.len();
        let started_at = Instant::now();

        let mut outcome = SearchOutcome {
            schedule: RouteSchedule::infeasible(),
            termination: Termination::Exhausted,
            nodes_explored: 1,
            candidates: 0,
        };

        // No tasks never yields a candidate
        if n == 0 {
            return outcome;
        }

        let all = if n == 64 { u64::MAX } else { (1u64 << n) - 1 };

        // Precheck: the root's admissibility check is the direct-reachability test
        if !self.admissible(0, self.current_minute, all) {
            debug!("Precheck failed: a task is unreachable directly from the origin");
            return outcome;
        }

        let mut best: Option<(Vec<usize>, f64)> = None;
        let mut path: Vec<usize> = Vec::with_capacity(n);
        let mut stack = vec![Frame {
            node: 0,
            clock: self.current_minute,
            cost: 0.0,
            remaining: all,
            depth: 0,
            cursor: 0,
        }];
        let mut until_check = 0u32;

        while let Some(frame) = stack.last_mut() {
            let Some(j) = (frame.cursor..n).find(|&j| frame.remaining & (1u64 << j) != 0) else {
                stack.pop();
                continue;
            };
            frame.cursor = j + 1;

            if limits.node_budget.is_some_and(|b| outcome.nodes_explored >= b) {
                outcome.termination = Termination::NodeBudget;
                break;
            }
            if until_check == 0 {
                if let Some(termination) = self.limit_hit(limits) {
                    outcome.termination = termination;
                    break;
                }
                until_check = LIMIT_CHECK_INTERVAL;
            }
            until_check -= 1;

            let leg = Leg::compute(&self.tasks[j], self.matrix.minutes(frame.node, j + 1), frame.clock);
            let step = leg.cost();
            let child = Frame {
                node: j + 1,
                clock: frame.clock + step,
                cost: frame.cost + step,
                remaining: frame.remaining & !(1u64 << j),
                depth: frame.depth + 1,
                cursor: 0,
            };
            outcome.nodes_explored += 1;

            path.truncate(frame.depth);
            path.push(j);

            if child.remaining == 0 {
                outcome.candidates += 1;
                if best.as_ref().map_or(true, |(_, c)| child.cost < *c) {
                    best = Some((path.clone(), child.cost));
                }
                continue;
            }

            if self.admissible(child.node, child.clock, child.remaining) {
                stack.push(child);
            }
        }

        if let Some((sequence, total_cost)) = best {
            outcome.schedule = RouteSchedule { sequence, total_cost };
        }

        debug!(
            "Search finished: tasks={} termination={} nodes={} candidates={} cost={} time_ms={}",
            n,
            outcome.termination.as_str(),
            outcome.nodes_explored,
            outcome.candidates,
            outcome.schedule.total_cost,
            started_at.elapsed().as_millis()
        );

        outcome
    }
}
