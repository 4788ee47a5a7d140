//! Automation runner: walks automation graphs forward from a fired action.
//!
//! A chain starts when a top-level (non-chain) invocation of an action
//! succeeds and that action is the root of an active graph. From there each
//! outgoing edge is an independent branch: it evaluates its condition on
//! the previous body, invokes its target on success and continues from it.
//! A looping edge whose condition does not hold waits, re-invokes its
//! source action and evaluates again.
//!
//! The graph is re-read from storage before every step, so edits and
//! deactivation take effect on running chains.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};

use smarthome_domain::action::Action;
use smarthome_domain::automation::{AutomationGraph, Verdict};
use smarthome_domain::controller::Controller;
use smarthome_domain::dispatch::DispatchOutcome;
use smarthome_domain::error::SmartHomeError;
use smarthome_domain::id::{ActionId, AutomationId, ControllerId, EdgeId, NodeId};

use crate::action_runner::ActionRunner;
use crate::ports::{ActionRepository, AutomationRepository, ControllerRepository, Dispatcher};

/// Tuning for chain propagation.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wait between two polls of a looping edge's source action.
    pub loop_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_secs(2),
        }
    }
}

/// Result of a top-level invocation.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: DispatchOutcome,
    /// Background task running the chains started by this invocation, if
    /// it succeeded. Resolves to the number of chains started. Dropping the
    /// handle leaves the chains running.
    pub chains: Option<JoinHandle<usize>>,
}

#[derive(Debug)]
enum Step {
    /// Fan out over every edge leaving `node`.
    Node { node: NodeId, body: String },
    /// Evaluate a single edge against the body of its source.
    Edge { edge: EdgeId, body: String },
}

/// Propagates automation chains.
pub struct AutomationRunner<GR, CR, AR, D> {
    graphs: GR,
    actions: Arc<ActionRunner<CR, AR, D>>,
    config: RunnerConfig,
}

impl<GR, CR, AR, D> AutomationRunner<GR, CR, AR, D>
where
    GR: AutomationRepository + Send + Sync + 'static,
    CR: ControllerRepository + Send + Sync + 'static,
    AR: ActionRepository + Send + Sync + 'static,
    D: Dispatcher + 'static,
{
    pub fn new(graphs: GR, actions: Arc<ActionRunner<CR, AR, D>>, config: RunnerConfig) -> Self {
        Self {
            graphs,
            actions,
            config,
        }
    }

    #[must_use]
    pub fn action_runner(&self) -> &Arc<ActionRunner<CR, AR, D>> {
        &self.actions
    }

    /// Top-level invocation: call the action and, if it succeeded, start
    /// the chains rooted at it in the background.
    pub async fn invoke(self: &Arc<Self>, controller: &Controller, action: &Action) -> Dispatched {
        let outcome = self.actions.run(controller, action).await;
        let chains = outcome
            .ok
            .then(|| self.spawn_chains(controller.id, action.id, outcome.body.clone()));
        Dispatched { outcome, chains }
    }

    /// Resolve ids, then perform a top-level invocation.
    ///
    /// # Errors
    ///
    /// Returns lookup errors from [`ActionRunner::resolve`].
    pub async fn invoke_by_id(
        self: &Arc<Self>,
        controller_id: ControllerId,
        action_id: ActionId,
    ) -> Result<Dispatched, SmartHomeError> {
        let (controller, action) = self.actions.resolve(controller_id, action_id).await?;
        Ok(self.invoke(&controller, &action).await)
    }

    /// Run [`AutomationRunner::start_chains`] on its own task.
    pub fn spawn_chains(
        self: &Arc<Self>,
        controller_id: ControllerId,
        action_id: ActionId,
        body: String,
    ) -> JoinHandle<usize> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.start_chains(controller_id, action_id, body).await })
    }

    /// Propagate from every root node matching `(controller, action)` in
    /// every active graph, and wait for all chains to end.
    ///
    /// Returns the number of chains started.
    pub async fn start_chains(
        self: &Arc<Self>,
        controller_id: ControllerId,
        action_id: ActionId,
        body: String,
    ) -> usize {
        let graphs = match self.graphs.get_active().await {
            Ok(graphs) => graphs,
            Err(err) => {
                tracing::error!(error = %err, "failed to load active automations");
                return 0;
            }
        };

        let mut chains = JoinSet::new();
        for graph in &graphs {
            for root in graph.roots_for(controller_id, action_id) {
                tracing::info!(automation = %graph.name, node = %root.id, "starting automation chain");
                let this = Arc::clone(self);
                let (graph_id, node, body) = (graph.id, root.id, body.clone());
                chains.spawn(async move { this.propagate(graph_id, node, body).await });
            }
        }

        let started = chains.len();
        while let Some(joined) = chains.join_next().await {
            if let Err(err) = joined {
                tracing::error!(error = %err, "automation chain aborted");
            }
        }
        started
    }

    /// Walk `graph_id` forward from `node`, given the body its action
    /// returned. Every branch runs on its own task; this returns once all
    /// branches have stopped.
    pub async fn propagate(self: &Arc<Self>, graph_id: AutomationId, node: NodeId, body: String) {
        let mut branches = JoinSet::new();
        branches.spawn(Arc::clone(self).step(graph_id, Step::Node { node, body }));

        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok(next) => {
                    for step in next {
                        branches.spawn(Arc::clone(self).step(graph_id, step));
                    }
                }
                Err(err) => tracing::error!(error = %err, "automation branch aborted"),
            }
        }
    }

    async fn step(self: Arc<Self>, graph_id: AutomationId, step: Step) -> Vec<Step> {
        let Some(graph) = self.active_graph(graph_id).await else {
            return Vec::new();
        };

        match step {
            Step::Node { node, body } => graph
                .edges_from(node)
                .map(|edge| Step::Edge {
                    edge: edge.id,
                    body: body.clone(),
                })
                .collect(),
            Step::Edge { edge, body } => {
                let Some(edge) = graph.edges.iter().find(|e| e.id == edge) else {
                    return Vec::new();
                };
                let (edge_id, source, target) = (edge.id, edge.source, edge.target);

                match edge.condition.evaluate(&body) {
                    Err(err) => {
                        tracing::info!(edge = %edge_id, error = %err, "branch stopped on unexpected response");
                        Vec::new()
                    }
                    Ok(Verdict::Stop) => {
                        tracing::debug!(edge = %edge_id, "condition not met");
                        Vec::new()
                    }
                    Ok(Verdict::Advance) => self
                        .fire(&graph, target)
                        .await
                        .map(|body| Step::Node { node: target, body })
                        .into_iter()
                        .collect(),
                    Ok(Verdict::Repoll) => {
                        tokio::time::sleep(self.config.loop_interval).await;
                        let Some(graph) = self.active_graph(graph_id).await else {
                            return Vec::new();
                        };
                        if !graph.edges.iter().any(|e| e.id == edge_id) {
                            return Vec::new();
                        }
                        // Every edge leaving the source sees the fresh body.
                        self.fire(&graph, source)
                            .await
                            .map(|body| Step::Node { node: source, body })
                            .into_iter()
                            .collect()
                    }
                }
            }
        }
    }

    /// Invoke a node's action inside a chain. Returns the body on success.
    async fn fire(&self, graph: &AutomationGraph, node: NodeId) -> Option<String> {
        let node = graph.node(node)?;
        match self.actions.dispatch(node.controller_id, node.action_id).await {
            Ok(outcome) if outcome.ok => Some(outcome.body),
            Ok(_) => {
                tracing::info!(automation = %graph.name, node = %node.id, "branch stopped on failed action");
                None
            }
            Err(err) => {
                tracing::warn!(automation = %graph.name, node = %node.id, error = %err, "branch stopped on unresolvable node");
                None
            }
        }
    }

    async fn active_graph(&self, id: AutomationId) -> Option<AutomationGraph> {
        match self.graphs.get_by_id(id).await {
            Ok(Some(graph)) if graph.active => Some(graph),
            Ok(Some(graph)) => {
                tracing::info!(automation = %graph.name, "automation deactivated, stopping chain");
                None
            }
            Ok(None) => None,
            Err(err) => {
                tracing::error!(automation = %id, error = %err, "failed to reload automation");
                None
            }
        }
    }
}
