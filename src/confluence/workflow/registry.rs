// SPDX-License-Identifier: MIT

//! Agent registry - maps generated ids to reusable agent handles
//!
//! Agents are created once (e.g. via the HTTP layer) and looked up by id
//! when a workflow is wired at request time. Lookups are validated at
//! build time rather than trusted implicitly.

use crate::adk::agent::Agent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<String, Arc<dyn Agent>>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store an agent and return its generated id
    pub async fn register(&self, agent: Arc<dyn Agent>) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let mut agents = self.agents.write().await;
        agents.insert(id.clone(), agent);
        id
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        let agents = self.agents.read().await;
        agents.get(id).cloned()
    }

    /// Resolve a list of ids, failing on the first unknown one
    pub async fn resolve(&self, ids: &[String]) -> Result<Vec<Arc<dyn Agent>>, String> {
        let agents = self.agents.read().await;
        let mut resolved = Vec::with_capacity(ids.len());
        for id in ids {
            match agents.get(id) {
                Some(agent) => resolved.push(agent.clone()),
                None => return Err(id.clone()),
            }
        }
        Ok(resolved)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
