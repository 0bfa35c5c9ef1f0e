use cucumber::World as CucumberWorld;
use leadpool_core::config::ServerConfig;
use leadpool_core::model::{InventorySnapshot, Lead};
use leadpool_core::testing::Harness;
use leadpool_core::LeadpoolServer;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A server started for one scenario, stopped when the world is dropped
pub struct RunningServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), String>>,
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

#[derive(CucumberWorld)]
#[world(init = Self::new)]
pub struct LeadpoolWorld {
    pub harness: Harness,
    /// Most recent working set returned to each agent
    pub working_sets: HashMap<String, Vec<Lead>>,
    /// The set an agent held before its most recent request
    pub previous_sets: HashMap<String, Vec<Lead>>,
    pub snapshots: Vec<InventorySnapshot>,
    pub journal_dir: Option<tempfile::TempDir>,
    pub server: Option<RunningServer>,
    pub last_response: Option<(u16, serde_json::Value)>,
}

impl fmt::Debug for LeadpoolWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadpoolWorld")
            .field("working_sets", &self.working_sets.keys().collect::<Vec<_>>())
            .field("snapshots", &self.snapshots.len())
            .field("server", &self.server.as_ref().map(|s| &s.base_url))
            .field("last_response", &self.last_response)
            .finish()
    }
}

impl LeadpoolWorld {
    fn new() -> Self {
        Self {
            harness: Harness::new(),
            working_sets: HashMap::new(),
            previous_sets: HashMap::new(),
            snapshots: Vec::new(),
            journal_dir: None,
            server: None,
            last_response: None,
        }
    }

    pub fn journal_path(&self) -> Option<PathBuf> {
        self.journal_dir.as_ref().map(|d| d.path().join("leadpool.journal"))
    }

    /// Replace the harness with one replaying the scenario's journal
    pub async fn reopen_journal(&mut self) -> Result<(), String> {
        let path = self.journal_path().ok_or("no journal configured for this scenario")?;
        // Drop the old datastore first so its writer is closed
        self.harness = Harness::new();
        self.harness = Harness::journaled(&path).await.map_err(|e| e.to_string())?;
        Ok(())
    }

    pub async fn request_working_set(&mut self, agent: &str) -> Result<(), String> {
        let leads = self.harness.service.get_working_set(agent).await.map_err(|e| e.to_string())?;
        if let Some(previous) = self.working_sets.insert(agent.to_string(), leads) {
            self.previous_sets.insert(agent.to_string(), previous);
        }
        Ok(())
    }

    pub fn held(&self, agent: &str) -> &[Lead] {
        self.working_sets.get(agent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub async fn recompute(&mut self) -> Result<(), String> {
        let snapshot =
            self.harness.service.recompute_inventory(None).await.map_err(|e| e.to_string())?;
        self.snapshots.push(snapshot);
        Ok(())
    }

    /// Serve a fresh service on a free port
    pub async fn start_server(&mut self) -> Result<(), String> {
        let port = portpicker::pick_unused_port().ok_or("no free port")?;
        let listener = TcpListener::bind(("127.0.0.1", port)).await.map_err(|e| e.to_string())?;
        let service = std::mem::take(&mut self.harness).service;
        let server = LeadpoolServer::new(service, ServerConfig { port, ..ServerConfig::default() });

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async {
                    let _ = rx.await;
                })
                .await
                .map_err(|e| e.to_string())
        });

        self.server = Some(RunningServer {
            base_url: format!("http://127.0.0.1:{}", port),
            shutdown: Some(tx),
            handle,
        });
        Ok(())
    }

    /// Send a request, recording status and JSON body
    pub async fn send(
        &mut self,
        method: &str,
        path: &str,
        identity: Option<(&str, &str)>,
        body: Option<serde_json::Value>,
    ) -> Result<(), String> {
        let base = self.server.as_ref().map(|s| s.base_url.clone()).ok_or("server not started")?;
        let client = reqwest::Client::new();
        let url = format!("{}{}", base, path);

        let mut request = match method {
            "GET" => client.get(&url),
            "POST" => client.post(&url),
            "PATCH" => client.patch(&url),
            "DELETE" => client.delete(&url),
            other => return Err(format!("unsupported method {}", other)),
        };
        if let Some((id, role)) = identity {
            request = request.header("x-agent-id", id).header("x-agent-role", role);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| e.to_string())?;
        let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        self.last_response = Some((status, json));
        Ok(())
    }
}
