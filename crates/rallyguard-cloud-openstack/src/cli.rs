//! openstack CLI wrapper
//!
//! Wraps python-openstackclient commands. Listings use `-f json`.

use crate::error::{OpenStackError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_BINARY: &str = "openstack";

/// openstack CLI wrapper
#[derive(Debug, Clone)]
pub struct OpenStackCli {
    binary: String,
    cloud: Option<String>,
}

impl OpenStackCli {
    /// `cloud` selects an entry from clouds.yaml; `None` leaves the choice to
    /// the `OS_*` environment
    pub fn new(binary: impl Into<String>, cloud: Option<String>) -> Self {
        Self {
            binary: binary.into(),
            cloud,
        }
    }

    fn global_args(&self) -> Vec<&str> {
        match &self.cloud {
            Some(cloud) => vec!["--os-cloud", cloud.as_str()],
            None => Vec::new(),
        }
    }

    /// Run an openstack command and return stdout
    ///
    /// The child is killed if the returned future is dropped, so an outer
    /// timeout actually stops the call.
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let global = self.global_args();
        let mut cmd = Command::new(&self.binary);
        cmd.args(&global);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!("Running: {} {} {}", self.binary, global.join(" "), args.join(" "));

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                OpenStackError::CliNotFound(self.binary.clone())
            } else {
                OpenStackError::IoError(e)
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OpenStackError::CommandFailed(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// `<noun> list -f json [--all-projects]`
    pub async fn list(&self, noun: &[&str], all_projects: bool) -> Result<Vec<ListRow>> {
        let mut args: Vec<&str> = noun.to_vec();
        args.extend(["list", "-f", "json"]);
        if all_projects {
            args.push("--all-projects");
        }

        let output = self.run_command(&args).await?;

        if output.trim().is_empty() || output.trim() == "[]" {
            return Ok(Vec::new());
        }

        let rows: Vec<ListRow> = serde_json::from_str(&output)?;
        Ok(rows)
    }

    /// `<noun> delete <id>`
    pub async fn delete(&self, noun: &[&str], id: &str) -> Result<()> {
        let mut args: Vec<&str> = noun.to_vec();
        args.extend(["delete", id]);
        self.run_command(&args).await?;
        Ok(())
    }

    pub async fn show_router(&self, router_id: &str) -> Result<RouterInfo> {
        let output = self
            .run_command(&["router", "show", router_id, "-f", "json"])
            .await?;
        let router: RouterInfo = serde_json::from_str(&output)?;
        Ok(router)
    }

    pub async fn remove_router_subnet(&self, router_id: &str, subnet_id: &str) -> Result<()> {
        self.run_command(&["router", "remove", "subnet", router_id, subnet_id])
            .await?;
        Ok(())
    }

    pub async fn unset_router_gateway(&self, router_id: &str) -> Result<()> {
        self.run_command(&["router", "unset", "--external-gateway", router_id])
            .await?;
        Ok(())
    }
}

/// One row of a `list -f json` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRow {
    #[serde(rename = "ID")]
    pub id: String,

    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// Subset of `router show -f json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterInfo {
    pub id: String,

    pub name: Option<String>,

    /// A JSON array on current clients, a JSON-encoded string on older ones
    #[serde(default)]
    pub interfaces_info: Option<serde_json::Value>,
}

impl RouterInfo {
    /// Subnet IDs of the router's interfaces
    pub fn subnet_ids(&self) -> Result<Vec<String>> {
        let value = match &self.interfaces_info {
            None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => return Ok(Vec::new()),
            Some(serde_json::Value::String(s)) => serde_json::from_str(s)?,
            Some(v) => v.clone(),
        };

        let interfaces: Vec<InterfaceInfo> = serde_json::from_value(value).map_err(|e| {
            OpenStackError::UnexpectedOutput(format!("router {} interfaces_info: {}", self.id, e))
        })?;

        let mut subnets: Vec<String> = Vec::new();
        for subnet in interfaces.into_iter().filter_map(|i| i.subnet_id) {
            if !subnets.contains(&subnet) {
                subnets.push(subnet);
            }
        }
        Ok(subnets)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub port_id: Option<String>,
    pub ip_address: Option<String>,
    pub subnet_id: Option<String>,
}
