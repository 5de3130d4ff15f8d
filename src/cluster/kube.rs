//! Control plane backed by the `kubectl` and `helm` command line tools.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::model::SiteTunnel;

use super::control_plane::{ControlPlane, ControlPlaneError};
use super::peer::{LabelSelector, PeerResource};

const FALLBACK_DNS: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8));

#[derive(Debug, Clone, Default)]
pub struct KubeTarget {
    pub kubeconfig: Option<PathBuf>,
    pub context: Option<String>,
}

pub struct KubeControlPlane {
    target: KubeTarget,
    tunnel: SiteTunnel,
}

impl KubeControlPlane {
    /// Reads the tunnel identity from the cluster. Failing here means the
    /// cluster is not usable from this process.
    pub async fn connect(target: KubeTarget) -> anyhow::Result<Self> {
        let public_key = kubectl_output(
            &target,
            &[
                "get",
                "node",
                "-o",
                r"jsonpath={.items[0].metadata.annotations.kilo\.squat\.ai/key}",
            ],
        )
        .await
        .context("reading tunnel public key")?;
        let endpoint = kubectl_output(
            &target,
            &[
                "get",
                "node",
                "-o",
                r"jsonpath={.items[0].metadata.annotations.kilo\.squat\.ai/endpoint}",
            ],
        )
        .await
        .context("reading tunnel endpoint")?;

        if public_key.is_empty() || endpoint.is_empty() {
            return Err(anyhow!("cluster nodes carry no tunnel annotations"));
        }

        let dns = match kubectl_output(
            &target,
            &[
                "-n",
                "kube-system",
                "get",
                "service",
                "kube-dns",
                "-o",
                "jsonpath={.spec.clusterIP}",
            ],
        )
        .await
        {
            Ok(addr) => addr.parse().unwrap_or(FALLBACK_DNS),
            Err(e) => {
                warn!(component = "kube", event = "dns_lookup_failed", error = %e, "using fallback dns");
                FALLBACK_DNS
            }
        };

        info!(
            component = "kube",
            event = "connected",
            endpoint = %endpoint,
            dns = %dns,
            "connected to cluster"
        );

        Ok(Self {
            target,
            tunnel: SiteTunnel {
                public_key,
                endpoint,
                dns,
            },
        })
    }

    fn kubectl(&self) -> Command {
        kubectl(&self.target)
    }

    fn helm(&self) -> Command {
        let mut cmd = Command::new("helm");
        if let Some(path) = &self.target.kubeconfig {
            cmd.arg(format!("--kubeconfig={}", path.display()));
        }
        if let Some(ctx) = &self.target.context {
            cmd.arg(format!("--kube-context={}", ctx));
        }
        cmd
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    async fn create_peer(&self, peer: &PeerResource) -> Result<(), ControlPlaneError> {
        let manifest = serde_json::to_vec(&peer.to_manifest())
            .map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;

        let mut child = self
            .kubectl()
            .args(["create", "-f", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&manifest).await?;
        }
        let output = child.wait_with_output().await?;

        if output.status.success() {
            debug!(component = "kube", event = "peer_created", peer = %peer.name);
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if stderr.contains("AlreadyExists") || stderr.contains("already exists") {
            return Err(ControlPlaneError::AlreadyExists(peer.name.clone()));
        }
        Err(ControlPlaneError::Command {
            command: "kubectl create peer".to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr,
        })
    }

    async fn list_peers(
        &self,
        selector: &LabelSelector,
    ) -> Result<Vec<PeerResource>, ControlPlaneError> {
        let selector = selector.to_string();
        let output = run(self
            .kubectl()
            .args(["get", "peer", "-o", "json", "-l", &selector]))
        .await?;
        parse_peer_list(&output)
    }

    async fn delete_peer(&self, name: &str) -> Result<(), ControlPlaneError> {
        run(self
            .kubectl()
            .args(["delete", "peer", name, "--ignore-not-found"]))
        .await
        .map(drop)
    }

    async fn install_release(
        &self,
        name: &str,
        chart_ref: &str,
        values: &Map<String, Value>,
    ) -> Result<(), ControlPlaneError> {
        let yaml = serde_yaml::to_string(values)
            .map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;

        let values_path = file.path().to_string_lossy().to_string();
        run(self.helm().args([
            "upgrade",
            "--install",
            "--namespace",
            name,
            "--create-namespace",
            "--values",
            &values_path,
            name,
            chart_ref,
        ]))
        .await?;

        info!(component = "kube", event = "release_installed", release = name, chart = chart_ref);
        Ok(())
    }

    async fn uninstall_release(&self, name: &str) -> Result<(), ControlPlaneError> {
        if let Err(e) = run(self
            .helm()
            .args(["uninstall", "--namespace", name, name, "--ignore-not-found"]))
        .await
        {
            warn!(component = "kube", event = "uninstall_failed", release = name, error = %e);
        }
        run(self
            .kubectl()
            .args(["delete", "namespace", name, "--ignore-not-found", "--wait=false"]))
        .await
        .map(drop)
    }

    fn tunnel(&self) -> &SiteTunnel {
        &self.tunnel
    }
}

fn kubectl(target: &KubeTarget) -> Command {
    let mut cmd = Command::new("kubectl");
    if let Some(path) = &target.kubeconfig {
        cmd.arg(format!("--kubeconfig={}", path.display()));
    }
    if let Some(ctx) = &target.context {
        cmd.arg(format!("--context={}", ctx));
    }
    cmd
}

async fn kubectl_output(target: &KubeTarget, args: &[&str]) -> Result<String, ControlPlaneError> {
    let out = run(kubectl(target).args(args)).await?;
    Ok(out.trim().to_string())
}

async fn run(cmd: &mut Command) -> Result<String, ControlPlaneError> {
    let output = cmd.stdin(Stdio::null()).output().await?;
    if !output.status.success() {
        return Err(ControlPlaneError::Command {
            command: format!("{:?}", cmd.as_std().get_program()),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parses the `kubectl get -o json` list form.
pub fn parse_peer_list(output: &str) -> Result<Vec<PeerResource>, ControlPlaneError> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let list: Value =
        serde_json::from_str(output).map_err(|e| ControlPlaneError::Malformed(e.to_string()))?;
    let items = list
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| ControlPlaneError::Malformed("missing items".to_string()))?;
    Ok(items.iter().filter_map(PeerResource::from_manifest).collect())
}
