//! Restarting the managed game server's container.
//!
//! The server runs as a container managed by an external runtime; this
//! module locates its unit and issues a restart through the runtime's CLI.
//! Success means the restart command was accepted, not that the server has
//! finished coming back up.
//!
//! The unit is found either by a fixed configured identifier or, in
//! discovery mode, by scanning all units for one whose image name contains
//! a marker substring. Discovery is best-effort by nature, so the matching
//! rule sits behind [`UnitLocator`] and can be swapped without touching the
//! restart logic. The runtime invocation itself sits behind
//! [`ContainerRuntime`] so tests can substitute a mock.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

use crate::config::RuntimeConfig;

/// Errors that can occur while restarting the managed server.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Discovery mode found no unit whose image matches the marker.
    #[error("no runtime unit found matching image marker {0:?}")]
    NotFound(String),

    /// The runtime CLI ran but reported failure.
    #[error("runtime command `{command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    /// The runtime CLI could not be started at all.
    #[error("failed to run {binary:?}: {source} (is the runtime CLI installed?)")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The restart command did not complete within the configured timeout.
    #[error("runtime command timed out after {0:?}")]
    Timeout(Duration),

    /// The runtime's unit listing was not parseable.
    #[error("unparseable unit descriptor from runtime: {0}")]
    BadDescriptor(String),
}

/// One container as reported by `ps --all --format {{json .}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UnitDescriptor {
    /// Container id.
    #[serde(rename = "ID")]
    pub id: String,

    /// Image reference the container was created from.
    #[serde(rename = "Image")]
    pub image: String,

    /// Container name(s).
    #[serde(rename = "Names", default)]
    pub names: String,

    /// Lifecycle state (`running`, `exited`, ...).
    #[serde(rename = "State", default)]
    pub state: String,
}

/// Strategy for picking the managed server's unit out of a listing.
/// Returns zero or one match.
pub trait UnitLocator: Send + Sync {
    fn locate<'a>(&self, units: &'a [UnitDescriptor]) -> Option<&'a UnitDescriptor>;
}

/// The shipped discovery rule: first unit whose image reference contains
/// the marker substring.
#[derive(Debug, Clone)]
pub struct ImageMarkerLocator {
    marker: String,
}

impl ImageMarkerLocator {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }
}

impl UnitLocator for ImageMarkerLocator {
    fn locate<'a>(&self, units: &'a [UnitDescriptor]) -> Option<&'a UnitDescriptor> {
        units.iter().find(|unit| unit.image.contains(&self.marker))
    }
}

/// Interface to the container runtime.
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// List all units, running or stopped.
    async fn list_units(&self) -> Result<Vec<UnitDescriptor>, LifecycleError>;

    /// Issue a restart for the given unit.
    async fn restart_unit(&self, unit: &str) -> Result<(), LifecycleError>;
}

/// Runtime backed by a `docker`-compatible CLI (`podman` works unchanged).
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, LifecycleError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| LifecycleError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(LifecycleError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ContainerRuntime for DockerCli {
    async fn list_units(&self) -> Result<Vec<UnitDescriptor>, LifecycleError> {
        // One JSON document per line, one line per container.
        let stdout = self
            .run(&["ps", "--all", "--format", "{{json .}}"])
            .await?;
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|err| LifecycleError::BadDescriptor(format!("{err}: {line}")))
            })
            .collect()
    }

    async fn restart_unit(&self, unit: &str) -> Result<(), LifecycleError> {
        self.run(&["restart", unit]).await?;
        Ok(())
    }
}

/// Locates the managed server's unit and restarts it.
pub struct LifecycleController<R> {
    runtime: R,
    locator: Box<dyn UnitLocator>,
    fixed_unit: Option<String>,
    marker: String,
    timeout: Duration,
}

impl LifecycleController<DockerCli> {
    /// Build a controller over the configured runtime CLI.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            DockerCli::new(&config.binary),
            Box::new(ImageMarkerLocator::new(&config.image_marker)),
            config.unit.clone(),
            &config.image_marker,
            Duration::from_secs(config.restart_timeout_secs),
        )
    }
}

impl<R: ContainerRuntime> LifecycleController<R> {
    pub fn new(
        runtime: R,
        locator: Box<dyn UnitLocator>,
        fixed_unit: Option<String>,
        marker: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            locator,
            fixed_unit,
            marker: marker.into(),
            timeout,
        }
    }

    /// Restart the managed server's unit. Returns the unit identifier the
    /// restart was issued against.
    ///
    /// The whole operation is bounded by the configured timeout so a hung
    /// runtime daemon cannot stall the caller indefinitely.
    pub async fn restart(&self) -> Result<String, LifecycleError> {
        match tokio::time::timeout(self.timeout, self.locate_and_restart()).await {
            Ok(result) => result,
            Err(_) => Err(LifecycleError::Timeout(self.timeout)),
        }
    }

    async fn locate_and_restart(&self) -> Result<String, LifecycleError> {
        let unit = match &self.fixed_unit {
            Some(unit) => unit.clone(),
            None => {
                let units = self.runtime.list_units().await?;
                let found = self
                    .locator
                    .locate(&units)
                    .ok_or_else(|| LifecycleError::NotFound(self.marker.clone()))?;
                tracing::debug!(
                    "discovered unit {} (image {}, state {})",
                    found.id,
                    found.image,
                    found.state
                );
                found.id.clone()
            }
        };

        tracing::info!("restarting runtime unit {}", unit);
        self.runtime.restart_unit(&unit).await?;
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock runtime: a canned unit listing plus a log of restarted units.
    struct MockRuntime {
        units: Vec<UnitDescriptor>,
        restarted: Mutex<Vec<String>>,
        restart_result: Option<LifecycleError>,
    }

    impl MockRuntime {
        fn new(units: Vec<UnitDescriptor>) -> Self {
            Self {
                units,
                restarted: Mutex::new(Vec::new()),
                restart_result: None,
            }
        }
    }

    impl ContainerRuntime for &MockRuntime {
        async fn list_units(&self) -> Result<Vec<UnitDescriptor>, LifecycleError> {
            Ok(self.units.clone())
        }

        async fn restart_unit(&self, unit: &str) -> Result<(), LifecycleError> {
            if let Some(err) = &self.restart_result {
                return Err(LifecycleError::CommandFailed {
                    command: "restart".to_string(),
                    status: 1,
                    stderr: err.to_string(),
                });
            }
            self.restarted.lock().unwrap().push(unit.to_string());
            Ok(())
        }
    }

    fn unit(id: &str, image: &str) -> UnitDescriptor {
        UnitDescriptor {
            id: id.to_string(),
            image: image.to_string(),
            names: id.to_string(),
            state: "running".to_string(),
        }
    }

    fn controller<'a>(
        runtime: &'a MockRuntime,
        fixed: Option<String>,
        marker: &str,
    ) -> LifecycleController<&'a MockRuntime> {
        LifecycleController::new(
            runtime,
            Box::new(ImageMarkerLocator::new(marker)),
            fixed,
            marker,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_discovery_restarts_matching_unit() {
        let runtime = MockRuntime::new(vec![
            unit("db-1", "postgres:16"),
            unit("mc-1", "itzg/minecraft-server:latest"),
        ]);
        let controller = controller(&runtime, None, "minecraft-server");

        let restarted = controller.restart().await.unwrap();
        assert_eq!(restarted, "mc-1");
        assert_eq!(*runtime.restarted.lock().unwrap(), vec!["mc-1"]);
    }

    #[tokio::test]
    async fn test_discovery_no_match_is_not_found() {
        let runtime = MockRuntime::new(vec![unit("db-1", "postgres:16")]);
        let controller = controller(&runtime, None, "minecraft-server");

        let err = controller.restart().await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
        assert!(runtime.restarted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fixed_unit_bypasses_discovery() {
        // Listing holds no match; the fixed unit wins regardless.
        let runtime = MockRuntime::new(vec![unit("db-1", "postgres:16")]);
        let controller = controller(&runtime, Some("pinned-unit".to_string()), "minecraft-server");

        let restarted = controller.restart().await.unwrap();
        assert_eq!(restarted, "pinned-unit");
        assert_eq!(*runtime.restarted.lock().unwrap(), vec!["pinned-unit"]);
    }

    #[tokio::test]
    async fn test_restart_failure_propagates() {
        let mut runtime = MockRuntime::new(vec![unit("mc-1", "minecraft-server")]);
        runtime.restart_result = Some(LifecycleError::Timeout(Duration::from_secs(1)));
        let controller = controller(&runtime, None, "minecraft-server");

        let err = controller.restart().await.unwrap_err();
        assert!(matches!(err, LifecycleError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let runtime = DockerCli::new("definitely-not-a-real-runtime-binary");
        let err = runtime.list_units().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Spawn { .. }));
    }

    #[test]
    fn test_locator_matches_substring_anywhere() {
        let locator = ImageMarkerLocator::new("minecraft-server");
        let units = vec![
            unit("a", "registry.example/infra/minecraft-server-fork:1.21"),
            unit("b", "minecraft-server"),
        ];
        assert_eq!(locator.locate(&units).unwrap().id, "a");
        assert!(locator.locate(&units[1..]).is_some());
        assert!(locator.locate(&[]).is_none());
    }

    #[test]
    fn test_unit_descriptor_parses_ps_json() {
        let line = r#"{"ID":"4f1c","Image":"itzg/minecraft-server","Names":"mc","State":"running","Status":"Up 2 hours"}"#;
        let descriptor: UnitDescriptor = serde_json::from_str(line).unwrap();
        assert_eq!(descriptor.id, "4f1c");
        assert_eq!(descriptor.image, "itzg/minecraft-server");
        assert_eq!(descriptor.names, "mc");
        assert_eq!(descriptor.state, "running");
    }
}
