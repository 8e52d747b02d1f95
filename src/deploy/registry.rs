//! Containers started by this process

use super::port::allocate_port;
use crate::store::DeploymentStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: String,
    pub image_name: String,
    pub port: u16,
    pub status: DeploymentStatus,
    /// Lookup only; the repository record owns the deployment
    pub repo_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
}

impl ContainerRecord {
    pub fn is_running(&self) -> bool {
        self.status == DeploymentStatus::Running
    }
}

#[derive(Debug, Default)]
struct Slots {
    containers: HashMap<String, ContainerRecord>,
    /// Ports claimed by deployments that have not registered a container yet
    reserved: HashSet<u16>,
}

impl Slots {
    fn taken_ports(&self) -> HashSet<u16> {
        self.containers
            .values()
            .filter(|c| c.is_running())
            .map(|c| c.port)
            .chain(self.reserved.iter().copied())
            .collect()
    }
}

/// A host port held for an in-flight deployment; released on drop
///
/// Keep it alive until the container is inserted, after which the running
/// container holds the port.
#[derive(Debug)]
pub struct PortReservation {
    port: u16,
    slots: Arc<RwLock<Slots>>,
}

impl PortReservation {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortReservation {
    fn drop(&mut self) {
        self.slots
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .reserved
            .remove(&self.port);
    }
}

/// Stopped containers are retained so a second stop can be told apart from an unknown id
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    slots: Arc<RwLock<Slots>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> RwLockWriteGuard<'_, Slots> {
        self.slots.write().unwrap_or_else(|p| p.into_inner())
    }

    fn read(&self) -> RwLockReadGuard<'_, Slots> {
        self.slots.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert(&self, record: ContainerRecord) {
        self.write().containers.insert(record.id.clone(), record);
    }

    pub fn get(&self, id: &str) -> Option<ContainerRecord> {
        self.read().containers.get(id).cloned()
    }

    /// Marks a running container stopped; `None` if it is unknown or already stopped
    pub fn mark_stopped(&self, id: &str) -> Option<ContainerRecord> {
        let mut slots = self.write();
        let record = slots.containers.get_mut(id)?;
        if !record.is_running() {
            return None;
        }
        record.status = DeploymentStatus::Stopped;
        record.stopped_at = Some(Utc::now());
        Some(record.clone())
    }

    /// Oldest first, optionally only one repository's containers
    pub fn list(&self, repo_id: Option<&str>) -> Vec<ContainerRecord> {
        let slots = self.read();
        let mut records: Vec<ContainerRecord> = slots
            .containers
            .values()
            .filter(|c| repo_id.map_or(true, |id| c.repo_id == id))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        records
    }

    /// Host ports held by running containers or reserved by in-flight deployments
    pub fn ports_in_use(&self) -> HashSet<u16> {
        self.read().taken_ports()
    }

    /// Claims `port`; `None` when a running container or another deployment holds it
    pub fn reserve(&self, port: u16) -> Option<PortReservation> {
        let mut slots = self.write();
        if slots.taken_ports().contains(&port) {
            return None;
        }
        slots.reserved.insert(port);
        Some(PortReservation {
            port,
            slots: self.slots.clone(),
        })
    }

    /// Claims a free OS-assigned port that nothing here holds
    pub fn reserve_any(&self) -> io::Result<PortReservation> {
        let mut slots = self.write();
        let port = allocate_port(&slots.taken_ports())?;
        slots.reserved.insert(port);
        Ok(PortReservation {
            port,
            slots: self.slots.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(id: &str, repo_id: &str, port: u16) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            image_name: format!("repoforge-{}", repo_id),
            port,
            status: DeploymentStatus::Running,
            repo_id: repo_id.to_string(),
            created_at: Utc::now(),
            stopped_at: None,
        }
    }

    #[test]
    fn test_stop_once() {
        let registry = ContainerRegistry::new();
        registry.insert(container("c1", "r1", 4000));

        let stopped = registry.mark_stopped("c1").unwrap();
        assert_eq!(stopped.status, DeploymentStatus::Stopped);
        assert!(stopped.stopped_at.is_some());
        assert!(registry.mark_stopped("c1").is_none());
        assert!(registry.get("c1").is_some());
        assert!(registry.mark_stopped("missing").is_none());
    }

    #[test]
    fn test_list_filter_and_ports() {
        let registry = ContainerRegistry::new();
        registry.insert(container("c1", "r1", 4000));
        registry.insert(container("c2", "r2", 4001));
        registry.mark_stopped("c2");

        assert_eq!(registry.list(None).len(), 2);
        let only_r1 = registry.list(Some("r1"));
        assert_eq!(only_r1.len(), 1);
        assert_eq!(only_r1[0].id, "c1");

        let ports = registry.ports_in_use();
        assert!(ports.contains(&4000));
        assert!(!ports.contains(&4001));
    }

    #[test]
    fn test_reservation_blocks_until_dropped() {
        let registry = ContainerRegistry::new();
        let held = registry.reserve(4555).unwrap();
        assert_eq!(held.port(), 4555);
        assert!(registry.reserve(4555).is_none());
        assert!(registry.ports_in_use().contains(&4555));

        drop(held);
        assert!(registry.reserve(4555).is_some());
    }

    #[test]
    fn test_running_container_keeps_port_after_reservation_ends() {
        let registry = ContainerRegistry::new();
        let held = registry.reserve(4000).unwrap();
        registry.insert(container("c1", "r1", held.port()));
        drop(held);

        assert!(registry.reserve(4000).is_none());
        registry.mark_stopped("c1");
        assert!(registry.reserve(4000).is_some());
    }

    #[test]
    fn test_reserve_any_avoids_held_ports() {
        let registry = ContainerRegistry::new();
        let first = registry.reserve_any().unwrap();
        let second = registry.reserve_any().unwrap();
        assert_ne!(first.port(), second.port());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(container("c1", "r1", 4000)).unwrap();
        assert_eq!(json["imageName"], "repoforge-r1");
        assert_eq!(json["repoId"], "r1");
        assert_eq!(json["status"], "running");
        assert!(json.get("stoppedAt").is_none());
    }
}
