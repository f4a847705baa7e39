//! Simulated router
//!
//! A small device model whose console is driven by the interpreter. Its state
//! is shared by every session attached to the same device.

pub mod commands;

use anyhow::anyhow;
use chrono::{DateTime, Local};
use indexmap::IndexMap;
use std::fmt::Write as _;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, MutexGuard};

/// Configuration of one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceState {
    pub description: Option<String>,
    pub address: Option<(Ipv4Addr, Ipv4Addr)>,
    pub shutdown: bool,
    pub speed: String,
}

impl Default for InterfaceState {
    fn default() -> Self {
        Self {
            description: None,
            address: None,
            shutdown: false,
            speed: "auto".to_string(),
        }
    }
}

/// One OSPF routing process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OspfProcess {
    pub networks: Vec<(String, i64)>,
}

/// Mutable device state
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub hostname: String,
    pub interfaces: IndexMap<String, InterfaceState>,
    pub ospf: IndexMap<i64, OspfProcess>,
    pub booted_at: DateTime<Local>,
}

impl DeviceState {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            interfaces: IndexMap::new(),
            ospf: IndexMap::new(),
            booted_at: Local::now(),
        }
    }

    /// Interface entry, created on first use
    pub fn interface_mut(&mut self, name: &str) -> &mut InterfaceState {
        self.interfaces.entry(name.to_string()).or_default()
    }

    /// Configuration in `show running-config` form
    pub fn running_config(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "hostname {}", self.hostname);
        out.push_str("!\n");

        for (name, iface) in &self.interfaces {
            let _ = writeln!(out, "interface {name}");
            if let Some(description) = &iface.description {
                let _ = writeln!(out, " description {description}");
            }
            if let Some((addr, mask)) = iface.address {
                let _ = writeln!(out, " ip address {addr} {mask}");
            }
            if iface.speed != "auto" {
                let _ = writeln!(out, " speed {}", iface.speed);
            }
            if iface.shutdown {
                out.push_str(" shutdown\n");
            }
            out.push_str("!\n");
        }

        for (id, process) in &self.ospf {
            let _ = writeln!(out, "router ospf {id}");
            for (prefix, area) in &process.networks {
                let _ = writeln!(out, " network {prefix} {area}");
            }
            out.push_str("!\n");
        }

        out.push_str("end\n");
        out
    }

    /// One status line per interface, optionally filtered by name
    pub fn interface_summary(&self, only: Option<&str>) -> anyhow::Result<String> {
        let mut out = String::new();
        for (name, iface) in &self.interfaces {
            if only.is_some_and(|wanted| wanted != name.as_str()) {
                continue;
            }
            let status = if iface.shutdown {
                "administratively down"
            } else {
                "up"
            };
            let address = iface
                .address
                .map(|(addr, mask)| format!("{addr} {mask}"))
                .unwrap_or_else(|| "unassigned".to_string());
            let _ = writeln!(out, "{name} is {status}, address {address}, speed {}", iface.speed);
        }

        if out.is_empty() {
            return match only {
                Some(name) => Err(anyhow!("interface {name} does not exist")),
                None => Ok("no interfaces configured\n".to_string()),
            };
        }
        Ok(out)
    }
}

/// Handle to a simulated router, cheap to clone
#[derive(Debug, Clone)]
pub struct Device {
    state: Arc<Mutex<DeviceState>>,
}

impl Device {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DeviceState::new(hostname))),
        }
    }

    /// Lock the shared state
    pub fn state(&self) -> anyhow::Result<MutexGuard<'_, DeviceState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("device state lock poisoned"))
    }

    /// Current hostname, used for prompts
    pub fn hostname(&self) -> String {
        self.state()
            .map(|state| state.hostname.clone())
            .unwrap_or_else(|_| "router".to_string())
    }
}
