//! Router console command set
//!
//! Exec mode offers `show`, `echo` and `configure terminal`. Configuration
//! mode nests `interface` and `router ospf` sub-contexts, each with its own
//! `exit` and `end`.

use crate::config::validate_hostname;
use crate::core::handler::{self, Output, handler};
use crate::core::params::ParamSpec;
use crate::core::tree::CommandTree;
use crate::device::Device;
use crate::error::RegistrationError;
use anyhow::{Context as _, anyhow, bail};
use chrono::Local;
use std::net::Ipv4Addr;
use tracing::{info, instrument};

const CONFIG: &[&str] = &["configure", "terminal"];
const INTERFACE: &[&str] = &["configure", "terminal", "interface"];
const OSPF: &[&str] = &["configure", "terminal", "router", "ospf"];

fn at<'a>(base: &[&'a str], tail: &[&'a str]) -> Vec<&'a str> {
    base.iter().chain(tail).copied().collect()
}

impl Device {
    /// Build the console command tree for this device.
    ///
    /// The tree is returned unfrozen so callers may add their own commands.
    #[instrument(skip(self))]
    pub fn command_tree(&self) -> Result<CommandTree, RegistrationError> {
        let mut tree = CommandTree::new();
        self.register_exec(&mut tree)?;
        self.register_config(&mut tree)?;
        self.register_interface(&mut tree)?;
        self.register_ospf(&mut tree)?;
        info!("Registered router command set ({} nodes)", tree.len());
        Ok(tree)
    }

    fn register_exec(&self, tree: &mut CommandTree) -> Result<(), RegistrationError> {
        tree.group(&["show"], "Show running system information")?;

        let device = self.clone();
        let id = tree.register(
            &["show", "version"],
            vec![],
            handler(move |_, _| {
                let state = device.state()?;
                let uptime = Local::now() - state.booted_at;
                Ok(Output::text(format!(
                    "netsim router software, version {}\n{} uptime is {} seconds",
                    env!("CARGO_PKG_VERSION"),
                    state.hostname,
                    uptime.num_seconds()
                )))
            }),
            false,
        )?;
        tree.set_help(id, "System hardware and software status")?;

        let id = tree.register(
            &["show", "clock"],
            vec![],
            handler(|_, _| {
                Ok(Output::text(
                    Local::now().format("%H:%M:%S%.3f %Z %a %b %d %Y").to_string(),
                ))
            }),
            false,
        )?;
        tree.set_help(id, "Display the system clock")?;

        let device = self.clone();
        let id = tree.register(
            &["show", "interfaces"],
            vec![ParamSpec::string("name").optional()],
            handler(move |params, _| {
                let state = device.state()?;
                Ok(Output::text(state.interface_summary(params.get_str("name"))?))
            }),
            false,
        )?;
        tree.set_help(id, "Interface status and configuration")?;

        let device = self.clone();
        let id = tree.register(
            &["show", "running-config"],
            vec![],
            handler(move |_, _| Ok(Output::text(device.state()?.running_config()))),
            false,
        )?;
        tree.set_help(id, "Current operating configuration")?;

        let id = tree.register(
            &["echo"],
            vec![ParamSpec::vararg("text").optional()],
            handler(|params, _| {
                Ok(Output::text(
                    params.get_list("text").unwrap_or_default().join(" "),
                ))
            }),
            false,
        )?;
        tree.set_help(id, "Echo the given text")?;

        let id = tree.register(&["exit"], vec![], handler::exit(), false)?;
        tree.set_help(id, "Exit from the EXEC")?;

        tree.group(&["configure"], "Enter configuration mode")?;
        Ok(())
    }

    fn register_config(&self, tree: &mut CommandTree) -> Result<(), RegistrationError> {
        let id = tree.register(CONFIG, vec![], handler(|_, _| Ok(Output::enter())), true)?;
        tree.set_help(id, "Configure from the terminal")?;
        tree.set_context_label(id, "config")?;

        let device = self.clone();
        let id = tree.register(
            &at(CONFIG, &["hostname"]),
            vec![ParamSpec::string("name")],
            handler(move |params, _| {
                let name = params
                    .get_str("name")
                    .ok_or_else(|| anyhow!("hostname not bound"))?;
                validate_hostname(name)?;
                device.state()?.hostname = name.to_string();
                Ok(Output::empty())
            }),
            false,
        )?;
        tree.set_help(id, "Set system's network name")?;

        let device = self.clone();
        let id = tree.register(
            &at(CONFIG, &["interface"]),
            vec![ParamSpec::string("name")],
            handler(move |params, _| {
                let name = params
                    .get_str("name")
                    .ok_or_else(|| anyhow!("interface name not bound"))?;
                device.state()?.interface_mut(name);
                Ok(Output::enter())
            }),
            true,
        )?;
        tree.set_help(id, "Select an interface to configure")?;
        tree.set_context_label(id, "config-if")?;

        tree.group(&at(CONFIG, &["router"]), "Enable a routing process")?;
        let device = self.clone();
        let id = tree.register(
            OSPF,
            vec![ParamSpec::integer("process-id", 1, 65535)],
            handler(move |params, _| {
                let pid = params
                    .get_int("process-id")
                    .ok_or_else(|| anyhow!("process id not bound"))?;
                device.state()?.ospf.entry(pid).or_default();
                Ok(Output::enter())
            }),
            true,
        )?;
        tree.set_help(id, "Open Shortest Path First (OSPF)")?;
        tree.set_context_label(id, "config-router")?;

        register_leave(tree, CONFIG)
    }

    fn register_interface(&self, tree: &mut CommandTree) -> Result<(), RegistrationError> {
        tree.group(&at(INTERFACE, &["ip"]), "Interface Internet Protocol config commands")?;

        let device = self.clone();
        let id = tree.register(
            &at(INTERFACE, &["ip", "address"]),
            vec![ParamSpec::string("address"), ParamSpec::string("mask")],
            handler(move |params, ctx| {
                let iface = ctx
                    .params()
                    .get_str("name")
                    .ok_or_else(|| anyhow!("not in interface context"))?;
                let address = parse_ipv4(params.get_str("address"), "address")?;
                let mask = parse_ipv4(params.get_str("mask"), "mask")?;
                if !is_contiguous_mask(mask) {
                    bail!("{mask} is not a valid subnet mask");
                }
                device.state()?.interface_mut(iface).address = Some((address, mask));
                Ok(Output::empty())
            }),
            false,
        )?;
        tree.set_help(id, "Set the IP address of an interface")?;

        let id = tree.register(
            &at(INTERFACE, &["shutdown"]),
            vec![],
            self.set_shutdown(true),
            false,
        )?;
        tree.set_help(id, "Shutdown the selected interface")?;

        tree.group(&at(INTERFACE, &["no"]), "Negate a command or set its defaults")?;
        let id = tree.register(
            &at(INTERFACE, &["no", "shutdown"]),
            vec![],
            self.set_shutdown(false),
            false,
        )?;
        tree.set_help(id, "Enable the selected interface")?;

        let device = self.clone();
        let id = tree.register(
            &at(INTERFACE, &["description"]),
            vec![ParamSpec::vararg("text")],
            handler(move |params, ctx| {
                let iface = ctx
                    .params()
                    .get_str("name")
                    .ok_or_else(|| anyhow!("not in interface context"))?;
                let text = params.get_list("text").unwrap_or_default().join(" ");
                device.state()?.interface_mut(iface).description = Some(text);
                Ok(Output::empty())
            }),
            false,
        )?;
        tree.set_help(id, "Interface specific description")?;

        let device = self.clone();
        let id = tree.register(
            &at(INTERFACE, &["speed"]),
            vec![ParamSpec::one_of("speed", ["10", "100", "1000", "auto"])],
            handler(move |params, ctx| {
                let iface = ctx
                    .params()
                    .get_str("name")
                    .ok_or_else(|| anyhow!("not in interface context"))?;
                let speed = params
                    .get_str("speed")
                    .ok_or_else(|| anyhow!("speed not bound"))?;
                device.state()?.interface_mut(iface).speed = speed.to_string();
                Ok(Output::empty())
            }),
            false,
        )?;
        tree.set_help(id, "Configure speed operation")?;

        register_leave(tree, INTERFACE)
    }

    fn register_ospf(&self, tree: &mut CommandTree) -> Result<(), RegistrationError> {
        let device = self.clone();
        let id = tree.register(
            &at(OSPF, &["network"]),
            vec![
                ParamSpec::string("prefix"),
                ParamSpec::integer("area", 0, i64::from(u32::MAX)),
            ],
            handler(move |params, ctx| {
                let pid = ctx
                    .params()
                    .get_int("process-id")
                    .ok_or_else(|| anyhow!("not in router context"))?;
                let prefix = params
                    .get_str("prefix")
                    .ok_or_else(|| anyhow!("prefix not bound"))?;
                let area = params.get_int("area").ok_or_else(|| anyhow!("area not bound"))?;
                validate_prefix(prefix)?;

                let mut state = device.state()?;
                let process = state.ospf.entry(pid).or_default();
                if !process.networks.iter().any(|(p, a)| p == prefix && *a == area) {
                    process.networks.push((prefix.to_string(), area));
                }
                Ok(Output::empty())
            }),
            false,
        )?;
        tree.set_help(id, "Enable routing on an IP network")?;

        register_leave(tree, OSPF)
    }

    fn set_shutdown(&self, shutdown: bool) -> impl handler::Handler + use<> {
        let device = self.clone();
        handler(move |_, ctx| {
            let iface = ctx
                .params()
                .get_str("name")
                .ok_or_else(|| anyhow!("not in interface context"))?;
            device.state()?.interface_mut(iface).shutdown = shutdown;
            Ok(Output::empty())
        })
    }
}

/// `exit` and `end` inside a configuration context
fn register_leave(tree: &mut CommandTree, base: &[&str]) -> Result<(), RegistrationError> {
    let id = tree.register(&at(base, &["exit"]), vec![], handler::exit(), false)?;
    tree.set_help(id, "Exit from the current mode")?;
    let id = tree.register(&at(base, &["end"]), vec![], handler::end(), false)?;
    tree.set_help(id, "Exit to EXEC mode")?;
    Ok(())
}

fn parse_ipv4(value: Option<&str>, what: &str) -> anyhow::Result<Ipv4Addr> {
    let value = value.ok_or_else(|| anyhow!("{what} not bound"))?;
    value
        .parse()
        .with_context(|| format!("invalid IPv4 {what} '{value}'"))
}

fn is_contiguous_mask(mask: Ipv4Addr) -> bool {
    let bits = u32::from(mask);
    bits.leading_ones() + bits.trailing_zeros() == 32
}

/// Accepts `a.b.c.d/len` with `len` in 0..=32
fn validate_prefix(prefix: &str) -> anyhow::Result<()> {
    let (addr, len) = prefix
        .split_once('/')
        .ok_or_else(|| anyhow!("prefix '{prefix}' must be written as a.b.c.d/len"))?;
    addr.parse::<Ipv4Addr>()
        .with_context(|| format!("invalid network address '{addr}'"))?;
    let len: u8 = len
        .parse()
        .with_context(|| format!("invalid prefix length '{len}'"))?;
    if len > 32 {
        bail!("prefix length {len} exceeds 32");
    }
    Ok(())
}
