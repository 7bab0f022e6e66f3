//! `topo`: edit a topology file from the command line
//!
//! Every mutating subcommand prints its `SaveResult` as JSON and exits
//! non-zero when it failed.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use topo_io::{SaveResult, TopologyIo, TopologyIoConfig};
use topo_model::{
    effective_node_config, split_endpoint, LinkIdentity, LinkSaveData, LinkType, NodeProperties,
    NodeProperty, NodeSaveData, Position, PropertyMap,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "topo", version, about = "Edit containerlab topology files in place")]
struct Cli {
    /// Topology file
    topology: PathBuf,

    /// Session configuration (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print nodes with their effective configuration, and links
    Show,
    /// Add a node
    AddNode {
        /// Node identifier
        id: String,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        image: Option<String>,
        #[arg(long)]
        group: Option<String>,
        /// Canvas position as `x,y`
        #[arg(long, value_parser = parse_position)]
        position: Option<Position>,
    },
    /// Delete a node and its links
    DeleteNode {
        /// Node identifier
        id: String,
    },
    /// Rename a node, rewriting its links and annotations
    RenameNode {
        /// Current identifier
        old: String,
        /// New identifier
        new: String,
    },
    /// Add a link between `node:interface` endpoints
    AddLink {
        /// First endpoint
        a: String,
        /// Second endpoint; omitted for single-endpoint types
        b: Option<String>,
        #[arg(long = "type", default_value = "veth")]
        link_type: LinkType,
        #[arg(long)]
        mtu: Option<u32>,
        /// Host-side interface of host, mgmt-net and macvlan links
        #[arg(long)]
        host_interface: Option<String>,
    },
    /// Delete the link between two endpoints
    DeleteLink {
        /// First endpoint
        a: String,
        /// Second endpoint
        b: String,
    },
}

#[derive(Debug, Serialize)]
struct Overview {
    name: Option<String>,
    nodes: BTreeMap<String, PropertyMap>,
    links: Vec<LinkSaveData>,
}

fn parse_position(text: &str) -> Result<Position, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {text:?}"))?;
    let coordinate = |s: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|err| format!("bad coordinate {s:?}: {err}"))
    };
    Ok(Position::new(coordinate(x)?, coordinate(y)?))
}

fn load_config(path: Option<&PathBuf>) -> Result<TopologyIoConfig> {
    let Some(path) = path else {
        return Ok(TopologyIoConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    TopologyIoConfig::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn link_data(a: &str, b: Option<&str>, link_type: LinkType) -> Result<LinkSaveData> {
    let (node, interface) = split_endpoint(a);
    match b {
        Some(b) => {
            let (target, target_interface) = split_endpoint(b);
            Ok(LinkSaveData::new(node, interface, target, target_interface).with_type(link_type))
        }
        None if link_type.is_single_endpoint() => Ok(LinkSaveData::single(link_type, node, interface)),
        None => bail!("{link_type} links need two endpoints"),
    }
}

/// Node's own whitelisted properties, so a rename keeps them
fn own_properties(io: &TopologyIo, id: &str) -> NodeProperties {
    io.document()
        .get_path(&["topology", "nodes", id])
        .map(|node| node.to_value())
        .and_then(|value| value.as_mapping().map(NodeProperties::from_mapping))
        .unwrap_or_default()
}

fn overview(io: &TopologyIo) -> Overview {
    let document = io.document();
    let nodes = io
        .node_ids()
        .into_iter()
        .filter_map(|id| effective_node_config(document, &id).map(|config| (id, config)))
        .collect();
    Overview {
        name: document
            .get_path(&["name"])
            .and_then(|node| node.as_str())
            .map(str::to_owned),
        nodes,
        links: io.links(),
    }
}

async fn run(cli: Cli) -> Result<SaveResult> {
    let config = load_config(cli.config.as_ref())?;
    let mut io = TopologyIo::open(&cli.topology, config)
        .await
        .with_context(|| format!("opening {}", cli.topology.display()))?;

    let result = match cli.command {
        Command::Show => {
            println!("{}", serde_json::to_string_pretty(&overview(&io))?);
            return Ok(SaveResult::ok());
        }
        Command::AddNode {
            id,
            kind,
            image,
            group,
            position,
        } => {
            let mut data = NodeSaveData::new(id);
            for (property, value) in [
                (NodeProperty::Kind, kind),
                (NodeProperty::Image, image),
                (NodeProperty::Group, group),
            ] {
                if let Some(value) = value {
                    data = data.with_property(property, value);
                }
            }
            if let Some(position) = position {
                data = data.with_position(position);
            }
            io.add_node(&data).await
        }
        Command::DeleteNode { id } => io.delete_node(&id).await,
        Command::RenameNode { old, new } => {
            let mut data = NodeSaveData::new(old.as_str()).with_name(new);
            data.properties = own_properties(&io, &old);
            io.edit_node(&data).await
        }
        Command::AddLink {
            a,
            b,
            link_type,
            mtu,
            host_interface,
        } => {
            let mut link = link_data(&a, b.as_deref(), link_type)?;
            link.mtu = mtu;
            link.host_interface = host_interface;
            io.add_link(&link).await
        }
        Command::DeleteLink { a, b } => io.delete_link(&LinkIdentity::from_endpoints(&a, &b)).await,
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let show = matches!(cli.command, Command::Show);
    let result = run(cli).await?;
    if !show {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_link_with_type() {
        let cli = Cli::try_parse_from([
            "topo", "lab.clab.yml", "add-link", "r1:eth1", "--type", "host", "--host-interface", "r1-eth1",
        ])
        .unwrap();
        match cli.command {
            Command::AddLink {
                a,
                b,
                link_type,
                host_interface,
                ..
            } => {
                assert_eq!(a, "r1:eth1");
                assert_eq!(b, None);
                assert_eq!(link_type, LinkType::Host);
                assert_eq!(host_interface.as_deref(), Some("r1-eth1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn position_argument() {
        assert_eq!(parse_position("10.5, -3").unwrap(), Position::new(10.5, -3.0));
        assert!(parse_position("10").is_err());
        assert!(parse_position("a,b").is_err());
    }

    #[test]
    fn single_endpoint_links_need_a_single_type() {
        let host = link_data("r1:eth1", None, LinkType::Host).unwrap();
        assert_eq!(host.canonical_key(), LinkSaveData::single(LinkType::Host, "r1", "eth1").canonical_key());
        assert!(link_data("r1:eth1", None, LinkType::Veth).is_err());
    }

    #[tokio::test]
    async fn rename_keeps_own_properties() {
        let (_dir, path) = topo_test_utils::temp_topology(topo_test_utils::SAMPLE_TOPOLOGY);
        let cli = Cli {
            topology: path.clone(),
            config: None,
            command: Command::RenameNode {
                old: "leaf1".into(),
                new: "leaf9".into(),
            },
        };
        let result = run(cli).await.unwrap();
        assert!(result.success);
        assert_eq!(result.renamed.map(|r| r.new_id), Some("leaf9".to_string()));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("    leaf9:\n      image: ghcr.io/nokia/srlinux:23.10   # pinned\n"));
    }
}
