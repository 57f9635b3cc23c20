//! Parsers for lsusb enumeration and the `lsusb -t` topology tree.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A USB device from plain `lsusb` output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbDevice {
    pub bus: String,
    pub device: String,
    pub vendor_id: String,
    pub product_id: String,
    pub description: String,
}

/// Parse `lsusb` output
/// (`Bus 001 Device 002: ID 8087:0024 Intel Corp. ...`).
pub fn parse_lsusb(raw: &str) -> Vec<UsbDevice> {
    let re = Regex::new(r"Bus (\d+) Device (\d+): ID ([0-9a-fA-F]{4}):([0-9a-fA-F]{4})\s*(.*)")
        .expect("static regex");
    raw.lines()
        .filter_map(|line| {
            let caps = re.captures(line)?;
            let description = caps[5].trim();
            Some(UsbDevice {
                bus: caps[1].to_string(),
                device: caps[2].to_string(),
                vendor_id: caps[3].to_lowercase(),
                product_id: caps[4].to_lowercase(),
                description: if description.is_empty() {
                    "Unknown Device".to_string()
                } else {
                    description.to_string()
                },
            })
        })
        .collect()
}

/// One node of the USB topology tree.
///
/// The tree is stored as an arena: nodes own their payload, relationships
/// are integer indices into [`UsbTree::nodes`]. Each node has exactly one
/// parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbTreeNode {
    pub port: u32,
    pub device: u32,
    /// Interface number; absent on root hub lines.
    pub interface: Option<u32>,
    pub class: String,
    pub driver: String,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// The reconstructed `lsusb -t` hierarchy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsbTree {
    pub nodes: Vec<UsbTreeNode>,
    pub roots: Vec<usize>,
}

impl UsbTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Parse `lsusb -t` output, rebuilding the hierarchy from indent depth
/// with an explicit stack of arena indices.
pub fn parse_lsusb_tree(raw: &str) -> UsbTree {
    // Root hub: "/:  Bus 02.Port 1: Dev 1, Class=root_hub, Driver=xhci_hcd/6p, 5000M"
    let root_re = Regex::new(
        r"Bus (\d+)\.Port (\d+): Dev (\d+), Class=([^,]+), Driver=([^,]+)",
    )
    .expect("static regex");
    // Child: "|__ Port 1: Dev 2, If 0, Class=Hub, Driver=hub/4p, 480M"
    let child_re = Regex::new(
        r"Port (\d+): Dev (\d+), If (\d+), Class=([^,]+), Driver=([^,]+)",
    )
    .expect("static regex");

    let mut tree = UsbTree::default();
    // Stack of (depth, node index) leading to the current position.
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let depth = indent_depth(line);

        let node = if line.trim_start().starts_with("/:") {
            root_re.captures(line).map(|caps| UsbTreeNode {
                port: caps[2].parse().unwrap_or(0),
                device: caps[3].parse().unwrap_or(0),
                interface: None,
                class: caps[4].trim().to_string(),
                driver: caps[5].trim().to_string(),
                depth: 0,
                parent: None,
                children: Vec::new(),
            })
        } else {
            child_re.captures(line).map(|caps| UsbTreeNode {
                port: caps[1].parse().unwrap_or(0),
                device: caps[2].parse().unwrap_or(0),
                interface: caps[3].parse().ok(),
                class: caps[4].trim().to_string(),
                driver: caps[5].trim().to_string(),
                depth,
                parent: None,
                children: Vec::new(),
            })
        };
        let Some(mut node) = node else { continue };

        // Unwind to this node's parent depth.
        while stack
            .last()
            .is_some_and(|(parent_depth, _)| *parent_depth >= node.depth)
        {
            stack.pop();
        }

        let index = tree.nodes.len();
        if let Some((_, parent_index)) = stack.last().copied() {
            node.parent = Some(parent_index);
            tree.nodes[parent_index].children.push(index);
        } else {
            tree.roots.push(index);
        }
        let depth = node.depth;
        tree.nodes.push(node);
        stack.push((depth, index));
    }
    tree
}

/// Depth from leading whitespace; lsusb -t indents four columns per level,
/// with root hubs at column zero.
fn indent_depth(line: &str) -> usize {
    if line.trim_start().starts_with("/:") {
        return 0;
    }
    let leading = line.len() - line.trim_start().len();
    (leading / 4).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSUSB: &str = "\
Bus 002 Device 001: ID 1d6b:0003 Linux Foundation 3.0 root hub
Bus 001 Device 003: ID 0bda:8723 Realtek Semiconductor Corp. RTL8723AU 802.11n WLAN Adapter
Bus 001 Device 002: ID 8087:0024 Intel Corp. Integrated Rate Matching Hub
Bus 001 Device 004: ID 0a5c:21e6
";

    #[test]
    fn test_parse_lsusb() {
        let devices = parse_lsusb(LSUSB);
        assert_eq!(devices.len(), 4);
        assert_eq!(devices[1].vendor_id, "0bda");
        assert_eq!(devices[1].product_id, "8723");
        assert_eq!(devices[3].description, "Unknown Device");
    }

    const LSUSB_T: &str = "\
/:  Bus 02.Port 1: Dev 1, Class=root_hub, Driver=xhci_hcd/6p, 5000M
/:  Bus 01.Port 1: Dev 1, Class=root_hub, Driver=xhci_hcd/12p, 480M
    |__ Port 3: Dev 2, If 0, Class=Hub, Driver=hub/4p, 480M
        |__ Port 1: Dev 5, If 0, Class=Human Interface Device, Driver=usbhid, 1.5M
        |__ Port 2: Dev 6, If 0, Class=Vendor Specific Class, Driver=rtl8xxxu, 480M
    |__ Port 4: Dev 3, If 0, Class=Video, Driver=uvcvideo, 480M
";

    #[test]
    fn test_parse_lsusb_tree_structure() {
        let tree = parse_lsusb_tree(LSUSB_T);
        assert_eq!(tree.roots.len(), 2);
        assert_eq!(tree.nodes.len(), 6);

        let second_root = &tree.nodes[tree.roots[1]];
        assert_eq!(second_root.children.len(), 2);

        let hub = &tree.nodes[second_root.children[0]];
        assert_eq!(hub.class, "Hub");
        assert_eq!(hub.children.len(), 2);
        assert_eq!(hub.parent, Some(tree.roots[1]));

        let hid = &tree.nodes[hub.children[0]];
        assert_eq!(hid.driver, "usbhid");
        assert_eq!(hid.depth, 2);
        assert_eq!(hid.parent, Some(second_root.children[0]));
        assert!(hid.children.is_empty());
    }

    #[test]
    fn test_parse_lsusb_tree_sibling_after_unwind() {
        let tree = parse_lsusb_tree(LSUSB_T);
        let second_root = &tree.nodes[tree.roots[1]];
        // The Video device is a sibling of the hub, not its child.
        let video = &tree.nodes[second_root.children[1]];
        assert_eq!(video.class, "Video");
        assert_eq!(video.depth, 1);
    }

    #[test]
    fn test_parse_lsusb_tree_empty() {
        assert!(parse_lsusb_tree("").is_empty());
    }
}
