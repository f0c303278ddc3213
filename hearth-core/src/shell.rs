//! Shell layout table
//!
//! Records which item a plugin attached to which area of the shell, and at
//! which rank. Nothing here renders; consumers read the table.

use std::collections::BTreeMap;

use hearth_plugin_api::{ShellArea, ShellItem};

/// An item placed in the shell by a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedItem {
    pub plugin: String,
    pub item: ShellItem,
}

/// Shell items grouped by area, each area ordered by rank
#[derive(Debug, Default)]
pub struct ShellLayout {
    areas: BTreeMap<ShellArea, Vec<PlacedItem>>,
}

impl ShellLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach items for a plugin. Items with equal rank keep attach order.
    pub fn attach(&mut self, plugin: &str, items: Vec<ShellItem>) {
        for item in items {
            tracing::debug!(plugin, item = %item.id, area = item.area.as_str(), rank = item.rank, "Shell item attached");
            let area = self.areas.entry(item.area).or_default();
            let at = area.partition_point(|placed| placed.item.rank <= item.rank);
            area.insert(
                at,
                PlacedItem {
                    plugin: plugin.to_string(),
                    item,
                },
            );
        }
    }

    /// Items in `area`, lowest rank first
    pub fn area(&self, area: ShellArea) -> &[PlacedItem] {
        self.areas.get(&area).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every non-empty area with its items
    pub fn areas(&self) -> impl Iterator<Item = (ShellArea, &[PlacedItem])> {
        self.areas
            .iter()
            .filter(|(_, items)| !items.is_empty())
            .map(|(area, items)| (*area, items.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.areas.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
