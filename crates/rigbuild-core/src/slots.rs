use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::{BuildTable, ItemId, LineItem};

/// Fixed component slots of the build selector, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Processor,
    Motherboard,
    #[serde(rename = "CPUCooler")]
    CpuCooler,
    Case,
    GraphicsCard,
    #[serde(rename = "RAM")]
    Ram,
    Storage,
    CaseCooler,
    PowerSupply,
    Monitor,
    Accessories,
}

impl Slot {
    pub const ALL: [Slot; 11] = [
        Slot::Processor,
        Slot::Motherboard,
        Slot::CpuCooler,
        Slot::Case,
        Slot::GraphicsCard,
        Slot::Ram,
        Slot::Storage,
        Slot::CaseCooler,
        Slot::PowerSupply,
        Slot::Monitor,
        Slot::Accessories,
    ];

    /// Category name used in routes and API paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Processor => "Processor",
            Slot::Motherboard => "Motherboard",
            Slot::CpuCooler => "CPUCooler",
            Slot::Case => "Case",
            Slot::GraphicsCard => "GraphicsCard",
            Slot::Ram => "RAM",
            Slot::Storage => "Storage",
            Slot::CaseCooler => "CaseCooler",
            Slot::PowerSupply => "PowerSupply",
            Slot::Monitor => "Monitor",
            Slot::Accessories => "Accessories",
        }
    }

    fn index(self) -> usize {
        Slot::ALL
            .iter()
            .position(|s| *s == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSlot(pub String);

impl fmt::Display for UnknownSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown component category '{}' (expected one of: {})",
            self.0,
            Slot::ALL.map(Slot::as_str).join(", ")
        )
    }
}

impl std::error::Error for UnknownSlot {}

impl FromStr for Slot {
    type Err = UnknownSlot;

    /// Accepts route names ("GraphicsCard") and server labels ("Graphics Cards").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        slot_for_label(s.trim()).ok_or_else(|| UnknownSlot(s.to_string()))
    }
}

/// Server category label → slot. Labels the build flow does not offer
/// (Laptop, Desktop, ...) are deliberately absent.
pub const CATEGORY_TABLE: &[(&str, Slot)] = &[
    ("Processors", Slot::Processor),
    ("Graphics Cards", Slot::GraphicsCard),
    ("Motherboards", Slot::Motherboard),
    ("CPU Cooler", Slot::CpuCooler),
    ("Case", Slot::Case),
    ("RAM", Slot::Ram),
    ("Storage", Slot::Storage),
    ("Case Cooler", Slot::CaseCooler),
    ("Power Supply", Slot::PowerSupply),
    ("Monitor", Slot::Monitor),
    ("Accessories", Slot::Accessories),
    ("Expensions & Networking", Slot::Accessories),
];

/// Table lookup first, then the slot's own route name.
pub fn slot_for_label(label: &str) -> Option<Slot> {
    CATEGORY_TABLE
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, s)| *s)
        .or_else(|| Slot::ALL.into_iter().find(|s| s.as_str() == label))
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Selected(LineItem),
}

impl SlotState {
    pub fn is_selected(&self) -> bool {
        matches!(self, SlotState::Selected(_))
    }

    pub fn line_item(&self) -> Option<&LineItem> {
        match self {
            SlotState::Selected(item) => Some(item),
            SlotState::Empty => None,
        }
    }
}

/// A populated row the board cannot show: its category label has no slot, or
/// another row for the same slot came later and took its place.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    pub label: String,
    pub item: LineItem,
}

/// Per-slot view of a build. Always derived from a [`BuildTable`]; there is
/// no way to fill a slot other than rebuilding from a server snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotBoard {
    states: [SlotState; 11],
    dropped: Vec<DroppedRow>,
}

impl SlotBoard {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_table(table: &BuildTable) -> Self {
        let mut board = Self::default();
        for row in &table.components {
            let Some(item) = LineItem::from_row(row) else {
                continue;
            };
            match slot_for_label(&row.component_type) {
                Some(slot) => {
                    let state = &mut board.states[slot.index()];
                    if let SlotState::Selected(prev) =
                        std::mem::replace(state, SlotState::Selected(item))
                    {
                        warn!(
                            build = %table.assembly_id,
                            slot = %slot,
                            label = %prev.product.category,
                            product = %prev.product.id,
                            "another row took this slot, listing the earlier one as not shown"
                        );
                        board.dropped.push(DroppedRow {
                            label: prev.product.category.clone(),
                            item: prev,
                        });
                    }
                }
                None => {
                    warn!(
                        build = %table.assembly_id,
                        label = %row.component_type,
                        "no slot for component category, dropping row"
                    );
                    board.dropped.push(DroppedRow {
                        label: row.component_type.clone(),
                        item,
                    });
                }
            }
        }
        board
    }

    pub fn get(&self, slot: Slot) -> &SlotState {
        &self.states[slot.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &SlotState)> {
        Slot::ALL.into_iter().zip(self.states.iter())
    }

    pub fn selected_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_selected()).count()
    }

    pub fn empty_count(&self) -> usize {
        Slot::ALL.len() - self.selected_count()
    }

    /// Rows the last rebuild could not place in a slot.
    pub fn dropped(&self) -> &[DroppedRow] {
        &self.dropped
    }

    pub fn slot_of_item(&self, item_id: &ItemId) -> Option<Slot> {
        self.iter()
            .find(|(_, state)| {
                state
                    .line_item()
                    .and_then(|i| i.item_id.as_ref())
                    .is_some_and(|id| id == item_id)
            })
            .map(|(slot, _)| slot)
    }

    /// Clear a slot after the server acknowledged a removal. The caller
    /// reconciles right after, so this only bridges the gap until then.
    pub fn clear(&mut self, slot: Slot) {
        self.states[slot.index()] = SlotState::Empty;
    }
}
