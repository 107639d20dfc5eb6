use crate::geom::coord::GridCoord;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayerData {
    pub index: u8,
    pub vertical_capacity: u32,
    pub horizontal_capacity: u32,
    pub min_width: u32,
    pub min_spacing: u32,
    pub via_spacing: u32,
}

impl LayerData {
    /// Raw capacity consumed by one wire on this layer.
    pub fn wire_pitch(&self) -> u32 {
        self.min_width + self.min_spacing
    }
}

/// A pin in real coordinates; `layer` is 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinData {
    pub x: u32,
    pub y: u32,
    pub layer: u8,
}

#[derive(Clone, Debug)]
pub struct NetData {
    pub name: String,
    pub index: u32,
    pub min_width: u32,
    pub pins: Vec<PinData>,
}

/// Overrides the raw capacity of the edge between two adjacent gcells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityAdjustment {
    pub from: GridCoord,
    pub to: GridCoord,
    pub capacity: u32,
}

pub struct DesignDB {
    pub grid_x: u32,
    pub grid_y: u32,
    pub layers: Vec<LayerData>,

    pub origin_x: u32,
    pub origin_y: u32,
    pub tile_width: u32,
    pub tile_height: u32,

    pub nets: Vec<NetData>,
    pub adjustments: Vec<CapacityAdjustment>,

    pub net_name_map: HashMap<String, usize>,
}

impl DesignDB {
    pub fn new() -> Self {
        Self {
            grid_x: 0,
            grid_y: 0,
            layers: Vec::new(),
            origin_x: 0,
            origin_y: 0,
            tile_width: 1,
            tile_height: 1,
            nets: Vec::with_capacity(1000),
            adjustments: Vec::new(),
            net_name_map: HashMap::new(),
        }
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
    pub fn num_nets(&self) -> usize {
        self.nets.len()
    }

    pub fn add_layer(&mut self, vertical_capacity: u32, horizontal_capacity: u32) -> u8 {
        let idx = self.layers.len() as u8;
        self.layers.push(LayerData {
            index: idx,
            vertical_capacity,
            horizontal_capacity,
            min_width: 1,
            min_spacing: 0,
            via_spacing: 0,
        });
        idx
    }

    pub fn add_net(&mut self, name: String, index: u32, min_width: u32) -> usize {
        if let Some(&id) = self.net_name_map.get(&name) {
            return id;
        }
        let id = self.nets.len();
        self.nets.push(NetData {
            name: name.clone(),
            index,
            min_width,
            pins: Vec::new(),
        });
        self.net_name_map.insert(name, id);
        id
    }

    pub fn add_pin(&mut self, net: usize, x: u32, y: u32, layer: u8) {
        self.nets[net].pins.push(PinData { x, y, layer });
    }

    pub fn net_by_name(&self, name: &str) -> Option<&NetData> {
        self.net_name_map.get(name).map(|&id| &self.nets[id])
    }
}

impl Default for DesignDB {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_net_names_share_an_entry() {
        let mut db = DesignDB::new();
        let a = db.add_net("n0".to_string(), 0, 1);
        let b = db.add_net("n0".to_string(), 7, 1);
        assert_eq!(a, b);
        db.add_pin(a, 5, 5, 0);
        assert_eq!(db.num_nets(), 1);
        assert_eq!(db.net_by_name("n0").unwrap().pins.len(), 1);
    }
}
