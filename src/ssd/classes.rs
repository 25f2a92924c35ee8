use image::Rgba;
use lazy_static::*;
use std::collections::HashMap;

lazy_static! {
    /// matplotlib single letter colors
    static ref NAMED_COLORS: HashMap<char, Rgba<u8>> = {
        let mut colors = HashMap::new();
        colors.insert('w', Rgba([255, 255, 255, 255]));
        colors.insert('r', Rgba([255, 0, 0, 255]));
        colors.insert('b', Rgba([0, 0, 255, 255]));
        colors.insert('g', Rgba([0, 128, 0, 255]));
        colors.insert('c', Rgba([0, 191, 191, 255]));
        colors.insert('m', Rgba([191, 0, 191, 255]));
        colors.insert('y', Rgba([191, 191, 0, 255]));
        colors.insert('k', Rgba([0, 0, 0, 255]));
        colors
    };
}

/// Box colors cycle through this list by class index
const BOX_COLORS: [char; 11] = ['w', 'r', 'b', 'g', 'c', 'm', 'y', 'g', 'c', 'm', 'k'];

pub fn named_color(name: char) -> Rgba<u8> {
    NAMED_COLORS
        .get(&name)
        .copied()
        .unwrap_or(Rgba([0, 0, 0, 255]))
}

pub fn box_color(category: u32) -> Rgba<u8> {
    named_color(BOX_COLORS[category as usize % BOX_COLORS.len()])
}

/// Class index to class name lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ClassTable {
    classes: Vec<String>,
}

impl ClassTable {
    pub fn new(classes: Vec<String>) -> ClassTable {
        ClassTable { classes }
    }

    /// Unknown indexes get a placeholder name instead of failing the whole plot
    pub fn index2class(&self, index: u32) -> String {
        self.classes
            .get(index as usize)
            .cloned()
            .unwrap_or_else(|| format!("class {}", index))
    }
}
