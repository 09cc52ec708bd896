//! In-memory raster the client draws into
//!
//! One cell per canvas unit. Painting stamps round brush dabs along each
//! segment; erasing clears the cells it covers.

use crate::messages::{Composite, Entry, Point, Style};
use crate::reconstruct::{Renderer, StrokeContinuityReconstructor};

/// Distance between brush dabs along a segment
const DAB_SPACING: f64 = 0.5;

/// Upper bound on dabs stamped for one segment
const MAX_DABS: usize = 8192;

pub type Rgb = (u8, u8, u8);

/// Parse `#rgb` or `#rrggbb`
pub fn parse_hex_color(color: &str) -> Option<Rgb> {
    let hex = color.strip_prefix('#').filter(|hex| hex.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
            Some((short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    cells: Vec<Option<Rgb>>,
    fallback: Rgb,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
            fallback: (255, 255, 255),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            None
        }
    }

    pub fn painted(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Every painted cell as `(x, y, color)`
    pub fn iter_painted(&self) -> impl Iterator<Item = (usize, usize, Rgb)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.map(|rgb| (i % self.width, i / self.width, rgb))
        })
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Change dimensions, keeping the overlapping region
    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        let mut cells = vec![None; width * height];
        for y in 0..height.min(self.height) {
            for x in 0..width.min(self.width) {
                cells[y * width + x] = self.cells[y * self.width + x];
            }
        }
        self.width = width;
        self.height = height;
        self.cells = cells;
    }

    /// Clear and re-render a history snapshot
    pub fn replay(&mut self, entries: &[Entry]) {
        self.clear();
        StrokeContinuityReconstructor::replay(entries, self);
    }

    fn ink(&self, style: &Style) -> Option<Rgb> {
        match style.composite {
            Composite::Erase => None,
            Composite::Normal => Some(parse_hex_color(&style.color).unwrap_or(self.fallback)),
        }
    }

    fn stamp(&mut self, center: Point, radius: f64, ink: Option<Rgb>) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let radius = radius.max(0.5);
        let min_x = (center.x - radius).floor().max(0.0) as usize;
        let min_y = (center.y - radius).floor().max(0.0) as usize;
        let max_x = (center.x + radius).ceil().min((self.width - 1) as f64);
        let max_y = (center.y + radius).ceil().min((self.height - 1) as f64);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        for y in min_y..=max_y as usize {
            for x in min_x..=max_x as usize {
                let cell_center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                if cell_center.distance(&center) <= radius {
                    self.cells[y * self.width + x] = ink;
                }
            }
        }
    }
}

impl Renderer for Surface {
    fn line(&mut self, from: Point, to: Point, style: &Style) {
        let ink = self.ink(style);
        let radius = style.size / 2.0;
        let steps = (from.distance(&to) / DAB_SPACING)
            .ceil()
            .clamp(1.0, MAX_DABS as f64) as usize;
        for i in 0..=steps {
            self.stamp(from.lerp(&to, i as f64 / steps as f64), radius, ink);
        }
    }

    fn dot(&mut self, at: Point, style: &Style) {
        let ink = self.ink(style);
        self.stamp(at, style.size / 2.0, ink);
    }
}
