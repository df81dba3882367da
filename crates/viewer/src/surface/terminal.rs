//! Character-cell rendering of a [`MemorySurface`].
//!
//! The viewport is fitted to the bounding box of every feature on the
//! surface, with north up. Lines are sampled once per cell; circles become a
//! single glyph whose weight follows the evaluated `circle-radius`.

use std::io::{self, Write};

use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};
use geojson::Feature;
use palette::Srgb;

use crate::style::{Expression, LayerSpec, LayerType, PaintProperty};
use crate::surface::{
    CursorStyle, MapSurface, MemorySurface, PointerEventKind, SurfaceError, SurfaceEvent,
};

const MIN_SPAN: f64 = 1e-3;
const PADDING: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub bounds: Rect<f64>,
    pub columns: usize,
    pub rows: usize,
}

impl Viewport {
    fn cell_width(&self) -> f64 {
        self.bounds.width() / self.columns as f64
    }

    fn cell_height(&self) -> f64 {
        self.bounds.height() / self.rows as f64
    }

    /// Cell containing `coord`, if it lies in the viewport.
    pub fn cell(&self, coord: Coord<f64>) -> Option<(usize, usize)> {
        let min = self.bounds.min();
        let max = self.bounds.max();
        if !(min.x..=max.x).contains(&coord.x) || !(min.y..=max.y).contains(&coord.y) {
            return None;
        }

        let column = ((coord.x - min.x) / self.cell_width()) as usize;
        let row = ((max.y - coord.y) / self.cell_height()) as usize;
        Some((column.min(self.columns - 1), row.min(self.rows - 1)))
    }

    /// Map coordinate at the centre of a cell.
    pub fn center(&self, column: usize, row: usize) -> Coord<f64> {
        Coord {
            x: self.bounds.min().x + (column as f64 + 0.5) * self.cell_width(),
            y: self.bounds.max().y - (row as f64 + 0.5) * self.cell_height(),
        }
    }

    /// Hit-test radius matching one cell.
    pub fn tolerance(&self) -> f64 {
        self.cell_width().max(self.cell_height())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cell {
    glyph: char,
    color: Option<Srgb<u8>>,
}

pub struct TerminalSurface {
    inner: MemorySurface,
    columns: usize,
    rows: usize,
    color: bool,
}

impl TerminalSurface {
    pub fn new(columns: usize, rows: usize, color: bool) -> Self {
        Self {
            inner: MemorySurface::new(),
            columns: columns.max(1),
            rows: rows.max(1),
            color,
        }
    }

    pub fn memory(&self) -> &MemorySurface {
        &self.inner
    }

    /// Viewport fitted to the current data, `None` while there is none.
    pub fn viewport(&self) -> Option<Viewport> {
        let points: Vec<Point<f64>> = self
            .inner
            .sources()
            .flat_map(|(_, data)| data.features.iter())
            .flat_map(feature_coords)
            .map(Point::from)
            .collect();
        let bounds = MultiPoint::new(points).bounding_rect()?;

        let pad_x = (bounds.width() * PADDING).max(MIN_SPAN / 2.0);
        let pad_y = (bounds.height() * PADDING).max(MIN_SPAN / 2.0);
        Some(Viewport {
            bounds: Rect::new(
                Coord {
                    x: bounds.min().x - pad_x,
                    y: bounds.min().y - pad_y,
                },
                Coord {
                    x: bounds.max().x + pad_x,
                    y: bounds.max().y + pad_y,
                },
            ),
            columns: self.columns,
            rows: self.rows,
        })
    }

    pub fn click_cell(&self, column: usize, row: usize) -> Vec<SurfaceEvent> {
        match self.viewport() {
            Some(viewport) => self.inner.click(viewport.center(column, row), viewport.tolerance()),
            None => Vec::new(),
        }
    }

    pub fn hover_cell(&mut self, column: usize, row: usize) -> Vec<SurfaceEvent> {
        match self.viewport() {
            Some(viewport) => self
                .inner
                .pointer_move(viewport.center(column, row), viewport.tolerance()),
            None => Vec::new(),
        }
    }

    /// Rasterize all layers, bottom to top, one string per row.
    pub fn render(&self) -> Vec<String> {
        let mut grid = vec![vec![None::<Cell>; self.columns]; self.rows];

        if let Some(viewport) = self.viewport() {
            for layer in self.inner.layers() {
                let Some(source) = self.inner.source(&layer.source) else {
                    continue;
                };
                for feature in &source.features {
                    match layer.kind {
                        LayerType::Line => draw_line(&mut grid, &viewport, layer, feature),
                        LayerType::Circle => draw_circle(&mut grid, &viewport, layer, feature),
                    }
                }
            }
        }

        grid.into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| match cell {
                        Some(cell) => self.paint(cell),
                        None => " ".to_owned(),
                    })
                    .collect::<String>()
                    .trim_end()
                    .to_owned()
            })
            .collect()
    }

    /// Redraw the whole screen followed by `footer`.
    pub fn present<W: Write>(&self, out: &mut W, footer: &[String]) -> io::Result<()> {
        if self.color {
            write!(out, "\x1b[H\x1b[2J")?;
        }
        for line in self.render() {
            writeln!(out, "{line}")?;
        }
        for line in footer {
            writeln!(out, "{line}")?;
        }
        out.flush()
    }

    fn paint(&self, cell: Cell) -> String {
        match (self.color, cell.color) {
            (true, Some(color)) => format!(
                "\x1b[38;2;{};{};{}m{}\x1b[0m",
                color.red, color.green, color.blue, cell.glyph
            ),
            _ => cell.glyph.to_string(),
        }
    }
}

impl MapSurface for TerminalSurface {
    fn has_source(&self, id: &str) -> bool {
        self.inner.has_source(id)
    }

    fn add_source(
        &mut self,
        id: &str,
        data: geojson::FeatureCollection,
    ) -> Result<(), SurfaceError> {
        self.inner.add_source(id, data)
    }

    fn set_source_data(
        &mut self,
        id: &str,
        data: geojson::FeatureCollection,
    ) -> Result<(), SurfaceError> {
        self.inner.set_source_data(id, data)
    }

    fn remove_source(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.inner.remove_source(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.inner.has_layer(id)
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), SurfaceError> {
        self.inner.add_layer(layer)
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), SurfaceError> {
        self.inner.remove_layer(id)
    }

    fn set_paint_property(
        &mut self,
        layer: &str,
        property: PaintProperty,
        value: Expression,
    ) -> Result<(), SurfaceError> {
        self.inner.set_paint_property(layer, property, value)
    }

    fn subscribe(&mut self, layer: &str, kind: PointerEventKind) {
        self.inner.subscribe(layer, kind)
    }

    fn unsubscribe(&mut self, layer: &str, kind: PointerEventKind) {
        self.inner.unsubscribe(layer, kind)
    }

    fn set_cursor(&mut self, cursor: CursorStyle) {
        self.inner.set_cursor(cursor)
    }
}

// ============================================================================
// Rasterization
// ============================================================================

fn feature_coords(feature: &Feature) -> Vec<Coord<f64>> {
    let Some(geometry) = &feature.geometry else {
        return Vec::new();
    };
    let to_coord = |position: &Vec<f64>| match position.as_slice() {
        [x, y, ..] => Some(Coord { x: *x, y: *y }),
        _ => None,
    };

    match &geometry.value {
        geojson::Value::Point(position) => to_coord(position).into_iter().collect(),
        geojson::Value::LineString(positions) => positions.iter().filter_map(to_coord).collect(),
        _ => Vec::new(),
    }
}

fn paint_color(layer: &LayerSpec, property: PaintProperty, feature: &Feature) -> Option<Srgb<u8>> {
    layer.paint.get(&property)?.evaluate_color(feature)
}

fn glyph_for_radius(radius: f64) -> char {
    match radius {
        r if r <= 4.0 => 'o',
        r if r <= 6.0 => '*',
        r if r <= 8.0 => 'O',
        _ => '@',
    }
}

fn draw_circle(grid: &mut [Vec<Option<Cell>>], viewport: &Viewport, layer: &LayerSpec, feature: &Feature) {
    let Some(center) = feature_coords(feature).first().copied() else {
        return;
    };
    let Some((column, row)) = viewport.cell(center) else {
        return;
    };

    let radius = layer
        .paint
        .get(&PaintProperty::CircleRadius)
        .and_then(|radius| radius.evaluate_f64(feature))
        .unwrap_or(5.0);
    grid[row][column] = Some(Cell {
        glyph: glyph_for_radius(radius),
        color: paint_color(layer, PaintProperty::CircleColor, feature),
    });
}

fn draw_line(grid: &mut [Vec<Option<Cell>>], viewport: &Viewport, layer: &LayerSpec, feature: &Feature) {
    let color = paint_color(layer, PaintProperty::LineColor, feature);
    let coords = feature_coords(feature);

    for pair in coords.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let steps = match (viewport.cell(start), viewport.cell(end)) {
            (Some((c0, r0)), Some((c1, r1))) => c0.abs_diff(c1).max(r0.abs_diff(r1)).max(1),
            _ => viewport.columns.max(viewport.rows),
        };

        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let at = Coord {
                x: start.x + (end.x - start.x) * t,
                y: start.y + (end.y - start.y) * t,
            };
            if let Some((column, row)) = viewport.cell(at) {
                grid[row][column] = Some(Cell { glyph: '.', color });
            }
        }
    }
}
