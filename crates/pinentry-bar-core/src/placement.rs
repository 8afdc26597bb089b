//! Bar placement.
//!
//! Chooses the monitor the bar appears on and the bar's rectangle. The
//! selection is a pure function of its inputs; [`resolve_geometry`] gathers
//! those inputs from a [`GeometryQuery`].
//!
//! Monitor selection order:
//!
//! 1. A valid explicit monitor index.
//! 2. The monitor sharing the largest area with the focused top-level window
//!    (lowest index wins ties).
//! 3. The first monitor containing the pointer, when no monitor intersects
//!    the focused window.
//! 4. Monitor 0.
//!
//! With no monitors at all (or when embedded) the embedding window's
//! rectangle is used instead.

use tracing::debug;

use crate::traits::{GeometryError, GeometryQuery};
use crate::types::{BarGeometry, MonitorRect, Point};

/// Inputs to [`place_bar`].
#[derive(Debug, Clone, Copy)]
pub struct PlacementInput<'a> {
    /// Explicit monitor index override.
    pub monitor: Option<usize>,
    /// Monitor rectangles in index order.
    pub monitors: &'a [MonitorRect],
    /// Rectangle of the focused top-level window.
    pub focus: Option<MonitorRect>,
    /// Fallback rectangle (embedding window or root).
    pub embedding: MonitorRect,
    /// Render inside the embedding window regardless of monitors.
    pub embedded: bool,
    /// Anchor at the top of the rectangle instead of the bottom.
    pub top_bar: bool,
    /// Height of the bar.
    pub bar_height: u32,
}

/// Pick a monitor index from `monitors`.
///
/// `pointer` is only called when neither the override nor the focus window
/// decides. Returns `None` only when `monitors` is empty.
pub fn select_monitor(
    monitors: &[MonitorRect],
    monitor: Option<usize>,
    focus: Option<MonitorRect>,
    pointer: impl FnOnce() -> Option<Point>,
) -> Option<usize> {
    if monitors.is_empty() {
        return None;
    }

    if let Some(index) = monitor.filter(|index| *index < monitors.len()) {
        return Some(index);
    }

    if let Some(window) = focus {
        let mut best: Option<(usize, u64)> = None;
        for (index, rect) in monitors.iter().enumerate() {
            let area = rect.intersection_area(&window);
            if area > best.map_or(0, |(_, best_area)| best_area) {
                best = Some((index, area));
            }
        }
        if let Some((index, _)) = best {
            return Some(index);
        }
    }

    if let Some(point) = pointer() {
        if let Some(index) = monitors.iter().position(|rect| rect.contains(point)) {
            return Some(index);
        }
    }

    Some(0)
}

/// Compute the bar rectangle.
pub fn place_bar(
    input: &PlacementInput<'_>,
    pointer: impl FnOnce() -> Option<Point>,
) -> BarGeometry {
    let selected = if input.embedded {
        None
    } else {
        select_monitor(input.monitors, input.monitor, input.focus, pointer)
    };
    let rect = selected.map_or(input.embedding, |index| input.monitors[index]);

    let y = if input.top_bar {
        rect.y
    } else {
        rect.y + rect.height as i32 - input.bar_height as i32
    };

    BarGeometry {
        x: rect.x,
        y,
        width: rect.width,
        height: input.bar_height,
    }
}

/// Query `geometry` and place the bar.
///
/// # Errors
///
/// Fails when the monitor layout or the embedding window cannot be queried;
/// the bar cannot be shown safely without either.
pub fn resolve_geometry<Q: GeometryQuery + ?Sized>(
    geometry: &Q,
    monitor: Option<usize>,
    embedded: bool,
    top_bar: bool,
    bar_height: u32,
) -> Result<BarGeometry, GeometryError> {
    let embedding = geometry.embedding_rect()?;
    let monitors = if embedded {
        Vec::new()
    } else {
        geometry.monitors()?
    };
    let focus = if embedded || monitor.is_some_and(|index| index < monitors.len()) {
        None
    } else {
        geometry.focus_window_rect()
    };

    let input = PlacementInput {
        monitor,
        monitors: &monitors,
        focus,
        embedding,
        embedded,
        top_bar,
        bar_height,
    };
    let placed = place_bar(&input, || geometry.pointer());

    debug!(
        monitors = monitors.len(),
        x = placed.x,
        y = placed.y,
        width = placed.width,
        height = placed.height,
        "Bar placed"
    );
    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGeometry;

    const BAR: u32 = 20;

    fn two_monitors() -> [MonitorRect; 2] {
        [
            MonitorRect::new(0, 0, 1000, 800),
            MonitorRect::new(1000, 0, 1000, 800),
        ]
    }

    fn no_pointer() -> Option<Point> {
        None
    }

    #[test]
    fn valid_override_wins() {
        let monitors = two_monitors();
        let focus = Some(MonitorRect::new(10, 10, 100, 100)); // entirely on 0
        assert_eq!(select_monitor(&monitors, Some(1), focus, no_pointer), Some(1));
    }

    #[test]
    fn invalid_override_is_ignored() {
        let monitors = two_monitors();
        let focus = Some(MonitorRect::new(1500, 10, 100, 100));
        assert_eq!(select_monitor(&monitors, Some(7), focus, no_pointer), Some(1));
    }

    #[test]
    fn largest_intersection_with_focus_window_wins() {
        let monitors = two_monitors();
        // 100x300 on A, 200x300 on B.
        let focus = Some(MonitorRect::new(900, 100, 300, 300));
        assert_eq!(select_monitor(&monitors, None, focus, no_pointer), Some(1));
    }

    #[test]
    fn intersection_tie_prefers_lowest_index() {
        let monitors = two_monitors();
        let focus = Some(MonitorRect::new(900, 0, 200, 100));
        assert_eq!(select_monitor(&monitors, None, focus, no_pointer), Some(0));
    }

    #[test]
    fn pointer_decides_when_focus_window_is_off_screen() {
        let monitors = two_monitors();
        let focus = Some(MonitorRect::new(5000, 5000, 10, 10));
        let index = select_monitor(&monitors, None, focus, || Some(Point::new(1500, 400)));
        assert_eq!(index, Some(1));
    }

    #[test]
    fn pointer_is_not_queried_when_focus_decides() {
        let monitors = two_monitors();
        let focus = Some(MonitorRect::new(1200, 10, 10, 10));
        let index = select_monitor(&monitors, None, focus, || {
            panic!("pointer must not be queried")
        });
        assert_eq!(index, Some(1));
    }

    #[test]
    fn falls_back_to_first_monitor() {
        let monitors = two_monitors();
        assert_eq!(select_monitor(&monitors, None, None, no_pointer), Some(0));
        // Pointer outside every monitor.
        let index = select_monitor(&monitors, None, None, || Some(Point::new(-5, -5)));
        assert_eq!(index, Some(0));
    }

    #[test]
    fn empty_monitor_list_selects_nothing() {
        assert_eq!(select_monitor(&[], Some(0), None, no_pointer), None);
    }

    #[test]
    fn top_bar_anchors_at_monitor_top() {
        let monitors = two_monitors();
        let input = PlacementInput {
            monitor: Some(1),
            monitors: &monitors,
            focus: None,
            embedding: MonitorRect::new(0, 0, 2000, 800),
            embedded: false,
            top_bar: true,
            bar_height: BAR,
        };
        assert_eq!(
            place_bar(&input, no_pointer),
            BarGeometry {
                x: 1000,
                y: 0,
                width: 1000,
                height: BAR
            }
        );
    }

    #[test]
    fn bottom_bar_on_empty_monitor_list_uses_embedding_rect() {
        let input = PlacementInput {
            monitor: None,
            monitors: &[],
            focus: None,
            embedding: MonitorRect::new(0, 0, 1024, 768),
            embedded: false,
            top_bar: false,
            bar_height: BAR,
        };
        let placed = place_bar(&input, no_pointer);
        assert_eq!(placed.y, 768 - BAR as i32);
        assert_eq!(placed.width, 1024);
        assert_eq!(placed.x, 0);
    }

    #[test]
    fn embedded_ignores_monitors() {
        let monitors = two_monitors();
        let input = PlacementInput {
            monitor: Some(1),
            monitors: &monitors,
            focus: None,
            embedding: MonitorRect::new(0, 0, 640, 480),
            embedded: true,
            top_bar: true,
            bar_height: BAR,
        };
        let placed = place_bar(&input, no_pointer);
        assert_eq!(placed.width, 640);
        assert_eq!(placed.y, 0);
    }

    #[test]
    fn resolve_geometry_uses_focus_window() {
        let geometry = MockGeometry::new(MonitorRect::new(0, 0, 2000, 800))
            .with_monitors(two_monitors().to_vec())
            .with_focus(MonitorRect::new(900, 100, 300, 300));

        let placed = resolve_geometry(&geometry, None, false, false, BAR).unwrap();
        assert_eq!(placed.x, 1000);
        assert_eq!(placed.y, 800 - BAR as i32);
    }

    #[test]
    fn resolve_geometry_propagates_query_failure() {
        let geometry = MockGeometry::failing();
        let result = resolve_geometry(&geometry, None, false, true, BAR);
        assert!(matches!(result, Err(GeometryError::EmbeddingWindow(_))));
    }
}
