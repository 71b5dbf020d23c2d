//! Directional focus: "move focus to the pane above/below/left/right of
//! the current one", the way vim window commands (`Ctrl-w h/j/k/l`) work.

use super::bounds::Rect;

/// A directional focus move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

fn center(r: Rect) -> (f64, f64) {
    (
        r.x as f64 + r.width as f64 / 2.0,
        r.y as f64 + r.height as f64 / 2.0,
    )
}

/// Whether `candidate` lies on the side named by `dir` relative to `from`,
/// judged by center-to-center displacement along the dominant axis.
fn is_candidate(from: (f64, f64), candidate: (f64, f64), dir: Direction) -> bool {
    let (fx, fy) = from;
    let (cx, cy) = candidate;
    match dir {
        Direction::Left => cx < fx,
        Direction::Right => cx > fx,
        Direction::Up => cy < fy,
        Direction::Down => cy > fy,
    }
}

fn manhattan(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).abs() + (a.1 - b.1).abs()
}

/// Find the nearest pane from `focused_id` in `dir` among `panes`, using
/// Manhattan distance between bounds centers. `bounds_of` resolves a pane
/// id to its current rectangle. Returns `None` when no pane lies in that
/// direction (e.g. focus is already on the rightmost pane and `dir` is
/// `Right`).
pub fn nearest_in_direction<Id, F>(
    from_bounds: Rect,
    focused_id: Id,
    panes: &[(Id, crate::agent::AgentId)],
    bounds_of: F,
    dir: Direction,
) -> Option<Id>
where
    Id: Copy + PartialEq,
    F: Fn(Id) -> Rect,
{
    let from = center(from_bounds);
    panes
        .iter()
        .filter(|(id, _)| *id != focused_id)
        .map(|(id, _)| (*id, center(bounds_of(*id))))
        .filter(|(_, c)| is_candidate(from, *c, dir))
        .min_by(|(_, a), (_, b)| {
            manhattan(from, *a)
                .partial_cmp(&manhattan(from, *b))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;

    #[test]
    fn picks_pane_strictly_in_direction() {
        let a = AgentId::new();
        let b = AgentId::new();
        let c = AgentId::new();
        let panes = vec![(1u32, a), (2u32, b), (3u32, c)];
        let bounds = |id: u32| match id {
            1 => Rect::new(0, 0, 40, 24),
            2 => Rect::new(40, 0, 40, 24),
            _ => Rect::new(0, 24, 80, 24),
        };
        let found = nearest_in_direction(bounds(1), 1u32, &panes, bounds, Direction::Right);
        assert_eq!(found, Some(2));
        let found_down = nearest_in_direction(bounds(1), 1u32, &panes, bounds, Direction::Down);
        assert_eq!(found_down, Some(3));
        let found_left = nearest_in_direction(bounds(2), 2u32, &panes, bounds, Direction::Left);
        assert_eq!(found_left, Some(1));
    }

    #[test]
    fn no_candidate_returns_none() {
        let a = AgentId::new();
        let panes = vec![(1u32, a)];
        let bounds = |_: u32| Rect::new(0, 0, 80, 24);
        assert_eq!(
            nearest_in_direction(bounds(1), 1u32, &panes, bounds, Direction::Right),
            None
        );
    }
}
