//! Convex hull and polygon area over the shared point set.
//!
//! Pure functions with no shared state; the executor calls them on a snapshot
//! of the document.

use crate::graph::Point;

/// Computes the convex hull with Andrew's monotone chain.
///
/// Vertices are returned counter-clockwise starting from the lexicographically
/// smallest point. Collinear boundary points are dropped.
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    if points.len() <= 1 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);
    for point in &sorted {
        pop_clockwise(&mut hull, 2, *point);
        hull.push(*point);
    }

    let lower_len = hull.len() + 1;
    for point in sorted.iter().rev().skip(1) {
        pop_clockwise(&mut hull, lower_len, *point);
        hull.push(*point);
    }

    hull.pop();
    hull
}

fn pop_clockwise(hull: &mut Vec<Point>, min_len: usize, next: Point) {
    while hull.len() >= min_len {
        let [.., origin, last] = hull.as_slice() else {
            return;
        };
        if cross(*origin, *last, next) > 0.0 {
            return;
        }
        hull.pop();
    }
}

fn cross(origin: Point, a: Point, b: Point) -> f64 {
    (a.x - origin.x) * (b.y - origin.y) - (a.y - origin.y) * (b.x - origin.x)
}

/// Shoelace area of a simple polygon; zero for fewer than three vertices.
#[must_use]
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: f64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice.abs() / 2.0
}

/// Area of the convex hull of `points`; zero for fewer than three points.
#[must_use]
pub fn hull_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    polygon_area(&convex_hull(points))
}
