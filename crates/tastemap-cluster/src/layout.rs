use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tastemap_schema::{GraphNodePosition, Point, UserEmbedding};

use crate::vector::cosine_similarity;

/// Closest a node may sit to the focal point, in pixels.
pub const MIN_PIXEL_DISTANCE: f32 = 30.0;
pub const DEFAULT_MAX_DISTANCE: f32 = 150.0;
pub const DEFAULT_CENTER: Point = Point::new(167.0, 460.0);
pub const MIN_NODE_SIZE: f32 = 40.0;
pub const NODE_SIZE_SPAN: f32 = 16.0;

// Ceiling wins over the floor when max_distance < MIN_PIXEL_DISTANCE.
fn clamp_between(value: f32, lo: f32, hi: f32) -> f32 { value.max(lo).min(hi) }

/// `(1 - similarity) * max_distance`, clamped to `[MIN_PIXEL_DISTANCE, max_distance]`.
pub fn similarity_to_pixel_distance(similarity: f32, max_distance: f32) -> f32 {
    clamp_between((1.0 - similarity) * max_distance, MIN_PIXEL_DISTANCE, max_distance)
}

/// Radial placement around `center`. Node `i` of `N` sits at angle `2πi/N`,
/// i.e. angles follow input order, and its radius shrinks as similarity to
/// the focal vector grows.
pub fn compute_node_positions(focal: &[f32], others: &[UserEmbedding], center: Point, max_distance: f32) -> Vec<GraphNodePosition> {
    let total = others.len();
    others.iter().enumerate().map(|(i, user)| {
        let similarity = cosine_similarity(focal, &user.vector);
        let distance = similarity_to_pixel_distance(similarity, max_distance);
        let angle = 2.0 * PI * i as f64 / total as f64;
        GraphNodePosition {
            user_id: user.user_id.clone(),
            x: center.x + distance * angle.cos() as f32,
            y: center.y + distance * angle.sin() as f32,
            distance_from_focal: distance,
            similarity_to_focal: similarity,
        }
    }).collect()
}

/// Node diameter: 40 at similarity 0, 56 at similarity 1. Not clamped.
pub fn node_visual_size(similarity: f32) -> f32 { MIN_NODE_SIZE + similarity * NODE_SIZE_SPAN }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTier { High, Medium, Low }

impl ColorTier {
    pub fn for_similarity(similarity: f32) -> Self {
        if similarity >= 0.5 { ColorTier::High } else if similarity >= 0.3 { ColorTier::Medium } else { ColorTier::Low }
    }
    pub fn hex(&self) -> &'static str {
        match self {
            ColorTier::High => "#10B981",
            ColorTier::Medium => "#F59E0B",
            ColorTier::Low => "#E5E7EB",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutBounds { pub min: Point, pub max: Point }

impl Default for LayoutBounds {
    fn default() -> Self { Self { min: Point::new(30.0, 230.0), max: Point::new(360.0, 650.0) } }
}

impl LayoutBounds {
    fn clamp(&self, p: Point) -> Point { Point::new(clamp_between(p.x, self.min.x, self.max.x), clamp_between(p.y, self.min.y, self.max.y)) }
}

/// Force-directed relaxation of the radial layout.
///
/// Each step pushes every pair of nodes apart with `repulsion / d²`, pulls each
/// node along the focal ray by `attraction * (d - target)` where `target` is
/// its similarity distance, caps the step at `max_speed`, and keeps the node
/// inside `bounds`. Forces are computed from the previous step's positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceLayout {
    pub iterations: usize,
    pub repulsion: f32,
    pub attraction: f32,
    pub max_speed: f32,
    pub bounds: LayoutBounds,
}

impl Default for ForceLayout {
    fn default() -> Self { Self { iterations: 50, repulsion: 5000.0, attraction: 0.1, max_speed: 2.0, bounds: LayoutBounds::default() } }
}

impl ForceLayout {
    pub fn layout(&self, focal: &[f32], others: &[UserEmbedding], center: Point, max_distance: f32) -> Vec<GraphNodePosition> {
        self.relax(compute_node_positions(focal, others, center, max_distance), center, max_distance)
    }

    pub fn relax(&self, mut nodes: Vec<GraphNodePosition>, center: Point, max_distance: f32) -> Vec<GraphNodePosition> {
        for _ in 0..self.iterations {
            let current: Vec<Point> = nodes.iter().map(|n| n.point()).collect();
            for (i, node) in nodes.iter_mut().enumerate() {
                let p = current[i];
                let (mut fx, mut fy) = (0f32, 0f32);
                for (j, q) in current.iter().enumerate() {
                    if i == j { continue; }
                    let (dx, dy) = (p.x - q.x, p.y - q.y);
                    let d = (dx * dx + dy * dy).sqrt();
                    if d > 0.0 {
                        let push = self.repulsion / (d * d);
                        fx += dx / d * push;
                        fy += dy / d * push;
                    }
                }
                let (dx, dy) = (p.x - center.x, p.y - center.y);
                let d = (dx * dx + dy * dy).sqrt();
                if d > 0.0 {
                    let target = similarity_to_pixel_distance(node.similarity_to_focal, max_distance);
                    let pull = self.attraction * (d - target);
                    fx -= dx / d * pull;
                    fy -= dy / d * pull;
                }
                let speed = (fx * fx + fy * fy).sqrt();
                if speed > self.max_speed {
                    fx = fx / speed * self.max_speed;
                    fy = fy / speed * self.max_speed;
                }
                let next = self.bounds.clamp(Point::new(p.x + fx, p.y + fy));
                node.x = next.x;
                node.y = next.y;
            }
        }
        for node in nodes.iter_mut() { node.distance_from_focal = node.point().distance_to(&center); }
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn user(id: &str, v: Vec<f32>) -> UserEmbedding { UserEmbedding::new(id, id, v) }

    #[test]
    fn identical_user_sits_on_floor() {
        let center = Point::new(100.0, 100.0);
        let nodes = compute_node_positions(&[1.0, 0.0], &[user("a", vec![2.0, 0.0])], center, 150.0);
        assert_eq!(nodes.len(), 1);
        assert_abs_diff_eq!(nodes[0].distance_from_focal, 30.0, epsilon = 1e-4);
        assert_abs_diff_eq!(nodes[0].point().distance_to(&center), 30.0, epsilon = 1e-3);
        // single node is placed at angle 0
        assert_abs_diff_eq!(nodes[0].x, 130.0, epsilon = 1e-3);
        assert_abs_diff_eq!(nodes[0].y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn orthogonal_user_sits_on_ceiling() {
        let nodes = compute_node_positions(&[1.0, 0.0], &[user("a", vec![0.0, 1.0])], Point::new(0.0, 0.0), 150.0);
        assert_eq!(nodes[0].similarity_to_focal, 0.0);
        assert_abs_diff_eq!(nodes[0].distance_from_focal, 150.0, epsilon = 1e-4);
    }

    #[test]
    fn opposite_user_is_clamped_to_max_distance() {
        let others = [user("same", vec![1.0, 0.0]), user("opposite", vec![-1.0, 0.0])];
        let nodes = compute_node_positions(&[1.0, 0.0], &others, Point::new(0.0, 0.0), 120.0);
        assert_abs_diff_eq!(nodes[0].distance_from_focal, 30.0, epsilon = 1e-4);
        assert_abs_diff_eq!(nodes[1].similarity_to_focal, -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(nodes[1].distance_from_focal, 120.0, epsilon = 1e-4);
        // second of two nodes sits at angle π
        assert_abs_diff_eq!(nodes[1].x, -120.0, epsilon = 1e-3);
    }

    #[test]
    fn angles_follow_input_order() {
        let others: Vec<_> = (0..4).map(|i| user(&format!("u{i}"), vec![0.0, 1.0])).collect();
        let nodes = compute_node_positions(&[1.0, 0.0], &others, Point::new(0.0, 0.0), 100.0);
        let ids: Vec<_> = nodes.iter().map(|n| n.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u0", "u1", "u2", "u3"]);
        assert_abs_diff_eq!(nodes[1].x, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(nodes[1].y, 100.0, epsilon = 1e-3);
    }

    #[test]
    fn degenerate_vectors_land_on_max_distance() {
        let others = [user("empty", vec![]), user("short", vec![1.0])];
        let nodes = compute_node_positions(&[1.0, 0.0], &others, Point::new(0.0, 0.0), 90.0);
        assert!(nodes.iter().all(|n| n.similarity_to_focal == 0.0 && n.distance_from_focal == 90.0));
        assert!(compute_node_positions(&[1.0], &[], Point::new(0.0, 0.0), 90.0).is_empty());
    }

    #[test]
    fn size_and_tiers() {
        assert_eq!(node_visual_size(0.0), 40.0);
        assert_eq!(node_visual_size(1.0), 56.0);
        assert_eq!(node_visual_size(0.5), 48.0);
        assert_eq!(ColorTier::for_similarity(0.9), ColorTier::High);
        assert_eq!(ColorTier::for_similarity(0.5), ColorTier::High);
        assert_eq!(ColorTier::for_similarity(0.49), ColorTier::Medium);
        assert_eq!(ColorTier::for_similarity(0.3), ColorTier::Medium);
        assert_eq!(ColorTier::for_similarity(0.29), ColorTier::Low);
        assert_eq!(ColorTier::for_similarity(-0.4), ColorTier::Low);
        assert_eq!(ColorTier::High.hex(), "#10B981");
    }

    #[test]
    fn force_layout_stays_in_bounds() {
        let others: Vec<_> = (0..8).map(|i| user(&format!("u{i}"), vec![1.0, i as f32 * 0.3])).collect();
        let force = ForceLayout::default();
        let nodes = force.layout(&[1.0, 0.0], &others, DEFAULT_CENTER, DEFAULT_MAX_DISTANCE);
        assert_eq!(nodes.len(), 8);
        for n in &nodes {
            assert!((30.0..=360.0).contains(&n.x), "x out of bounds: {}", n.x);
            assert!((230.0..=650.0).contains(&n.y), "y out of bounds: {}", n.y);
            assert_abs_diff_eq!(n.distance_from_focal, n.point().distance_to(&DEFAULT_CENTER), epsilon = 1e-3);
        }
    }

    #[test]
    fn force_step_is_speed_capped() {
        let others = [user("a", vec![1.0, 0.0]), user("b", vec![1.0, 0.01])];
        let radial = compute_node_positions(&[1.0, 0.0], &others, DEFAULT_CENTER, DEFAULT_MAX_DISTANCE);
        let one_step = ForceLayout { iterations: 1, ..ForceLayout::default() };
        let moved = one_step.relax(radial.clone(), DEFAULT_CENTER, DEFAULT_MAX_DISTANCE);
        for (before, after) in radial.iter().zip(&moved) {
            assert!(before.point().distance_to(&after.point()) <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn zero_iterations_keeps_radial_positions() {
        let others = [user("a", vec![0.5, 0.5])];
        let radial = compute_node_positions(&[1.0, 0.0], &others, DEFAULT_CENTER, DEFAULT_MAX_DISTANCE);
        let still = ForceLayout { iterations: 0, ..ForceLayout::default() }.relax(radial.clone(), DEFAULT_CENTER, DEFAULT_MAX_DISTANCE);
        assert_abs_diff_eq!(still[0].x, radial[0].x, epsilon = 1e-4);
        assert_abs_diff_eq!(still[0].distance_from_focal, radial[0].distance_from_focal, epsilon = 1e-3);
    }
}
