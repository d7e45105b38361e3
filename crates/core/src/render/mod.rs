//! Ownership of generated primitives and the seam to an external renderer.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};
use tracing::debug;

use crate::{
    mapping::MaterialParams,
    scene::{RingPrimitive, Scene, ScenePrimitive},
    Result,
};

new_key_type! {
    /// Weak reference to a primitive owned by a [`ResourceArena`]. Handles to
    /// disposed primitives resolve to `None`.
    pub struct PrimitiveHandle;
}

/// Sole owner of every live scene primitive.
#[derive(Debug, Default)]
pub struct ResourceArena {
    primitives: SlotMap<PrimitiveHandle, ScenePrimitive>,
    order: Vec<PrimitiveHandle>,
    disposed_total: u64,
}

impl ResourceArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of every primitive in `scene`, keeping scene order.
    pub fn install(&mut self, scene: Scene) -> Vec<PrimitiveHandle> {
        let handles: Vec<PrimitiveHandle> = scene
            .into_primitives()
            .into_iter()
            .map(|primitive| self.primitives.insert(primitive))
            .collect();
        self.order.extend(handles.iter().copied());
        handles
    }

    pub fn get(&self, handle: PrimitiveHandle) -> Option<&ScenePrimitive> {
        self.primitives.get(handle)
    }

    /// Releases every live primitive and invalidates outstanding handles.
    pub fn dispose_all(&mut self) -> usize {
        let disposed = self.primitives.len();
        self.primitives.clear();
        self.order.clear();
        self.disposed_total += disposed as u64;
        if disposed > 0 {
            debug!(disposed, "disposed scene primitives");
        }
        disposed
    }

    /// Patches the appearance of every live primitive. Returns how many were
    /// touched.
    pub fn apply_materials(&mut self, params: &MaterialParams) -> usize {
        for primitive in self.primitives.values_mut() {
            primitive.apply_material(params);
        }
        self.primitives.len()
    }

    /// Swaps live rings for freshly built ones with the same ring index.
    /// Handles stay valid. Returns how many rings were replaced.
    pub fn replace_rings(&mut self, fresh: Vec<RingPrimitive>) -> usize {
        let mut fresh: HashMap<u32, RingPrimitive> =
            fresh.into_iter().map(|ring| (ring.ring_index, ring)).collect();
        let mut replaced = 0;
        for primitive in self.primitives.values_mut() {
            if let ScenePrimitive::Ring(ring) = primitive {
                if let Some(next) = fresh.remove(&ring.ring_index) {
                    *ring = next;
                    replaced += 1;
                }
            }
        }
        replaced
    }

    /// Live primitives in installation order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenePrimitive> + '_ {
        self.order.iter().filter_map(|handle| self.primitives.get(*handle))
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn disposed_total(&self) -> u64 {
        self.disposed_total
    }
}

/// External renderer. It only sees the live primitives for one pass.
pub trait RenderTarget {
    fn draw(&mut self, primitives: &[&ScenePrimitive]) -> Result<()>;
}

/// Renderer that draws nothing. Used when the engine runs headless.
#[derive(Debug, Default)]
pub struct NullRenderTarget;

impl RenderTarget for NullRenderTarget {
    fn draw(&mut self, _primitives: &[&ScenePrimitive]) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{LabelPrimitive, Material, TubeGeometry, ACCENT_MOVE};

    fn label(index: usize) -> ScenePrimitive {
        ScenePrimitive::Label(LabelPrimitive {
            move_index: index,
            position: [index as f64, 0.0, 0.0],
            text: format!("M{index}"),
            material: Material {
                color: ACCENT_MOVE,
                opacity: 1.0,
            },
        })
    }

    fn scene(count: usize) -> Scene {
        let mut scene = Scene::new();
        for i in 0..count {
            scene.push(label(i));
        }
        scene
    }

    #[test]
    fn installs_in_scene_order() {
        let mut arena = ResourceArena::new();
        let handles = arena.install(scene(3));
        assert_eq!(arena.len(), 3);
        let order: Vec<&ScenePrimitive> = arena.iter().collect();
        assert_eq!(order[2], &label(2));
        assert_eq!(arena.get(handles[1]), Some(&label(1)));
    }

    #[test]
    fn disposal_invalidates_handles() {
        let mut arena = ResourceArena::new();
        let old = arena.install(scene(2));
        assert_eq!(arena.dispose_all(), 2);
        assert!(arena.is_empty());
        assert!(old.iter().all(|h| arena.get(*h).is_none()));

        let new = arena.install(scene(2));
        assert!(new.iter().all(|h| arena.get(*h).is_some()));
        assert!(new.iter().all(|h| !old.contains(h)));
        assert_eq!(arena.disposed_total(), 2);
    }

    #[test]
    fn dispose_on_empty_arena_is_a_no_op() {
        let mut arena = ResourceArena::new();
        assert_eq!(arena.dispose_all(), 0);
        assert_eq!(arena.disposed_total(), 0);
    }

    fn ring(ring_index: u32, z: f64) -> RingPrimitive {
        RingPrimitive {
            ring_index,
            ring_count: 2,
            tube: TubeGeometry {
                path: vec![[1.0, 0.0, z], [0.0, 1.0, z], [-1.0, 0.0, z]],
                radius: 0.02,
                radial_segments: 8,
                closed: true,
            },
            depth_profile: vec![z; 3],
            material: Material {
                color: ACCENT_MOVE,
                opacity: 1.0,
            },
        }
    }

    #[test]
    fn ring_replacement_keeps_handles_and_other_primitives() {
        let mut arena = ResourceArena::new();
        let mut scene = scene(1);
        scene.push(ScenePrimitive::Ring(ring(0, 0.0)));
        scene.push(ScenePrimitive::Ring(ring(1, 0.0)));
        let handles = arena.install(scene);

        assert_eq!(arena.replace_rings(vec![ring(1, 0.5), ring(7, 0.5)]), 1);
        assert_eq!(arena.len(), 3);
        assert_eq!(arena.get(handles[0]), Some(&label(0)));
        assert_eq!(arena.get(handles[1]), Some(&ScenePrimitive::Ring(ring(0, 0.0))));
        assert_eq!(arena.get(handles[2]), Some(&ScenePrimitive::Ring(ring(1, 0.5))));
        assert_eq!(arena.disposed_total(), 0);
    }

    #[test]
    fn material_patch_touches_every_live_primitive() {
        let mut arena = ResourceArena::new();
        arena.install(scene(4));
        let params = MaterialParams {
            ring_opacity: 1.0,
            marker_opacity: 0.5,
            attempt_opacity: 1.0,
            center_fade: 0.0,
            depth_effect: 0.0,
        };
        assert_eq!(arena.apply_materials(&params), 4);
        assert!(arena.iter().all(|p| (p.material().opacity - 0.5).abs() < 1e-12));
    }
}
