//! Picking points on scene surfaces with world rays.
//!
//! A [`SurfaceRaycaster`] holds the geometry the renderer draws (triangle meshes and ellipsoid
//! surfaces) and reports the nearest hit along a ray. It knows nothing about materials or draw
//! order; objects can be hidden from picking with [`SurfaceRaycaster::set_intersectable`] while
//! staying in the scene.

use crate::ellipsoid::Ellipsoid;
use crate::math::Rotation;
use crate::ray::Ray;
use crate::systems::Ecef;
use crate::{Coordinate, Point3, Vector, Vector3};
use uom::si::f64::Length;
use uom::si::length::meter;

/// Determinants smaller than this mean the ray runs parallel to the triangle.
const PARALLEL_EPSILON: f64 = 1e-12;

system! {
    /// The coordinate system the vertices of a [`TriangleMesh`] are given in.
    ///
    /// Each mesh is placed in [`Ecef`] with its own origin and orientation, so two meshes share
    /// this type without sharing its meaning.
    pub struct MeshLocal using right-handed XYZ
}

/// Where a ray met a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance along the ray.
    pub distance: Length,
    pub point: Coordinate<Ecef>,
    /// The world-space vertices of the triangle that was hit, for mesh hits.
    pub triangle: Option<[Coordinate<Ecef>; 3]>,
    /// The geometric normal at the hit.
    ///
    /// For triangles this is `(v0 - v2) × (v1 - v2)` of the (normalized) edges, so it follows
    /// the winding order rather than any stored normals.
    pub face_normal: Option<Vector<Ecef>>,
    /// The shading normal at the hit, interpolated from the vertex normals where the mesh has
    /// them.
    pub vertex_normal: Option<Vector<Ecef>>,
}

/// Anything a navigator can anchor gestures on.
pub trait SurfacePicker {
    /// Finds the nearest surface point along `ray`, if any.
    fn pick(&self, ray: &Ray<Ecef>) -> Option<Intersection>;
}

impl SurfacePicker for Ellipsoid {
    fn pick(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        let distance = self.intersect(ray)?;
        let point = ray.at(distance);
        let normal = self.surface_normal(&point);
        Some(Intersection {
            distance,
            point,
            triangle: None,
            face_normal: Some(normal),
            vertex_normal: Some(normal),
        })
    }
}

/// An indexed triangle mesh placed somewhere in [`Ecef`].
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMesh {
    positions: Vec<Coordinate<MeshLocal>>,
    normals: Option<Vec<Vector<MeshLocal>>>,
    triangles: Vec<[usize; 3]>,
    origin: Coordinate<Ecef>,
    orientation: Rotation<Ecef, MeshLocal>,
}

impl TriangleMesh {
    /// Constructs a mesh placed at the ECEF origin with no rotation.
    ///
    /// Returns `None` if a triangle refers to a vertex that does not exist.
    #[must_use]
    pub fn new(
        positions: Vec<Coordinate<MeshLocal>>,
        triangles: Vec<[usize; 3]>,
    ) -> Option<Self> {
        let vertices = positions.len();
        if triangles.iter().flatten().any(|&i| i >= vertices) {
            return None;
        }
        Some(Self {
            positions,
            normals: None,
            triangles,
            origin: Coordinate::origin(),
            orientation: Rotation::identity(),
        })
    }

    /// Attaches per-vertex normals.
    ///
    /// Returns `None` if there isn't exactly one normal per vertex.
    #[must_use]
    pub fn with_normals(self, normals: Vec<Vector<MeshLocal>>) -> Option<Self> {
        (normals.len() == self.positions.len()).then(|| Self {
            normals: Some(normals),
            ..self
        })
    }

    /// Places the mesh so that its local origin is at `origin` and its local axes are the
    /// columns of `orientation`.
    #[must_use]
    pub fn placed_at(
        self,
        origin: Coordinate<Ecef>,
        orientation: Rotation<Ecef, MeshLocal>,
    ) -> Self {
        Self {
            origin,
            orientation,
            ..self
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Transforms a point of the mesh into the world.
    #[must_use]
    pub fn to_world(&self, local: Coordinate<MeshLocal>) -> Coordinate<Ecef> {
        self.origin + Vector::from(self.orientation * local)
    }

    /// Finds the nearest triangle hit along `ray`.
    ///
    /// Triangles are double-sided.
    #[must_use]
    pub fn intersect(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        // rigid placements preserve distances, so intersect in the mesh's own frame
        let origin = ((ray.origin() - self.origin) * self.orientation).inner;
        let direction = (ray.direction() * self.orientation).inner;

        let (distance, index, (u, v)) = self
            .triangles
            .iter()
            .enumerate()
            .filter_map(|(index, triangle)| {
                let [a, b, c] = triangle.map(|i| self.positions[i].point);
                let (t, uv) = moller_trumbore(&Point3::from(origin), &direction, [a, b, c])?;
                Some((t, index, uv))
            })
            .min_by(|(t1, ..), (t2, ..)| t1.total_cmp(t2))?;

        let [i0, i1, i2] = self.triangles[index];
        let triangle = [i0, i1, i2].map(|i| self.to_world(self.positions[i]));
        let face_normal = face_normal(&triangle);
        let vertex_normal = match &self.normals {
            Some(normals) => {
                let w = 1. - u - v;
                let interpolated = normals[i0] * w + normals[i1] * u + normals[i2] * v;
                interpolated
                    .try_normalized()
                    .map(|n| self.orientation * n)
            }
            None => face_normal,
        };

        let distance = Length::new::<meter>(distance);
        Some(Intersection {
            distance,
            point: ray.at(distance),
            triangle: Some(triangle),
            face_normal,
            vertex_normal,
        })
    }
}

impl SurfacePicker for TriangleMesh {
    fn pick(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        self.intersect(ray)
    }
}

/// Returns the distance along the ray and the barycentric weights of `b` and `c`.
fn moller_trumbore(
    origin: &Point3,
    direction: &Vector3,
    [a, b, c]: [Point3; 3],
) -> Option<(f64, (f64, f64))> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = direction.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < PARALLEL_EPSILON || !det.is_finite() {
        return None;
    }
    let inv_det = 1. / det;

    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0. ..=1.).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = direction.dot(&q) * inv_det;
    if v < 0. || u + v > 1. {
        return None;
    }
    let t = edge2.dot(&q) * inv_det;
    (t >= 0.).then_some((t, (u, v)))
}

fn face_normal([v0, v1, v2]: &[Coordinate<Ecef>; 3]) -> Option<Vector<Ecef>> {
    let e0 = (*v0 - *v2).try_normalized()?;
    let e1 = (*v1 - *v2).try_normalized()?;
    e0.cross(&e1).try_normalized()
}

/// Identifies an object added to a [`SurfaceRaycaster`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// The kinds of surfaces a [`SurfaceRaycaster`] can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Mesh(TriangleMesh),
    Ellipsoid(Ellipsoid),
}

impl From<TriangleMesh> for Surface {
    fn from(mesh: TriangleMesh) -> Self {
        Self::Mesh(mesh)
    }
}

impl From<Ellipsoid> for Surface {
    fn from(ellipsoid: Ellipsoid) -> Self {
        Self::Ellipsoid(ellipsoid)
    }
}

impl SurfacePicker for Surface {
    fn pick(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        match self {
            Self::Mesh(mesh) => mesh.pick(ray),
            Self::Ellipsoid(ellipsoid) => ellipsoid.pick(ray),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SceneObject {
    surface: Surface,
    intersectable: bool,
}

/// Finds the nearest hit among a collection of surfaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceRaycaster {
    objects: Vec<SceneObject>,
}

impl SurfaceRaycaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an intersectable surface.
    pub fn add(&mut self, surface: impl Into<Surface>) -> ObjectId {
        self.objects.push(SceneObject {
            surface: surface.into(),
            intersectable: true,
        });
        ObjectId(self.objects.len() - 1)
    }

    /// Includes or excludes an object from [`SurfaceRaycaster::intersect`].
    ///
    /// Returns `false` if no such object exists.
    pub fn set_intersectable(&mut self, id: ObjectId, intersectable: bool) -> bool {
        match self.objects.get_mut(id.0) {
            Some(object) => {
                object.intersectable = intersectable;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_intersectable(&self, id: ObjectId) -> Option<bool> {
        self.objects.get(id.0).map(|object| object.intersectable)
    }

    #[must_use]
    pub fn surface(&self, id: ObjectId) -> Option<&Surface> {
        self.objects.get(id.0).map(|object| &object.surface)
    }

    /// Finds the nearest hit along `ray` among all intersectable objects.
    #[must_use]
    pub fn intersect(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        self.objects
            .iter()
            .filter(|object| object.intersectable)
            .filter_map(|object| object.surface.pick(ray))
            .min_by(|a, b| {
                a.distance
                    .get::<meter>()
                    .total_cmp(&b.distance.get::<meter>())
            })
    }
}

impl SurfacePicker for SurfaceRaycaster {
    fn pick(&self, ray: &Ray<Ecef>) -> Option<Intersection> {
        self.intersect(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rstest::rstest;

    fn m(meters: f64) -> Length {
        Length::new::<meter>(meters)
    }
    fn local(x: f64, y: f64, z: f64) -> Coordinate<MeshLocal> {
        Coordinate::from_cartesian(m(x), m(y), m(z))
    }
    fn ecef(x: f64, y: f64, z: f64) -> Coordinate<Ecef> {
        Coordinate::from_cartesian(m(x), m(y), m(z))
    }

    /// A 2x2 square in the local XY plane made of two counter-clockwise triangles.
    fn square() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                local(-1., -1., 0.),
                local(1., -1., 0.),
                local(1., 1., 0.),
                local(-1., 1., 0.),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .expect("indices are in bounds")
    }

    /// Local X along world Y and local Y along world Z, so the local normal is world X.
    fn facing_x() -> Rotation<Ecef, MeshLocal> {
        Rotation::from_basis_unchecked(
            Vector::y_axis(),
            Vector::z_axis(),
            Vector::x_axis(),
        )
    }

    fn down_from(x: f64, y: f64, z: f64) -> Ray<Ecef> {
        Ray::new(ecef(x, y, z), -Vector::<Ecef>::z_axis()).expect("unit direction")
    }

    #[test]
    fn rejects_out_of_bounds_indices() {
        assert!(TriangleMesh::new(vec![local(0., 0., 0.)], vec![[0, 0, 1]]).is_none());
        assert!(square().with_normals(vec![Vector::zero()]).is_none());
    }

    #[test]
    fn triangle_hit() {
        let hit = square()
            .intersect(&down_from(0.5, -0.25, 10.))
            .expect("ray passes through the square");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 10., epsilon = 1e-12);
        assert_relative_eq!(hit.point, ecef(0.5, -0.25, 0.));
        assert_eq!(
            hit.triangle,
            Some([ecef(-1., -1., 0.), ecef(1., -1., 0.), ecef(1., 1., 0.)])
        );
        let normal = hit.face_normal.expect("triangle is not degenerate");
        assert_relative_eq!(normal, Vector::<Ecef>::z_axis());
        // without stored normals the shading normal is the face normal
        assert_eq!(hit.vertex_normal, hit.face_normal);
    }

    #[rstest]
    #[case(1.5, 0., 10.)] // beside the square
    #[case(0., 0., -10.)] // square is behind the ray
    fn triangle_miss(#[case] x: f64, #[case] y: f64, #[case] z: f64) {
        assert_eq!(square().intersect(&down_from(x, y, z)), None);
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = Ray::new(ecef(-5., 0., 0.), Vector::<Ecef>::x_axis()).expect("unit direction");
        assert_eq!(square().intersect(&ray), None);
    }

    #[test]
    fn vertex_normals_are_interpolated() {
        let tilted = Vector::<MeshLocal>::from_cartesian(m(1.), m(0.), m(1.)).normalized();
        let up = Vector::<MeshLocal>::z_axis();
        let mesh = square()
            .with_normals(vec![up, tilted, tilted, up])
            .expect("one normal per vertex");

        let hit = mesh.intersect(&down_from(0., 0., 1.)).expect("hits center");
        // halfway between the two normals, and the mesh isn't rotated
        let expected = (up + tilted).normalized();
        let normal = hit.vertex_normal.expect("normals interpolate to non-zero");
        assert_relative_eq!(normal.inner, expected.inner, epsilon = 1e-12);
        // the face normal ignores stored normals
        assert_relative_eq!(hit.face_normal.expect("non-degenerate"), Vector::<Ecef>::z_axis());
    }

    #[test]
    fn placement_moves_the_mesh() {
        // stand the square up facing +X, a thousand meters out
        let mesh = square().placed_at(ecef(1000., 0., 0.), facing_x());
        let ray =
            Ray::new(ecef(2000., 0.5, 0.5), -Vector::<Ecef>::x_axis()).expect("unit direction");

        let hit = mesh.intersect(&ray).expect("ray hits the placed square");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 1000., epsilon = 1e-9);
        assert_relative_eq!(hit.point, ecef(1000., 0.5, 0.5), epsilon = m(1e-9));
        assert_relative_eq!(
            hit.face_normal.expect("non-degenerate"),
            Vector::<Ecef>::x_axis(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn nearest_intersectable_object_wins() {
        let mut raycaster = SurfaceRaycaster::new();
        let far = raycaster.add(square());
        let near = raycaster.add(square().placed_at(ecef(0., 0., 5.), Rotation::identity()));

        let hit = raycaster.intersect(&down_from(0., 0., 10.)).expect("hits both");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 5., epsilon = 1e-12);

        assert!(raycaster.set_intersectable(near, false));
        assert_eq!(raycaster.is_intersectable(near), Some(false));
        let hit = raycaster.intersect(&down_from(0., 0., 10.)).expect("hits the far one");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 10., epsilon = 1e-12);

        assert!(raycaster.set_intersectable(far, false));
        assert_eq!(raycaster.intersect(&down_from(0., 0., 10.)), None);
        assert!(!raycaster.set_intersectable(ObjectId(7), true));
    }

    #[test]
    fn ellipsoids_are_surfaces_too() {
        let a = Ellipsoid::WGS84.semi_major_axis().get::<meter>();
        let mut raycaster = SurfaceRaycaster::new();
        let globe = raycaster.add(Ellipsoid::WGS84);
        // a building on the equator
        let roof = raycaster.add(square().placed_at(ecef(a + 50., 0., 0.), facing_x()));

        let ray =
            Ray::new(ecef(a + 1000., 0., 0.), -Vector::<Ecef>::x_axis()).expect("unit direction");
        let hit = raycaster.pick(&ray).expect("hits the roof");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 950., epsilon = 1e-6);

        raycaster.set_intersectable(roof, false);
        let hit = raycaster.pick(&ray).expect("hits the ground");
        assert_abs_diff_eq!(hit.distance.get::<meter>(), 1000., epsilon = 1e-4);
        assert_eq!(hit.triangle, None);
        assert_relative_eq!(
            hit.face_normal.expect("ellipsoid normal"),
            Vector::<Ecef>::x_axis(),
            epsilon = 1e-12
        );
        assert!(matches!(raycaster.surface(globe), Some(Surface::Ellipsoid(_))));
    }
}
