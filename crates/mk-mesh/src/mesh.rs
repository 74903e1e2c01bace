//! Mesh assembly: derives element metrics from vertex coordinates and
//! connectivity, resolves neighbours, and freezes the result.

use std::collections::HashMap;

use mk_core::{ensure_finite, CompId, PatchId, TetId, TriId};
use nalgebra::{Point3, Vector3};

use crate::compartment::Compartment;
use crate::error::{MeshError, MeshResult};
use crate::patch::Patch;
use crate::tet::Tet;
use crate::tri::Tri;

/// The frozen mesh: element arenas plus compartment/patch groupings.
///
/// Tetrahedra not assigned to any compartment keep their global index but
/// have no element entry; queries against them report an error at the
/// engine level.
#[derive(Debug, Clone)]
pub struct TetMesh {
    n_tets: usize,
    elems: Vec<Option<Tet>>,
    tris: Vec<Tri>,
    comps: Vec<Compartment>,
    patches: Vec<Patch>,
}

impl TetMesh {
    /// Total number of tetrahedra in the mesh (assigned or not).
    pub fn n_tets(&self) -> usize {
        self.n_tets
    }

    /// Number of patch triangles.
    pub fn n_tris(&self) -> usize {
        self.tris.len()
    }

    /// Look up a tetrahedron; `None` when the index is out of range or the
    /// tet is not assigned to any compartment.
    pub fn tet(&self, id: TetId) -> Option<&Tet> {
        self.elems.get(id.idx()).and_then(|t| t.as_ref())
    }

    /// Look up a patch triangle.
    pub fn tri(&self, id: TriId) -> Option<&Tri> {
        self.tris.get(id.idx())
    }

    pub fn comps(&self) -> &[Compartment] {
        &self.comps
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn comp(&self, id: CompId) -> Option<&Compartment> {
        self.comps.get(id.idx())
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id.idx())
    }
}

struct CompSpec {
    name: String,
    vsys: Vec<String>,
    tets: Vec<TetId>,
}

struct PatchSpec {
    name: String,
    ssys: Vec<String>,
    tris: Vec<[u32; 3]>,
    icomp: CompId,
    ocomp: Option<CompId>,
}

/// Incremental mesh builder.
///
/// Register vertices and tetrahedra, group tets into compartments and
/// boundary triangles into patches, then call [`build`](Self::build) to
/// derive metrics and neighbour links and freeze the mesh. All structural
/// validation happens in `build`.
#[derive(Default)]
pub struct TetMeshBuilder {
    verts: Vec<Point3<f64>>,
    tets: Vec<[u32; 4]>,
    comps: Vec<CompSpec>,
    patches: Vec<PatchSpec>,
}

impl TetMeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex and return its index.
    pub fn add_vertex(&mut self, p: [f64; 3]) -> u32 {
        self.verts.push(Point3::new(p[0], p[1], p[2]));
        (self.verts.len() - 1) as u32
    }

    /// Add a tetrahedron by vertex indices and return its global id.
    pub fn add_tet(&mut self, verts: [u32; 4]) -> TetId {
        self.tets.push(verts);
        TetId::from_index((self.tets.len() - 1) as u32)
    }

    /// Group tets into a compartment and attach volume systems by name.
    pub fn add_compartment(
        &mut self,
        name: impl Into<String>,
        vsys: &[&str],
        tets: &[TetId],
    ) -> CompId {
        let id = CompId::from_index(self.comps.len() as u32);
        self.comps.push(CompSpec {
            name: name.into(),
            vsys: vsys.iter().map(|s| s.to_string()).collect(),
            tets: tets.to_vec(),
        });
        id
    }

    /// Group boundary triangles (given as vertex triples) into a patch.
    ///
    /// `icomp` is the required inner compartment; `ocomp` the optional
    /// outer one where the patch separates two volumes.
    pub fn add_patch(
        &mut self,
        name: impl Into<String>,
        ssys: &[&str],
        tris: &[[u32; 3]],
        icomp: CompId,
        ocomp: Option<CompId>,
    ) -> PatchId {
        let id = PatchId::from_index(self.patches.len() as u32);
        self.patches.push(PatchSpec {
            name: name.into(),
            ssys: ssys.iter().map(|s| s.to_string()).collect(),
            tris: tris.to_vec(),
            icomp,
            ocomp,
        });
        id
    }

    /// Validate, derive metrics, resolve neighbours and freeze the mesh.
    pub fn build(self) -> MeshResult<TetMesh> {
        let n_tets = self.tets.len();

        for (i, v) in self.verts.iter().enumerate() {
            for c in v.coords.iter() {
                ensure_finite(*c, "vertex coordinate").map_err(|e| {
                    MeshError::InvalidGeometry {
                        what: format!("vertex {i}: {e}"),
                    }
                })?;
            }
        }

        // Per-tet raw geometry
        let mut vols = Vec::with_capacity(n_tets);
        let mut barys = Vec::with_capacity(n_tets);
        for (i, tv) in self.tets.iter().enumerate() {
            let pts = self.tet_points(i, tv)?;
            let vol = tet_volume(&pts);
            if !(vol > 0.0) {
                return Err(MeshError::InvalidGeometry {
                    what: format!("tetrahedron {i} is degenerate (volume {vol})"),
                });
            }
            vols.push(vol);
            barys.push(barycenter4(&pts));
        }

        // Compartment membership
        let mut comp_of: Vec<Option<CompId>> = vec![None; n_tets];
        for (ci, spec) in self.comps.iter().enumerate() {
            if self.comps[..ci].iter().any(|c| c.name == spec.name) {
                return Err(MeshError::NameConflict {
                    kind: "compartment",
                    name: spec.name.clone(),
                });
            }
            let cid = CompId::from_index(ci as u32);
            for &t in &spec.tets {
                let ti = t.idx();
                if ti >= n_tets {
                    return Err(MeshError::OutOfRange {
                        what: format!("tet {t} in compartment '{}' does not exist", spec.name),
                    });
                }
                if comp_of[ti].is_some() {
                    return Err(MeshError::InvalidGeometry {
                        what: format!("tet {t} is assigned to more than one compartment"),
                    });
                }
                comp_of[ti] = Some(cid);
            }
        }

        // Face -> incident tets (face slot l is opposite vertex l)
        let mut face_tets: HashMap<[u32; 3], Vec<(usize, usize)>> = HashMap::new();
        for (i, tv) in self.tets.iter().enumerate() {
            if comp_of[i].is_none() {
                continue;
            }
            for l in 0..4 {
                face_tets
                    .entry(face_key(tet_face(tv, l)))
                    .or_default()
                    .push((i, l));
            }
        }
        for (key, inc) in &face_tets {
            if inc.len() > 2 {
                return Err(MeshError::InvalidGeometry {
                    what: format!("face {key:?} is shared by {} tets", inc.len()),
                });
            }
        }

        // Element construction with same-compartment neighbour links
        let mut elems: Vec<Option<Tet>> = vec![None; n_tets];
        for (i, tv) in self.tets.iter().enumerate() {
            let Some(comp) = comp_of[i] else { continue };
            let mut areas = [0.0; 4];
            let mut dists = [0.0; 4];
            let mut next_tet = [None; 4];
            for l in 0..4 {
                let face = tet_face(tv, l);
                areas[l] = tri_area(&self.face_points(&face));
                let inc = &face_tets[&face_key(face)];
                if let Some(&(j, _)) = inc.iter().find(|&&(j, _)| j != i) {
                    if comp_of[j] == Some(comp) {
                        next_tet[l] = Some(TetId::from_index(j as u32));
                        dists[l] = (barys[i] - barys[j]).norm();
                    }
                }
            }
            elems[i] = Some(Tet {
                idx: TetId::from_index(i as u32),
                comp,
                vol: vols[i],
                areas,
                dists,
                next_tet,
                next_tri: [None; 4],
            });
        }

        // Freeze compartments
        let mut comps = Vec::with_capacity(self.comps.len());
        for spec in &self.comps {
            let mut tet_l = HashMap::with_capacity(spec.tets.len());
            let mut vol = 0.0;
            for (l, &t) in spec.tets.iter().enumerate() {
                if tet_l.insert(t, l as u32).is_some() {
                    return Err(MeshError::InvalidGeometry {
                        what: format!("tet {t} listed twice in compartment '{}'", spec.name),
                    });
                }
                vol += vols[t.idx()];
            }
            comps.push(Compartment {
                name: spec.name.clone(),
                vsys: spec.vsys.clone(),
                tets: spec.tets.clone(),
                vol,
                tet_l,
            });
        }

        // Patch triangles
        let mut tris: Vec<Tri> = Vec::new();
        let mut patches = Vec::with_capacity(self.patches.len());
        let mut claimed_faces: HashMap<[u32; 3], TriId> = HashMap::new();
        for (pi, spec) in self.patches.iter().enumerate() {
            if self.patches[..pi].iter().any(|p| p.name == spec.name) {
                return Err(MeshError::NameConflict {
                    kind: "patch",
                    name: spec.name.clone(),
                });
            }
            if spec.icomp.idx() >= comps.len() {
                return Err(MeshError::OutOfRange {
                    what: format!("inner compartment of patch '{}' does not exist", spec.name),
                });
            }
            if let Some(oc) = spec.ocomp {
                if oc.idx() >= comps.len() {
                    return Err(MeshError::OutOfRange {
                        what: format!("outer compartment of patch '{}' does not exist", spec.name),
                    });
                }
            }
            let pid = PatchId::from_index(pi as u32);
            let mut patch_tris = Vec::with_capacity(spec.tris.len());
            let mut tri_l = HashMap::with_capacity(spec.tris.len());
            let mut area_tot = 0.0;
            for tvp in &spec.tris {
                let key = face_key(*tvp);
                if claimed_faces.contains_key(&key) {
                    return Err(MeshError::InvalidGeometry {
                        what: format!("triangle {tvp:?} belongs to more than one patch"),
                    });
                }
                let inc = face_tets.get(&key).ok_or_else(|| MeshError::InvalidGeometry {
                    what: format!(
                        "triangle {tvp:?} of patch '{}' matches no tetrahedron face",
                        spec.name
                    ),
                })?;
                let inner = inc
                    .iter()
                    .find(|&&(j, _)| comp_of[j] == Some(spec.icomp))
                    .map(|&(j, _)| TetId::from_index(j as u32))
                    .ok_or_else(|| MeshError::InvalidGeometry {
                        what: format!(
                            "triangle {tvp:?} of patch '{}' has no inner tetrahedron",
                            spec.name
                        ),
                    })?;
                let outer = match spec.ocomp {
                    Some(oc) => Some(
                        inc.iter()
                            .find(|&&(j, _)| comp_of[j] == Some(oc))
                            .map(|&(j, _)| TetId::from_index(j as u32))
                            .ok_or_else(|| MeshError::InvalidGeometry {
                                what: format!(
                                    "triangle {tvp:?} of patch '{}' has no outer tetrahedron",
                                    spec.name
                                ),
                            })?,
                    ),
                    None => None,
                };

                let pts = self.face_points(tvp);
                let area = tri_area(&pts);
                if !(area > 0.0) {
                    return Err(MeshError::InvalidGeometry {
                        what: format!("triangle {tvp:?} is degenerate (area {area})"),
                    });
                }
                let lengths = [
                    (pts[1] - pts[0]).norm(),
                    (pts[2] - pts[1]).norm(),
                    (pts[0] - pts[2]).norm(),
                ];

                let tid = TriId::from_index(tris.len() as u32);
                claimed_faces.insert(key, tid);
                tri_l.insert(tid, patch_tris.len() as u32);
                patch_tris.push(tid);
                area_tot += area;
                tris.push(Tri {
                    idx: tid,
                    patch: pid,
                    area,
                    lengths,
                    dists: [0.0; 3],
                    next_tri: [None; 3],
                    inner_tet: inner,
                    outer_tet: outer,
                });
            }
            patches.push(Patch {
                name: spec.name.clone(),
                ssys: spec.ssys.clone(),
                tris: patch_tris,
                area: area_tot,
                icomp: spec.icomp,
                ocomp: spec.ocomp,
                tri_l,
            });
        }

        // Same-patch edge neighbours
        let tri_verts: Vec<[u32; 3]> = self
            .patches
            .iter()
            .flat_map(|p| p.tris.iter().copied())
            .collect();
        let tri_barys: Vec<Point3<f64>> = tri_verts
            .iter()
            .map(|tv| barycenter3(&self.face_points(tv)))
            .collect();
        let mut edge_tris: HashMap<(u32, u32), Vec<(usize, usize)>> = HashMap::new();
        for (i, tv) in tri_verts.iter().enumerate() {
            for l in 0..3 {
                let e = edge_key(tv[l], tv[(l + 1) % 3]);
                edge_tris.entry(e).or_default().push((i, l));
            }
        }
        for (i, tv) in tri_verts.iter().enumerate() {
            for l in 0..3 {
                let e = edge_key(tv[l], tv[(l + 1) % 3]);
                // the neighbour must be unique within this patch; tris of
                // other patches may legitimately share a seam edge
                let nbr = {
                    let mut same_patch = edge_tris[&e]
                        .iter()
                        .filter(|&&(j, _)| j != i && tris[j].patch == tris[i].patch);
                    let first = same_patch.next().map(|&(j, _)| j);
                    if same_patch.next().is_some() {
                        return Err(MeshError::InvalidGeometry {
                            what: format!("edge {e:?} is shared by more than two patch triangles"),
                        });
                    }
                    first
                };
                if let Some(j) = nbr {
                    tris[i].next_tri[l] = Some(TriId::from_index(j as u32));
                    tris[i].dists[l] = (tri_barys[i] - tri_barys[j]).norm();
                }
            }
        }

        // Attach patch triangles to their inner/outer tets, using face
        // slots left free by absent same-compartment neighbours.
        for tri in &tris {
            attach_tri(&mut elems, tri.inner_tet, tri.idx)?;
            if let Some(ot) = tri.outer_tet {
                attach_tri(&mut elems, ot, tri.idx)?;
            }
        }

        Ok(TetMesh {
            n_tets,
            elems,
            tris,
            comps,
            patches,
        })
    }

    fn tet_points(&self, i: usize, tv: &[u32; 4]) -> MeshResult<[Point3<f64>; 4]> {
        let mut pts = [Point3::origin(); 4];
        for (k, &v) in tv.iter().enumerate() {
            pts[k] = *self
                .verts
                .get(v as usize)
                .ok_or_else(|| MeshError::OutOfRange {
                    what: format!("tetrahedron {i} references missing vertex {v}"),
                })?;
        }
        Ok(pts)
    }

    fn face_points(&self, tv: &[u32; 3]) -> [Point3<f64>; 3] {
        // callers have validated vertex indices via the owning tet
        [
            self.verts[tv[0] as usize],
            self.verts[tv[1] as usize],
            self.verts[tv[2] as usize],
        ]
    }
}

fn attach_tri(elems: &mut [Option<Tet>], tet: TetId, tri: TriId) -> MeshResult<()> {
    let elem = elems[tet.idx()].as_mut().expect("patch tet is assigned");
    for l in 0..4 {
        if elem.next_tet[l].is_none() && elem.next_tri[l].is_none() {
            elem.next_tri[l] = Some(tri);
            return Ok(());
        }
    }
    Err(MeshError::InvalidGeometry {
        what: format!("tet {tet} has no free face slot for patch triangle {tri}"),
    })
}

/// Face `l` of a tet is the triangle opposite vertex `l`.
fn tet_face(tv: &[u32; 4], l: usize) -> [u32; 3] {
    match l {
        0 => [tv[1], tv[2], tv[3]],
        1 => [tv[0], tv[2], tv[3]],
        2 => [tv[0], tv[1], tv[3]],
        _ => [tv[0], tv[1], tv[2]],
    }
}

fn face_key(mut f: [u32; 3]) -> [u32; 3] {
    f.sort_unstable();
    f
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

fn tet_volume(p: &[Point3<f64>; 4]) -> f64 {
    let ab: Vector3<f64> = p[1] - p[0];
    let ac: Vector3<f64> = p[2] - p[0];
    let ad: Vector3<f64> = p[3] - p[0];
    (ab.dot(&ac.cross(&ad)) / 6.0).abs()
}

fn tri_area(p: &[Point3<f64>; 3]) -> f64 {
    let ab: Vector3<f64> = p[1] - p[0];
    let ac: Vector3<f64> = p[2] - p[0];
    0.5 * ab.cross(&ac).norm()
}

fn barycenter4(p: &[Point3<f64>; 4]) -> Point3<f64> {
    Point3::from((p[0].coords + p[1].coords + p[2].coords + p[3].coords) / 4.0)
}

fn barycenter3(p: &[Point3<f64>; 3]) -> Point3<f64> {
    Point3::from((p[0].coords + p[1].coords + p[2].coords) / 3.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two tets sharing the face (1,2,3); the second is the mirror image
    /// of the first through that face's plane.
    fn mirror_pair() -> TetMeshBuilder {
        let mut b = TetMeshBuilder::new();
        let v0 = b.add_vertex([0.0, 0.0, 0.0]);
        let v1 = b.add_vertex([1.0, 0.0, 0.0]);
        let v2 = b.add_vertex([0.0, 1.0, 0.0]);
        let v3 = b.add_vertex([0.0, 0.0, 1.0]);
        let v4 = b.add_vertex([2.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0]);
        b.add_tet([v0, v1, v2, v3]);
        b.add_tet([v4, v1, v2, v3]);
        b
    }

    #[test]
    fn two_tet_neighbours_and_metrics() {
        let mut b = mirror_pair();
        let t0 = TetId::from_index(0);
        let t1 = TetId::from_index(1);
        b.add_compartment("cyto", &["vsys"], &[t0, t1]);
        let mesh = b.build().unwrap();

        let tet0 = mesh.tet(t0).unwrap();
        let tet1 = mesh.tet(t1).unwrap();
        assert!((tet0.vol - 1.0 / 6.0).abs() < 1e-12);
        assert!((tet1.vol - 1.0 / 6.0).abs() < 1e-12);

        // Exactly one linked face each, pointing at the other tet,
        // through the shared face opposite vertex slot 0.
        assert_eq!(tet0.n_neighbours(), 1);
        assert_eq!(tet0.next_tet[0], Some(t1));
        assert_eq!(tet1.next_tet[0], Some(t0));
        assert!((tet0.areas[0] - 3.0_f64.sqrt() / 2.0).abs() < 1e-12);
        assert!(tet0.dists[0] > 0.0);
        assert!((tet0.dists[0] - tet1.dists[0]).abs() < 1e-15);

        let comp = mesh.comp(CompId::from_index(0)).unwrap();
        assert!((comp.vol - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(comp.tet_g2l(t1), Some(1));
    }

    #[test]
    fn cross_compartment_faces_are_not_linked() {
        let mut b = mirror_pair();
        let t0 = TetId::from_index(0);
        let t1 = TetId::from_index(1);
        b.add_compartment("left", &[], &[t0]);
        b.add_compartment("right", &[], &[t1]);
        let mesh = b.build().unwrap();
        assert_eq!(mesh.tet(t0).unwrap().n_neighbours(), 0);
        assert_eq!(mesh.tet(t1).unwrap().n_neighbours(), 0);
    }

    #[test]
    fn patch_between_two_compartments() {
        let mut b = mirror_pair();
        let t0 = TetId::from_index(0);
        let t1 = TetId::from_index(1);
        let left = b.add_compartment("left", &[], &[t0]);
        let right = b.add_compartment("right", &[], &[t1]);
        let pid = b.add_patch("memb", &["ssys"], &[[1, 2, 3]], left, Some(right));
        let mesh = b.build().unwrap();

        let patch = mesh.patch(pid).unwrap();
        assert_eq!(patch.n_tris(), 1);
        let tri = mesh.tri(patch.tris[0]).unwrap();
        assert_eq!(tri.inner_tet, t0);
        assert_eq!(tri.outer_tet, Some(t1));
        assert!((tri.area - 3.0_f64.sqrt() / 2.0).abs() < 1e-12);
        assert_eq!(tri.next_tri, [None; 3]);

        // The tri occupies a face slot on both adjacent tets.
        let occupied = |t: TetId| {
            mesh.tet(t)
                .unwrap()
                .next_tri
                .iter()
                .filter(|s| s.is_some())
                .count()
        };
        assert_eq!(occupied(t0), 1);
        assert_eq!(occupied(t1), 1);
    }

    #[test]
    fn patch_without_inner_tet_is_rejected() {
        let mut b = mirror_pair();
        let t0 = TetId::from_index(0);
        let t1 = TetId::from_index(1);
        let _left = b.add_compartment("left", &[], &[t0]);
        let right = b.add_compartment("right", &[], &[t1]);
        // face (0,1,2) belongs to the left tet only; claiming `right` as
        // inner compartment cannot work
        b.add_patch("bad", &[], &[[0, 1, 2]], right, None);
        let err = b.build().unwrap_err();
        assert!(matches!(err, MeshError::InvalidGeometry { .. }));
    }

    #[test]
    fn degenerate_tet_is_rejected() {
        let mut b = TetMeshBuilder::new();
        let v0 = b.add_vertex([0.0, 0.0, 0.0]);
        let v1 = b.add_vertex([1.0, 0.0, 0.0]);
        let v2 = b.add_vertex([0.0, 1.0, 0.0]);
        let v3 = b.add_vertex([1.0, 1.0, 0.0]); // coplanar
        let t = b.add_tet([v0, v1, v2, v3]);
        b.add_compartment("flat", &[], &[t]);
        let err = b.build().unwrap_err();
        assert!(matches!(err, MeshError::InvalidGeometry { .. }));
    }

    #[test]
    fn duplicate_compartment_assignment_is_rejected() {
        let mut b = mirror_pair();
        let t0 = TetId::from_index(0);
        let t1 = TetId::from_index(1);
        b.add_compartment("a", &[], &[t0, t1]);
        b.add_compartment("b", &[], &[t1]);
        let err = b.build().unwrap_err();
        assert!(matches!(err, MeshError::InvalidGeometry { .. }));
    }

    #[test]
    fn shared_patch_edge_neighbours() {
        // Square split into two triangles on top of two tets.
        let mut b = TetMeshBuilder::new();
        let v0 = b.add_vertex([0.0, 0.0, 0.0]);
        let v1 = b.add_vertex([1.0, 0.0, 0.0]);
        let v2 = b.add_vertex([1.0, 1.0, 0.0]);
        let v3 = b.add_vertex([0.0, 1.0, 0.0]);
        let apex = b.add_vertex([0.5, 0.5, -1.0]);
        let t0 = b.add_tet([v0, v1, v2, apex]);
        let t1 = b.add_tet([v0, v2, v3, apex]);
        let comp = b.add_compartment("cyto", &[], &[t0, t1]);
        let pid = b.add_patch("top", &[], &[[v0, v1, v2], [v0, v2, v3]], comp, None);
        let mesh = b.build().unwrap();

        let patch = mesh.patch(pid).unwrap();
        let a = mesh.tri(patch.tris[0]).unwrap();
        let bt = mesh.tri(patch.tris[1]).unwrap();
        // linked across the shared diagonal (v0, v2)
        assert_eq!(
            a.next_tri.iter().filter(|n| n.is_some()).count(),
            1,
            "one edge neighbour"
        );
        assert_eq!(a.next_tri[2], Some(patch.tris[1]));
        assert_eq!(bt.next_tri[0], Some(patch.tris[0]));
        assert!(a.dists[2] > 0.0);
    }
}
