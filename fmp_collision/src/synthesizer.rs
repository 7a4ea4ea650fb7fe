use std::collections::BTreeMap;

use fmp_format::{
    Collider, CollisionGroup, Havok, Matrix, HAVOK_CONCAVE_FIELDS, HAVOK_CONVEX_FIELDS,
};
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};

use crate::{
    hull, BoneLookup, ColliderMeshCodec, Error, MeshGraph, MeshOptions, Result, Submesh,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Size of a dedicated thread pool, `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Meshes with at most this many vertices are always treated as convex.
    pub convex_vertex_threshold: usize,
}

impl SynthesisConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(&mut self, threads: Option<usize>) {
        self.threads = threads;
    }

    pub fn convex_vertex_threshold(&mut self, threshold: usize) {
        self.convex_vertex_threshold = threshold;
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            threads: None,
            convex_vertex_threshold: 4,
        }
    }
}

/// A synthesized collision group with its side tables.
///
/// Both tables are keyed by collider index, the pre-order position in the
/// collider tree with the root at 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesized {
    pub group: CollisionGroup,
    /// Absolute bone matrices of model colliders, if a skeleton was given.
    pub matrices: BTreeMap<usize, Matrix>,
    /// Options of every havok group of a mesh collider, indexed by group.
    pub flags: BTreeMap<usize, Vec<MeshOptions>>,
}

#[derive(Debug)]
struct SubmeshResult {
    data: Option<Vec<u8>>,
    convex: bool,
    options: MeshOptions,
}

pub struct Synthesizer<C> {
    codec: C,
    config: SynthesisConfig,
}

impl<C: ColliderMeshCodec> Synthesizer<C> {
    pub fn new(codec: C) -> Self {
        Self::with_config(codec, SynthesisConfig::default())
    }

    pub fn with_config(codec: C, config: SynthesisConfig) -> Self {
        Self { codec, config }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Builds a collision group from `graph`: a root collider, one collider per
    /// model and one per mesh.
    ///
    /// Submeshes that fail to encode are left out with a warning.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the dedicated thread pool can't be built.
    pub fn synthesize(
        &self,
        graph: &MeshGraph,
        skeleton: Option<&dyn BoneLookup>,
    ) -> Result<Synthesized> {
        let _span = debug_span!("synthesize", graph = %graph.name).entered();

        let submeshes: Vec<&Submesh> = graph.submeshes().collect();
        let results = self.encode_all(&submeshes)?;
        debug!(
            "encoded {} of {} submeshes",
            results.iter().filter(|r| r.data.is_some()).count(),
            results.len()
        );

        let mut results = results.into_iter();
        let mut root = Collider::new(graph.name.as_str());
        let mut matrices = BTreeMap::new();
        let mut flags = BTreeMap::new();
        let mut index = 1;

        for model in &graph.models {
            let model_index = index;
            index += 1;

            let mut model_collider = Collider::new(model.name.as_str());
            if let Some(matrix) = skeleton.and_then(|skeleton| skeleton.absolute_matrix(&model.name))
            {
                matrices.insert(model_index, Matrix::from_affine(matrix));
            }

            for mesh in &model.meshes {
                let mesh_results = results.by_ref().take(mesh.submeshes.len());
                let (havok, group_flags) = assemble_mesh(mesh_results);

                if havok.is_empty() {
                    warn!(
                        "mesh `{}` of model `{}`: no submesh could be encoded, dropping it",
                        mesh.name, model.name
                    );
                    continue;
                }

                flags.insert(index, group_flags);
                index += 1;

                let mut mesh_collider = Collider::new(mesh.name.as_str());
                mesh_collider.havok = havok;
                model_collider.children.push(mesh_collider);
            }

            root.children.push(model_collider);
        }

        let mut group = CollisionGroup::new(graph.name.as_str());
        group.colliders.push(root);

        Ok(Synthesized {
            group,
            matrices,
            flags,
        })
    }

    /// Encodes the only submesh of `graph` into a havok entry of group 0.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `graph` doesn't have exactly one submesh or if it can't be
    /// encoded.
    pub fn encode_single(&self, graph: &MeshGraph) -> Result<Havok> {
        let count = graph.submesh_count();
        let submesh = match graph.submeshes().next() {
            Some(submesh) if count == 1 => submesh,
            _ => return Err(Error::NotSingleSubmesh(count)),
        };

        let options = MeshOptions::parse(&submesh.name);
        let convex = self.classify(submesh, &options);
        let data = self.codec.encode(&submesh.mesh, convex)?;

        Ok(havok_entry(0, &options, convex, data))
    }

    fn classify(&self, submesh: &Submesh, options: &MeshOptions) -> bool {
        options.convex || hull::is_convex(&submesh.mesh, self.config.convex_vertex_threshold)
    }

    fn encode_submesh(&self, submesh: &Submesh) -> SubmeshResult {
        let options = MeshOptions::parse(&submesh.name);
        let convex = self.classify(submesh, &options);

        let data = match self.codec.encode(&submesh.mesh, convex) {
            Ok(data) => Some(data),
            Err(error) => {
                warn!("submesh `{}`: encoding failed: {}", submesh.name, error);
                None
            }
        };

        SubmeshResult {
            data,
            convex,
            options,
        }
    }

    fn encode_all(&self, submeshes: &[&Submesh]) -> Result<Vec<SubmeshResult>> {
        let encode = || {
            submeshes
                .par_iter()
                .map(|submesh| self.encode_submesh(submesh))
                .collect::<Vec<_>>()
        };

        match self.config.threads {
            None => Ok(encode()),
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .thread_name(|index| format!("collision synthesizer {}", index))
                    .num_threads(threads)
                    .build()
                    .map_err(|error| Error::ThreadPool(error.to_string()))?;
                Ok(pool.install(encode))
            }
        }
    }
}

/// Assigns havok groups to the encoded submeshes of one mesh.
///
/// A new group starts at the first submesh and whenever the options differ from
/// the previous encoded submesh.
fn assemble_mesh(results: impl Iterator<Item = SubmeshResult>) -> (Vec<Havok>, Vec<MeshOptions>) {
    let mut havok = Vec::new();
    let mut group_flags: Vec<MeshOptions> = Vec::new();

    for result in results {
        let data = match result.data {
            Some(data) => data,
            None => continue,
        };

        let same_group = group_flags
            .last()
            .map_or(false, |previous| previous.compare(&result.options));
        if !same_group {
            group_flags.push(result.options);
        }

        let group = group_flags.len() as i32 - 1;
        havok.push(havok_entry(group, &result.options, result.convex, data));
    }

    (havok, group_flags)
}

fn havok_entry(group: i32, options: &MeshOptions, convex: bool, data: Vec<u8>) -> Havok {
    let [field_a, field_b] = if convex {
        HAVOK_CONVEX_FIELDS
    } else {
        HAVOK_CONCAVE_FIELDS
    };

    Havok {
        group,
        fragment_group: options.fragment_group,
        field_a,
        field_b,
        data,
    }
}

#[cfg(test)]
mod tests {
    use std::result;

    use glam::{Affine3A, Vec3};

    use super::*;
    use crate::{Bone, CodecError, Mesh, MeshModel, Skeleton, TriangleMesh};

    /// Stores the triangle count, fails above `limit`.
    struct CountingCodec {
        limit: usize,
    }

    impl ColliderMeshCodec for CountingCodec {
        fn encode(&self, mesh: &TriangleMesh, convex: bool) -> result::Result<Vec<u8>, CodecError> {
            if mesh.triangle_count() > self.limit {
                return Err(CodecError::TooManyTriangles {
                    triangles: mesh.triangle_count(),
                    limit: self.limit,
                });
            }
            Ok(vec![mesh.triangle_count() as u8, u8::from(convex)])
        }

        fn decode(&self, _data: &[u8]) -> result::Result<TriangleMesh, CodecError> {
            Ok(TriangleMesh::default())
        }

        fn is_convex(&self, data: &[u8]) -> result::Result<bool, CodecError> {
            Ok(data.get(1) == Some(&1))
        }
    }

    fn triangles(count: usize) -> TriangleMesh {
        let vertices = (0..count * 3)
            .map(|i| Vec3::new(i as f32, (i % 3) as f32, (i % 7) as f32))
            .collect();
        let triangles = (0..count as u32)
            .map(|i| [i * 3, i * 3 + 1, i * 3 + 2])
            .collect();
        TriangleMesh::new(vertices, triangles)
    }

    fn graph(submeshes: Vec<Submesh>) -> MeshGraph {
        MeshGraph::new(
            "gate",
            vec![MeshModel {
                name: "gate_model".to_owned(),
                meshes: vec![Mesh {
                    name: "gate_mesh".to_owned(),
                    submeshes,
                }],
            }],
        )
    }

    #[test]
    fn equal_options_share_a_group() {
        let graph = graph(vec![
            Submesh::new("a@[fragment=1]", triangles(1)),
            Submesh::new("b@[fragment=1]", triangles(2)),
            Submesh::new("c@[fragment=2]", triangles(3)),
        ]);

        let synthesized = Synthesizer::new(CountingCodec { limit: 100 })
            .synthesize(&graph, None)
            .unwrap();

        let root = &synthesized.group.colliders[0];
        assert_eq!(root.name, "gate");
        let mesh = &root.children[0].children[0];
        let groups: Vec<i32> = mesh.havok.iter().map(|h| h.group).collect();
        let fragments: Vec<i32> = mesh.havok.iter().map(|h| h.fragment_group).collect();
        assert_eq!(groups, [0, 0, 1]);
        assert_eq!(fragments, [1, 1, 2]);

        // root 0, model 1, mesh 2
        let flags = &synthesized.flags[&2];
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[1].fragment_group, 2);
        assert!(synthesized.matrices.is_empty());
    }

    #[test]
    fn failed_submesh_is_left_out() {
        let graph = graph(vec![
            Submesh::new("small", triangles(2)),
            Submesh::new("huge", triangles(40)),
            Submesh::new("small_too", triangles(3)),
        ]);

        let synthesized = Synthesizer::new(CountingCodec { limit: 10 })
            .synthesize(&graph, None)
            .unwrap();

        let mesh = &synthesized.group.colliders[0].children[0].children[0];
        let sizes: Vec<u8> = mesh.havok.iter().map(|h| h.data[0]).collect();
        assert_eq!(sizes, [2, 3]);
        assert!(mesh.havok.iter().all(|h| h.group == 0));
    }

    #[test]
    fn mesh_without_encoded_submeshes_is_dropped() {
        let graph = graph(vec![Submesh::new("huge", triangles(40))]);

        let synthesized = Synthesizer::new(CountingCodec { limit: 10 })
            .synthesize(&graph, None)
            .unwrap();

        let model = &synthesized.group.colliders[0].children[0];
        assert!(model.children.is_empty());
        assert!(synthesized.flags.is_empty());
        assert_eq!(synthesized.group.collider_count(), 2);
    }

    #[test]
    fn convex_classification_picks_fields() {
        let mut config = SynthesisConfig::new();
        config.threads(Some(2));
        let synthesizer = Synthesizer::with_config(CountingCodec { limit: 100 }, config);

        let graph = graph(vec![
            Submesh::new("tri", triangles(1)),
            Submesh::new("strip", triangles(4)),
            Submesh::new("tagged@[convex]", triangles(4)),
        ]);
        let synthesized = synthesizer.synthesize(&graph, None).unwrap();
        let havok = &synthesized.group.colliders[0].children[0].children[0].havok;

        assert_eq!([havok[0].field_a, havok[0].field_b], HAVOK_CONVEX_FIELDS);
        assert_eq!([havok[2].field_a, havok[2].field_b], HAVOK_CONVEX_FIELDS);
        assert_eq!(havok[2].data[1], 1);
    }

    #[test]
    fn skeleton_matrices_are_keyed_by_model_collider() {
        let skeleton = Skeleton::new(vec![Bone {
            name: "GATE_MODEL".to_owned(),
            parent_bone_index: None,
            matrix: Affine3A::from_translation(Vec3::new(0.0, 0.0, 5.0)),
        }]);
        let graph = graph(vec![Submesh::new("a", triangles(1))]);

        let synthesized = Synthesizer::new(CountingCodec { limit: 100 })
            .synthesize(&graph, Some(&skeleton))
            .unwrap();

        assert_eq!(
            synthesized.matrices[&1].translation(),
            Vec3::new(0.0, 0.0, 5.0)
        );
    }

    #[test]
    fn encode_single_requires_one_submesh() {
        let synthesizer = Synthesizer::new(CountingCodec { limit: 100 });

        let havok = synthesizer
            .encode_single(&graph(vec![Submesh::new("a@[fragment=4]", triangles(1))]))
            .unwrap();
        assert_eq!(havok.group, 0);
        assert_eq!(havok.fragment_group, 4);

        let error = synthesizer
            .encode_single(&graph(vec![
                Submesh::new("a", triangles(1)),
                Submesh::new("b", triangles(1)),
            ]))
            .unwrap_err();
        assert_eq!(error, Error::NotSingleSubmesh(2));
        assert_eq!(error.kind(), crate::ErrorKind::Argument);
    }
}
