use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use fmp_collision::{
    CodecError, ColliderMeshCodec, Mesh, MeshGraph, MeshModel, Submesh, TriangleMesh,
};
use fmp_format::{
    Action, Collider, ColliderInstance, CollisionGroup, CollisionGroupInstance, Command,
    Destruction, DestructionSubPart, Entity, FmpDocument, FormatVersion, FragmentGroup, Havok,
    HavokGroupParameters, Hierarchy, HierarchyNode, HierarchyNodeKind, Hitbox, HitboxGroup,
    IndexPair, Lod, Matrix, Node, NodeTransform, Object, ObjectSubPart, Parameter,
    ParameterValue, Section1, Section2, SettingsItem, VirtualSubPart, Visual,
    HAVOK_CONCAVE_FIELDS, HAVOK_CONVEX_FIELDS,
};

pub const NEW_VERSION: i32 = 0x0002_0100;
pub const OLD_VERSION: i32 = 0x0000_0003;

/// Stores meshes as a convex flag, counts, raw vertices and raw indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceCodec {
    pub triangle_limit: usize,
}

impl ReferenceCodec {
    pub fn new(triangle_limit: usize) -> Self {
        Self { triangle_limit }
    }
}

impl Default for ReferenceCodec {
    fn default() -> Self {
        Self::new(1024)
    }
}

fn invalid(error: std::io::Error) -> CodecError {
    CodecError::InvalidData(error.to_string())
}

impl ColliderMeshCodec for ReferenceCodec {
    fn encode(&self, mesh: &TriangleMesh, convex: bool) -> Result<Vec<u8>, CodecError> {
        if mesh.triangles.is_empty() {
            return Err(CodecError::Empty);
        }
        if mesh.triangle_count() > self.triangle_limit {
            return Err(CodecError::TooManyTriangles {
                triangles: mesh.triangle_count(),
                limit: self.triangle_limit,
            });
        }

        let mut data = Vec::new();
        data.write_u8(u8::from(convex)).map_err(invalid)?;
        data.write_u32::<LittleEndian>(mesh.vertex_count() as u32)
            .map_err(invalid)?;
        data.write_u32::<LittleEndian>(mesh.triangle_count() as u32)
            .map_err(invalid)?;
        for vertex in &mesh.vertices {
            for component in vertex.to_array() {
                data.write_f32::<LittleEndian>(component).map_err(invalid)?;
            }
        }
        for index in mesh.triangles.iter().flatten() {
            data.write_u32::<LittleEndian>(*index).map_err(invalid)?;
        }

        Ok(data)
    }

    fn decode(&self, data: &[u8]) -> Result<TriangleMesh, CodecError> {
        let mut cursor = Cursor::new(data);
        cursor.read_u8().map_err(invalid)?;
        let vertex_count = cursor.read_u32::<LittleEndian>().map_err(invalid)?;
        let triangle_count = cursor.read_u32::<LittleEndian>().map_err(invalid)?;

        let vertices = (0..vertex_count)
            .map(|_| {
                let mut vertex = [0.0; 3];
                cursor
                    .read_f32_into::<LittleEndian>(&mut vertex)
                    .map_err(invalid)?;
                Ok::<_, CodecError>(Vec3::from(vertex))
            })
            .collect::<Result<Vec<_>, CodecError>>()?;
        let triangles = (0..triangle_count)
            .map(|_| {
                let mut triangle = [0; 3];
                cursor
                    .read_u32_into::<LittleEndian>(&mut triangle)
                    .map_err(invalid)?;
                Ok::<_, CodecError>(triangle)
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        Ok(TriangleMesh::new(vertices, triangles))
    }

    fn is_convex(&self, data: &[u8]) -> Result<bool, CodecError> {
        match data.first() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            Some(flag) => Err(CodecError::InvalidData(format!("convex flag {}", flag))),
            None => Err(CodecError::Empty),
        }
    }
}

/// An axis aligned box with 8 vertices and 12 triangles.
pub fn cube(center: Vec3, half_size: f32) -> TriangleMesh {
    let vertices = (0..8)
        .map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { -1.0 } else { 1.0 },
                if i & 2 == 0 { -1.0 } else { 1.0 },
                if i & 4 == 0 { -1.0 } else { 1.0 },
            );
            center + corner * half_size
        })
        .collect();
    let triangles = vec![
        [0, 2, 1],
        [1, 2, 3],
        [4, 5, 6],
        [5, 7, 6],
        [0, 1, 4],
        [1, 5, 4],
        [2, 6, 3],
        [3, 6, 7],
        [0, 4, 2],
        [2, 4, 6],
        [1, 3, 5],
        [3, 7, 5],
    ];
    TriangleMesh::new(vertices, triangles)
}

/// A flat grid of `size` x `size` quads, not convex once `size` > 1.
pub fn grid(size: u32) -> TriangleMesh {
    let row = size + 1;
    let vertices = (0..row * row)
        .map(|i| Vec3::new((i % row) as f32, (i / row) as f32, 0.0))
        .collect();
    let triangles = (0..size * size)
        .flat_map(|quad| {
            let corner = quad / size * row + quad % size;
            [
                [corner, corner + 1, corner + row],
                [corner + 1, corner + row + 1, corner + row],
            ]
        })
        .collect();
    TriangleMesh::new(vertices, triangles)
}

/// A graph with one model holding a tagged wall mesh and a plain crate mesh.
pub fn mesh_graph() -> MeshGraph {
    MeshGraph::new(
        "warehouse",
        vec![MeshModel {
            name: "warehouse_model".to_owned(),
            meshes: vec![
                Mesh {
                    name: "walls".to_owned(),
                    submeshes: vec![
                        Submesh::new("wall_a@[fragment=1]", grid(3)),
                        Submesh::new("wall_b@[fragment=1]", grid(2)),
                        Submesh::new("wall_c@[fragment=2, edgevfx]", grid(2)),
                    ],
                },
                Mesh {
                    name: "crates".to_owned(),
                    submeshes: vec![Submesh::new("crate", cube(Vec3::new(4.0, 4.0, 1.0), 1.0))],
                },
            ],
        }],
    )
}

fn lod(distance: f32, emb: &str) -> Lod {
    Lod {
        distance,
        nsk: Some("stage/bg_common.nsk".to_owned()),
        emb: Some(emb.to_owned()),
        emm: Some("stage/common.emm".to_owned()),
        ema: None,
        i_20: 0,
    }
}

fn action(name: &str) -> Action {
    Action {
        name: name.to_owned(),
        commands: vec![Command {
            name: "spawn_effect".to_owned(),
            i_04: 2,
            parameters: vec![
                Parameter {
                    name: "enabled".to_owned(),
                    value: ParameterValue::Bool(true),
                },
                Parameter {
                    name: "count".to_owned(),
                    value: ParameterValue::Int(3),
                },
                Parameter {
                    name: "scale".to_owned(),
                    value: ParameterValue::Float(1.5),
                },
                Parameter {
                    name: "effect".to_owned(),
                    value: ParameterValue::String("smoke".to_owned()),
                },
            ],
        }],
    }
}

fn hierarchy() -> Hierarchy {
    let transform = |x: f32| NodeTransform {
        position: [x, 0.0, 2.0],
        rotation: [0.0; 3],
        scale: [1.0; 3],
    };
    let leaf = |center: [f32; 3], node_indices: Vec<u16>| HierarchyNode {
        i_04: 0,
        center,
        half_size: 8.0,
        kind: HierarchyNodeKind::Leaf { node_indices },
    };

    let mut children = [None; 8];
    children[0] = Some(1);
    children[5] = Some(2);

    Hierarchy {
        nodes: vec![
            Node {
                i_00: 1,
                transforms: vec![transform(1.0), transform(2.0)],
            },
            Node {
                i_00: 2,
                transforms: vec![transform(-3.0)],
            },
            Node {
                i_00: 3,
                transforms: Vec::new(),
            },
        ],
        tree: vec![
            HierarchyNode {
                i_04: 0,
                center: [0.0; 3],
                half_size: 16.0,
                kind: HierarchyNodeKind::Branch { children },
            },
            leaf([-8.0, -8.0, -8.0], vec![0, 2]),
            leaf([8.0, -8.0, 8.0], vec![1]),
        ],
        i_12: 0,
    }
}

fn hitbox_group(version: i32) -> HitboxGroup {
    let destruction = |group, seed: f32| Destruction {
        group,
        sub_part: DestructionSubPart {
            ints: [1, 2, 3, 4],
            values: [seed; 10],
        },
    };

    let mut door = Hitbox::new("door");
    door.child = Some(1);
    door.vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    door.face_indices = vec![0, 1, 2];
    // already grouped and sorted, as read back
    door.destructions = vec![
        destruction(0, 1.0),
        destruction(0, 2.0),
        destruction(3, 3.0),
    ];

    let mut handle = Hitbox::new("handle");
    handle.parent = Some(0);
    handle.sibling = Some(2);
    if !FormatVersion::from_version(version).is_old() {
        handle.havok = Some(vec![9, 8, 7, 6, 5]);
    }

    let mut hinge = Hitbox::new("hinge");
    hinge.parent = Some(0);

    HitboxGroup {
        name: "door".to_owned(),
        hitboxes: vec![door, handle, hinge],
    }
}

fn virtual_sub_part(i: i32) -> VirtualSubPart {
    VirtualSubPart {
        i_00: i,
        index_pairs: vec![IndexPair { first: i, second: i + 1 }],
        object_sub_part: (i == 0).then(|| ObjectSubPart {
            ints: [5, 6],
            values: [0.5; 7],
            matrix: Matrix::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        }),
        action: (i == 1).then(|| action("open")),
        values: [1.0, 2.0, 3.0],
        matrix: Matrix::IDENTITY,
    }
}

fn collision_group() -> CollisionGroup {
    let havok = |group, [field_a, field_b]: [i32; 2]| Havok {
        group,
        fragment_group: 1,
        field_a,
        field_b,
        data: vec![group as u8; 6],
    };

    let mut mesh = Collider::new("door_mesh");
    mesh.havok = vec![havok(0, HAVOK_CONVEX_FIELDS), havok(1, HAVOK_CONCAVE_FIELDS)];
    let mut model = Collider::new("door_model");
    model.children.push(mesh);
    let mut root = Collider::new("door");
    root.children.push(model);

    let mut group = CollisionGroup::new("door");
    group.colliders.push(root);
    group
}

fn collision_instance() -> CollisionGroupInstance {
    let mut mesh = ColliderInstance::new(Matrix::IDENTITY);
    mesh.parameters = vec![
        HavokGroupParameters {
            group: 0,
            param1: 0,
            param2: 0,
            i_12: 0,
        },
        HavokGroupParameters {
            group: 1,
            param1: 1,
            param2: 4,
            i_12: 0,
        },
    ];
    let mut model = ColliderInstance::new(Matrix::from_translation(Vec3::new(0.0, 0.0, 1.0)));
    model.children.push(mesh);
    let mut root = ColliderInstance::new(Matrix::IDENTITY);
    root.f_20 = 1.0;
    root.children.push(model);

    CollisionGroupInstance {
        collision_group_index: Some(0),
        i_02: 0,
        instances: vec![root],
    }
}

/// A document using every record type the format has.
///
/// Reading back what writing it produces gives an equal document, for both
/// [`NEW_VERSION`] and [`OLD_VERSION`].
pub fn sample_document(version: i32) -> FmpDocument {
    let mut doc = FmpDocument::new(version);
    doc.i_08 = 1;
    doc.header_ints = [0, 7];
    doc.settings_a.render_distance = 500.0;
    doc.settings_b.u_00 = 0xDEAD_BEEF;
    doc.settings_b.items = vec![
        SettingsItem {
            name: "gravity".to_owned(),
            value_type: 2,
            value: u64::from(9.8_f32.to_bits()),
        },
        SettingsItem {
            name: "time_limit".to_owned(),
            value_type: 1,
            value: 300,
        },
    ];
    doc.section1 = vec![Section1 {
        name: "sky".to_owned(),
        values: [0.1, 0.2, 0.3, 0.4, 0.5],
    }];
    doc.section2 = vec![Section2 {
        name: "light".to_owned(),
        i_04: 4,
        values: [1.0; 5],
    }];
    doc.fragment_groups = vec![
        FragmentGroup {
            name: "doors".to_owned(),
            object_indices: vec![0, 1, 2],
        },
        FragmentGroup {
            name: "nothing".to_owned(),
            object_indices: Vec::new(),
        },
    ];

    let mut door = Object::new("door_01");
    door.hitbox_group_index = Some(0);
    door.flags_b = 3;
    door.matrix = Matrix::from_translation(Vec3::new(10.0, 0.0, -4.0));
    door.entities = vec![
        Entity {
            i_00: 1,
            visual: Some(Visual {
                name: "door".to_owned(),
                i_04: 0,
                f_08: 1.0,
                lods: vec![lod(10.0, "stage/door.emb"), lod(60.0, "stage/door_lod.emb")],
                ints: [0, 1, 2],
            }),
            matrix: Matrix::IDENTITY,
        },
        Entity {
            i_00: 2,
            visual: Some(Visual {
                name: "frame".to_owned(),
                i_04: 1,
                f_08: 0.5,
                lods: vec![lod(30.0, "stage/door.emb")],
                ints: [0; 3],
            }),
            matrix: Matrix::from_translation(Vec3::X),
        },
        Entity {
            i_00: 3,
            visual: None,
            matrix: Matrix::IDENTITY,
        },
    ];
    door.action = Some(action("break"));
    door.virtual_sub_parts = (0..3).map(virtual_sub_part).collect();
    door.collision_instance = Some(collision_instance());

    let mut forest = Object::new("forest");
    forest.hierarchy = Some(hierarchy());

    let mut second_door = Object::new("door_02");
    second_door.collision_instance = Some(collision_instance());

    doc.objects = vec![door, forest, second_door];
    doc.hitbox_groups = vec![hitbox_group(version)];
    doc.collision_groups = vec![collision_group()];
    doc
}
