use crate::{
    reader::Reader,
    record::{read_array, write_array, Record},
    section::read_u16s,
    writer::{Slot, Writer},
    Error, FormatVersion, RecordType, Result,
};

const MAX_DEPTH: usize = 64;
const BRANCH_SIZE: usize = 56;
const LEAF_HEADER_SIZE: usize = 28;

/// Spatial partition of an object's nodes.
///
/// `tree` is an arena in pre-order, `tree[0]` is the root if there is one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Hierarchy {
    pub nodes: Vec<Node>,
    pub tree: Vec<HierarchyNode>,
    pub i_12: i32,
}

impl Hierarchy {
    #[must_use]
    pub fn root(&self) -> Option<&HierarchyNode> {
        self.tree.first()
    }
}

impl Record for Hierarchy {
    const TYPE: RecordType = RecordType::Hierarchy;

    type Slots = (Slot, Slot);

    fn size(_version: FormatVersion) -> usize {
        16
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let node_count = cursor.count()?;
        let nodes_offset = cursor.offset()?;
        let root_offset = cursor.offset()?;
        let i_12 = cursor.i32()?;

        let nodes: Vec<Node> = read_array(reader, nodes_offset, node_count)?;

        let mut tree = Vec::new();
        if let Some(root_offset) = root_offset {
            read_tree_node(reader, root_offset, nodes.len(), &mut tree, 0)?;
        }

        Ok(Self { nodes, tree, i_12 })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<(Slot, Slot)> {
        writer.write_count(self.nodes.len());
        let nodes = writer.placeholder();
        let root = writer.placeholder();
        writer.write_i32(self.i_12);
        Ok((nodes, root))
    }

    fn write_children(&self, writer: &mut Writer, (nodes, root): (Slot, Slot)) -> Result<()> {
        write_array(writer, nodes, &self.nodes)?;
        if !self.tree.is_empty() {
            writer.patch(root);
            self.write_tree_node(writer, 0, 0)?;
        }
        Ok(())
    }
}

impl Hierarchy {
    fn write_tree_node(&self, writer: &mut Writer, index: usize, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::Corrupted {
                ty: RecordType::HierarchyNode,
                error: "hierarchy is too deep or cyclic",
            });
        }
        let node = self.tree.get(index).ok_or(Error::Corrupted {
            ty: RecordType::HierarchyNode,
            error: "child index out of range",
        })?;

        let start = writer.position();
        writer.write_i32(node.kind.type_id());
        writer.write_i32(node.i_04);
        writer.write_f32s(&node.center);
        writer.write_f32(node.half_size);

        match &node.kind {
            HierarchyNodeKind::Branch { children } => {
                let slots: Vec<Slot> = children.iter().map(|_| writer.placeholder()).collect();
                writer.check_size(start, BRANCH_SIZE, RecordType::HierarchyNode)?;

                for (slot, child) in slots.into_iter().zip(children) {
                    if let Some(child) = *child {
                        writer.patch(slot);
                        self.write_tree_node(writer, child, depth + 1)?;
                    }
                }
            }
            HierarchyNodeKind::Leaf { node_indices } => {
                writer.write_count(node_indices.len());
                for &index in node_indices {
                    if usize::from(index) >= self.nodes.len() {
                        return Err(Error::Corrupted {
                            ty: RecordType::HierarchyNode,
                            error: "leaf references a missing node",
                        });
                    }
                    writer.write_u16(index);
                }
                writer.check_size(
                    start,
                    LEAF_HEADER_SIZE + 2 * node_indices.len(),
                    RecordType::HierarchyNode,
                )?;
                writer.align(4);
            }
        }

        Ok(())
    }
}

fn read_tree_node(
    reader: &Reader,
    offset: usize,
    node_count: usize,
    tree: &mut Vec<HierarchyNode>,
    depth: usize,
) -> Result<usize> {
    if depth > MAX_DEPTH {
        return Err(Error::Corrupted {
            ty: RecordType::HierarchyNode,
            error: "hierarchy is too deep or cyclic",
        });
    }

    let mut cursor = reader.cursor(offset, RecordType::HierarchyNode);
    let ty = cursor.i32()?;
    let i_04 = cursor.i32()?;
    let center = cursor.f32s()?;
    let half_size = cursor.f32()?;

    match ty {
        0 => {
            let mut child_offsets = [None; 8];
            for child_offset in &mut child_offsets {
                *child_offset = cursor.offset()?;
            }

            let index = tree.len();
            tree.push(HierarchyNode {
                i_04,
                center,
                half_size,
                kind: HierarchyNodeKind::Branch {
                    children: [None; 8],
                },
            });

            for (slot, child_offset) in child_offsets.into_iter().enumerate() {
                if let Some(child_offset) = child_offset {
                    let child = read_tree_node(reader, child_offset, node_count, tree, depth + 1)?;
                    if let HierarchyNodeKind::Branch { children } = &mut tree[index].kind {
                        children[slot] = Some(child);
                    }
                }
            }

            Ok(index)
        }
        1 => {
            let count = cursor.count()?;
            let node_indices =
                read_u16s(reader, Some(cursor.position()), count, RecordType::HierarchyNode)?;
            if node_indices
                .iter()
                .any(|&index| usize::from(index) >= node_count)
            {
                return Err(Error::Corrupted {
                    ty: RecordType::HierarchyNode,
                    error: "leaf references a missing node",
                });
            }

            tree.push(HierarchyNode {
                i_04,
                center,
                half_size,
                kind: HierarchyNodeKind::Leaf { node_indices },
            });
            Ok(tree.len() - 1)
        }
        other => Err(Error::InvalidNodeType(other)),
    }
}

/// An octree cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HierarchyNode {
    pub i_04: i32,
    pub center: [f32; 3],
    pub half_size: f32,
    pub kind: HierarchyNodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HierarchyNodeKind {
    /// Up to 8 children, as indices into [`Hierarchy::tree`].
    Branch { children: [Option<usize>; 8] },
    /// Indices into [`Hierarchy::nodes`].
    Leaf { node_indices: Vec<u16> },
}

impl HierarchyNodeKind {
    fn type_id(&self) -> i32 {
        match self {
            HierarchyNodeKind::Branch { .. } => 0,
            HierarchyNodeKind::Leaf { .. } => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
    pub i_00: i32,
    pub transforms: Vec<NodeTransform>,
}

impl Record for Node {
    const TYPE: RecordType = RecordType::Node;

    type Slots = Slot;

    fn size(_version: FormatVersion) -> usize {
        12
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let i_00 = cursor.i32()?;
        let count = cursor.count()?;
        let transforms_offset = cursor.offset()?;

        Ok(Self {
            i_00,
            transforms: read_array(reader, transforms_offset, count)?,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<Slot> {
        writer.write_i32(self.i_00);
        writer.write_count(self.transforms.len());
        Ok(writer.placeholder())
    }

    fn write_children(&self, writer: &mut Writer, slot: Slot) -> Result<()> {
        write_array(writer, slot, &self.transforms)
    }
}

/// Placement of a node. Rotation is in degrees, stored as radians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Record for NodeTransform {
    const TYPE: RecordType = RecordType::NodeTransform;

    type Slots = ();

    fn size(_version: FormatVersion) -> usize {
        36
    }

    fn read(reader: &Reader, offset: usize) -> Result<Self> {
        let mut cursor = reader.cursor(offset, Self::TYPE);
        let position = cursor.f32s()?;
        let rotation: [f32; 3] = cursor.f32s()?;
        let scale = cursor.f32s()?;

        Ok(Self {
            position,
            rotation: rotation.map(f32::to_degrees),
            scale,
        })
    }

    fn write_record(&self, writer: &mut Writer) -> Result<()> {
        writer.write_f32s(&self.position);
        writer.write_f32s(&self.rotation.map(f32::to_radians));
        writer.write_f32s(&self.scale);
        Ok(())
    }
}
