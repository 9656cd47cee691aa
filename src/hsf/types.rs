//! The resolved, index-linked scene model.
//!
//! Every cross reference is a typed index into one of the [`Model`]'s tables.
//! Names borrow from the buffer the model was loaded from.

use variantly::Variantly;

use crate::data::ByteOrder;
use crate::hsf::format::{CurveKind, Matrix3x4, ObjectKind, Section, TrackKind, Transform, Vec2, Vec3};
use crate::hsf::names::Name;
use crate::recognized::Recognized;

/// Index into one of the model's tables.
pub trait TableId: Copy + Eq {
    const SECTION: Section;

    fn from_index(index: u32) -> Self;
    fn index(self) -> usize;
}

macro_rules! table_id {
    ($($name:ident => $section:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            #[cfg_attr(feature = "serde", derive(serde::Serialize))]
            pub struct $name(pub u32);

            impl TableId for $name {
                const SECTION: Section = Section::$section;

                fn from_index(index: u32) -> Self {
                    $name(index)
                }

                fn index(self) -> usize {
                    self.0 as usize
                }
            }
        )*
    };
}

table_id! {
    ObjectId => Object,
    ColorBufferId => Color,
    VertexBufferId => Vertex,
    NormalBufferId => Normal,
    TexCoordBufferId => TexCoord,
    FaceBufferId => Face,
    MaterialId => Material,
    AttributeId => Attribute,
    BitmapId => Bitmap,
    PaletteId => Palette,
    EnvelopeId => Envelope,
    PartId => Part,
    ClusterId => Cluster,
}

/// A named, counted array of fixed-size elements.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Buffer<'a, T> {
    pub name: Name<'a>,
    pub data: T,
}

pub type ColorBuffer<'a> = Buffer<'a, Vec<[u8; 4]>>;
pub type VertexBuffer<'a> = Buffer<'a, Vec<Vec3>>;
pub type NormalBuffer<'a> = Buffer<'a, NormalData>;
pub type TexCoordBuffer<'a> = Buffer<'a, Vec<Vec2>>;
pub type FaceBuffer<'a> = Buffer<'a, Vec<Face>>;

/// Normals are stored as floats in skinned files and as packed signed bytes
/// otherwise.
#[derive(Debug, Clone, Variantly)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum NormalData {
    Float(Vec<Vec3>),
    Packed(Vec<[i8; 3]>),
}

impl NormalData {
    pub fn len(&self) -> usize {
        match self {
            NormalData::Float(v) => v.len(),
            NormalData::Packed(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Face {
    pub kind: i16,
    /// Index into the model's material table.
    pub material: i16,
    pub indices: FaceIndices,
    pub nbt: Vec3,
}

/// Per-vertex index quads: position, normal, color, texcoord.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum FaceIndices {
    Fixed([[i16; 4]; 4]),
    Strip {
        head: [[i16; 4]; 3],
        quads: Vec<[i16; 4]>,
    },
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Scene {
    pub fog_kind: u32,
    pub start: f32,
    pub end: f32,
    pub color: [u8; 4],
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Palette<'a> {
    pub name: Name<'a>,
    pub kind: i32,
    pub entries: Vec<u16>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Bitmap<'a> {
    pub name: Name<'a>,
    pub max_lod: u32,
    pub format: u8,
    pub bits_per_pixel: u8,
    pub width: i16,
    pub height: i16,
    pub palette_size: i16,
    pub tint: [u8; 4],
    pub palette: Option<PaletteId>,
    /// Top mip level, padded to whole tiles.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub pixels: &'a [u8],
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Material<'a> {
    pub name: Name<'a>,
    pub pass: u16,
    pub vertex_mode: u8,
    pub lit_color: [u8; 3],
    pub color: [u8; 3],
    pub shadow_color: [u8; 3],
    pub hilite_scale: f32,
    pub inv_alpha: f32,
    pub ref_alpha: f32,
    pub flags: u32,
    pub attributes: Vec<AttributeId>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Attribute<'a> {
    /// Attributes may be anonymous.
    pub name: Option<Name<'a>>,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub flags: u32,
    pub bitmap: Option<BitmapId>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Object<'a> {
    pub name: Name<'a>,
    pub kind: Recognized<ObjectKind, u32>,
    pub flags: u32,
    /// Set from the object's position in the tree, not the stored field.
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub base: Transform,
    pub current: Transform,
    pub payload: ObjectPayload,
}

impl Object<'_> {
    pub fn mesh(&self) -> Option<&MeshData> {
        self.payload.mesh_ref().map(|mesh| &**mesh)
    }
}

#[derive(Debug, Clone, Variantly)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ObjectPayload {
    Empty,
    Mesh(Box<MeshData>),
    /// Mirrors the geometry of another object.
    Replica(Option<ObjectId>),
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MeshData {
    pub faces: Option<FaceBufferId>,
    pub vertices: Option<VertexBufferId>,
    pub normals: Option<NormalBufferId>,
    pub colors: Option<ColorBufferId>,
    pub texcoords: Option<TexCoordBufferId>,
    pub material: Option<MaterialId>,
    pub attribute: Option<AttributeId>,
    /// Morph target vertex buffers.
    pub shapes: Vec<VertexBufferId>,
    pub clusters: Vec<ClusterId>,
    pub envelopes: Vec<EnvelopeId>,
    pub min: Vec3,
    pub max: Vec3,
    pub base_morph: f32,
    pub morph_weights: Vec<f32>,
    pub shape_kind: u8,
}

/// Range of vertex (or normal) indices influenced by one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct VertexSpan {
    pub start: u16,
    pub count: u16,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Envelope<'a> {
    pub name: Name<'a>,
    pub singles: Vec<SingleBinding>,
    pub duals: Vec<DualBinding>,
    pub multis: Vec<MultiBinding>,
    pub vertex_count: u32,
    pub copy_count: u32,
}

/// Vertices bound to one joint. `target` indexes the object table.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SingleBinding {
    pub target: u32,
    pub positions: VertexSpan,
    pub normals: VertexSpan,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DualBinding {
    pub targets: [u32; 2],
    pub weights: Vec<DualWeight>,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DualWeight {
    pub weight: f32,
    pub positions: VertexSpan,
    pub normals: VertexSpan,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MultiBinding {
    pub positions: VertexSpan,
    pub normals: VertexSpan,
    pub weights: Vec<MultiWeight>,
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MultiWeight {
    pub target: u32,
    pub value: f32,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Joint<'a> {
    pub name: Name<'a>,
    pub transform: Transform,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Part<'a> {
    pub name: Name<'a>,
    pub vertices: Vec<u16>,
}

/// A named morph vertex group.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Cluster<'a> {
    pub names: [Option<Name<'a>>; 2],
    pub target_name: Option<Name<'a>>,
    /// Filled in by cluster target adjustment.
    pub target: Option<ObjectId>,
    pub adjusted: bool,
    pub part: Option<PartId>,
    pub index: f32,
    pub weights: [f32; 32],
    pub kind: u16,
    pub flags: u8,
    /// Vertex buffers through the symbol table. Absent entries are kept as
    /// `None` so positions line up with the stored list.
    pub vertices: Vec<Option<VertexBufferId>>,
}

impl<'a> Cluster<'a> {
    /// The name motion tracks use to find this cluster.
    pub fn name(&self) -> Option<Name<'a>> {
        self.names[0]
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Shape<'a> {
    pub name: Name<'a>,
    pub vertices: Vec<VertexBufferId>,
}

/// Collision map cell bounds with their raw attribute codes.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MapAttribute {
    pub min_x: f32,
    pub min_z: f32,
    pub max_x: f32,
    pub max_z: f32,
    pub data: Vec<u16>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MatrixBlock {
    pub base_index: u32,
    pub matrices: Vec<Matrix3x4>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Motion<'a> {
    pub name: Name<'a>,
    pub length: f32,
    pub tracks: Vec<Track<'a>>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Track<'a> {
    pub kind: Recognized<TrackKind, u8>,
    pub start: u8,
    pub target: TrackTarget<'a>,
    pub channel: TrackChannel,
    pub curve: Curve,
}

/// What a track animates. Symbolic targets keep their name so they can be
/// resolved again against another model; `None` marks an inert track.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TrackTarget<'a> {
    Object {
        name: Name<'a>,
        object: Option<ObjectId>,
    },
    Cluster {
        name: Name<'a>,
        cluster: Option<ClusterId>,
    },
    Material(u16),
    Attribute {
        name: Option<Name<'a>>,
        attribute: Option<AttributeId>,
    },
    Raw(u16),
}

impl TrackTarget<'_> {
    /// A named target that found no match.
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            TrackTarget::Object { object: None, .. }
                | TrackTarget::Cluster { cluster: None, .. }
                | TrackTarget::Attribute {
                    name: Some(_),
                    attribute: None
                }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TrackChannel {
    Channel { param: i16, channel: u16 },
    Word(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Key {
    pub time: f32,
    pub value: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BezierKey {
    pub time: f32,
    pub value: f32,
    pub in_slope: f32,
    pub out_slope: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BitmapKey {
    pub time: f32,
    pub bitmap: Option<BitmapId>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Curve {
    Step(Vec<Key>),
    Linear(Vec<Key>),
    Bezier(Vec<BezierKey>),
    Bitmap(Vec<BitmapKey>),
    Constant(f32),
    Unknown { kind: u16, data: u32 },
}

impl Curve {
    pub fn kind(&self) -> Recognized<CurveKind, u16> {
        match self {
            Curve::Step(_) => Recognized::Known(CurveKind::Step),
            Curve::Linear(_) => Recognized::Known(CurveKind::Linear),
            Curve::Bezier(_) => Recognized::Known(CurveKind::Bezier),
            Curve::Bitmap(_) => Recognized::Known(CurveKind::Bitmap),
            Curve::Constant(_) => Recognized::Known(CurveKind::Constant),
            Curve::Unknown { kind, .. } => Recognized::Unknown(*kind),
        }
    }

    pub fn keyframe_count(&self) -> usize {
        match self {
            Curve::Step(keys) | Curve::Linear(keys) => keys.len(),
            Curve::Bezier(keys) => keys.len(),
            Curve::Bitmap(keys) => keys.len(),
            Curve::Constant(_) | Curve::Unknown { .. } => 0,
        }
    }
}

/// The fully linked scene.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Model<'a> {
    pub version: u32,
    pub byte_order: ByteOrder,
    pub scenes: Vec<Scene>,
    pub colors: Vec<ColorBuffer<'a>>,
    pub palettes: Vec<Palette<'a>>,
    pub bitmaps: Vec<Bitmap<'a>>,
    pub materials: Vec<Material<'a>>,
    pub attributes: Vec<Attribute<'a>>,
    pub vertices: Vec<VertexBuffer<'a>>,
    pub normals: Vec<NormalBuffer<'a>>,
    pub texcoords: Vec<TexCoordBuffer<'a>>,
    pub faces: Vec<FaceBuffer<'a>>,
    pub objects: Vec<Object<'a>>,
    pub root: Option<ObjectId>,
    pub envelopes: Vec<Envelope<'a>>,
    pub skeleton: Vec<Joint<'a>>,
    pub parts: Vec<Part<'a>>,
    pub clusters: Vec<Cluster<'a>>,
    pub shapes: Vec<Shape<'a>>,
    pub map_attributes: Vec<MapAttribute>,
    pub motions: Vec<Motion<'a>>,
    pub matrices: Option<MatrixBlock>,
}

impl<'a> Model<'a> {
    pub fn object(&self, id: ObjectId) -> &Object<'a> {
        &self.objects[id.index()]
    }

    pub fn root_object(&self) -> Option<&Object<'a>> {
        self.root.map(|id| self.object(id))
    }

    pub fn children(&self, id: ObjectId) -> impl Iterator<Item = &Object<'a>> + '_ {
        self.objects[id.index()]
            .children
            .iter()
            .map(|child| self.object(*child))
    }

    pub fn object_parent(&self, id: ObjectId) -> Option<&Object<'a>> {
        self.objects[id.index()].parent.map(|parent| self.object(parent))
    }

    /// First object whose name matches exactly, byte for byte.
    pub fn find_object(&self, name: impl AsRef<[u8]>) -> Option<ObjectId> {
        let name = name.as_ref();
        self.objects
            .iter()
            .position(|object| object.name.as_bytes() == name)
            .map(|i| ObjectId(i as u32))
    }

    /// First cluster whose primary name matches exactly.
    pub fn find_cluster(&self, name: impl AsRef<[u8]>) -> Option<ClusterId> {
        let name = name.as_ref();
        self.clusters
            .iter()
            .position(|cluster| cluster.name().is_some_and(|n| n.as_bytes() == name))
            .map(|i| ClusterId(i as u32))
    }

    /// First named attribute matching exactly. Anonymous attributes never match.
    pub fn find_attribute(&self, name: impl AsRef<[u8]>) -> Option<AttributeId> {
        let name = name.as_ref();
        self.attributes
            .iter()
            .position(|attribute| attribute.name.is_some_and(|n| n.as_bytes() == name))
            .map(|i| AttributeId(i as u32))
    }

    /// Walk parent links from `id` up to the root, including `id` itself.
    pub fn ancestors(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::successors(Some(id), move |current| self.objects[current.index()].parent)
    }
}
