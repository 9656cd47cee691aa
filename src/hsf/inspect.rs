//! Release accounting and human-readable summaries.

use itertools::Itertools;
use tracing::debug;

use crate::hsf::format::Section;
use crate::hsf::types::{Curve, FaceIndices, Model};

/// What [`Model::release`] freed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseStats {
    /// Non-empty top-level tables.
    pub tables: usize,
    /// Entries across all tables.
    pub elements: usize,
    /// Strip faces, each owning its own quad list.
    pub face_strips: usize,
    /// Tracks owning a keyframe list.
    pub track_payloads: usize,
}

impl Model<'_> {
    /// Entry count of every table, in file section order.
    pub fn table_sizes(&self) -> Vec<(Section, usize)> {
        vec![
            (Section::Scene, self.scenes.len()),
            (Section::Color, self.colors.len()),
            (Section::Material, self.materials.len()),
            (Section::Attribute, self.attributes.len()),
            (Section::Vertex, self.vertices.len()),
            (Section::Normal, self.normals.len()),
            (Section::TexCoord, self.texcoords.len()),
            (Section::Face, self.faces.len()),
            (Section::Object, self.objects.len()),
            (Section::Bitmap, self.bitmaps.len()),
            (Section::Palette, self.palettes.len()),
            (Section::Motion, self.motions.len()),
            (Section::Envelope, self.envelopes.len()),
            (Section::Skeleton, self.skeleton.len()),
            (Section::Part, self.parts.len()),
            (Section::Cluster, self.clusters.len()),
            (Section::Shape, self.shapes.len()),
            (Section::MapAttribute, self.map_attributes.len()),
            (Section::Matrix, self.matrices.as_ref().map_or(0, |m| m.matrices.len())),
        ]
    }

    fn face_strip_count(&self) -> usize {
        self.faces
            .iter()
            .flat_map(|buffer| &buffer.data)
            .filter(|face| matches!(face.indices, FaceIndices::Strip { .. }))
            .count()
    }

    fn track_payload_count(&self) -> usize {
        self.motions
            .iter()
            .flat_map(|motion| &motion.tracks)
            .filter(|track| {
                matches!(
                    track.curve,
                    Curve::Step(_) | Curve::Linear(_) | Curve::Bezier(_) | Curve::Bitmap(_)
                )
            })
            .count()
    }

    /// Tear the model down, releasing every table along with the per-face and
    /// per-track lists nested in them.
    pub fn release(self) -> ReleaseStats {
        let sizes = self.table_sizes();
        let stats = ReleaseStats {
            tables: sizes.iter().filter(|(_, n)| *n > 0).count(),
            elements: sizes.iter().map(|(_, n)| n).sum(),
            face_strips: self.face_strip_count(),
            track_payloads: self.track_payload_count(),
        };
        drop(self);
        debug!(?stats, "released model");
        stats
    }

    pub fn print_summary(&self) {
        println!("HSF version {:03} ({:?}-endian)", self.version, self.byte_order);
        let tables = self
            .table_sizes()
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(section, n)| format!("{section}: {n}"))
            .join(", ");
        println!("  tables: {tables}");

        match self.root_object() {
            Some(root) => println!("  root: {} ({})", root.name, root.kind),
            None => println!("  root: none"),
        }

        let meshes = self.objects.iter().filter(|o| o.mesh().is_some()).count();
        println!("  meshes: {meshes}, face strips: {}", self.face_strip_count());

        for motion in &self.motions {
            let unresolved = motion
                .tracks
                .iter()
                .filter(|track| track.target.is_unresolved())
                .count();
            println!(
                "  motion {}: {} tracks, length {}, {} unresolved",
                motion.name,
                motion.tracks.len(),
                motion.length,
                unresolved
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsf::format::Vec3;
    use crate::hsf::names::Name;
    use crate::hsf::types::*;
    use crate::recognized::Recognized;

    #[test]
    fn release_counts_nested_lists() {
        let face = |indices| Face {
            kind: 0,
            material: 0,
            indices,
            nbt: Vec3::default(),
        };
        let track = |curve| Track {
            kind: Recognized::Unknown(0),
            start: 0,
            target: TrackTarget::Raw(0),
            channel: TrackChannel::Word(0),
            curve,
        };
        let model = Model {
            faces: vec![Buffer {
                name: Name::from("f"),
                data: vec![
                    face(FaceIndices::Fixed([[0; 4]; 4])),
                    face(FaceIndices::Strip {
                        head: [[0; 4]; 3],
                        quads: vec![[1, 2, 3, 4]],
                    }),
                ],
            }],
            motions: vec![Motion {
                name: Name::from("m"),
                length: 1.0,
                tracks: vec![track(Curve::Constant(1.0)), track(Curve::Linear(Vec::new()))],
            }],
            matrices: Some(MatrixBlock {
                base_index: 0,
                matrices: vec![[[0.0; 4]; 3]; 2],
            }),
            ..Model::default()
        };

        let stats = model.release();
        assert_eq!(
            stats,
            ReleaseStats {
                tables: 3,
                elements: 4,
                face_strips: 1,
                track_payloads: 1,
            }
        );
    }

    #[test]
    fn empty_model_releases_nothing() {
        assert_eq!(Model::default().release(), ReleaseStats::default());
    }
}
