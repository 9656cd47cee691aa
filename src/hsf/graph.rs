//! Object tree reconstruction.
//!
//! The tree is rebuilt from the root's child lists. Stored parent fields are
//! only used to find the root; every resolved `parent` comes from the child
//! list that reached the object.

use rootcause::Report;
use tracing::{debug, warn};

use crate::data::parser_utils::{ABSENT, try_vec};
use crate::error::LoadError;
use crate::hsf::format::{ObjectKind, ObjectRecord, Section};
use crate::hsf::loader::LoadContext;
use crate::hsf::types::*;
use crate::recognized::Recognized;

/// Resolve the kind-specific part of an object.
pub(crate) fn resolve_payload(
    ctx: &LoadContext<'_>,
    record: &ObjectRecord,
) -> Result<ObjectPayload, Report<LoadError>> {
    match ObjectKind::from_raw(record.kind) {
        Recognized::Known(ObjectKind::Mesh) => Ok(ObjectPayload::Mesh(Box::new(resolve_mesh(ctx, record)?))),
        Recognized::Known(ObjectKind::Replica) => Ok(ObjectPayload::Replica(ctx.index(record.replica())?)),
        Recognized::Known(_) => Ok(ObjectPayload::Empty),
        Recognized::Unknown(raw) => {
            debug!("object kind {raw} has no known payload");
            Ok(ObjectPayload::Empty)
        }
    }
}

fn resolve_mesh(ctx: &LoadContext<'_>, record: &ObjectRecord) -> Result<MeshData, Report<LoadError>> {
    Ok(MeshData {
        faces: ctx.index(record.face)?,
        vertices: ctx.index(record.vertex)?,
        normals: ctx.index(record.normal)?,
        colors: ctx.index(record.color)?,
        texcoords: ctx.index(record.texcoord)?,
        material: ctx.loose_index(record.material),
        attribute: ctx.loose_index(record.attribute),
        shapes: ctx.indices_via_symbols(record.vertex_shape, record.vertex_shape_count as usize)?,
        clusters: ctx.indices_via_symbols(record.cluster, record.cluster_count as usize)?,
        envelopes: envelope_range(ctx, record.envelope, record.envelope_count)?,
        min: record.mesh_min(),
        max: record.mesh_max(),
        base_morph: record.base_morph(),
        morph_weights: record.morph_weights(),
        shape_kind: record.shape_kind,
    })
}

/// A mesh's envelopes are a contiguous run of the envelope table.
fn envelope_range(
    ctx: &LoadContext<'_>,
    start: u32,
    count: u32,
) -> Result<Vec<EnvelopeId>, Report<LoadError>> {
    if start == ABSENT || count == 0 {
        return Ok(Vec::new());
    }
    let available = ctx.header.count(Section::Envelope);
    match start.checked_add(count) {
        Some(end) if end as usize <= available => Ok((start..end).map(EnvelopeId).collect()),
        _ => Err(Report::new(LoadError::IndexOutOfRange {
            section: Section::Envelope,
            index: start.saturating_add(count - 1),
            count: available,
        })),
    }
}

pub(crate) fn build_object_graph<'a>(
    ctx: &LoadContext<'a>,
    records: &[ObjectRecord],
) -> Result<(Vec<Object<'a>>, Option<ObjectId>), Report<LoadError>> {
    traverse(ctx, records, resolve_payload)
}

/// Depth-first walk from every parentless object, building each object as it
/// is reached. Fails when an object is reached twice or never.
pub(crate) fn traverse<'a>(
    ctx: &LoadContext<'a>,
    records: &[ObjectRecord],
    payload: impl Fn(&LoadContext<'a>, &ObjectRecord) -> Result<ObjectPayload, Report<LoadError>>,
) -> Result<(Vec<Object<'a>>, Option<ObjectId>), Report<LoadError>> {
    if records.is_empty() {
        return Ok((Vec::new(), None));
    }

    let roots: Vec<ObjectId> = records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.parent == ABSENT)
        .map(|(i, _)| ObjectId(i as u32))
        .collect();

    let Some(&root) = roots.first() else {
        return Err(Report::new(LoadError::CorruptModel(
            "no parentless object to use as root".to_owned(),
        )));
    };
    if roots.len() > 1 {
        if ctx.strict_root {
            return Err(Report::new(LoadError::CorruptModel(format!(
                "{} parentless objects, expected one",
                roots.len()
            ))));
        }
        warn!(
            root = root.0,
            extra = roots.len() - 1,
            "multiple parentless objects, using the first as root"
        );
    }

    let mut slots: Vec<Option<Object<'a>>> = try_vec(records.len(), Section::Object)?;
    slots.resize_with(records.len(), || None);
    let mut seen = vec![false; records.len()];
    let mut stack: Vec<(ObjectId, Option<ObjectId>)> = Vec::new();

    for &start in &roots {
        seen[start.index()] = true;
        stack.push((start, None));

        while let Some((id, parent)) = stack.pop() {
            let record = &records[id.index()];
            let mut children: Vec<ObjectId> = Vec::new();
            for raw in ctx.symbol_slice(record.children, record.children_count as usize)? {
                let child: ObjectId = match ctx.index(*raw)? {
                    Some(child) => child,
                    None => {
                        return Err(Report::new(LoadError::CorruptModel(format!(
                            "object {} lists an absent child",
                            id.0
                        ))));
                    }
                };
                if seen[child.index()] {
                    return Err(Report::new(LoadError::CorruptModel(format!(
                        "object {} reached twice (cycle or shared child)",
                        child.0
                    ))));
                }
                seen[child.index()] = true;
                children.push(child);
            }

            // Reversed so children are built in list order.
            stack.extend(children.iter().rev().map(|child| (*child, Some(id))));

            slots[id.index()] = Some(Object {
                name: ctx.name(record.name)?,
                kind: ObjectKind::from_raw(record.kind),
                flags: record.flags,
                parent,
                children,
                base: record.base,
                current: record.current,
                payload: payload(ctx, record)?,
            });
        }
    }

    let mut objects = try_vec(slots.len(), Section::Object)?;
    for (i, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(object) => objects.push(object),
            None => {
                return Err(Report::new(LoadError::CorruptModel(format!(
                    "object {i} is not reachable from any root"
                ))));
            }
        }
    }

    debug!(objects = objects.len(), root = root.0, "built object graph");
    Ok((objects, Some(root)))
}

#[cfg(test)]
mod tests {
    use crate::error::LoadError;
    use crate::hsf::format::Section;
    use crate::hsf::names::Name;
    use crate::hsf::testutil::{HsfBuilder, ObjectSpec};
    use crate::hsf::types::*;
    use crate::hsf::{LoadOptions, load_model, load_model_with};
    use crate::recognized::Recognized;

    fn object_section(b: &mut HsfBuilder, specs: &[ObjectSpec]) {
        let mut w = b.writer();
        for spec in specs {
            spec.write(&mut w);
        }
        b.section(Section::Object, specs.len() as u32, w);
    }

    fn is_corrupt<T: std::fmt::Debug>(result: Result<T, rootcause::Report<LoadError>>) -> bool {
        matches!(
            result.map_err(|e| format!("{e}")),
            Err(msg) if msg.contains("corrupt")
        )
    }

    /// root -> (a -> c, b)
    fn small_tree(b: &mut HsfBuilder) -> Vec<ObjectSpec> {
        let names = ["root", "a", "b", "c"].map(|name| b.name(name));
        let root_children = b.symbols(&[1, 2]);
        let a_children = b.symbols(&[3]);
        vec![
            ObjectSpec {
                name: names[0],
                kind: 3,
                children_count: 2,
                children: root_children,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[1],
                kind: 4,
                parent: 0,
                children_count: 1,
                children: a_children,
                pos: [1.0, 2.0, 3.0],
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[2],
                kind: 0,
                parent: 0,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[3],
                kind: 4,
                parent: 1,
                ..ObjectSpec::default()
            },
        ]
    }

    #[test]
    fn parents_follow_child_lists() {
        let mut b = HsfBuilder::new();
        let specs = small_tree(&mut b);
        object_section(&mut b, &specs);
        let data = b.build();

        let model = load_model(&data).unwrap();
        assert_eq!(model.root, Some(ObjectId(0)));
        assert_eq!(model.objects[0].children, vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(model.objects[1].children, vec![ObjectId(3)]);
        assert_eq!(model.objects[3].parent, Some(ObjectId(1)));
        assert_eq!(model.objects[1].base.pos.y, 2.0);
        assert_eq!(model.objects[1].base.scale.x, 1.0);

        let parentless = model.objects.iter().filter(|o| o.parent.is_none()).count();
        assert_eq!(parentless, 1);

        // Every object reaches the root by walking parents.
        for i in 0..model.objects.len() {
            let top = model.ancestors(ObjectId(i as u32)).last();
            assert_eq!(top, model.root);
        }

        let names: Vec<_> = model.children(ObjectId(0)).map(|o| o.name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(model.object_parent(ObjectId(3)).map(|o| o.name), Some(Name::from("a")));
        assert_eq!(model.find_object("c"), Some(ObjectId(3)));
    }

    #[test]
    fn duplicate_root_depends_on_strictness() {
        let mut b = HsfBuilder::new();
        let first = b.name("first");
        let second = b.name("second");
        let specs = [
            ObjectSpec {
                name: first,
                kind: 3,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: second,
                kind: 3,
                ..ObjectSpec::default()
            },
        ];
        object_section(&mut b, &specs);
        let data = b.build();

        assert!(is_corrupt(load_model(&data)));

        let lenient = LoadOptions::builder().strict_root(false).build();
        let model = load_model_with(&data, &lenient).unwrap();
        assert_eq!(model.root, Some(ObjectId(0)));
        assert_eq!(model.root_object().map(|o| o.name), Some(Name::from("first")));
        assert_eq!(model.objects.len(), 2);
    }

    #[test]
    fn missing_root_is_corrupt() {
        let mut b = HsfBuilder::new();
        let name = b.name("orphan");
        let specs = [ObjectSpec {
            name,
            parent: 0,
            ..ObjectSpec::default()
        }];
        object_section(&mut b, &specs);
        let data = b.build();

        assert!(is_corrupt(load_model(&data)));
    }

    #[test]
    fn cycles_and_shared_children_are_corrupt() {
        let mut b = HsfBuilder::new();
        let name = b.name("node");
        let loop_back = b.symbols(&[0]);
        let specs = [ObjectSpec {
            name,
            children_count: 1,
            children: loop_back,
            ..ObjectSpec::default()
        }];
        object_section(&mut b, &specs);
        assert!(is_corrupt(load_model(&b.build())));

        let mut b = HsfBuilder::new();
        let name = b.name("node");
        let twice = b.symbols(&[1, 1]);
        let specs = [
            ObjectSpec {
                name,
                children_count: 2,
                children: twice,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name,
                parent: 0,
                ..ObjectSpec::default()
            },
        ];
        object_section(&mut b, &specs);
        assert!(is_corrupt(load_model(&b.build())));
    }

    #[test]
    fn unreachable_objects_are_corrupt() {
        let mut b = HsfBuilder::new();
        let name = b.name("node");
        let specs = [
            ObjectSpec {
                name,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name,
                parent: 0,
                ..ObjectSpec::default()
            },
        ];
        object_section(&mut b, &specs);
        assert!(is_corrupt(load_model(&b.build())));
    }

    #[test]
    fn payloads_follow_object_kind() {
        let mut b = HsfBuilder::new();
        let names = ["root", "mesh", "mirror", "odd"].map(|name| b.name(name));
        let children = b.symbols(&[1, 2, 3]);
        let vertex_name = b.name("v");
        let mut w = b.writer();
        for _ in 0..2 {
            w.u32(vertex_name).i32(0).u32(0);
        }
        b.section(Section::Vertex, 2, w);

        let shapes = b.symbols(&[1, 0]);
        let mut mesh_payload = [0u32; 40];
        mesh_payload[3] = 2.0f32.to_bits();
        mesh_payload[6] = 0.5f32.to_bits();
        mesh_payload[7 + 32] = 0.25f32.to_bits();
        let mut replica_payload = [0u32; 40];
        replica_payload[0] = 1;

        let specs = [
            ObjectSpec {
                name: names[0],
                kind: 3,
                children_count: 3,
                children,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[1],
                kind: 2,
                parent: 0,
                vertex: 1,
                vertex_shape_count: 2,
                vertex_shape: shapes,
                payload: mesh_payload,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[2],
                kind: 1,
                parent: 0,
                payload: replica_payload,
                ..ObjectSpec::default()
            },
            ObjectSpec {
                name: names[3],
                kind: 77,
                parent: 0,
                ..ObjectSpec::default()
            },
        ];
        object_section(&mut b, &specs);
        let data = b.build();

        let model = load_model(&data).unwrap();
        let mesh = model.objects[1].mesh().unwrap();
        assert_eq!(mesh.vertices, Some(VertexBufferId(1)));
        assert_eq!(mesh.faces, None);
        assert_eq!(mesh.material, None);
        assert_eq!(mesh.shapes, vec![VertexBufferId(1), VertexBufferId(0)]);
        assert!(mesh.envelopes.is_empty());
        assert_eq!(mesh.max.x, 2.0);
        assert_eq!(mesh.base_morph, 0.5);
        assert_eq!(mesh.morph_weights.len(), 33);
        assert_eq!(mesh.morph_weights[32], 0.25);

        assert_eq!(
            model.objects[2].payload.replica_ref(),
            Some(&Some(ObjectId(1)))
        );
        assert_eq!(model.objects[3].kind, Recognized::Unknown(77));
        assert!(model.objects[3].payload.is_empty());
    }

    #[test]
    fn mesh_envelope_range_is_checked() {
        let mut b = HsfBuilder::new();
        let name = b.name("mesh");
        let specs = [ObjectSpec {
            name,
            kind: 2,
            envelope: 0,
            envelope_count: 1,
            ..ObjectSpec::default()
        }];
        object_section(&mut b, &specs);
        assert!(load_model(&b.build()).is_err());
    }
}
