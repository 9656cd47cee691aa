//! Motions and their tracks.
//!
//! Tracks of every motion follow the motion array back to back, and curve
//! payloads follow the last track. Symbolic targets (objects, clusters and
//! attributes) are stored by name and resolved after the rest of the model
//! is built, so the same motion can be pointed at another model later.

use rootcause::Report;
use tracing::{debug, trace};

use crate::data::parser_utils::{region_end, resolve_offset, try_vec};
use crate::error::LoadError;
use crate::hsf::format::*;
use crate::hsf::loader::LoadContext;
use crate::hsf::types::*;
use crate::recognized::Recognized;

/// Attribute tracks with this target animate no named attribute.
const NO_TARGET: u16 = 0xFFFF;

enum RawCurve {
    Ready(Curve),
    Bitmap(Vec<BitmapKeyRecord>),
}

fn keys(records: Vec<KeyRecord>) -> Vec<Key> {
    records
        .into_iter()
        .map(|k| Key {
            time: k.time,
            value: k.value,
        })
        .collect()
}

impl<'a> Motion<'a> {
    /// Resolve every symbolic track target against `model`'s tables by name.
    /// Targets with no match become `None` and the track stays inert.
    /// Returns the number of targets that resolved.
    pub fn retarget(&mut self, model: &Model<'_>) -> usize {
        let mut resolved = 0;
        for track in &mut self.tracks {
            let found = match &mut track.target {
                TrackTarget::Object { name, object } => {
                    *object = model.find_object(*name);
                    object.is_some()
                }
                TrackTarget::Cluster { name, cluster } => {
                    *cluster = model.find_cluster(*name);
                    cluster.is_some()
                }
                TrackTarget::Attribute {
                    name: Some(name),
                    attribute,
                } => {
                    *attribute = model.find_attribute(*name);
                    attribute.is_some()
                }
                TrackTarget::Attribute { name: None, .. }
                | TrackTarget::Material(_)
                | TrackTarget::Raw(_) => continue,
            };
            if found {
                resolved += 1;
            } else {
                debug!(motion = %self.name, target = ?track.target, "motion target not found");
            }
        }
        resolved
    }
}

pub(crate) fn load_motions<'a>(ctx: &mut LoadContext<'a>) -> Result<Vec<Motion<'a>>, Report<LoadError>> {
    let entry = ctx.header.entry(Section::Motion);
    if entry.is_empty() {
        return Ok(Vec::new());
    }
    let track_base = ctx.data_base(Section::Motion, MOTION_SIZE)?;

    let (records, raw_tracks) = ctx.image.session(|img| {
        let records: Vec<MotionRecord> =
            img.read_array(entry.offset(), entry.count(), Section::Motion)?;
        let total: usize = records.iter().map(|m| m.track_count.max(0) as usize).sum();
        let tracks: Vec<TrackRecord> = img.read_tagged_array(track_base, total, Section::Motion)?;
        let curve_base = region_end(track_base, total, TRACK_SIZE)?;

        let mut raw = try_vec(tracks.len(), Section::Motion)?;
        for track in tracks {
            let count = track.keyframe_count as usize;
            let payload = resolve_offset(curve_base, track.data);
            let curve = match (CurveKind::from_raw(track.curve), payload) {
                (Recognized::Known(CurveKind::Constant), _) => RawCurve::Ready(Curve::Constant(track.constant())),
                (Recognized::Unknown(kind), _) => RawCurve::Ready(Curve::Unknown {
                    kind,
                    data: track.data,
                }),
                (Recognized::Known(CurveKind::Step), Some(at)) => {
                    RawCurve::Ready(Curve::Step(keys(img.read_array(at, count, Section::Motion)?)))
                }
                (Recognized::Known(CurveKind::Linear), Some(at)) => {
                    RawCurve::Ready(Curve::Linear(keys(img.read_array(at, count, Section::Motion)?)))
                }
                (Recognized::Known(CurveKind::Bezier), Some(at)) => {
                    let records: Vec<BezierKeyRecord> = img.read_array(at, count, Section::Motion)?;
                    RawCurve::Ready(Curve::Bezier(
                        records
                            .into_iter()
                            .map(|k| BezierKey {
                                time: k.time,
                                value: k.value,
                                in_slope: k.in_slope,
                                out_slope: k.out_slope,
                            })
                            .collect(),
                    ))
                }
                (Recognized::Known(CurveKind::Bitmap), Some(at)) => {
                    RawCurve::Bitmap(img.read_array(at, count, Section::Motion)?)
                }
                (Recognized::Known(CurveKind::Step), None) => RawCurve::Ready(Curve::Step(Vec::new())),
                (Recognized::Known(CurveKind::Linear), None) => RawCurve::Ready(Curve::Linear(Vec::new())),
                (Recognized::Known(CurveKind::Bezier), None) => RawCurve::Ready(Curve::Bezier(Vec::new())),
                (Recognized::Known(CurveKind::Bitmap), None) => RawCurve::Bitmap(Vec::new()),
            };
            raw.push((track, curve));
        }
        Ok::<_, Report<LoadError>>((records, raw))
    })?;

    let mut tracks = raw_tracks.into_iter();
    let mut motions = try_vec(records.len(), Section::Motion)?;
    for record in records {
        let count = record.track_count.max(0) as usize;
        let mut resolved = try_vec(count, Section::Motion)?;
        for (track, curve) in tracks.by_ref().take(count) {
            resolved.push(resolve_track(ctx, &track, curve)?);
        }
        let motion = Motion {
            name: ctx.name(record.name)?,
            length: record.length,
            tracks: resolved,
        };
        trace!(motion = %motion.name, tracks = motion.tracks.len(), "loaded motion");
        motions.push(motion);
    }
    Ok(motions)
}

fn resolve_track<'a>(
    ctx: &LoadContext<'a>,
    track: &TrackRecord,
    curve: RawCurve,
) -> Result<Track<'a>, Report<LoadError>> {
    let kind = TrackKind::from_raw(track.kind);

    let target = match kind {
        Recognized::Known(TrackKind::Transform | TrackKind::Morph) => TrackTarget::Object {
            name: ctx.short_name(track.target)?,
            object: None,
        },
        Recognized::Known(TrackKind::Cluster | TrackKind::ClusterWeight) => TrackTarget::Cluster {
            name: ctx.short_name(track.target)?,
            cluster: None,
        },
        Recognized::Known(TrackKind::Material) => TrackTarget::Material(track.target),
        Recognized::Known(TrackKind::Attribute) if track.target == NO_TARGET => TrackTarget::Attribute {
            name: None,
            attribute: None,
        },
        Recognized::Known(TrackKind::Attribute) => TrackTarget::Attribute {
            name: Some(ctx.short_name(track.target)?),
            attribute: None,
        },
        Recognized::Unknown(raw) => {
            debug!("track kind {raw} has no known target");
            TrackTarget::Raw(track.target)
        }
    };

    let channel = if kind.is(TrackKind::ClusterWeight) {
        TrackChannel::Word(track.param_word())
    } else {
        let (param, channel) = track.param_pair();
        TrackChannel::Channel { param, channel }
    };

    let curve = match curve {
        RawCurve::Ready(curve) => curve,
        RawCurve::Bitmap(records) => {
            let mut keys = try_vec(records.len(), Section::Motion)?;
            for key in records {
                keys.push(BitmapKey {
                    time: key.time,
                    bitmap: ctx.index(key.bitmap)?,
                });
            }
            Curve::Bitmap(keys)
        }
    };

    Ok(Track {
        kind,
        start: track.start,
        target,
        channel,
        curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hsf::load_model;
    use crate::hsf::names::Name;
    use crate::hsf::testutil::{HsfBuilder, ObjectSpec, Writer};

    fn track(w: &mut Writer, kind: u8, target: u16, param: (i16, u16), curve: u16, keys: u16, data: u32) {
        w.u8(kind).u8(0).u16(target);
        w.i16(param.0).u16(param.1);
        w.u16(curve).u16(keys).u32(data);
    }

    /// One root named "body", one cluster named "mouth", one attribute "eye".
    fn scene(b: &mut HsfBuilder) {
        let body = b.name("body");
        let mut w = b.writer();
        ObjectSpec {
            name: body,
            kind: 3,
            ..ObjectSpec::default()
        }
        .write(&mut w);
        b.section(Section::Object, 1, w);

        let mouth = b.name("mouth");
        let mut w = b.writer();
        w.u32(mouth).absent().absent().absent().f32(0.0);
        for _ in 0..32 {
            w.f32(0.0);
        }
        w.u8(0).u8(0).u16(0).u32(0).u32(0);
        b.section(Section::Cluster, 1, w);

        let eye = b.name("eye");
        let mut w = b.writer();
        w.u32(eye).zeros(0x7C).absent();
        b.section(Section::Attribute, 1, w);

        let bitmap = b.name("tex");
        let mut w = b.writer();
        w.u32(bitmap).u32(0).u8(0).u8(8).i16(0).i16(0).i16(0);
        w.bytes(&[0; 4]).absent().u32(0).absent();
        b.section(Section::Bitmap, 1, w);
    }

    #[test]
    fn tracks_resolve_symbolic_targets() {
        let mut b = HsfBuilder::new();
        scene(&mut b);
        let anim = b.name("walk");
        let body = b.name("body");
        let ghost = b.name("ghost");
        let mouth = b.name("mouth");
        let eye = b.name("eye");

        let mut w = b.writer();
        w.u32(anim).i32(6).u32(0).f32(30.0);
        track(&mut w, 2, body as u16, (0, 8), 1, 2, 0);
        track(&mut w, 2, ghost as u16, (0, 9), 4, 0, 1.5f32.to_bits());
        track(&mut w, 6, mouth as u16, (0, 3), 0, 1, 16);
        track(&mut w, 10, eye as u16, (0, 0), 3, 1, 24);
        track(&mut w, 10, 0xFFFF, (-1, 2), 4, 0, 0);
        track(&mut w, 9, 0, (0, 1), 2, 1, 32);
        // Curve payloads.
        w.f32(0.0).f32(1.0).f32(10.0).f32(2.0);
        w.f32(5.0).f32(0.5);
        w.f32(0.0).u32(0);
        w.f32(0.0).f32(1.0).f32(0.1).f32(0.2);
        b.section(Section::Motion, 1, w);
        let data = b.build();

        let model = load_model(&data).unwrap();
        let motion = &model.motions[0];
        assert_eq!(motion.name, "walk");
        assert_eq!(motion.length, 30.0);
        assert_eq!(motion.tracks.len(), 6);

        let walk = &motion.tracks[0];
        assert_eq!(walk.kind, Recognized::Known(TrackKind::Transform));
        assert_eq!(
            walk.target,
            TrackTarget::Object {
                name: Name::from("body"),
                object: Some(ObjectId(0))
            }
        );
        assert_eq!(walk.channel, TrackChannel::Channel { param: 0, channel: 8 });
        assert_eq!(
            walk.curve,
            Curve::Linear(vec![Key { time: 0.0, value: 1.0 }, Key { time: 10.0, value: 2.0 }])
        );

        // Unmatched transform targets load as inert tracks.
        assert_eq!(
            motion.tracks[1].target,
            TrackTarget::Object {
                name: Name::from("ghost"),
                object: None
            }
        );
        assert_eq!(motion.tracks[1].curve, Curve::Constant(1.5));

        let weight = &motion.tracks[2];
        assert_eq!(
            weight.target,
            TrackTarget::Cluster {
                name: Name::from("mouth"),
                cluster: Some(ClusterId(0))
            }
        );
        assert_eq!(weight.channel, TrackChannel::Word(3));
        assert_eq!(weight.curve, Curve::Step(vec![Key { time: 5.0, value: 0.5 }]));

        let texture = &motion.tracks[3];
        assert_eq!(
            texture.target,
            TrackTarget::Attribute {
                name: Some(Name::from("eye")),
                attribute: Some(AttributeId(0))
            }
        );
        assert_eq!(
            texture.curve,
            Curve::Bitmap(vec![BitmapKey {
                time: 0.0,
                bitmap: Some(BitmapId(0))
            }])
        );

        assert_eq!(
            motion.tracks[4].target,
            TrackTarget::Attribute {
                name: None,
                attribute: None
            }
        );
        assert_eq!(motion.tracks[4].channel, TrackChannel::Channel { param: -1, channel: 2 });

        let material = &motion.tracks[5];
        assert_eq!(material.target, TrackTarget::Material(0));
        assert_eq!(
            material.curve,
            Curve::Bezier(vec![BezierKey {
                time: 0.0,
                value: 1.0,
                in_slope: 0.1,
                out_slope: 0.2
            }])
        );
    }

    #[test]
    fn tracks_are_split_across_motions() {
        let mut b = HsfBuilder::new();
        scene(&mut b);
        let first = b.name("idle");
        let second = b.name("jump");
        let body = b.name("body");

        let mut w = b.writer();
        w.u32(first).i32(1).u32(0).f32(10.0);
        w.u32(second).i32(2).u32(1).f32(20.0);
        track(&mut w, 2, body as u16, (0, 0), 4, 0, 0);
        track(&mut w, 3, body as u16, (0, 1), 4, 0, 0);
        track(&mut w, 42, 7, (0, 2), 4, 0, 0);
        b.section(Section::Motion, 2, w);
        let data = b.build();

        let model = load_model(&data).unwrap();
        assert_eq!(model.motions[0].tracks.len(), 1);
        assert_eq!(model.motions[1].tracks.len(), 2);
        assert_eq!(model.motions[1].tracks[0].kind, Recognized::Known(TrackKind::Morph));
        assert_eq!(model.motions[1].tracks[1].kind, Recognized::Unknown(42));
        assert_eq!(model.motions[1].tracks[1].target, TrackTarget::Raw(7));
    }

    #[test]
    fn retarget_points_tracks_at_another_model() {
        let mut b = HsfBuilder::new();
        scene(&mut b);
        let anim = b.name("wave");
        let body = b.name("body");
        let mut w = b.writer();
        w.u32(anim).i32(1).u32(0).f32(1.0);
        track(&mut w, 2, body as u16, (0, 0), 4, 0, 0);
        b.section(Section::Motion, 1, w);
        let data = b.build();
        let model = load_model(&data).unwrap();

        let mut other = HsfBuilder::new();
        let names = ["top", "body"].map(|name| other.name(name));
        let children = other.symbols(&[1]);
        let mut w = other.writer();
        ObjectSpec {
            name: names[0],
            kind: 3,
            children_count: 1,
            children,
            ..ObjectSpec::default()
        }
        .write(&mut w);
        ObjectSpec {
            name: names[1],
            parent: 0,
            ..ObjectSpec::default()
        }
        .write(&mut w);
        other.section(Section::Object, 2, w);
        let other_data = other.build();
        let other_model = load_model(&other_data).unwrap();

        let mut motion = model.motions[0].clone();
        assert_eq!(motion.retarget(&other_model), 1);
        assert_eq!(
            motion.tracks[0].target,
            TrackTarget::Object {
                name: Name::from("body"),
                object: Some(ObjectId(1))
            }
        );

        let empty = Model::default();
        assert_eq!(motion.retarget(&empty), 0);
        assert_eq!(
            motion.tracks[0].target,
            TrackTarget::Object {
                name: Name::from("body"),
                object: None
            }
        );
    }

    #[test]
    fn keyframes_past_the_end_fail() {
        let mut b = HsfBuilder::new();
        scene(&mut b);
        let anim = b.name("broken");
        let body = b.name("body");
        let mut w = b.writer();
        w.u32(anim).i32(1).u32(0).f32(1.0);
        track(&mut w, 2, body as u16, (0, 0), 1, 4000, 0);
        b.section(Section::Motion, 1, w);
        let data = b.build();

        assert!(load_model(&data).is_err());
    }
}
