mod common;

use common::*;
use document::LayerStackError;
use drawlink::{Anomaly, ClassicBrush, Notification, Origin};
use model::{Rectangle, Size, TRANSPARENT_PIXEL};
use protocol::{DabRecord, DeleteLayer, DrawDabs, Message, MessageBody, ResizeCanvas};

#[test]
fn sessions_converge_with_interleaved_local_strokes() {
    init_tracing();
    let mut first = session(1);
    let mut second = session(2);
    let mut watcher = session(3);
    let setup = encode(&[create_layer(9, 1)]);
    for engine in [&mut first, &mut second, &mut watcher] {
        engine
            .receive_messages(Origin::Remote, &setup, &mut ())
            .expect("apply setup");
    }

    let from_first = draw_line(&mut first, 1, (10.0, 40.0), (80.0, 40.0));
    let from_second = draw_line(&mut second, 1, (40.0, 10.0), (40.0, 80.0));
    assert_ne!(canvas(&first), canvas(&second));

    // The server sequences the second user's stroke first.
    let mut sequenced = from_second.clone();
    sequenced.extend_from_slice(&from_first);
    for engine in [&mut first, &mut second, &mut watcher] {
        let outcome = engine
            .receive_messages(Origin::Remote, &sequenced, &mut ())
            .expect("apply sequenced stream");
        assert!(outcome.anomalies.is_empty());
        assert_eq!(engine.pending_local(), 0);
    }

    let expected = canvas(&watcher);
    assert_eq!(canvas(&first), expected);
    assert_eq!(canvas(&second), expected);
    assert_eq!(first.history_len(), watcher.history_len());
}

#[test]
fn undo_then_redo_restores_exact_pixels() {
    let mut local = session(1);
    local
        .receive_messages(Origin::Remote, &encode(&[create_layer(1, 1)]), &mut ())
        .expect("apply setup");
    for row in [20.0, 50.0] {
        let echo = draw_line(&mut local, 1, (10.0, row), (80.0, row));
        local
            .receive_messages(Origin::Remote, &echo, &mut ())
            .expect("apply echo");
    }
    let before = canvas(&local);

    let mut notifications = Vec::new();
    local
        .receive_messages(Origin::Remote, &encode(&[undo(1)]), &mut notifications)
        .expect("apply undo");
    assert!(
        notifications
            .iter()
            .any(|notification| matches!(notification, Notification::AreaChanged(_)))
    );
    assert_ne!(canvas(&local), before);
    let layer = local.stack().layer(1).expect("layer");
    assert_eq!(layer.tiles().pixel_at(40, 50), TRANSPARENT_PIXEL);
    assert_ne!(layer.tiles().pixel_at(40, 20), TRANSPARENT_PIXEL);

    local
        .receive_messages(Origin::Remote, &encode(&[redo(1)]), &mut ())
        .expect("apply redo");
    assert_eq!(canvas(&local), before);
}

#[test]
fn tap_produces_a_single_dab() {
    let mut local = session(1);
    local
        .receive_messages(Origin::Remote, &encode(&[create_layer(1, 1)]), &mut ())
        .expect("apply setup");
    local
        .begin_stroke(1, sample(30.0, 30.0), &mut ())
        .expect("begin stroke");
    local.end_stroke(&mut ()).expect("end stroke");

    let dabs = dab_bodies(&local.take_outbound());
    let total: usize = dabs.iter().map(|draw| draw.dabs.len()).sum();
    assert_eq!(total, 1);
}

#[test]
fn ten_spacings_produce_evenly_spaced_dabs() {
    let mut local = session(1);
    local
        .set_brush(ClassicBrush {
            radius: 5.0,
            spacing: 0.5,
            ..ClassicBrush::default()
        })
        .expect("valid brush");
    local
        .receive_messages(Origin::Remote, &encode(&[create_layer(1, 1)]), &mut ())
        .expect("apply setup");
    let outbound = draw_line(&mut local, 1, (10.0, 20.0), (60.0, 20.0));

    let positions: Vec<(i32, i32)> = dab_bodies(&outbound)
        .iter()
        .flat_map(|draw| {
            draw.positioned()
                .map(|(x, y, _)| (x, y))
                .collect::<Vec<_>>()
        })
        .collect();
    // The start dab plus one per spacing step.
    assert_eq!(positions.len(), 11);
    for (index, (x, y)) in positions.iter().enumerate() {
        assert_eq!(*x, 40 + index as i32 * 20);
        assert_eq!(*y, 80);
    }
}

#[test]
fn dab_on_deleted_layer_is_reported_and_skipped() {
    let mut local = session(1);
    let late_dab = Message::new(
        4,
        MessageBody::DrawDabs(DrawDabs {
            layer: 1,
            x: 40,
            y: 40,
            color: 0xff00_0000,
            blend: model::BlendMode::Normal,
            dabs: std::iter::once(DabRecord {
                dx: 0,
                dy: 0,
                radius: 512,
                hardness: 255,
                opacity: 255,
            })
            .collect(),
        }),
    );
    let stream = encode(&[
        create_layer(4, 1),
        create_layer(4, 2),
        Message::new(4, MessageBody::DeleteLayer(DeleteLayer { id: 1, merge: false })),
        late_dab,
    ]);
    let outcome = local
        .receive_messages(Origin::Remote, &stream, &mut ())
        .expect("apply stream");
    assert_eq!(outcome.applied, 3);
    assert_eq!(
        outcome.anomalies,
        vec![Anomaly::Layer(LayerStackError::UnknownLayer(1))]
    );
    let ids: Vec<_> = local.layers().iter().map(|layer| layer.id).collect();
    assert_eq!(ids, vec![2]);
}

#[test]
fn pruned_strokes_cannot_be_undone() {
    let mut local = drawlink::PaintEngine::new(&drawlink::EngineConfig {
        max_undo_points: 2,
        ..config(1)
    })
    .expect("valid config");
    let mut remote = session(4);
    local
        .receive_messages(Origin::Remote, &encode(&[create_layer(4, 1)]), &mut ())
        .expect("apply setup");
    remote
        .receive_messages(Origin::Remote, &encode(&[create_layer(4, 1)]), &mut ())
        .expect("apply setup");
    for row in [10.0, 40.0, 70.0] {
        let stroke = draw_line(&mut remote, 1, (10.0, row), (80.0, row));
        local
            .receive_messages(Origin::Remote, &stroke, &mut ())
            .expect("apply remote stroke");
    }

    let undos = encode(&[undo(4), undo(4), undo(4)]);
    let outcome = local
        .receive_messages(Origin::Remote, &undos, &mut ())
        .expect("apply undos");
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.anomalies, vec![Anomaly::NothingToUndo(4)]);
    let layer = local.stack().layer(1).expect("layer");
    assert_ne!(layer.tiles().pixel_at(40, 10), TRANSPARENT_PIXEL);
    assert_eq!(layer.tiles().pixel_at(40, 40), TRANSPARENT_PIXEL);
    assert_eq!(layer.tiles().pixel_at(40, 70), TRANSPARENT_PIXEL);
}

#[test]
fn resize_is_reported_before_repaint() {
    let mut local = session(1);
    let resize = Message::new(
        4,
        MessageBody::ResizeCanvas(ResizeCanvas {
            top: 0,
            right: 32,
            bottom: 0,
            left: 0,
        }),
    );
    let mut notifications = Vec::new();
    local
        .receive_messages(Origin::Remote, &encode(&[resize]), &mut notifications)
        .expect("apply resize");
    assert_eq!(local.canvas_size(), Size::new(128, 96));
    assert_eq!(
        notifications,
        vec![
            Notification::Resized {
                x_offset: 0,
                y_offset: 0,
                old_size: Size::new(SIDE, SIDE),
            },
            Notification::AreaChanged(Rectangle::new(0, 0, 128, 96)),
        ]
    );
}

#[test]
fn view_cache_follows_remote_strokes() {
    let mut local = session(1);
    let mut remote = session(2);
    let setup = encode(&[create_layer(2, 1)]);
    local
        .receive_messages(Origin::Remote, &setup, &mut ())
        .expect("apply setup");
    remote
        .receive_messages(Origin::Remote, &setup, &mut ())
        .expect("apply setup");
    let view = local.register_view();
    let whole = Rectangle::new(0, 0, SIDE, SIDE);
    let blank = local.get_region(view, whole).expect("known view");

    let stroke = draw_line(&mut remote, 1, (10.0, 30.0), (80.0, 30.0));
    local
        .receive_messages(Origin::Remote, &stroke, &mut ())
        .expect("apply remote stroke");
    let painted = local.get_region(view, whole).expect("known view");
    assert_ne!(painted, blank);
    assert_eq!(painted, local.render_region(whole));
    assert!(local.unregister_view(view));
    assert!(local.get_region(view, whole).is_none());
}
