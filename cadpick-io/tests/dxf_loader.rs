use std::f64::consts::FRAC_PI_2;
use std::path::PathBuf;

use cadpick_core::{document::Entity, geometry::Point3};
use cadpick_io::{DocumentLoader, DxfFacade, IoError};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_selection_sample_keeps_supported_entities_in_order() {
    let loader = DxfFacade::new();
    let doc = loader
        .load(&fixture("selection_sample.dxf"))
        .expect("读取 DXF 失败");

    let kinds: Vec<&str> = doc
        .entities()
        .map(|(_, entity)| entity.class_name())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "Line",
            "Polyline3d",
            "Polyline2d",
            "Polyline",
            "Circle",
            "DBText",
            "Line"
        ]
    );

    let layers: Vec<String> = doc.layers().map(|layer| layer.name.clone()).collect();
    for expected in ["0", "ROAD", "SURVEY", "SITE", "LOTS", "ANNOT"] {
        assert!(
            layers.iter().any(|name| name == expected),
            "缺少图层 {expected}"
        );
    }
    assert!(
        !layers.iter().any(|name| name == "MESH"),
        "网格多段线应被跳过"
    );
}

#[test]
fn line_keeps_z_coordinates() {
    let doc = DxfFacade::new()
        .load(&fixture("selection_sample.dxf"))
        .expect("读取 DXF 失败");
    let mut lines = doc.entities().filter_map(|(_, entity)| match entity {
        Entity::Line(line) => Some(line),
        _ => None,
    });

    let first = lines.next().expect("未找到直线");
    assert_eq!(first.layer, "ROAD");
    assert_eq!(first.end, Point3::new(3.0, 4.0, 12.0));
    assert!((first.length() - 13.0).abs() < 1e-12);

    let second = lines.next().expect("未找到第二条直线");
    assert_eq!(second.layer, "0", "缺省图层为 0");
    assert_eq!(second.start, Point3::new(1.0, 1.0, 0.0));
    assert!((second.length() - 2.0).abs() < 1e-12);
    assert!(lines.next().is_none());
}

#[test]
fn polyline_flags_select_2d_or_3d() {
    let doc = DxfFacade::new()
        .load(&fixture("selection_sample.dxf"))
        .expect("读取 DXF 失败");

    let spatial = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Polyline3d(polyline) => Some(polyline),
            _ => None,
        })
        .expect("未找到三维多段线");
    assert_eq!(spatial.layer, "SURVEY");
    assert!(!spatial.is_closed);
    assert_eq!(spatial.vertices.len(), 3);
    assert_eq!(spatial.start_point(), Some(Point3::new(10.0, 5.0, 2.0)));
    assert_eq!(spatial.end_point(), Some(Point3::new(35.0, 15.0, 4.0)));

    let legacy = doc
        .entities()
        .find_map(|(_, entity)| match entity {
            Entity::Polyline2d(polyline) => Some(polyline),
            _ => None,
        })
        .expect("未找到二维多段线");
    assert_eq!(legacy.layer, "SITE");
    assert!(legacy.is_closed);
    assert!((legacy.elevation - 2.5).abs() < 1e-12);
    assert_eq!(legacy.vertices.len(), 3);
    assert!((legacy.vertices[0].bulge - 0.5).abs() < 1e-12);
    assert!(legacy.vertices[1].bulge.abs() < 1e-12);
}

#[test]
fn lwpolyline_circle_and_text_are_read() {
    let doc = DxfFacade::new()
        .load(&fixture("selection_sample.dxf"))
        .expect("读取 DXF 失败");

    for (_, entity) in doc.entities() {
        match entity {
            Entity::Polyline(polyline) => {
                assert_eq!(polyline.layer, "LOTS");
                assert!(polyline.is_closed);
                assert_eq!(polyline.vertices.len(), 2);
                assert!((polyline.vertices[0].bulge - 1.0).abs() < 1e-12);
                assert!((polyline.vertices[1].position.x() - 10.0).abs() < 1e-12);
            }
            Entity::Circle(circle) => {
                assert!((circle.radius - 12.5).abs() < 1e-12);
                assert!((circle.center.x() - 50.0).abs() < 1e-12);
            }
            Entity::Text(text) => {
                assert_eq!(text.content, "Site plan");
                assert!((text.rotation - FRAC_PI_2).abs() < 1e-12);
                assert!((text.height - 3.5).abs() < 1e-12);
            }
            _ => {}
        }
    }
}

#[test]
fn polyline_without_seqend_is_rejected() {
    let err = DxfFacade::new()
        .load(&fixture("missing_seqend.dxf"))
        .unwrap_err();
    match err {
        IoError::InvalidDocument(message) => {
            assert!(message.contains("SEQEND"), "{message}");
            assert!(message.contains("第 20 行"), "应指出遇到 LINE 的行：{message}");
            assert!(message.contains("第 6 行"), "应指出 POLYLINE 起始行：{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_file_reports_path() {
    let path = fixture("does_not_exist.dxf");
    let err = DxfFacade::new().load(&path).unwrap_err();
    match err {
        IoError::ReadError { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other:?}"),
    }
}

fn invalid_message(source: &str) -> String {
    match DxfFacade::new().load_str(source) {
        Err(IoError::InvalidDocument(message)) => message,
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn malformed_pairs_are_rejected() {
    let bad_code = invalid_message("  0\nSECTION\n  2\nENTITIES\nxx\nLINE\n");
    assert!(bad_code.contains("第 5 行"), "{bad_code}");

    let dangling = invalid_message("  0\nSECTION\n  2\nENTITIES\n  0\n");
    assert!(dangling.contains("第 5 行"), "{dangling}");

    let bad_number = invalid_message(
        "  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n 10\nabc\n  0\nENDSEC\n  0\nEOF\n",
    );
    assert!(bad_number.contains("abc"), "{bad_number}");
    assert!(bad_number.starts_with("第 8 行"), "{bad_number}");

    let duplicate = invalid_message(
        "  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n 10\n1\n 10\n2\n 20\n0\n 11\n0\n 21\n0\n  0\nENDSEC\n  0\nEOF\n",
    );
    assert!(duplicate.starts_with("第 10 行"), "{duplicate}");

    let missing_end = invalid_message(
        "  0\nSECTION\n  2\nENTITIES\n  0\nLINE\n 10\n1\n 20\n1\n  0\nENDSEC\n  0\nEOF\n",
    );
    assert!(missing_end.starts_with("第 6 行"), "{missing_end}");
    assert!(missing_end.contains("LINE 终点"), "{missing_end}");
}

#[test]
fn unterminated_blocks_report_where_they_started() {
    let polyline = invalid_message(
        "  0\nSECTION\n  2\nENTITIES\n  0\nPOLYLINE\n 70\n8\n  0\nVERTEX\n 10\n1\n 20\n2\n",
    );
    assert!(polyline.starts_with("第 6 行"), "{polyline}");
    assert!(polyline.contains("第 14 行"), "{polyline}");

    let header = invalid_message("  0\nSECTION\n  2\nHEADER\n  9\n$ACADVER\n  1\nAC1015\n");
    assert!(header.starts_with("第 2 行"), "{header}");
    assert!(header.contains("HEADER"), "{header}");
    assert!(header.contains("ENDSEC"), "{header}");

    let entities = invalid_message("  0\nSECTION\n  2\nENTITIES\n  0\nCIRCLE\n 10\n1\n 20\n1\n 40\n2\n");
    assert!(entities.starts_with("第 2 行"), "{entities}");
    assert!(entities.contains("ENTITIES"), "{entities}");
}

#[test]
fn empty_entities_section_gives_empty_document() {
    let doc = DxfFacade::new()
        .load_str("  0\nSECTION\n  2\nENTITIES\n  0\nENDSEC\n  0\nEOF\n")
        .expect("空实体段应能解析");
    assert_eq!(doc.entities().count(), 0);
    assert!(doc.layer("0").is_some());
}
