pub mod command;
pub mod editor;
pub mod filter;
pub mod pick_report;
pub mod transaction;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("entity with id {0} was erased")]
        WasErased(u64),
        #[error("entity with id {id} is on locked layer {layer}")]
        OnLockedLayer { id: u64, layer: String },
        #[error("entity with id {id} has degenerate geometry: {reason}")]
        DegenerateGeometry { id: u64, reason: String },
        #[error("invalid selection filter: {0}")]
        InvalidFilter(String),
    }
}

pub mod demo {
    use tracing::debug;
    use cadpick_core::document::{Document, EntityId};
    use cadpick_core::geometry::{Point2, Point3};

    /// 示例图纸中关键实体的 ID。
    #[derive(Debug, Clone, Copy)]
    pub struct DemoEntities {
        pub baseline: EntityId,
        pub diagonal: EntityId,
        pub survey_path: EntityId,
        pub boundary: EntityId,
        pub legacy_outline: EntityId,
        pub circle: EntityId,
        pub label: EntityId,
    }

    /// 向文档写入一组覆盖各类实体的示例图元，便于在没有 DXF 时试用命令。
    pub fn populate_demo(document: &mut Document) -> DemoEntities {
        let baseline = document.add_line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(100.0, 0.0, 0.0),
            "0",
        );
        let diagonal = document.add_line(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(30.0, 40.0, 0.0),
            "SURVEY",
        );
        let survey_path = document.add_polyline3d(
            [
                Point3::new(10.0, 5.0, 2.0),
                Point3::new(20.0, 15.0, 3.5),
                Point3::new(35.0, 15.0, 4.0),
            ],
            false,
            "SURVEY",
        );
        let boundary = document.add_polyline3d(
            [
                Point3::new(0.0, 50.0, 0.0),
                Point3::new(40.0, 50.0, 1.0),
                Point3::new(40.0, 80.0, 1.0),
                Point3::new(0.0, 80.0, 0.0),
            ],
            true,
            "SITE",
        );
        let legacy_outline = document.add_polyline2d(
            [
                Point2::new(60.0, 10.0),
                Point2::new(80.0, 10.0),
                Point2::new(80.0, 30.0),
            ],
            0.0,
            false,
            "SITE",
        );
        let circle = document.add_circle(Point2::new(50.0, 25.0), 12.5, "ANNOT");
        let label = document.add_text(Point2::new(5.0, 12.0), "Site plan", 3.5, 0.0, "ANNOT");

        let ids = DemoEntities {
            baseline,
            diagonal,
            survey_path,
            boundary,
            legacy_outline,
            circle,
            label,
        };

        debug!(
            baseline = ids.baseline.get(),
            survey_path = ids.survey_path.get(),
            legacy_outline = ids.legacy_outline.get(),
            label = ids.label.get(),
            "已创建演示实体"
        );

        ids
    }

    #[cfg(test)]
    mod tests {
        use cadpick_core::document::Entity;

        use super::*;

        #[test]
        fn demo_population_creates_entities() {
            let mut document = Document::new();
            let ids = populate_demo(&mut document);
            assert_eq!(document.entities().count(), 7);
            assert_eq!(ids.baseline.get(), 0);
            assert_eq!(ids.label.get(), 6);
            assert!(matches!(
                document.entity(ids.survey_path),
                Some(Entity::Polyline3d(_))
            ));
            assert!(matches!(
                document.entity(ids.legacy_outline),
                Some(Entity::Polyline2d(_))
            ));
        }
    }
}
