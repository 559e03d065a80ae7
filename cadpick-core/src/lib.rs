pub mod geometry {
    use std::fmt;

    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }
    }

    /// 三维点。直线与三维多段线的顶点都以它存储。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn distance(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        /// 投影到 XY 平面。
        #[inline]
        pub fn to_2d(self) -> Point2 {
            Point2::new(self.0.x, self.0.y)
        }
    }

    /// 命令行回显使用的默认格式：`(x,y,z)`，数值采用最短往返表示。
    impl fmt::Display for Point3 {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "({},{},{})", self.0.x, self.0.y, self.0.z)
        }
    }

    /// 轴对齐边界框，用于估算文档/实体范围。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Bounds2D {
        min: Point2,
        max: Point2,
    }

    impl Bounds2D {
        #[inline]
        pub fn new(min: Point2, max: Point2) -> Self {
            Self { min, max }
        }

        #[inline]
        pub fn empty() -> Self {
            Self {
                min: Point2::new(f64::INFINITY, f64::INFINITY),
                max: Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            }
        }

        #[inline]
        pub fn is_empty(&self) -> bool {
            self.min.x() > self.max.x() || self.min.y() > self.max.y()
        }

        #[inline]
        pub fn min(&self) -> Point2 {
            self.min
        }

        #[inline]
        pub fn max(&self) -> Point2 {
            self.max
        }

        pub fn include_point(&mut self, point: Point2) {
            if self.is_empty() {
                self.min = point;
                self.max = point;
                return;
            }
            self.min = Point2::from_vec(self.min.as_vec2().min(point.as_vec2()));
            self.max = Point2::from_vec(self.max.as_vec2().max(point.as_vec2()));
        }

        pub fn include_bounds(&mut self, other: &Bounds2D) {
            if other.is_empty() {
                return;
            }
            self.include_point(other.min);
            self.include_point(other.max);
        }

        #[inline]
        pub fn center(&self) -> Point2 {
            debug_assert!(!self.is_empty());
            Point2::from_vec((self.min.as_vec2() + self.max.as_vec2()) * 0.5)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn point3_display_uses_shortest_float_form() {
            assert_eq!(Point3::new(1.0, 2.5, -3.0).to_string(), "(1,2.5,-3)");
            assert_eq!(Point3::new(0.1, 0.0, 100.0).to_string(), "(0.1,0,100)");
        }

        #[test]
        fn bounds_grow_with_points() {
            let mut bounds = Bounds2D::empty();
            assert!(bounds.is_empty());
            bounds.include_point(Point2::new(2.0, -1.0));
            bounds.include_point(Point2::new(-4.0, 3.0));
            assert!(!bounds.is_empty());
            assert_eq!(bounds.min(), Point2::new(-4.0, -1.0));
            assert_eq!(bounds.max(), Point2::new(2.0, 3.0));
            assert_eq!(bounds.center(), Point2::new(-1.0, 1.0));
        }
    }
}

pub mod document {
    use std::collections::{HashMap, HashSet};

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Bounds2D, Point2, Point3};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
        pub is_locked: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
                is_locked: false,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Circle(Circle),
        Polyline(Polyline),
        Polyline2d(Polyline2d),
        Polyline3d(Polyline3d),
        Text(Text),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Polyline2d(polyline) => &polyline.layer,
                Entity::Polyline3d(polyline) => &polyline.layer,
                Entity::Text(text) => &text.layer,
            }
        }

        /// DXF 实体类型名，选择过滤器（组码 0）按它匹配。
        ///
        /// 旧式二维多段线与三维多段线在 DXF 中同为 `POLYLINE`。
        #[inline]
        pub fn dxf_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Polyline2d(_) | Entity::Polyline3d(_) => "POLYLINE",
                Entity::Text(_) => "TEXT",
            }
        }

        /// 运行时类名，用于日志与诊断。
        #[inline]
        pub fn class_name(&self) -> &'static str {
            match self {
                Entity::Line(_) => "Line",
                Entity::Circle(_) => "Circle",
                Entity::Polyline(_) => "Polyline",
                Entity::Polyline2d(_) => "Polyline2d",
                Entity::Polyline3d(_) => "Polyline3d",
                Entity::Text(_) => "DBText",
            }
        }

        /// 计算实体在 XY 平面上的轴对齐范围，文本退化为插入点。
        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            match self {
                Entity::Line(line) => {
                    bounds.include_point(line.start.to_2d());
                    bounds.include_point(line.end.to_2d());
                }
                Entity::Circle(circle) => {
                    let radius = circle.radius.abs();
                    let center = circle.center;
                    bounds.include_point(Point2::new(center.x() - radius, center.y() - radius));
                    bounds.include_point(Point2::new(center.x() + radius, center.y() + radius));
                }
                Entity::Polyline(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                }
                Entity::Polyline2d(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.position);
                    }
                }
                Entity::Polyline3d(polyline) => {
                    for vertex in &polyline.vertices {
                        bounds.include_point(vertex.to_2d());
                    }
                }
                Entity::Text(text) => {
                    bounds.include_point(text.insert);
                }
            }
            if bounds.is_empty() {
                None
            } else {
                Some(bounds)
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub layer: String,
    }

    impl Line {
        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance(self.end)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 轻量多段线（LWPOLYLINE）。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub layer: String,
    }

    /// 旧式二维多段线（POLYLINE + VERTEX），所有顶点共享同一高程。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline2d {
        pub vertices: Vec<PolylineVertex>,
        pub elevation: f64,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline3d {
        pub vertices: Vec<Point3>,
        pub is_closed: bool,
        pub layer: String,
    }

    impl Polyline3d {
        /// 第一个顶点；没有顶点时返回 `None`。
        #[inline]
        pub fn start_point(&self) -> Option<Point3> {
            self.vertices.first().copied()
        }

        #[inline]
        pub fn end_point(&self) -> Option<Point3> {
            if self.is_closed {
                self.start_point()
            } else {
                self.vertices.last().copied()
            }
        }

        /// 各段长度之和，闭合时包含最后一段回到起点的线段。
        pub fn length(&self) -> f64 {
            let open: f64 = self
                .vertices
                .windows(2)
                .map(|pair| pair[0].distance(pair[1]))
                .sum();
            match (self.is_closed, self.vertices.first(), self.vertices.last()) {
                (true, Some(first), Some(last)) if self.vertices.len() > 1 => {
                    open + last.distance(*first)
                }
                _ => open,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub height: f64,
        pub rotation: f64,
        pub layer: String,
    }

    /// 按 ID 查询实体时的三种结果：仍然有效、已被删除、从未分配。
    #[derive(Debug, Clone, Copy)]
    pub enum EntityState<'a> {
        Live(&'a Entity),
        Erased,
        Missing,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        #[serde(default, skip_serializing_if = "HashSet::is_empty")]
        erased: HashSet<EntityId>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        #[inline]
        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.get(name)
        }

        /// 锁定或解锁图层，返回图层是否存在。
        pub fn set_layer_locked(&mut self, name: &str, locked: bool) -> bool {
            match self.layers.get_mut(name) {
                Some(layer) => {
                    layer.is_locked = locked;
                    true
                }
                None => false,
            }
        }

        #[inline]
        pub fn is_layer_locked(&self, name: &str) -> bool {
            self.layers.get(name).is_some_and(|layer| layer.is_locked)
        }

        pub fn add_line(
            &mut self,
            start: Point3,
            end: Point3,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Line(Line { start, end, layer }))
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Circle(Circle {
                center,
                radius,
                layer,
            }))
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = PolylineVertex>,
        {
            let layer = layer.into();
            self.push(Entity::Polyline(Polyline {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer,
            }))
        }

        pub fn add_polyline2d<I>(
            &mut self,
            vertices: I,
            elevation: f64,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.push(Entity::Polyline2d(Polyline2d {
                vertices: vertices.into_iter().map(PolylineVertex::new).collect(),
                elevation,
                is_closed,
                layer,
            }))
        }

        pub fn add_polyline3d<I>(
            &mut self,
            vertices: I,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point3>,
        {
            let layer = layer.into();
            self.push(Entity::Polyline3d(Polyline3d {
                vertices: vertices.into_iter().collect(),
                is_closed,
                layer,
            }))
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            height: f64,
            rotation: f64,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.push(Entity::Text(Text {
                insert,
                content: content.into(),
                height,
                rotation,
                layer,
            }))
        }

        #[inline]
        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.push(entity)
        }

        /// 删除实体。ID 保留为已删除状态，不会被再次分配。
        /// 返回实体此前是否有效。
        pub fn erase(&mut self, id: EntityId) -> bool {
            let exists = self.entities.iter().any(|(entity_id, _)| *entity_id == id);
            exists && self.erased.insert(id)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        /// 按插入顺序遍历所有未删除实体。
        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities
                .iter()
                .filter(|(id, _)| !self.erased.contains(id))
        }

        pub fn entity_state(&self, id: EntityId) -> EntityState<'_> {
            match self.entities.iter().find(|(entity_id, _)| *entity_id == id) {
                Some(_) if self.erased.contains(&id) => EntityState::Erased,
                Some((_, entity)) => EntityState::Live(entity),
                None => EntityState::Missing,
            }
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            match self.entity_state(id) {
                EntityState::Live(entity) => Some(entity),
                EntityState::Erased | EntityState::Missing => None,
            }
        }

        #[inline]
        pub fn entity_bounds(&self, id: EntityId) -> Option<Bounds2D> {
            self.entity(id).and_then(Entity::bounds)
        }

        pub fn bounds(&self) -> Option<Bounds2D> {
            let mut bounds = Bounds2D::empty();
            let mut has = false;
            for (_, entity) in self.entities() {
                if let Some(entity_bounds) = entity.bounds() {
                    bounds.include_bounds(&entity_bounds);
                    has = true;
                }
            }
            if has { Some(bounds) } else { None }
        }

        fn push(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        #[inline]
        fn next_id(&mut self) -> EntityId {
            let id = self.next_entity_id;
            self.next_entity_id += 1;
            EntityId(id)
        }
    }

}
