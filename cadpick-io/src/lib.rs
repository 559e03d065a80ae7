//! ASCII DXF 读取。
//!
//! 只解析 `ENTITIES` 段中的 LINE、CIRCLE、LWPOLYLINE、TEXT 与 POLYLINE
//! （二维与三维，网格除外），其余段落和实体类型被跳过并计数。

use std::fs;
use std::path::Path;

use cadpick_core::{
    document::{
        Circle, Document, Entity, Line, Polyline, Polyline2d, Polyline3d, PolylineVertex, Text,
    },
    geometry::{Point2, Point3},
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document structure: {0}")]
    InvalidDocument(String),
}

pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Document, IoError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }

    /// 直接解析内存中的 DXF 文本。
    pub fn load_str(&self, source: &str) -> Result<Document, IoError> {
        DxfParser::new(source).parse()
    }
}

impl DocumentLoader for DxfFacade {
    fn load(&self, path: &Path) -> Result<Document, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let document = self.load_str(&data)?;
        info!(
            path = %path.display(),
            entities = document.entities().count(),
            "DXF 解析完成"
        );
        Ok(document)
    }
}

fn invalid(message: impl Into<String>) -> IoError {
    IoError::InvalidDocument(message.into())
}

fn invalid_at(line: usize, message: impl std::fmt::Display) -> IoError {
    IoError::InvalidDocument(format!("第 {line} 行：{message}"))
}

/// POLYLINE 标志位（组码 70）。
const POLYLINE_CLOSED: i32 = 0x01;
const POLYLINE_3D: i32 = 0x08;
const POLYLINE_MESH: i32 = 0x10;
const POLYLINE_POLYFACE: i32 = 0x40;
/// VERTEX 标志位：样条框架控制点，不属于多段线本身的几何。
const VERTEX_SPLINE_FRAME: i32 = 0x10;

/// 组码/值对，`line` 为值所在的行号。
#[derive(Debug, Clone)]
struct GroupPair {
    code: i32,
    value: String,
    line: usize,
}

impl GroupPair {
    fn is_marker(&self, name: &str) -> bool {
        self.code == 0 && self.value.trim() == name
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
    skipped: usize,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
            skipped: 0,
        }
    }

    fn parse(mut self) -> Result<Document, IoError> {
        let mut document = Document::new();
        while let Some(pair) = self.reader.next_pair()? {
            if pair.code != 0 {
                return Err(invalid_at(
                    pair.line,
                    format!("意外的组码 {}（期望 0 表示 SECTION/EOF）", pair.code),
                ));
            }
            match pair.value.trim() {
                "SECTION" => {
                    let name = self.reader.next_pair()?.ok_or_else(|| {
                        invalid_at(pair.line, "SECTION 缺少名称（组码 2）")
                    })?;
                    if name.code != 2 {
                        return Err(invalid_at(
                            name.line,
                            format!("SECTION 名称使用了组码 {}（期望 2）", name.code),
                        ));
                    }
                    match name.value.trim() {
                        "ENTITIES" => self.parse_entities(&mut document, pair.line)?,
                        other => self.skip_section(other, pair.line)?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(invalid_at(
                        pair.line,
                        format!("意外的标记 {unexpected}，期望 SECTION 或 EOF"),
                    ));
                }
            }
        }
        if self.skipped > 0 {
            debug!(skipped = self.skipped, "跳过了不支持的实体");
        }
        Ok(document)
    }

    fn skip_section(&mut self, name: &str, start: usize) -> Result<(), IoError> {
        loop {
            match self.reader.next_pair()? {
                Some(pair) if pair.is_marker("ENDSEC") => break,
                Some(_) => continue,
                None => {
                    return Err(invalid_at(
                        start,
                        format!(
                            "SECTION {name} 未找到 ENDSEC 终止标记（文件在第 {} 行结束）",
                            self.reader.line_number
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document, start: usize) -> Result<(), IoError> {
        loop {
            let pair = self.reader.next_pair()?.ok_or_else(|| {
                invalid_at(
                    start,
                    format!(
                        "ENTITIES 段提前结束（文件在第 {} 行结束）",
                        self.reader.line_number
                    ),
                )
            })?;
            if pair.code != 0 {
                return Err(invalid_at(
                    pair.line,
                    format!("ENTITIES 段遇到组码 {}（期望 0 表示实体起始）", pair.code),
                ));
            }

            let line = pair.line;
            let entity = match pair.value.trim() {
                "ENDSEC" => break,
                "LINE" => self.parse_line(line)?,
                "CIRCLE" => self.parse_circle(line)?,
                "LWPOLYLINE" => self.parse_lwpolyline(line)?,
                "TEXT" => self.parse_text(line)?,
                "POLYLINE" => match self.parse_polyline(line)? {
                    Some(entity) => entity,
                    None => continue,
                },
                other => {
                    debug!(kind = other, line, "跳过不支持的实体");
                    self.skipped += 1;
                    self.read_body()?;
                    continue;
                }
            };
            document.add_entity(entity);
        }
        Ok(())
    }

    /// 读取实体的全部组码/值对，直到下一个组码 0。
    fn read_body(&mut self) -> Result<Vec<GroupPair>, IoError> {
        let mut pairs = Vec::new();
        while let Some(pair) = self.reader.next_pair()? {
            if pair.code == 0 {
                self.reader.put_back(pair);
                break;
            }
            pairs.push(pair);
        }
        Ok(pairs)
    }

    fn parse_line(&mut self, line: usize) -> Result<Entity, IoError> {
        let mut layer = None;
        let mut start = [None, None, None];
        let mut end = [None, None, None];
        for pair in self.read_body()? {
            match pair.code {
                8 => layer = Some(pair.value.trim().to_string()),
                10 => assign_coord(&mut start[0], &pair, "LINE 起点 X（组码 10）")?,
                20 => assign_coord(&mut start[1], &pair, "LINE 起点 Y（组码 20）")?,
                30 => assign_coord(&mut start[2], &pair, "LINE 起点 Z（组码 30）")?,
                11 => assign_coord(&mut end[0], &pair, "LINE 终点 X（组码 11）")?,
                21 => assign_coord(&mut end[1], &pair, "LINE 终点 Y（组码 21）")?,
                31 => assign_coord(&mut end[2], &pair, "LINE 终点 Z（组码 31）")?,
                _ => {}
            }
        }
        Ok(Entity::Line(Line {
            start: build_point3(start, line, "LINE 起点")?,
            end: build_point3(end, line, "LINE 终点")?,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_circle(&mut self, line: usize) -> Result<Entity, IoError> {
        let mut layer = None;
        let mut x = None;
        let mut y = None;
        let mut radius = None;
        for pair in self.read_body()? {
            match pair.code {
                8 => layer = Some(pair.value.trim().to_string()),
                10 => assign_coord(&mut x, &pair, "CIRCLE 圆心 X（组码 10）")?,
                20 => assign_coord(&mut y, &pair, "CIRCLE 圆心 Y（组码 20）")?,
                40 => assign_coord(&mut radius, &pair, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
        }
        let (Some(x), Some(y)) = (x, y) else {
            return Err(invalid_at(line, "CIRCLE 缺少圆心坐标"));
        };
        let radius = radius.ok_or_else(|| invalid_at(line, "CIRCLE 缺少半径（组码 40）"))?;
        Ok(Entity::Circle(Circle {
            center: Point2::new(x, y),
            radius,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_lwpolyline(&mut self, line: usize) -> Result<Entity, IoError> {
        let mut layer = None;
        let mut is_closed = false;
        let mut expected = None;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        for pair in self.read_body()? {
            match pair.code {
                8 => layer = Some(pair.value.trim().to_string()),
                70 => is_closed = parse_i32(&pair, "LWPOLYLINE 标志")? & POLYLINE_CLOSED != 0,
                90 => expected = Some(parse_i32(&pair, "LWPOLYLINE 顶点数（组码 90）")?),
                10 => {
                    let x = parse_f64(&pair, "LWPOLYLINE 顶点 X")?;
                    if pending_x.replace(x).is_some() {
                        return Err(invalid_at(pair.line, "LWPOLYLINE 顶点缺少对应的 Y（组码 20）"));
                    }
                }
                20 => {
                    let y = parse_f64(&pair, "LWPOLYLINE 顶点 Y")?;
                    let x = pending_x.take().ok_or_else(|| {
                        invalid_at(pair.line, "LWPOLYLINE 顶点缺少对应的 X（组码 10）")
                    })?;
                    vertices.push(PolylineVertex::new(Point2::new(x, y)));
                }
                42 => {
                    let bulge = parse_f64(&pair, "LWPOLYLINE 顶点 bulge")?;
                    let vertex = vertices.last_mut().ok_or_else(|| {
                        invalid_at(pair.line, "LWPOLYLINE 在顶点之前出现 bulge（组码 42）")
                    })?;
                    vertex.bulge = bulge;
                }
                _ => {}
            }
        }
        if pending_x.is_some() {
            return Err(invalid_at(line, "LWPOLYLINE 最后一个顶点缺少对应的 Y（组码 20）"));
        }
        if let Some(expected) = expected {
            if usize::try_from(expected).ok() != Some(vertices.len()) {
                warn!(expected, actual = vertices.len(), line, "LWPOLYLINE 顶点数与组码 90 不一致");
            }
        }
        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed,
            layer: layer_or_default(layer),
        }))
    }

    fn parse_text(&mut self, line: usize) -> Result<Entity, IoError> {
        let mut layer = None;
        let mut x = None;
        let mut y = None;
        let mut height = None;
        let mut rotation = 0.0;
        let mut content = String::new();
        for pair in self.read_body()? {
            match pair.code {
                8 => layer = Some(pair.value.trim().to_string()),
                1 => content = pair.value,
                10 => assign_coord(&mut x, &pair, "TEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut y, &pair, "TEXT 插入点 Y（组码 20）")?,
                40 => assign_coord(&mut height, &pair, "TEXT 高度（组码 40）")?,
                50 => rotation = parse_f64(&pair, "TEXT 旋转角（组码 50）")?.to_radians(),
                _ => {}
            }
        }
        let (Some(x), Some(y)) = (x, y) else {
            return Err(invalid_at(line, "TEXT 缺少插入点"));
        };
        Ok(Entity::Text(Text {
            insert: Point2::new(x, y),
            content,
            height: height.unwrap_or(1.0),
            rotation,
            layer: layer_or_default(layer),
        }))
    }

    /// POLYLINE 头部之后跟随若干 VERTEX，以 SEQEND 结束。网格类多段线返回 `None`。
    fn parse_polyline(&mut self, line: usize) -> Result<Option<Entity>, IoError> {
        let mut layer = None;
        let mut flags = 0;
        let mut elevation = 0.0;
        for pair in self.read_body()? {
            match pair.code {
                8 => layer = Some(pair.value.trim().to_string()),
                70 => flags = parse_i32(&pair, "POLYLINE 标志（组码 70）")?,
                30 => elevation = parse_f64(&pair, "POLYLINE 高程（组码 30）")?,
                _ => {}
            }
        }

        let mut vertices = Vec::new();
        loop {
            let Some(pair) = self.reader.next_pair()? else {
                return Err(invalid_at(
                    line,
                    format!(
                        "POLYLINE 未正确结束，文件在第 {} 行结束前缺少 SEQEND",
                        self.reader.line_number
                    ),
                ));
            };
            if pair.code != 0 {
                return Err(invalid_at(pair.line, "POLYLINE 顶点序列遇到无效记录"));
            }
            match pair.value.trim() {
                "VERTEX" => {
                    if let Some(vertex) = self.parse_vertex(pair.line)? {
                        vertices.push(vertex);
                    }
                }
                "SEQEND" => {
                    self.read_body()?;
                    break;
                }
                other => {
                    return Err(invalid_at(
                        pair.line,
                        format!("POLYLINE 顶点序列遇到 {other}，缺少 SEQEND（POLYLINE 始于第 {line} 行）"),
                    ));
                }
            }
        }

        if flags & (POLYLINE_MESH | POLYLINE_POLYFACE) != 0 {
            debug!(flags, line, "跳过网格类 POLYLINE");
            self.skipped += 1;
            return Ok(None);
        }

        let layer = layer_or_default(layer);
        let is_closed = flags & POLYLINE_CLOSED != 0;
        let entity = if flags & POLYLINE_3D != 0 {
            Entity::Polyline3d(Polyline3d {
                vertices: vertices.into_iter().map(|(point, _)| point).collect(),
                is_closed,
                layer,
            })
        } else {
            Entity::Polyline2d(Polyline2d {
                vertices: vertices
                    .into_iter()
                    .map(|(point, bulge)| PolylineVertex::with_bulge(point.to_2d(), bulge))
                    .collect(),
                elevation,
                is_closed,
                layer,
            })
        };
        Ok(Some(entity))
    }

    fn parse_vertex(&mut self, line: usize) -> Result<Option<(Point3, f64)>, IoError> {
        let mut coords = [None, None, None];
        let mut bulge = 0.0;
        let mut flags = 0;
        for pair in self.read_body()? {
            match pair.code {
                10 => assign_coord(&mut coords[0], &pair, "VERTEX X（组码 10）")?,
                20 => assign_coord(&mut coords[1], &pair, "VERTEX Y（组码 20）")?,
                30 => assign_coord(&mut coords[2], &pair, "VERTEX Z（组码 30）")?,
                42 => bulge = parse_f64(&pair, "VERTEX bulge（组码 42）")?,
                70 => flags = parse_i32(&pair, "VERTEX 标志（组码 70）")?,
                _ => {}
            }
        }
        if flags & VERTEX_SPLINE_FRAME != 0 {
            return Ok(None);
        }
        Ok(Some((build_point3(coords, line, "VERTEX")?, bulge)))
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<GroupPair>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    fn next_pair(&mut self) -> Result<Option<GroupPair>, IoError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        let code_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => return Ok(None),
        };

        let value_line = match self.lines.next() {
            Some(line) => {
                self.line_number += 1;
                line
            }
            None => {
                return Err(invalid(format!(
                    "文件在第 {} 行结束，缺少与组码对应的值行",
                    self.line_number
                )));
            }
        };

        let code = code_line.trim().parse::<i32>().map_err(|_| {
            invalid_at(
                self.line_number - 1,
                format!("组码 \"{}\" 无法解析为整数", code_line.trim()),
            )
        })?;
        Ok(Some(GroupPair {
            code,
            value: value_line.trim_end_matches('\r').to_string(),
            line: self.line_number,
        }))
    }

    /// 回退一个组码/值对。调用方保证两次 `next_pair` 之间最多回退一次。
    fn put_back(&mut self, pair: GroupPair) {
        debug_assert!(self.buffer.is_none(), "尝试多次回退 DXF pair");
        self.buffer = Some(pair);
    }
}

fn layer_or_default(layer: Option<String>) -> String {
    match layer {
        Some(name) if !name.is_empty() => name,
        _ => "0".to_string(),
    }
}

fn assign_coord(slot: &mut Option<f64>, pair: &GroupPair, context: &str) -> Result<(), IoError> {
    if slot.is_some() {
        return Err(invalid_at(pair.line, format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(pair, context)?);
    Ok(())
}

/// `line` 为实体起始行，缺少坐标时据此定位。
fn build_point3(coords: [Option<f64>; 3], line: usize, context: &str) -> Result<Point3, IoError> {
    match coords {
        [Some(x), Some(y), z] => Ok(Point3::new(x, y, z.unwrap_or(0.0))),
        _ => Err(invalid_at(line, format!("{context} 缺少完整的 XY 坐标"))),
    }
}

fn parse_f64(pair: &GroupPair, context: &str) -> Result<f64, IoError> {
    pair.value
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid_at(pair.line, format!("{context} 解析失败（值：\"{}\"）", pair.value)))
}

fn parse_i32(pair: &GroupPair, context: &str) -> Result<i32, IoError> {
    pair.value
        .trim()
        .parse::<i32>()
        .map_err(|_| invalid_at(pair.line, format!("{context} 解析失败（值：\"{}\"）", pair.value)))
}
