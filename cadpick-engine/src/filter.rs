//! 选择过滤器：由组码/值对组成的表达式，约束交互选择可以返回的实体。
//!
//! 顶层条件之间为“与”关系，`-4` 组码的运算符成对出现构成分组：
//! `<and … and>`、`<or … or>`、`<not X not>`、`<xor A B xor>`。
//! 实体类型（组码 0）与图层（组码 8）的值支持逗号分隔的列表以及 `*`、`?` 通配符，
//! 匹配时不区分大小写。

use cadpick_core::document::Entity;
use globset::{GlobBuilder, GlobMatcher};

use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxfCode {
    Operator,
    Start,
    LayerName,
}

impl DxfCode {
    #[inline]
    pub fn code(self) -> i16 {
        match self {
            DxfCode::Operator => -4,
            DxfCode::Start => 0,
            DxfCode::LayerName => 8,
        }
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            -4 => Some(DxfCode::Operator),
            0 => Some(DxfCode::Start),
            8 => Some(DxfCode::LayerName),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    pub code: DxfCode,
    pub value: String,
}

impl TypedValue {
    #[inline]
    pub fn new(code: DxfCode, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum FilterExpr {
    EntityType(Vec<GlobMatcher>),
    Layer(Vec<GlobMatcher>),
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
    Xor(Box<FilterExpr>, Box<FilterExpr>),
}

impl FilterExpr {
    fn matches(&self, entity: &Entity) -> bool {
        match self {
            FilterExpr::EntityType(patterns) => matches_any(patterns, entity.dxf_name()),
            FilterExpr::Layer(patterns) => matches_any(patterns, entity.layer_name()),
            FilterExpr::And(operands) => operands.iter().all(|expr| expr.matches(entity)),
            FilterExpr::Or(operands) => operands.iter().any(|expr| expr.matches(entity)),
            FilterExpr::Not(inner) => !inner.matches(entity),
            FilterExpr::Xor(left, right) => left.matches(entity) != right.matches(entity),
        }
    }
}

/// 已校验并编译的选择过滤器。空过滤器接受所有实体。
#[derive(Debug, Clone)]
pub struct SelectionFilter {
    values: Vec<TypedValue>,
    expr: FilterExpr,
}

impl SelectionFilter {
    pub fn new(values: Vec<TypedValue>) -> Result<Self, EngineError> {
        let operands = FilterParser::new(&values).parse_operands(None)?;
        Ok(Self {
            values,
            expr: FilterExpr::And(operands),
        })
    }

    /// 构造 `<or TYPE… or>` 形式的类型白名单。
    pub fn any_of_types(types: &[&str]) -> Result<Self, EngineError> {
        let mut values = Vec::with_capacity(types.len() + 2);
        values.push(TypedValue::new(DxfCode::Operator, "<or"));
        values.extend(
            types
                .iter()
                .map(|name| TypedValue::new(DxfCode::Start, *name)),
        );
        values.push(TypedValue::new(DxfCode::Operator, "or>"));
        Self::new(values)
    }

    #[inline]
    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }

    #[inline]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.expr.matches(entity)
    }
}

impl Default for SelectionFilter {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            expr: FilterExpr::And(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    And,
    Or,
    Not,
    Xor,
}

impl Group {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "and" => Some(Group::And),
            "or" => Some(Group::Or),
            "not" => Some(Group::Not),
            "xor" => Some(Group::Xor),
            _ => None,
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Group::And => "and",
            Group::Or => "or",
            Group::Not => "not",
            Group::Xor => "xor",
        }
    }

    fn build(self, mut operands: Vec<FilterExpr>) -> Result<FilterExpr, EngineError> {
        let count = operands.len();
        let invalid = |expected: &str| {
            EngineError::InvalidFilter(format!(
                "\"<{}\" expects {expected} operand(s), found {count}",
                self.keyword()
            ))
        };
        match self {
            Group::And | Group::Or if operands.is_empty() => Err(invalid("at least one")),
            Group::And => Ok(FilterExpr::And(operands)),
            Group::Or => Ok(FilterExpr::Or(operands)),
            Group::Not => match operands.pop() {
                Some(inner) if count == 1 => Ok(FilterExpr::Not(Box::new(inner))),
                _ => Err(invalid("exactly one")),
            },
            Group::Xor => {
                if count != 2 {
                    return Err(invalid("exactly two"));
                }
                let right = operands.pop().ok_or_else(|| invalid("exactly two"))?;
                let left = operands.pop().ok_or_else(|| invalid("exactly two"))?;
                Ok(FilterExpr::Xor(Box::new(left), Box::new(right)))
            }
        }
    }
}

enum Operator {
    Open(Group),
    Close(Group),
}

fn parse_operator(raw: &str) -> Result<Operator, EngineError> {
    let token = raw.trim().to_ascii_lowercase();
    let parsed = if let Some(name) = token.strip_prefix('<') {
        Group::from_keyword(name).map(Operator::Open)
    } else if let Some(name) = token.strip_suffix('>') {
        Group::from_keyword(name).map(Operator::Close)
    } else {
        None
    };
    parsed.ok_or_else(|| EngineError::InvalidFilter(format!("unknown operator \"{raw}\"")))
}

struct FilterParser<'a> {
    values: &'a [TypedValue],
    position: usize,
}

impl<'a> FilterParser<'a> {
    fn new(values: &'a [TypedValue]) -> Self {
        Self {
            values,
            position: 0,
        }
    }

    /// 读取操作数直到 `group` 对应的闭合运算符；`group` 为 `None` 时读到末尾。
    fn parse_operands(&mut self, group: Option<Group>) -> Result<Vec<FilterExpr>, EngineError> {
        let mut operands = Vec::new();
        while let Some(value) = self.values.get(self.position) {
            self.position += 1;
            match value.code {
                DxfCode::Start => operands.push(FilterExpr::EntityType(patterns(value)?)),
                DxfCode::LayerName => operands.push(FilterExpr::Layer(patterns(value)?)),
                DxfCode::Operator => match parse_operator(&value.value)? {
                    Operator::Open(inner) => {
                        let inner_operands = self.parse_operands(Some(inner))?;
                        operands.push(inner.build(inner_operands)?);
                    }
                    Operator::Close(closed) => {
                        return match group {
                            Some(open) if open == closed => Ok(operands),
                            Some(open) => Err(EngineError::InvalidFilter(format!(
                                "\"{}>\" closes \"<{}\"",
                                closed.keyword(),
                                open.keyword()
                            ))),
                            None => Err(EngineError::InvalidFilter(format!(
                                "\"{}>\" has no matching \"<{}\"",
                                closed.keyword(),
                                closed.keyword()
                            ))),
                        };
                    }
                },
            }
        }
        match group {
            None => Ok(operands),
            Some(open) => Err(EngineError::InvalidFilter(format!(
                "\"<{}\" is missing \"{}>\"",
                open.keyword(),
                open.keyword()
            ))),
        }
    }
}

/// 把逗号分隔的值编译为不区分大小写的通配符匹配器。
fn patterns(value: &TypedValue) -> Result<Vec<GlobMatcher>, EngineError> {
    let parsed = value
        .value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(compile_pattern)
        .collect::<Result<Vec<_>, _>>()?;
    if parsed.is_empty() {
        return Err(EngineError::InvalidFilter(format!(
            "group code {} has an empty value",
            value.code.code()
        )));
    }
    Ok(parsed)
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, EngineError> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| EngineError::InvalidFilter(format!("bad pattern \"{pattern}\": {err}")))
}

fn matches_any(patterns: &[GlobMatcher], text: &str) -> bool {
    patterns.iter().any(|matcher| matcher.is_match(text))
}
