//! `PICKREPORT`：选择直线与三维多段线，逐个回显直线长度与多段线起点。
//!
//! 选择被取消时不输出任何内容；单个实体解析失败只输出一条 `Error:` 消息，
//! 其余实体照常处理。通过过滤器但既不是直线也不是三维多段线的实体
//! （例如同为 `POLYLINE` 的旧式二维多段线）不产生任何输出。

use cadpick_core::document::{Entity, EntityId};
use cadpick_core::geometry::Point3;
use tracing::debug;

use crate::command::{CommandContext, CommandHandler, CommandRequest, CommandResponse};
use crate::editor::{PromptSelectionOptions, PromptStatus, SelectionSet};
use crate::errors::EngineError;
use crate::filter::{DxfCode, SelectionFilter, TypedValue};
use crate::transaction::{OpenMode, Transaction};

pub const COMMAND_NAME: &str = "PICKREPORT";
pub const SELECTION_PROMPT: &str = "Select lines or 3D polylines: ";

/// `<or LINE POLYLINE or>`
pub fn selection_filter() -> Result<SelectionFilter, EngineError> {
    SelectionFilter::new(vec![
        TypedValue::new(DxfCode::Operator, "<or"),
        TypedValue::new(DxfCode::Start, "LINE"),
        TypedValue::new(DxfCode::Start, "POLYLINE"),
        TypedValue::new(DxfCode::Operator, "or>"),
    ])
}

/// 命令关心的两类实体及其派生值。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PickedEntity {
    Line { length: f64 },
    Polyline3d { start_point: Point3 },
}

impl PickedEntity {
    /// 其他类型返回 `Ok(None)`。没有顶点的三维多段线取不到起点，视为失败。
    pub fn classify(id: EntityId, entity: &Entity) -> Result<Option<Self>, EngineError> {
        match entity {
            Entity::Line(line) => Ok(Some(Self::Line {
                length: line.length(),
            })),
            Entity::Polyline3d(polyline) => polyline
                .start_point()
                .map(|start_point| Some(Self::Polyline3d { start_point }))
                .ok_or_else(|| EngineError::DegenerateGeometry {
                    id: id.get(),
                    reason: "3D polyline has no vertices".to_string(),
                }),
            Entity::Circle(_)
            | Entity::Polyline(_)
            | Entity::Polyline2d(_)
            | Entity::Text(_) => Ok(None),
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Line { length } => format!("You picked a line which length is: {length}"),
            Self::Polyline3d { start_point } => {
                format!("You picked a 3D polyline with StartPoint: {start_point}")
            }
        }
    }
}

/// 单个实体的处理结果。
#[derive(Debug)]
pub struct PickOutcome {
    pub id: EntityId,
    pub result: Result<Option<PickedEntity>, EngineError>,
}

impl PickOutcome {
    /// 需要回显的消息；被跳过的实体返回 `None`。
    pub fn message(&self) -> Option<String> {
        match &self.result {
            Ok(Some(picked)) => Some(picked.message()),
            Ok(None) => None,
            Err(err) => Some(format!("Error: {err}")),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PickSummary {
    pub reported: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PickSummary {
    pub fn from_outcomes(outcomes: &[PickOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome.result {
                    Ok(Some(_)) => summary.reported += 1,
                    Ok(None) => summary.skipped += 1,
                    Err(_) => summary.failed += 1,
                }
                summary
            })
    }
}

/// 在事务内按拾取顺序解析并分类每个实体，单个失败不影响后续实体。
pub fn resolve_picks(transaction: &Transaction<'_>, selection: &SelectionSet) -> Vec<PickOutcome> {
    selection
        .iter()
        .map(|id| {
            let result = transaction
                .get_object(id, OpenMode::ForRead)
                .and_then(|entity| {
                    let picked = PickedEntity::classify(id, entity)?;
                    if picked.is_none() {
                        debug!(id = id.get(), kind = entity.class_name(), "实体类型不在处理范围内，跳过");
                    }
                    Ok(picked)
                });
            PickOutcome { id, result }
        })
        .collect()
}

pub struct PickReportCommand;

impl CommandHandler for PickReportCommand {
    fn name(&self) -> &'static str {
        COMMAND_NAME
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let filter = match selection_filter() {
            Ok(filter) => filter,
            Err(err) => return CommandResponse::err(err.to_string()),
        };
        let options = PromptSelectionOptions::with_message(SELECTION_PROMPT);
        let document = context.document;
        let prompt = context.editor.get_selection(document, &options, &filter);

        let transaction = context.transactions.start_transaction(document);
        let mut summary = None;
        match (prompt.status, prompt.value.as_ref()) {
            (PromptStatus::Ok, Some(selection)) => {
                let outcomes = resolve_picks(&transaction, selection);
                for message in outcomes.iter().filter_map(PickOutcome::message) {
                    context.editor.write_message(&message);
                }
                summary = Some(PickSummary::from_outcomes(&outcomes));
            }
            (status, _) => {
                debug!(?status, "选择未完成，无需处理");
            }
        }
        transaction.commit();

        match summary {
            Some(summary) => CommandResponse::ok(format!(
                "{} reported, {} skipped, {} failed",
                summary.reported, summary.skipped, summary.failed
            )),
            None => CommandResponse::silent(),
        }
    }
}
